//! Two trainers wired back to back through an in-process link: lifecycle
//! events cross in both directions and nothing echoes.

use glam::Vec3;

use deadeye_core::mode::GameMode;
use deadeye_core::net::link::MpscLink;
use deadeye_core::net::messages::{EntityRef, SyncMessage, TargetHitMsg};
use deadeye_core::settings::{Difficulty, GameSettings, TimeOfDay};
use deadeye_core::test_helpers::{drain_envelopes, make_settings, send_as};
use deadeye_core::weapon::WeaponKind;
use deadeye_sim::arena::MapBounds;
use deadeye_sim::config::SimConfig;
use deadeye_sim::persistence::ProfileRepository;
use deadeye_sim::sync::SyncAdapter;
use deadeye_sim::{EndReason, GameEvent, Phase, SessionCommand, Trainer};

const DT: f32 = 1.0 / 60.0;

fn trainer(seed: u64) -> Trainer {
    Trainer::new(
        SimConfig::default(),
        make_settings(Difficulty::Medium),
        MapBounds::default(),
        ProfileRepository::in_memory(),
    )
    .with_seed(seed)
}

fn linked_pair() -> (Trainer, Trainer) {
    let (a_link, b_link) = MpscLink::pair();
    let mut a = trainer(1);
    let mut b = trainer(2);
    a.attach_sync(SyncAdapter::new(1, Box::new(a_link)));
    b.attach_sync(SyncAdapter::new(2, Box::new(b_link)));
    (a, b)
}

/// A trainer whose inbound traffic is injected by the test through the
/// returned link.
fn injected(seed: u64) -> (Trainer, MpscLink) {
    let (inject, link) = MpscLink::pair();
    let mut t = trainer(seed);
    t.attach_sync(SyncAdapter::new(2, Box::new(link)));
    (t, inject)
}

fn tick_until_running(t: &mut Trainer) {
    for _ in 0..200 {
        if t.session().phase() == Phase::Running {
            return;
        }
        t.tick(DT);
    }
    panic!("session never started running");
}

#[test]
fn remote_start_adopts_mode_and_settings() {
    let (mut a, mut b) = linked_pair();
    let settings = GameSettings {
        time_of_day: TimeOfDay::Night,
        ..make_settings(Difficulty::Hard)
    };
    a.apply_settings(settings.clone());
    a.start_game(GameMode::Precision, true, 0);

    let events = b.pump_sync();
    assert!(events.contains(&GameEvent::SessionStarted {
        mode: GameMode::Precision,
        multiplayer: true,
    }));
    assert_eq!(b.session().phase(), Phase::Countdown);
    assert_eq!(b.session().mode(), GameMode::Precision);
    assert_eq!(b.session().settings(), &settings);
    assert!(b.session().is_multiplayer());
    assert!(
        b.drain_commands()
            .iter()
            .any(|c| matches!(c, SessionCommand::ApplyGraphics { .. }))
    );

    assert!(a.pump_sync().is_empty(), "the joiner does not re-announce");
}

#[test]
fn remote_hits_damage_without_scoring() {
    let (mut t, mut inject) = injected(3);
    t.start_game(GameMode::Timed, true, 0);
    let target = t.targets()[0].id;

    send_as(
        &mut inject,
        9,
        SyncMessage::TargetHit(TargetHitMsg {
            entity: EntityRef::Target(target),
            hit_score: 40.0,
        }),
    );
    let events = t.pump_sync();
    assert_eq!(
        events,
        vec![GameEvent::RemoteHitApplied {
            entity: EntityRef::Target(target),
            amount: 40.0,
        }]
    );
    assert_eq!(t.targets()[0].health, 60.0);
    assert_eq!(t.hud().score, 0);
    assert_eq!(t.session().scoreboard().hits, 0);
}

#[test]
fn remote_kill_replaces_target_without_credit() {
    let (mut t, mut inject) = injected(4);
    t.start_game(GameMode::Endurance, true, 0);
    let target = t.targets()[2].id;

    send_as(
        &mut inject,
        9,
        SyncMessage::TargetHit(TargetHitMsg {
            entity: EntityRef::Target(target),
            hit_score: 100.0,
        }),
    );
    let events = t.pump_sync();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, GameEvent::TargetDestroyed { old, .. } if *old == target))
    );
    assert_ne!(t.targets()[2].id, target);
    assert_eq!(t.targets().len(), 10);
    assert_eq!(t.hud().score, 0);
}

#[test]
fn hits_on_unknown_entities_are_ignored() {
    let (mut t, mut inject) = injected(5);
    t.start_game(GameMode::Timed, true, 0);
    send_as(
        &mut inject,
        9,
        SyncMessage::TargetHit(TargetHitMsg {
            entity: EntityRef::Agent(42),
            hit_score: 50.0,
        }),
    );
    assert!(t.pump_sync().is_empty());
    assert!(t.targets().iter().all(|x| x.health == 100.0));
}

#[test]
fn local_hits_are_mirrored_to_peers() {
    let (mut t, mut inject) = injected(6);
    t.switch_weapon(WeaponKind::LaserGun);
    t.start_game(GameMode::Precision, true, 0);
    drain_envelopes(&mut inject);
    tick_until_running(&mut t);

    let eye = Vec3::new(0.0, 1.6, 0.0);
    let aim = t.targets()[0].position;
    t.set_player_pose(eye, Vec3::ZERO, eye, (aim - eye).normalize());
    t.fire();

    let sent = drain_envelopes(&mut inject);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].sender, 2);
    let SyncMessage::TargetHit(hit) = &sent[0].message else {
        panic!("expected a TargetHit, got {:?}", sent[0].message);
    };
    assert!((10.0..=100.0).contains(&hit.hit_score));
}

#[test]
fn remote_end_moves_to_post_game_without_echo() {
    let (mut a, mut b) = linked_pair();
    a.start_game(GameMode::Timed, true, 0);
    b.pump_sync();
    tick_until_running(&mut a);
    tick_until_running(&mut b);

    let a_events = a.end_game();
    assert!(a_events.iter().any(|e| matches!(
        e,
        GameEvent::SessionEnded {
            reason: EndReason::Ended,
            ..
        }
    )));
    assert!(a.drain_commands().contains(&SessionCommand::DisconnectSync));

    let b_events = b.pump_sync();
    assert_eq!(b.session().phase(), Phase::PostGame);
    assert!(b_events.iter().any(|e| matches!(
        e,
        GameEvent::SessionEnded {
            reason: EndReason::Remote,
            ..
        }
    )));
    assert!(a.pump_sync().is_empty(), "remote end is not re-broadcast");
}

#[test]
fn own_echoes_are_dropped() {
    let (mut t, mut inject) = injected(7);
    t.start_game(GameMode::Timed, true, 0);
    tick_until_running(&mut t);
    let target = t.targets()[0].id;
    send_as(
        &mut inject,
        2,
        SyncMessage::TargetHit(TargetHitMsg {
            entity: EntityRef::Target(target),
            hit_score: 100.0,
        }),
    );
    assert!(t.pump_sync().is_empty());
    assert_eq!(t.targets()[0].id, target);
}

#[test]
fn dropped_peer_does_not_stall_the_session() {
    let (mut t, inject) = injected(8);
    t.start_game(GameMode::Timed, true, 0);
    drop(inject);
    tick_until_running(&mut t);
    assert!(t.pump_sync().is_empty());
    assert!(!t.sync().is_some_and(|s| s.is_connected()));
    t.tick(1.0);
    assert_eq!(t.hud().time_remaining, Some(59));
    t.end_game();
    assert_eq!(t.session().phase(), Phase::PostGame);
}
