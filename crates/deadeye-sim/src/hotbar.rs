use deadeye_core::weapon::WeaponKind;

/// Number keys in hotbar order. `0` is the tenth slot.
pub const HOTBAR_KEYS: [char; 10] = ['1', '2', '3', '4', '5', '6', '7', '8', '9', '0'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDirection {
    Next,
    Prev,
}

/// Weapon bound to a hotbar key, if any.
pub fn weapon_for_key(key: char) -> Option<WeaponKind> {
    let slot = HOTBAR_KEYS.iter().position(|&k| k == key)?;
    WeaponKind::ALL.get(slot).copied()
}

pub fn slot_of(weapon: WeaponKind) -> usize {
    WeaponKind::ALL
        .iter()
        .position(|&w| w == weapon)
        .unwrap_or_default()
}

/// Neighbouring weapon on the hotbar, wrapping at both ends.
pub fn cycle(current: WeaponKind, direction: CycleDirection) -> WeaponKind {
    let len = WeaponKind::ALL.len();
    let slot = slot_of(current);
    let next = match direction {
        CycleDirection::Next => (slot + 1) % len,
        CycleDirection::Prev => (slot + len - 1) % len,
    };
    WeaponKind::ALL[next]
}
