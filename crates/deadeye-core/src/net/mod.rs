pub mod link;
pub mod messages;
pub mod protocol;
