//! API endpoints module.

pub mod messages;

pub use messages::list_messages;
