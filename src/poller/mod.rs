//! Background status polling

mod status;

pub use self::status::StatusPoller;
