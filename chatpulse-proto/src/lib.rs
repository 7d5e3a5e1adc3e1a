//! Shared protocol definitions for the `ChatPulse` wire format.

pub mod codec;
pub mod event;
pub mod message;
pub mod notify;
pub mod presence;
pub mod room;
