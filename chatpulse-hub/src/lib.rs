//! `ChatPulse` Hub library.
//!
//! Exposes the coordinating server for use in tests and embedding. The hub
//! accepts WebSocket connections, maps client identities to live
//! connections, tracks presence, and fans out message delivery-status
//! transitions to conversation and personal rooms.

pub mod config;
pub mod delivery;
pub mod hub;
pub mod presence;
pub mod registry;
pub mod rooms;
