//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own synchronization logic and storage access so route
//! handlers can stay focused on protocol translation and auth plumbing.

pub mod chat;
pub mod cursor;
pub mod persistence;
pub mod position;
pub mod session;
