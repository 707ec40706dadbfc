//! Networking modules for HTTP + websocket transport.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` handles request/response board and chat calls; `session` owns one
//! websocket connection and its inbound event stream.

pub mod api;
pub mod session;
