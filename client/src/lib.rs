//! Native async client for the realtime project board.
//!
//! SYSTEM CONTEXT
//! ==============
//! `net` talks to the server: `api` for request/response board and chat
//! calls, `session` for the realtime websocket. `state` holds the local,
//! disposable mirrors (board, presence, cursors, chat) that apply changes
//! optimistically and reconcile against server truth. A
//! [`state::project::ProjectView`] ties one connection and one project
//! together and is passed explicitly to whatever needs it.

pub mod config;
pub mod error;
pub mod net;
pub mod state;

pub use config::ClientConfig;
pub use error::ClientError;
