//! Realtime project board server.
//!
//! ARCHITECTURE
//! ============
//! `routes` translates HTTP and websocket traffic into calls on `services`,
//! which own the synchronization core: the position store and move
//! reconciler, the session registry, the cursor relay, and the message
//! channel. `store` is the seam to identity, membership, and durable
//! storage. `state` holds everything shared between connections.

pub mod config;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
