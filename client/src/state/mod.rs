//! Client-owned mirrors of server state.
//!
//! Every mirror here is disposable: it can be rebuilt at any time by
//! re-querying the server, and the server's answer always wins.

pub mod board;
pub mod chat;
pub mod cursor;
pub mod presence;
pub mod project;

#[cfg(test)]
pub(crate) mod mock_api;

/// Wall-clock milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
