//! Freshest-sample-per-actor cursor tracker.
//!
//! Samples are never accumulated: a new sample for an actor overwrites the
//! previous one regardless of arrival order. What is rendered is a pure
//! function of the stored samples and the current time.

use std::collections::HashMap;

use frames::Position;
use uuid::Uuid;

/// Samples older than this are not rendered.
pub const VISIBLE_MS: i64 = 3_000;
/// Samples older than this are dropped by [`CursorTracker::prune`].
pub const PRUNE_MS: i64 = 5_000;

#[derive(Clone, Debug, PartialEq)]
pub struct CursorSample {
    pub actor_id: Uuid,
    pub room_id: Uuid,
    pub position: Position,
    pub element_id: Option<String>,
    /// Local receipt time in epoch milliseconds.
    pub observed_at: i64,
}

#[derive(Clone, Debug, Default)]
pub struct CursorTracker {
    samples: HashMap<(Uuid, Uuid), CursorSample>,
}

impl CursorTracker {
    pub fn observe(&mut self, room_id: Uuid, actor_id: Uuid, position: Position, element_id: Option<String>, now_ms: i64) {
        self.samples.insert(
            (room_id, actor_id),
            CursorSample { actor_id, room_id, position, element_id, observed_at: now_ms },
        );
    }

    /// Samples in `room_id` within the visibility window, ordered by actor.
    #[must_use]
    pub fn visible(&self, room_id: Uuid, now_ms: i64) -> Vec<&CursorSample> {
        let mut out: Vec<_> = self
            .samples
            .values()
            .filter(|s| s.room_id == room_id && now_ms - s.observed_at <= VISIBLE_MS)
            .collect();
        out.sort_by_key(|s| s.actor_id);
        out
    }

    /// Drop samples past the pruning window. Returns how many were dropped.
    pub fn prune(&mut self, now_ms: i64) -> usize {
        let before = self.samples.len();
        self.samples.retain(|_, s| now_ms - s.observed_at <= PRUNE_MS);
        before - self.samples.len()
    }

    pub fn remove(&mut self, room_id: Uuid, actor_id: Uuid) -> bool {
        self.samples.remove(&(room_id, actor_id)).is_some()
    }

    pub fn clear_room(&mut self, room_id: Uuid) {
        self.samples.retain(|(room, _), _| *room != room_id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
