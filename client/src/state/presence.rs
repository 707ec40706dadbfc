//! Mirror of who else is present in each joined room.

use std::collections::HashMap;

use frames::{PresenceMember, ServerEvent};
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct PresenceMirror {
    rooms: HashMap<Uuid, HashMap<Uuid, PresenceMember>>,
}

impl PresenceMirror {
    /// Apply a presence event. Returns whether the mirror changed.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::PresenceSnapshot { room_id, members } => {
                let room = members.iter().map(|m| (m.actor_id, m.clone())).collect();
                self.rooms.insert(*room_id, room);
                true
            }
            ServerEvent::UserJoined { room_id, actor_id, display_name, color } => {
                let member = PresenceMember {
                    actor_id: *actor_id,
                    display_name: display_name.clone(),
                    color: color.clone(),
                };
                self.rooms.entry(*room_id).or_default().insert(*actor_id, member);
                true
            }
            ServerEvent::UserLeft { room_id, actor_id } => self
                .rooms
                .get_mut(room_id)
                .is_some_and(|room| room.remove(actor_id).is_some()),
            _ => false,
        }
    }

    /// Members of a room, ordered by display name.
    #[must_use]
    pub fn members(&self, room_id: Uuid) -> Vec<&PresenceMember> {
        let mut members: Vec<_> = self.rooms.get(&room_id).map(|r| r.values().collect()).unwrap_or_default();
        members.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.actor_id.cmp(&b.actor_id)));
        members
    }

    #[must_use]
    pub fn is_present(&self, room_id: Uuid, actor_id: Uuid) -> bool {
        self.rooms.get(&room_id).is_some_and(|r| r.contains_key(&actor_id))
    }

    pub fn clear_room(&mut self, room_id: Uuid) {
        self.rooms.remove(&room_id);
    }

    /// Forget everything, e.g. after a reconnect.
    pub fn clear(&mut self) {
        self.rooms.clear();
    }
}
