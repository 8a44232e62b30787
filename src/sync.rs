// Typed view of the parts of a `/sync` response needed to list rooms, and
// the room-name resolution over it.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Shown for rooms that never had a name set.
pub const UNNAMED_ROOM: &str = "<Unnamed room>";

const ROOM_NAME_EVENT: &str = "m.room.name";

#[derive(Deserialize, Debug)]
pub struct SyncResponse {
    pub rooms: Rooms,
}

/// Rooms keyed by room id. A `BTreeMap` keeps listings in room-id order.
#[derive(Deserialize, Debug, Default)]
pub struct Rooms {
    #[serde(default)]
    pub join: Option<BTreeMap<String, JoinedRoom>>,
    #[serde(default)]
    pub invite: Option<BTreeMap<String, InvitedRoom>>,
}

#[derive(Deserialize, Debug)]
pub struct JoinedRoom {
    pub state: EventList,
    #[serde(default)]
    pub timeline: Option<EventList>,
}

#[derive(Deserialize, Debug)]
pub struct InvitedRoom {
    pub invite_state: EventList,
}

#[derive(Deserialize, Debug)]
pub struct EventList {
    pub events: Vec<Event>,
}

#[derive(Deserialize, Debug)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    /// Left untyped: only `name` of `m.room.name` events is ever read.
    #[serde(default)]
    pub content: serde_json::Value,
}

/// A room as shown by `--list-rooms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub room_id: String,
    pub display_name: String,
}

/// Joined and invited rooms, each `None` when the server sent no such section.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RoomList {
    pub joined: Option<Vec<RoomSummary>>,
    pub invited: Option<Vec<RoomSummary>>,
}

impl EventList {
    /// Name from the last name event in the list. A later event that clears
    /// the name wins over an earlier one that set it.
    pub fn room_name(&self) -> Option<&str> {
        self.events
            .iter()
            .rev()
            .find(|event| event.kind == ROOM_NAME_EVENT)
            .and_then(|event| event.content.get("name"))
            .and_then(serde_json::Value::as_str)
            .filter(|name| !name.is_empty())
    }
}

impl JoinedRoom {
    pub fn display_name(&self) -> &str {
        self.state
            .room_name()
            .or_else(|| self.timeline.as_ref().and_then(EventList::room_name))
            .unwrap_or(UNNAMED_ROOM)
    }
}

impl InvitedRoom {
    pub fn display_name(&self) -> &str {
        self.invite_state.room_name().unwrap_or(UNNAMED_ROOM)
    }
}

impl From<SyncResponse> for RoomList {
    fn from(sync: SyncResponse) -> Self {
        let Rooms { join, invite } = sync.rooms;
        RoomList {
            joined: join.map(|rooms| {
                rooms
                    .iter()
                    .map(|(id, room)| summary(id, room.display_name()))
                    .collect()
            }),
            invited: invite.map(|rooms| {
                rooms
                    .iter()
                    .map(|(id, room)| summary(id, room.display_name()))
                    .collect()
            }),
        }
    }
}

fn summary(room_id: &str, display_name: &str) -> RoomSummary {
    RoomSummary {
        room_id: room_id.to_string(),
        display_name: display_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn name_event(name: &str) -> serde_json::Value {
        json!({ "type": "m.room.name", "state_key": "", "content": { "name": name } })
    }

    fn decode(value: serde_json::Value) -> RoomList {
        serde_json::from_value::<SyncResponse>(value).unwrap().into()
    }

    #[test]
    fn later_name_event_wins() {
        let list = decode(json!({
            "rooms": { "join": { "!a:h": { "state": { "events": [
                name_event("First"),
                { "type": "m.room.topic", "content": { "topic": "t" } },
                name_event("Second"),
            ] } } } }
        }));
        assert_eq!(
            list.joined.unwrap(),
            vec![RoomSummary { room_id: "!a:h".into(), display_name: "Second".into() }]
        );
    }

    #[test]
    fn rooms_without_name_use_placeholder() {
        let list = decode(json!({
            "rooms": {
                "join": { "!a:h": { "state": { "events": [
                    { "type": "m.room.member", "content": { "membership": "join" } }
                ] } } },
                "invite": { "!b:h": { "invite_state": { "events": [] } } }
            }
        }));
        assert_eq!(list.joined.unwrap()[0].display_name, UNNAMED_ROOM);
        assert_eq!(list.invited.unwrap()[0].display_name, UNNAMED_ROOM);
    }

    #[test]
    fn timeline_name_used_when_state_has_none() {
        let list = decode(json!({
            "rooms": { "join": { "!a:h": {
                "state": { "events": [] },
                "timeline": { "events": [
                    { "type": "m.room.message", "content": { "body": "hi" } },
                    name_event("From timeline"),
                ] }
            } } }
        }));
        assert_eq!(list.joined.unwrap()[0].display_name, "From timeline");
    }

    #[test]
    fn invited_rooms_read_invite_state() {
        let list = decode(json!({
            "rooms": { "invite": { "!b:h": { "invite_state": { "events": [name_event("Party")] } } } }
        }));
        assert_eq!(list.joined, None);
        assert_eq!(list.invited.unwrap()[0].display_name, "Party");
    }

    #[test]
    fn rooms_listed_in_room_id_order() {
        let list = decode(json!({
            "rooms": { "join": {
                "!zeta:h": { "state": { "events": [] } },
                "!alpha:h": { "state": { "events": [] } },
                "!mid:h": { "state": { "events": [] } }
            } }
        }));
        let ids: Vec<_> = list.joined.unwrap().into_iter().map(|r| r.room_id).collect();
        assert_eq!(ids, ["!alpha:h", "!mid:h", "!zeta:h"]);
    }

    #[test]
    fn missing_substructures_fail_to_decode() {
        for body in [
            json!({}),
            json!({ "rooms": { "join": { "!a:h": {} } } }),
            json!({ "rooms": { "join": { "!a:h": { "state": {} } } } }),
            json!({ "rooms": { "invite": { "!a:h": { "state": { "events": [] } } } } }),
            json!({ "rooms": { "join": { "!a:h": { "state": { "events": [{ "content": {} }] } } } } }),
        ] {
            assert!(serde_json::from_value::<SyncResponse>(body.clone()).is_err(), "{body}");
        }
    }
}
