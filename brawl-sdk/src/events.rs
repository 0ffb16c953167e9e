use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub id: u64,
    pub mode: Option<String>,
    pub map: Option<String>,
}

/// An event slot of the current rotation.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduledEvent {
    pub start_time: String,
    pub end_time: String,
    pub slot_id: i64,
    pub event: Event,
}

impl ScheduledEvent {
    pub fn start(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        crate::battlelog::parse_battle_time(&self.start_time).ok()
    }

    pub fn end(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        crate::battlelog::parse_battle_time(&self.end_time).ok()
    }
}
