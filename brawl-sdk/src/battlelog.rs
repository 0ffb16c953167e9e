use crate::events::Event;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub type BattleLog = Vec<Battle>;

/// The event a battle was played in. Same shape as a rotation event.
pub type BattleEvent = Event;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Battle {
    pub battle_time: String,
    pub event: BattleEvent,
    pub battle: BattleDetails,
}

impl Battle {
    pub fn time(&self) -> Result<DateTime<Utc>> {
        parse_battle_time(&self.battle_time)
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BattleDetails {
    pub mode: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub result: Option<String>,
    pub duration: Option<u32>,
    /// Placement in showdown modes.
    pub rank: Option<u32>,
    pub trophy_change: Option<i32>,
    pub star_player: Option<BattlePlayer>,
    pub teams: Option<Vec<Vec<BattlePlayer>>>,
    pub players: Option<Vec<BattlePlayer>>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BattlePlayer {
    pub tag: String,
    pub name: String,
    pub brawler: BattleBrawler,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BattleBrawler {
    pub id: u32,
    pub name: String,
    pub power: i32,
    pub trophies: i64,
}

/// Parse an API timestamp such as `20190310T192543.000Z`.
///
/// The dashed ISO 8601 form is accepted as well.
pub fn parse_battle_time(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    ["%Y%m%dT%H%M%S%.fZ", "%Y-%m-%dT%H:%M:%S%.fZ"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| Error::InvalidArgument(format!("invalid battle time '{}'", raw)))
}
