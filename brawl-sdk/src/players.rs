use crate::brawlers::Accessory;
use crate::clubs::Club;
use crate::model::Model;
use crate::{blocking, Error, Handle, Result};
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Player {
    pub tag: String,
    pub name: String,
    pub name_color: Option<String>,
    pub icon: Option<Icon>,
    pub trophies: i64,
    pub highest_trophies: i64,
    pub exp_level: u32,
    pub exp_points: u64,
    pub is_qualified_from_championship_challenge: bool,
    #[serde(rename = "3vs3Victories")]
    pub three_vs_three_victories: u64,
    pub solo_victories: u64,
    pub duo_victories: u64,
    pub best_robo_rumble_time: u32,
    pub best_time_as_big_brawler: u32,
    pub club: Option<PlayerClub>,
    pub brawlers: Vec<PlayerBrawler>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Icon {
    pub id: u64,
}

/// The partial club embedded in a player profile. Empty when the player has
/// no club.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerClub {
    pub tag: Option<String>,
    pub name: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerBrawler {
    pub id: u32,
    pub name: String,
    pub power: i32,
    pub rank: i32,
    pub trophies: i64,
    pub highest_trophies: i64,
    pub star_powers: Vec<Accessory>,
    pub gadgets: Vec<Accessory>,
}

impl Player {
    fn club_tag(&self) -> Option<&str> {
        self.club.as_ref()?.tag.as_deref().filter(|tag| !tag.is_empty())
    }
}

impl PlayerClub {
    fn required_tag(&self) -> Result<&str> {
        self.tag
            .as_deref()
            .filter(|tag| !tag.is_empty())
            .ok_or_else(|| Error::InvalidArgument("the player is not in a club".into()))
    }
}

impl<H> Model<Player, H> {
    /// The partial club of the player, without making a request.
    pub fn club(&self) -> Option<Model<PlayerClub, H>> {
        self.club_tag()?;
        self.club.clone().map(|club| self.child(club))
    }
}

impl Model<Player, Handle> {
    /// Fetch the full club of the player, `None` if they are not in one.
    pub async fn get_club(&self) -> Result<Option<crate::Model<Club>>> {
        let Some(tag) = self.club_tag() else {
            return Ok(None);
        };
        let club = self.client()?.club(tag).await?;
        Ok(Some(club))
    }
}

impl Model<Player, blocking::Handle> {
    pub fn get_club(&self) -> Result<Option<blocking::Model<Club>>> {
        let Some(tag) = self.club_tag() else {
            return Ok(None);
        };
        let club = self.client()?.club(tag)?;
        Ok(Some(club))
    }
}

impl Model<PlayerClub, Handle> {
    pub async fn get_full(&self) -> Result<crate::Model<Club>> {
        let tag = self.required_tag()?;
        self.client()?.club(tag).await
    }
}

impl Model<PlayerClub, blocking::Handle> {
    pub fn get_full(&self) -> Result<blocking::Model<Club>> {
        let tag = self.required_tag()?;
        self.client()?.club(tag)
    }
}
