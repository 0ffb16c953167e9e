use crate::model::Model;
use crate::players::Icon;
use crate::{blocking, Handle, Result};
use serde::{Deserialize, Serialize};

pub type Members = Vec<ClubMember>;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Club {
    pub tag: String,
    pub name: String,
    pub description: Option<String>,
    /// `open`, `inviteOnly` or `closed`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub badge_id: Option<u64>,
    pub required_trophies: i64,
    pub trophies: i64,
    pub members: Vec<ClubMember>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClubMember {
    pub tag: String,
    pub name: String,
    pub name_color: Option<String>,
    pub role: Option<String>,
    pub trophies: i64,
    pub icon: Option<Icon>,
}

impl Model<Club, Handle> {
    pub async fn get_members(&self) -> Result<crate::Model<Members>> {
        self.client()?.club_members(&self.tag).await
    }
}

impl Model<Club, blocking::Handle> {
    pub fn get_members(&self) -> Result<blocking::Model<Members>> {
        self.client()?.club_members(&self.tag)
    }
}
