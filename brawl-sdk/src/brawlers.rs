use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Brawler {
    pub id: u32,
    pub name: String,
    pub star_powers: Vec<Accessory>,
    pub gadgets: Vec<Accessory>,
}

/// A star power or gadget.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Accessory {
    pub id: u32,
    pub name: String,
}

/// A brawler given either by id or by (case insensitive) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrawlerRef {
    Id(u32),
    Name(String),
}

impl From<u32> for BrawlerRef {
    fn from(id: u32) -> Self {
        BrawlerRef::Id(id)
    }
}

impl From<&str> for BrawlerRef {
    fn from(name: &str) -> Self {
        match name.trim().parse::<u32>() {
            Ok(id) => BrawlerRef::Id(id),
            Err(_) => BrawlerRef::Name(name.to_string()),
        }
    }
}

impl From<String> for BrawlerRef {
    fn from(name: String) -> Self {
        BrawlerRef::from(name.as_str())
    }
}

/// Lowercase name to id table.
pub(crate) fn index(brawlers: &[Brawler]) -> HashMap<String, u32> {
    brawlers
        .iter()
        .filter(|b| !b.name.is_empty())
        .map(|b| (b.name.to_lowercase(), b.id))
        .collect()
}

pub(crate) fn lookup(index: &HashMap<String, u32>, name: &str) -> Result<u32> {
    index
        .get(&name.trim().to_lowercase())
        .copied()
        .ok_or_else(|| Error::InvalidArgument(format!("unknown brawler '{}'", name)))
}
