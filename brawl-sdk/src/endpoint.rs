use crate::tag::Tag;
use crate::{Error, Result};
use std::fmt::Display;
use std::str::FromStr;

pub const MIN_RANKING_LIMIT: u32 = 1;
pub const MAX_RANKING_LIMIT: u32 = 200;
pub const GLOBAL_REGION: &str = "global";

/// A fully resolved request URL. It doubles as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingKind {
    Players,
    Clubs,
    Brawlers,
}

impl Display for RankingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            RankingKind::Players => "players",
            RankingKind::Clubs => "clubs",
            RankingKind::Brawlers => "brawlers",
        };
        write!(f, "{}", kind)
    }
}

impl FromStr for RankingKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "players" => Ok(RankingKind::Players),
            "clubs" => Ok(RankingKind::Clubs),
            "brawlers" => Ok(RankingKind::Brawlers),
            _ => Err(Error::InvalidArgument(format!(
                "ranking kind must be 'players', 'clubs' or 'brawlers', got '{}'",
                s
            ))),
        }
    }
}

/// Check ranking parameters without building anything.
///
/// Runs before the brawler name is resolved so bad arguments never cost a
/// request.
pub(crate) fn check_ranking_args(
    kind: RankingKind,
    region: &str,
    limit: u32,
    has_brawler: bool,
) -> Result<String> {
    if !(MIN_RANKING_LIMIT..=MAX_RANKING_LIMIT).contains(&limit) {
        return Err(Error::InvalidArgument(format!(
            "limit must be between {} and {}, got {}",
            MIN_RANKING_LIMIT, MAX_RANKING_LIMIT, limit
        )));
    }
    let region = region.trim().to_lowercase();
    let is_country = region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic());
    if region != GLOBAL_REGION && !is_country {
        return Err(Error::InvalidArgument(format!(
            "region must be a 2 letter country code or '{}', got '{}'",
            GLOBAL_REGION, region
        )));
    }
    match (kind, has_brawler) {
        (RankingKind::Brawlers, false) => Err(Error::InvalidArgument(
            "brawler rankings need a brawler".into(),
        )),
        (RankingKind::Players | RankingKind::Clubs, true) => Err(Error::InvalidArgument(format!(
            "{} rankings do not take a brawler",
            kind
        ))),
        _ => Ok(region),
    }
}

/// Builds every URL the client requests. Never touches the network.
#[derive(Debug, Clone)]
pub struct Resolver {
    base: String,
    constants: String,
    escape_tag_prefix: bool,
}

impl Resolver {
    pub fn new(base_url: &str, constants_url: &str, escape_tag_prefix: bool) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
            constants: constants_url.to_string(),
            escape_tag_prefix,
        }
    }

    fn tagged(&self, resource: &str, tag: &Tag, suffix: &str) -> Endpoint {
        Endpoint(format!(
            "{}/{}/{}{}",
            self.base,
            resource,
            tag.path_segment(self.escape_tag_prefix),
            suffix
        ))
    }

    pub fn player(&self, tag: &Tag) -> Endpoint {
        self.tagged("players", tag, "")
    }

    pub fn battle_log(&self, tag: &Tag) -> Endpoint {
        self.tagged("players", tag, "/battlelog")
    }

    pub fn club(&self, tag: &Tag) -> Endpoint {
        self.tagged("clubs", tag, "")
    }

    pub fn club_members(&self, tag: &Tag) -> Endpoint {
        self.tagged("clubs", tag, "/members")
    }

    pub fn brawlers(&self) -> Endpoint {
        Endpoint(format!("{}/brawlers", self.base))
    }

    pub fn event_rotation(&self) -> Endpoint {
        Endpoint(format!("{}/events/rotation", self.base))
    }

    pub fn constants(&self) -> Endpoint {
        Endpoint(self.constants.clone())
    }

    pub fn rankings(
        &self,
        kind: RankingKind,
        region: &str,
        limit: u32,
        brawler_id: Option<u32>,
    ) -> Result<Endpoint> {
        let region = check_ranking_args(kind, region, limit, brawler_id.is_some())?;
        let url = match brawler_id {
            Some(id) => format!(
                "{}/rankings/{}/brawlers/{}?limit={}",
                self.base, region, id, limit
            ),
            None => format!("{}/rankings/{}/{}?limit={}", self.base, region, kind, limit),
        };
        Ok(Endpoint(url))
    }
}
