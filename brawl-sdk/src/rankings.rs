use crate::brawlers::BrawlerRef;
use crate::endpoint::{self, RankingKind, GLOBAL_REGION, MAX_RANKING_LIMIT};
use crate::players::Icon;
use crate::{blocking, Handle, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type Ranking = Vec<RankingEntry>;

/// One row of a leaderboard. Player rows carry `name_color`, `icon` and
/// `club`, club rows carry `badge_id` and `member_count`.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingEntry {
    pub tag: String,
    pub name: String,
    pub name_color: Option<String>,
    pub icon: Option<Icon>,
    pub trophies: i64,
    pub rank: u32,
    pub club: Option<RankingClub>,
    pub badge_id: Option<u64>,
    pub member_count: Option<u32>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingClub {
    pub name: String,
}

/// Leaderboard request, global and 200 entries unless told otherwise.
#[derive(Debug)]
pub struct RankingsRequestBuilder<H> {
    handle: Arc<H>,
    kind: RankingKind,
    region: String,
    limit: u32,
    brawler: Option<BrawlerRef>,
}

impl<H> RankingsRequestBuilder<H> {
    pub(crate) fn new(handle: Arc<H>, kind: RankingKind) -> Self {
        Self {
            handle,
            kind,
            region: GLOBAL_REGION.to_string(),
            limit: MAX_RANKING_LIMIT,
            brawler: None,
        }
    }

    /// Two letter country code, or `global`.
    pub fn region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn brawler(mut self, brawler: impl Into<BrawlerRef>) -> Self {
        self.brawler = Some(brawler.into());
        self
    }

    fn check(&self) -> Result<()> {
        endpoint::check_ranking_args(self.kind, &self.region, self.limit, self.brawler.is_some())
            .map(|_| ())
    }
}

impl RankingsRequestBuilder<Handle> {
    pub async fn send(self) -> Result<crate::Model<Ranking>> {
        self.check()?;
        let brawler_id = match &self.brawler {
            Some(brawler) => Some(self.handle.brawler_id(brawler).await?),
            None => None,
        };
        let endpoint =
            self.handle
                .pipeline
                .resolver
                .rankings(self.kind, &self.region, self.limit, brawler_id)?;
        self.handle.ranking(&endpoint).await
    }
}

impl RankingsRequestBuilder<blocking::Handle> {
    pub fn send(self) -> Result<blocking::Model<Ranking>> {
        self.check()?;
        let brawler_id = match &self.brawler {
            Some(brawler) => Some(self.handle.brawler_id(brawler)?),
            None => None,
        };
        let endpoint =
            self.handle
                .pipeline
                .resolver
                .rankings(self.kind, &self.region, self.limit, brawler_id)?;
        self.handle.ranking(&endpoint)
    }
}
