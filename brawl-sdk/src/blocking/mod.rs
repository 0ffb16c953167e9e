//! Blocking client. Same operations and semantics as [`crate::Client`], but
//! every call holds the calling thread until the response is classified.
//!
//! Do not use it from inside an async runtime.

use crate::battlelog::{Battle, BattleLog};
use crate::brawlers::{self, Brawler, BrawlerRef};
use crate::clubs::{Club, ClubMember, Members};
use crate::endpoint::{Endpoint, RankingKind};
use crate::events::ScheduledEvent;
use crate::pipeline::{self, Admission, Pipeline};
use crate::players::Player;
use crate::rankings::{Ranking, RankingsRequestBuilder};
use crate::{transport, ClientBuilder, Error, RateState, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// A decoded response tied to the blocking [`Client`] that fetched it.
pub type Model<T> = crate::model::Model<T, Handle>;

/// Shared state behind a blocking [`Client`] and every [`Model`] it returns.
#[derive(Debug)]
pub struct Handle {
    pub web: reqwest::blocking::Client,
    pub(crate) pipeline: Pipeline,
    brawlers: Mutex<Option<Arc<HashMap<String, u32>>>>,
}

impl Handle {
    fn wrap<T>(self: &Arc<Self>, data: T) -> Model<T> {
        Model::new(data, Arc::downgrade(self))
    }

    fn request(&self, endpoint: &Endpoint) -> Result<Value> {
        loop {
            match self.pipeline.admit(endpoint)? {
                Admission::Cached(hit) => return Ok(hit),
                Admission::Wait(wait) => std::thread::sleep(wait),
                Admission::Send => break,
            }
        }
        let raw = transport::get_blocking(
            &self.web,
            self.pipeline.headers(),
            endpoint,
            self.pipeline.config.timeout,
        )?;
        self.pipeline.complete(endpoint, raw)
    }

    fn fetch<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T> {
        let value = self.request(endpoint)?;
        pipeline::decode(endpoint, value)
    }

    fn fetch_items<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<Vec<T>> {
        let value = self.request(endpoint)?;
        pipeline::decode_items(endpoint, value)
    }

    fn fetch_batch<T: DeserializeOwned>(
        self: &Arc<Self>,
        endpoints: Vec<Endpoint>,
    ) -> Result<Vec<Model<T>>> {
        pipeline::ensure_unique(&endpoints)?;
        endpoints
            .iter()
            .map(|endpoint| self.fetch::<T>(endpoint).map(|data| self.wrap(data)))
            .collect()
    }

    pub(crate) fn player(self: &Arc<Self>, tag: &str) -> Result<Model<Player>> {
        let endpoint = self.pipeline.resolver.player(&self.pipeline.tag(tag)?);
        let player = self.fetch(&endpoint)?;
        Ok(self.wrap(player))
    }

    pub(crate) fn club(self: &Arc<Self>, tag: &str) -> Result<Model<Club>> {
        let endpoint = self.pipeline.resolver.club(&self.pipeline.tag(tag)?);
        let club = self.fetch(&endpoint)?;
        Ok(self.wrap(club))
    }

    pub(crate) fn club_members(self: &Arc<Self>, tag: &str) -> Result<Model<Members>> {
        let endpoint = self.pipeline.resolver.club_members(&self.pipeline.tag(tag)?);
        let members = self.fetch_items::<ClubMember>(&endpoint)?;
        Ok(self.wrap(members))
    }

    pub(crate) fn brawler_id(&self, brawler: &BrawlerRef) -> Result<u32> {
        let name = match brawler {
            BrawlerRef::Id(id) => return Ok(*id),
            BrawlerRef::Name(name) => name,
        };
        let known = self
            .brawlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let index = match known {
            Some(index) => index,
            None => {
                let endpoint = self.pipeline.resolver.brawlers();
                let list = self.fetch_items::<Brawler>(&endpoint)?;
                let index = Arc::new(brawlers::index(&list));
                *self.brawlers.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(index.clone());
                index
            }
        };
        brawlers::lookup(&index, name)
    }

    pub(crate) fn ranking(self: &Arc<Self>, endpoint: &Endpoint) -> Result<Model<Ranking>> {
        let entries = self.fetch_items(endpoint)?;
        Ok(self.wrap(entries))
    }
}

/// Blocking client for the Brawl Stars API.
pub struct Client {
    handle: Arc<Handle>,
}

impl Client {
    pub fn new(api_key: &str) -> Result<Self> {
        ClientBuilder::new(api_key).build_blocking()
    }

    pub fn builder(api_key: &str) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    pub fn get_player(&self, tag: &str) -> Result<Model<Player>> {
        self.handle.player(tag)
    }

    pub fn get_club(&self, tag: &str) -> Result<Model<Club>> {
        self.handle.club(tag)
    }

    pub fn get_club_members(&self, tag: &str) -> Result<Model<Members>> {
        self.handle.club_members(tag)
    }

    pub fn get_battle_log(&self, tag: &str) -> Result<Model<BattleLog>> {
        let pipeline = &self.handle.pipeline;
        let endpoint = pipeline.resolver.battle_log(&pipeline.tag(tag)?);
        let battles = self.handle.fetch_items::<Battle>(&endpoint)?;
        Ok(self.handle.wrap(battles))
    }

    pub fn get_brawlers(&self) -> Result<Model<Vec<Brawler>>> {
        let endpoint = self.handle.pipeline.resolver.brawlers();
        let list = self.handle.fetch_items(&endpoint)?;
        Ok(self.handle.wrap(list))
    }

    pub fn get_event_rotation(&self) -> Result<Model<Vec<ScheduledEvent>>> {
        let endpoint = self.handle.pipeline.resolver.event_rotation();
        let events = self.handle.fetch(&endpoint)?;
        Ok(self.handle.wrap(events))
    }

    pub fn get_constants(&self, key: Option<&str>) -> Result<Model<Value>> {
        let endpoint = self.handle.pipeline.resolver.constants();
        let data = self.handle.request(&endpoint)?;
        let data = pipeline::select_constant(data, key)?;
        Ok(self.handle.wrap(data))
    }

    pub fn rankings(&self, kind: RankingKind) -> RankingsRequestBuilder<Handle> {
        RankingsRequestBuilder::new(self.handle.clone(), kind)
    }

    pub fn get_player_rankings(&self, region: &str, limit: u32) -> Result<Model<Ranking>> {
        self.rankings(RankingKind::Players)
            .region(region)
            .limit(limit)
            .send()
    }

    pub fn get_club_rankings(&self, region: &str, limit: u32) -> Result<Model<Ranking>> {
        self.rankings(RankingKind::Clubs)
            .region(region)
            .limit(limit)
            .send()
    }

    pub fn get_brawler_rankings(
        &self,
        brawler: impl Into<BrawlerRef>,
        region: &str,
        limit: u32,
    ) -> Result<Model<Ranking>> {
        self.rankings(RankingKind::Brawlers)
            .brawler(brawler)
            .region(region)
            .limit(limit)
            .send()
    }

    /// Fetch several players one after the other, in request order.
    pub fn get_players(&self, tags: &[&str]) -> Result<Vec<Model<Player>>> {
        let pipeline = &self.handle.pipeline;
        let endpoints = tags
            .iter()
            .map(|tag| Ok(pipeline.resolver.player(&pipeline.tag(tag)?)))
            .collect::<Result<Vec<_>>>()?;
        self.handle.fetch_batch(endpoints)
    }

    pub fn get_clubs(&self, tags: &[&str]) -> Result<Vec<Model<Club>>> {
        let pipeline = &self.handle.pipeline;
        let endpoints = tags
            .iter()
            .map(|tag| Ok(pipeline.resolver.club(&pipeline.tag(tag)?)))
            .collect::<Result<Vec<_>>>()?;
        self.handle.fetch_batch(endpoints)
    }

    pub fn rate_state(&self) -> RateState {
        self.handle.pipeline.rate_state()
    }

    pub fn cache_len(&self) -> usize {
        self.handle.pipeline.cache_len()
    }

    pub fn clear_cache(&self) {
        self.handle.pipeline.clear_cache()
    }

    pub fn close(self) {
        tracing::debug!("closing blocking client");
    }
}

impl Clone for Client {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("blocking::Client")
            .field("base_url", &self.handle.pipeline.config.base_url)
            .field("timeout", &self.handle.pipeline.config.timeout)
            .finish()
    }
}

impl ClientBuilder {
    pub fn build_blocking(self) -> Result<Client> {
        let (api_key, config, session) = self.into_blocking_parts()?;
        let web = match session {
            Some(web) => web,
            None => reqwest::blocking::Client::builder().build().map_err(|e| {
                Error::InvalidArgument(format!("unable to build HTTP client: {}", e))
            })?,
        };
        let handle = Handle {
            web,
            pipeline: Pipeline::new(&api_key, config)?,
            brawlers: Mutex::new(None),
        };
        Ok(Client {
            handle: Arc::new(handle),
        })
    }
}
