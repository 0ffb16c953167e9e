pub mod battlelog;
pub mod blocking;
pub mod brawlers;
pub mod cache;
pub mod classify;
pub mod clubs;
pub mod config;
pub mod endpoint;
pub mod events;
pub mod governor;
pub mod model;
pub mod players;
pub mod rankings;
pub mod tag;

mod pipeline;
mod transport;

use crate::battlelog::{Battle, BattleLog};
use crate::brawlers::{Brawler, BrawlerRef};
use crate::clubs::{Club, ClubMember, Members};
use crate::endpoint::{Endpoint, RankingKind};
use crate::events::ScheduledEvent;
use crate::pipeline::{Admission, Pipeline};
use crate::players::Player;
use crate::rankings::RankingsRequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

pub use crate::config::{AuthScheme, ClientBuilder, Config, RateLimitBehavior};
pub use crate::governor::{RateGovernor, RateState, TokenBucket};
pub use crate::tag::{Tag, TagError};

pub type Result<T> = core::result::Result<T, Error>;

/// A decoded response tied to the async [`Client`] that fetched it.
pub type Model<T> = model::Model<T, Handle>;

#[derive(Debug)]
pub enum Error {
    /// The API key is invalid or blocked.
    Unauthorized { url: String },
    /// The key is not allowed from this IP, or for this resource.
    Forbidden { url: String, message: String },
    /// The tag or resource does not exist.
    NotFound { url: String },
    /// The tag was rejected before any request was made.
    InvalidTag(TagError),
    RateLimited { url: String, retry_after: Duration },
    Maintenance { url: String },
    ServerError { url: String, code: u16 },
    Unexpected { url: String, code: u16, body: String },
    InvalidArgument(String),
    DuplicateRequest(String),
    UnknownConstant(String),
    /// The client that produced a model has been closed or dropped.
    ClientClosed,
}

impl Error {
    /// HTTP-style machine code of the error.
    pub fn code(&self) -> u16 {
        match self {
            Error::Unauthorized { .. } => 401,
            Error::Forbidden { .. } => 403,
            Error::NotFound { .. } | Error::InvalidTag(_) | Error::UnknownConstant(_) => 404,
            Error::RateLimited { .. } => 429,
            Error::Maintenance { .. } => 503,
            Error::ServerError { code, .. } | Error::Unexpected { code, .. } => *code,
            Error::InvalidArgument(_) | Error::DuplicateRequest(_) | Error::ClientClosed => 400,
        }
    }

    /// Whether trying the same call again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimited { .. } | Error::Maintenance { .. } | Error::ServerError { .. }
        )
    }

    /// True for both a missing resource and a tag rejected locally.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::InvalidTag(_))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Unauthorized { url } => {
                write!(f, "Your API key is invalid or blocked.\nURL: {}", url)
            }
            Error::Forbidden { url, message } => {
                write!(f, "Access denied: {}\nURL: {}", message, url)
            }
            Error::NotFound { url } => {
                write!(f, "The tag or resource you requested was not found.\nURL: {}", url)
            }
            Error::InvalidTag(e) => e.fmt(f),
            Error::RateLimited { url, retry_after } => write!(
                f,
                "You are being rate limited, retry in {:.2}s.\nURL: {}",
                retry_after.as_secs_f64(),
                url
            ),
            Error::Maintenance { url } => write!(
                f,
                "The API is down for maintenance. Please be patient and try again later.\nURL: {}",
                url
            ),
            Error::ServerError { url, code } => write!(
                f,
                "The API is down ({}). Please be patient and try again later.\nURL: {}",
                code, url
            ),
            Error::Unexpected { url, code, body } => write!(
                f,
                "An unexpected error has occurred ({}): {}\nURL: {}",
                code, body, url
            ),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::DuplicateRequest(url) => {
                write!(f, "The same request was issued twice in one batch: {}", url)
            }
            Error::UnknownConstant(key) => write!(f, "No such constants key \"{}\"", key),
            Error::ClientClosed => write!(f, "The client has been closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidTag(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TagError> for Error {
    fn from(e: TagError) -> Self {
        Error::InvalidTag(e)
    }
}

/// Shared state behind an async [`Client`] and every [`Model`] it returns.
#[derive(Debug)]
pub struct Handle {
    pub web: reqwest::Client,
    pub(crate) pipeline: Pipeline,
    brawlers: tokio::sync::OnceCell<HashMap<String, u32>>,
}

impl Handle {
    fn wrap<T>(self: &Arc<Self>, data: T) -> Model<T> {
        Model::new(data, Arc::downgrade(self))
    }

    async fn request(&self, endpoint: &Endpoint) -> Result<Value> {
        loop {
            match self.pipeline.admit(endpoint)? {
                Admission::Cached(hit) => return Ok(hit),
                Admission::Wait(wait) => tokio::time::sleep(wait).await,
                Admission::Send => break,
            }
        }
        let raw = transport::get(
            &self.web,
            self.pipeline.headers(),
            endpoint,
            self.pipeline.config.timeout,
        )
        .await?;
        self.pipeline.complete(endpoint, raw)
    }

    async fn fetch<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T> {
        let value = self.request(endpoint).await?;
        pipeline::decode(endpoint, value)
    }

    async fn fetch_items<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<Vec<T>> {
        let value = self.request(endpoint).await?;
        pipeline::decode_items(endpoint, value)
    }

    async fn fetch_batch<T: DeserializeOwned>(
        self: &Arc<Self>,
        endpoints: Vec<Endpoint>,
    ) -> Result<Vec<Model<T>>> {
        pipeline::ensure_unique(&endpoints)?;
        let requests = endpoints
            .iter()
            .map(|endpoint| self.fetch::<T>(endpoint))
            .collect::<Vec<_>>();
        futures::future::join_all(requests)
            .await
            .into_iter()
            .map(|res| res.map(|data| self.wrap(data)))
            .collect()
    }

    pub(crate) async fn player(self: &Arc<Self>, tag: &str) -> Result<Model<Player>> {
        let endpoint = self.pipeline.resolver.player(&self.pipeline.tag(tag)?);
        let player = self.fetch(&endpoint).await?;
        Ok(self.wrap(player))
    }

    pub(crate) async fn club(self: &Arc<Self>, tag: &str) -> Result<Model<Club>> {
        let endpoint = self.pipeline.resolver.club(&self.pipeline.tag(tag)?);
        let club = self.fetch(&endpoint).await?;
        Ok(self.wrap(club))
    }

    pub(crate) async fn club_members(self: &Arc<Self>, tag: &str) -> Result<Model<Members>> {
        let endpoint = self.pipeline.resolver.club_members(&self.pipeline.tag(tag)?);
        let members = self.fetch_items::<ClubMember>(&endpoint).await?;
        Ok(self.wrap(members))
    }

    pub(crate) async fn brawler_id(&self, brawler: &BrawlerRef) -> Result<u32> {
        let name = match brawler {
            BrawlerRef::Id(id) => return Ok(*id),
            BrawlerRef::Name(name) => name,
        };
        let index = self
            .brawlers
            .get_or_try_init(|| async {
                let endpoint = self.pipeline.resolver.brawlers();
                let list = self.fetch_items::<Brawler>(&endpoint).await?;
                Ok::<_, Error>(brawlers::index(&list))
            })
            .await?;
        brawlers::lookup(index, name)
    }

    pub(crate) async fn ranking<T: DeserializeOwned>(
        self: &Arc<Self>,
        endpoint: &Endpoint,
    ) -> Result<Model<Vec<T>>> {
        let entries = self.fetch_items(endpoint).await?;
        Ok(self.wrap(entries))
    }
}

/// Async client for the Brawl Stars API.
///
/// Every call suspends only the calling task; cloning is cheap and all clones
/// share one session, cache and rate state.
pub struct Client {
    handle: Arc<Handle>,
}

impl Client {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::builder(api_key).build()
    }

    pub fn builder(api_key: &str) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    /// Get a player's profile.
    ///
    /// Valid tag characters: 0289PYLQGRJCUV
    pub async fn get_player(&self, tag: &str) -> Result<Model<Player>> {
        self.handle.player(tag).await
    }

    pub async fn get_club(&self, tag: &str) -> Result<Model<Club>> {
        self.handle.club(tag).await
    }

    pub async fn get_club_members(&self, tag: &str) -> Result<Model<Members>> {
        self.handle.club_members(tag).await
    }

    /// Get a player's most recent battles.
    pub async fn get_battle_log(&self, tag: &str) -> Result<Model<BattleLog>> {
        let endpoint = self.handle.pipeline.resolver.battle_log(&self.handle.pipeline.tag(tag)?);
        let battles = self.handle.fetch_items::<Battle>(&endpoint).await?;
        Ok(self.handle.wrap(battles))
    }

    pub async fn get_brawlers(&self) -> Result<Model<Vec<Brawler>>> {
        let endpoint = self.handle.pipeline.resolver.brawlers();
        let list = self.handle.fetch_items(&endpoint).await?;
        Ok(self.handle.wrap(list))
    }

    /// Get the events currently in rotation.
    pub async fn get_event_rotation(&self) -> Result<Model<Vec<ScheduledEvent>>> {
        let endpoint = self.handle.pipeline.resolver.event_rotation();
        let events = self.handle.fetch(&endpoint).await?;
        Ok(self.handle.wrap(events))
    }

    /// Get the game constants, or only the section under `key`.
    pub async fn get_constants(&self, key: Option<&str>) -> Result<Model<Value>> {
        let endpoint = self.handle.pipeline.resolver.constants();
        let data = self.handle.request(&endpoint).await?;
        let data = pipeline::select_constant(data, key)?;
        Ok(self.handle.wrap(data))
    }

    pub fn rankings(&self, kind: RankingKind) -> RankingsRequestBuilder<Handle> {
        RankingsRequestBuilder::new(self.handle.clone(), kind)
    }

    pub async fn get_player_rankings(
        &self,
        region: &str,
        limit: u32,
    ) -> Result<Model<rankings::Ranking>> {
        self.rankings(RankingKind::Players)
            .region(region)
            .limit(limit)
            .send()
            .await
    }

    pub async fn get_club_rankings(
        &self,
        region: &str,
        limit: u32,
    ) -> Result<Model<rankings::Ranking>> {
        self.rankings(RankingKind::Clubs)
            .region(region)
            .limit(limit)
            .send()
            .await
    }

    pub async fn get_brawler_rankings(
        &self,
        brawler: impl Into<BrawlerRef>,
        region: &str,
        limit: u32,
    ) -> Result<Model<rankings::Ranking>> {
        self.rankings(RankingKind::Brawlers)
            .brawler(brawler)
            .region(region)
            .limit(limit)
            .send()
            .await
    }

    /// Fetch several players at once. Results come back in request order.
    ///
    /// Two tags resolving to the same URL are rejected before anything is sent.
    pub async fn get_players(&self, tags: &[&str]) -> Result<Vec<Model<Player>>> {
        let endpoints = tags
            .iter()
            .map(|tag| Ok(self.handle.pipeline.resolver.player(&self.handle.pipeline.tag(tag)?)))
            .collect::<Result<Vec<_>>>()?;
        self.handle.fetch_batch(endpoints).await
    }

    pub async fn get_clubs(&self, tags: &[&str]) -> Result<Vec<Model<Club>>> {
        let endpoints = tags
            .iter()
            .map(|tag| Ok(self.handle.pipeline.resolver.club(&self.handle.pipeline.tag(tag)?)))
            .collect::<Result<Vec<_>>>()?;
        self.handle.fetch_batch(endpoints).await
    }

    /// Rate limit window as last reported by the API.
    pub fn rate_state(&self) -> RateState {
        self.handle.pipeline.rate_state()
    }

    pub fn cache_len(&self) -> usize {
        self.handle.pipeline.cache_len()
    }

    pub fn clear_cache(&self) {
        self.handle.pipeline.clear_cache()
    }

    /// Release the session. Models still around will fail their follow-up
    /// calls with [`Error::ClientClosed`] once no clone of this client remains.
    pub fn close(self) {
        tracing::debug!("closing client");
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
        f.debug_struct("Client")
            .field("base_url", &self.handle.pipeline.config.base_url)
            .field("timeout", &self.handle.pipeline.config.timeout)
            .finish()
    }
}

impl ClientBuilder {
    pub fn build(self) -> Result<Client> {
        let (api_key, config, session) = self.into_parts()?;
        let web = match session {
            Some(web) => web,
            None => reqwest::Client::builder().build().map_err(|e| {
                Error::InvalidArgument(format!("unable to build HTTP client: {}", e))
            })?,
        };
        let handle = Handle {
            web,
            pipeline: Pipeline::new(&api_key, config)?,
            brawlers: tokio::sync::OnceCell::new(),
        };
        Ok(Client {
            handle: Arc::new(handle),
        })
    }
}
