//! Creature descriptor retrieval
//!
//! The core only needs a batch of `(stable id, name, sprite)` triples. Where
//! they come from is behind [`CreatureSource`]; this module ships an
//! in-memory source, a TTL cache wrapper, and (with `http-source`) a client
//! for the public creature API.

pub mod cache;
#[cfg(feature = "http-source")]
pub mod http;

pub use cache::CachedCreatureSource;
#[cfg(feature = "http-source")]
pub use http::PokeApiSource;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Base URL for front-facing sprite images
pub const SPRITE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// Error type for creature batch retrieval
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Creature source unavailable: {0}")]
    Unavailable(String),
}

/// One creature species as reported by the external catalogue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreatureDescriptor {
    /// Species identifier, safe to embed in a URL path segment
    pub stable_id: String,
    pub display_name: String,
    pub sprite_url: String,
}

impl CreatureDescriptor {
    /// Build a descriptor with the default sprite URL for `stable_id`
    pub fn new(stable_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let stable_id = stable_id.into();
        let sprite_url = sprite_url_for(&stable_id);
        Self {
            stable_id,
            display_name: display_name.into(),
            sprite_url,
        }
    }

    /// Build a descriptor from a catalogue entry's name and canonical resource URL
    ///
    /// Returns `None` when the URL carries no species id.
    pub fn from_resource(name: &str, resource_url: &str) -> Option<Self> {
        let id = creature_id_from_url(resource_url)?;
        Some(Self::new(id, name))
    }
}

/// Extract the numeric species id from a `.../pokemon/<id>/` resource URL
pub fn creature_id_from_url(url: &str) -> Option<String> {
    let segments: Vec<&str> = url.split('/').collect();
    segments.windows(2).find_map(|pair| {
        let (kind, id) = (pair[0], pair[1]);
        let numeric = !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit());
        (kind == "pokemon" && numeric).then(|| id.to_string())
    })
}

/// Sprite image URL for a species id
pub fn sprite_url_for(stable_id: &str) -> String {
    format!("{SPRITE_BASE_URL}/{stable_id}.png")
}

/// Source of creature descriptor batches
///
/// `fetch_batch(limit, offset)` returns up to `limit` descriptors starting at
/// `offset` in the catalogue's order.
#[async_trait::async_trait]
pub trait CreatureSource: Send + Sync {
    async fn fetch_batch(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreatureDescriptor>, SourceError>;
}

#[async_trait::async_trait]
impl<S: CreatureSource + ?Sized> CreatureSource for Arc<S> {
    async fn fetch_batch(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreatureDescriptor>, SourceError> {
        (**self).fetch_batch(limit, offset).await
    }
}

/// In-memory creature catalogue
#[derive(Debug, Default)]
pub struct StaticCreatureSource {
    catalogue: Vec<CreatureDescriptor>,
    unavailable: bool,
    fetches: AtomicUsize,
}

impl StaticCreatureSource {
    pub fn new(catalogue: Vec<CreatureDescriptor>) -> Self {
        Self {
            catalogue,
            unavailable: false,
            fetches: AtomicUsize::new(0),
        }
    }

    /// A source whose every fetch fails
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    /// Number of `fetch_batch` calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.catalogue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogue.is_empty()
    }
}

#[async_trait::async_trait]
impl CreatureSource for StaticCreatureSource {
    async fn fetch_batch(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreatureDescriptor>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(SourceError::Unavailable("catalogue offline".to_string()));
        }

        Ok(self
            .catalogue
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
