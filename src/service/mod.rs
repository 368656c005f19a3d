//! Domain services sitting between the HTTP handlers and the repositories.

mod playlist;
mod track;

pub use playlist::PlaylistService;
pub use track::{AudioUpload, TrackService};

use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

use crate::cache::{self, Cache};

/// Optional cache of single records keyed `<prefix>:<id>`.
///
/// Cache failures are logged and otherwise ignored.
#[derive(Clone)]
struct RecordCache {
    cache: Option<Arc<dyn Cache>>,
    prefix: &'static str,
}

impl RecordCache {
    fn disabled(prefix: &'static str) -> Self {
        Self {
            cache: None,
            prefix,
        }
    }

    fn key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }

    async fn get<T: DeserializeOwned>(&self, id: &str) -> Option<T> {
        let cache = self.cache.as_deref()?;
        match cache::get_json(cache, &self.key(id)).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {:#}", self.key(id), e);
                None
            }
        }
    }

    async fn put<T: Serialize>(&self, id: &str, value: &T) {
        if let Some(cache) = self.cache.as_deref() {
            if let Err(e) = cache::set_json(cache, &self.key(id), value).await {
                tracing::warn!("Cache write failed for {}: {:#}", self.key(id), e);
            }
        }
    }

    async fn forget(&self, id: &str) {
        if let Some(cache) = self.cache.as_deref() {
            if let Err(e) = cache.del(&self.key(id)).await {
                tracing::warn!("Cache invalidation failed for {}: {:#}", self.key(id), e);
            }
        }
    }
}
