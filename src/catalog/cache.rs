//! Remote catalog with a file-backed, time-limited cache.
//!
//! The in-memory listing is an immutable snapshot behind an `Arc`; a refresh
//! builds a complete new map and swaps it in, so readers always see either
//! the old listing or the new one. Refreshes (and the lazy first load) are
//! serialized by `refresh_lock`, held from the request until the swap.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, SystemTime};

use crate::error::{ModError, classify};
use crate::http::{HttpClient, ProgressObserver, is_not_found};
use crate::runtime::Runtime;

use super::{RemoteListing, RemoteVersion};

/// A cache file older than this is refreshed on first access.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub type Listings = Arc<HashMap<String, RemoteListing>>;

pub struct RemoteCatalog<'a, R: Runtime> {
    runtime: &'a R,
    http: HttpClient,
    listing_url: String,
    cache_file: PathBuf,
    download_root: PathBuf,
    listings: RwLock<Listings>,
    refresh_lock: tokio::sync::Mutex<()>,
    last_refresh: Mutex<Option<SystemTime>>,
}

impl<'a, R: Runtime> RemoteCatalog<'a, R> {
    pub fn new(
        runtime: &'a R,
        http: HttpClient,
        listing_url: impl Into<String>,
        cache_file: PathBuf,
        download_root: PathBuf,
    ) -> Self {
        Self {
            runtime,
            http,
            listing_url: listing_url.into(),
            cache_file,
            download_root,
            listings: RwLock::new(Arc::new(HashMap::new())),
            refresh_lock: tokio::sync::Mutex::new(()),
            last_refresh: Mutex::new(None),
        }
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// When this process last completed a successful refresh.
    pub fn last_refresh(&self) -> Option<SystemTime> {
        *self
            .last_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current in-memory listing, possibly empty. Never touches disk or network.
    pub fn snapshot(&self) -> Listings {
        self.listings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, listings: Vec<RemoteListing>) -> usize {
        let map: HashMap<String, RemoteListing> = listings
            .into_iter()
            .map(|listing| (listing.full_name.clone(), listing))
            .collect();
        let count = map.len();
        *self
            .listings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(map);
        count
    }

    /// Fetch the listing endpoint and replace both the cache file and the
    /// in-memory map. On failure neither is touched.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> Result<usize> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<usize> {
        info!("Refreshing catalog from {}...", self.listing_url);

        let body = self
            .http
            .fetch(&self.listing_url)
            .await
            .map_err(|e| {
                let reason = format!("{:#}", e);
                e.context(ModError::NetworkFailure(reason))
            })?;

        let listings: Vec<RemoteListing> = serde_json::from_slice(&body).map_err(|e| {
            ModError::NetworkFailure(format!("catalog response is not a valid listing: {}", e))
        })?;

        self.write_cache_file(&body)?;
        let count = self.replace(listings);

        *self
            .last_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(self.runtime.now());
        info!("Catalog refreshed: {} package(s)", count);
        Ok(count)
    }

    fn write_cache_file(&self, body: &[u8]) -> Result<()> {
        if let Some(parent) = self.cache_file.parent() {
            self.runtime.create_dir_all(parent)?;
        }
        let tmp = self.cache_file.with_extension("json.tmp");
        self.runtime
            .write(&tmp, body)
            .with_context(|| format!("Failed to write catalog cache {:?}", tmp))?;
        self.runtime
            .rename(&tmp, &self.cache_file)
            .with_context(|| format!("Failed to replace catalog cache {:?}", self.cache_file))
    }

    /// `Ok` when the cache file exists and is younger than [`CACHE_TTL`],
    /// otherwise [`ModError::CacheStale`].
    pub fn ensure_fresh(&self) -> Result<()> {
        if !self.runtime.exists(&self.cache_file) {
            return Err(ModError::CacheStale {
                path: self.cache_file.clone(),
            }
            .into());
        }
        let modified = self.runtime.modified(&self.cache_file)?;
        let age = self
            .runtime
            .now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > CACHE_TTL {
            debug!("Catalog cache is {:?} old", age);
            return Err(ModError::CacheStale {
                path: self.cache_file.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn load_cache_file(&self) -> Result<usize> {
        let body = self.runtime.read(&self.cache_file)?;
        let listings: Vec<RemoteListing> = serde_json::from_slice(&body)
            .with_context(|| format!("Catalog cache {:?} is corrupt", self.cache_file))?;
        Ok(self.replace(listings))
    }

    /// The listing, loaded lazily.
    ///
    /// An empty in-memory map is filled from the cache file; a missing,
    /// expired or unreadable cache file triggers one refresh first. If that
    /// refresh fails but a readable expired file exists, the expired data is
    /// served.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self) -> Result<Listings> {
        let snapshot = self.snapshot();
        if !snapshot.is_empty() {
            return Ok(snapshot);
        }

        let _guard = self.refresh_lock.lock().await;
        let snapshot = self.snapshot();
        if !snapshot.is_empty() {
            return Ok(snapshot);
        }

        let loaded = match self.ensure_fresh() {
            Ok(()) => match self.load_cache_file() {
                Ok(_) => true,
                Err(e) => {
                    warn!("{:#}; refreshing", e);
                    false
                }
            },
            Err(e) if matches!(classify(&e), Some(ModError::CacheStale { .. })) => {
                info!("{}", e);
                false
            }
            Err(e) => return Err(e),
        };

        if !loaded {
            if let Err(refresh_err) = self.refresh_locked().await {
                if !self.runtime.exists(&self.cache_file) {
                    return Err(refresh_err);
                }
                if let Err(load_err) = self.load_cache_file() {
                    debug!("Expired cache is unusable too: {:#}", load_err);
                    return Err(refresh_err);
                }
                warn!(
                    "Catalog refresh failed, using expired cache: {:#}",
                    refresh_err
                );
            }
        }

        Ok(self.snapshot())
    }

    /// Linear scan over the in-memory listing.
    pub fn search<P>(&self, predicate: P) -> Vec<RemoteListing>
    where
        P: Fn(&RemoteListing) -> bool,
    {
        let mut found: Vec<RemoteListing> = self
            .snapshot()
            .values()
            .filter(|listing| predicate(listing))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        found
    }

    pub fn find(&self, full_name: &str) -> Option<RemoteListing> {
        self.snapshot().get(full_name).cloned()
    }

    /// `<download_root>/<version full_name>.zip`
    pub fn archive_path(&self, version: &RemoteVersion) -> PathBuf {
        self.download_root.join(format!("{}.zip", version.full_name))
    }

    /// Download a version archive, reusing an already downloaded file of
    /// the same name.
    ///
    /// Returns `Ok(None)` when the server does not answer with HTTP 200 or
    /// the transfer fails; local I/O failures are errors.
    #[tracing::instrument(skip(self, version, observer), fields(version = %version.full_name))]
    pub async fn download_archive(
        &self,
        version: &RemoteVersion,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<Option<PathBuf>> {
        let path = self.archive_path(version);
        if self.runtime.exists(&path) {
            debug!("Using cached download {:?}", path);
            return Ok(Some(path));
        }

        self.runtime.create_dir_all(&self.download_root)?;
        let part = path.with_extension("zip.part");

        let result = self
            .http
            .stream_to(
                &version.download_url,
                || {
                    self.runtime
                        .create_file(&part)
                        .with_context(|| format!("Failed to create {:?}", part))
                },
                observer,
            )
            .await;

        match result {
            Ok(bytes) => {
                self.runtime.rename(&part, &path)?;
                info!("Downloaded {} ({} bytes)", version.full_name, bytes);
                Ok(Some(path))
            }
            Err(e) => {
                if is_not_found(&e) {
                    warn!("{} is no longer downloadable: {:#}", version.full_name, e);
                } else {
                    warn!("Download of {} failed: {:#}", version.full_name, e);
                }
                if self.runtime.exists(&part) {
                    self.runtime.remove_file(&part)?;
                }
                Ok(None)
            }
        }
    }
}
