use crate::config::{self, MirrorConfig};
use crate::error::{MirrorError, Result};
use crate::traits::PackageBackend;
use crate::types::Mirror;
use crate::utils;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of `unset_default`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unset {
    Removed(Mirror),
    NothingSet,
}

/// Decides which mirror an action runs against.
///
/// Priority: explicit name, then the persisted default, then the fastest
/// mirror from a fresh probe run. The config is loaded by the caller and
/// written back here only when a mutating call succeeds.
pub struct Selector<'a> {
    catalog: &'a [Mirror],
    backend: &'a dyn PackageBackend,
    probe_timeout: Duration,
    config: &'a mut MirrorConfig,
    config_path: &'a Path,
}

impl<'a> Selector<'a> {
    pub fn new(
        catalog: &'a [Mirror],
        backend: &'a dyn PackageBackend,
        probe_timeout: Duration,
        config: &'a mut MirrorConfig,
        config_path: &'a Path,
    ) -> Self {
        Self {
            catalog,
            backend,
            probe_timeout,
            config,
            config_path,
        }
    }

    fn lookup(&self, name: &str) -> Result<Mirror> {
        config::find_mirror(self.catalog, name)
            .cloned()
            .ok_or_else(|| MirrorError::UnknownMirror(name.to_string()))
    }

    async fn fastest(&self) -> Result<Mirror> {
        println!("Testing all mirrors to find the fastest one...");
        let results = utils::probe_all(self.backend, self.catalog, self.probe_timeout).await;
        let best = results
            .into_iter()
            .find(|r| r.success)
            .ok_or(MirrorError::NoAvailableEndpoint)?;

        println!("Fastest mirror is {} ({:.2}s)", best.mirror.name, best.latency_secs);
        Ok(best.mirror)
    }

    async fn persist(&self) {
        // A write failure only loses the remembered choice
        if let Err(e) = self.config.save(self.config_path).await {
            warn!(path = %self.config_path.display(), "failed to save config: {}", e);
        }
    }

    pub async fn resolve(&self, explicit: Option<&str>) -> Result<Mirror> {
        if let Some(name) = explicit {
            return self.lookup(name);
        }
        if let Some(mirror) = &self.config.default_mirror {
            info!(mirror = %mirror.name, "using default mirror");
            println!("Using default mirror: {}", mirror.name);
            return Ok(mirror.clone());
        }
        self.fastest().await
    }

    /// `url` overrides the catalog URL. A name outside the catalog, or a URL
    /// that differs from the catalog entry, is accepted with a warning; a URL
    /// pip could not be pointed at (no scheme or host) is rejected.
    pub async fn set_default(&mut self, name: Option<&str>, url: Option<&str>) -> Result<Mirror> {
        let mirror = match (name, url) {
            (Some(name), Some(url)) => {
                utils::trusted_host(url)?;
                let known = config::find_mirror(self.catalog, name);
                if !known.is_some_and(|m| m.same_url(url)) {
                    warn!(mirror = name, url, "mirror is not in the catalog or its URL does not match");
                    eprintln!(
                        "Warning: mirror '{}' is not in the built-in list or its URL does not match",
                        name
                    );
                }
                let name = known.map_or(name, |m| m.name.as_str());
                Mirror::new(name, url)
            }
            (Some(name), None) => self.lookup(name)?,
            (None, Some(_)) => {
                return Err(MirrorError::Config("--url requires --mirror".to_string()));
            }
            (None, None) => self.fastest().await?,
        };

        self.config.default_mirror = Some(mirror.clone());
        self.persist().await;
        Ok(mirror)
    }

    pub async fn unset_default(&mut self) -> Unset {
        match self.config.default_mirror.take() {
            Some(previous) => {
                self.persist().await;
                Unset::Removed(previous)
            }
            None => Unset::NothingSet,
        }
    }

    pub fn show_default(&self) -> Option<&Mirror> {
        self.config.default_mirror.as_ref()
    }
}
