//! Profile file watcher for hot-reload support
//!
//! Profiles cannot change under a running engine, so the watcher only delivers
//! freshly loaded and validated profiles; the receiver decides when to stop,
//! load and start again.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::profile::MappingProfile;

/// Profile watcher that reloads on file changes
pub struct ProfileWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<MappingProfile>,
}

impl ProfileWatcher {
    /// Load the profile at `path` and start watching it
    pub async fn new(path: impl Into<PathBuf>) -> Result<(Self, MappingProfile)> {
        let path = path.into();
        let (tx, rx) = mpsc::channel(4);

        let initial = MappingProfile::load(&path)
            .await
            .context("Failed to load initial profile")?;

        // notify callbacks run on their own OS thread, outside the runtime
        let runtime_handle = tokio::runtime::Handle::current();
        let watched = path.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) if matches!(event.kind, EventKind::Modify(_)) => {
                    debug!("Profile file modified: {:?}", event.paths);

                    let path = watched.clone();
                    let tx = tx.clone();
                    runtime_handle.spawn(async move {
                        // Let the editor finish writing
                        tokio::time::sleep(Duration::from_millis(100)).await;

                        match MappingProfile::load(&path).await {
                            Ok(profile) => {
                                info!("📋 Profile '{}' reloaded", profile.name);
                                if let Err(e) = tx.send(profile).await {
                                    error!("Failed to send profile update: {}", e);
                                }
                            }
                            Err(e) => {
                                warn!("Failed to reload profile (keeping current one): {:#}", e);
                            }
                        }
                    });
                }
                Ok(_) => {}
                Err(e) => error!("Watch error: {}", e),
            }
        })?;

        watcher
            .watch(Path::new(&path), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch profile file: {}", path.display()))?;

        info!("Profile watcher started for: {}", path.display());

        Ok((
            Self {
                _watcher: watcher,
                rx,
            },
            initial,
        ))
    }

    /// Wait for the next reloaded profile
    ///
    /// Returns `None` once the watcher has shut down.
    pub async fn next_profile(&mut self) -> Option<MappingProfile> {
        self.rx.recv().await
    }
}
