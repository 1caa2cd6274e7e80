//! Core [`RegistryLoader`] struct: file-backed registry with optional hot reload.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use vigil_core::{RegistrySnapshot, RegistrySource, Responder, SafeZone, VigilError};

use super::error::{RegistryError, Result};
use super::watcher::handle_fs_event;

/// The last successfully loaded registry.
#[derive(Debug, Clone)]
pub struct LoadedRegistry {
    pub zones: Arc<[SafeZone]>,
    pub responders: Arc<[Responder]>,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedRegistry {
    pub(super) fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        Self {
            zones: snapshot.zones.into(),
            responders: snapshot.responders.into(),
            loaded_at: Utc::now(),
        }
    }
}

pub(super) type SharedRegistry = Arc<RwLock<Option<LoadedRegistry>>>;

/// File-backed registry with optional hot reload.
///
/// Until the first successful load, [`RegistrySource::zones`] reports
/// [`VigilError::StaleZoneConfiguration`]. A failed reload keeps serving the
/// previous snapshot.
pub struct RegistryLoader {
    path: PathBuf,
    current: SharedRegistry,
    /// Active filesystem watcher (held to keep it alive).
    _watcher: Option<RecommendedWatcher>,
}

impl RegistryLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: Arc::new(RwLock::new(None)),
            _watcher: None,
        }
    }

    /// Parse and validate a registry file without installing it.
    pub fn load_file(path: &Path) -> Result<RegistrySnapshot> {
        let contents = fs::read_to_string(path)?;
        parse_registry(&contents)
    }

    /// (Re)load the registry file and install it as the current snapshot.
    ///
    /// On error the previous snapshot, if any, stays in place.
    pub fn load(&self) -> Result<RegistrySnapshot> {
        match Self::load_file(&self.path) {
            Ok(snapshot) => {
                install(&self.current, snapshot.clone());
                info!(
                    path = %self.path.display(),
                    zones = snapshot.zones.len(),
                    responders = snapshot.responders.len(),
                    "loaded registry"
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to load registry");
                Err(e)
            }
        }
    }

    /// Start a filesystem watcher on the registry file's directory.
    ///
    /// Only events for the registry file itself trigger a reload. Parse
    /// errors are logged as warnings and the previous snapshot is kept.
    pub fn watch(&mut self) -> Result<()> {
        let current = Arc::clone(&self.current);
        let path = self.path.clone();

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => handle_fs_event(&event, &current, &path),
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            },
        )?;

        let dir = watch_dir(&self.path);
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        let _ = watcher.configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)));

        info!(path = %self.path.display(), "watching registry file for changes");
        self._watcher = Some(watcher);
        Ok(())
    }

    /// Atomically write a snapshot to the registry file and install it.
    ///
    /// Writes to a dotted `.tmp` sibling first, then renames.
    pub fn write_snapshot(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        snapshot
            .validate()
            .map_err(|e| RegistryError::Validation(e.to_string()))?;

        let dir = watch_dir(&self.path);
        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("registry.yml");
        let tmp_path = dir.join(format!(".{file_name}.tmp"));

        let yaml = serde_yaml::to_string(snapshot)?;
        fs::write(&tmp_path, yaml)?;
        fs::rename(&tmp_path, &self.path)?;

        install(&self.current, snapshot.clone());
        info!(path = %self.path.display(), "wrote registry file");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The installed registry, if any load has succeeded.
    pub fn current(&self) -> Option<LoadedRegistry> {
        read(&self.current).clone()
    }

    pub fn is_loaded(&self) -> bool {
        read(&self.current).is_some()
    }

    #[cfg(test)]
    pub(super) fn shared(&self) -> SharedRegistry {
        Arc::clone(&self.current)
    }
}

impl RegistrySource for RegistryLoader {
    fn zones(&self) -> vigil_core::Result<Arc<[SafeZone]>> {
        read(&self.current)
            .as_ref()
            .map(|r| Arc::clone(&r.zones))
            .ok_or_else(|| {
                VigilError::StaleZoneConfiguration(format!(
                    "registry '{}' has not been loaded",
                    self.path.display()
                ))
            })
    }

    fn responders(&self) -> Arc<[Responder]> {
        read(&self.current)
            .as_ref()
            .map(|r| Arc::clone(&r.responders))
            .unwrap_or_else(|| Vec::<Responder>::new().into())
    }
}

pub(super) fn parse_registry(contents: &str) -> Result<RegistrySnapshot> {
    let snapshot: RegistrySnapshot = serde_yaml::from_str(contents)?;
    snapshot
        .validate()
        .map_err(|e| RegistryError::Validation(e.to_string()))?;
    Ok(snapshot)
}

pub(super) fn install(current: &SharedRegistry, snapshot: RegistrySnapshot) {
    let mut guard = current.write().unwrap_or_else(|e| e.into_inner());
    *guard = Some(LoadedRegistry::from_snapshot(snapshot));
}

fn read(current: &SharedRegistry) -> RwLockReadGuard<'_, Option<LoadedRegistry>> {
    current.read().unwrap_or_else(|e| e.into_inner())
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
