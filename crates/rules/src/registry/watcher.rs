//! Filesystem event handler for the notify watcher (hot reload).

use std::fs;
use std::path::Path;

use notify::{Event, EventKind};
use tracing::{info, warn};

use super::core::{install, parse_registry, SharedRegistry};

/// Handle a single filesystem event from the notify watcher.
///
/// The watcher observes the whole directory, so events for other files are
/// ignored. Removal keeps the last good snapshot.
pub(super) fn handle_fs_event(event: &Event, current: &SharedRegistry, registry_path: &Path) {
    let Some(target) = registry_path.file_name() else {
        return;
    };
    if !event.paths.iter().any(|p| p.file_name() == Some(target)) {
        return;
    }

    match &event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => match fs::read_to_string(registry_path) {
            Ok(contents) => match parse_registry(&contents) {
                Ok(snapshot) => {
                    info!(
                        path = %registry_path.display(),
                        zones = snapshot.zones.len(),
                        responders = snapshot.responders.len(),
                        "hot-reloaded registry"
                    );
                    install(current, snapshot);
                }
                Err(e) => {
                    warn!(
                        path = %registry_path.display(),
                        error = %e,
                        "failed to parse registry during hot-reload, keeping previous version"
                    );
                }
            },
            Err(e) => {
                warn!(path = %registry_path.display(), error = %e, "failed to read registry during hot-reload");
            }
        },
        EventKind::Remove(_) => {
            warn!(path = %registry_path.display(), "registry file removed, keeping previous version");
        }
        _ => {}
    }
}
