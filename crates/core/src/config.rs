use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    profiled_env_opt(profile, key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub geofence: GeofenceConfig,
    pub dispatch: DispatchConfig,
    pub schedule: ScheduleConfig,
    pub registry: RegistryConfig,
    pub worker: WorkerConfig,
    pub audit: AuditConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `VIGIL_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("VIGIL_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            geofence: GeofenceConfig::from_env_profiled(p),
            dispatch: DispatchConfig::from_env_profiled(p),
            schedule: ScheduleConfig::from_env_profiled(p),
            registry: RegistryConfig::from_env_profiled(p),
            worker: WorkerConfig::from_env_profiled(p),
            audit: AuditConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  geofence:  emergency_after={}s, sampling_interval={}s",
            self.geofence.emergency_after_secs,
            self.geofence.sampling_interval_secs
        );
        tracing::info!("  dispatch:  max_responders={}", self.dispatch.max_responders);
        tracing::info!(
            "  schedule:  night={}:00-{}:00 UTC",
            self.schedule.night_start_hour,
            self.schedule.night_end_hour
        );
        tracing::info!(
            "  registry:  path={}, watch={}",
            self.registry.path.display(),
            self.registry.watch
        );
        tracing::info!("  worker:    queue_capacity={}", self.worker.queue_capacity);
        tracing::info!("  audit:     max_entries={}", self.audit.max_entries_per_subject);
    }
}

// ── Geofence ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceConfig {
    /// Continuous time outside every active zone before the emergency latch fires.
    pub emergency_after_secs: u32,
    /// Period of the wall-clock tick that advances every outside timer.
    pub sampling_interval_secs: u32,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            emergency_after_secs: 300,
            sampling_interval_secs: 10,
        }
    }
}

impl GeofenceConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            emergency_after_secs: profiled_env_u32(p, "EMERGENCY_AFTER_SECS", d.emergency_after_secs),
            sampling_interval_secs: profiled_env_u32(
                p,
                "SAMPLING_INTERVAL_SECS",
                d.sampling_interval_secs,
            ),
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub max_responders: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { max_responders: 2 }
    }
}

impl DispatchConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_responders: profiled_env_usize(p, "MAX_RESPONDERS", Self::default().max_responders),
        }
    }
}

// ── Day / night ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// First hour (UTC, 0-23) counted as night.
    pub night_start_hour: u32,
    /// First hour (UTC, 0-23) counted as day again.
    pub night_end_hour: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            night_start_hour: 20,
            night_end_hour: 6,
        }
    }
}

impl ScheduleConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            night_start_hour: profiled_env_u32(p, "NIGHT_START_HOUR", d.night_start_hour) % 24,
            night_end_hour: profiled_env_u32(p, "NIGHT_END_HOUR", d.night_end_hour) % 24,
        }
    }

    /// Whether `hour` (0-23) falls in the night window. Handles windows
    /// that wrap past midnight as well as ones that don't.
    pub fn is_night_hour(&self, hour: u32) -> bool {
        let (start, end) = (self.night_start_hour, self.night_end_hour);
        if start == end {
            false
        } else if start > end {
            hour >= start || hour < end
        } else {
            hour >= start && hour < end
        }
    }
}

// ── Registry ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// YAML file holding safe zones and responders.
    pub path: PathBuf,
    /// Hot-reload the file on change.
    pub watch: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/registry.yml"),
            watch: false,
        }
    }
}

impl RegistryConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            path: PathBuf::from(profiled_env_or(p, "REGISTRY_PATH", "data/registry.yml")),
            watch: profiled_env_bool(p, "REGISTRY_WATCH", false),
        }
    }
}

// ── Worker ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Bounded queue depth per subject worker.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

impl WorkerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            queue_capacity: profiled_env_usize(p, "WORKER_QUEUE_CAPACITY", 256).max(1),
        }
    }
}

// ── Audit ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub max_entries_per_subject: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_entries_per_subject: 500,
        }
    }
}

impl AuditConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_entries_per_subject: profiled_env_usize(p, "AUDIT_MAX_ENTRIES", 500),
        }
    }
}
