//! YAML-backed safe-zone and responder registry with hot reload via `notify`.
//!
//! The file holds a single [`RegistrySnapshot`](vigil_core::RegistrySnapshot):
//!
//! ```yaml
//! zones:
//!   - id: home
//!     name: Home
//!     center: { lat: 6.9271, lng: 79.8612 }
//!     radiusMeters: 200
//!     trusted: true
//! responders:
//!   - id: unit-7
//!     name: Unit 7
//!     class: medical
//!     location: { lat: 6.93, lng: 79.85 }
//! ```

mod core;
mod error;
mod watcher;


pub use self::core::{LoadedRegistry, RegistryLoader};
pub use self::error::{RegistryError, Result};
