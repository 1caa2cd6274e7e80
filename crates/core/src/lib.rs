pub mod config;
pub mod error;
pub mod geo;
pub mod ingest;
pub mod reading;
pub mod registry;

pub use config::Config;
pub use error::*;
pub use geo::*;
pub use ingest::{ingest, ingest_at, parse_batch, parse_line, Sample, SampleValue};
pub use reading::*;
pub use registry::*;
