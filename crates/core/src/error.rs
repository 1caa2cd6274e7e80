use thiserror::Error;

#[derive(Error, Debug)]
pub enum VigilError {
    /// Value outside the physically possible range, or not a number at all.
    /// Raised at the ingestion boundary, before any history is touched.
    #[error("Invalid reading for subject '{subject_id}': {reason}")]
    InvalidReading { subject_id: String, reason: String },

    /// The zone registry could not be read. Callers treat this as
    /// "no active zones", i.e. the subject is outside.
    #[error("Zone configuration unavailable: {0}")]
    StaleZoneConfiguration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("{0}")]
    Other(String),
}

impl VigilError {
    pub fn invalid(subject_id: &str, reason: impl Into<String>) -> Self {
        VigilError::InvalidReading {
            subject_id: subject_id.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for VigilError {
    fn from(e: serde_json::Error) -> Self {
        VigilError::Serialize(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VigilError>;
