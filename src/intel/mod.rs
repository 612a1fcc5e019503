//! Threat intel set management in the monitoring service

pub mod guardduty;
pub mod rotation;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ThreatIntelSet;

/// Monitoring service failures. The two conflict variants are recoverable by
/// the rotation policy; everything else is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntelError {
    /// A set with the requested name already exists in the detector
    #[error("{0}")]
    NameExists(String),

    /// The detector already holds the maximum number of sets
    #[error("{0}")]
    LimitExceeded(String),

    #[error("Failed to read GuardDuty info. Please check if the service is activated")]
    NoDetector,

    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },
}

/// Operations the rotation policy needs from the monitoring service
#[async_trait]
pub trait ThreatIntelService: Send + Sync {
    async fn list_detectors(&self) -> Result<Vec<String>, IntelError>;

    /// Create an activated set and return its id
    async fn create_threat_intel_set(
        &self,
        detector_id: &str,
        name: &str,
        location: &str,
    ) -> Result<String, IntelError>;

    /// Ids of every set in the detector
    async fn list_threat_intel_sets(&self, detector_id: &str) -> Result<Vec<String>, IntelError>;

    async fn get_threat_intel_set(
        &self,
        detector_id: &str,
        set_id: &str,
    ) -> Result<ThreatIntelSet, IntelError>;

    /// Point an existing set at `location` under `name` and activate it
    async fn update_threat_intel_set(
        &self,
        detector_id: &str,
        set_id: &str,
        name: &str,
        location: &str,
    ) -> Result<(), IntelError>;
}

/// The single detector the handler works against. The first one listed wins.
pub async fn resolve_detector(service: &dyn ThreatIntelService) -> Result<String, IntelError> {
    let detectors = service.list_detectors().await?;
    if detectors.len() > 1 {
        tracing::warn!(count = detectors.len(), "Multiple detectors found, using the first");
    }
    detectors.into_iter().next().ok_or(IntelError::NoDetector)
}
