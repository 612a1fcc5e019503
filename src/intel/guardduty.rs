//! GuardDuty client

use async_trait::async_trait;
use aws_sdk_guardduty::Client;
use aws_sdk_guardduty::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_guardduty::types::ThreatIntelSetFormat;

use crate::intel::{IntelError, ThreatIntelService};
use crate::models::ThreatIntelSet;

const BAD_REQUEST: &str = "BadRequestException";

/// GuardDuty backed threat intel service
pub struct GuardDutyService {
    client: Client,
}

impl GuardDutyService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Map a GuardDuty error onto the typed taxonomy.
///
/// GuardDuty reports both conflicts as `BadRequestException` with no finer
/// grained code, so within that code the message decides.
pub fn classify(operation: &'static str, code: Option<&str>, message: String) -> IntelError {
    if code == Some(BAD_REQUEST) {
        let lower = message.to_lowercase();
        if lower.contains("name already exists") {
            return IntelError::NameExists(message);
        }
        if lower.contains("account limit") {
            return IntelError::LimitExceeded(message);
        }
    }
    IntelError::Service { operation, message }
}

fn sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> IntelError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug + 'static,
{
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    classify(operation, err.code(), message)
}

#[async_trait]
impl ThreatIntelService for GuardDutyService {
    async fn list_detectors(&self) -> Result<Vec<String>, IntelError> {
        let output = self
            .client
            .list_detectors()
            .send()
            .await
            .map_err(|e| sdk_error("ListDetectors", e))?;

        Ok(output.detector_ids().to_vec())
    }

    async fn create_threat_intel_set(
        &self,
        detector_id: &str,
        name: &str,
        location: &str,
    ) -> Result<String, IntelError> {
        let output = self
            .client
            .create_threat_intel_set()
            .detector_id(detector_id)
            .name(name)
            .format(ThreatIntelSetFormat::FireEye)
            .location(location)
            .activate(true)
            .send()
            .await
            .map_err(|e| sdk_error("CreateThreatIntelSet", e))?;

        output
            .threat_intel_set_id()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| IntelError::Service {
                operation: "CreateThreatIntelSet",
                message: "response carried no threat intel set id".to_string(),
            })
    }

    async fn list_threat_intel_sets(&self, detector_id: &str) -> Result<Vec<String>, IntelError> {
        let mut ids = vec![];
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_threat_intel_sets()
                .detector_id(detector_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListThreatIntelSets", e))?;

            ids.extend(output.threat_intel_set_ids().iter().cloned());

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(ids)
    }

    async fn get_threat_intel_set(
        &self,
        detector_id: &str,
        set_id: &str,
    ) -> Result<ThreatIntelSet, IntelError> {
        let output = self
            .client
            .get_threat_intel_set()
            .detector_id(detector_id)
            .threat_intel_set_id(set_id)
            .send()
            .await
            .map_err(|e| sdk_error("GetThreatIntelSet", e))?;

        Ok(ThreatIntelSet {
            id: set_id.to_string(),
            name: output.name().unwrap_or_default().to_string(),
            location: output.location().map(str::to_string),
            status: output.status().map(|s| s.as_str().to_string()),
        })
    }

    async fn update_threat_intel_set(
        &self,
        detector_id: &str,
        set_id: &str,
        name: &str,
        location: &str,
    ) -> Result<(), IntelError> {
        self.client
            .update_threat_intel_set()
            .detector_id(detector_id)
            .threat_intel_set_id(set_id)
            .name(name)
            .location(location)
            .activate(true)
            .send()
            .await
            .map_err(|e| sdk_error("UpdateThreatIntelSet", e))?;

        Ok(())
    }
}
