//! Core data models for the feed sync handler

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod naming;

/// Invocation payload. Scheduled invocations carry none of these fields,
/// CloudFormation custom resource invocations carry all of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationEvent {
    #[serde(default)]
    pub request_type: Option<String>,
    #[serde(default, rename = "ResponseURL")]
    pub response_url: Option<String>,
    #[serde(default)]
    pub stack_id: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub logical_resource_id: Option<String>,
}

impl InvocationEvent {
    /// Teardown requests are acknowledged without touching the feed
    pub fn is_delete(&self) -> bool {
        self.request_type
            .as_deref()
            .map(|t| t.to_uppercase().contains("DELETE"))
            .unwrap_or(false)
    }
}

/// Platform metadata about the running invocation
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub request_id: String,
    pub function_arn: String,
    pub log_group: String,
    pub log_stream: String,
}

impl InvocationContext {
    /// Region segment of the function ARN (`arn:aws:lambda:<region>:...`)
    pub fn region(&self) -> &str {
        self.function_arn.split(':').nth(3).unwrap_or_default()
    }

    /// CloudWatch console link for this invocation's log stream
    pub fn logs_url(&self) -> String {
        format!(
            "https://console.aws.amazon.com/cloudwatch/home?region={}#logEventViewer:group={};stream={}",
            self.region(),
            self.log_group,
            self.log_stream
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultBody {
    pub message: String,
}

/// Payload returned from every invocation, success or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerResult {
    #[serde(rename = "statusCode")]
    pub status_code: String,
    pub body: ResultBody,
}

impl HandlerResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status_code: "200".to_string(),
            body: ResultBody { message: message.into() },
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status_code: "500".to_string(),
            body: ResultBody { message: message.into() },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == "200"
    }
}

/// Completion status reported back to the lifecycle that invoked us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseStatus::Success => write!(f, "SUCCESS"),
            ResponseStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Body of the PUT sent to `ResponseURL`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackReport {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: Option<String>,
    pub stack_id: Option<String>,
    pub request_id: Option<String>,
    pub logical_resource_id: Option<String>,
    pub no_echo: bool,
    pub data: Value,
}

/// Provider credentials, alive for a single invocation
#[derive(Clone)]
pub struct CredentialPair {
    pub public_key: String,
    pub private_key: String,
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Raw provider response. Status and reason are kept even when the body is
/// an error page.
#[derive(Debug, Clone)]
pub struct FeedResponse {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
}

impl FeedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Feed body persisted to object storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedObject {
    pub bucket: String,
    pub key: String,
    /// Public location registered with the monitoring service
    pub location: String,
}

/// Threat intel set as reported by the monitoring service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreatIntelSet {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn custom_resource_event_deserializes() {
        let event: InvocationEvent = serde_json::from_value(json!({
            "RequestType": "Create",
            "ResponseURL": "https://cloudformation-custom-resource-response.example/abc",
            "StackId": "arn:aws:cloudformation:us-east-1:123456789012:stack/feed/1",
            "RequestId": "req-1",
            "LogicalResourceId": "FeedSync",
            "ResourceProperties": { "ignored": true }
        }))
        .unwrap();

        assert_eq!(event.request_type.as_deref(), Some("Create"));
        assert!(event.response_url.is_some());
        assert_eq!(event.logical_resource_id.as_deref(), Some("FeedSync"));
        assert!(!event.is_delete());
    }

    #[test]
    fn scheduled_event_has_no_lifecycle_fields() {
        let event: InvocationEvent = serde_json::from_value(json!({
            "source": "aws.events",
            "detail-type": "Scheduled Event"
        }))
        .unwrap();

        assert!(event.request_type.is_none());
        assert!(event.response_url.is_none());
        assert!(!event.is_delete());
    }

    #[test]
    fn delete_detection_is_case_insensitive() {
        let event = InvocationEvent {
            request_type: Some("delete".to_string()),
            ..Default::default()
        };
        assert!(event.is_delete());
    }

    #[test]
    fn result_payload_shape() {
        let value = serde_json::to_value(HandlerResult::failure("boom")).unwrap();
        assert_eq!(value, json!({ "statusCode": "500", "body": { "message": "boom" } }));
    }

    #[test]
    fn logs_url_uses_region_from_arn() {
        let ctx = InvocationContext {
            request_id: "r".to_string(),
            function_arn: "arn:aws:lambda:eu-west-1:123456789012:function:sync".to_string(),
            log_group: "/aws/lambda/sync".to_string(),
            log_stream: "2024/01/01/[$LATEST]abc".to_string(),
        };
        assert_eq!(ctx.region(), "eu-west-1");
        assert!(ctx.logs_url().contains("region=eu-west-1#logEventViewer:group=/aws/lambda/sync;stream="));
    }

    #[test]
    fn credential_debug_redacts_private_key() {
        let creds = CredentialPair {
            public_key: "pub".to_string(),
            private_key: "very-secret".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("very-secret"));
    }
}
