//! Provider credential resolution

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::ConfigError;
use crate::models::CredentialPair;

/// Trait for secret stores
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch decrypted values for the given names. Names the store does not
    /// know are simply absent from the result.
    async fn get_secrets(&self, names: &[String]) -> Result<HashMap<String, String>>;
}

/// SSM Parameter Store backed secrets
pub struct SsmSecretStore {
    client: aws_sdk_ssm::Client,
}

impl SsmSecretStore {
    pub fn new(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for SsmSecretStore {
    async fn get_secrets(&self, names: &[String]) -> Result<HashMap<String, String>> {
        let output = self
            .client
            .get_parameters()
            .set_names(Some(names.to_vec()))
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", aws_sdk_ssm::error::DisplayErrorContext(e)))
            .context("Failed to read parameters from SSM")?;

        if !output.invalid_parameters().is_empty() {
            tracing::warn!(invalid = ?output.invalid_parameters(), "SSM reported unknown parameters");
        }

        Ok(output
            .parameters()
            .iter()
            .filter_map(|p| Some((p.name()?.to_string(), p.value()?.to_string())))
            .collect())
    }
}

/// Resolve the provider key pair from their parameter names
pub async fn resolve_credentials(
    store: &dyn SecretStore,
    public_key_param: &str,
    private_key_param: &str,
) -> Result<CredentialPair> {
    let names = vec![public_key_param.to_string(), private_key_param.to_string()];
    let mut values = store.get_secrets(&names).await?;

    let public_key = values
        .remove(public_key_param)
        .ok_or_else(|| ConfigError::MissingSecret(public_key_param.to_string()))?;
    let private_key = values
        .remove(private_key_param)
        .ok_or_else(|| ConfigError::MissingSecret(private_key_param.to_string()))?;

    tracing::debug!(parameter = public_key_param, "Resolved provider credentials");

    Ok(CredentialPair { public_key, private_key })
}
