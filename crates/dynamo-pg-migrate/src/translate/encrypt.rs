//! Encryption of sensitive fields during translation.

use async_trait::async_trait;
use aws_sdk_kms::error::DisplayErrorContext;
use aws_sdk_kms::primitives::Blob;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{MigrateError, Result};

/// Value transform applied to credential fields before they reach the target.
#[async_trait]
pub trait Encryptor: Send + Sync {
    /// Encrypt `plaintext`, returning a text-safe ciphertext.
    async fn encrypt(&self, plaintext: &str) -> Result<String>;
}

/// AWS KMS encryption with a fixed key; ciphertext is base64 encoded.
#[derive(Debug, Clone)]
pub struct KmsEncryptor {
    client: aws_sdk_kms::Client,
    key_id: String,
}

impl KmsEncryptor {
    pub fn new(client: aws_sdk_kms::Client, key_id: impl Into<String>) -> Result<Self> {
        let key_id = key_id.into();
        check_key_id(&key_id)?;
        Ok(Self { client, key_id })
    }

    /// Build from shared AWS SDK config.
    pub fn from_sdk_config(
        sdk_config: &aws_config::SdkConfig,
        key_id: impl Into<String>,
    ) -> Result<Self> {
        Self::new(aws_sdk_kms::Client::new(sdk_config), key_id)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

fn check_key_id(key_id: &str) -> Result<()> {
    if key_id.trim().is_empty() {
        return Err(MigrateError::Config(
            "migration.provider_kms_key_id is required to encrypt provider credentials".into(),
        ));
    }
    Ok(())
}

#[async_trait]
impl Encryptor for KmsEncryptor {
    async fn encrypt(&self, plaintext: &str) -> Result<String> {
        let output = self
            .client
            .encrypt()
            .key_id(&self.key_id)
            .plaintext(Blob::new(plaintext.as_bytes()))
            .send()
            .await
            .map_err(|e| MigrateError::Encryption(DisplayErrorContext(&e).to_string()))?;

        let ciphertext = output
            .ciphertext_blob
            .ok_or_else(|| MigrateError::Encryption("KMS returned no ciphertext".into()))?;

        Ok(STANDARD.encode(ciphertext.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id_is_required() {
        assert!(matches!(check_key_id(""), Err(MigrateError::Config(_))));
        assert!(matches!(check_key_id("   "), Err(MigrateError::Config(_))));
        assert!(check_key_id("alias/providers").is_ok());
    }
}
