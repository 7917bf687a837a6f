//! R2 client implementation.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use vpart_models::env;

use crate::error::{StorageError, StorageResult};

/// Configuration for R2 client.
#[derive(Debug, Clone)]
pub struct R2Config {
    /// R2 endpoint URL (S3 API endpoint)
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Public base URL objects are served from, if the bucket is exposed
    pub public_base_url: Option<String>,
}

impl R2Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: required("R2_ENDPOINT_URL")?,
            access_key_id: required("R2_ACCESS_KEY_ID")?,
            secret_access_key: required("R2_SECRET_ACCESS_KEY")?,
            bucket_name: required("R2_BUCKET_NAME")?,
            region: env::string_or("R2_REGION", "auto"),
            public_base_url: env::optional("R2_PUBLIC_BASE_URL"),
        })
    }
}

fn required(key: &str) -> StorageResult<String> {
    env::optional(key).ok_or_else(|| StorageError::config_error(format!("{} not set", key)))
}

/// Cloudflare R2 storage client.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    bucket: String,
    public_base_url: Option<String>,
}

impl R2Client {
    /// Create a new R2 client from configuration.
    pub fn new(config: R2Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base_url: config
                .public_base_url
                .map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(R2Config::from_env()?))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL for `key`, when a public base URL is configured.
    pub fn public_url(&self, key: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base, key))
    }

    /// Upload a file to R2.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        if tokio::fs::metadata(path).await.is_err() {
            return Err(StorageError::FileNotFound(path.to_path_buf()));
        }
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::transient(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(())
    }

    /// Check connectivity and credentials with a head bucket request.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        debug!(bucket = %self.bucket, "R2 connectivity check passed");
        Ok(())
    }
}

/// Map an SDK failure onto the transient/permanent split.
fn classify_sdk_error<E>(err: SdkError<E, HttpResponse>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::ServiceError(ctx) => {
            StorageError::from_http_status(ctx.raw().status().as_u16(), message)
        }
        SdkError::ConstructionFailure(_) => StorageError::config_error(message),
        _ => StorageError::transient(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config(public: Option<&str>) -> R2Config {
        R2Config {
            endpoint_url: "https://account.r2.cloudflarestorage.com".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: "parts".to_string(),
            region: "auto".to_string(),
            public_base_url: public.map(String::from),
        }
    }

    #[test]
    fn test_public_url() {
        let client = R2Client::new(config(Some("https://cdn.example.com/")));
        assert_eq!(
            client.public_url("show/part_001.mp4").as_deref(),
            Some("https://cdn.example.com/show/part_001.mp4")
        );

        let private = R2Client::new(config(None));
        assert!(private.public_url("show/part_001.mp4").is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_permanent() {
        let client = R2Client::new(config(None));
        let err = client
            .upload_file("/nonexistent/part_001.mp4", "k", "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::FileNotFound(_)));
        assert!(!err.is_transient());
    }

    #[test]
    #[serial]
    fn test_config_from_env_requires_endpoint() {
        std::env::remove_var("R2_ENDPOINT_URL");
        let err = R2Config::from_env().unwrap_err();
        assert!(err.to_string().contains("R2_ENDPOINT_URL"));
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("R2_ENDPOINT_URL", "https://r2.example.com");
        std::env::set_var("R2_ACCESS_KEY_ID", "id");
        std::env::set_var("R2_SECRET_ACCESS_KEY", "secret");
        std::env::set_var("R2_BUCKET_NAME", "bucket");
        std::env::remove_var("R2_REGION");
        std::env::remove_var("R2_PUBLIC_BASE_URL");

        let config = R2Config::from_env().unwrap();
        assert_eq!(config.bucket_name, "bucket");
        assert_eq!(config.region, "auto");
        assert!(config.public_base_url.is_none());

        for key in [
            "R2_ENDPOINT_URL",
            "R2_ACCESS_KEY_ID",
            "R2_SECRET_ACCESS_KEY",
            "R2_BUCKET_NAME",
        ] {
            std::env::remove_var(key);
        }
    }
}
