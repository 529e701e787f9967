//! Object store connection settings

use serde::Deserialize;

/// Settings for an S3-compatible bucket (AWS, MinIO, R2, ...)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// API endpoint, e.g. `http://localhost:9000` for a local MinIO
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Address the bucket as `endpoint/bucket` instead of `bucket.endpoint`
    pub path_style: bool,
    /// Base of the URLs handed back to callers; defaults to the bucket URL
    pub public_base_url: Option<String>,
    /// Prefix prepended to every object key
    pub key_prefix: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            bucket: "warranty-claims".to_string(),
            access_key: String::new(),
            secret_key: String::new(),
            path_style: true,
            public_base_url: None,
            key_prefix: "claims".to_string(),
        }
    }
}

impl S3Config {
    /// Base URL objects are reachable under, without a trailing slash
    pub fn base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.path_style => {
                format!("{}/{}", self.endpoint.trim_end_matches('/'), self.bucket)
            }
            None => {
                let endpoint = self.endpoint.trim_end_matches('/');
                match endpoint.split_once("://") {
                    Some((scheme, host)) => format!("{}://{}.{}", scheme, self.bucket, host),
                    None => format!("{}.{}", self.bucket, endpoint),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_style_base_url() {
        let config = S3Config::default();
        assert_eq!(config.base_url(), "http://localhost:9000/warranty-claims");
    }

    #[test]
    fn test_virtual_host_base_url() {
        let config = S3Config {
            endpoint: "https://s3.ap-southeast-1.amazonaws.com/".to_string(),
            path_style: false,
            ..Default::default()
        };
        assert_eq!(
            config.base_url(),
            "https://warranty-claims.s3.ap-southeast-1.amazonaws.com"
        );
    }

    #[test]
    fn test_public_base_url_wins() {
        let config = S3Config {
            public_base_url: Some("https://cdn.example.com/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://cdn.example.com");
    }
}
