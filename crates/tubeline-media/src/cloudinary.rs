use std::path::Path;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::{MediaError, MediaHandle, UploadedMedia};

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
}

/// Signed uploads and deletes against a Cloudinary-compatible API.
pub struct CloudinaryStore {
    http: Client,
    config: CloudinaryConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    resource_type: String,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            resource_type,
            action
        )
    }

    pub async fn upload(&self, path: &Path) -> Result<UploadedMedia, MediaError> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(&[("timestamp", timestamp.as_str())], &self.config.api_secret);

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, len).file_name(file_name);
        let form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .part("file", part);

        let resp = self
            .http
            .post(self.endpoint("auto", "upload"))
            .multipart(form)
            .send()
            .await?;

        let uploaded: UploadResponse = parse_response(resp).await?;
        debug!("Uploaded {} as {}", path.display(), uploaded.public_id);

        Ok(UploadedMedia {
            url: uploaded.secure_url,
            handle: MediaHandle {
                resource_type: uploaded.resource_type,
                public_id: uploaded.public_id,
            }
            .to_string(),
            duration: uploaded.duration,
        })
    }

    pub async fn destroy(&self, handle: &MediaHandle) -> Result<(), MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[
                ("public_id", handle.public_id.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.config.api_secret,
        );

        let resp = self
            .http
            .post(self.endpoint(&handle.resource_type, "destroy"))
            .form(&[
                ("public_id", handle.public_id.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;

        let destroyed: DestroyResponse = parse_response(resp).await?;
        match destroyed.result.as_str() {
            "ok" => Ok(()),
            "not found" => {
                warn!("Media asset {} already gone", handle);
                Ok(())
            }
            other => Err(MediaError::Rejected {
                status: 200,
                message: format!("destroy returned {:?}", other),
            }),
        }
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, MediaError> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        return Err(MediaError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| MediaError::Rejected {
        status: status.as_u16(),
        message: format!("unreadable response: {}", e),
    })
}

/// Request signature: SHA-1 over the key-sorted `k=v&k=v` list with the
/// secret appended, lowercase hex.
pub fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_sorts_params_and_appends_secret() {
        let expected = hex::encode(Sha1::digest(b"public_id=sample&timestamp=1315060510abcd"));
        assert_eq!(sign(&[("timestamp", "1315060510"), ("public_id", "sample")], "abcd"), expected);
        assert_eq!(sign(&[("public_id", "sample"), ("timestamp", "1315060510")], "abcd"), expected);
        assert_eq!(expected.len(), 40);
    }

    #[test]
    fn endpoints_include_cloud_and_resource_type() {
        let store = CloudinaryStore::new(CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            base_url: "https://api.cloudinary.com/".into(),
        });
        assert_eq!(store.endpoint("auto", "upload"), "https://api.cloudinary.com/v1_1/demo/auto/upload");
        assert_eq!(store.endpoint("video", "destroy"), "https://api.cloudinary.com/v1_1/demo/video/destroy");
    }

    #[test]
    fn upload_response_duration_is_optional() {
        let image: UploadResponse = serde_json::from_str(
            r#"{"secure_url":"https://res/x.png","public_id":"x","resource_type":"image","width":10}"#,
        )
        .unwrap();
        assert_eq!(image.duration, None);

        let video: UploadResponse = serde_json::from_str(
            r#"{"secure_url":"https://res/v.mp4","public_id":"v","resource_type":"video","duration":12.5}"#,
        )
        .unwrap();
        assert_eq!(video.duration, Some(12.5));
    }
}
