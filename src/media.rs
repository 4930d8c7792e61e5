use crate::repair::AdText;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

// ── Image service ───────────────────────────────────────────────────────────

/// Client for the image-generation service. The service itself is an opaque
/// collaborator: text in, filename out.
#[derive(Debug, Clone)]
pub struct ImageClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Serialize)]
struct ImageRequest<'a> {
    product_name: &'a str,
    features: &'a [String],
    scene: &'a str,
    brand_text: Option<&'a str>,
    cta_text: Option<&'a str>,
    /// Keywords the renderer should visually emphasize
    #[serde(skip_serializing_if = "Option::is_none")]
    hook_keywords: Option<&'a [String]>,
}

#[derive(Debug, Clone, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    filename: String,
}

impl ImageClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout_secs),
        }
    }

    /// Request an image for the ad copy; returns the service-side filename.
    pub async fn generate(
        &self,
        ad_text: &AdText,
        brand_text: Option<&str>,
        cta_text: Option<&str>,
        hook_keywords: Option<&[String]>,
    ) -> anyhow::Result<String> {
        let request = ImageRequest {
            product_name: &ad_text.product,
            features: &ad_text.features,
            scene: &ad_text.scene,
            brand_text,
            cta_text,
            hook_keywords,
        };

        info!("Requesting image generation for '{}'", ad_text.product);
        let resp = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("Image generation error: HTTP {}", resp.status());
        }

        let body: ImageResponse = resp.json().await?;
        if body.filename.is_empty() {
            anyhow::bail!("Image service returned no filename");
        }
        info!("Image generated: {}", body.filename);
        Ok(body.filename)
    }

    /// Fetch the rendered image bytes.
    pub async fn download(&self, filename: &str) -> anyhow::Result<Vec<u8>> {
        debug!("Downloading image {}", filename);
        let resp = self
            .client
            .get(format!("{}/download/{}", self.base_url, filename))
            .send()
            .await?;

        match resp.status().as_u16() {
            200 => Ok(resp.bytes().await?.to_vec()),
            404 => anyhow::bail!("Image not found or has expired: {}", filename),
            code => anyhow::bail!("Error fetching image {}: HTTP {}", filename, code),
        }
    }
}

// ── Video service ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct VideoClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Serialize)]
struct VideoRequest<'a> {
    image_filename: &'a str,
    scene: &'a str,
    duration_seconds: u32,
    fps: u32,
}

/// What the video service reports back about a finished render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub file_size_mb: Option<f64>,
}

impl VideoClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout_secs),
        }
    }

    /// Animate a generated image into a short clip.
    pub async fn generate(
        &self,
        image_filename: &str,
        scene: &str,
        duration_seconds: u32,
        fps: u32,
    ) -> anyhow::Result<VideoInfo> {
        let request = VideoRequest {
            image_filename,
            scene,
            duration_seconds,
            fps,
        };

        info!(
            "Requesting video generation from {} ({}s @ {}fps)",
            image_filename, duration_seconds, fps
        );
        let resp = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("Video generation error: HTTP {}", resp.status());
        }

        let info: VideoInfo = resp.json().await?;
        if info.filename.is_empty() {
            anyhow::bail!("Video service returned no filename");
        }
        info!(
            "Video generated: {} ({:?} MB)",
            info.filename, info.file_size_mb
        );
        Ok(info)
    }

    pub async fn download(&self, filename: &str) -> anyhow::Result<Vec<u8>> {
        debug!("Downloading video {}", filename);
        let resp = self
            .client
            .get(format!("{}/download/{}", self.base_url, filename))
            .send()
            .await?;

        match resp.status().as_u16() {
            200 => Ok(resp.bytes().await?.to_vec()),
            404 => anyhow::bail!("Video not found: {}", filename),
            code => anyhow::bail!("Error fetching video {}: HTTP {}", filename, code),
        }
    }
}

// ── Poster service ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PosterClient {
    base_url: String,
    client: reqwest::Client,
}

impl PosterClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout_secs),
        }
    }

    /// Hand the finished ad to the delivery service. A down poster never
    /// fails the campaign — the error is folded into the returned status so
    /// the caller still gets its generated assets.
    pub async fn post(&self, ad_text: &AdText, image_url: &str, video_url: Option<&str>) -> Value {
        let payload = serde_json::json!({
            "text": ad_text,
            "image_url": image_url,
            "video_url": video_url,
        });

        info!("Posting advertisement (image: {})", image_url);
        let result = self
            .client
            .post(format!("{}/post", self.base_url))
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => resp.json().await.unwrap_or_else(|e| {
                warn!("Poster response decode failed: {}", e);
                serde_json::json!({"status": "unknown", "message": "undecodable poster response"})
            }),
            Ok(resp) => {
                warn!("Poster service returned HTTP {}", resp.status());
                serde_json::json!({"status": "error", "message": "post service unavailable"})
            }
            Err(e) => {
                warn!("Poster service unreachable: {}", e);
                serde_json::json!({"status": "error", "message": "post service unavailable"})
            }
        }
    }
}

fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::Audience;

    fn record() -> AdText {
        AdText {
            product: "Widget".into(),
            audience: Audience::One("teens".into()),
            tone: "fun".into(),
            description: "Great".into(),
            features: vec!["a".into()],
            scene: "a room".into(),
        }
    }

    #[test]
    fn image_request_serializes_expected_shape() {
        let ad = record();
        let keywords = vec!["widget".to_string()];
        let request = ImageRequest {
            product_name: &ad.product,
            features: &ad.features,
            scene: &ad.scene,
            brand_text: Some("ACME"),
            cta_text: None,
            hook_keywords: Some(&keywords),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["product_name"], "Widget");
        assert_eq!(value["features"], serde_json::json!(["a"]));
        assert_eq!(value["scene"], "a room");
        assert_eq!(value["brand_text"], "ACME");
        assert_eq!(value["cta_text"], Value::Null);
        assert_eq!(value["hook_keywords"], serde_json::json!(["widget"]));
    }

    #[test]
    fn hook_keywords_omitted_when_absent() {
        let ad = record();
        let request = ImageRequest {
            product_name: &ad.product,
            features: &ad.features,
            scene: &ad.scene,
            brand_text: None,
            cta_text: None,
            hook_keywords: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("hook_keywords").is_none());
    }

    #[test]
    fn base_urls_are_normalized() {
        let client = ImageClient::new("http://image-generator:5001/", 10);
        assert_eq!(client.base_url, "http://image-generator:5001");
    }

    #[test]
    fn video_info_tolerates_sparse_responses() {
        let info: VideoInfo = serde_json::from_str(r#"{"filename": "clip.mp4"}"#).unwrap();
        assert_eq!(info.filename, "clip.mp4");
        assert!(info.duration_seconds.is_none());
    }
}
