use crate::config::GenerationConfig;
use crate::llm::{LlmClient, ProductBrief};
use crate::media::{ImageClient, PosterClient, VideoClient};
use crate::repair::AdText;
use crate::safety;
use crate::story::{self, SpicedStory};
use crate::trends::TrendsProcessor;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

// ── Result type ─────────────────────────────────────────────────────────────

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Campaign {
    pub id: String,
    pub ad_text: AdText,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub post_status: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<SpicedStory>,
}

/// Per-request knobs on top of the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct CampaignOptions {
    pub brand_text: Option<String>,
    pub cta_text: Option<String>,
    /// Overrides `generation.video_enabled` when set
    pub with_video: Option<bool>,
}

// ── Runner ──────────────────────────────────────────────────────────────────

/// Drives one campaign through the pipeline: ad copy → image → optional
/// video → post. Each stage is a thin HTTP collaborator; only ad-copy and
/// image failures abort the run, the rest degrade.
pub struct CampaignRunner {
    config: GenerationConfig,
    llm: Arc<LlmClient>,
    trends: Arc<TrendsProcessor>,
    image: ImageClient,
    video: VideoClient,
    poster: PosterClient,
}

impl CampaignRunner {
    pub fn new(
        config: &GenerationConfig,
        llm: Arc<LlmClient>,
        trends: Arc<TrendsProcessor>,
    ) -> Self {
        let timeout = config.request_timeout_secs;
        Self {
            image: ImageClient::new(&config.image_service_url, timeout),
            video: VideoClient::new(&config.video_service_url, timeout),
            poster: PosterClient::new(&config.poster_service_url, timeout),
            config: config.clone(),
            llm,
            trends,
        }
    }

    /// Plain campaign from a product brief.
    pub async fn run(
        &self,
        brief: &ProductBrief,
        options: &CampaignOptions,
    ) -> anyhow::Result<Campaign> {
        self.run_inner(brief, None, options).await
    }

    /// Trend-themed campaign: pull a safe trend set, select a story, and
    /// theme the ad around it.
    pub async fn run_trending(
        &self,
        brief: &ProductBrief,
        options: &CampaignOptions,
    ) -> anyhow::Result<Campaign> {
        let candidates = self.trends.fetch_safe_trends().await;
        let mut selected = story::select_with_retry(&candidates);

        // The selector guarantees this already; re-check before the story
        // escapes into a prompt anyway.
        if safety::is_unsafe(&selected.original_trend) {
            warn!("Selected story failed the final safety check, using fallback story");
            selected = story::fallback_story();
        }

        self.run_inner(brief, Some(selected), options).await
    }

    async fn run_inner(
        &self,
        brief: &ProductBrief,
        trend: Option<SpicedStory>,
        options: &CampaignOptions,
    ) -> anyhow::Result<Campaign> {
        let id = uuid::Uuid::new_v4().to_string()[..8].to_string();
        info!(
            "Campaign {}: product '{}' for '{}' ({})",
            id, brief.product, brief.audience, brief.tone
        );

        // 1. Ad copy
        let ad_text = self.llm.generate_ad_text(brief, trend.as_ref()).await?;

        // 2. Image
        let hook_keywords = trend.as_ref().map(|t| t.hook_keywords.as_slice());
        let image_filename = self
            .image
            .generate(
                &ad_text,
                options.brand_text.as_deref(),
                options.cta_text.as_deref(),
                hook_keywords,
            )
            .await?;
        let image_url = self.image_url(&image_filename);

        // 3. Optional video — a failed render degrades to image-only
        let want_video = options.with_video.unwrap_or(self.config.video_enabled);
        let video_url = if want_video {
            match self
                .video
                .generate(
                    &image_filename,
                    &ad_text.scene,
                    self.config.video_duration_secs,
                    self.config.video_fps,
                )
                .await
            {
                Ok(rendered) => Some(self.video_url(&rendered.filename)),
                Err(e) => {
                    warn!("Campaign {}: video generation failed ({}), continuing without", id, e);
                    None
                }
            }
        } else {
            None
        };

        // 4. Post (never fails the run)
        let post_status = self
            .poster
            .post(&ad_text, &image_url, video_url.as_deref())
            .await;

        info!("Campaign {} complete", id);
        Ok(Campaign {
            id,
            ad_text,
            image_url,
            video_url,
            post_status,
            trend,
        })
    }

    pub async fn fetch_image(&self, filename: &str) -> anyhow::Result<Vec<u8>> {
        self.image.download(filename).await
    }

    pub async fn fetch_video(&self, filename: &str) -> anyhow::Result<Vec<u8>> {
        self.video.download(filename).await
    }

    fn image_url(&self, filename: &str) -> String {
        format!("http://{}/download/image/{}", self.config.public_host, filename)
    }

    fn video_url(&self, filename: &str) -> String {
        format!("http://{}/download/video/{}", self.config.public_host, filename)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmConfig, TrendsConfig};

    fn runner() -> CampaignRunner {
        CampaignRunner::new(
            &GenerationConfig {
                public_host: "ads.example.com:8030".into(),
                ..GenerationConfig::default()
            },
            Arc::new(LlmClient::new(&LlmConfig::default())),
            Arc::new(TrendsProcessor::new(TrendsConfig::default())),
        )
    }

    #[test]
    fn download_urls_use_public_host() {
        let r = runner();
        assert_eq!(
            r.image_url("ad_123.png"),
            "http://ads.example.com:8030/download/image/ad_123.png"
        );
        assert_eq!(
            r.video_url("ad_123.mp4"),
            "http://ads.example.com:8030/download/video/ad_123.mp4"
        );
    }

    #[test]
    fn campaign_serialization_omits_absent_fields() {
        let campaign = Campaign {
            id: "abc12345".into(),
            ad_text: crate::repair::repair(""),
            image_url: "http://h/download/image/a.png".into(),
            video_url: None,
            post_status: serde_json::json!({"status": "ok"}),
            trend: None,
        };
        let value = serde_json::to_value(&campaign).unwrap();
        assert!(value.get("video_url").is_none());
        assert!(value.get("trend").is_none());
        assert_eq!(value["post_status"]["status"], "ok");
    }
}
