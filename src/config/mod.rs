use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub trends: TrendsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8030 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai_compatible"
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Prompt style: "standard", "creative", "concise", "tech"
    #[serde(default = "default_prompt_style")]
    pub prompt_style: String,
    /// Full custom prompt template; overrides `prompt_style` when set
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_backend() -> String { "ollama".into() }
fn default_model() -> String { "llama3".into() }
fn default_llm_endpoint() -> String { "http://llm-service:11434".into() }
fn default_max_tokens() -> u32 { 2048 }
fn default_temperature() -> f32 { 0.7 }
fn default_prompt_style() -> String { "standard".into() }
fn default_llm_timeout() -> u64 { 120 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            model: default_model(),
            endpoint: default_llm_endpoint(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            prompt_style: default_prompt_style(),
            custom_prompt: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Downstream generation/delivery services — opaque HTTP collaborators.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_image_url")]
    pub image_service_url: String,
    #[serde(default = "default_video_url")]
    pub video_service_url: String,
    #[serde(default = "default_poster_url")]
    pub poster_service_url: String,
    /// Animate the generated image into a short clip by default
    #[serde(default)]
    pub video_enabled: bool,
    #[serde(default = "default_video_duration")]
    pub video_duration_secs: u32,
    #[serde(default = "default_video_fps")]
    pub video_fps: u32,
    #[serde(default = "default_media_timeout")]
    pub request_timeout_secs: u64,
    /// Host used when assembling externally reachable download URLs
    #[serde(default = "default_public_host")]
    pub public_host: String,
}

fn default_image_url() -> String { "http://image-generator:5001".into() }
fn default_video_url() -> String { "http://video-generator:5003".into() }
fn default_poster_url() -> String { "http://poster-service:5002".into() }
fn default_video_duration() -> u32 { 5 }
fn default_video_fps() -> u32 { 24 }
fn default_media_timeout() -> u64 { 120 }
fn default_public_host() -> String { "localhost:8030".into() }

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            image_service_url: default_image_url(),
            video_service_url: default_video_url(),
            poster_service_url: default_poster_url(),
            video_enabled: false,
            video_duration_secs: default_video_duration(),
            video_fps: default_video_fps(),
            request_timeout_secs: default_media_timeout(),
            public_host: default_public_host(),
        }
    }
}

/// Trend acquisition settings — maps to [trends] in config.toml
///
/// ```toml
/// [trends]
/// min_fetch_interval_secs = 60
/// cache_ttl_secs = 900
/// pinned_topics = ["Garden season ideas"]
/// source_order = ["pinned", "trend_api", "syndication", "community", "aggregator", "curated"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TrendsConfig {
    /// Minimum seconds between live source fetches (rate gate)
    #[serde(default = "default_min_interval")]
    pub min_fetch_interval_secs: u64,
    /// How long a fetched safe set stays served from cache
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_trend_timeout")]
    pub request_timeout_secs: u64,
    /// Longest trend title accepted by the structural filter
    #[serde(default = "default_max_trend_len")]
    pub max_trend_len: usize,
    /// Cap on safe candidates kept per source
    #[serde(default = "default_max_per_source")]
    pub max_per_source: usize,
    /// Consecutive unsafe candidates tolerated before a source is abandoned
    #[serde(default = "default_max_unsafe_skips")]
    pub max_unsafe_skips: u32,
    /// Source preference order; unknown names are ignored, empty means default
    #[serde(default)]
    pub source_order: Vec<String>,
    /// Operator-pinned topics, offered ahead of live sources
    #[serde(default)]
    pub pinned_topics: Vec<String>,
    #[serde(default = "default_trend_api_url")]
    pub trend_api_url: String,
    #[serde(default = "default_feed_urls")]
    pub feed_urls: Vec<String>,
    #[serde(default = "default_community_urls")]
    pub community_urls: Vec<String>,
    /// Optional social trend aggregator (skipped unless configured)
    #[serde(default)]
    pub aggregator_url: Option<String>,
    #[serde(default)]
    pub aggregator_api_key: Option<String>,
}

fn default_min_interval() -> u64 { 60 }
fn default_cache_ttl() -> u64 { 900 }
fn default_trend_timeout() -> u64 { 15 }
fn default_max_trend_len() -> usize { 150 }
fn default_max_per_source() -> usize { 10 }
fn default_max_unsafe_skips() -> u32 { 3 }
fn default_trend_api_url() -> String {
    "https://trends.google.com/trends/api/dailytrends?geo=US".into()
}
fn default_feed_urls() -> Vec<String> {
    vec![
        "https://trends.google.com/trends/trendingsearches/daily/rss?geo=US".into(),
        "https://trends.google.com/trends/hottrends/atom/feed?pn=p1".into(),
    ]
}
fn default_community_urls() -> Vec<String> {
    vec![
        "https://www.reddit.com/r/all/hot.json?limit=10".into(),
        "https://www.reddit.com/r/popular/hot.json?limit=10".into(),
    ]
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            min_fetch_interval_secs: default_min_interval(),
            cache_ttl_secs: default_cache_ttl(),
            request_timeout_secs: default_trend_timeout(),
            max_trend_len: default_max_trend_len(),
            max_per_source: default_max_per_source(),
            max_unsafe_skips: default_max_unsafe_skips(),
            source_order: Vec::new(),
            pinned_topics: Vec::new(),
            trend_api_url: default_trend_api_url(),
            feed_urls: default_feed_urls(),
            community_urls: default_community_urls(),
            aggregator_url: None,
            aggregator_api_key: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from the given path, or fall back to defaults when the file is
    /// absent (every section has usable defaults).
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_full_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8030);
        assert_eq!(config.llm.backend, "ollama");
        assert_eq!(config.trends.cache_ttl_secs, 900);
        assert_eq!(config.trends.max_unsafe_skips, 3);
        assert!(config.trends.pinned_topics.is_empty());
    }

    #[test]
    fn partial_section_overrides() {
        let config: Config = toml::from_str(
            r#"
            [trends]
            min_fetch_interval_secs = 0
            pinned_topics = ["Garden season ideas"]

            [llm]
            backend = "openai_compatible"
            "#,
        )
        .unwrap();
        assert_eq!(config.trends.min_fetch_interval_secs, 0);
        assert_eq!(config.trends.pinned_topics, vec!["Garden season ideas"]);
        assert_eq!(config.llm.backend, "openai_compatible");
        // Untouched sections keep defaults
        assert_eq!(config.generation.video_fps, 24);
    }
}
