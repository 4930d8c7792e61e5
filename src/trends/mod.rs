use crate::config::TrendsConfig;
use crate::safety;
use chrono::Datelike;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

// ── Curated data ────────────────────────────────────────────────────────────

/// Served when every source is exhausted. Safe by construction and
/// maintenance — the regression test below sweeps it against the filter on
/// every change, so no runtime check is needed.
pub const FALLBACK_TOPICS: &[&str] = &[
    "Summer vacation destinations",
    "Ice cream flavors and recipes",
    "Pet adoption and care",
    "Music festivals and concerts",
    "Art exhibitions and galleries",
    "Food trucks and street food",
    "Beach activities and water sports",
    "Garden parties and outdoor dining",
    "Street art and murals",
    "Local farmers markets",
    "Home workout routines",
    "Healthy cooking and nutrition",
    "DIY crafts and hobbies",
    "Photography tips and techniques",
    "Book recommendations and reviews",
    "Coffee shop culture",
    "Hiking trails and nature",
    "Board games and puzzles",
    "Sustainable living tips",
    "Mindfulness and meditation",
];

/// Month-keyed topic pools for the curated generator. These are raw
/// candidates, not a safety guarantee — they pass through the same screening
/// as any live source.
const SEASONAL_TOPICS: [&[&str]; 12] = [
    &["New Year resolutions", "Winter sports", "Cozy home decor", "Fitness goals", "Detox recipes"],
    &["Valentine's Day gifts", "Winter fashion", "Indoor activities", "Heart-healthy recipes", "Love quotes"],
    &["Spring cleaning", "Garden planning", "Easter decorations", "Spring fashion", "Outdoor activities"],
    &["Earth Day activities", "Spring flowers", "Outdoor fitness", "Fresh recipes", "Travel planning"],
    &["Mother's Day gifts", "Graduation parties", "Summer planning", "Outdoor weddings", "BBQ recipes"],
    &["Father's Day gifts", "Summer vacations", "Beach activities", "Outdoor sports", "Pool parties"],
    &["Summer festivals", "Independence Day", "Beach fashion", "Outdoor concerts", "Summer recipes"],
    &["Back to school", "Summer activities", "Vacation photos", "School supplies", "Family time"],
    &["Fall fashion", "Autumn decorations", "School activities", "Harvest festivals", "Comfort food"],
    &["Halloween costumes", "Autumn leaves", "Pumpkin recipes", "Fall activities", "Cozy sweaters"],
    &["Thanksgiving recipes", "Holiday planning", "Black Friday deals", "Gratitude activities", "Family gatherings"],
    &["Christmas gifts", "Holiday decorations", "Winter activities", "Holiday recipes", "Year-end reflection"],
];

const EVERGREEN_TOPICS: &[&str] = &[
    "Healthy lifestyle tips",
    "Creative art projects",
    "Home improvement ideas",
    "Pet care tips",
    "Cooking techniques",
    "Travel destinations",
    "Fitness routines",
    "Photography tips",
    "Music discoveries",
    "Book recommendations",
];

// ── Source chain ────────────────────────────────────────────────────────────

/// One upstream in the fixed preference order. Tried strictly in sequence;
/// the first source yielding at least one post-filter safe candidate wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendSource {
    /// Operator-pinned topics from config
    Pinned,
    /// Primary trend API (Google daily trends JSON)
    TrendApi,
    /// Syndication feeds (RSS/Atom)
    Syndication,
    /// Community aggregator (Reddit hot listings)
    Community,
    /// Configured social trend aggregator; skipped without credentials
    Aggregator,
    /// Date/season-based curated generator — never fails to produce
    Curated,
}

impl TrendSource {
    pub fn name(&self) -> &'static str {
        match self {
            TrendSource::Pinned => "pinned",
            TrendSource::TrendApi => "trend_api",
            TrendSource::Syndication => "syndication",
            TrendSource::Community => "community",
            TrendSource::Aggregator => "aggregator",
            TrendSource::Curated => "curated",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "pinned" => Some(TrendSource::Pinned),
            "trend_api" => Some(TrendSource::TrendApi),
            "syndication" => Some(TrendSource::Syndication),
            "community" => Some(TrendSource::Community),
            "aggregator" => Some(TrendSource::Aggregator),
            "curated" => Some(TrendSource::Curated),
            _ => None,
        }
    }

    fn default_chain() -> Vec<TrendSource> {
        vec![
            TrendSource::Pinned,
            TrendSource::TrendApi,
            TrendSource::Syndication,
            TrendSource::Community,
            TrendSource::Aggregator,
            TrendSource::Curated,
        ]
    }
}

/// Per-source failure. Internal only — no variant ever propagates out of
/// [`TrendsProcessor::fetch_safe_trends`]; each one just means "try the next
/// source".
#[derive(Debug, Error)]
pub enum TrendError {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("source returned no candidates")]
    Empty,
    #[error("source not configured")]
    NotConfigured,
    #[error("no candidate survived the safety screen")]
    UnsafeExhausted,
}

impl From<reqwest::Error> for TrendError {
    fn from(e: reqwest::Error) -> Self {
        TrendError::Fetch(e.to_string())
    }
}

// ── Cache ───────────────────────────────────────────────────────────────────

/// Process-wide trend cache. Entries are only ever written wholesale and only
/// after screening, so a cache hit needs no re-filtering.
#[derive(Debug, Default)]
struct TrendsCache {
    entries: Vec<String>,
    expires_at: Option<Instant>,
    last_fetch_at: Option<Instant>,
}

impl TrendsCache {
    fn is_valid(&self) -> bool {
        !self.entries.is_empty() && self.expires_at.is_some_and(|t| Instant::now() < t)
    }
}

// ── Processor ───────────────────────────────────────────────────────────────

static DANGEROUS_CHARS: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"[<>{}\[\]\\|`~]").ok());

pub struct TrendsProcessor {
    config: TrendsConfig,
    sources: Vec<TrendSource>,
    client: reqwest::Client,
    cache: Mutex<TrendsCache>,
}

impl TrendsProcessor {
    pub fn new(config: TrendsConfig) -> Self {
        let sources = if config.source_order.is_empty() {
            TrendSource::default_chain()
        } else {
            let parsed: Vec<TrendSource> = config
                .source_order
                .iter()
                .filter_map(|name| {
                    let source = TrendSource::from_name(name);
                    if source.is_none() {
                        warn!("Unknown trend source '{}' in config, ignoring", name);
                    }
                    source
                })
                .collect();
            if parsed.is_empty() {
                TrendSource::default_chain()
            } else {
                parsed
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
            .build()
            .unwrap_or_default();

        Self {
            config,
            sources,
            client,
            cache: Mutex::new(TrendsCache::default()),
        }
    }

    /// Fetch a set of safe trend topics.
    ///
    /// Serves from cache when valid; otherwise walks the source chain in
    /// preference order and returns the first screened batch. Exhaustion is
    /// not an error — the curated fallback list is returned instead, so the
    /// caller always gets a non-empty, fully screened set.
    pub async fn fetch_safe_trends(&self) -> Vec<String> {
        {
            let cache = self.cache.lock().await;
            if cache.is_valid() {
                debug!("Serving {} trends from cache", cache.entries.len());
                return cache.entries.clone();
            }
        }

        self.respect_rate_limit().await;

        for source in &self.sources {
            match self.safe_batch_from(*source).await {
                Ok(safe) => {
                    info!(
                        "Source {} provided {} safe trend(s)",
                        source.name(),
                        safe.len()
                    );
                    self.store(safe.clone()).await;
                    return safe;
                }
                Err(e) => warn!("Source {}: {}", source.name(), e),
            }
        }

        warn!("All trend sources exhausted, using curated fallback list");
        let fallback: Vec<String> = FALLBACK_TOPICS.iter().map(|s| s.to_string()).collect();
        self.store(fallback.clone()).await;
        fallback
    }

    /// Fetch one source and screen its output. Any error here just moves the
    /// chain to the next source.
    async fn safe_batch_from(&self, source: TrendSource) -> Result<Vec<String>, TrendError> {
        let raw = self.fetch_source(source).await?;
        if raw.is_empty() {
            return Err(TrendError::Empty);
        }
        self.screen_batch(&raw).ok_or(TrendError::UnsafeExhausted)
    }

    /// Screen one source's raw output: structural filter first, then the
    /// sensitivity filter with a consecutive-unsafe budget. `None` means the
    /// source produced nothing usable and the chain moves on.
    fn screen_batch(&self, raw: &[String]) -> Option<Vec<String>> {
        let mut safe = Vec::new();
        let mut consecutive_unsafe: u32 = 0;

        for candidate in raw {
            let trimmed = candidate.trim();
            let len = trimmed.chars().count();
            if len < 3 || len > self.config.max_trend_len {
                continue;
            }
            if has_dangerous_chars(trimmed) {
                debug!("Dropping structurally risky candidate: {}", trimmed);
                continue;
            }
            if safety::looks_like_news(trimmed) {
                debug!("Dropping headline-shaped candidate: {}", trimmed);
                continue;
            }
            if safety::is_unsafe(trimmed) {
                consecutive_unsafe += 1;
                if consecutive_unsafe >= self.config.max_unsafe_skips {
                    warn!(
                        "{} consecutive unsafe candidates, abandoning source",
                        consecutive_unsafe
                    );
                    break;
                }
                continue;
            }
            consecutive_unsafe = 0;
            safe.push(trimmed.to_string());
            if safe.len() >= self.config.max_per_source {
                break;
            }
        }

        (!safe.is_empty()).then_some(safe)
    }

    async fn store(&self, entries: Vec<String>) {
        let mut cache = self.cache.lock().await;
        cache.entries = entries;
        cache.expires_at = Some(Instant::now() + Duration::from_secs(self.config.cache_ttl_secs));
        cache.last_fetch_at = Some(Instant::now());
    }

    /// Delay (never skip) when live fetches would come faster than the
    /// configured minimum interval.
    async fn respect_rate_limit(&self) {
        let wait = {
            let cache = self.cache.lock().await;
            cache.last_fetch_at.and_then(|at| {
                Duration::from_secs(self.config.min_fetch_interval_secs).checked_sub(at.elapsed())
            })
        };
        if let Some(wait) = wait {
            if !wait.is_zero() {
                info!("Rate gate: waiting {:.1}s before live fetch", wait.as_secs_f32());
                tokio::time::sleep(wait).await;
            }
        }
    }

    /// Cache/rate-gate state for the debug endpoint.
    pub async fn debug_info(&self) -> Value {
        let cache = self.cache.lock().await;
        serde_json::json!({
            "cache_valid": cache.is_valid(),
            "cached_count": cache.entries.len(),
            "expires_in_secs": cache
                .expires_at
                .map(|t| t.saturating_duration_since(Instant::now()).as_secs()),
            "last_fetch_age_secs": cache.last_fetch_at.map(|t| t.elapsed().as_secs()),
            "min_fetch_interval_secs": self.config.min_fetch_interval_secs,
            "sources": self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
        })
    }

    // ── Source fetchers ─────────────────────────────────────────────────

    async fn fetch_source(&self, source: TrendSource) -> Result<Vec<String>, TrendError> {
        debug!("Trying trend source: {}", source.name());
        match source {
            TrendSource::Pinned => {
                if self.config.pinned_topics.is_empty() {
                    Err(TrendError::NotConfigured)
                } else {
                    Ok(self.config.pinned_topics.clone())
                }
            }
            TrendSource::TrendApi => self.fetch_trend_api().await,
            TrendSource::Syndication => self.fetch_syndication().await,
            TrendSource::Community => self.fetch_community().await,
            TrendSource::Aggregator => self.fetch_aggregator().await,
            TrendSource::Curated => Ok(curated_topics()),
        }
    }

    async fn fetch_trend_api(&self) -> Result<Vec<String>, TrendError> {
        let resp = self.client.get(&self.config.trend_api_url).send().await?;
        if !resp.status().is_success() {
            return Err(TrendError::Fetch(format!("HTTP {}", resp.status())));
        }
        let body = resp.text().await?;
        // The endpoint prefixes its JSON with an anti-hijacking marker.
        let json = body.trim_start_matches(")]}',").trim_start();
        let value: Value =
            serde_json::from_str(json).map_err(|e| TrendError::Fetch(e.to_string()))?;

        let mut trends = Vec::new();
        if let Some(days) = value["default"]["trendingSearchesDays"].as_array() {
            for day in days {
                if let Some(searches) = day["trendingSearches"].as_array() {
                    for entry in searches {
                        if let Some(query) = entry["title"]["query"].as_str() {
                            trends.push(query.to_string());
                        }
                    }
                }
            }
        }
        if trends.is_empty() {
            return Err(TrendError::Empty);
        }
        trends.truncate(self.config.max_per_source);
        Ok(trends)
    }

    async fn fetch_syndication(&self) -> Result<Vec<String>, TrendError> {
        for url in &self.config.feed_urls {
            let resp = match self.client.get(url).send().await {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    warn!("Feed {} returned HTTP {}", url, r.status());
                    continue;
                }
                Err(e) => {
                    warn!("Feed {} failed: {}", url, e);
                    continue;
                }
            };
            let bytes = match resp.bytes().await {
                Ok(b) => b,
                Err(e) => {
                    warn!("Feed {} body read failed: {}", url, e);
                    continue;
                }
            };
            let feed = match feed_rs::parser::parse(std::io::Cursor::new(bytes)) {
                Ok(f) => f,
                Err(e) => {
                    warn!("Feed {} parse failed: {}", url, e);
                    continue;
                }
            };
            let titles: Vec<String> = feed
                .entries
                .into_iter()
                .filter_map(|entry| entry.title.map(|t| t.content))
                .filter(|t| !t.trim().is_empty())
                .take(self.config.max_per_source)
                .collect();
            if !titles.is_empty() {
                return Ok(titles);
            }
        }
        Err(TrendError::Empty)
    }

    async fn fetch_community(&self) -> Result<Vec<String>, TrendError> {
        let mut titles = Vec::new();
        for url in &self.config.community_urls {
            let value: Value = match self.client.get(url).send().await {
                Ok(r) if r.status().is_success() => match r.json().await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("Listing {} decode failed: {}", url, e);
                        continue;
                    }
                },
                Ok(r) => {
                    warn!("Listing {} returned HTTP {}", url, r.status());
                    continue;
                }
                Err(e) => {
                    warn!("Listing {} failed: {}", url, e);
                    continue;
                }
            };
            if let Some(children) = value["data"]["children"].as_array() {
                for post in children {
                    if let Some(title) = post["data"]["title"].as_str() {
                        if !title.is_empty() && title.len() < 100 {
                            titles.push(title.to_string());
                        }
                    }
                }
            }
            if titles.len() >= 5 {
                break;
            }
        }
        if titles.is_empty() {
            return Err(TrendError::Empty);
        }
        titles.truncate(self.config.max_per_source);
        Ok(titles)
    }

    async fn fetch_aggregator(&self) -> Result<Vec<String>, TrendError> {
        let url = self
            .config
            .aggregator_url
            .as_deref()
            .ok_or(TrendError::NotConfigured)?;

        let mut req = self.client.get(url);
        if let Some(key) = &self.config.aggregator_api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(TrendError::Fetch(format!("HTTP {}", resp.status())));
        }
        let value: Value = resp.json().await.map_err(TrendError::from)?;

        // Accept either a bare array of strings or {"trends": [{"name": ...}]}.
        let mut trends = Vec::new();
        let items = value
            .as_array()
            .or_else(|| value["trends"].as_array())
            .ok_or(TrendError::Empty)?;
        for item in items {
            match item {
                Value::String(s) => trends.push(s.clone()),
                obj => {
                    if let Some(name) = obj["name"].as_str().or_else(|| obj["title"].as_str()) {
                        trends.push(name.to_string());
                    }
                }
            }
        }
        if trends.is_empty() {
            return Err(TrendError::Empty);
        }
        trends.truncate(self.config.max_per_source);
        Ok(trends)
    }
}

fn has_dangerous_chars(s: &str) -> bool {
    // Fail closed: a missing pattern means we cannot vouch for the string.
    DANGEROUS_CHARS.as_ref().map(|re| re.is_match(s)).unwrap_or(true)
}

/// Seasonal + evergreen topics for the current month, shuffled, capped at 10.
fn curated_topics() -> Vec<String> {
    let month = chrono::Local::now().month() as usize; // 1-12
    let seasonal = SEASONAL_TOPICS[month.saturating_sub(1).min(11)];

    let mut all: Vec<&str> = seasonal.iter().chain(EVERGREEN_TOPICS.iter()).copied().collect();
    all.shuffle(&mut rand::thread_rng());
    all.truncate(10);
    all.into_iter().map(|s| s.to_string()).collect()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> TrendsConfig {
        TrendsConfig {
            min_fetch_interval_secs: 0,
            ..TrendsConfig::default()
        }
    }

    #[test]
    fn fallback_list_is_entirely_safe() {
        // Regression guard on the curated list itself: the fallback promise
        // is "safe by construction", so construction gets tested.
        for topic in FALLBACK_TOPICS {
            assert!(!safety::is_unsafe(topic), "fallback topic '{}' is unsafe", topic);
            assert!(!has_dangerous_chars(topic));
        }
        assert_eq!(FALLBACK_TOPICS.len(), 20);
    }

    #[test]
    fn screen_batch_applies_structural_filter() {
        let processor = TrendsProcessor::new(quiet_config());
        let raw = vec![
            "ok".to_string(),                       // too short
            "x".repeat(200),                        // too long
            "weird <script> topic".to_string(),     // dangerous chars
            "City update - Austin, TX".to_string(), // headline shape
            "Sustainable coffee brewing tips".to_string(),
        ];
        let safe = processor.screen_batch(&raw).unwrap();
        assert_eq!(safe, vec!["Sustainable coffee brewing tips"]);
    }

    #[test]
    fn screen_batch_abandons_after_consecutive_unsafe() {
        let processor = TrendsProcessor::new(quiet_config());
        let raw = vec![
            "Senator X killed in attack".to_string(),
            "Bomb scare downtown".to_string(),
            "Murder trial verdict".to_string(),
            // Never reached: the third consecutive unsafe candidate ends
            // the source.
            "Sustainable coffee brewing tips".to_string(),
        ];
        assert!(processor.screen_batch(&raw).is_none());
    }

    #[test]
    fn unsafe_streak_resets_on_safe_candidate() {
        let processor = TrendsProcessor::new(quiet_config());
        let raw = vec![
            "Senator X killed in attack".to_string(),
            "Sustainable coffee brewing tips".to_string(),
            "Bomb scare downtown".to_string(),
            "Local flower show highlights".to_string(),
            "Murder trial verdict".to_string(),
            "Cozy home decor".to_string(),
        ];
        let safe = processor.screen_batch(&raw).unwrap();
        assert_eq!(
            safe,
            vec![
                "Sustainable coffee brewing tips",
                "Local flower show highlights",
                "Cozy home decor"
            ]
        );
    }

    #[test]
    fn screen_batch_caps_per_source() {
        let config = TrendsConfig {
            max_per_source: 2,
            ..quiet_config()
        };
        let processor = TrendsProcessor::new(config);
        let raw: Vec<String> = (0..5).map(|i| format!("Pleasant topic number {}", i)).collect();
        assert_eq!(processor.screen_batch(&raw).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn all_unsafe_sources_fall_back_to_curated_list() {
        let config = TrendsConfig {
            source_order: vec!["pinned".into()],
            pinned_topics: vec![
                "Senator X killed in attack".into(),
                "Bomb scare downtown".into(),
                "Murder trial verdict".into(),
            ],
            ..quiet_config()
        };
        let processor = TrendsProcessor::new(config);
        let trends = processor.fetch_safe_trends().await;
        let expected: Vec<String> = FALLBACK_TOPICS.iter().map(|s| s.to_string()).collect();
        assert_eq!(trends, expected);
        assert!(!trends.is_empty());
        assert!(trends.iter().all(|t| !safety::is_unsafe(t)));
    }

    #[tokio::test]
    async fn pinned_safe_topics_win_and_get_cached() {
        let config = TrendsConfig {
            source_order: vec!["pinned".into()],
            pinned_topics: vec![
                "Sustainable coffee brewing tips".into(),
                "Cozy home decor".into(),
            ],
            ..quiet_config()
        };
        let processor = TrendsProcessor::new(config);

        let first = processor.fetch_safe_trends().await;
        assert_eq!(first, vec!["Sustainable coffee brewing tips", "Cozy home decor"]);

        let info = processor.debug_info().await;
        assert_eq!(info["cache_valid"], true);
        assert_eq!(info["cached_count"], 2);

        // Second call is a cache hit and returns the same set.
        let second = processor.fetch_safe_trends().await;
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_source_names_fall_back_to_default_chain() {
        let config = TrendsConfig {
            source_order: vec!["nonsense".into()],
            ..quiet_config()
        };
        let processor = TrendsProcessor::new(config);
        assert_eq!(processor.sources, TrendSource::default_chain());
    }

    #[test]
    fn curated_generator_always_produces() {
        let topics = curated_topics();
        assert!(!topics.is_empty());
        assert!(topics.len() <= 10);
        assert!(topics.iter().all(|t| !t.is_empty()));
    }
}
