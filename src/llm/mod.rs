use crate::config::LlmConfig;
use crate::repair::{self, AdText};
use crate::story::SpicedStory;
use tracing::{debug, info, warn};

// ── Request types ───────────────────────────────────────────────────────────

/// What the caller wants an ad for.
#[derive(Debug, Clone)]
pub struct ProductBrief {
    pub product: String,
    pub audience: String,
    pub tone: String,
    /// Marketplace product id, used as a reference link in the prompt
    pub asin: Option<String>,
}

/// Prompt template family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PromptStyle {
    Standard,
    Creative,
    Concise,
    Tech,
}

impl PromptStyle {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "standard" => PromptStyle::Standard,
            "creative" => PromptStyle::Creative,
            "concise" => PromptStyle::Concise,
            "tech" => PromptStyle::Tech,
            _ => {
                warn!("Unknown prompt style '{}', defaulting to 'standard'", s);
                PromptStyle::Standard
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStyle::Standard => "standard",
            PromptStyle::Creative => "creative",
            PromptStyle::Concise => "concise",
            PromptStyle::Tech => "tech",
        }
    }
}

// ── Prompt templates ────────────────────────────────────────────────────────

const STANDARD_TEMPLATE: &str = "\
IMPORTANT: You must output a single, valid UTF-8 JSON object. Absolutely nothing else.

Context:
You are generating a realistic product ad for the following:
- Product: {product}
- Target Audience: {audience}
- Tone: {tone}
- Reference Link: https://www.amazon.com/dp/{asin}

The goal is to:
1. Write an ad description using the specified tone and audience.
2. Provide a detailed scene prompt for use in image generation (include setting, objects, people if relevant).

STRICT RULES (failure on any rule makes the output invalid):
1. Output only a raw JSON object. No markdown, no comments, no backticks, no prose.
2. All keys must be double-quoted ASCII.
3. All string values must be double-quoted UTF-8 with no control characters.
4. No trailing commas, missing commas, or malformed brackets/braces.
5. You MUST return at least these keys:
   - \"product\": string
   - \"audience\": string or list of strings
   - \"tone\": string
   - \"description\": string
   - \"features\": list of strings
   - \"scene\": a richly detailed text prompt for image generation

DO NOT wrap the JSON in quotes, add ```json blocks, or escape the entire response.";

const CREATIVE_TEMPLATE: &str = "\
Generate a creative advertisement in JSON format for:
Product: {product}
Target: {audience}
Style: {tone}
Reference: https://www.amazon.com/dp/{asin}

Focus on emotional connection and storytelling. Return only valid JSON with:
product, audience, tone, description, features, scene

Keep the description compelling and the scene visually rich for image generation.";

const CONCISE_TEMPLATE: &str = "\
Create a JSON ad for {product} targeting {audience} with a {tone} tone.
Reference: https://www.amazon.com/dp/{asin}
Return only JSON with keys: product, audience, tone, description, features, scene";

const TECH_TEMPLATE: &str = "\
Technical product advertisement for {product}:
Target: {audience}
Tone: {tone}
Link: https://www.amazon.com/dp/{asin}

Emphasize specifications, performance, and technical benefits.
Return only a JSON object with keys: product, audience, tone, description, features, scene.";

fn template_for(style: PromptStyle) -> &'static str {
    match style {
        PromptStyle::Standard => STANDARD_TEMPLATE,
        PromptStyle::Creative => CREATIVE_TEMPLATE,
        PromptStyle::Concise => CONCISE_TEMPLATE,
        PromptStyle::Tech => TECH_TEMPLATE,
    }
}

// ── Client ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            config: config.clone(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    /// Generate ad copy for a brief, optionally themed around a trend story.
    /// The model response goes through the repair chain, so this only fails
    /// on transport errors — never on output format.
    pub async fn generate_ad_text(
        &self,
        brief: &ProductBrief,
        trend: Option<&SpicedStory>,
    ) -> anyhow::Result<AdText> {
        let prompt = self.build_ad_prompt(brief, trend);
        debug!("LLM prompt built ({} chars)", prompt.len());

        let raw = self.complete(&prompt).await?;
        let (record, strategy) = repair::repair_traced(&raw);
        info!(
            "Ad text recovered via {} (product: {})",
            strategy.as_str(),
            record.product
        );
        Ok(record)
    }

    /// Assemble the full prompt: configured custom template, or the selected
    /// style template, plus an optional trend-context block.
    pub fn build_ad_prompt(&self, brief: &ProductBrief, trend: Option<&SpicedStory>) -> String {
        let template = self
            .config
            .custom_prompt
            .as_deref()
            .unwrap_or_else(|| template_for(PromptStyle::from_str(&self.config.prompt_style)));

        let mut prompt = template
            .replace("{product}", &brief.product)
            .replace("{audience}", &brief.audience)
            .replace("{tone}", &brief.tone)
            .replace("{asin}", brief.asin.as_deref().unwrap_or(""));

        if let Some(story) = trend {
            prompt.push_str(&format!(
                "\n\nTrending context (weave naturally into the ad and the scene):\n\
                 - Theme: {}\n\
                 - Visually emphasize: {}",
                story.spiced_story,
                story.hook_keywords.join(", ")
            ));
        }

        prompt
    }

    /// Send a prompt and return the raw response text.
    pub async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        match self.config.backend.as_str() {
            "ollama" => self.ollama(prompt).await,
            "openai_compatible" => self.openai_compat(prompt).await,
            other => anyhow::bail!("Unknown backend: {}", other),
        }
    }

    // ---- Backend implementations ----

    async fn ollama(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/api/generate", self.config.endpoint);
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": self.config.max_tokens,
            }
        });

        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!(
                "Ollama error {}: {}",
                resp.status(),
                resp.text().await.unwrap_or_default()
            );
        }
        // The whole envelope goes back verbatim — the repair chain knows how
        // to unwrap the "response" field, and keeping this layer dumb means
        // a malformed envelope degrades instead of erroring.
        Ok(resp.text().await?)
    }

    async fn openai_compat(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/chat/completions", self.config.endpoint);
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            if !key.is_empty() {
                req = req.header("Authorization", format!("Bearer {}", key));
            }
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            anyhow::bail!(
                "LLM API error {}: {}",
                resp.status(),
                resp.text().await.unwrap_or_default()
            );
        }
        let result: serde_json::Value = resp.json().await?;
        Ok(result["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::story;

    fn client_with(style: &str, custom: Option<&str>) -> LlmClient {
        LlmClient::new(&LlmConfig {
            prompt_style: style.to_string(),
            custom_prompt: custom.map(|s| s.to_string()),
            ..LlmConfig::default()
        })
    }

    fn brief() -> ProductBrief {
        ProductBrief {
            product: "Trail Camera".into(),
            audience: "hikers".into(),
            tone: "excited".into(),
            asin: Some("B000TEST00".into()),
        }
    }

    #[test]
    fn prompt_style_parsing() {
        assert_eq!(PromptStyle::from_str("standard"), PromptStyle::Standard);
        assert_eq!(PromptStyle::from_str("CREATIVE"), PromptStyle::Creative);
        assert_eq!(PromptStyle::from_str("tech"), PromptStyle::Tech);
        assert_eq!(PromptStyle::from_str("garbage"), PromptStyle::Standard);
    }

    #[test]
    fn prompt_includes_brief_and_required_keys() {
        let prompt = client_with("standard", None).build_ad_prompt(&brief(), None);
        assert!(prompt.contains("Trail Camera"));
        assert!(prompt.contains("hikers"));
        assert!(prompt.contains("excited"));
        assert!(prompt.contains("B000TEST00"));
        for key in crate::repair::REQUIRED_KEYS {
            assert!(prompt.contains(key), "prompt missing key '{}'", key);
        }
    }

    #[test]
    fn trend_block_is_appended() {
        let story = story::fallback_story();
        let prompt = client_with("concise", None).build_ad_prompt(&brief(), Some(&story));
        assert!(prompt.contains("Trending context"));
        assert!(prompt.contains(&story.spiced_story));
        assert!(prompt.contains("summer, celebration"));
    }

    #[test]
    fn custom_template_overrides_style() {
        let prompt = client_with("standard", Some("Sell {product} to {audience}, {tone}."))
            .build_ad_prompt(&brief(), None);
        assert_eq!(prompt, "Sell Trail Camera to hikers, excited.");
    }

    #[test]
    fn missing_asin_renders_empty() {
        let mut b = brief();
        b.asin = None;
        let prompt = client_with("concise", None).build_ad_prompt(&b, None);
        assert!(prompt.contains("https://www.amazon.com/dp/\n"));
    }
}
