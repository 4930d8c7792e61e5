use crate::campaign::{CampaignOptions, CampaignRunner};
use crate::llm::{LlmClient, ProductBrief};
use crate::story;
use crate::trends::TrendsProcessor;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<CampaignRunner>,
    pub trends: Arc<TrendsProcessor>,
    pub llm: Arc<LlmClient>,
}

#[derive(Serialize)]
struct R {
    ok: bool,
    data: Option<serde_json::Value>,
    error: Option<String>,
}
impl R {
    fn ok<T: Serialize>(d: T) -> Json<R> {
        Json(R {
            ok: true,
            data: Some(serde_json::to_value(d).unwrap_or_default()),
            error: None,
        })
    }
    fn err(m: &str) -> Json<R> {
        Json(R {
            ok: false,
            data: None,
            error: Some(m.into()),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Campaigns
        .route("/campaign", post(run_campaign))
        .route("/campaign/trending", post(run_trending_campaign))
        // Trends
        .route("/trends", get(list_trends))
        .route("/trends/story", get(trend_story))
        .route("/trends/debug", get(trends_debug))
        // Generated asset downloads (proxied from the generation services)
        .route("/download/image/:filename", get(download_image))
        .route("/download/video/:filename", get(download_video))
        // Service info
        .route("/health", get(health))
        .route("/status", get(status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---- Campaigns ----

#[derive(Debug, Deserialize)]
struct CampaignRequest {
    product: String,
    audience: String,
    tone: String,
    #[serde(default, alias = "ASIN")]
    asin: Option<String>,
    #[serde(default)]
    brand_text: Option<String>,
    #[serde(default)]
    cta_text: Option<String>,
    #[serde(default)]
    with_video: Option<bool>,
}

impl CampaignRequest {
    fn brief(&self) -> ProductBrief {
        ProductBrief {
            product: self.product.clone(),
            audience: self.audience.clone(),
            tone: self.tone.clone(),
            asin: self.asin.clone(),
        }
    }

    fn options(&self) -> CampaignOptions {
        CampaignOptions {
            brand_text: self.brand_text.clone(),
            cta_text: self.cta_text.clone(),
            with_video: self.with_video,
        }
    }
}

async fn run_campaign(
    State(s): State<AppState>,
    Json(req): Json<CampaignRequest>,
) -> impl IntoResponse {
    info!("Campaign request: {} / {}", req.product, req.audience);
    match s.runner.run(&req.brief(), &req.options()).await {
        Ok(campaign) => R::ok(campaign),
        Err(e) => {
            error!("Campaign failed: {}", e);
            R::err(&e.to_string())
        }
    }
}

async fn run_trending_campaign(
    State(s): State<AppState>,
    Json(req): Json<CampaignRequest>,
) -> impl IntoResponse {
    info!("Trending campaign request: {} / {}", req.product, req.audience);
    match s.runner.run_trending(&req.brief(), &req.options()).await {
        Ok(campaign) => R::ok(campaign),
        Err(e) => {
            error!("Trending campaign failed: {}", e);
            R::err(&e.to_string())
        }
    }
}

// ---- Trends ----

async fn list_trends(State(s): State<AppState>) -> impl IntoResponse {
    R::ok(s.trends.fetch_safe_trends().await)
}

async fn trend_story(State(s): State<AppState>) -> impl IntoResponse {
    let candidates = s.trends.fetch_safe_trends().await;
    R::ok(story::select_with_retry(&candidates))
}

async fn trends_debug(State(s): State<AppState>) -> impl IntoResponse {
    R::ok(s.trends.debug_info().await)
}

// ---- Downloads ----

async fn download_image(State(s): State<AppState>, Path(filename): Path<String>) -> Response {
    match s.runner.fetch_image(&filename).await {
        Ok(bytes) => asset_response(bytes, "image/png", &filename),
        Err(e) => not_found(&e.to_string()),
    }
}

async fn download_video(State(s): State<AppState>, Path(filename): Path<String>) -> Response {
    match s.runner.fetch_video(&filename).await {
        Ok(bytes) => asset_response(bytes, "video/mp4", &filename),
        Err(e) => not_found(&e.to_string()),
    }
}

fn asset_response(bytes: Vec<u8>, content_type: &str, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

fn not_found(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"ok": false, "error": message})),
    )
        .into_response()
}

// ---- Service info ----

async fn health() -> impl IntoResponse {
    R::ok("ok")
}

async fn status(State(s): State<AppState>) -> impl IntoResponse {
    R::ok(serde_json::json!({
        "model": s.llm.model_name(),
        "trends": s.trends.debug_info().await,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
