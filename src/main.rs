mod campaign;
mod config;
mod llm;
mod media;
mod repair;
mod safety;
mod server;
mod story;
mod trends;

use crate::campaign::CampaignRunner;
use crate::config::Config;
use crate::llm::LlmClient;
use crate::server::{build_router, AppState};
use crate::trends::TrendsProcessor;
use clap::Parser;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "adforge", about = "Ad-campaign pipeline orchestrator: LLM ad copy, safe trend sourcing, image/video generation glue")]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(Parser)]
enum SubCommand {
    /// Start the HTTP API (default)
    Serve,
    /// Show resolved configuration
    Status,
    /// Check reachability of the downstream services
    Doctor,
    /// Run a raw model response through the repair chain
    Repair {
        /// Read from this file instead of stdin
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Fetch the current safe trend set
    Trends,
    /// Fetch trends and render a story from them
    Story,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adforge=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(Path::new(&cli.config))?;

    match cli.command {
        Some(SubCommand::Status) => {
            println!("Model: {} via {}", config.llm.model, config.llm.backend);
            println!("LLM endpoint: {}", config.llm.endpoint);
            println!("Image service: {}", config.generation.image_service_url);
            println!("Video service: {} (enabled: {})", config.generation.video_service_url, config.generation.video_enabled);
            println!("Poster service: {}", config.generation.poster_service_url);
            println!("Trend cache TTL: {}s | fetch gate: {}s", config.trends.cache_ttl_secs, config.trends.min_fetch_interval_secs);
            return Ok(());
        }
        Some(SubCommand::Doctor) => {
            return run_doctor(&config).await;
        }
        Some(SubCommand::Repair { file }) => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(&path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let (record, strategy) = repair::repair_traced(&raw);
            eprintln!("strategy: {}", strategy.as_str());
            println!("{}", serde_json::to_string_pretty(&record)?);
            return Ok(());
        }
        Some(SubCommand::Trends) => {
            let processor = TrendsProcessor::new(config.trends.clone());
            for trend in processor.fetch_safe_trends().await {
                println!("{}", trend);
            }
            return Ok(());
        }
        Some(SubCommand::Story) => {
            let processor = TrendsProcessor::new(config.trends.clone());
            let candidates = processor.fetch_safe_trends().await;
            let selected = story::select_with_retry(&candidates);
            println!("{}", serde_json::to_string_pretty(&selected)?);
            return Ok(());
        }
        _ => {} // Serve (default)
    }

    // ---- Initialize components ----
    info!("🎨 Adforge v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Model: {} via {} | Image: {} | Video: {} | Poster: {}",
        config.llm.model,
        config.llm.backend,
        config.generation.image_service_url,
        config.generation.video_service_url,
        config.generation.poster_service_url
    );

    let llm = Arc::new(LlmClient::new(&config.llm));
    let processor = Arc::new(TrendsProcessor::new(config.trends.clone()));
    let runner = Arc::new(CampaignRunner::new(
        &config.generation,
        llm.clone(),
        processor.clone(),
    ));

    let state = AppState {
        runner,
        trends: processor,
        llm,
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🌐 Server: http://{}", addr);
    info!("   POST /campaign | POST /campaign/trending | GET /trends");

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
    }
    Ok(())
}

async fn run_doctor(config: &Config) -> anyhow::Result<()> {
    println!("🩺 Adforge Doctor\n");

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap_or_default();

    let checks = [
        ("LLM service", config.llm.endpoint.clone()),
        ("Image service", config.generation.image_service_url.clone()),
        ("Video service", config.generation.video_service_url.clone()),
        ("Poster service", config.generation.poster_service_url.clone()),
    ];

    for (name, url) in checks {
        match client.get(&url).send().await {
            Ok(resp) => println!("  ✅ {}: {} (HTTP {})", name, url, resp.status()),
            Err(e) => println!("  ❌ {}: {} ({})", name, url, e),
        }
    }

    println!("\n🧠 Model: {} via {}", config.llm.model, config.llm.backend);
    println!("📈 Trend sources gate: {}s, cache TTL: {}s", config.trends.min_fetch_interval_secs, config.trends.cache_ttl_secs);
    if !config.trends.pinned_topics.is_empty() {
        println!("📌 Pinned topics: {:?}", config.trends.pinned_topics);
    }
    if config.generation.video_enabled {
        println!("🎬 Video generation enabled ({}s @ {}fps)", config.generation.video_duration_secs, config.generation.video_fps);
    }

    println!("\n✨ Doctor complete.");
    Ok(())
}
