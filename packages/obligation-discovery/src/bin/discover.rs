//! CLI for running one obligation discovery
//!
//! Prints the JSON envelope to stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use obligation_discovery::{
    BusinessStructure, ChromiumDriver, Discoverer, DiscoveryConfig, DiscoveryRequest,
    SessionConfig,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "obligation-discover")]
#[command(about = "Find the licences and permits a business needs")]
struct Cli {
    /// Australian postcode where the business operates
    #[arg(long)]
    postcode: Option<String>,

    /// What the business does, e.g. "Café / Restaurant"
    #[arg(long)]
    activity: Option<String>,

    /// ANZSIC industry code
    #[arg(long)]
    anzsic: Option<String>,

    /// Legal structure (sole-trader, partnership, company, non-profit)
    #[arg(long, value_parser = parse_structure)]
    structure: Option<BusinessStructure>,

    /// JSON request file; flags override its fields
    #[arg(long)]
    request: Option<PathBuf>,
}

fn parse_structure(raw: &str) -> std::result::Result<BusinessStructure, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("unknown business structure '{}'", raw))
}

/// Process configuration loaded from environment variables
#[derive(Debug, Clone)]
struct Config {
    search_url: Option<String>,
    site_origin: Option<String>,
    results_timeout_ms: Option<u64>,
    chrome_executable: Option<String>,
    headful: bool,
}

impl Config {
    fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let results_timeout_ms = match env::var("RESULTS_TIMEOUT_MS") {
            Ok(raw) => Some(
                raw.parse()
                    .context("RESULTS_TIMEOUT_MS must be a number of milliseconds")?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            search_url: env::var("OBLIGATION_SEARCH_URL").ok(),
            site_origin: env::var("OBLIGATION_SITE_ORIGIN").ok(),
            results_timeout_ms,
            chrome_executable: env::var("CHROME_EXECUTABLE").ok(),
            headful: env::var("CHROME_HEADFUL")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }

    fn discovery(&self) -> DiscoveryConfig {
        let mut session = SessionConfig::new();
        if let Some(url) = &self.search_url {
            session = session.with_search_url(url);
        }
        if let Some(origin) = &self.site_origin {
            session = session.with_site_origin(origin);
        }
        if let Some(ms) = self.results_timeout_ms {
            session = session.with_results_timeout(Duration::from_millis(ms));
        }
        DiscoveryConfig::new().with_session(session)
    }

    fn driver(&self) -> ChromiumDriver {
        let mut driver = ChromiumDriver::new();
        if let Some(path) = &self.chrome_executable {
            driver = driver.with_executable(path);
        }
        if self.headful {
            driver = driver.headful();
        }
        driver
    }
}

fn build_request(cli: &Cli) -> Result<DiscoveryRequest> {
    let mut request = match &cli.request {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Invalid request JSON in {}", path.display()))?
        }
        None => DiscoveryRequest::default(),
    };

    if let Some(postcode) = &cli.postcode {
        request.postcode = postcode.clone();
    }
    if let Some(activity) = &cli.activity {
        request.activity_description = activity.clone();
    }
    if let Some(code) = &cli.anzsic {
        request.anzsic_code = Some(code.clone());
    }
    if let Some(structure) = cli.structure {
        request.business_structure = Some(structure);
    }
    Ok(request)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,obligation_discovery=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let request = build_request(&cli)?;

    let discoverer = Discoverer::new(config.driver(), config.discovery())
        .context("Invalid discovery configuration")?;

    match discoverer.discover_envelope(&request).await {
        Ok(envelope) => {
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(envelope) => {
            tracing::error!(status = envelope.status, error = %envelope.error, "Discovery failed");
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(ExitCode::FAILURE)
        }
    }
}
