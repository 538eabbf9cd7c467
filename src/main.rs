//! # Mock Backend - Main Entry Point
//!
//! Loads configuration, seeds fixtures, builds the router and then serves requests read from
//! stdin, one per line:
//!
//! ```text
//! GET /users
//! POST /users {"gender":"female","name":{"first":"pamela"}}
//! DELETE /users/2
//! ```
//!
//! Every response envelope is printed to stdout as a single JSON line. Logs go to stderr.
//!
//! Usage: `mock-backend [config.yaml|config.json]`

use http::Method;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

use mock_backend::observability::init_logging;
use mock_backend::{BackendConfig, MockError, MockRequest, MockResponse, MockResult, Router};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(error = %err, "Mock backend failed");
        eprintln!("mock-backend: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> MockResult<()> {
    let config = load_config(std::env::args().nth(1)).await?;
    init_logging(&config.logging);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting mock backend");

    let router = config.bootstrap().await?.build()?;
    for (method, pattern) in router.routes() {
        info!(%method, %pattern, "Route");
    }

    serve_stdin(&router).await
}

/// Load configuration from the given path, or defaults plus environment overrides
async fn load_config(path: Option<String>) -> MockResult<BackendConfig> {
    match path {
        Some(path) if Path::new(&path).extension().and_then(|ext| ext.to_str()) == Some("json") => {
            BackendConfig::load_from_json(&path).await
        }
        Some(path) => BackendConfig::load_from_file(&path).await,
        None => {
            let mut config = BackendConfig::default();
            config.apply_env_overrides()?;
            config.validate()?;
            Ok(config)
        }
    }
}

async fn serve_stdin(router: &Router) -> MockResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let response = match parse_request_line(&line) {
            Ok(request) => match router.dispatch(&request).await {
                Ok(response) => response,
                Err(err) => {
                    error!(error = %err, error_type = err.error_type(), "Dispatch failed");
                    MockResponse::from(err)
                }
            },
            Err(err) => err.into_response(),
        };

        let mut output = serde_json::to_vec(&response)?;
        output.push(b'\n');
        stdout.write_all(&output).await?;
        stdout.flush().await?;
    }

    info!("Input closed, shutting down");
    Ok(())
}

/// Parse `VERB /path [json-body]`
fn parse_request_line(line: &str) -> MockResult<MockRequest> {
    let mut parts = line.trim().splitn(3, char::is_whitespace);

    let verb = parts
        .next()
        .ok_or_else(|| MockError::invalid_request("missing verb"))?;
    let method = Method::from_bytes(verb.to_uppercase().as_bytes())
        .map_err(|_| MockError::invalid_request(format!("invalid verb: {}", verb)))?;

    let path = parts
        .next()
        .filter(|path| path.starts_with('/'))
        .ok_or_else(|| MockError::invalid_request("expected a path starting with '/'"))?;

    let mut request = MockRequest::new(method, path);
    if let Some(body) = parts.next().map(str::trim).filter(|body| !body.is_empty()) {
        request = request
            .with_body(body)
            .with_header("content-type", "application/json");
    }

    Ok(request)
}
