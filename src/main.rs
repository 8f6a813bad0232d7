use std::{path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use downstream_requester::{
    DownstreamContext, DownstreamRequest, HandlerRegistry, HttpRequester, MemoryClientPool,
    Requester, ReqwestTransportFactory,
    config::{ConfigValidator, RequesterConfig, load_config},
    tracing_setup,
};
use http::{HeaderName, HeaderValue, Method};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Commands,

    /// Log filter directive (e.g. "info", "downstream_requester=debug")
    #[clap(long, default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[clap(long, global = true)]
    json_logs: bool,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Send one request through the configured route
    Send {
        /// Configuration file to use
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
        /// Route name under `routes`
        #[clap(short, long)]
        route: String,
        #[clap(short, long, default_value = "GET")]
        method: String,
        /// Downstream URL
        #[clap(short, long)]
        url: String,
        /// Extra request header, `name:value` (repeatable)
        #[clap(short = 'H', long = "header")]
        headers: Vec<String>,
        /// Request body
        #[clap(short, long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    tracing_setup::init_tracing_with_config(&args.log_level, args.json_logs)?;

    match args.command {
        Commands::Validate { config } => validate_config_command(&config).await,
        Commands::Send {
            config,
            route,
            method,
            url,
            headers,
            body,
        } => send_command(&config, &route, &method, &url, &headers, body).await,
    }
}

async fn load_validated(config_path: &str) -> Result<(RequesterConfig, HandlerRegistry)> {
    if !Path::new(config_path).exists() {
        return Err(eyre!("Configuration file '{config_path}' not found"));
    }

    let config = load_config(config_path)
        .await
        .wrap_err("Configuration parsing failed")?;
    let registry = HandlerRegistry::from_config(&config);
    ConfigValidator::validate(&config, &registry.names())
        .wrap_err("Configuration validation failed")?;

    Ok((config, registry))
}

/// Validate a configuration file and print a summary
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    let (config, registry) = match load_validated(config_path).await {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ {e:#}");
            std::process::exit(1);
        }
    };

    println!("✅ Configuration validation: OK");
    println!();
    println!("📋 Configuration Summary:");
    println!("   • Routes: {}", config.routes.len());
    println!("   • Default timeout: {}", config.default_timeout);
    println!("   • Pool expiry: {}", config.pool.expiry);
    println!("   • Global handlers: {:?}", config.global_handlers);
    println!("   • Known handlers: {:?}", registry.names());
    Ok(())
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| eyre!("Header '{raw}' must be formatted as name:value"))?;
    let name = name
        .trim()
        .parse::<HeaderName>()
        .wrap_err_with(|| format!("Invalid header name in '{raw}'"))?;
    let value = HeaderValue::from_str(value.trim())
        .wrap_err_with(|| format!("Invalid header value in '{raw}'"))?;
    Ok((name, value))
}

/// Issue one downstream request and print the response as JSON
async fn send_command(
    config_path: &str,
    route_name: &str,
    method: &str,
    url: &str,
    headers: &[String],
    body: Option<String>,
) -> Result<()> {
    let (config, registry) = load_validated(config_path).await?;
    let route = config
        .routes
        .get(route_name)
        .cloned()
        .ok_or_else(|| eyre!("Route '{route_name}' is not configured"))?;

    let pool = Arc::new(MemoryClientPool::new());
    let shutdown = CancellationToken::new();
    let sweeper = config
        .pool
        .sweep_interval()?
        .map(|interval| Arc::clone(&pool).spawn_sweeper(interval, shutdown.clone()));

    let requester = HttpRequester::new(
        pool,
        Arc::new(ReqwestTransportFactory),
        Arc::new(registry),
        config.settings()?,
    );

    let method = method
        .to_uppercase()
        .parse::<Method>()
        .wrap_err_with(|| format!("Invalid method '{method}'"))?;
    let mut request = DownstreamRequest::new(method, url);
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        request = request.with_header(name, value);
    }
    if let Some(body) = body {
        request = request.with_body(body);
    }

    let context = DownstreamContext::new(Arc::new(route), request);
    let outcome = requester.get_response(&context).await;

    shutdown.cancel();
    if let Some(sweeper) = sweeper {
        sweeper.await.wrap_err("Pool sweeper panicked")?;
    }

    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            eprintln!("❌ {}: {}", e.kind(), e);
            std::process::exit(1);
        }
    };

    let status = response.status();
    let headers: serde_json::Map<String, serde_json::Value> = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                serde_json::Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            )
        })
        .collect();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .wrap_err("Failed to read downstream response body")?;

    let output = serde_json::json!({
        "status": status.as_u16(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let (name, value) = parse_header("X-Tenant: acme").unwrap();
        assert_eq!(name, "x-tenant");
        assert_eq!(value, "acme");

        assert!(parse_header("no-separator").is_err());
        assert!(parse_header("bad name:value").is_err());
    }

    #[test]
    fn test_cli_parses_send() {
        let args = Args::parse_from([
            "downstream-requester",
            "send",
            "--route",
            "orders",
            "--url",
            "http://localhost/orders",
            "-H",
            "X-A:1",
            "-H",
            "X-B:2",
        ]);
        match args.command {
            Commands::Send { route, headers, method, .. } => {
                assert_eq!(route, "orders");
                assert_eq!(method, "GET");
                assert_eq!(headers.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
