use std::path::PathBuf;

use axum::http::{Method, StatusCode};
use clap::Parser;

use chainserve::config::{self, ServerConfig, TlsConfig};
use chainserve::observability;
use chainserve::{from_fn, EngineBuilder, Group, Unit};

#[derive(Parser)]
#[command(name = "chainserve")]
#[command(about = "Minimal HTTP request dispatch server", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file).
    #[arg(short, long)]
    port: Option<u16>,

    /// PEM certificate; serves HTTPS together with --key.
    #[arg(long, requires = "key")]
    cert: Option<String>,

    /// PEM private key.
    #[arg(long, requires = "cert")]
    key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if let (Some(cert_path), Some(key_path)) = (cli.cert, cli.key) {
        config.listener.tls = Some(TlsConfig {
            cert_path,
            key_path,
        });
    }

    observability::logging::init(&config.observability);
    tracing::info!("chainserve v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        tls = config.listener.tls.is_some(),
        root_path = %config.dispatch.root_path,
        "Configuration loaded"
    );

    let mut builder = EngineBuilder::with_config(&config.dispatch)?;
    register_routes(&mut builder)?;
    let engine = builder.build();

    engine.run(&config.listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn register_routes(builder: &mut EngineBuilder) -> Result<(), chainserve::RouteError> {
    builder.append_middleware(access_log());

    builder.register(
        Method::GET,
        "/index",
        [from_fn(|ctx| {
            Box::pin(async move {
                ctx.respond("chainserve is running\n");
            })
        })],
    )?;

    builder.group(
        Group::new("/users")
            .middleware(require_header("authorization"))
            .route(
                Method::GET,
                "/{id}",
                [from_fn(|ctx| {
                    Box::pin(async move {
                        let id = ctx.param("id").unwrap_or_default().to_string();
                        ctx.respond(format!("user {id}\n"));
                    })
                })],
            ),
    )?;

    Ok(())
}

/// Logs every routed request after its chain finishes.
fn access_log() -> Unit {
    from_fn(|ctx| {
        Box::pin(async move {
            let started = std::time::Instant::now();
            ctx.advance().await;
            tracing::info!(
                route = %ctx.route_pattern(),
                status = %ctx.response().status(),
                elapsed = ?started.elapsed(),
                "Request handled"
            );
        })
    })
}

/// Rejects requests missing `name` with 401 and stops the chain.
fn require_header(name: &'static str) -> Unit {
    from_fn(move |ctx| {
        Box::pin(async move {
            if ctx.request().headers().contains_key(name) {
                ctx.advance().await;
            } else {
                ctx.respond((StatusCode::UNAUTHORIZED, "missing credentials\n"));
            }
        })
    })
}
