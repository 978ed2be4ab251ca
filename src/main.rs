use clap::Parser;
use dotenvy::dotenv;
use ephemeral_convert::config::LifecycleConfig;
use ephemeral_convert::infrastructure::{storage, tools};
use ephemeral_convert::services::lifecycle::LifecycleManager;
use ephemeral_convert::{AppState, create_app};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port for the HTTP server
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Use short lifetimes and fast sweeps instead of the environment settings
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ephemeral_convert=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Ephemeral Convert...");

    let config = if args.dev {
        LifecycleConfig::development()
    } else {
        LifecycleConfig::from_env()
    };
    config.validate()?;
    info!(
        "🛡️  Lifecycle Config: Max Size={}MB, Upload TTL={:?}, Converted TTL={:?}, Sweep={:?}",
        config.max_upload_size / 1024 / 1024,
        config.upload_expiry,
        config.converted_expiry,
        config.sweep_interval
    );

    let pools = storage::setup_storage(&config).await?;
    let manager = Arc::new(LifecycleManager::new(
        config.clone(),
        pools,
        tools::setup_rasterizer(&config),
        tools::setup_converter(&config),
    ));

    let reclaimer = manager.start_reclaimer();

    let app = create_app(AppState::new(manager)).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    let addr = SocketAddr::new(args.host, args.port);
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    reclaimer.shutdown().await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e.into());
    }
    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
