use anyhow::Result;
use clap::Parser;
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tokio::net::TcpListener;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{filter::EnvFilter, fmt::format::JsonFields, util::SubscriberInitExt, Layer};
use transcribe_host::{app, perform_health_check, AppState, Config, OpenAiProvider};

const LIMITER_PRUNE_PERIOD: Duration = Duration::from_secs(60);
const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
	dotenv::dotenv().ok();
	let config = Config::parse();

	// Handle health check flag
	if config.health_check {
		return perform_health_check(&config).await;
	}

	init_tracing(&config)?;
	config.validate()?;

	let config = Arc::new(config);
	let shutdown_token = CancellationToken::new();

	let provider = Arc::new(OpenAiProvider::new(&config)?);
	let app_state = AppState::build(Arc::clone(&config), provider, &shutdown_token).await?;

	spawn_limiter_pruning(&app_state, shutdown_token.child_token());

	let listener = TcpListener::bind(config.bind_addr()).await?;
	tracing::info!("listening on {}", listener.local_addr()?);

	// Spawn signal handler task with proper shutdown coordination
	let signal_shutdown_token = shutdown_token.clone();
	tokio::spawn(async move {
		shutdown_signal().await;
		tracing::info!("Shutdown signal received, initiating shutdown...");
		signal_shutdown_token.cancel();
	});

	let server_token = shutdown_token.clone();
	axum::serve(listener, app(app_state.clone()).into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(async move {
			server_token.cancelled().await;
		})
		.await?;
	tracing::info!("Server stopped");

	if app_state.jobs.shutdown(config.shutdown_timeout()).await {
		tracing::info!("Graceful shutdown completed");
	} else {
		tracing::error!("Shutdown timeout - abandoning running transcriptions");
	}

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!("Failed to listen for Ctrl+C: {}", e);
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				tracing::error!("Failed to listen for SIGTERM: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}
}

fn spawn_limiter_pruning(state: &AppState, cancel_token: CancellationToken) {
	let limiter = Arc::clone(&state.limiter);
	tokio::spawn(async move {
		let mut ticker = interval(LIMITER_PRUNE_PERIOD);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

		loop {
			tokio::select! {
				() = cancel_token.cancelled() => break,
				_ = ticker.tick() => {
					let pruned = limiter.prune_idle(Instant::now());
					if pruned > 0 {
						tracing::debug!(pruned, remaining = limiter.tracked_clients(), "Pruned idle rate limit buckets");
					}
				}
			}
		}
	});
}

fn init_tracing(config: &Config) -> Result<()> {
	use std::str::FromStr;
	use tracing_subscriber::layer::SubscriberExt;

	let filter = EnvFilter::from_str(config.rust_log.as_deref().unwrap_or(DEFAULT_LOG_FILTER))?;

	tracing_subscriber::registry()
		.with(if config.log_json {
			Box::new(
				tracing_subscriber::fmt::layer()
					.fmt_fields(JsonFields::default())
					.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
					.with_filter(filter),
			) as Box<dyn Layer<_> + Send + Sync>
		} else {
			Box::new(
				tracing_subscriber::fmt::layer()
					.event_format(tracing_subscriber::fmt::format().pretty())
					.with_filter(filter),
			)
		})
		.try_init()?;
	Ok(())
}
