pub mod routes;
pub mod state;

use std::{
	fs,
	net::SocketAddr,
	path::{Path, PathBuf},
	sync::Arc,
	time::Duration as StdDuration,
};

use clap::Parser;
use color_eyre::eyre::WrapErr;
use serde::de::DeserializeOwned;
use time::{Duration, OffsetDateTime};
use tokio::{net::TcpListener, time as tokio_time};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;
use bazaar_domain::item::SearchableItem;
use bazaar_service::{BazaarService, QueryEvent};

const PRUNE_INTERVAL_SECONDS: i64 = 15 * 60;
const POLL_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Parser)]
#[command(
	version = bazaar_cli::VERSION,
	rename_all = "kebab",
	styles = bazaar_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// JSON array of listings indexed before the server starts.
	#[arg(long, value_name = "FILE")]
	pub catalog: Option<PathBuf>,
	/// JSON array of past query events replayed into suggestions and trends.
	#[arg(long, value_name = "FILE")]
	pub query_log: Option<PathBuf>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = bazaar_config::load(&args.config)?;

	init_tracing(&config)?;

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let state = AppState::new(config);

	if let Some(path) = args.catalog.as_deref() {
		let loaded = state.load_catalog(read_json::<Vec<SearchableItem>>(path)?).await?;

		tracing::info!(loaded, path = %path.display(), "Catalog loaded.");
	}
	if let Some(path) = args.query_log.as_deref() {
		let replayed = state.service.replay_queries(&read_json::<Vec<QueryEvent>>(path)?);

		tracing::info!(replayed, path = %path.display(), "Query log replayed.");
	}

	let _feedback = state.service.spawn_feedback_worker();
	let maintenance = tokio::spawn(run_maintenance(state.service.clone()));
	let app = routes::router(state);
	let listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	let served = axum::serve(listener, app).await;

	maintenance.abort();

	Ok(served?)
}

/// Periodically drops trend activity that fell out of the retention window.
async fn run_maintenance(service: Arc<BazaarService>) {
	let mut last_prune = OffsetDateTime::now_utc();

	loop {
		let now = OffsetDateTime::now_utc();

		if now - last_prune >= Duration::seconds(PRUNE_INTERVAL_SECONDS) {
			service.prune_trends(now);

			last_prune = now;
		}

		tokio_time::sleep(StdDuration::from_millis(POLL_INTERVAL_MS)).await;
	}
}

fn read_json<T>(path: &Path) -> color_eyre::Result<T>
where
	T: DeserializeOwned,
{
	let raw = fs::read_to_string(path)
		.wrap_err_with(|| format!("Failed to read {}.", path.display()))?;

	serde_json::from_str(&raw).wrap_err_with(|| format!("Failed to parse {}.", path.display()))
}

fn init_tracing(config: &bazaar_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	Ok(())
}
