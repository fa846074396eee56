use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{BazaarService, Error, Result};
use bazaar_domain::trend::{FrequentQuery, PruneReport, TrendingQuery};

const MAX_TRENDING_RESULTS: u32 = 100;
const DEFAULT_TRENDING_RESULTS: u32 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendingRequest {
	pub window_hours: Option<i64>,
	pub max_results: Option<u32>,
}

impl BazaarService {
	pub fn get_trending(&self, req: TrendingRequest) -> Result<Vec<TrendingQuery>> {
		self.get_trending_at(req, OffsetDateTime::now_utc())
	}

	pub fn get_trending_at(
		&self,
		req: TrendingRequest,
		now: OffsetDateTime,
	) -> Result<Vec<TrendingQuery>> {
		let window_hours = req.window_hours.unwrap_or(self.cfg.trends.default_window_hours);

		if window_hours <= 0 {
			return Err(Error::InvalidRequest {
				message: "window_hours must be greater than zero.".to_string(),
			});
		}

		let max_results = req.max_results.unwrap_or(DEFAULT_TRENDING_RESULTS);

		if max_results == 0 {
			return Err(Error::InvalidRequest {
				message: "max_results must be greater than zero.".to_string(),
			});
		}

		let trends = self.query_log.trends.read().unwrap_or_else(|err| err.into_inner());

		Ok(trends.trending(
			Duration::hours(window_hours),
			max_results.min(MAX_TRENDING_RESULTS) as usize,
			now,
		))
	}

	pub fn get_frequent(&self, prefix: &str, max_results: usize) -> Vec<FrequentQuery> {
		let prefix = bazaar_domain::normalize::normalize(prefix);
		let trends = self.query_log.trends.read().unwrap_or_else(|err| err.into_inner());

		trends.frequent(&prefix, max_results)
	}

	/// Most recent first, capped at `trends.history_per_user`.
	pub fn recent_queries(&self, user_id: &str) -> Vec<String> {
		self.query_log.trends.read().unwrap_or_else(|err| err.into_inner()).history(user_id.trim())
	}

	/// Forgets trend events, queries, and user histories idle for longer than the retention
	/// window.
	pub fn prune_trends(&self, now: OffsetDateTime) -> PruneReport {
		let retention = Duration::days(self.cfg.trends.retention_days);
		let report = self.query_log.prune(now, retention);

		if report != PruneReport::default() {
			tracing::info!(
				events_removed = report.events_removed,
				queries_forgotten = report.forgotten.len(),
				users_removed = report.users_removed,
				"Pruned trend state."
			);
		}

		report
	}
}
