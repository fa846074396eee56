use std::{
	cmp::Ordering,
	collections::{BTreeSet, HashMap, VecDeque},
};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Score wrapper with a total order so it can key a sorted set.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Score(f64);
impl Eq for Score {}
impl PartialOrd for Score {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for Score {
	fn cmp(&self, other: &Self) -> Ordering {
		self.0.total_cmp(&other.0)
	}
}

/// Member → score map kept in sync with a (score, member) ordered set.
#[derive(Debug, Default)]
pub struct ScoreIndex {
	scores: HashMap<String, f64>,
	ordered: BTreeSet<(Score, String)>,
}
impl ScoreIndex {
	pub fn increment(&mut self, member: &str, by: f64) -> f64 {
		let previous = self.scores.get(member).copied();

		if let Some(previous) = previous {
			self.ordered.remove(&(Score(previous), member.to_string()));
		}

		let next = previous.unwrap_or(0.0) + by;

		self.scores.insert(member.to_string(), next);
		self.ordered.insert((Score(next), member.to_string()));

		next
	}

	pub fn remove(&mut self, member: &str) -> Option<f64> {
		let score = self.scores.remove(member)?;

		self.ordered.remove(&(Score(score), member.to_string()));

		Some(score)
	}

	pub fn score(&self, member: &str) -> Option<f64> {
		self.scores.get(member).copied()
	}

	pub fn len(&self) -> usize {
		self.scores.len()
	}

	pub fn is_empty(&self) -> bool {
		self.scores.is_empty()
	}

	/// Members by descending score; equal scores keep reverse member order.
	pub fn iter_desc(&self) -> impl Iterator<Item = (&str, f64)> {
		self.ordered.iter().rev().map(|(score, member)| (member.as_str(), score.0))
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingQuery {
	pub query: String,
	pub score: f64,
	/// Total recorded count.
	pub frequency: u64,
	/// Count inside the requested window.
	pub recent_count: u64,
	/// Recent count relative to the average per-window count before it.
	pub momentum: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequentQuery {
	pub query: String,
	pub frequency: u64,
}

/// What one pruning pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
	pub events_removed: usize,
	/// Queries with no activity left inside the retention window, with their final counts.
	pub forgotten: Vec<FrequentQuery>,
	pub users_removed: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct TrendLimits {
	pub history_per_user: usize,
	pub max_events_per_query: usize,
}

#[derive(Debug)]
struct UserHistory {
	queries: VecDeque<String>,
	last_seen: OffsetDateTime,
}

/// Query frequency, time-weighted trending scores, and per-user history.
///
/// Callers pass `now` explicitly; the tracker never reads the clock.
#[derive(Debug)]
pub struct TrendTracker {
	limits: TrendLimits,
	frequency: ScoreIndex,
	trending: ScoreIndex,
	events: HashMap<String, VecDeque<OffsetDateTime>>,
	history: HashMap<String, UserHistory>,
}
impl TrendTracker {
	pub fn new(limits: TrendLimits) -> Self {
		Self {
			limits,
			frequency: ScoreIndex::default(),
			trending: ScoreIndex::default(),
			events: HashMap::new(),
			history: HashMap::new(),
		}
	}

	pub fn record(&mut self, query: &str, user_id: Option<&str>, now: OffsetDateTime) {
		if query.is_empty() {
			return;
		}

		self.frequency.increment(query, 1.0);
		// Contribution is the timestamp itself, so recent activity dominates older activity.
		self.trending.increment(query, now.unix_timestamp() as f64);

		let events = self.events.entry(query.to_string()).or_default();

		events.push_back(now);

		while events.len() > self.limits.max_events_per_query {
			events.pop_front();
		}

		if let Some(user_id) = user_id {
			let history = self
				.history
				.entry(user_id.to_string())
				.or_insert_with(|| UserHistory { queries: VecDeque::new(), last_seen: now });

			history.last_seen = history.last_seen.max(now);
			history.queries.retain(|existing| existing != query);
			history.queries.push_front(query.to_string());
			history.queries.truncate(self.limits.history_per_user);
		}
	}

	pub fn frequency(&self, query: &str) -> u64 {
		self.frequency.score(query).map(|score| score as u64).unwrap_or(0)
	}

	pub fn len(&self) -> usize {
		self.frequency.len()
	}

	pub fn is_empty(&self) -> bool {
		self.frequency.is_empty()
	}

	/// Top trending queries active within `window` before `now`.
	pub fn trending(
		&self,
		window: Duration,
		max_results: usize,
		now: OffsetDateTime,
	) -> Vec<TrendingQuery> {
		if max_results == 0 || window <= Duration::ZERO {
			return Vec::new();
		}

		let since = now - window;
		let mut out = Vec::new();

		for (query, score) in self.trending.iter_desc() {
			let Some(events) = self.events.get(query) else { continue };
			let recent_count =
				events.iter().filter(|at| **at > since && **at <= now).count() as u64;

			if recent_count == 0 {
				continue;
			}

			out.push(TrendingQuery {
				query: query.to_string(),
				score,
				frequency: self.frequency(query),
				recent_count,
				momentum: momentum(events, recent_count, since, window),
			});
		}

		out.sort_by(|a, b| {
			b.score.total_cmp(&a.score).then_with(|| a.query.cmp(&b.query))
		});
		out.truncate(max_results);

		out
	}

	/// Queries starting with `prefix`, most frequent first.
	pub fn frequent(&self, prefix: &str, max_results: usize) -> Vec<FrequentQuery> {
		let mut out: Vec<FrequentQuery> = self
			.frequency
			.iter_desc()
			.filter(|(query, _)| query.starts_with(prefix))
			.map(|(query, score)| FrequentQuery {
				query: query.to_string(),
				frequency: score as u64,
			})
			.collect();

		out.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.query.cmp(&b.query)));
		out.truncate(max_results);

		out
	}

	/// Most recent first.
	pub fn history(&self, user_id: &str) -> Vec<String> {
		self.history
			.get(user_id)
			.map(|history| history.queries.iter().cloned().collect())
			.unwrap_or_default()
	}

	pub fn user_count(&self) -> usize {
		self.history.len()
	}

	/// Drops event timestamps older than `retention`, then forgets queries and users with no
	/// activity left inside it.
	pub fn prune(&mut self, now: OffsetDateTime, retention: Duration) -> PruneReport {
		let cutoff = now - retention;
		let mut report = PruneReport::default();

		for events in self.events.values_mut() {
			while events.front().is_some_and(|at| *at < cutoff) {
				events.pop_front();

				report.events_removed += 1;
			}
		}

		let idle: Vec<String> = self
			.events
			.iter()
			.filter(|(_, events)| events.is_empty())
			.map(|(query, _)| query.clone())
			.collect();

		for query in idle {
			self.events.remove(&query);
			self.trending.remove(&query);

			let frequency = self.frequency.remove(&query).map(|score| score as u64).unwrap_or(0);

			report.forgotten.push(FrequentQuery { query, frequency });
		}

		report.forgotten.sort_by(|a, b| a.query.cmp(&b.query));

		let users = self.history.len();

		self.history.retain(|_, history| history.last_seen >= cutoff);

		report.users_removed = users - self.history.len();

		report
	}
}

fn momentum(
	events: &VecDeque<OffsetDateTime>,
	recent_count: u64,
	since: OffsetDateTime,
	window: Duration,
) -> f64 {
	let Some(first) = events.front() else { return 0.0 };
	let older = events.iter().filter(|at| **at <= since).count() as u64;

	if older == 0 || *first >= since {
		return recent_count as f64;
	}

	let span = since - *first;
	let windows = (span.as_seconds_f64() / window.as_seconds_f64()).ceil().max(1.0);
	let baseline = older as f64 / windows;

	recent_count as f64 / baseline.max(1.0)
}
