use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio::{
	sync::mpsc::{self, error::TrySendError},
	task::JoinHandle,
};

use crate::{BazaarService, Error, Result, suggest::trie::SharedTrie};
use bazaar_config::Config;
use bazaar_domain::{
	normalize,
	query::QueryContext,
	trend::{PruneReport, TrendLimits, TrendTracker},
};

/// A completed query, as fed to the trie and trend tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryEvent {
	pub query: String,
	pub user_id: Option<String>,
	#[serde(with = "time::serde::timestamp")]
	pub at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordQueryRequest {
	pub query: String,
	pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQueryResponse {
	/// False when the feedback queue was full and the event was dropped.
	pub accepted: bool,
}

/// Suggestion state derived from recorded queries.
#[derive(Debug)]
pub struct QueryLog {
	pub(crate) trie: SharedTrie,
	pub(crate) trends: RwLock<TrendTracker>,
	max_word_chars: usize,
}
impl QueryLog {
	pub fn new(cfg: &Config) -> Self {
		Self {
			trie: SharedTrie::from_config(&cfg.suggest),
			trends: RwLock::new(TrendTracker::new(TrendLimits {
				history_per_user: cfg.trends.history_per_user as usize,
				max_events_per_query: cfg.trends.max_events_per_query as usize,
			})),
			max_word_chars: cfg.suggest.max_word_chars as usize,
		}
	}

	/// Inserts the whole query and each of its words into the trie, then records the trend.
	pub fn apply(&self, event: &QueryEvent) {
		let query = normalize::normalize(&event.query);

		if query.is_empty() {
			return;
		}

		for term in self.trie_terms(&query) {
			self.trie.insert(&term);
		}

		self.trends.write().unwrap_or_else(|err| err.into_inner()).record(
			&query,
			event.user_id.as_deref(),
			event.at,
		);
	}

	/// Prunes the trend tracker and takes forgotten queries back out of the trie.
	pub fn prune(&self, now: OffsetDateTime, retention: Duration) -> PruneReport {
		let report =
			self.trends.write().unwrap_or_else(|err| err.into_inner()).prune(now, retention);

		for forgotten in &report.forgotten {
			for term in self.trie_terms(&forgotten.query) {
				self.trie.decrement(&term, forgotten.frequency);
			}
		}

		report
	}

	/// The whole query plus its words, when it has more than one.
	fn trie_terms(&self, query: &str) -> Vec<String> {
		let mut terms = Vec::new();
		let tokens = normalize::tokenize(query);

		if query.chars().count() <= self.max_word_chars {
			terms.push(query.to_string());
		}
		if tokens.len() > 1 {
			terms.extend(tokens.into_iter().filter(|token| {
				(2..=self.max_word_chars).contains(&token.chars().count())
			}));
		}

		terms
	}
}

/// Bounded queue between the search path and the query log writer.
#[derive(Debug)]
pub(crate) struct FeedbackQueue {
	tx: mpsc::Sender<QueryEvent>,
	rx: Mutex<Option<mpsc::Receiver<QueryEvent>>>,
}
impl FeedbackQueue {
	pub(crate) fn new(capacity: usize) -> Self {
		let (tx, rx) = mpsc::channel(capacity.max(1));

		Self { tx, rx: Mutex::new(Some(rx)) }
	}

	fn push(&self, event: QueryEvent) -> bool {
		match self.tx.try_send(event) {
			Ok(()) => true,
			Err(TrySendError::Full(event)) => {
				tracing::warn!(query = %event.query, "Feedback queue is full; dropping the event.");

				false
			},
			Err(TrySendError::Closed(_)) => {
				tracing::warn!("Feedback queue is closed; dropping the event.");

				false
			},
		}
	}

	fn take_receiver(&self) -> Option<mpsc::Receiver<QueryEvent>> {
		self.rx.lock().unwrap_or_else(|err| err.into_inner()).take()
	}
}

impl BazaarService {
	/// Queues a query for the trie and trend tracker without waiting for the write.
	pub fn record_query(&self, req: RecordQueryRequest) -> Result<RecordQueryResponse> {
		let query = normalize::normalize(&req.query);

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must not be empty.".to_string() });
		}

		let user_id = req.user_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty());
		let accepted =
			self.feedback.push(QueryEvent { query, user_id, at: OffsetDateTime::now_utc() });

		Ok(RecordQueryResponse { accepted })
	}

	/// Starts the background writer. Returns `None` if it was already started or drained.
	///
	/// The task stops once the service is dropped and the queue is empty.
	pub fn spawn_feedback_worker(&self) -> Option<JoinHandle<()>> {
		let mut rx = self.feedback.take_receiver()?;
		let query_log = self.query_log.clone();

		Some(tokio::spawn(async move {
			while let Some(event) = rx.recv().await {
				query_log.apply(&event);
			}

			tracing::debug!("Feedback worker stopped.");
		}))
	}

	/// Applies every queued event on the caller's task. Only valid before the worker starts.
	pub fn drain_feedback(&self) -> usize {
		let mut guard = self.feedback.rx.lock().unwrap_or_else(|err| err.into_inner());
		let Some(rx) = guard.as_mut() else { return 0 };
		let mut applied = 0;

		while let Ok(event) = rx.try_recv() {
			self.query_log.apply(&event);

			applied += 1;
		}

		applied
	}

	/// Rebuilds suggestion state from a query log, e.g. after a restart.
	pub fn replay_queries(&self, events: &[QueryEvent]) -> usize {
		let mut ordered: Vec<&QueryEvent> = events.iter().collect();

		ordered.sort_by_key(|event| event.at);

		for event in &ordered {
			self.query_log.apply(event);
		}

		tracing::info!(events = ordered.len(), "Replayed query log.");

		ordered.len()
	}

	pub(crate) fn enqueue_query(&self, ctx: &QueryContext) {
		if ctx.normalized_query.is_empty() {
			return;
		}

		self.feedback.push(QueryEvent {
			query: ctx.normalized_query.clone(),
			user_id: ctx.user_id.clone(),
			at: OffsetDateTime::now_utc(),
		});
	}
}
