pub mod trie;

use std::{collections::HashMap, time::Duration as StdDuration};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{BazaarService, Error, Result, search::ranking};
use bazaar_domain::{normalize, vector};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutocompleteRequest {
	#[serde(default)]
	pub partial_query: String,
	pub user_id: Option<String>,
	pub max_results: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
	Completion,
	Trending,
	Personalized,
	Semantic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionEntry {
	pub text: String,
	pub source: SuggestionSource,
	pub score: f32,
	pub frequency: Option<u64>,
}

impl BazaarService {
	/// Suggestions for a partial query. Prefixes below the minimum length yield an empty list.
	pub async fn autocomplete(&self, req: AutocompleteRequest) -> Result<Vec<SuggestionEntry>> {
		let cfg = &self.cfg.suggest;
		let max_results = req.max_results.unwrap_or(cfg.default_max_results);

		if max_results == 0 {
			return Err(Error::InvalidRequest {
				message: "max_results must be greater than zero.".to_string(),
			});
		}

		let limit = max_results.min(cfg.max_results_cap) as usize;
		let prefix = normalize::normalize(&req.partial_query);

		if prefix.chars().count() < cfg.min_prefix_chars as usize {
			return Ok(Vec::new());
		}

		let user_id = req.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
		let (completions, trending, personal, semantic) = tokio::join!(
			async { self.completion_suggestions(&prefix, limit) },
			async { self.trending_suggestions(&prefix, limit) },
			async { self.personal_suggestions(&prefix, user_id, limit) },
			self.semantic_suggestions(&prefix, limit),
		);
		let mut entries = completions;

		entries.extend(trending);
		entries.extend(personal);
		entries.extend(semantic);

		let out = compose(&prefix, entries, limit);

		tracing::debug!(prefix = %prefix, returned = out.len(), "Autocomplete completed.");

		Ok(out)
	}

	/// Scored by frequency and by how much of the completion the prefix already covers.
	fn completion_suggestions(&self, prefix: &str, limit: usize) -> Vec<SuggestionEntry> {
		let cfg = &self.cfg.suggest;
		let found = self.query_log.trie.completions(
			prefix,
			limit,
			cfg.max_traversal as usize,
			cfg.max_word_chars as usize,
		);
		let top = found.iter().map(|c| c.frequency).max().unwrap_or(1).max(1) as f32;
		let prefix_chars = prefix.chars().count() as f32;

		found
			.into_iter()
			.map(|completion| {
				let closeness = prefix_chars / completion.word.chars().count().max(1) as f32;
				let popularity = completion.frequency as f32 / top;

				SuggestionEntry {
					score: cfg.trie_weight * (0.5 * closeness + 0.5 * popularity),
					text: completion.word,
					source: SuggestionSource::Completion,
					frequency: Some(completion.frequency),
				}
			})
			.collect()
	}

	fn trending_suggestions(&self, prefix: &str, limit: usize) -> Vec<SuggestionEntry> {
		let window = Duration::hours(self.cfg.trends.default_window_hours);
		let trends = self.query_log.trends.read().unwrap_or_else(|err| err.into_inner());
		let matching: Vec<_> = trends
			.trending(window, trends.len(), OffsetDateTime::now_utc())
			.into_iter()
			.filter(|trend| trend.query.starts_with(prefix))
			.take(limit)
			.collect();
		let top = matching.iter().map(|trend| trend.recent_count).max().unwrap_or(1).max(1) as f32;

		matching
			.into_iter()
			.map(|trend| SuggestionEntry {
				score: self.cfg.suggest.trending_weight * (trend.recent_count as f32 / top),
				text: trend.query,
				source: SuggestionSource::Trending,
				frequency: Some(trend.frequency),
			})
			.collect()
	}

	/// Matching entries from the user's history, most recent scoring highest.
	fn personal_suggestions(
		&self,
		prefix: &str,
		user_id: Option<&str>,
		limit: usize,
	) -> Vec<SuggestionEntry> {
		let Some(user_id) = user_id else { return Vec::new() };
		let trends = self.query_log.trends.read().unwrap_or_else(|err| err.into_inner());
		let history = trends.history(user_id);
		let len = history.len().max(1) as f32;

		history
			.into_iter()
			.enumerate()
			.filter(|(_, query)| query.starts_with(prefix))
			.take(limit)
			.map(|(rank, query)| SuggestionEntry {
				score: self.cfg.suggest.personal_weight * (1.0 - rank as f32 / len),
				frequency: Some(trends.frequency(&query)),
				text: query,
				source: SuggestionSource::Personalized,
			})
			.collect()
	}

	/// Frequent queries whose embedding is close to the prefix embedding.
	async fn semantic_suggestions(&self, prefix: &str, limit: usize) -> Vec<SuggestionEntry> {
		let cfg = &self.cfg.suggest;

		if cfg.semantic_weight <= 0.0 || cfg.semantic_vocabulary == 0 {
			return Vec::new();
		}

		let timeout = StdDuration::from_millis(self.cfg.search.retrieval_timeout_ms);

		match tokio::time::timeout(timeout, self.similar_terms(prefix, limit)).await {
			Ok(entries) => entries,
			Err(_) => {
				tracing::warn!(path = "semantic", "Suggestion path timed out.");

				Vec::new()
			},
		}
	}

	async fn similar_terms(&self, prefix: &str, limit: usize) -> Vec<SuggestionEntry> {
		let cfg = &self.cfg.suggest;
		let query = self.embed_text(prefix).await;

		if query.is_fallback() {
			tracing::warn!(path = "semantic", "Prefix embedding unavailable; skipping.");

			return Vec::new();
		}

		let vocabulary = self.get_frequent("", cfg.semantic_vocabulary as usize);
		let mut out = Vec::new();

		for term in vocabulary {
			if term.query == prefix {
				continue;
			}

			let embedded = self.embed_text(&term.query).await;

			if embedded.is_fallback() || embedded.vector.len() != query.vector.len() {
				continue;
			}

			let similarity = vector::cosine_similarity(&query.vector, &embedded.vector);

			if similarity >= cfg.semantic_threshold {
				out.push(SuggestionEntry {
					text: term.query,
					source: SuggestionSource::Semantic,
					score: cfg.semantic_weight * similarity.clamp(0.0, 1.0),
					frequency: Some(term.frequency),
				});
			}
		}

		out.sort_by(|a, b| {
			ranking::cmp_f32_desc(a.score, b.score).then_with(|| a.text.cmp(&b.text))
		});
		out.truncate(limit);

		out
	}
}

/// Deduplicates by text keeping the best-scored entry, then orders exact-prefix matches first,
/// by score, then alphabetically.
pub fn compose(prefix: &str, entries: Vec<SuggestionEntry>, limit: usize) -> Vec<SuggestionEntry> {
	let mut best: HashMap<String, SuggestionEntry> = HashMap::new();

	for entry in entries {
		if entry.text.is_empty() {
			continue;
		}

		match best.get_mut(&entry.text) {
			Some(existing) if existing.score >= entry.score => {
				existing.frequency = existing.frequency.max(entry.frequency);
			},
			Some(existing) => {
				let frequency = existing.frequency.max(entry.frequency);

				*existing = SuggestionEntry { frequency, ..entry };
			},
			None => {
				best.insert(entry.text.clone(), entry);
			},
		}
	}

	let mut out: Vec<SuggestionEntry> = best.into_values().collect();

	out.sort_by(|a, b| {
		b.text
			.starts_with(prefix)
			.cmp(&a.text.starts_with(prefix))
			.then_with(|| ranking::cmp_f32_desc(a.score, b.score))
			.then_with(|| a.text.cmp(&b.text))
	});
	out.truncate(limit);

	out
}
