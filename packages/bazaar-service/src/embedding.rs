use std::time::Duration as StdDuration;

use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

use crate::{BazaarService, Error, Result, search::cache};
use bazaar_domain::{item::SearchableItem, normalize, vector};

pub const TEXT_NAMESPACE: &str = "emb:text:v1:";
pub const ITEM_NAMESPACE: &str = "emb:item:v1:";
pub const IMAGE_NAMESPACE: &str = "emb:image:v1:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingSource {
	/// Stored on the item itself.
	Item,
	Cache,
	Provider,
	/// Deterministic stand-in produced while the provider is failing.
	Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Embedded {
	/// Unit length, with the configured dimension.
	pub vector: Vec<f32>,
	pub source: EmbeddingSource,
}
impl Embedded {
	pub fn is_fallback(&self) -> bool {
		self.source == EmbeddingSource::Fallback
	}
}

#[derive(Debug, Clone, Copy)]
enum EmbedInput<'a> {
	Text(&'a str),
	Image(&'a str),
}

pub fn item_key_prefix(item_id: Uuid) -> String {
	format!("{ITEM_NAMESPACE}{item_id}:")
}

impl BazaarService {
	/// Embeds normalized `text`. Never fails: provider outages yield the fallback vector.
	pub async fn embed_text(&self, text: &str) -> Embedded {
		let normalized = normalize::normalize(text);
		let key = self.embedding_cache_key(TEXT_NAMESPACE, &normalized);

		self.embed_cached(key, EmbedInput::Text(&normalized), &normalized).await
	}

	/// Item vector from the item itself, the cache, or the provider, in that order.
	pub async fn embed_item(&self, item: &SearchableItem) -> Embedded {
		if let Some(vector) = item.cached_embedding() {
			if self.check_vector(vector) {
				return Embedded { vector: vector.to_vec(), source: EmbeddingSource::Item };
			}

			tracing::error!(
				item_id = %item.item_id,
				dimensions = vector.len(),
				expected = self.dimensions(),
				"Stored item embedding has the wrong dimension; recomputing."
			);
		}

		let key = Some(format!("{}{}", item_key_prefix(item.item_id), item.text_fingerprint()));
		let input = item.embedding_input();

		self.embed_cached(key, EmbedInput::Text(&input), &input).await
	}

	/// Writes a provider or cache vector back onto the stored item so later searches read it
	/// from the item itself.
	pub async fn store_item_embedding(&self, item: &SearchableItem, embedded: &Embedded) {
		if !matches!(embedded.source, EmbeddingSource::Provider | EmbeddingSource::Cache) {
			return;
		}

		let fingerprint = item.text_fingerprint();

		match self
			.collaborators
			.items
			.set_embedding(item.item_id, &fingerprint, embedded.vector.clone())
			.await
		{
			Ok(true) => {},
			Ok(false) => tracing::debug!(
				item_id = %item.item_id,
				"Item text changed before its embedding was stored."
			),
			Err(err) => tracing::warn!(
				error = %err,
				item_id = %item.item_id,
				"Failed to store the item embedding."
			),
		}
	}

	pub async fn embed_image(&self, url: &str) -> Embedded {
		let url = url.trim();
		let key = self.embedding_cache_key(IMAGE_NAMESPACE, url);

		self.embed_cached(key, EmbedInput::Image(url), url).await
	}

	fn embedding_cache_key(&self, namespace: &str, input: &str) -> Option<String> {
		let provider = &self.cfg.providers.embedding;
		let payload = serde_json::json!({
			"provider_id": provider.provider_id,
			"model": provider.model,
			"dimensions": provider.dimensions,
			"input": input,
		});

		match cache::hash_cache_key(&payload) {
			Ok(hash) => Some(format!("{namespace}{hash}")),
			Err(err) => {
				tracing::warn!(error = %err, "Embedding cache key build failed.");

				None
			},
		}
	}

	async fn embed_cached(
		&self,
		key: Option<String>,
		input: EmbedInput<'_>,
		seed: &str,
	) -> Embedded {
		let cache_enabled = self.cfg.search.cache.enabled;
		let key = key.filter(|_| cache_enabled);

		if let Some(key) = key.as_deref()
			&& let Some(vector) = self.read_cached_vector(key).await
		{
			return Embedded { vector, source: EmbeddingSource::Cache };
		}

		match self.call_provider(input).await {
			Ok(vector) => {
				if let Some(key) = key.as_deref() {
					self.write_cached_vector(key, &vector).await;
				}

				Embedded { vector, source: EmbeddingSource::Provider }
			},
			Err(err) => {
				tracing::warn!(error = %err, "Embedding provider failed; using fallback vector.");

				Embedded {
					vector: vector::fallback_vector(seed, self.dimensions()),
					source: EmbeddingSource::Fallback,
				}
			},
		}
	}

	async fn call_provider(&self, input: EmbedInput<'_>) -> Result<Vec<f32>> {
		let cfg = &self.cfg.providers.embedding;
		let timeout = StdDuration::from_millis(cfg.timeout_ms);
		let attempts = cfg.max_attempts.max(1);
		let mut last_error = None;

		for attempt in 1..=attempts {
			let call = async {
				match input {
					EmbedInput::Text(text) => {
						let texts = [text.to_string()];
						let vectors = self.collaborators.embedding.embed(cfg, &texts).await?;

						vectors.into_iter().next().ok_or_else(|| Error::Provider {
							message: "Embedding provider returned no vectors.".to_string(),
							transient: false,
						})
					},
					EmbedInput::Image(url) =>
						self.collaborators.embedding.embed_image(cfg, url).await,
				}
			};
			let err = match tokio::time::timeout(timeout, call).await {
				Ok(Ok(mut vector)) => {
					if !self.check_vector(&vector) {
						return Err(Error::Provider {
							message: format!(
								"Embedding vector has {} dimensions; expected {}.",
								vector.len(),
								self.dimensions()
							),
							transient: false,
						});
					}
					if !vector::l2_normalize(&mut vector) {
						return Err(Error::Provider {
							message: "Embedding vector has zero norm.".to_string(),
							transient: false,
						});
					}

					return Ok(vector);
				},
				Ok(Err(err)) => err,
				Err(_) => Error::Unavailable {
					message: format!("Embedding call timed out after {} ms.", cfg.timeout_ms),
				},
			};

			let transient = err.is_transient();

			tracing::warn!(
				error = %err,
				attempt,
				max_attempts = attempts,
				transient,
				"Embedding attempt failed."
			);

			last_error = Some(err);

			if !transient {
				break;
			}
		}

		Err(last_error.unwrap_or_else(|| Error::Provider {
			message: "Embedding provider was not called.".to_string(),
			transient: false,
		}))
	}

	async fn read_cached_vector(&self, key: &str) -> Option<Vec<f32>> {
		let raw = match self.collaborators.kv.get(key).await {
			Ok(Some(raw)) => raw,
			Ok(None) => return None,
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_key_prefix = cache::cache_key_prefix(key),
					"Embedding cache read failed."
				);

				return None;
			},
		};

		match serde_json::from_str::<Vec<f32>>(&raw) {
			Ok(vector) if self.check_vector(&vector) && vector::is_unit_length(&vector) =>
				Some(vector),
			Ok(_) => {
				tracing::warn!(
					cache_key_prefix = cache::cache_key_prefix(key),
					"Cached embedding has the wrong shape; treating as a miss."
				);

				None
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_key_prefix = cache::cache_key_prefix(key),
					"Cached embedding decode failed; treating as a miss."
				);

				None
			},
		}
	}

	async fn write_cached_vector(&self, key: &str, vector: &[f32]) {
		let ttl = Duration::days(self.cfg.search.cache.embedding_ttl_days);
		let raw = match serde_json::to_string(vector) {
			Ok(raw) => raw,
			Err(err) => {
				tracing::warn!(error = %err, "Embedding cache encode failed.");

				return;
			},
		};

		if let Err(err) = self.collaborators.kv.put(key, raw, ttl).await {
			tracing::warn!(
				error = %err,
				cache_key_prefix = cache::cache_key_prefix(key),
				"Embedding cache write failed."
			);
		}
	}

	fn dimensions(&self) -> usize {
		self.cfg.providers.embedding.dimensions as usize
	}

	fn check_vector(&self, vector: &[f32]) -> bool {
		vector.len() == self.dimensions() && vector.iter().all(|value| value.is_finite())
	}
}
