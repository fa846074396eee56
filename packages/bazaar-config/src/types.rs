use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub ranking: Ranking,
	#[serde(default)]
	pub personalization: Personalization,
	#[serde(default)]
	pub suggest: Suggest,
	#[serde(default)]
	pub trends: Trends,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	/// Optional. Endpoint used for image embeddings; falls back to `path` when absent.
	pub image_path: Option<String>,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	/// Total attempts per embedding call, including the first one.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_page_size: u32,
	pub max_page_size: u32,
	/// Each retrieval path keeps at most `candidate_multiplier * page_size` candidates.
	pub candidate_multiplier: u32,
	pub semantic_threshold: f32,
	pub retrieval_timeout_ms: u64,
	pub request_timeout_ms: u64,
	pub fields: SearchFields,
	pub cache: SearchCache,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_page_size: 20,
			max_page_size: 100,
			candidate_multiplier: 3,
			semantic_threshold: 0.7,
			retrieval_timeout_ms: 800,
			request_timeout_ms: 2_000,
			fields: SearchFields::default(),
			cache: SearchCache::default(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchFields {
	pub name_weight: f32,
	pub description_weight: f32,
	pub tags_weight: f32,
	/// Credit given when a query term is a prefix of an indexed token instead of an exact match.
	pub prefix_match_credit: f32,
	pub min_prefix_chars: u32,
}
impl Default for SearchFields {
	fn default() -> Self {
		Self {
			name_weight: 3.0,
			description_weight: 1.5,
			tags_weight: 1.0,
			prefix_match_credit: 0.75,
			min_prefix_chars: 3,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchCache {
	pub enabled: bool,
	pub result_ttl_seconds: i64,
	pub embedding_ttl_days: i64,
}
impl Default for SearchCache {
	fn default() -> Self {
		Self { enabled: true, result_ttl_seconds: 300, embedding_ttl_days: 7 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub keyword_weight: f32,
	pub semantic_weight: f32,
	pub geo_weight: f32,
	pub popularity_weight: f32,
	/// Multiplier applied to candidates found by only one retrieval path.
	pub single_signal_factor: f32,
	pub popularity: RankingPopularity,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			keyword_weight: 0.4,
			semantic_weight: 0.4,
			geo_weight: 0.1,
			popularity_weight: 0.1,
			single_signal_factor: 0.65,
			popularity: RankingPopularity::default(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingPopularity {
	pub total_half_saturation: f32,
	pub recent_half_saturation: f32,
	pub recent_share: f32,
}
impl Default for RankingPopularity {
	fn default() -> Self {
		Self { total_half_saturation: 50.0, recent_half_saturation: 10.0, recent_share: 0.7 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Personalization {
	pub enabled: bool,
	pub boost: f32,
	pub category_weight: f32,
	pub price_weight: f32,
	pub location_weight: f32,
	pub quality_weight: f32,
	pub location_radius_km: f64,
}
impl Default for Personalization {
	fn default() -> Self {
		Self {
			enabled: true,
			boost: 0.2,
			category_weight: 0.3,
			price_weight: 0.25,
			location_weight: 0.25,
			quality_weight: 0.2,
			location_radius_km: 25.0,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Suggest {
	pub min_prefix_chars: u32,
	pub default_max_results: u32,
	pub max_results_cap: u32,
	pub trie_weight: f32,
	pub trending_weight: f32,
	pub personal_weight: f32,
	pub semantic_weight: f32,
	pub semantic_threshold: f32,
	/// Number of frequent queries compared against the prefix embedding.
	pub semantic_vocabulary: u32,
	pub lock_strategy: LockStrategy,
	pub shards: u32,
	pub max_traversal: u32,
	pub max_word_chars: u32,
}
impl Default for Suggest {
	fn default() -> Self {
		Self {
			min_prefix_chars: 2,
			default_max_results: 8,
			max_results_cap: 25,
			trie_weight: 1.0,
			trending_weight: 0.8,
			personal_weight: 0.9,
			semantic_weight: 0.6,
			semantic_threshold: 0.75,
			semantic_vocabulary: 64,
			lock_strategy: LockStrategy::Sharded,
			shards: 16,
			max_traversal: 4_096,
			max_word_chars: 64,
		}
	}
}

/// How the suggestion trie is locked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStrategy {
	/// One lock over the whole trie.
	Single,
	/// Words are spread over `shards` tries by their first character.
	#[default]
	Sharded,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Trends {
	pub history_per_user: u32,
	pub max_events_per_query: u32,
	pub retention_days: i64,
	pub default_window_hours: i64,
	pub feedback_queue: u32,
}
impl Default for Trends {
	fn default() -> Self {
		Self {
			history_per_user: 20,
			max_events_per_query: 256,
			retention_days: 30,
			default_window_hours: 24,
			feedback_queue: 1_024,
		}
	}
}

fn default_max_attempts() -> u32 {
	2
}
