mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, LockStrategy, Personalization, Providers, Ranking,
	RankingPopularity, Search, SearchCache, SearchFields, Service, Suggest, Trends,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}

	let embedding = &cfg.providers.embedding;

	if embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider embedding api_key must be non-empty.".to_string(),
		});
	}
	if embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if embedding.max_attempts == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.max_attempts must be greater than zero.".to_string(),
		});
	}

	validate_search(cfg)?;
	validate_ranking(cfg)?;
	validate_personalization(cfg)?;
	validate_suggest(cfg)?;

	if cfg.trends.history_per_user == 0 {
		return Err(Error::Validation {
			message: "trends.history_per_user must be greater than zero.".to_string(),
		});
	}
	if cfg.trends.max_events_per_query == 0 {
		return Err(Error::Validation {
			message: "trends.max_events_per_query must be greater than zero.".to_string(),
		});
	}
	if cfg.trends.retention_days <= 0 {
		return Err(Error::Validation {
			message: "trends.retention_days must be greater than zero.".to_string(),
		});
	}
	if cfg.trends.default_window_hours <= 0 {
		return Err(Error::Validation {
			message: "trends.default_window_hours must be greater than zero.".to_string(),
		});
	}
	if cfg.trends.feedback_queue == 0 {
		return Err(Error::Validation {
			message: "trends.feedback_queue must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_search(cfg: &Config) -> Result<()> {
	let search = &cfg.search;

	if search.default_page_size == 0 || search.max_page_size == 0 {
		return Err(Error::Validation {
			message: "search page sizes must be greater than zero.".to_string(),
		});
	}
	if search.default_page_size > search.max_page_size {
		return Err(Error::Validation {
			message: "search.default_page_size must not exceed search.max_page_size.".to_string(),
		});
	}
	if search.candidate_multiplier == 0 {
		return Err(Error::Validation {
			message: "search.candidate_multiplier must be greater than zero.".to_string(),
		});
	}
	if !search.semantic_threshold.is_finite() || !(-1.0..=1.0).contains(&search.semantic_threshold)
	{
		return Err(Error::Validation {
			message: "search.semantic_threshold must be in the range -1.0-1.0.".to_string(),
		});
	}
	if search.retrieval_timeout_ms == 0 || search.request_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search timeouts must be greater than zero.".to_string(),
		});
	}

	for (label, weight) in [
		("search.fields.name_weight", search.fields.name_weight),
		("search.fields.description_weight", search.fields.description_weight),
		("search.fields.tags_weight", search.fields.tags_weight),
	] {
		check_weight(label, weight)?;
	}

	if !(0.0..=1.0).contains(&search.fields.prefix_match_credit) {
		return Err(Error::Validation {
			message: "search.fields.prefix_match_credit must be in the range 0.0-1.0.".to_string(),
		});
	}
	if search.cache.result_ttl_seconds <= 0 {
		return Err(Error::Validation {
			message: "search.cache.result_ttl_seconds must be greater than zero.".to_string(),
		});
	}
	if search.cache.embedding_ttl_days <= 0 {
		return Err(Error::Validation {
			message: "search.cache.embedding_ttl_days must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_ranking(cfg: &Config) -> Result<()> {
	let ranking = &cfg.ranking;
	let weights = [
		("ranking.keyword_weight", ranking.keyword_weight),
		("ranking.semantic_weight", ranking.semantic_weight),
		("ranking.geo_weight", ranking.geo_weight),
		("ranking.popularity_weight", ranking.popularity_weight),
	];

	for (label, weight) in weights {
		check_weight(label, weight)?;
	}

	if weights.iter().map(|(_, weight)| weight).sum::<f32>() <= 0.0 {
		return Err(Error::Validation {
			message: "ranking weights must not all be zero.".to_string(),
		});
	}
	if !ranking.single_signal_factor.is_finite()
		|| ranking.single_signal_factor <= 0.0
		|| ranking.single_signal_factor > 1.0
	{
		return Err(Error::Validation {
			message: "ranking.single_signal_factor must be in the range (0.0, 1.0].".to_string(),
		});
	}
	if ranking.popularity.total_half_saturation <= 0.0
		|| ranking.popularity.recent_half_saturation <= 0.0
	{
		return Err(Error::Validation {
			message: "ranking.popularity half saturation values must be greater than zero."
				.to_string(),
		});
	}
	if !(0.0..=1.0).contains(&ranking.popularity.recent_share) {
		return Err(Error::Validation {
			message: "ranking.popularity.recent_share must be in the range 0.0-1.0.".to_string(),
		});
	}

	Ok(())
}

fn validate_personalization(cfg: &Config) -> Result<()> {
	let personalization = &cfg.personalization;

	if !personalization.boost.is_finite() || !(0.0..=0.3).contains(&personalization.boost) {
		return Err(Error::Validation {
			message: "personalization.boost must be in the range 0.0-0.3.".to_string(),
		});
	}

	for (label, weight) in [
		("personalization.category_weight", personalization.category_weight),
		("personalization.price_weight", personalization.price_weight),
		("personalization.location_weight", personalization.location_weight),
		("personalization.quality_weight", personalization.quality_weight),
	] {
		check_weight(label, weight)?;
	}

	if !personalization.location_radius_km.is_finite() || personalization.location_radius_km <= 0.0
	{
		return Err(Error::Validation {
			message: "personalization.location_radius_km must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_suggest(cfg: &Config) -> Result<()> {
	let suggest = &cfg.suggest;

	if suggest.min_prefix_chars == 0 {
		return Err(Error::Validation {
			message: "suggest.min_prefix_chars must be greater than zero.".to_string(),
		});
	}
	if suggest.default_max_results == 0 || suggest.max_results_cap == 0 {
		return Err(Error::Validation {
			message: "suggest result limits must be greater than zero.".to_string(),
		});
	}
	if suggest.default_max_results > suggest.max_results_cap {
		return Err(Error::Validation {
			message: "suggest.default_max_results must not exceed suggest.max_results_cap."
				.to_string(),
		});
	}

	for (label, weight) in [
		("suggest.trie_weight", suggest.trie_weight),
		("suggest.trending_weight", suggest.trending_weight),
		("suggest.personal_weight", suggest.personal_weight),
		("suggest.semantic_weight", suggest.semantic_weight),
	] {
		check_weight(label, weight)?;
	}

	if !suggest.semantic_threshold.is_finite()
		|| !(-1.0..=1.0).contains(&suggest.semantic_threshold)
	{
		return Err(Error::Validation {
			message: "suggest.semantic_threshold must be in the range -1.0-1.0.".to_string(),
		});
	}
	if suggest.shards == 0 {
		return Err(Error::Validation {
			message: "suggest.shards must be greater than zero.".to_string(),
		});
	}
	if suggest.max_traversal == 0 || suggest.max_word_chars == 0 {
		return Err(Error::Validation {
			message: "suggest traversal bounds must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn check_weight(label: &str, weight: f32) -> Result<()> {
	if !weight.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if weight < 0.0 {
		return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let embedding = &mut cfg.providers.embedding;

	while embedding.api_base.ends_with('/') {
		embedding.api_base.pop();
	}

	if embedding.image_path.as_deref().map(|path| path.trim().is_empty()).unwrap_or(false) {
		embedding.image_path = None;
	}
}
