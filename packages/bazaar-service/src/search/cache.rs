use serde_json::Value;

use crate::{Error, Result};
use bazaar_domain::{profile::UserSearchProfile, query::QueryContext};

/// Every result page key starts with this prefix, so one prefix eviction clears them all.
pub const RESULT_NAMESPACE: &str = "search:v1:";
pub const ANONYMOUS_SEGMENT: &str = "anonymous";

const RESULT_CACHE_SCHEMA_VERSION: i32 = 1;

pub fn hash_cache_key(payload: &Value) -> Result<String> {
	let raw = serde_json::to_vec(payload).map_err(|err| Error::Cache {
		message: format!("Failed to encode cache key payload: {err}"),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

pub fn cache_key_prefix(key: &str) -> &str {
	let start = key.rfind(':').map(|idx| idx + 1).unwrap_or(0);
	let len = (key.len() - start).min(12);

	&key[start..start + len]
}

/// Users sharing a profile share cached pages; users without one share the anonymous segment.
pub fn user_segment(profile: Option<&UserSearchProfile>) -> Result<String> {
	let Some(profile) = profile.filter(|profile| !profile.is_empty()) else {
		return Ok(ANONYMOUS_SEGMENT.to_string());
	};
	let payload = serde_json::to_value(profile).map_err(|err| Error::Cache {
		message: format!("Failed to encode profile segment: {err}"),
	})?;
	let hash = hash_cache_key(&payload)?;

	Ok(format!("profile:{}", &hash[..16]))
}

/// Key over the normalized query, canonical filters, pagination, sort mode, and user segment.
///
/// `generation` moves on every catalog change, so a page computed before an invalidation is
/// written under a key no later search reads.
pub fn build_result_cache_key(
	ctx: &QueryContext,
	segment: &str,
	generation: u64,
) -> Result<String> {
	let filters = serde_json::to_value(ctx.filters.canonical()).map_err(|err| Error::Cache {
		message: format!("Failed to encode filters: {err}"),
	})?;
	let payload = serde_json::json!({
		"kind": "search_results",
		"schema_version": RESULT_CACHE_SCHEMA_VERSION,
		"query": ctx.normalized_query,
		"filters": filters,
		"offset": ctx.pagination.offset,
		"size": ctx.pagination.size,
		"sort": ctx.sort.as_str(),
		"segment": segment,
		"generation": generation,
	});

	Ok(format!("{RESULT_NAMESPACE}{}", hash_cache_key(&payload)?))
}
