pub mod cache;
pub mod personalize;
pub mod ranking;
pub mod retrieval;

use std::{
	cmp::Ordering,
	collections::{BTreeMap, HashMap},
	sync::atomic::Ordering as AtomicOrdering,
	time::Duration as StdDuration,
};

use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

use crate::{
	BazaarService, Error, Result,
	embedding::{self, EmbeddingSource},
	search::{
		ranking::{RankSignals, ScoredCandidate, Signal},
		retrieval::GeoScores,
	},
};
use bazaar_domain::{
	item::{PriceRange, SearchableItem},
	profile::UserSearchProfile,
	query::{Pagination, QueryContext, SearchFilters, SortMode},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
	#[serde(default)]
	pub query: String,
	#[serde(default)]
	pub filters: SearchFilters,
	pub pagination: Option<Pagination>,
	#[serde(default)]
	pub sort: SortMode,
	pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
	Ok,
	/// One retrieval path failed or timed out.
	Partial,
	/// Every retrieval path failed; results are empty.
	Degraded,
}
impl SearchStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Ok => "ok",
			Self::Partial => "partial",
			Self::Degraded => "degraded",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultExplain {
	pub keyword: Option<f32>,
	pub semantic: Option<f32>,
	pub geo: Option<f32>,
	pub popularity: f32,
	pub combined: f32,
	pub personalization: Option<f32>,
	pub signals: Vec<Signal>,
	pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
	pub item_id: Uuid,
	pub name: String,
	pub category: String,
	pub location_label: Option<String>,
	pub price: PriceRange,
	pub rating: f32,
	pub score: f32,
	pub explain: ResultExplain,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facets {
	pub categories: BTreeMap<String, u32>,
	pub price_buckets: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPage {
	/// Normalized query.
	pub query: String,
	pub status: SearchStatus,
	pub cached: bool,
	/// Ranked results before pagination.
	pub total: u32,
	pub offset: u32,
	pub size: u32,
	pub results: Vec<SearchResult>,
	pub facets: Facets,
}
impl RankedPage {
	fn empty(ctx: &QueryContext, status: SearchStatus) -> Self {
		Self {
			query: ctx.normalized_query.clone(),
			status,
			cached: false,
			total: 0,
			offset: ctx.pagination.offset,
			size: ctx.pagination.size,
			results: Vec::new(),
			facets: Facets::default(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemChangeReport {
	pub item_id: Uuid,
	/// Where the refreshed embedding came from; `None` when the item was removed.
	pub embedding: Option<EmbeddingSource>,
	pub evicted_pages: usize,
}

enum CacheLookup {
	Hit(Box<RankedPage>),
	Miss,
	/// The store failed; skip the write as well.
	Bypass,
}

impl BazaarService {
	/// Hybrid search. Only invalid input is an error; upstream failures degrade the page.
	pub async fn search(&self, req: SearchRequest) -> Result<RankedPage> {
		let pagination = req
			.pagination
			.unwrap_or(Pagination { offset: 0, size: self.cfg.search.default_page_size });
		let ctx = QueryContext::new(
			&req.query,
			req.user_id,
			req.filters,
			pagination,
			req.sort,
			self.cfg.search.max_page_size,
		)?;
		let profile = self.load_profile(ctx.user_id.as_deref()).await;
		let cache_key = self.result_cache_key(&ctx, profile.as_ref());
		let lookup = match cache_key.as_deref() {
			Some(key) => self.read_cached_page(key).await,
			None => CacheLookup::Bypass,
		};

		if let CacheLookup::Hit(page) = lookup {
			self.enqueue_query(&ctx);

			return Ok(*page);
		}

		let timeout = StdDuration::from_millis(self.cfg.search.request_timeout_ms);
		let page = match tokio::time::timeout(timeout, self.rank(&ctx, profile.as_ref())).await {
			Ok(page) => page,
			Err(_) => {
				tracing::warn!(
					timeout_ms = self.cfg.search.request_timeout_ms,
					"Search timed out; returning a degraded page."
				);

				RankedPage::empty(&ctx, SearchStatus::Degraded)
			},
		};

		if page.status == SearchStatus::Ok
			&& matches!(lookup, CacheLookup::Miss)
			&& let Some(key) = cache_key.as_deref()
		{
			self.write_cached_page(key, &page).await;
		}

		self.enqueue_query(&ctx);

		tracing::debug!(
			query = %ctx.normalized_query,
			status = page.status.as_str(),
			total = page.total,
			returned = page.results.len(),
			"Search completed."
		);

		Ok(page)
	}

	/// Refreshes the keyword index and the item embedding, then drops cached result pages.
	pub async fn on_item_changed(&self, item: &SearchableItem) -> Result<ItemChangeReport> {
		self.collaborators.text_index.update_item(item).await?;

		let embedded = self.embed_item(item).await;

		if embedded.is_fallback() {
			tracing::warn!(item_id = %item.item_id, "Item embedding deferred; provider is down.");
		}

		self.store_item_embedding(item, &embedded).await;

		let evicted_pages = self.invalidate_results().await;

		Ok(ItemChangeReport {
			item_id: item.item_id,
			embedding: Some(embedded.source),
			evicted_pages,
		})
	}

	pub async fn on_item_removed(&self, item_id: Uuid) -> Result<ItemChangeReport> {
		self.collaborators.text_index.delete_item(item_id).await?;

		if let Err(err) =
			self.collaborators.kv.evict_prefix(&embedding::item_key_prefix(item_id)).await
		{
			tracing::warn!(error = %err, item_id = %item_id, "Item embedding eviction failed.");
		}

		let evicted_pages = self.invalidate_results().await;

		Ok(ItemChangeReport { item_id, embedding: None, evicted_pages })
	}

	async fn invalidate_results(&self) -> usize {
		self.result_generation.fetch_add(1, AtomicOrdering::SeqCst);

		match self.collaborators.kv.evict_prefix(cache::RESULT_NAMESPACE).await {
			Ok(count) => count,
			Err(err) => {
				tracing::warn!(error = %err, "Result cache invalidation failed.");

				0
			},
		}
	}

	async fn rank(&self, ctx: &QueryContext, profile: Option<&UserSearchProfile>) -> RankedPage {
		if ctx.normalized_query.is_empty() {
			return self.rank_browse(ctx, profile).await;
		}

		let retrieval_timeout = StdDuration::from_millis(self.cfg.search.retrieval_timeout_ms);
		let cap = ctx.candidate_cap(self.cfg.search.candidate_multiplier);
		let (keyword, semantic) = tokio::join!(
			tokio::time::timeout(retrieval_timeout, self.keyword_candidates(ctx, cap)),
			tokio::time::timeout(retrieval_timeout, self.semantic_candidates(ctx, cap)),
		);
		let keyword = path_outcome("keyword", keyword);
		let semantic = path_outcome("semantic", semantic);
		let status = match (keyword.is_some(), semantic.is_some()) {
			(true, true) => SearchStatus::Ok,
			(false, false) => return RankedPage::empty(ctx, SearchStatus::Degraded),
			_ => SearchStatus::Partial,
		};
		let keyword = keyword.unwrap_or_default();
		let semantic = semantic.unwrap_or_default();
		let mut items: HashMap<Uuid, SearchableItem> =
			semantic.items.into_iter().map(|item| (item.item_id, item)).collect();

		for (item_id, _) in &keyword {
			if items.contains_key(item_id) {
				continue;
			}

			match self.collaborators.items.get_by_id(*item_id).await {
				Ok(Some(item)) if ctx.filters.matches(&item) => {
					items.insert(item.item_id, item);
				},
				Ok(_) => {},
				Err(err) => {
					tracing::warn!(error = %err, item_id = %item_id, "Item lookup failed.");
				},
			}
		}

		let keyword: Vec<(Uuid, f32)> =
			keyword.into_iter().filter(|(item_id, _)| items.contains_key(item_id)).collect();
		let geo = retrieval::geo_scores(ctx, items.values());
		let popularity = self.popularity_scores(&items);
		let signals = RankSignals {
			keyword: &keyword,
			semantic: &semantic.candidates,
			geo: geo.as_ref().map(|geo| &geo.scores),
			popularity: &popularity,
		};
		let ranked = ranking::merge(signals, &self.cfg.ranking);

		self.finish_page(ctx, profile, ranked, &items, geo.as_ref(), status)
	}

	async fn rank_browse(
		&self,
		ctx: &QueryContext,
		profile: Option<&UserSearchProfile>,
	) -> RankedPage {
		let retrieval_timeout = StdDuration::from_millis(self.cfg.search.retrieval_timeout_ms);
		let found = tokio::time::timeout(
			retrieval_timeout,
			self.collaborators.items.find_eligible_by_filters(&ctx.filters),
		)
		.await;
		let Some(found) = path_outcome("browse", found) else {
			return RankedPage::empty(ctx, SearchStatus::Degraded);
		};
		let items: HashMap<Uuid, SearchableItem> =
			found.into_iter().map(|item| (item.item_id, item)).collect();
		let mut item_ids: Vec<Uuid> = items.keys().copied().collect();

		item_ids.sort();

		let geo = retrieval::geo_scores(ctx, items.values());
		let popularity = self.popularity_scores(&items);
		let ranked = ranking::browse(
			&item_ids,
			geo.as_ref().map(|geo| &geo.scores),
			&popularity,
			&self.cfg.ranking,
		);

		self.finish_page(ctx, profile, ranked, &items, geo.as_ref(), SearchStatus::Ok)
	}

	fn finish_page(
		&self,
		ctx: &QueryContext,
		profile: Option<&UserSearchProfile>,
		mut ranked: Vec<ScoredCandidate>,
		items: &HashMap<Uuid, SearchableItem>,
		geo: Option<&GeoScores>,
		status: SearchStatus,
	) -> RankedPage {
		if let Some(profile) = profile {
			ranked = personalize::adjust(ranked, items, profile, &self.cfg.personalization);
		}

		ranked.retain(|candidate| items.contains_key(&candidate.item_id));

		sort_by_mode(&mut ranked, ctx.sort, items, geo);

		let facets = build_facets(&ranked, items);
		let total = ranked.len() as u32;
		let window = ctx.pagination.window();
		let results = ranked
			.iter()
			.skip(window.start)
			.take(window.end - window.start)
			.filter_map(|candidate| {
				let item = items.get(&candidate.item_id)?;
				let distance_km =
					geo.and_then(|geo| geo.distances_km.get(&candidate.item_id).copied());

				Some(to_result(candidate, item, distance_km))
			})
			.collect();

		RankedPage {
			query: ctx.normalized_query.clone(),
			status,
			cached: false,
			total,
			offset: ctx.pagination.offset,
			size: ctx.pagination.size,
			results,
			facets,
		}
	}

	fn popularity_scores(&self, items: &HashMap<Uuid, SearchableItem>) -> HashMap<Uuid, f32> {
		items
			.values()
			.map(|item| {
				let score =
					ranking::popularity_score(&item.popularity, &self.cfg.ranking.popularity);

				(item.item_id, score)
			})
			.collect()
	}

	async fn load_profile(&self, user_id: Option<&str>) -> Option<UserSearchProfile> {
		if !self.cfg.personalization.enabled {
			return None;
		}

		let user_id = user_id?;

		match self.collaborators.profiles.get_search_profile(user_id).await {
			Ok(profile) => profile.filter(|profile| !profile.is_empty()),
			Err(err) => {
				tracing::warn!(error = %err, "Profile lookup failed; skipping personalization.");

				None
			},
		}
	}

	fn result_cache_key(
		&self,
		ctx: &QueryContext,
		profile: Option<&UserSearchProfile>,
	) -> Option<String> {
		if !self.cfg.search.cache.enabled {
			return None;
		}

		let generation = self.result_generation();
		let key = cache::user_segment(profile)
			.and_then(|segment| cache::build_result_cache_key(ctx, &segment, generation));

		match key {
			Ok(key) => Some(key),
			Err(err) => {
				tracing::warn!(error = %err, "Cache key build failed.");

				None
			},
		}
	}

	async fn read_cached_page(&self, key: &str) -> CacheLookup {
		let raw = match self.collaborators.kv.get(key).await {
			Ok(Some(raw)) => raw,
			Ok(None) => {
				tracing::debug!(cache_key_prefix = cache::cache_key_prefix(key), "Cache miss.");

				return CacheLookup::Miss;
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_key_prefix = cache::cache_key_prefix(key),
					"Cache read failed; bypassing the result cache."
				);

				return CacheLookup::Bypass;
			},
		};

		match serde_json::from_str::<RankedPage>(&raw) {
			Ok(mut page) => {
				tracing::debug!(cache_key_prefix = cache::cache_key_prefix(key), "Cache hit.");

				page.cached = true;

				CacheLookup::Hit(Box::new(page))
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_key_prefix = cache::cache_key_prefix(key),
					"Cache payload decode failed; treating as a miss."
				);

				CacheLookup::Miss
			},
		}
	}

	async fn write_cached_page(&self, key: &str, page: &RankedPage) {
		let raw = match serde_json::to_string(page) {
			Ok(raw) => raw,
			Err(err) => {
				tracing::warn!(
					error = %Error::Cache { message: err.to_string() },
					"Cache payload encode failed."
				);

				return;
			},
		};
		let ttl = Duration::seconds(self.cfg.search.cache.result_ttl_seconds);

		if let Err(err) = self.collaborators.kv.put(key, raw, ttl).await {
			tracing::warn!(
				error = %err,
				cache_key_prefix = cache::cache_key_prefix(key),
				"Cache write failed."
			);
		}
	}
}

fn path_outcome<T>(
	path: &'static str,
	outcome: std::result::Result<Result<T>, tokio::time::error::Elapsed>,
) -> Option<T> {
	match outcome {
		Ok(Ok(value)) => Some(value),
		Ok(Err(err)) => {
			tracing::warn!(error = %err, path, "Candidate path failed.");

			None
		},
		Err(_) => {
			tracing::warn!(path, "Candidate path timed out.");

			None
		},
	}
}

fn sort_by_mode(
	ranked: &mut [ScoredCandidate],
	sort: SortMode,
	items: &HashMap<Uuid, SearchableItem>,
	geo: Option<&GeoScores>,
) {
	let rating = |id: &Uuid| items.get(id).map(|item| item.rating).unwrap_or(0.0);
	let price = |id: &Uuid| items.get(id).map(|item| item.price.min).unwrap_or(f64::INFINITY);
	let distance = |id: &Uuid| {
		geo.and_then(|geo| geo.distances_km.get(id).copied()).unwrap_or(f64::INFINITY)
	};

	match sort {
		SortMode::Relevance => ranking::sort_by_final_score(ranked),
		SortMode::Rating => ranked.sort_by(|a, b| {
			ranking::cmp_f32_desc(rating(&a.item_id), rating(&b.item_id))
				.then_with(|| ranking::cmp_final_desc(a, b))
		}),
		SortMode::Price => ranked.sort_by(|a, b| {
			cmp_f64_asc(price(&a.item_id), price(&b.item_id))
				.then_with(|| ranking::cmp_final_desc(a, b))
		}),
		SortMode::Popularity => ranked.sort_by(|a, b| {
			ranking::cmp_f32_desc(a.popularity, b.popularity)
				.then_with(|| ranking::cmp_final_desc(a, b))
		}),
		SortMode::Distance => ranked.sort_by(|a, b| {
			cmp_f64_asc(distance(&a.item_id), distance(&b.item_id))
				.then_with(|| ranking::cmp_final_desc(a, b))
		}),
	}
}

fn cmp_f64_asc(a: f64, b: f64) -> Ordering {
	a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn build_facets(ranked: &[ScoredCandidate], items: &HashMap<Uuid, SearchableItem>) -> Facets {
	let mut facets = Facets::default();

	for candidate in ranked {
		let Some(item) = items.get(&candidate.item_id) else { continue };

		*facets.categories.entry(item.category.to_lowercase()).or_default() += 1;
		*facets.price_buckets.entry(price_bucket(item.price.min).to_string()).or_default() += 1;
	}

	facets
}

fn price_bucket(min_price: f64) -> &'static str {
	if min_price < 100.0 {
		"under_100"
	} else if min_price < 500.0 {
		"100_500"
	} else if min_price < 2_000.0 {
		"500_2000"
	} else {
		"over_2000"
	}
}

fn to_result(
	candidate: &ScoredCandidate,
	item: &SearchableItem,
	distance_km: Option<f64>,
) -> SearchResult {
	SearchResult {
		item_id: item.item_id,
		name: item.name.clone(),
		category: item.category.clone(),
		location_label: item.location_label.clone(),
		price: item.price,
		rating: item.rating,
		score: candidate.final_score,
		explain: ResultExplain {
			keyword: candidate.keyword,
			semantic: candidate.semantic,
			geo: candidate.geo,
			popularity: candidate.popularity,
			combined: candidate.combined,
			personalization: candidate.personalization,
			signals: candidate.signals.clone(),
			distance_km,
		},
	}
}
