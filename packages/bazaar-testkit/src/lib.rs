//! Shared fixtures for the workspace tests.

use serde_json::Map;
use uuid::Uuid;

use bazaar_config::{
	Config, EmbeddingProviderConfig, Personalization, Providers, Ranking, Search, Service, Suggest,
	Trends,
};
use bazaar_domain::{
	geo::GeoPoint,
	item::{ItemStatus, Popularity, PriceRange, SearchableItem},
	profile::UserSearchProfile,
};

pub const EMBEDDING_DIMENSIONS: u32 = 16;

pub const LISBON: GeoPoint = GeoPoint { lat: 38.7223, lon: -9.1393 };

pub const SUNSET_PHOTOGRAPHY: Uuid = Uuid::from_u128(0x0001);
pub const SUNSET_STUDIOS: Uuid = Uuid::from_u128(0x0002);
pub const BLOOM_FLORAL: Uuid = Uuid::from_u128(0x0003);
pub const QUINTA_VENUE: Uuid = Uuid::from_u128(0x0004);
pub const GLOW_MAKEUP: Uuid = Uuid::from_u128(0x0005);
pub const OLD_TOWN_CATERING: Uuid = Uuid::from_u128(0x0006);

/// Config with every section at its default and an embedding provider that is never reached.
pub fn test_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "debug".to_string() },
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				image_path: None,
				model: "test-embedding".to_string(),
				dimensions: EMBEDDING_DIMENSIONS,
				timeout_ms: 200,
				max_attempts: 2,
				default_headers: Map::new(),
			},
		},
		search: Search::default(),
		ranking: Ranking::default(),
		personalization: Personalization::default(),
		suggest: Suggest::default(),
		trends: Trends::default(),
	}
}

/// Six listings around Lisbon. The catering listing is suspended.
pub fn sample_items() -> Vec<SearchableItem> {
	vec![
		item(SUNSET_PHOTOGRAPHY, "Sunset Photography", "photography")
			.describe("Golden hour wedding and engagement shoots", &["photo", "wedding"])
			.at("Lisbon", LISBON)
			.priced(500.0, 1_500.0, 4.8)
			.popular(120, 15)
			.flagged("instant_booking")
			.done(),
		item(SUNSET_STUDIOS, "Sunset Studios", "photography")
			.describe("Studio portraits and headshots", &["portrait"])
			.at("Porto", GeoPoint::new(41.1579, -8.6291))
			.priced(300.0, 900.0, 4.3)
			.popular(40, 2)
			.done(),
		item(BLOOM_FLORAL, "Bloom Floral Decor", "decor")
			.describe("Floral arrangements and centerpieces for weddings", &["flowers", "decor"])
			.at("Lisbon", GeoPoint::new(38.7369, -9.1427))
			.priced(200.0, 2_500.0, 4.6)
			.popular(80, 20)
			.done(),
		item(QUINTA_VENUE, "Quinta Garden Venue", "venue")
			.describe("Outdoor garden venue for weddings up to 200 guests", &["venue", "outdoor"])
			.at("Sintra", GeoPoint::new(38.8029, -9.3817))
			.priced(3_000.0, 9_000.0, 4.9)
			.popular(200, 30)
			.flagged("outdoor")
			.done(),
		item(GLOW_MAKEUP, "Glow Bridal Makeup", "beauty")
			.describe("Bridal makeup and hair styling", &["makeup", "bridal"])
			.priced(150.0, 400.0, 4.4)
			.popular(60, 12)
			.done(),
		item(OLD_TOWN_CATERING, "Old Town Catering", "catering")
			.describe("Wedding catering and buffets", &["catering", "wedding"])
			.at("Lisbon", GeoPoint::new(38.7139, -9.1334))
			.priced(800.0, 4_000.0, 3.9)
			.status(ItemStatus::Suspended)
			.done(),
	]
}

pub fn sample_item(item_id: Uuid) -> Option<SearchableItem> {
	sample_items().into_iter().find(|item| item.item_id == item_id)
}

/// A user who books photographers in Lisbon and cares about ratings.
pub fn photography_profile() -> UserSearchProfile {
	UserSearchProfile {
		preferred_categories: vec!["photography".to_string()],
		price_range: Some(PriceRange::new(400.0, 1_600.0)),
		locations: vec![LISBON],
		quality_preference: Some(4.8),
	}
}

pub fn item(item_id: Uuid, name: &str, category: &str) -> ItemBuilder {
	ItemBuilder(SearchableItem {
		item_id,
		name: name.to_string(),
		description: String::new(),
		service_tags: Vec::new(),
		category: category.to_string(),
		location_label: None,
		coordinate: None,
		price: PriceRange::new(0.0, 0.0),
		rating: 0.0,
		popularity: Popularity::default(),
		flags: Vec::new(),
		status: ItemStatus::Eligible,
		embedding: None,
		embedding_fingerprint: None,
	})
}

pub struct ItemBuilder(SearchableItem);
impl ItemBuilder {
	pub fn describe(mut self, description: &str, tags: &[&str]) -> Self {
		self.0.description = description.to_string();
		self.0.service_tags = tags.iter().map(ToString::to_string).collect();

		self
	}

	pub fn at(mut self, label: &str, coordinate: GeoPoint) -> Self {
		self.0.location_label = Some(label.to_string());
		self.0.coordinate = Some(coordinate);

		self
	}

	pub fn priced(mut self, min: f64, max: f64, rating: f32) -> Self {
		self.0.price = PriceRange::new(min, max);
		self.0.rating = rating;

		self
	}

	pub fn popular(mut self, total: u64, recent: u64) -> Self {
		self.0.popularity = Popularity { total_interactions: total, recent_interactions: recent };

		self
	}

	pub fn flagged(mut self, flag: &str) -> Self {
		self.0.flags.push(flag.to_string());

		self
	}

	pub fn status(mut self, status: ItemStatus) -> Self {
		self.0.status = status;

		self
	}

	pub fn done(self) -> SearchableItem {
		self.0
	}
}
