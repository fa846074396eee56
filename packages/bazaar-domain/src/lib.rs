pub mod geo;
pub mod item;
pub mod normalize;
pub mod profile;
pub mod query;
pub mod trend;
pub mod trie;
pub mod vector;
