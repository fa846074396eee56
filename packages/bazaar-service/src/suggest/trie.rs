use std::sync::RwLock;

use bazaar_config::{LockStrategy, Suggest};
use bazaar_domain::trie::{Completion, Trie};

/// Prefix trie shared between the request path (readers) and the feedback worker (writer).
#[derive(Debug)]
pub enum SharedTrie {
	Single(RwLock<Trie>),
	/// Words live in the shard picked by their first character, so a prefix query locks one shard.
	Sharded(Vec<RwLock<Trie>>),
}
impl SharedTrie {
	pub fn from_config(cfg: &Suggest) -> Self {
		match cfg.lock_strategy {
			LockStrategy::Single => Self::Single(RwLock::new(Trie::new())),
			LockStrategy::Sharded => Self::sharded(cfg.shards as usize),
		}
	}

	pub fn sharded(shards: usize) -> Self {
		Self::Sharded((0..shards.max(1)).map(|_| RwLock::new(Trie::new())).collect())
	}

	pub fn insert(&self, word: &str) -> u64 {
		let Some(shard) = self.shard_for(word) else { return 0 };

		shard.write().unwrap_or_else(|err| err.into_inner()).insert(word)
	}

	pub fn decrement(&self, word: &str, count: u64) -> u64 {
		let Some(shard) = self.shard_for(word) else { return 0 };

		shard.write().unwrap_or_else(|err| err.into_inner()).decrement(word, count)
	}

	pub fn frequency(&self, word: &str) -> u64 {
		let Some(shard) = self.shard_for(word) else { return 0 };

		shard.read().unwrap_or_else(|err| err.into_inner()).frequency(word)
	}

	pub fn len(&self) -> usize {
		self.shards()
			.iter()
			.map(|shard| shard.read().unwrap_or_else(|err| err.into_inner()).len())
			.sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Completions of a non-empty `prefix`, most frequent first.
	pub fn completions(
		&self,
		prefix: &str,
		max_results: usize,
		max_visits: usize,
		max_depth: usize,
	) -> Vec<Completion> {
		let Some(shard) = self.shard_for(prefix) else { return Vec::new() };

		shard.read().unwrap_or_else(|err| err.into_inner()).completions(
			prefix,
			max_results,
			max_visits,
			max_depth,
		)
	}

	fn shards(&self) -> &[RwLock<Trie>] {
		match self {
			Self::Single(trie) => std::slice::from_ref(trie),
			Self::Sharded(shards) => shards,
		}
	}

	fn shard_for(&self, word: &str) -> Option<&RwLock<Trie>> {
		let first = word.chars().next()?;
		let shards = self.shards();

		shards.get(first as usize % shards.len())
	}
}
