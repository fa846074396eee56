use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct TrieNode {
	children: BTreeMap<char, TrieNode>,
	terminal: bool,
	frequency: u64,
}
impl TrieNode {
	pub fn is_terminal(&self) -> bool {
		self.terminal
	}

	pub fn frequency(&self) -> u64 {
		self.frequency
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
	pub word: String,
	pub frequency: u64,
}

/// Prefix tree over normalized words and queries. The root stands for the empty prefix.
#[derive(Debug, Default)]
pub struct Trie {
	root: TrieNode,
	words: usize,
}
impl Trie {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.words
	}

	pub fn is_empty(&self) -> bool {
		self.words == 0
	}

	/// Inserts `word` once, returning its new frequency. Empty words are ignored.
	pub fn insert(&mut self, word: &str) -> u64 {
		self.insert_with_count(word, 1)
	}

	pub fn insert_with_count(&mut self, word: &str, count: u64) -> u64 {
		if word.is_empty() || count == 0 {
			return 0;
		}

		let mut node = &mut self.root;

		for ch in word.chars() {
			node = node.children.entry(ch).or_default();
		}

		if !node.terminal {
			node.terminal = true;
			self.words += 1;
		}

		node.frequency = node.frequency.saturating_add(count);

		node.frequency
	}

	/// Lowers the frequency of `word` by `count`, removing the word once it reaches zero.
	/// Returns the remaining frequency.
	pub fn decrement(&mut self, word: &str, count: u64) -> u64 {
		let chars: Vec<char> = word.chars().collect();
		let mut node = &mut self.root;

		for ch in &chars {
			let Some(child) = node.children.get_mut(ch) else { return 0 };

			node = child;
		}

		if !node.terminal {
			return 0;
		}

		node.frequency = node.frequency.saturating_sub(count);

		if node.frequency > 0 {
			return node.frequency;
		}

		node.terminal = false;
		self.words -= 1;

		prune_branch(&mut self.root, &chars);

		0
	}

	pub fn frequency(&self, word: &str) -> u64 {
		self.find(word).filter(|node| node.terminal).map(TrieNode::frequency).unwrap_or(0)
	}

	/// Terminal words under `prefix`, most frequent first, ties broken alphabetically.
	///
	/// The traversal visits at most `max_visits` nodes and never descends past `max_depth`
	/// characters.
	pub fn completions(
		&self,
		prefix: &str,
		max_results: usize,
		max_visits: usize,
		max_depth: usize,
	) -> Vec<Completion> {
		if max_results == 0 {
			return Vec::new();
		}

		let Some(start) = self.find(prefix) else { return Vec::new() };
		let mut out = Vec::new();
		let mut stack = vec![(start, prefix.to_string())];
		let mut visits = 0_usize;

		while let Some((node, word)) = stack.pop() {
			visits += 1;

			if node.terminal {
				out.push(Completion { word: word.clone(), frequency: node.frequency });
			}
			if visits >= max_visits {
				break;
			}
			if word.chars().count() >= max_depth {
				continue;
			}

			// Reverse so the stack pops children in key order.
			for (ch, child) in node.children.iter().rev() {
				let mut next = word.clone();

				next.push(*ch);
				stack.push((child, next));
			}
		}

		out.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.word.cmp(&b.word)));
		out.truncate(max_results);

		out
	}

	fn find(&self, prefix: &str) -> Option<&TrieNode> {
		let mut node = &self.root;

		for ch in prefix.chars() {
			node = node.children.get(&ch)?;
		}

		Some(node)
	}
}

/// Drops empty nodes along `path`. Returns whether `node` is left empty.
fn prune_branch(node: &mut TrieNode, path: &[char]) -> bool {
	if let Some((ch, rest)) = path.split_first() {
		let emptied = node.children.get_mut(ch).is_some_and(|child| prune_branch(child, rest));

		if emptied {
			node.children.remove(ch);
		}
	}

	!node.terminal && node.children.is_empty()
}
