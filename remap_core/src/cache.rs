use std::collections::HashMap;

use crate::parser::Expression;
use crate::split::SplitMode;

/// Default maximum number of cached parses.
pub const DEFAULT_PARSE_CACHE_CAPACITY: usize = 1024;

/// A bounded, least-recently-used cache of expression parses.
///
/// Parsing is pure, so the cache is transparent: a hit is structurally equal
/// to a fresh parse. The key includes the [`SplitMode`] the entry was parsed
/// under — switching modes must never surface an expression whose filter
/// arguments were split under the other policy, so entries from the two modes
/// simply never collide. Non-expression literals are cached as `None` so
/// repeated literal leaves skip re-parsing too.
#[derive(Debug)]
pub struct ParseCache {
	capacity: usize,
	entries: HashMap<(SplitMode, String), Slot>,
	clock: u64,
}

#[derive(Debug)]
struct Slot {
	parsed: Option<Expression>,
	touched: u64,
}

impl ParseCache {
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity: capacity.max(1),
			entries: HashMap::new(),
			clock: 0,
		}
	}

	/// Look up a cached parse, marking the entry as recently used. The outer
	/// `Option` is the cache hit; the inner one is the parse result itself.
	pub fn get(&mut self, mode: SplitMode, raw: &str) -> Option<Option<Expression>> {
		self.clock += 1;
		let clock = self.clock;
		let slot = self.entries.get_mut(&(mode, raw.to_string()))?;
		slot.touched = clock;
		Some(slot.parsed.clone())
	}

	/// Insert a parse result, evicting the least-recently-used entry when the
	/// cache is full.
	pub fn insert(&mut self, mode: SplitMode, raw: &str, parsed: Option<Expression>) {
		if self.entries.len() >= self.capacity
			&& !self.entries.contains_key(&(mode, raw.to_string()))
		{
			self.evict_oldest();
		}

		self.clock += 1;
		self.entries.insert(
			(mode, raw.to_string()),
			Slot {
				parsed,
				touched: self.clock,
			},
		);
	}

	fn evict_oldest(&mut self) {
		let oldest = self
			.entries
			.iter()
			.min_by_key(|(_, slot)| slot.touched)
			.map(|(key, _)| key.clone());

		if let Some(key) = oldest {
			tracing::trace!(raw = %key.1, "evicting parse cache entry");
			self.entries.remove(&key);
		}
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}
}

impl Default for ParseCache {
	fn default() -> Self {
		Self::new(DEFAULT_PARSE_CACHE_CAPACITY)
	}
}
