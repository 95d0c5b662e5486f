use crate::cache::ParseCache;
use crate::parser::Expression;
use crate::parser::parse_expression;
use crate::registry::FilterRegistry;
use crate::split::SplitMode;

/// The evaluation environment: filter registry, parse cache, and split mode.
///
/// These were process-wide singletons in the design this engine descends
/// from. Here they are one explicitly constructed object the host builds at
/// startup and threads through calls — tests get a fresh environment per
/// case and no locking is ever needed.
#[derive(Debug)]
pub struct Environment {
	/// The alias→filter registry used to dispatch filter invocations.
	pub registry: FilterRegistry,
	cache: ParseCache,
	mode: SplitMode,
}

impl Environment {
	/// An environment with the builtin filters, safe-mode splitting, and the
	/// default parse cache capacity.
	pub fn new() -> Self {
		Self {
			registry: FilterRegistry::with_builtins(),
			cache: ParseCache::default(),
			mode: SplitMode::default(),
		}
	}

	/// An environment with an empty filter registry.
	pub fn bare() -> Self {
		Self {
			registry: FilterRegistry::new(),
			cache: ParseCache::default(),
			mode: SplitMode::default(),
		}
	}

	pub fn with_mode(mut self, mode: SplitMode) -> Self {
		self.mode = mode;
		self
	}

	pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
		self.cache = ParseCache::new(capacity);
		self
	}

	pub fn mode(&self) -> SplitMode {
		self.mode
	}

	/// Switch the split mode. Cached parses from the previous mode stay in
	/// the cache but can never be served — the mode is part of the key.
	pub fn set_mode(&mut self, mode: SplitMode) {
		self.mode = mode;
	}

	/// Parse a raw template leaf through the cache.
	pub fn parse(&mut self, raw: &str) -> Option<Expression> {
		if let Some(hit) = self.cache.get(self.mode, raw) {
			return hit;
		}

		let parsed = parse_expression(raw, self.mode);
		self.cache.insert(self.mode, raw, parsed.clone());
		parsed
	}

	/// Drop every cached parse (test teardown, config reload).
	pub fn clear_parse_cache(&mut self) {
		self.cache.clear();
	}

	pub fn parse_cache_len(&self) -> usize {
		self.cache.len()
	}
}

impl Default for Environment {
	fn default() -> Self {
		Self::new()
	}
}
