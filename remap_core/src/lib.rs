//! `remap_core` is a template-driven data mapping engine. A template is a
//! plain JSON structure whose string leaves may hold `{{ path | filter:arg }}`
//! expressions; mapping evaluates each leaf against a set of named sources
//! and writes the results into a target structure shaped like the template.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template leaf
//!   → Parser (strips `{{ }}`, splits path / default / filter chain)
//!   → Parse cache (LRU, keyed by split mode + raw text)
//!   → Resolver (dot-notation traversal, `*` wildcard fan-out)
//!   → Filter engine (left-to-right chain over the filter registry)
//!   → Hook pipeline (ten lifecycle stages around every pair)
//!   → Writer (dot-notation writes into the target)
//! ```
//!
//! ## Modules
//!
//! - `split` — quote-aware string splitting in `fast` and `safe` modes.
//! - `parser` — template expression parsing into [`Expression`] values.
//! - `cache` — the mode-keyed LRU parse cache.
//! - `resolver` — dot-notation path resolution with wildcard fan-out.
//! - `registry` — the [`Filter`] trait and alias registry.
//! - `filters` — the builtin filter set (`upper`, `trim`, `between`, …).
//! - `engine` — filter chain application.
//! - `pipeline` — lifecycle stages and hook dispatch.
//! - `evaluator` — leaf evaluation: literals, expressions, interpolation.
//! - `mapper` — the top-level [`Mapper`] orchestrating a full mapping.
//!
//! ## Quick Start
//!
//! ```rust
//! use remap_core::{Environment, Mapper, SourceSet};
//! use serde_json::json;
//!
//! let mut mapper = Mapper::new(Environment::new());
//! let sources = SourceSet::root(json!({ "user": { "name": "ada" } }));
//! let template = json!({ "profile": { "name": "{{ user.name | upper }}" } });
//!
//! let target = mapper.map(&template, &sources).unwrap();
//! assert_eq!(target, json!({ "profile": { "name": "ADA" } }));
//! ```

pub use accessor::*;
pub use cache::*;
pub use engine::*;
pub use environment::*;
pub use error::*;
pub use evaluator::*;
pub use filters::*;
pub use mapper::*;
pub use parser::*;
pub use pipeline::*;
pub use registry::*;
pub use resolver::*;
pub use split::*;
pub use writer::*;

mod accessor;
mod cache;
mod engine;
mod environment;
mod error;
mod evaluator;
mod filters;
mod mapper;
mod parser;
mod pipeline;
mod registry;
mod resolver;
mod split;
mod writer;

#[cfg(test)]
mod __fixtures;
