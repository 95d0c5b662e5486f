use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum RemapError {
	#[error("unknown filter: `{name}`")]
	#[diagnostic(
		code(remap::unknown_filter),
		help("registered filters: {known}")
	)]
	UnknownFilter { name: String, known: String },

	#[error("filter `{filter}` failed at `{path}`: {reason}")]
	#[diagnostic(code(remap::filter_failed))]
	FilterFailed {
		filter: String,
		path: String,
		reason: String,
	},

	#[error("filter `{name}` expects {expected} argument(s), got {got}")]
	#[diagnostic(code(remap::invalid_filter_args))]
	InvalidFilterArgs {
		name: String,
		expected: String,
		got: usize,
	},

	#[error("filter `{name}` cannot coerce argument `{value}`: {reason}")]
	#[diagnostic(code(remap::invalid_filter_argument))]
	InvalidFilterArgument {
		name: String,
		value: String,
		reason: String,
	},

	#[error("unsupported container: {kind}")]
	#[diagnostic(
		code(remap::unsupported_container),
		help("path resolution only understands array-like and object-like containers")
	)]
	UnsupportedContainer { kind: String },

	#[error("hook at stage `{stage}` failed for `{path}`: {reason}")]
	#[diagnostic(code(remap::hook_failed))]
	HookFailed {
		stage: String,
		path: String,
		reason: String,
	},

	#[error("invalid template: {0}")]
	#[diagnostic(
		code(remap::invalid_template),
		help("the template root must be an object or an array of nested string expressions")
	)]
	InvalidTemplate(String),
}

pub type RemapResult<T> = Result<T, RemapError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyResult<T> = Result<T, AnyError>;
