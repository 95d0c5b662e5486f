use serde::Deserialize;
use serde::Serialize;
use snailquote::unescape;

/// Quote handling policy used when splitting expression bodies.
///
/// The engine splits expression bodies on `|` (filter chains), `:` (filter
/// arguments), and `??` (default literals). All three splits must ignore
/// delimiters that appear inside quoted sub-strings, and two policies exist
/// for deciding what counts as "quoted":
///
/// - [`SplitMode::Fast`] only toggles quoting on a bare `"` double quote. No
///   backslash processing happens at all, and a lone apostrophe never opens a
///   quoted region.
/// - [`SplitMode::Safe`] honors both `'` and `"` quotes and backslash escape
///   sequences (`\n`, `\t`, `\r`, `\"`, `\\`, `\'`).
///
/// The mode is a property of the [`Environment`](crate::Environment), not of
/// an individual call, and it participates in the parse cache key so a mode
/// switch can never surface an expression split under the other policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[non_exhaustive]
pub enum SplitMode {
	/// Bare double-quote toggling only; no escape processing.
	Fast,
	/// Full single/double quote tracking with backslash escapes.
	#[default]
	Safe,
}

impl std::fmt::Display for SplitMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Fast => write!(f, "fast"),
			Self::Safe => write!(f, "safe"),
		}
	}
}

/// Split `input` on every occurrence of `delimiter` that sits outside a
/// quoted region, according to `mode`. Quote characters are preserved in the
/// returned segments; use [`strip_quotes`] to unquote individual pieces.
pub fn split(input: &str, delimiter: char, mode: SplitMode) -> Vec<String> {
	let mut segments = Vec::new();
	let mut current = String::new();

	match mode {
		SplitMode::Fast => {
			let mut in_quotes = false;

			for ch in input.chars() {
				if ch == '"' {
					in_quotes = !in_quotes;
					current.push(ch);
				} else if ch == delimiter && !in_quotes {
					segments.push(std::mem::take(&mut current));
				} else {
					current.push(ch);
				}
			}
		}
		SplitMode::Safe => {
			let mut quote: Option<char> = None;
			let mut escaped = false;

			for ch in input.chars() {
				if escaped {
					current.push(ch);
					escaped = false;
				} else if ch == '\\' && quote.is_some() {
					current.push(ch);
					escaped = true;
				} else if let Some(open) = quote {
					current.push(ch);
					if ch == open {
						quote = None;
					}
				} else if ch == '\'' || ch == '"' {
					quote = Some(ch);
					current.push(ch);
				} else if ch == delimiter {
					segments.push(std::mem::take(&mut current));
				} else {
					current.push(ch);
				}
			}
		}
	}

	segments.push(current);
	segments
}

/// Split `input` once on the first occurrence of the multi-character `token`
/// found outside quoted regions. Returns the head and, when the token was
/// found, the tail.
pub fn split_once_unquoted<'a>(
	input: &'a str,
	token: &str,
	mode: SplitMode,
) -> (&'a str, Option<&'a str>) {
	if let Some(index) = find_unquoted(input, token, mode) {
		(&input[..index], Some(&input[index + token.len()..]))
	} else {
		(input, None)
	}
}

/// Find the byte index of the first occurrence of `token` outside quotes.
fn find_unquoted(input: &str, token: &str, mode: SplitMode) -> Option<usize> {
	let bytes = input.as_bytes();
	let token_bytes = token.as_bytes();
	let mut quote: Option<u8> = None;
	let mut escaped = false;
	let mut index = 0;

	while index < bytes.len() {
		let byte = bytes[index];

		match mode {
			SplitMode::Fast => {
				if byte == b'"' {
					quote = if quote.is_some() { None } else { Some(b'"') };
				} else if quote.is_none() && bytes[index..].starts_with(token_bytes) {
					return Some(index);
				}
			}
			SplitMode::Safe => {
				if escaped {
					escaped = false;
				} else if byte == b'\\' && quote.is_some() {
					escaped = true;
				} else if let Some(open) = quote {
					if byte == open {
						quote = None;
					}
				} else if byte == b'\'' || byte == b'"' {
					quote = Some(byte);
				} else if bytes[index..].starts_with(token_bytes) {
					return Some(index);
				}
			}
		}

		index += 1;
	}

	None
}

/// Strip a matching pair of surrounding quotes from `raw`, if present. In
/// safe mode the inner text is additionally unescaped (`\n`, `\t`, `\r`,
/// `\"`, `\\`, `\'`); fast mode never performs backslash processing.
pub fn strip_quotes(raw: &str, mode: SplitMode) -> String {
	let trimmed = raw.trim();
	let bytes = trimmed.as_bytes();

	let quoted = bytes.len() >= 2
		&& (bytes[0] == b'"' || bytes[0] == b'\'')
		&& bytes[bytes.len() - 1] == bytes[0];

	if !quoted {
		return trimmed.to_string();
	}

	let inner = &trimmed[1..trimmed.len() - 1];

	match mode {
		SplitMode::Fast => inner.to_string(),
		SplitMode::Safe => {
			// Unescaping needs the surrounding quotes: snailquote treats
			// backslashes inside and outside quotes differently.
			if inner.contains('\\') {
				unescape(trimmed).unwrap_or_else(|_| inner.to_string())
			} else {
				inner.to_string()
			}
		}
	}
}

/// Returns true when `raw` is wrapped in a matching pair of quotes.
pub fn is_quoted(raw: &str) -> bool {
	let bytes = raw.trim().as_bytes();
	bytes.len() >= 2
		&& (bytes[0] == b'"' || bytes[0] == b'\'')
		&& bytes[bytes.len() - 1] == bytes[0]
}
