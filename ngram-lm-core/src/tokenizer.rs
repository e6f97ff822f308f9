/// Marker prepended to every tokenized line.
pub const SENTENCE_START: &str = "<s>";

/// Marker appended to every tokenized line.
pub const SENTENCE_END: &str = "</s>";

/// Turns one raw line into the ordered token sequence fed to the trie builder.
///
/// Implementations are expected to wrap the line's tokens in
/// [`SENTENCE_START`] / [`SENTENCE_END`] (see [`with_boundaries`]).
/// Line cleanup specific to a corpus (codes, annotations) lives in the
/// implementation, not in the engine.
pub trait Tokenizer {
	fn tokenize(&self, line: &str) -> Vec<String>;
}

/// Splits on Unicode whitespace and adds boundary markers.
///
/// No case folding or punctuation handling: tokens are kept exactly as written.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
	fn tokenize(&self, line: &str) -> Vec<String> {
		with_boundaries(line.split_whitespace().map(str::to_owned))
	}
}

/// Wraps a token stream in `<s>` ... `</s>`.
pub fn with_boundaries<I>(tokens: I) -> Vec<String>
where
	I: IntoIterator<Item = String>,
{
	let mut out = vec![SENTENCE_START.to_owned()];
	out.extend(tokens);
	out.push(SENTENCE_END.to_owned());
	out
}
