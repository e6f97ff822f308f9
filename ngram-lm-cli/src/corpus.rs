use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::debug;
use regex::Regex;

use ngram_lm_core::Vocabulary;
use ngram_lm_core::tokenizer::{with_boundaries, Tokenizer};

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
/// - Drops blank lines
pub fn read_lines<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(&filename)?.read_to_string(&mut contents)?;
	let lines: Vec<String> = contents
		.lines()
		.filter(|line| !line.trim().is_empty())
		.map(str::to_owned)
		.collect();
	debug!("read {} line(s) from {}", lines.len(), filename.as_ref().display());
	Ok(lines)
}

/// Reads a vocabulary file: one token per line, blank lines ignored.
pub fn read_vocabulary<P: AsRef<Path>>(filename: P) -> io::Result<Vocabulary> {
	Ok(read_lines(filename)?
		.iter()
		.map(|line| line.trim().to_owned())
		.collect())
}

/// Tokenizer for speech transcripts.
///
/// Each line starts with an utterance code followed by a space
/// (`33_1_0001 hello there`). The code is dropped, then annotation tokens
/// (`[noise]`, `<unk>`, ...) and standalone `.` are removed before the
/// boundary markers are added.
#[derive(Debug, Clone)]
pub struct TranscriptTokenizer {
	annotation: Regex,
}

impl TranscriptTokenizer {
	pub fn new() -> Result<Self, regex::Error> {
		Ok(Self { annotation: Regex::new(r"[\[<](.*?)[\]>]")? })
	}

	/// `33_1_0001 hello` → `hello`. A line without a space is returned whole.
	fn strip_code(line: &str) -> &str {
		match line.find(' ') {
			Some(space) => &line[space + 1..],
			None => line,
		}
	}
}

impl Tokenizer for TranscriptTokenizer {
	fn tokenize(&self, line: &str) -> Vec<String> {
		let words = Self::strip_code(line)
			.split_whitespace()
			.filter(|word| !self.annotation.is_match(word) && *word != ".")
			.map(str::to_owned);
		with_boundaries(words)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transcript_lines_are_cleaned() {
		let tokenizer = TranscriptTokenizer::new().unwrap();
		let tokens = tokenizer.tokenize("33_1_0001 hello [noise] there <unk> . friend");
		assert_eq!(tokens, vec!["<s>", "hello", "there", "friend", "</s>"]);
	}

	#[test]
	fn line_without_code_is_kept() {
		let tokenizer = TranscriptTokenizer::new().unwrap();
		assert_eq!(tokenizer.tokenize("hello"), vec!["<s>", "hello", "</s>"]);
	}

	#[test]
	fn reads_lines_from_disk() {
		let path = std::env::temp_dir().join(format!("ngram-lm-corpus-{}.txt", std::process::id()));
		std::fs::write(&path, "a b\n\nc d\r\nz\n").unwrap();
		let lines = read_lines(&path).unwrap();
		let vocab = read_vocabulary(&path).unwrap();
		std::fs::remove_file(&path).unwrap();

		assert_eq!(lines, vec!["a b", "c d", "z"]);
		assert_eq!(vocab.len(), 3);
		assert!(vocab.contains("c d"));
	}
}
