use super::trie::CountTrie;
use super::vocabulary::{self, Vocabulary, WordScope};
use crate::error::{NgramError, Result};

/// Bigram counts laid out as a table.
///
/// One row per top-level word of the trie, one column per vocabulary word,
/// both sorted. Cells hold raw counts (0 for pairs never seen).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMatrix {
	pub rows: Vec<String>,
	pub columns: Vec<String>,
	pub cells: Vec<Vec<u64>>,
}

impl CountMatrix {
	/// # Errors
	/// `OrderMismatch` unless `trie` has order 2.
	pub fn from_bigrams(trie: &CountTrie, columns: &Vocabulary) -> Result<Self> {
		if trie.order() != 2 {
			return Err(NgramError::OrderMismatch { expected: 2, got: trie.order() });
		}
		let rows: Vec<String> = vocabulary::words_in(trie, WordScope::TopLevel).iter().map(str::to_owned).collect();
		let columns: Vec<String> = columns.iter().map(str::to_owned).collect();
		let cells = rows
			.iter()
			.map(|row| columns.iter().map(|column| trie.get(&[row, column]).copied().unwrap_or(0)).collect())
			.collect();
		Ok(Self { rows, columns, cells })
	}

	pub fn cell(&self, row: &str, column: &str) -> Option<u64> {
		let r = self.rows.iter().position(|w| w == row)?;
		let c = self.columns.iter().position(|w| w == column)?;
		Some(self.cells[r][c])
	}

	/// Renders the matrix as tab-separated text with a header row.
	pub fn to_tsv(&self) -> String {
		let mut out = String::new();
		out.push_str(&self.columns.join("\t"));
		out.insert(0, '\t');
		out.push('\n');
		for (row, cells) in self.rows.iter().zip(&self.cells) {
			out.push_str(row);
			for cell in cells {
				out.push('\t');
				out.push_str(&cell.to_string());
			}
			out.push('\n');
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::trie::Orientation;
	use crate::tokenizer::WhitespaceTokenizer;

	#[test]
	fn rows_follow_the_trie_columns_follow_the_vocabulary() {
		let trie = CountTrie::build(&["a b a b"], 2, Orientation::Forward, &WhitespaceTokenizer).unwrap();
		let vocab = vocabulary::resolve(&trie, None, false);
		let matrix = CountMatrix::from_bigrams(&trie, &vocab).unwrap();

		assert_eq!(matrix.rows, vec!["<s>", "a", "b"]);
		assert_eq!(matrix.columns, vec!["<s>", "a", "b"]);
		assert_eq!(matrix.cell("a", "b"), Some(2));
		assert_eq!(matrix.cell("b", "a"), Some(1));
		assert_eq!(matrix.cell("b", "b"), Some(0));
		assert_eq!(matrix.cell("z", "b"), None);
	}

	#[test]
	fn tsv_has_a_header() {
		let trie = CountTrie::from_counts(2, Orientation::Forward, vec![(vec!["x", "y"], 3)]).unwrap();
		let vocab: Vocabulary = ["x", "y"].into_iter().collect();
		let tsv = CountMatrix::from_bigrams(&trie, &vocab).unwrap().to_tsv();
		assert_eq!(tsv, "\tx\ty\nx\t0\t3\n");
	}

	#[test]
	fn only_bigrams() {
		let trie = CountTrie::from_counts(3, Orientation::Forward, vec![(vec!["x", "y", "z"], 1)]).unwrap();
		assert!(matches!(
			CountMatrix::from_bigrams(&trie, &Vocabulary::new()),
			Err(NgramError::OrderMismatch { expected: 2, got: 3 })
		));
	}
}
