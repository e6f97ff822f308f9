mod corpus;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use ngram_lm_core::model::report::CountMatrix;
use ngram_lm_core::tokenizer::{Tokenizer, WhitespaceTokenizer, SENTENCE_END, SENTENCE_START};
use ngram_lm_core::{InterpolationModel, ModelConfig, Orientation};

use corpus::TranscriptTokenizer;

/// Train an interpolated add-one n-gram model on a text corpus and query it.
#[derive(Parser, Debug)]
#[command(name = "ngram-lm", version, about)]
struct Cli {
	/// Log at debug level (RUST_LOG takes precedence).
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(flatten)]
	model: ModelArgs,

	#[command(subcommand)]
	command: Command,
}

#[derive(Args, Debug)]
struct ModelArgs {
	/// Training corpus, one sentence per line.
	#[arg(short, long)]
	corpus: PathBuf,

	/// JSON model configuration; flags below override its values.
	#[arg(long)]
	config: Option<PathBuf>,

	/// Highest n-gram order (default 3 without a config file).
	#[arg(short, long)]
	order: Option<usize>,

	/// Trie key order: forward or backward.
	#[arg(long)]
	orientation: Option<Orientation>,

	/// Interpolation weights, one per order, comma separated (e.g. 0.2,0.3,0.5).
	#[arg(short, long, value_delimiter = ',')]
	weights: Option<Vec<f64>>,

	/// Vocabulary file, one token per line.
	#[arg(long)]
	vocab: Option<PathBuf>,

	/// Add corpus words to the vocabulary file instead of rejecting them.
	#[arg(long, requires = "vocab")]
	extend_vocab: bool,

	/// Lines start with an utterance code and carry [annotations].
	#[arg(long)]
	transcript: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Per-order trie sizes and vocabulary size.
	Stats,
	/// Interpolated probability of an n-gram.
	Score {
		/// Exactly `order` words.
		words: Vec<String>,
	},
	/// Continuation probability of a word.
	Continuation {
		word: String,
		/// Order of the counts to measure contexts on (default: model order).
		#[arg(long)]
		context_order: Option<usize>,
	},
	/// Perplexity of another file under the model.
	Perplexity { file: PathBuf },
	/// Sample sentences from the model.
	Generate {
		#[arg(short = 'n', long, default_value_t = 5)]
		count: usize,
		#[arg(long, default_value_t = 20)]
		max_tokens: usize,
		#[arg(long)]
		seed: Option<u64>,
	},
	/// Bigram count matrix as tab-separated values.
	Matrix,
}

impl ModelArgs {
	fn config(&self) -> Result<ModelConfig, Box<dyn std::error::Error>> {
		let mut config = match &self.config {
			Some(path) => {
				let text = std::fs::read_to_string(path)?;
				serde_json::from_str::<ModelConfig>(&text)?
			}
			None => ModelConfig::new(self.order.unwrap_or(3))?,
		};

		if let Some(order) = self.order {
			if order != config.order() {
				if config.weights().is_some() && self.weights.is_none() {
					return Err(format!(
						"--order {order} does not match the order-{} weights of the config file; pass --weights as well",
						config.order()
					)
					.into());
				}
				let mut resized = ModelConfig::new(order)?;
				resized.set_orientation(config.orientation);
				if let Some(vocab) = config.vocabulary.take() {
					resized.set_vocabulary(vocab, config.extend_vocabulary);
				}
				config = resized;
			}
		}
		if let Some(orientation) = self.orientation {
			config.set_orientation(orientation);
		}
		if let Some(weights) = &self.weights {
			config.set_weights(weights.clone())?;
		}
		if let Some(path) = &self.vocab {
			config.set_vocabulary(corpus::read_vocabulary(path)?, self.extend_vocab);
		}
		config.validate()?;
		Ok(config)
	}

	fn tokenizer(&self) -> Result<Box<dyn Tokenizer>, Box<dyn std::error::Error>> {
		if self.transcript {
			Ok(Box::new(TranscriptTokenizer::new()?))
		} else {
			Ok(Box::new(WhitespaceTokenizer))
		}
	}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let cli = Cli::parse();

	let default_filter = if cli.verbose { "debug" } else { "info" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

	let config = cli.model.config()?;
	let tokenizer = cli.model.tokenizer()?;
	let lines = corpus::read_lines(&cli.model.corpus)?;
	info!("training on {} line(s) from {}", lines.len(), cli.model.corpus.display());
	let model = InterpolationModel::train(&lines, &config, tokenizer.as_ref())?;

	match cli.command {
		Command::Stats => {
			println!("order: {}", model.order());
			println!("orientation: {:?}", model.orientation());
			println!("vocabulary: {}", model.vocabulary().len());
			for k in 1..=model.order() {
				let counts = model.counts(k)?;
				println!("{k}-grams: {} total, {} distinct", counts.total(), counts.len_ngrams());
			}
		}
		Command::Score { words } => {
			let p = model.predict(&words)?;
			println!("{p}");
		}
		Command::Continuation { word, context_order } => {
			let k = context_order.unwrap_or(model.order());
			let p = model.continuation_probability(&word, k, None)?;
			println!("{p}");
		}
		Command::Perplexity { file } => {
			let test: Vec<Vec<String>> = corpus::read_lines(&file)?
				.iter()
				.map(|line| tokenizer.tokenize(line))
				.collect();
			println!("{}", model.perplexity(&test)?);
		}
		Command::Generate { count, max_tokens, seed } => {
			let mut rng = match seed {
				Some(seed) => StdRng::seed_from_u64(seed),
				None => StdRng::from_os_rng(),
			};
			if !model.vocabulary().contains(SENTENCE_END) {
				warn!("{SENTENCE_END} is not in the vocabulary; sentences stop at {max_tokens} tokens");
			}
			for _ in 0..count {
				let mut sentence = vec![SENTENCE_START.to_owned()];
				while sentence.len() <= max_tokens {
					let next = model.sample_next(&sentence, &mut rng)?;
					if next == SENTENCE_END {
						break;
					}
					sentence.push(next);
				}
				println!("{}", sentence[1..].join(" "));
			}
		}
		Command::Matrix => {
			if model.order() < 2 {
				return Err("the matrix needs a model of order 2 or more".into());
			}
			let matrix = CountMatrix::from_bigrams(model.counts(2)?, model.vocabulary())?;
			print!("{}", matrix.to_tsv());
		}
	}

	Ok(())
}
