use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::session::{SessionConfig, TestMode};

static LANG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/lang");

/// Words generated per second of a timed test
const WORDS_PER_SECOND: usize = 4;
const MIN_TIMED_WORDS: usize = 50;
/// Zen runs until the user stops, so give it a long stream
pub const ZEN_WORDS: usize = 250;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordOptions {
    pub include_punctuation: bool,
    pub include_numbers: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub source: String,
}

#[derive(Deserialize, Clone, Debug)]
struct WordList {
    name: String,
    words: Vec<String>,
}

/// Where target text comes from
pub trait TextSupply {
    fn generate_words(&self, count: usize, options: WordOptions) -> Vec<String>;
    fn random_quote(&self) -> Quote;
}

/// Word list and quotes compiled into the binary
#[derive(Debug, Clone)]
pub struct BundledText {
    words: Vec<String>,
    quotes: Vec<Quote>,
}

impl BundledText {
    pub fn load() -> Result<Self, StoreError> {
        let list: WordList = serde_json::from_str(read_asset("english.json")?)?;
        let quotes: Vec<Quote> = serde_json::from_str(read_asset("quotes.json")?)?;
        if list.words.is_empty() {
            return Err(StoreError::MissingAsset(format!("{} has no words", list.name)));
        }
        if quotes.is_empty() {
            return Err(StoreError::MissingAsset("quotes.json has no quotes".into()));
        }
        Ok(Self {
            words: list.words,
            quotes,
        })
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }
}

impl TextSupply for BundledText {
    fn generate_words(&self, count: usize, options: WordOptions) -> Vec<String> {
        generate_words_with(&mut rand::thread_rng(), &self.words, count, options)
    }

    fn random_quote(&self) -> Quote {
        self.quotes
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default()
    }
}

fn read_asset(name: &str) -> Result<&'static str, StoreError> {
    LANG_DIR
        .get_file(name)
        .and_then(|f| f.contents_utf8())
        .ok_or_else(|| StoreError::MissingAsset(name.to_string()))
}

/// Draw `count` words from `pool`, optionally sprinkled with numbers and
/// sentence punctuation.
pub fn generate_words_with<R: Rng>(
    rng: &mut R,
    pool: &[String],
    count: usize,
    options: WordOptions,
) -> Vec<String> {
    if pool.is_empty() {
        return Vec::new();
    }
    let mut words = Vec::with_capacity(count);
    let mut sentence_start = true;
    for i in 0..count {
        let mut word = if options.include_numbers && rng.gen_bool(0.1) {
            rng.gen_range(0..10_000).to_string()
        } else {
            pool[rng.gen_range(0..pool.len())].clone()
        };

        if options.include_punctuation {
            if sentence_start {
                word = capitalize_first_letter(&word);
            }
            let last = i + 1 == count;
            sentence_start = false;
            if last || rng.gen_bool(0.1) {
                word.push(match rng.gen_range(0..100) {
                    0..=79 => '.',
                    80..=94 => '!',
                    _ => '?',
                });
                sentence_start = true;
            } else if rng.gen_bool(0.15) {
                word.push(',');
            }
        }
        words.push(word);
    }
    words
}

fn capitalize_first_letter(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn quote_to_words(quote: &Quote) -> Vec<String> {
    quote.text.split_whitespace().map(str::to_string).collect()
}

/// Build the target words for a session. Quote mode takes its word count
/// from the quote; every mode yields at least one word.
pub fn session_words<S: TextSupply + ?Sized>(
    supply: &S,
    config: &SessionConfig,
    options: WordOptions,
) -> (SessionConfig, Vec<String>) {
    let mut config = *config;
    let words = match config.mode {
        TestMode::Time => {
            let secs = config.duration_secs.unwrap_or(30) as usize;
            supply.generate_words((secs * WORDS_PER_SECOND).max(MIN_TIMED_WORDS), options)
        }
        TestMode::Words => supply.generate_words(config.word_count.max(1), options),
        TestMode::Quote => quote_to_words(&supply.random_quote()),
        TestMode::Zen => supply.generate_words(ZEN_WORDS, options),
    };
    let words = if words.is_empty() {
        log::warn!("no text available for {} mode, using a placeholder", config.mode);
        vec!["the".to_string()]
    } else {
        words
    };
    if config.mode == TestMode::Quote {
        config.word_count = words.len();
    }
    (config, words)
}
