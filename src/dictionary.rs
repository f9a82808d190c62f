//! Loading and indexing of the ranked word list the generator draws from.
//!
//! The index is built once at startup and handed to every generation call by reference. Each
//! entry carries a commonality rank (lower = more common), and generation only ever sees the
//! words of a given length whose rank falls below the configured vocabulary bound.
//!
//! Accepted input, one entry per line:
//! - `word,rank` or `word;rank` gives an explicit rank.
//! - a bare `word` is ranked by its position in the file, for frequency-ordered lists.
//!
//! Entries are trimmed and lowercased, anything containing characters other than ASCII letters
//! is skipped, and a word listed twice keeps its lowest rank.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;

/// Commonality rank of a word. Lower is more common.
pub type Rank = u32;

/// A dictionary word together with its rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedWord {
    pub string: String,
    pub rank: Rank,
}

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("failed to read word list from '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: invalid rank \"{value}\"")]
    InvalidRank { line: usize, value: String },
}

/// Read-only index over a ranked word list, bucketed by word length.
#[derive(Debug, Clone, Default)]
pub struct DictionaryIndex {
    /// Each bucket is ordered by (rank, word).
    words_by_length: HashMap<usize, Vec<RankedWord>>,
    ranks: HashMap<String, Rank>,
}

impl DictionaryIndex {
    /// Build an index from `(word, rank)` pairs.
    pub fn from_ranked_words<I, S>(words: I) -> DictionaryIndex
    where
        I: IntoIterator<Item = (S, Rank)>,
        S: AsRef<str>,
    {
        let mut ranks: HashMap<String, Rank> = HashMap::new();
        let mut skipped = 0usize;

        for (word, rank) in words {
            let word = word.as_ref().trim().to_lowercase();
            if word.is_empty() || !word.bytes().all(|b| b.is_ascii_lowercase()) {
                skipped += 1;
                continue;
            }

            ranks
                .entry(word)
                .and_modify(|existing| *existing = (*existing).min(rank))
                .or_insert(rank);
        }

        if skipped > 0 {
            debug!("Skipped {skipped} dictionary entries containing non-letter characters");
        }

        let mut words_by_length: HashMap<usize, Vec<RankedWord>> = HashMap::new();
        for (word, &rank) in &ranks {
            words_by_length
                .entry(word.len())
                .or_default()
                .push(RankedWord { string: word.clone(), rank });
        }

        for bucket in words_by_length.values_mut() {
            bucket.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.string.cmp(&b.string)));
        }

        DictionaryIndex { words_by_length, ranks }
    }

    /// Parse a word list from an in-memory string.
    ///
    /// # Errors
    ///
    /// Returns [`DictionaryError::InvalidRank`] if a line has a rank field that isn't a
    /// non-negative integer.
    pub fn parse_from_str(contents: &str) -> Result<DictionaryIndex, DictionaryError> {
        let mut entries: Vec<(&str, Rank)> = vec![];

        for (line_idx, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            let entry = match line.split_once(|c: char| c == ',' || c == ';') {
                Some((word, rank_raw)) => {
                    let rank_raw = rank_raw.trim();
                    let rank = rank_raw.parse().map_err(|_| DictionaryError::InvalidRank {
                        line: line_idx + 1,
                        value: rank_raw.to_string(),
                    })?;
                    (word, rank)
                }
                // Bare words are ranked by where they appear.
                None => (line, entries.len() as Rank),
            };

            entries.push(entry);
        }

        Ok(Self::from_ranked_words(entries))
    }

    /// Read a word list from disk and parse it.
    ///
    /// # Errors
    ///
    /// Returns [`DictionaryError::Io`] if the file can't be read, or any error from
    /// [`DictionaryIndex::parse_from_str`].
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<DictionaryIndex, DictionaryError> {
        let path_ref = path.as_ref();
        let data = std::fs::read_to_string(path_ref).map_err(|source| DictionaryError::Io {
            path: path_ref.to_path_buf(),
            source,
        })?;

        Self::parse_from_str(&data)
    }

    /// All words of the given length, most common first, or `None` if the dictionary has no
    /// words of that length at all.
    pub fn words_of_length(&self, length: usize) -> Option<&[RankedWord]> {
        self.words_by_length.get(&length).map(Vec::as_slice)
    }

    /// The rank of `word`, if it is in the dictionary.
    pub fn lookup(&self, word: &str) -> Option<Rank> {
        self.ranks.get(word).copied()
    }

    /// Words of the given length ranked strictly below `vocabulary_bound`, most common first.
    /// `None` means the length is missing from the dictionary entirely; an empty list means the
    /// bound excluded everything.
    pub fn eligible_words(&self, length: usize, vocabulary_bound: Rank) -> Option<Vec<&str>> {
        self.words_of_length(length).map(|words| {
            words
                .iter()
                .take_while(|word| word.rank < vocabulary_bound)
                .map(|word| word.string.as_str())
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}
