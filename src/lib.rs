pub mod batch;
pub mod daily;
pub mod dictionary;
pub mod logging;

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::{Debug, Display, Formatter};

use bit_set::BitSet;
use instant::{Duration, Instant};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smallvec::{smallvec, SmallVec};

pub use dictionary::{DictionaryError, DictionaryIndex, Rank, RankedWord};

/// The expected maximum number of rows (or columns) in a grid.
pub const MAX_GRID_DIMENSION: usize = 8;

/// How many placements a single attempt may make before we give up on it.
pub const DEFAULT_STEP_BUDGET: u64 = 200_000_000;

/// Marker for cells below the search frontier.
const EMPTY_CELL: u8 = b'.';

/// An identifier for a row word, based on its index in the Generator's `row_words` field.
pub type WordId = usize;

/// The fixed parameters of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub cols: usize,
    pub rows: usize,
    /// Only words ranked strictly below this are eligible.
    pub vocabulary_bound: Rank,
    pub step_budget: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            cols: 5,
            rows: 5,
            vocabulary_bound: 3000,
            step_budget: DEFAULT_STEP_BUDGET,
        }
    }
}

impl GeneratorConfig {
    pub fn new(cols: usize, rows: usize, vocabulary_bound: Rank) -> Self {
        Self { cols, rows, vocabulary_bound, ..Self::default() }
    }

    pub fn with_step_budget(mut self, step_budget: u64) -> Self {
        self.step_budget = step_budget;
        self
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }
}

/// A finished grid serialized row-major into a flat string of lowercase letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PuzzleString(String);

impl PuzzleString {
    /// Wrap an existing serialization, if it consists only of lowercase ASCII letters.
    pub fn new(letters: impl Into<String>) -> Option<PuzzleString> {
        let letters = letters.into();
        if letters.bytes().all(|b| b.is_ascii_lowercase()) {
            Some(PuzzleString(letters))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reshape into rows of `cols` letters.
    pub fn rows(&self, cols: usize) -> Vec<&str> {
        if cols == 0 {
            return vec![];
        }

        (0..self.0.len())
            .step_by(cols)
            .map(|start| &self.0[start..(start + cols).min(self.0.len())])
            .collect()
    }

    /// The columns of the grid, each read top to bottom.
    pub fn columns(&self, cols: usize) -> Vec<String> {
        if cols == 0 {
            return vec![];
        }

        (0..cols)
            .map(|col| self.0.bytes().skip(col).step_by(cols).map(char::from).collect())
            .collect()
    }

    /// The serialization of the grid with rows and columns swapped.
    pub fn transposed(&self, cols: usize) -> PuzzleString {
        PuzzleString(self.columns(cols).concat())
    }

    /// One line per row, for display.
    pub fn render(&self, cols: usize) -> String {
        self.rows(cols).join("\n")
    }
}

impl Display for PuzzleString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<PuzzleString> for String {
    fn from(puzzle: PuzzleString) -> String {
        puzzle.0
    }
}

/// A lexicographically sorted list of the words that can fill a column, used to check whether a
/// partially filled column could still be completed.
#[derive(Debug, Clone)]
pub struct ColumnPrefixValidator<'a> {
    words: Vec<&'a str>,
}

impl<'a> ColumnPrefixValidator<'a> {
    pub fn new<I: IntoIterator<Item = &'a str>>(words: I) -> ColumnPrefixValidator<'a> {
        let mut words: Vec<&str> = words.into_iter().collect();
        words.sort_unstable();
        words.dedup();

        ColumnPrefixValidator { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Is there any word starting with `prefix`? Binary search comparing only the first
    /// `prefix.len()` letters of each probed word.
    pub fn has_prefix(&self, prefix: &[u8]) -> bool {
        let mut min = 0;
        let mut max = self.words.len();

        while min < max {
            let probe = (min + max) / 2;
            let word = self.words[probe].as_bytes();
            let word_prefix = &word[..prefix.len().min(word.len())];

            match prefix.cmp(word_prefix) {
                Ordering::Equal => return true,
                Ordering::Less => max = probe,
                Ordering::Greater => {
                    // The probe collapsed onto the lower bound without a match.
                    if probe == min {
                        return false;
                    }
                    min = probe;
                }
            }
        }

        false
    }

    /// Is `word` itself one of the column words?
    pub fn contains(&self, word: &[u8]) -> bool {
        self.words.binary_search_by(|probe| probe.as_bytes().cmp(word)).is_ok()
    }
}

/// A ceiling on the number of placements one attempt may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBudget {
    limit: u64,
    steps: u64,
}

impl StepBudget {
    pub fn new(limit: u64) -> StepBudget {
        StepBudget { limit, steps: 0 }
    }

    /// Count one step. Returns false once the ceiling has been exceeded.
    pub fn tick(&mut self) -> bool {
        self.steps += 1;
        self.steps <= self.limit
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// A struct tracking statistics about a single attempt.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Number of row placements, which is what the step budget counts.
    pub states: u64,
    pub backtracks: u64,
    pub solutions: u64,
    pub duration: Duration,
}

/// A struct representing the result of a successful single-result attempt.
#[derive(Debug)]
pub struct GridSuccess {
    pub statistics: Statistics,
    pub puzzle: PuzzleString,
}

/// Why an attempt produced no grid. Both are routine outcomes of searching a sparse space; they
/// are only told apart for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridFailure {
    NoSolutionFound,
    BudgetExceeded { steps: u64 },
}

/// How a collect-all attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectStatus {
    /// Every candidate for the first row was tried.
    Exhausted,
    /// The requested number of grids was reached.
    FoundEnough,
    BudgetExceeded { steps: u64 },
}

#[derive(Debug)]
pub struct CollectAllResult {
    /// Grids in the order they were found.
    pub puzzles: Vec<PuzzleString>,
    pub status: CollectStatus,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("dictionary has no words of length {length}")]
    DictionaryUnavailable { length: usize },

    #[error("invalid grid dimensions {cols}x{rows}")]
    InvalidDimensions { cols: usize, rows: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchMode {
    /// Stop at the first complete grid.
    First,
    /// Record every complete grid and keep backtracking.
    All { limit: Option<usize> },
}

/// Reasons to unwind the whole search without trying further candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    BudgetExceeded,
    FoundEnough,
}

/// The live state of one attempt. Rows are pushed onto the grid as they're placed and popped
/// again when we backtrack.
struct SearchState {
    rows: usize,
    cols: usize,

    /// Row-major letters; rows below the frontier hold `EMPTY_CELL`.
    grid: Vec<u8>,

    /// Column-major mirror of `grid`, so that a column prefix is a contiguous slice.
    columns: Vec<u8>,

    /// The word placed in each row so far.
    placed: SmallVec<[WordId; MAX_GRID_DIMENSION]>,

    /// Row words already in the grid.
    used: BitSet,

    budget: StepBudget,
    backtracks: u64,
    mode: SearchMode,
    solutions: Vec<PuzzleString>,
}

impl SearchState {
    fn new(config: &GeneratorConfig, word_count: usize, mode: SearchMode) -> SearchState {
        let cell_count = config.rows * config.cols;

        SearchState {
            rows: config.rows,
            cols: config.cols,
            grid: vec![EMPTY_CELL; cell_count],
            columns: vec![EMPTY_CELL; cell_count],
            placed: smallvec![],
            used: BitSet::with_capacity(word_count),
            budget: StepBudget::new(config.step_budget),
            backtracks: 0,
            mode,
            solutions: vec![],
        }
    }

    fn place(&mut self, row: usize, word_id: WordId, word: &[u8]) {
        self.grid[row * self.cols..(row + 1) * self.cols].copy_from_slice(word);
        for (col, &letter) in word.iter().enumerate() {
            self.columns[col * self.rows + row] = letter;
        }

        self.placed.push(word_id);
        self.used.insert(word_id);
    }

    fn clear(&mut self, row: usize) {
        if let Some(word_id) = self.placed.pop() {
            self.used.remove(word_id);
        }

        self.grid[row * self.cols..(row + 1) * self.cols].fill(EMPTY_CELL);
        for col in 0..self.cols {
            self.columns[col * self.rows + row] = EMPTY_CELL;
        }
    }

    fn column(&self, col: usize) -> &[u8] {
        self.column_prefix(col, self.rows)
    }

    /// The first `len` letters of the given column.
    fn column_prefix(&self, col: usize, len: usize) -> &[u8] {
        let start = col * self.rows;
        &self.columns[start..start + len]
    }

    fn puzzle(&self) -> PuzzleString {
        PuzzleString(self.grid.iter().map(|&letter| char::from(letter)).collect())
    }
}

/// Everything about a grid shape that stays fixed across attempts: the eligible row words (in
/// rank order, to be shuffled per attempt) and the sorted column words.
pub struct Generator<'a> {
    dictionary: &'a DictionaryIndex,
    config: GeneratorConfig,
    row_words: Vec<&'a str>,
    columns: ColumnPrefixValidator<'a>,
}

impl Debug for Generator<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("config", &self.config)
            .field("row_words", &format!("({} entries)", self.row_words.len()))
            .field("column_words", &format!("({} entries)", self.columns.len()))
            .finish()
    }
}

impl<'a> Generator<'a> {
    /// Prepare the dictionary slices for the configured grid shape.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::InvalidDimensions`] for an empty grid shape, and
    /// [`GenerateError::DictionaryUnavailable`] if the dictionary has no words at all of the row
    /// or column length.
    pub fn new(dictionary: &'a DictionaryIndex, config: GeneratorConfig) -> Result<Generator<'a>, GenerateError> {
        if config.rows == 0 || config.cols == 0 {
            return Err(GenerateError::InvalidDimensions { cols: config.cols, rows: config.rows });
        }

        let row_words = dictionary
            .eligible_words(config.cols, config.vocabulary_bound)
            .ok_or(GenerateError::DictionaryUnavailable { length: config.cols })?;
        let column_words = dictionary
            .eligible_words(config.rows, config.vocabulary_bound)
            .ok_or(GenerateError::DictionaryUnavailable { length: config.rows })?;

        debug!(
            "Prepared {} row words and {} column words below rank {}",
            row_words.len(),
            column_words.len(),
            config.vocabulary_bound
        );

        Ok(Generator {
            dictionary,
            config,
            row_words,
            columns: ColumnPrefixValidator::new(column_words),
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn row_word_count(&self) -> usize {
        self.row_words.len()
    }

    pub fn column_word_count(&self) -> usize {
        self.columns.len()
    }

    /// Search for a single grid, trying row candidates in an order determined by `seed`.
    pub fn find_grid(&self, seed: u64) -> Result<GridSuccess, GridFailure> {
        let (state, outcome, statistics) = self.search(seed, SearchMode::First);

        match outcome {
            Ok(true) => {
                let puzzle = state.puzzle();
                debug_assert!(self.verify(&puzzle), "generated an invalid grid: {puzzle}");
                debug!("Seed {seed}: found {puzzle} in {} steps", statistics.states);

                Ok(GridSuccess { statistics, puzzle })
            }
            Ok(false) => {
                debug!("Seed {seed}: no solution after {} steps", statistics.states);
                Err(GridFailure::NoSolutionFound)
            }
            Err(Halt::BudgetExceeded) => {
                warn!("Seed {seed}: exceeded the step budget of {}", self.config.step_budget);
                Err(GridFailure::BudgetExceeded { steps: statistics.states })
            }
            Err(Halt::FoundEnough) => unreachable!("single-result search doesn't collect grids"),
        }
    }

    /// Search for every grid reachable from `seed`'s candidate order, stopping early once
    /// `limit` grids have been found (if given) or the step budget runs out.
    pub fn find_all_grids(&self, seed: u64, limit: Option<usize>) -> CollectAllResult {
        if limit == Some(0) {
            return CollectAllResult {
                puzzles: vec![],
                status: CollectStatus::FoundEnough,
                statistics: Statistics::default(),
            };
        }

        let (state, outcome, statistics) = self.search(seed, SearchMode::All { limit });

        let status = match outcome {
            Ok(_) => CollectStatus::Exhausted,
            Err(Halt::FoundEnough) => CollectStatus::FoundEnough,
            Err(Halt::BudgetExceeded) => {
                warn!("Seed {seed}: exceeded the step budget of {}", self.config.step_budget);
                CollectStatus::BudgetExceeded { steps: statistics.states }
            }
        };

        debug_assert!(state.solutions.iter().all(|puzzle| self.verify(puzzle)));
        debug!(
            "Seed {seed}: collected {} grids in {} steps ({status:?})",
            state.solutions.len(),
            statistics.states
        );

        CollectAllResult { puzzles: state.solutions, status, statistics }
    }

    /// Does `puzzle` have this generator's shape, with every row and column a distinct
    /// dictionary word below the vocabulary bound?
    pub fn verify(&self, puzzle: &PuzzleString) -> bool {
        let GeneratorConfig { rows, cols, vocabulary_bound, .. } = self.config;
        if puzzle.len() != rows * cols {
            return false;
        }

        let row_words = puzzle.rows(cols);
        let column_words = puzzle.columns(cols);
        let mut seen: HashSet<&str> = HashSet::new();

        row_words
            .iter()
            .copied()
            .chain(column_words.iter().map(String::as_str))
            .all(|word| {
                self.dictionary.lookup(word).map_or(false, |rank| rank < vocabulary_bound)
                    && seen.insert(word)
            })
    }

    /// One independently shuffled candidate order per row. Drawn up front, in row order, so the
    /// same seed always explores the same tree.
    fn row_candidates(&self, seed: u64) -> SmallVec<[Vec<WordId>; MAX_GRID_DIMENSION]> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        (0..self.config.rows)
            .map(|_| {
                let mut word_ids: Vec<WordId> = (0..self.row_words.len()).collect();
                word_ids.shuffle(&mut rng);
                word_ids
            })
            .collect()
    }

    fn search(&self, seed: u64, mode: SearchMode) -> (SearchState, Result<bool, Halt>, Statistics) {
        let start = Instant::now();

        let candidates = self.row_candidates(seed);
        let mut state = SearchState::new(&self.config, self.row_words.len(), mode);
        let outcome = self.place_row(&candidates, &mut state, 0);

        let solutions = match (mode, outcome) {
            (SearchMode::First, Ok(true)) => 1,
            _ => state.solutions.len() as u64,
        };
        let statistics = Statistics {
            states: state.budget.steps(),
            backtracks: state.backtracks,
            solutions,
            duration: start.elapsed(),
        };

        (state, outcome, statistics)
    }

    /// Try each candidate for `row` in turn, recursing into the next row whenever every column
    /// can still be completed. Returns `Ok(true)` with the grid left filled in if a solution was
    /// found in single-result mode, `Ok(false)` once the row's candidates are exhausted.
    fn place_row(
        &self,
        candidates: &[Vec<WordId>],
        state: &mut SearchState,
        row: usize,
    ) -> Result<bool, Halt> {
        for &word_id in &candidates[row] {
            if state.used.contains(word_id) {
                continue;
            }

            state.place(row, word_id, self.row_words[word_id].as_bytes());
            if !state.budget.tick() {
                return Err(Halt::BudgetExceeded);
            }

            if row + 1 == state.rows {
                if self.columns_complete(state) {
                    match state.mode {
                        SearchMode::First => return Ok(true),
                        SearchMode::All { limit } => {
                            let puzzle = state.puzzle();
                            state.solutions.push(puzzle);

                            if limit.map_or(false, |limit| state.solutions.len() >= limit) {
                                return Err(Halt::FoundEnough);
                            }
                        }
                    }
                }
            } else if self.columns_viable(state, row + 1) && self.place_row(candidates, state, row + 1)? {
                return Ok(true);
            }

            state.backtracks += 1;
            state.clear(row);
        }

        Ok(false)
    }

    /// Can every column's first `filled_rows` letters still be extended into a column word?
    fn columns_viable(&self, state: &SearchState, filled_rows: usize) -> bool {
        (0..state.cols).all(|col| self.columns.has_prefix(state.column_prefix(col, filled_rows)))
    }

    /// With every row placed: is each column a column word, distinct from the other columns and
    /// from every row word?
    fn columns_complete(&self, state: &SearchState) -> bool {
        let mut seen: SmallVec<[&[u8]; MAX_GRID_DIMENSION]> = smallvec![];

        for col in 0..state.cols {
            let column = state.column(col);

            if !self.columns.contains(column) || seen.contains(&column) {
                return false;
            }
            if state.placed.iter().any(|&word_id| self.row_words[word_id].as_bytes() == column) {
                return false;
            }

            seen.push(column);
        }

        true
    }
}

/// Generate a single grid for the given shape and seed. `None` covers both an exhausted search
/// and an exceeded step budget.
///
/// # Errors
///
/// Fails only if the dictionary can't supply words for the requested shape; see
/// [`Generator::new`].
pub fn generate(
    dictionary: &DictionaryIndex,
    seed: u64,
    cols: usize,
    rows: usize,
    vocabulary_bound: Rank,
) -> Result<Option<PuzzleString>, GenerateError> {
    let generator = Generator::new(dictionary, GeneratorConfig::new(cols, rows, vocabulary_bound))?;

    Ok(generator.find_grid(seed).ok().map(|success| success.puzzle))
}

/// What registering a grid with a [`DuplicateRegistry`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Accepted,
    Duplicate,
    /// The grid is the transpose of one already produced (square grids only).
    InverseDuplicate,
}

/// The set of grids already produced during one run.
#[derive(Debug, Clone)]
pub struct DuplicateRegistry {
    rows: usize,
    cols: usize,
    seen: HashSet<PuzzleString>,
}

impl DuplicateRegistry {
    pub fn new(rows: usize, cols: usize) -> DuplicateRegistry {
        DuplicateRegistry { rows, cols, seen: HashSet::new() }
    }

    pub fn for_config(config: &GeneratorConfig) -> DuplicateRegistry {
        Self::new(config.rows, config.cols)
    }

    /// Record `puzzle` unless it (or, for a square grid, its transpose) was seen before.
    pub fn register(&mut self, puzzle: &PuzzleString) -> Registration {
        if self.seen.contains(puzzle) {
            return Registration::Duplicate;
        }

        if self.rows == self.cols && self.seen.contains(&puzzle.transposed(self.cols)) {
            return Registration::InverseDuplicate;
        }

        self.seen.insert(puzzle.clone());
        Registration::Accepted
    }

    pub fn contains(&self, puzzle: &PuzzleString) -> bool {
        self.seen.contains(puzzle)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// How many grids to take from each seed in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    FirstPerSeed,
    AllPerSeed { limit: Option<usize> },
}

/// The accumulated results of trying a sequence of seeds.
#[derive(Debug, Clone, Default)]
pub struct GenerationRun {
    /// Accepted grids, in the order they were produced.
    pub puzzles: Vec<PuzzleString>,
    pub attempts: usize,
    pub duplicates: usize,
    pub inverse_duplicates: usize,
    pub no_solution: usize,
    pub budget_exceeded: usize,
}

impl GenerationRun {
    /// Register `puzzle`, keeping it only if the registry accepts it.
    pub fn record(&mut self, registry: &mut DuplicateRegistry, puzzle: PuzzleString) -> Registration {
        let registration = registry.register(&puzzle);

        match registration {
            Registration::Accepted => self.puzzles.push(puzzle),
            Registration::Duplicate => self.duplicates += 1,
            Registration::InverseDuplicate => self.inverse_duplicates += 1,
        }

        registration
    }

    /// Try each seed in order, registering every grid found. `on_accept` sees each accepted grid
    /// as soon as it's registered; an error from it ends the run.
    pub fn fold_seeds<I, F, E>(
        generator: &Generator,
        seeds: I,
        mode: RunMode,
        registry: &mut DuplicateRegistry,
        mut on_accept: F,
    ) -> Result<GenerationRun, E>
    where
        I: IntoIterator<Item = u64>,
        F: FnMut(&PuzzleString) -> Result<(), E>,
    {
        let start = Instant::now();

        let run = seeds.into_iter().try_fold(GenerationRun::default(), |mut run, seed| -> Result<GenerationRun, E> {
            run.attempts += 1;

            let found = match mode {
                RunMode::FirstPerSeed => match generator.find_grid(seed) {
                    Ok(success) => vec![success.puzzle],
                    Err(GridFailure::NoSolutionFound) => {
                        run.no_solution += 1;
                        vec![]
                    }
                    Err(GridFailure::BudgetExceeded { .. }) => {
                        run.budget_exceeded += 1;
                        vec![]
                    }
                },
                RunMode::AllPerSeed { limit } => {
                    let result = generator.find_all_grids(seed, limit);
                    match result.status {
                        CollectStatus::BudgetExceeded { .. } => run.budget_exceeded += 1,
                        _ if result.puzzles.is_empty() => run.no_solution += 1,
                        _ => {}
                    }
                    result.puzzles
                }
            };

            for puzzle in found {
                if run.record(registry, puzzle) == Registration::Accepted {
                    if let Some(accepted) = run.puzzles.last() {
                        on_accept(accepted)?;
                    }
                }
            }

            Ok(run)
        })?;

        info!(
            "Tried {} seeds in {:?}: {} accepted, {} duplicates, {} inverse duplicates, {} without a solution, {} over budget",
            run.attempts,
            start.elapsed(),
            run.puzzles.len(),
            run.duplicates,
            run.inverse_duplicates,
            run.no_solution,
            run.budget_exceeded
        );

        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::convert::Infallible;

    use crate::*;

    /// Two rows of three letters; the only grid is
    ///
    /// tab
    /// one
    const TAB_ONE: &str = "tab one to an be";

    /// A 3x3 double word square and its transpose, and nothing else.
    ///
    /// bat   bow
    /// ore   are
    /// wed   ted
    const BAT_SQUARE: &str = "bat ore wed bow are ted";

    /// One 5x5 double word square among decoys; it and its transpose are the only grids.
    ///
    /// about   atlas
    /// truth   brain
    /// latte   outdo
    /// aides   utter
    /// snore   these
    const ABOUT_SQUARE: &str = "
        about truth latte aides snore atlas brain outdo utter these
        above abuse actor alarm alert bread break brief table taste
        touch tower trade train trend lemon lever adopt audio saint
        shore score store sense tease theme there outer uncle under
    ";

    const COMMON_THREES: &str = "
        ace act add ado age ago aid aim air ale all and ant ape apt
        arc are ark arm art ash ask ate awe axe bad bag ban bar bat
        bed bee beg bet bid big bin bit boa bog boo bow box bra bud
        bug bus but buy cab can cap car cat cod cog con cot cow cry
        cub cue cup cut dab dad dam den dew did die dig dim din dip
        doe dog don dot dry dub due dug dye ear eat ebb eel egg ego
        elf elk elm emu end era ere err eve ewe eye fan far fat fed
        fee few fig fin fir fit fix flu fly foe fog for fox fry fun
    ";

    /// Every 3x3 grid that can be built from `COMMON_THREES`.
    const COMMON_THREES_GRIDS: [&str; 12] = [
        "acedrydye", "addcryeye", "badegoden", "bedagedon", "dabagedoe", "dabagedog",
        "dabagedot", "dabagodew", "dadagebow", "dadagobee", "dadagobeg", "dadagobet",
    ];

    /// Rank each word by its position in the list.
    fn ranked(words: &str) -> DictionaryIndex {
        DictionaryIndex::from_ranked_words(
            words.split_whitespace().enumerate().map(|(rank, word)| (word, rank as Rank)),
        )
    }

    fn puzzle(letters: &str) -> PuzzleString {
        PuzzleString::new(letters).unwrap()
    }

    fn assert_dense_grid(dictionary: &DictionaryIndex, config: &GeneratorConfig, puzzle: &PuzzleString) {
        assert_eq!(puzzle.len(), config.rows * config.cols);

        let rows: Vec<String> = puzzle.rows(config.cols).into_iter().map(String::from).collect();
        let columns = puzzle.columns(config.cols);

        for word in rows.iter().chain(&columns) {
            let rank = dictionary.lookup(word).unwrap_or_else(|| panic!("{word} isn't a word"));
            assert!(rank < config.vocabulary_bound, "{word} is ranked {rank}");
        }

        let distinct: HashSet<&String> = rows.iter().chain(&columns).collect();
        assert_eq!(distinct.len(), rows.len() + columns.len(), "repeated word in {puzzle}");
    }

    #[test]
    fn test_has_prefix() {
        let validator = ColumnPrefixValidator::new(["cat", "dog", "cab", "ant", "dot"]);

        assert!(validator.has_prefix(b""));
        assert!(validator.has_prefix(b"c"));
        assert!(validator.has_prefix(b"ca"));
        assert!(validator.has_prefix(b"cab"));
        assert!(validator.has_prefix(b"do"));
        assert!(validator.has_prefix(b"a"));
        assert!(!validator.has_prefix(b"b"));
        assert!(!validator.has_prefix(b"cau"));
        assert!(!validator.has_prefix(b"z"));
        assert!(!validator.has_prefix(b"aa"));
    }

    #[test]
    fn test_has_prefix_on_empty_list() {
        let validator = ColumnPrefixValidator::new(Vec::<&str>::new());

        assert!(!validator.has_prefix(b""));
        assert!(!validator.has_prefix(b"a"));
        assert!(!validator.contains(b"a"));
    }

    #[test]
    fn test_has_prefix_agrees_with_linear_scan() {
        let words: Vec<&str> = COMMON_THREES.split_whitespace().collect();
        let validator = ColumnPrefixValidator::new(words.iter().copied());

        let letters: Vec<u8> = (b'a'..=b'z').collect();
        let mut prefixes: Vec<Vec<u8>> = letters.iter().map(|&a| vec![a]).collect();
        for &a in &letters {
            for &b in &letters {
                prefixes.push(vec![a, b]);
                for &c in &letters {
                    prefixes.push(vec![a, b, c]);
                }
            }
        }

        for prefix in prefixes {
            let expected = words.iter().any(|word| word.as_bytes().starts_with(&prefix));
            assert_eq!(
                validator.has_prefix(&prefix),
                expected,
                "prefix {:?}",
                String::from_utf8_lossy(&prefix)
            );
        }
    }

    #[test]
    fn test_contains() {
        let validator = ColumnPrefixValidator::new(["cat", "dog", "cab"]);

        assert!(validator.contains(b"cab"));
        assert!(validator.contains(b"dog"));
        assert!(!validator.contains(b"ca"));
        assert!(!validator.contains(b"cow"));
    }

    #[test]
    fn test_step_budget() {
        let mut budget = StepBudget::new(2);

        assert!(budget.tick());
        assert!(budget.tick());
        assert!(!budget.tick());
        assert_eq!(budget.steps(), 3);
        assert_eq!(budget.limit(), 2);
    }

    #[test]
    fn test_config_defaults() {
        let config = GeneratorConfig::default();

        assert_eq!((config.cols, config.rows, config.vocabulary_bound), (5, 5, 3000));
        assert_eq!(config.step_budget, DEFAULT_STEP_BUDGET);
        assert!(config.is_square());

        let config = GeneratorConfig::new(4, 3, 500).with_step_budget(10);
        assert_eq!(config.step_budget, 10);
        assert!(!config.is_square());
    }

    #[test]
    fn test_puzzle_string_reshaping() {
        let grid = puzzle("tabone");

        assert_eq!(grid.rows(3), vec!["tab", "one"]);
        assert_eq!(grid.columns(3), vec!["to", "an", "be"]);
        assert_eq!(grid.transposed(3).as_str(), "toanbe");
        assert_eq!(grid.render(3), "tab\none");
        assert!(PuzzleString::new("Tab").is_none());
        assert!(PuzzleString::new("ta b").is_none());
    }

    #[test]
    fn test_pinned_grid() {
        let dictionary = ranked(TAB_ONE);

        let result = generate(&dictionary, 7, 3, 2, 100).unwrap();

        assert_eq!(result, Some(puzzle("tabone")));
    }

    #[test]
    fn test_seed_selects_grid() {
        let dictionary = ranked(COMMON_THREES);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(3, 3, 1000)).unwrap();

        let result = generator.find_grid(42).unwrap();
        assert_eq!(result.puzzle.as_str(), "badegoden");
        assert_eq!(result.statistics.states, 2176);

        for (seed, expected) in [(0, "addcryeye"), (1, "dabagodew"), (7, "bedagedon")] {
            assert_eq!(generator.find_grid(seed).unwrap().puzzle.as_str(), expected, "seed {seed}");
        }
    }

    #[test]
    fn test_five_by_five_grid() {
        let dictionary = ranked(ABOUT_SQUARE);
        let config = GeneratorConfig::new(5, 5, 100);
        let generator = Generator::new(&dictionary, config).unwrap();

        let result = generator.find_grid(1).unwrap();
        assert_eq!(result.puzzle.as_str(), "abouttruthlatteaidessnore");
        assert_eq!(result.statistics.states, 119);
        assert_dense_grid(&dictionary, &config, &result.puzzle);

        let result = generator.find_grid(0).unwrap();
        assert_eq!(result.puzzle.as_str(), "atlasbrainoutdoutterthese");
        assert_eq!(result.statistics.states, 65);

        assert_eq!(generate(&dictionary, 7, 5, 5, 100).unwrap(), Some(puzzle("abouttruthlatteaidessnore")));
    }

    #[test]
    fn test_five_by_five_needs_every_word() {
        // "these" is ranked 9.
        let dictionary = ranked(ABOUT_SQUARE);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(5, 5, 9)).unwrap();

        assert_eq!(generator.find_grid(4).unwrap_err(), GridFailure::NoSolutionFound);

        let result = generator.find_all_grids(4, None);
        assert_eq!(result.status, CollectStatus::Exhausted);
        assert_eq!(result.statistics.states, 43);
        assert!(result.puzzles.is_empty());
    }

    #[test]
    fn test_grids_are_dense() {
        let dictionary = ranked(COMMON_THREES);
        let config = GeneratorConfig::new(3, 3, 1000);
        let generator = Generator::new(&dictionary, config).unwrap();

        for seed in 0..40 {
            let result = generator.find_grid(seed).expect("a 3x3 grid exists");

            assert_dense_grid(&dictionary, &config, &result.puzzle);
            assert!(COMMON_THREES_GRIDS.contains(&result.puzzle.as_str()));
            assert!(generator.verify(&result.puzzle));
            assert_eq!(result.statistics.solutions, 1);
        }
    }

    #[test]
    fn test_same_seed_same_grid() {
        let dictionary = ranked(COMMON_THREES);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(3, 3, 1000)).unwrap();

        for seed in [0, 1, 42, 1u64 << 40] {
            let first = generator.find_grid(seed).map(|success| success.puzzle);
            let second = generator.find_grid(seed).map(|success| success.puzzle);
            assert_eq!(first, second);

            let fresh = generate(&dictionary, seed, 3, 3, 1000).unwrap();
            assert_eq!(first.ok(), fresh);
        }
    }

    #[test]
    fn test_bound_excludes_words() {
        // "be" is ranked 4, so a bound of 4 leaves the third column without a word.
        let dictionary = ranked(TAB_ONE);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(3, 2, 4)).unwrap();

        assert_eq!(generator.find_grid(1).unwrap_err(), GridFailure::NoSolutionFound);
    }

    #[test]
    fn test_exhausted_search_finds_nothing() {
        // None of the 12 grids survive if we only allow the 60 most common words.
        let dictionary = ranked(COMMON_THREES);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(3, 3, 60)).unwrap();

        for seed in 0..5 {
            assert_eq!(generator.find_grid(seed).unwrap_err(), GridFailure::NoSolutionFound);
        }
    }

    #[test]
    fn test_zero_bound_fails_immediately() {
        let dictionary = ranked(COMMON_THREES);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(3, 3, 0)).unwrap();

        assert_eq!(generator.row_word_count(), 0);
        assert_eq!(generator.find_grid(3).unwrap_err(), GridFailure::NoSolutionFound);

        let result = generator.find_all_grids(3, None);
        assert_eq!(result.status, CollectStatus::Exhausted);
        assert_eq!(result.statistics.states, 0);
        assert!(result.puzzles.is_empty());
    }

    #[test]
    fn test_budget_exceeded() {
        let dictionary = ranked(COMMON_THREES);
        let config = GeneratorConfig::new(3, 3, 1000).with_step_budget(0);
        let generator = Generator::new(&dictionary, config).unwrap();

        assert_eq!(generator.find_grid(9).unwrap_err(), GridFailure::BudgetExceeded { steps: 1 });
        assert!(generate(&dictionary, 9, 3, 3, 1000).unwrap().is_some());

        let result = generator.find_all_grids(9, None);
        assert_eq!(result.status, CollectStatus::BudgetExceeded { steps: 1 });
    }

    #[test]
    fn test_small_budget_stops_deep_search() {
        let dictionary = ranked(COMMON_THREES);
        let config = GeneratorConfig::new(3, 3, 60).with_step_budget(50);
        let generator = Generator::new(&dictionary, config).unwrap();

        // With no grid to find, the search would run far longer than 50 steps.
        assert_eq!(generator.find_grid(0).unwrap_err(), GridFailure::BudgetExceeded { steps: 51 });
    }

    #[test]
    fn test_missing_length_is_fatal() {
        let dictionary = ranked(TAB_ONE);

        assert_eq!(
            Generator::new(&dictionary, GeneratorConfig::new(4, 2, 100)).unwrap_err(),
            GenerateError::DictionaryUnavailable { length: 4 }
        );
        assert_eq!(
            generate(&dictionary, 0, 3, 5, 100).unwrap_err(),
            GenerateError::DictionaryUnavailable { length: 5 }
        );
        assert_eq!(
            Generator::new(&dictionary, GeneratorConfig::new(0, 2, 100)).unwrap_err(),
            GenerateError::InvalidDimensions { cols: 0, rows: 2 }
        );
    }

    #[test]
    fn test_collect_all_finds_every_grid() {
        let dictionary = ranked(COMMON_THREES);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(3, 3, 1000)).unwrap();

        for seed in [5, 6] {
            let result = generator.find_all_grids(seed, None);

            assert_eq!(result.status, CollectStatus::Exhausted);
            assert_eq!(result.statistics.solutions, 12);

            let found: BTreeSet<&str> = result.puzzles.iter().map(PuzzleString::as_str).collect();
            let expected: BTreeSet<&str> = COMMON_THREES_GRIDS.iter().copied().collect();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_collect_all_respects_limit() {
        let dictionary = ranked(COMMON_THREES);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(3, 3, 1000)).unwrap();

        let result = generator.find_all_grids(11, Some(3));
        assert_eq!(result.status, CollectStatus::FoundEnough);
        assert_eq!(result.puzzles.len(), 3);

        let result = generator.find_all_grids(11, Some(0));
        assert_eq!(result.status, CollectStatus::FoundEnough);
        assert!(result.puzzles.is_empty());
    }

    #[test]
    fn test_square_grid_and_transpose() {
        let dictionary = ranked(BAT_SQUARE);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(3, 3, 100)).unwrap();

        let result = generator.find_all_grids(0, None);
        let found: BTreeSet<&str> = result.puzzles.iter().map(PuzzleString::as_str).collect();

        assert_eq!(found, BTreeSet::from(["batorewed", "bowareted"]));
    }

    #[test]
    fn test_registry() {
        let mut registry = DuplicateRegistry::new(3, 3);

        assert_eq!(registry.register(&puzzle("batorewed")), Registration::Accepted);
        assert_eq!(registry.register(&puzzle("batorewed")), Registration::Duplicate);
        assert_eq!(registry.register(&puzzle("bowareted")), Registration::InverseDuplicate);
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(&puzzle("bowareted")));
    }

    #[test]
    fn test_registry_ignores_transpose_for_rectangles() {
        let mut registry = DuplicateRegistry::new(2, 3);

        assert_eq!(registry.register(&puzzle("tabone")), Registration::Accepted);
        assert_eq!(registry.register(&puzzle("toanbe")), Registration::Accepted);
    }

    #[test]
    fn test_second_seed_is_duplicate() {
        let dictionary = ranked(TAB_ONE);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(3, 2, 100)).unwrap();
        let mut registry = DuplicateRegistry::for_config(generator.config());

        let first = generator.find_grid(1).unwrap().puzzle;
        let second = generator.find_grid(2).unwrap().puzzle;

        assert_eq!(registry.register(&first), Registration::Accepted);
        assert_eq!(registry.register(&second), Registration::Duplicate);
    }

    #[test]
    fn test_fold_seeds_counts_outcomes() {
        let dictionary = ranked(BAT_SQUARE);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(3, 3, 100)).unwrap();
        let mut registry = DuplicateRegistry::for_config(generator.config());
        let mut accepted = vec![];

        let run = GenerationRun::fold_seeds(
            &generator,
            0..6,
            RunMode::FirstPerSeed,
            &mut registry,
            |puzzle| -> Result<(), Infallible> {
                accepted.push(puzzle.clone());
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(run.attempts, 6);
        assert_eq!(run.puzzles.len(), 1);
        assert_eq!(run.duplicates + run.inverse_duplicates, 5);
        assert_eq!(run.no_solution, 0);
        assert_eq!(accepted, run.puzzles);
    }

    #[test]
    fn test_fold_seeds_collect_all_rejects_transpose() {
        let dictionary = ranked(BAT_SQUARE);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(3, 3, 100)).unwrap();
        let mut registry = DuplicateRegistry::for_config(generator.config());

        let run = GenerationRun::fold_seeds(
            &generator,
            [3],
            RunMode::AllPerSeed { limit: None },
            &mut registry,
            |_| -> Result<(), Infallible> { Ok(()) },
        )
        .unwrap();

        assert_eq!(run.puzzles.len(), 1);
        assert_eq!(run.inverse_duplicates, 1);
    }

    #[test]
    fn test_fold_seeds_five_by_five() {
        let dictionary = ranked(ABOUT_SQUARE);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(5, 5, 100)).unwrap();
        let mut registry = DuplicateRegistry::for_config(generator.config());

        // Seeds 0, 2 and 3 find the transposed square, seed 1 the other one.
        let run = GenerationRun::fold_seeds(
            &generator,
            0..4,
            RunMode::FirstPerSeed,
            &mut registry,
            |_| -> Result<(), Infallible> { Ok(()) },
        )
        .unwrap();

        assert_eq!(run.puzzles, vec![puzzle("atlasbrainoutdoutterthese")]);
        assert_eq!(run.duplicates, 2);
        assert_eq!(run.inverse_duplicates, 1);
    }

    #[test]
    fn test_fold_seeds_counts_failures() {
        let dictionary = ranked(COMMON_THREES);
        let mut registry = DuplicateRegistry::new(3, 3);

        let sparse = Generator::new(&dictionary, GeneratorConfig::new(3, 3, 60)).unwrap();
        let run = GenerationRun::fold_seeds(
            &sparse,
            0..3,
            RunMode::FirstPerSeed,
            &mut registry,
            |_| -> Result<(), Infallible> { Ok(()) },
        )
        .unwrap();
        assert_eq!(run.no_solution, 3);

        let starved = Generator::new(&dictionary, GeneratorConfig::new(3, 3, 1000).with_step_budget(0)).unwrap();
        let run = GenerationRun::fold_seeds(
            &starved,
            0..2,
            RunMode::AllPerSeed { limit: None },
            &mut registry,
            |_| -> Result<(), Infallible> { Ok(()) },
        )
        .unwrap();
        assert_eq!(run.budget_exceeded, 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_fold_seeds_stops_on_callback_error() {
        let dictionary = ranked(COMMON_THREES);
        let generator = Generator::new(&dictionary, GeneratorConfig::new(3, 3, 1000)).unwrap();
        let mut registry = DuplicateRegistry::for_config(generator.config());

        let result = GenerationRun::fold_seeds(
            &generator,
            0..10,
            RunMode::AllPerSeed { limit: None },
            &mut registry,
            |_| Err("stop"),
        );

        assert_eq!(result.unwrap_err(), "stop");
        assert_eq!(registry.len(), 1);
    }
}
