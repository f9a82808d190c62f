//! Picking the puzzle of the day from a precomputed list.
//!
//! A timestamp in milliseconds since the Unix epoch maps to a day bucket, and the bucket indexes
//! the list modulo its length, so every call within the same UTC day gets the same puzzle.

use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

/// Length of one calendar day in milliseconds.
pub const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Which precomputed list to draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("system clock is set before the Unix epoch")]
    BeforeEpoch(#[from] SystemTimeError),

    #[error("timestamp of {0}ms doesn't fit in 64 bits")]
    OutOfRange(u128),
}

/// Milliseconds from the Unix epoch to `time`.
pub fn timestamp_millis(time: SystemTime) -> Result<u64, ClockError> {
    let millis = time.duration_since(UNIX_EPOCH)?.as_millis();
    u64::try_from(millis).map_err(|_| ClockError::OutOfRange(millis))
}

/// The day bucket containing `timestamp_ms`.
pub fn day_index(timestamp_ms: u64) -> u64 {
    timestamp_ms / MILLIS_PER_DAY
}

/// The puzzle for the day containing `timestamp_ms`, or `None` if the list is empty.
pub fn select_daily<S: AsRef<str>>(puzzles: &[S], timestamp_ms: u64) -> Option<&str> {
    if puzzles.is_empty() {
        return None;
    }

    let idx = (day_index(timestamp_ms) % puzzles.len() as u64) as usize;
    Some(puzzles[idx].as_ref())
}

/// Like [`select_daily`], choosing between the hard and medium lists.
pub fn select_daily_for<'a, S: AsRef<str>>(
    difficulty: Difficulty,
    hard: &'a [S],
    medium: &'a [S],
    timestamp_ms: u64,
) -> Option<&'a str> {
    match difficulty {
        Difficulty::Hard => select_daily(hard, timestamp_ms),
        Difficulty::Medium => select_daily(medium, timestamp_ms),
    }
}

/// Split the contents of a batch file into its puzzles.
pub fn parse_puzzle_list(contents: &str) -> Vec<&str> {
    contents.split_whitespace().collect()
}
