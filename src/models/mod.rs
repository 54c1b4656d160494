//! Core data models for announced papers and the harvest cursor.

mod cursor;
mod paper;

pub use cursor::{Cursor, FeedOutcome};
pub use paper::{Paper, PaperBuilder};
