pub mod csv;
pub mod match_engine;
pub mod tokens;

pub use crate::csv::{parse_statement, StatementError, StatementLayout};
pub use match_engine::{MatchEngine, MatchOutcome, DEFAULT_THRESHOLD};
pub use tokens::{jaccard, TokenSet, Tokenizer};
