pub mod ordinal;
pub mod short_term;

pub use ordinal::{parse_ordinal, Ordinal, ORDINAL_WORDS_PATTERN};
pub use short_term::{LastOperation, RecentResult, ShortTermMemory, DEFAULT_RESULTS_WINDOW, FILE_SEARCH};
