pub mod logging;
pub mod metrics;

pub use logging::{setup_logging, LogFormat};
pub use metrics::{MemoryMetrics, MemoryStats, SearchPath};
