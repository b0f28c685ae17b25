pub mod commands;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod memory;
pub mod observability;
pub mod resolver;
pub mod security;
pub mod semantic;
pub mod storage;

pub use config::MemoryConfig;
pub use context::{ContextBundle, ContextRetriever};
pub use engine::MemoryEngine;
pub use error::{MemoryError, Result};
pub use memory::ShortTermMemory;
pub use resolver::{ReferenceResolver, ResolvedCommand};
pub use storage::PersistentStore;
