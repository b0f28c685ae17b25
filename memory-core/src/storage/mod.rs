pub mod models;
pub mod snapshot;
pub mod store;

pub use models::{
    CommandRecord, ConversationLink, ConversationRecord, FileAction, FileInteraction,
    MemorySnapshot,
};
pub use store::{PersistentStore, DEFAULT_CAPACITY};
