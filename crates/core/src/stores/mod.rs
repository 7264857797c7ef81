pub mod memory;

pub use memory::{InMemoryDocumentStore, StoreSnapshot};
