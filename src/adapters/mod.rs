//! Collaborator adapters.
pub mod file;
pub mod memory;
pub mod seed;

pub use file::FileStorage;
pub use memory::{MemoryAuthProvider, MemoryDocumentStore, MemoryStorage};
pub use seed::{SeedData, SeedError};
