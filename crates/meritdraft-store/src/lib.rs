//! Storage layer: petitions and generation jobs (in-memory, DuckDB) and the
//! legal knowledge base (in-memory, LanceDB).

mod error;
pub mod memory;
mod traits;

pub use error::StoreError;
pub use memory::{MemoryChunkStore, MemoryStore};
pub use traits::{ChunkQuery, JobStore, LegalChunkStore, PetitionStore, PurityFilter};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

#[cfg(feature = "lancedb")]
mod lance;
#[cfg(feature = "lancedb")]
pub use lance::LanceChunkStore;
