pub mod chunk_store;
pub mod index_store;
pub mod vector_index;

pub use chunk_store::ChunkStore;
pub use index_store::{IndexEntry, IndexPair};
pub use vector_index::FlatL2Index;
