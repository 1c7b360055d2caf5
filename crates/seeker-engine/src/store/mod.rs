pub mod builder;
pub mod vector_store;

pub use builder::{document_id, merge_all, StoreBuilder};
pub use vector_store::{VectorStore, STORE_FILE};
