pub mod memory_repo;
pub mod store;

pub use memory_repo::MemoryRepository;
pub use store::Store;
