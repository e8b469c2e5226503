pub mod disk;
pub mod memory;

pub use disk::DiskCountryStore;
pub use memory::{MemoryCache, MemoryCountryStore};
