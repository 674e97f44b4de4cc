pub mod file_store;
pub mod sled_store;

pub use file_store::FileStore;
pub use sled_store::SledStore;
