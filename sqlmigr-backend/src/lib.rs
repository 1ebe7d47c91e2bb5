pub mod generic;

mod local;
mod memory;

pub use generic::{DirEntry, EntryKind, StorageError, StorageTrait};
pub use local::LocalFs;
pub use memory::MemoryFs;
