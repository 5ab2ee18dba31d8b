pub mod aliases;
mod local_store;

pub use aliases::{AliasTable, LegacyWritePolicy};
pub use local_store::{LocalStore, StoreError};
