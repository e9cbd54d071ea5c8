//! Host configuration store
//!
//! ## Design
//!
//! - **Trait-based**: `HostStore` allows swapping the JSON file for an
//!   in-memory list (tests, embedding)
//! - **Wholesale**: the host list is loaded and written as one unit
//! - **Catalog**: `HostCatalog` layers the create/update/delete/threshold
//!   mutations on top of any store
//!
//! ## Usage
//!
//! ```no_run
//! use arccat::storage::{HostCatalog, json::JsonHostStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = HostCatalog::new(JsonHostStore::new("./servers.json"));
//!     for host in catalog.list().await? {
//!         println!("{} {}", host.id, host.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod catalog;
pub mod error;
pub mod json;
pub mod memory;

pub use backend::HostStore;
pub use catalog::{HostCatalog, NewHost};
pub use error::{StorageError, StorageResult};
