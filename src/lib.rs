// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod event;
pub mod instrument;
pub mod metrics;
pub mod naming;
pub mod notify;
pub mod routing;
pub mod sorter;
pub mod storage;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::SorterConfig;
pub use crate::error::SortError;
pub use crate::event::IncomingFileEvent;
pub use crate::instrument::Instrument;
pub use crate::naming::ParsedIdentity;
pub use crate::routing::DestinationMapping;
pub use crate::sorter::{FileSorter, SortOptions, TransferResult};
pub use crate::storage::{MemoryStore, ObjectLocation, ObjectStore};
