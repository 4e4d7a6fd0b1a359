//! Admission Step Store
//!
//! Durable, session-scoped persistence of wizard step records:
//! - `KvPort`: the injected key-value medium (in-memory or file-backed)
//! - `StepStore`: whole-record save/load/purge keyed by step
//!
//! # Example
//!
//! ```rust,ignore
//! use admit_store::{DurableStepStore, MemoryKv, StepStore};
//!
//! let store = DurableStepStore::new(MemoryKv::new());
//! store.save(&record).await?;
//! let resumed = store.load_session().await?;
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod file;
pub mod kv;
pub mod store;

pub use error::{KvError, StoreError};
pub use file::FileKv;
pub use kv::{KvPort, MemoryKv};
pub use store::{DurableStepStore, StepStore, DEFAULT_KEY_PREFIX};
