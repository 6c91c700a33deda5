//! tandem-core - Core library for Tandem
//!
//! This crate contains the shared models, the local durable store, and the
//! offline-first synchronization engine used by all Tandem clients. The sync
//! engine queues mutations while disconnected, applies them optimistically to
//! local state, and reconciles conflicts against the remote store when
//! connectivity returns.

pub mod error;
pub mod models;
pub mod net;
pub mod remote;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
pub use models::{Task, TaskId, TaskStatus};
pub use sync::SyncEngine;
