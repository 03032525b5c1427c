//! # granary-store: entity loading pipeline
//!
//! A data-access core that loads, counts, and batches persisted entities
//! while dispatching lifecycle events external listeners can use to veto,
//! filter, or rewrite results. The persistence engine itself stays behind
//! the [`LoadDriver`] seam; this crate only orchestrates when loads happen,
//! how the transaction bracket wraps them, and how listeners observe the
//! process.
//!
//! The moving parts:
//! - [`EntityStore`] sequences event firing around the driver's primitive
//!   calls for single, list, and count operations.
//! - the batch compensator re-fetches in growing windows when listener
//!   filtering shrinks a requested page.
//! - the identity reorderer restores caller-specified order on explicit-id
//!   loads and fails loudly on missing identifiers.

pub mod config;
pub mod context;
pub mod driver;
pub mod entity;
pub mod error;
pub mod events;
pub mod observers;
pub mod reorder;
pub mod store;

mod batch;


pub use config::*;
pub use context::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use events::*;
pub use observers::*;
pub use store::*;
