//! ltr-store - In-memory trained model store
//!
//! This crate provides a [`ModelStore`] and [`ModelLoader`] backed by a map
//! of model records, optionally seeded from a JSON file. It backs the CLI and
//! the service tests.

mod memory;

pub use memory::{LocalModel, MemoryModelStore};

// Re-export the collaborator traits for convenience
pub use ltr_core::{ModelLoader, ModelStore};
