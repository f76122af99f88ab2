//! Core identifiers and the task catalog.
//!
//! Shared by the game engine and the transport.

pub mod catalog;
pub mod id;

pub use catalog::{CatalogError, TaskCatalog, TaskDescriptor, TaskKind};
pub use id::{CharacterId, PlayerId, TaskId};
