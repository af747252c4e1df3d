//! Core data structures for monohook.
//!
//! This module contains the workspace model hooks operate on:
//! - The scope record and versioning-mode file at the root
//! - npm manifests, patched field by field
//! - Components and their partitions
//! - Publish payloads and npm range matching

pub mod component;
pub mod errors;
pub mod lerna;
pub mod manifest;
pub mod npm_range;
pub mod payload;
pub mod scope;
pub mod workspace;

pub use component::{Component, Partition};
pub use errors::HookError;
pub use lerna::LernaFile;
pub use manifest::{DependencyKind, Manifest, MANIFEST_NAME};
pub use payload::{PublishableComponent, RegistryPayload};
pub use scope::{ScopeRecord, PLACEHOLDER_SCOPE, SCOPE_FILE};
pub use workspace::Workspace;
