//! High-level operations.
//!
//! This module contains the default behaviour of every hook and the
//! maintenance commands built on top of them.

pub mod add_dependency;
pub mod build;
pub mod check_peers;
pub mod create;
pub mod init;
pub mod publish;
pub mod publish_hooks;
pub mod runtime;
pub mod template_merge;
pub mod test;
pub mod update;
pub mod upgrade;

pub use add_dependency::{add_dependency, AddDependencyOptions};
pub use build::{build, build_bundle, build_dep, BundleProfile};
pub use check_peers::{check_peers, NpmView, PeerMismatch, PeerSource};
pub use create::{create_component, CreateOptions};
pub use init::{init, InitResult};
pub use publish::{publish, PublishOptions, PublishReport};
pub use publish_hooks::{
    post_publish, post_publish_global, pre_publish, pre_publish_global, ComponentHookArgs,
    GlobalHookArgs,
};
pub use runtime::{check_runtime, RuntimeCheck};
pub use template_merge::{merge_template, MergeOutcome, MergeTemplateOptions};
pub use test::run_tests;
pub use update::{update, UpdateOptions, UpdateReport};
pub use upgrade::{apply_upgrade, upgrade, UpgradeOptions, UpgradeReport, UpgradeTarget};
