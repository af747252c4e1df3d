//! Default behaviour of the publish lifecycle hooks.
//!
//! Only `pre-publish` does something by default (it builds the component);
//! the other three exist as extension points for override scripts.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::core::component::Component;
use crate::core::errors::HookError;
use crate::core::payload::{
    decode_components, decode_registries, parse_flag, PublishableComponent, RegistryPayload,
};
use crate::core::workspace::Workspace;
use crate::ops::build::build;
use crate::util::{Shell, Status};

/// Arguments of `pre-publish` and `post-publish`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentHookArgs {
    pub dry_run: bool,
    pub name: String,
    pub version: String,
}

impl ComponentHookArgs {
    pub fn parse(dry_run: &str, name: &str, version: &str) -> Result<Self> {
        Ok(ComponentHookArgs {
            dry_run: parse_flag(dry_run)?,
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}

/// Arguments of `pre-publish-global` and `post-publish-global`.
///
/// `post-publish-global` carries neither the no-git flag nor registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalHookArgs {
    pub dry_run: bool,
    pub no_git: Option<bool>,
    pub components: Vec<PublishableComponent>,
    pub registries: Vec<RegistryPayload>,
}

impl GlobalHookArgs {
    pub fn parse_pre(dry_run: &str, no_git: &str, components: &str, registries: &str) -> Result<Self> {
        Ok(GlobalHookArgs {
            dry_run: parse_flag(dry_run)?,
            no_git: Some(parse_flag(no_git)?),
            components: decode_components(components)?,
            registries: decode_registries(registries)?,
        })
    }

    pub fn parse_post(dry_run: &str, components: &str) -> Result<Self> {
        Ok(GlobalHookArgs {
            dry_run: parse_flag(dry_run)?,
            no_git: None,
            components: decode_components(components)?,
            registries: Vec::new(),
        })
    }
}

/// Build the component before it is published.
///
/// The component is the one in `dir`; when the hook is invoked from
/// elsewhere it is looked up by name.
pub fn pre_publish(ws: &Workspace, dir: &Path, args: &ComponentHookArgs, shell: &Arc<Shell>) -> Result<()> {
    let component = locate(ws, dir, &args.name)?;
    tracing::debug!(
        "pre-publish {}@{} (dry run: {})",
        component.name,
        args.version,
        args.dry_run
    );
    build(ws, &component.location, shell)
}

pub fn post_publish(args: &ComponentHookArgs, shell: &Shell) -> Result<()> {
    shell.status(
        Status::Skipped,
        format!("post-publish for {}@{} (no default action)", args.name, args.version),
    );
    Ok(())
}

pub fn pre_publish_global(args: &GlobalHookArgs, shell: &Shell) -> Result<()> {
    shell.status(
        Status::Skipped,
        format!(
            "pre-publish-global for {} (no default action)",
            describe(&args.components)
        ),
    );
    Ok(())
}

pub fn post_publish_global(args: &GlobalHookArgs, shell: &Shell) -> Result<()> {
    shell.status(
        Status::Skipped,
        format!(
            "post-publish-global for {} (no default action)",
            describe(&args.components)
        ),
    );
    Ok(())
}

fn locate(ws: &Workspace, dir: &Path, name: &str) -> Result<Component> {
    if let Ok(component) = ws.component_at(dir) {
        return Ok(component);
    }
    ws.components()?
        .into_iter()
        .find(|c| c.name == name)
        .ok_or_else(|| {
            HookError::ComponentNotFound {
                name: name.to_string(),
            }
            .into()
        })
}

fn describe(components: &[PublishableComponent]) -> String {
    match components.len() {
        1 => "1 component".to_string(),
        n => format!("{} components", n),
    }
}
