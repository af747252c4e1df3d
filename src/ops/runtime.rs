//! Runtime version pins.

use anyhow::Result;

use crate::util::config::Config;
use crate::util::process::check_major_version;

/// Which pinned runtimes to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeCheck {
    /// Node.js only (build hooks)
    Node,
    /// Node.js and npm (workspace setup)
    NodeAndNpm,
}

/// Verify the configured major versions of node and npm.
///
/// Unpinned runtimes are not checked.
pub fn check_runtime(config: &Config, check: RuntimeCheck) -> Result<()> {
    if let Some(major) = config.runtime.node_major {
        check_major_version(config.tools.node(), major)?;
    }
    if check == RuntimeCheck::NodeAndNpm {
        if let Some(major) = config.runtime.npm_major {
            check_major_version(config.tools.npm(), major)?;
        }
    }
    Ok(())
}
