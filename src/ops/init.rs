//! Implementation of the `init` hook.
//!
//! Sets up a freshly cloned repository: installs workspace dependencies,
//! creates the Python environment used by auxiliary tooling and, on the
//! first run only, asks for the scope and the versioning mode.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::core::lerna::LernaFile;
use crate::core::scope::validate_scope;
use crate::core::workspace::Workspace;
use crate::ops::runtime::{check_runtime, RuntimeCheck};
use crate::util::process;
use crate::util::{Prompter, Shell, Status};

/// What the first-run setup changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitResult {
    /// Scope written to the scope record, if it was replaced
    pub scope: Option<String>,

    /// Whether lerna was switched to independent versioning
    pub independent: bool,

    /// Whether this run performed first-run setup
    pub first_run: bool,
}

/// Run workspace setup.
pub fn init(ws: &mut Workspace, shell: &Arc<Shell>, prompter: &dyn Prompter) -> Result<InitResult> {
    check_runtime(ws.config(), RuntimeCheck::NodeAndNpm)?;

    {
        let _span = shell.span(Status::Installing, "workspace dependencies");
        process::tool(ws.config().tools.npm())?
            .arg("install")
            .cwd(ws.root())
            .run()?;
    }

    if ws.config().python.enabled() {
        setup_python(ws, shell)?;
    } else {
        shell.status(Status::Skipped, "python environment (disabled)");
    }

    if ws.scope().initialized {
        tracing::debug!("scope record already initialized");
        return Ok(InitResult::default());
    }

    first_run(ws, shell, prompter)
}

fn setup_python(ws: &Workspace, shell: &Arc<Shell>) -> Result<()> {
    let python = &ws.config().python;
    let venv_dir = python.venv_dir();
    let requirements = ws.root().join(python.requirements());

    shell.status(Status::Running, format!("python -m venv {}", venv_dir.display()));
    process::tool(ws.config().tools.python())?
        .args(["-m", "venv"])
        .arg(&venv_dir)
        .cwd(ws.root())
        .run()?;

    if !requirements.is_file() {
        shell.status(
            Status::Skipped,
            format!("python requirements (no `{}`)", python.requirements().display()),
        );
        return Ok(());
    }

    let _span = shell.span(Status::Installing, "python requirements");
    process::ProcessBuilder::new(venv_python(&ws.root().join(&venv_dir)))
        .args(["-m", "pip", "install", "-r"])
        .arg(&requirements)
        .cwd(ws.root())
        .run()
}

/// Interpreter inside a virtual environment.
fn venv_python(venv: &std::path::Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}

fn first_run(ws: &mut Workspace, shell: &Arc<Shell>, prompter: &dyn Prompter) -> Result<InitResult> {
    let mut result = InitResult {
        first_run: true,
        ..InitResult::default()
    };

    if ws.scope().is_placeholder() {
        let scope = loop {
            let answer = prompter.input("Scope of this repository (e.g. `viewer`)", None)?;
            let answer = answer.trim().to_string();
            match validate_scope(&answer) {
                Ok(()) => break answer,
                Err(reason) => shell.warn(format!("invalid scope `{}`: {}", answer, reason)),
            }
        };
        ws.scope_mut().scope = scope.clone();
        result.scope = Some(scope);
    }

    if let Some(mut lerna) = LernaFile::load_optional(ws.root())? {
        if !lerna.is_independent()
            && prompter.confirm("Version components independently?", true)?
        {
            lerna.set_independent();
            lerna.save(ws.indent())?;
            result.independent = true;
            shell.status(Status::Finished, "switched lerna to independent versioning");
        }
    }

    ws.scope_mut().initialized = true;
    ws.scope().save()?;
    shell.status(
        Status::Finished,
        format!("initialized repository with scope `{}`", ws.scope().scope),
    );

    Ok(result)
}
