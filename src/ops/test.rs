//! Implementation of the `test` hook.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::core::workspace::Workspace;
use crate::ops::runtime::{check_runtime, RuntimeCheck};
use crate::util::process;
use crate::util::{Shell, Status};

/// Run the test suite of the component containing `dir` with jest.
pub fn run_tests(ws: &Workspace, dir: &Path, shell: &Arc<Shell>) -> Result<()> {
    check_runtime(ws.config(), RuntimeCheck::Node)?;
    let component = ws.component_at(dir)?;

    shell.status(Status::Testing, &component.name);
    process::tool(ws.config().tools.npx())?
        .arg("jest")
        .cwd(&component.location)
        .run()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::component::Partition;
    use crate::core::errors::HookError;
    use crate::test_support::{quiet_shell, WorkspaceFixture};

    #[test]
    fn test_runs_jest_in_component() {
        let fixture = WorkspaceFixture::new("test");
        fixture.use_fake_tools(&[("npx", 0)], "");
        let dir = fixture.add_component(
            Partition::Libs,
            "util",
            r#"{"name": "@monorepo/test.util", "version": "0.1.0"}"#,
        );

        run_tests(&fixture.workspace(), &dir, &quiet_shell()).unwrap();
        assert_eq!(fixture.calls(), vec!["npx jest".to_string()]);
    }

    #[test]
    fn test_failing_suite_is_an_error() {
        let fixture = WorkspaceFixture::new("test");
        fixture.use_fake_tools(&[("npx", 1)], "");
        let dir = fixture.add_component(
            Partition::Libs,
            "util",
            r#"{"name": "@monorepo/test.util", "version": "0.1.0"}"#,
        );

        let err = run_tests(&fixture.workspace(), &dir, &quiet_shell()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HookError>(),
            Some(HookError::ToolFailed { .. })
        ));
    }
}
