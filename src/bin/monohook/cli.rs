//! CLI definitions using clap.
//!
//! Hook arguments are declared optional so that a missing argument is
//! reported by the hook itself (exit code 1, usage line) rather than by clap,
//! and before any override or external tool runs.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

/// monohook - lifecycle hooks for JavaScript/TypeScript monorepos
#[derive(Parser)]
#[command(name = "monohook")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install dependencies and run first-time repository setup
    Init,

    /// Scaffold a new package in `packages/`
    CreatePackage(CreateArgs),

    /// Scaffold a new library in `libs/`
    CreateLib(CreateArgs),

    /// Compile the current component with tsc
    Build,

    /// Build the current component and its internal dependencies
    BuildDep,

    /// Serve the current package with the webpack dev server
    BuildDev,

    /// Bundle the current package for production
    BuildProd,

    /// Run the current component's tests
    Test,

    /// Runs before a component is published
    PrePublish(ComponentHookArgs),

    /// Runs after a component was published
    PostPublish(ComponentHookArgs),

    /// Runs once before anything is published
    PrePublishGlobal(PrePublishGlobalArgs),

    /// Runs once after everything was published
    PostPublishGlobal(PostPublishGlobalArgs),

    /// Add a dependency to one or all components
    AddDependency(AddDependencyArgs),

    /// Add a dev dependency to one or all components
    #[command(alias = "add-devDependency")]
    AddDevDependency(AddDependencyArgs),

    /// Merge the latest template repository changes
    MergeTemplate,

    /// Publish components to npm registries
    Publish(PublishArgs),

    /// Report peer dependency version mismatches
    CheckPeers,

    /// Update and audit dependencies within their declared ranges
    Update(UpdateArgs),

    /// Upgrade dependency ranges with npm-check-updates
    Upgrade(UpgradeArgs),

    /// Update on top of an upgrade and commit the result
    ApplyUpgrade,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct CreateArgs {
    /// Base name of the component (without scope)
    pub name: Option<String>,
}

#[derive(Args)]
pub struct ComponentHookArgs {
    /// Whether this is a dry run (`true`/`false`)
    pub dry_run: Option<String>,

    /// Package name of the component
    pub name: Option<String>,

    /// Version being published
    pub version: Option<String>,
}

#[derive(Args)]
pub struct PrePublishGlobalArgs {
    /// Whether this is a dry run (`true`/`false`)
    pub dry_run: Option<String>,

    /// Whether git operations are skipped (`true`/`false`)
    pub no_git: Option<String>,

    /// Selected components as JSON
    pub components: Option<String>,

    /// Target registries as JSON
    pub registries: Option<String>,
}

#[derive(Args)]
pub struct PostPublishGlobalArgs {
    /// Whether this is a dry run (`true`/`false`)
    pub dry_run: Option<String>,

    /// Published components as JSON
    pub components: Option<String>,
}

#[derive(Args)]
pub struct AddDependencyArgs {
    /// Dependency to install (`name` or `name@range`)
    pub dependency: Option<String>,

    /// Component to install into (defaults to all components)
    pub component: Option<String>,
}

#[derive(Args)]
pub struct PublishArgs {
    /// Run `npm publish --dry-run` and restore all manifests afterwards
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the git commit, tags and push
    #[arg(long)]
    pub no_git: bool,

    /// Accept the default answer to every question
    #[arg(short, long)]
    pub yes: bool,

    /// Don't publish to registries that already hold the target version
    #[arg(long)]
    pub skip_existing: bool,

    /// Publish the current versions without incrementing them
    #[arg(long)]
    pub keep_version: bool,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Don't check for or commit manifest changes
    #[arg(long)]
    pub no_git: bool,
}

#[derive(Args)]
pub struct UpgradeArgs {
    /// Highest kind of release to upgrade to (asked for when omitted)
    #[arg(short, long, value_parser = ["major", "minor", "patch"])]
    pub target: Option<String>,

    /// Only upgrade packages matching this ncu filter
    #[arg(short, long, default_value = "*")]
    pub filter: String,

    /// Comma separated packages to leave alone
    #[arg(short = 'x', long)]
    pub exclude: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_dev_dependency_alias() {
        let cli = Cli::parse_from(["monohook", "add-devDependency", "jest", "test.alpha"]);
        match cli.command {
            Commands::AddDevDependency(args) => {
                assert_eq!(args.dependency.as_deref(), Some("jest"));
                assert_eq!(args.component.as_deref(), Some("test.alpha"));
            }
            _ => panic!("expected add-dev-dependency"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["monohook", "build", "--verbose", "--no-color"]);
        assert!(cli.verbose);
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Build));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["monohook", "-q", "-v", "build"]).is_err());
    }
}
