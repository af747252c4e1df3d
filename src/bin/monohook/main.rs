//! monohook CLI - lifecycle hooks for JavaScript/TypeScript monorepos

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use monohook::core::component::Partition;
use monohook::hooks::{HookName, HookRunner};
use monohook::util::{ColorChoice, GlobalContext, Shell};

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("monohook=debug")
    } else {
        EnvFilter::new("monohook=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, color));

    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    let runner = HookRunner::new(ctx, shell);

    match cli.command {
        Commands::Init => commands::init::execute(&runner),
        Commands::CreatePackage(args) => commands::create::execute(args, Partition::Packages, &runner),
        Commands::CreateLib(args) => commands::create::execute(args, Partition::Libs, &runner),
        Commands::Build => commands::build::execute(HookName::Build, &runner),
        Commands::BuildDep => commands::build::execute(HookName::BuildDep, &runner),
        Commands::BuildDev => commands::build::execute(HookName::BuildDev, &runner),
        Commands::BuildProd => commands::build::execute(HookName::BuildProd, &runner),
        Commands::Test => commands::test::execute(&runner),
        Commands::PrePublish(args) => commands::publish_hooks::execute_component(HookName::PrePublish, args, &runner),
        Commands::PostPublish(args) => commands::publish_hooks::execute_component(HookName::PostPublish, args, &runner),
        Commands::PrePublishGlobal(args) => commands::publish_hooks::execute_pre_global(args, &runner),
        Commands::PostPublishGlobal(args) => commands::publish_hooks::execute_post_global(args, &runner),
        Commands::AddDependency(args) => commands::add_dependency::execute(args, false, &runner),
        Commands::AddDevDependency(args) => commands::add_dependency::execute(args, true, &runner),
        Commands::MergeTemplate => commands::merge_template::execute(&runner),
        Commands::Publish(args) => commands::publish::execute(args, &runner),
        Commands::CheckPeers => commands::check_peers::execute(&runner),
        Commands::Update(args) => commands::update::execute(args, &runner),
        Commands::Upgrade(args) => commands::upgrade::execute(args, &runner),
        Commands::ApplyUpgrade => commands::upgrade::execute_apply(&runner),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
