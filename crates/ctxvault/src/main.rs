//! ctx - Project memory for AI coding assistants
//!
//! Thin command-line driver over `ctxvault-core`. Logs go to stderr so hook
//! output on stdout stays clean.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::from_default_env().add_directive(format!("ctxvault={}", level).parse()?))
        .init();

    let project = cli.project.as_path();

    match cli.command {
        Commands::Init { force } => commands::init::execute(project, force),
        Commands::Add(args) => commands::notes::add(project, args),
        Commands::Show { path, json } => commands::notes::show(project, &path, json),
        Commands::Edit(args) => commands::notes::edit(project, args),
        Commands::Remove { path } => commands::notes::remove(project, &path),
        Commands::List {
            r#type,
            sort,
            limit,
            json,
        } => commands::notes::list(project, r#type, sort.into(), limit, json),
        Commands::Search {
            query,
            r#type,
            limit,
            touch,
            json,
        } => commands::search::execute(project, &query, r#type, limit, touch, json),
        Commands::Sync => commands::lifecycle::sync(project),
        Commands::Decay(args) => commands::lifecycle::decay(project, args),
        Commands::Boost { path, amount } => commands::lifecycle::boost(project, &path, amount),
        Commands::Deprecate { path } => commands::lifecycle::deprecate(project, &path),
        Commands::Defrag(args) => commands::lifecycle::defrag(project, args),
        Commands::Extract(args) => commands::extract::execute(project, args),
        Commands::Reflect(args) => commands::extract::reflect(project, args),
        Commands::Inject { json } => commands::inject::preview(project, json),
        Commands::Hook(cmd) => commands::inject::hook(project, cmd),
        Commands::Status { json } => commands::status::execute(project, json),
        Commands::Config(cmd) => commands::status::config(project, cmd),
        Commands::Version => {
            println!("ctx {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
