//! Flakewatch CLI - intermittent test failure triage.

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use flakewatch::cli::{Cli, Commands};
use flakewatch::config::Config;
use flakewatch::commands;

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> flakewatch::Result<()> {
    let config = if cli.conf_file.is_file() {
        tracing::info!("reading conf file {}", cli.conf_file.display());
        Config::load(&cli.conf_file)?
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Update { output, days_ago } => {
            commands::update(&output, days_ago)?;
        }
        Commands::List {
            input,
            sort_by,
            limit,
        } => {
            print!("{}", commands::list(&config, &input, &sort_by, limit)?);
        }
        Commands::ListColumns => {
            print!("{}", commands::list_columns());
        }
        Commands::Show { input, full, bugid } => {
            print!("{}", commands::show(&config, &input, &bugid, full)?);
        }
        Commands::Trigger {
            input,
            times,
            buildname,
            dry_run,
            bugid,
            back_revisions,
        } => {
            print!(
                "{}",
                commands::trigger(
                    &config,
                    &input,
                    &bugid,
                    back_revisions,
                    times,
                    buildname.as_deref(),
                    dry_run,
                )?
            );
        }
        Commands::GenerateConf { path } => {
            print!("{}", commands::generate_conf(&path)?);
        }
    }

    Ok(())
}
