// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! sketchbridge - build, upload and talk to Arduino boards
//!
//! Entry point for the sketchbridge CLI application.

use clap::Parser;

use sketchbridge::cli::{Cli, Commands};
use sketchbridge::config::Settings;
use sketchbridge::error::Result;

#[path = "main/cli_commands.rs"]
mod cli_commands;

use cli_commands::{
    run_board_command, run_boards, run_build, run_code_command, run_ports, run_project_command,
    run_serial_command, BuildKind,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // `-v` turns on the crate's own targets; `-vv` adds the serial line chatter.
    if cli.verbose > 0 {
        let mut directives = vec![
            "sketchbridge.bridge=debug",
            "sketchbridge.session=debug",
            "sketchbridge.local=debug",
            "sketchbridge.remote=debug",
        ];
        if cli.verbose > 1 {
            directives.push("sketchbridge.serial=trace");
        }
        for directive in directives {
            if let Ok(parsed) = directive.parse() {
                env_filter = env_filter.add_directive(parsed);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Load settings
    let settings = Settings::load()?;

    // Dispatch to appropriate command
    let succeeded = match &cli.command {
        Commands::Boards => run_boards(),
        Commands::Ports => run_ports()?,
        Commands::Project(args) => run_project_command(&cli, &args.command, &settings)?,
        Commands::Board(args) => run_board_command(&cli, args, &settings)?,
        Commands::Code(args) => run_code_command(&cli, &args.command, &settings)?,
        Commands::Compile(args) => run_build(&cli, args, &settings, BuildKind::Compile).await?,
        Commands::Upload(args) => run_build(&cli, args, &settings, BuildKind::Upload).await?,
        Commands::Serial(args) => run_serial_command(&cli, &args.command, &settings).await?,
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
