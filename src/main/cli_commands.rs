// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::time::Duration;

use sketchbridge::board::{Board, BoardOptions, SUPPORTED_BOARDS};
use sketchbridge::bridge::{Bridge, Mode, ModeOptions};
use sketchbridge::cli::{
    BoardArgs, BuildArgs, Cli, CodeCommands, ProjectCommands, SerialCommands,
};
use sketchbridge::config::Settings;
use sketchbridge::error::{BridgeError, Result};
use sketchbridge::serial::{list_ports, SerialOptions};
use sketchbridge::session::Session;

#[derive(Debug, Clone, Copy)]
pub(super) enum BuildKind {
    Compile,
    Upload,
}

/// Backend mode and options: settings first, command-line flags on top.
fn resolve_mode(cli: &Cli, settings: &Settings) -> (Mode, ModeOptions) {
    let mut mode = settings.mode;
    let mut options = settings.mode_options();
    if let Some(url) = &cli.remote {
        mode = Mode::Remote;
        options.remote_url = Some(url.clone());
    }
    if let Some(token) = &cli.token {
        options.token = Some(token.clone());
    }
    (mode, options)
}

fn project_name(cli: &Cli, settings: &Settings) -> String {
    cli.project
        .clone()
        .unwrap_or_else(|| settings.projects.default_name.clone())
}

fn new_session(cli: &Cli, settings: &Settings) -> Result<Session> {
    let (mode, options) = resolve_mode(cli, settings);
    let bridge = Bridge::new(mode, &options)?;
    let board = Board::select(&settings.default_board)?;
    let projects_dir = cli
        .projects_dir
        .clone()
        .unwrap_or_else(|| settings.projects.dir.clone());
    Ok(Session::new(bridge, board, projects_dir))
}

/// Session with the selected project loaded
fn open_session(cli: &Cli, settings: &Settings) -> Result<Session> {
    let mut session = new_session(cli, settings)?;
    session.load_project(&project_name(cli, settings))?;
    Ok(session)
}

fn seconds(value: f64, what: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        BridgeError::InvalidArgument(format!("{} must be a non-negative number of seconds", what))
    })
}

pub(super) fn run_boards() -> bool {
    for (name, fqbn) in SUPPORTED_BOARDS {
        println!("{:<8} {}", name, fqbn);
    }
    true
}

pub(super) fn run_ports() -> Result<bool> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(true)
}

pub(super) fn run_project_command(
    cli: &Cli,
    command: &ProjectCommands,
    settings: &Settings,
) -> Result<bool> {
    let name = project_name(cli, settings);
    match command {
        ProjectCommands::Init => {
            let mut session = new_session(cli, settings)?;
            let dir = session.init_project(&name)?;
            println!("Project '{}' created at {}", name, dir.display());
            match session.board().port() {
                Some(port) => println!("Board: {} on {}", session.board().name(), port),
                None => println!(
                    "Board: {} (no serial port detected, set one with `board --port`)",
                    session.board().name()
                ),
            }
        }
        ProjectCommands::Show => {
            let session = open_session(cli, settings)?;
            print!("{}", session.show());
        }
        ProjectCommands::Save => {
            let session = open_session(cli, settings)?;
            let dir = session.save_project()?;
            println!("Project '{}' saved to {}", name, dir.display());
        }
        ProjectCommands::Delete => {
            let mut session = open_session(cli, settings)?;
            session.delete_project()?;
            println!("Project '{}' deleted.", name);
        }
        ProjectCommands::ImportCode { file } => {
            let mut session = open_session(cli, settings)?;
            let text = std::fs::read_to_string(file)?;
            session.code_mut().import_from_code(&text)?;
            session.save_project()?;
            println!("Imported {} into project '{}'.", file.display(), name);
        }
        ProjectCommands::ExportCode { file } => {
            let session = open_session(cli, settings)?;
            let text = session.code().export_as_code();
            match file {
                Some(path) => {
                    std::fs::write(path, text)?;
                    println!("Exported project '{}' to {}", name, path.display());
                }
                None => print!("{}", text),
            }
        }
    }
    Ok(true)
}

pub(super) fn run_board_command(cli: &Cli, args: &BoardArgs, settings: &Settings) -> Result<bool> {
    let mut session = open_session(cli, settings)?;
    if let Some(name) = &args.select {
        session.select_board(name)?;
    }

    let serial = SerialOptions {
        baudrate: args.baudrate,
        timeout: args.timeout,
        encoding: args.encoding.clone(),
        ..Default::default()
    };
    session.configure_board(&BoardOptions {
        name: None,
        fqbn: args.fqbn.clone(),
        port: args.port.clone(),
        serial: (serial != SerialOptions::default()).then_some(serial),
    });
    session.save_project()?;

    let board = session.board();
    let config = board.serial().config();
    println!("Board:    {} ({})", board.name(), board.fqbn());
    println!("Port:     {}", board.port().unwrap_or("N/A"));
    println!(
        "Serial:   {} baud, {}s timeout, {}",
        config.baudrate, config.timeout, config.encoding
    );
    Ok(true)
}

pub(super) fn run_code_command(
    cli: &Cli,
    command: &CodeCommands,
    settings: &Settings,
) -> Result<bool> {
    let mut session = open_session(cli, settings)?;
    match command {
        CodeCommands::Add { section, id, code } => session.add_code(section, id, code)?,
        CodeCommands::Remove { section, id } => session.remove_code(section, id.as_deref())?,
        CodeCommands::Replace { section, code, id } => {
            session
                .code_mut()
                .replace_code(section, code, id.as_deref())?
        }
    }
    session.save_project()?;
    Ok(true)
}

pub(super) async fn run_build(
    cli: &Cli,
    args: &BuildArgs,
    settings: &Settings,
    kind: BuildKind,
) -> Result<bool> {
    let session = open_session(cli, settings)?;
    match kind {
        BuildKind::Compile => session.compile(&args.extra).await,
        BuildKind::Upload => session.upload(&args.extra).await,
    }
}

pub(super) async fn run_serial_command(
    cli: &Cli,
    command: &SerialCommands,
    settings: &Settings,
) -> Result<bool> {
    let session = open_session(cli, settings)?;
    match command {
        SerialCommands::Listen { duration, prefix } => {
            let duration = duration.map(|d| seconds(d, "--duration")).transpose()?;
            tokio::select! {
                result = session.serial_listen(duration, prefix.as_deref()) => result?,
                _ = tokio::signal::ctrl_c() => {
                    session.serial_close().await?;
                }
            }
        }
        SerialCommands::Read {
            bytes: Some(size), ..
        } => {
            let data = session.serial_read_bytes(Some(*size)).await?;
            let text = session.board().serial().config().encoder().decode(&data);
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
        }
        SerialCommands::Read { lines, timeout, .. } => {
            let timeout = timeout.map(|t| seconds(t, "--timeout")).transpose()?;
            for line in session.serial_read(*lines, timeout).await? {
                println!("{}", line);
            }
        }
        SerialCommands::Write { data, no_nl } => {
            let written = session.serial_write(data, !no_nl).await?;
            println!("Wrote {} bytes.", written);
        }
    }
    Ok(true)
}
