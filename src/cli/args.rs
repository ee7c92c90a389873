// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Defines all command-line arguments and subcommands for sketchbridge.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// sketchbridge - build, upload and talk to Arduino boards from a notebook or terminal
#[derive(Parser, Debug)]
#[command(name = "sketchbridge")]
#[command(version, about = "Build, upload and talk to Arduino boards")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use the remote agent at this URL instead of the local toolchain
    #[arg(long, global = true, value_name = "URL")]
    pub remote: Option<String>,

    /// API token for the remote agent
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Project to operate on (defaults to settings)
    #[arg(short, long, global = true, value_name = "NAME")]
    pub project: Option<String>,

    /// Directory holding projects (defaults to settings)
    #[arg(long, global = true, value_name = "DIR")]
    pub projects_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List supported boards
    Boards,

    /// List serial ports on this machine
    Ports,

    /// Project management
    Project(ProjectArgs),

    /// Select or configure the project's board
    Board(BoardArgs),

    /// Edit code cells
    Code(CodeArgs),

    /// Compile the project sketch
    Compile(BuildArgs),

    /// Compile and upload the project sketch
    Upload(BuildArgs),

    /// Talk to the board over its serial port
    Serial(SerialArgs),
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project
    Init,

    /// Print the generated sketch
    Show,

    /// Write the sketch and project file
    Save,

    /// Delete the project directory
    Delete,

    /// Replace the project's code with sections parsed from a sketch file
    ImportCode {
        /// Sketch file to read
        file: PathBuf,
    },

    /// Write the generated sketch to a file (stdout when omitted)
    ExportCode {
        file: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct BoardArgs {
    /// Switch to a supported board (see `boards`)
    #[arg(long)]
    pub select: Option<String>,

    /// Serial port the board is attached to
    #[arg(long)]
    pub port: Option<String>,

    /// Fully qualified board name override
    #[arg(long)]
    pub fqbn: Option<String>,

    #[arg(long)]
    pub baudrate: Option<u32>,

    /// Serial read timeout in seconds
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Text encoding for serial data
    #[arg(long)]
    pub encoding: Option<String>,
}

#[derive(Args, Debug)]
pub struct CodeArgs {
    #[command(subcommand)]
    pub command: CodeCommands,
}

#[derive(Subcommand, Debug)]
pub enum CodeCommands {
    /// Add or replace a cell in a section
    Add {
        /// globals, setup, loop or functions
        section: String,
        /// Cell id
        id: String,
        /// Code text
        code: String,
    },

    /// Remove one cell, or the whole section when no id is given
    Remove {
        section: String,
        id: Option<String>,
    },

    /// Replace a cell, located by id or by its content
    Replace {
        section: String,
        code: String,
        #[arg(long)]
        id: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Extra arguments passed to the build tool
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra: Vec<String>,
}

#[derive(Args, Debug)]
pub struct SerialArgs {
    #[command(subcommand)]
    pub command: SerialCommands,
}

#[derive(Subcommand, Debug)]
pub enum SerialCommands {
    /// Print incoming lines until the duration expires or the port closes
    Listen {
        /// Seconds to listen (forever when omitted)
        #[arg(short, long)]
        duration: Option<f64>,

        /// Only print lines starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Read a number of lines, or raw bytes with --bytes
    Read {
        #[arg(short, long, default_value_t = 1)]
        lines: usize,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<f64>,

        /// Read up to this many bytes as they arrive instead of whole lines
        #[arg(long, conflicts_with_all = ["lines", "timeout"])]
        bytes: Option<usize>,
    },

    /// Send text to the board
    Write {
        #[arg(short, long)]
        data: String,

        /// Do not append a newline
        #[arg(long)]
        no_nl: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_globals() {
        let cli = Cli::parse_from([
            "sketchbridge",
            "-v",
            "--remote",
            "http://pi:5000",
            "--token",
            "abc",
            "boards",
        ]);
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.remote.as_deref(), Some("http://pi:5000"));
        assert_eq!(cli.token.as_deref(), Some("abc"));
        assert!(cli.project.is_none());
        assert!(matches!(cli.command, Commands::Boards));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["sketchbridge", "compile", "--project", "blink"]);
        assert_eq!(cli.project.as_deref(), Some("blink"));
        assert!(matches!(cli.command, Commands::Compile(_)));
    }

    #[test]
    fn test_compile_passes_extra_args() {
        let cli = Cli::parse_from(["sketchbridge", "compile", "--", "--verbose", "--clean"]);
        if let Commands::Compile(args) = cli.command {
            assert_eq!(args.extra, vec!["--verbose", "--clean"]);
        } else {
            panic!("Expected Compile command");
        }
    }

    #[test]
    fn test_project_subcommands() {
        let cli = Cli::parse_from(["sketchbridge", "project", "import-code", "blink.ino"]);
        if let Commands::Project(args) = cli.command {
            assert!(matches!(
                args.command,
                ProjectCommands::ImportCode { ref file } if file == &PathBuf::from("blink.ino")
            ));
        } else {
            panic!("Expected Project command");
        }

        let cli = Cli::parse_from(["sketchbridge", "project", "export-code"]);
        assert!(matches!(
            cli.command,
            Commands::Project(ProjectArgs {
                command: ProjectCommands::ExportCode { file: None }
            })
        ));
    }

    #[test]
    fn test_code_add() {
        let cli = Cli::parse_from(["sketchbridge", "code", "add", "setup", "0", "Serial.begin(9600);"]);
        if let Commands::Code(CodeArgs {
            command: CodeCommands::Add { section, id, code },
        }) = cli.command
        {
            assert_eq!(section, "setup");
            assert_eq!(id, "0");
            assert_eq!(code, "Serial.begin(9600);");
        } else {
            panic!("Expected Code add");
        }
    }

    #[test]
    fn test_code_remove_without_id() {
        let cli = Cli::parse_from(["sketchbridge", "code", "remove", "loop"]);
        assert!(matches!(
            cli.command,
            Commands::Code(CodeArgs {
                command: CodeCommands::Remove { id: None, .. }
            })
        ));
    }

    #[test]
    fn test_serial_read_defaults_to_one_line() {
        let cli = Cli::parse_from(["sketchbridge", "serial", "read"]);
        if let Commands::Serial(SerialArgs {
            command: SerialCommands::Read { lines, timeout, bytes },
        }) = cli.command
        {
            assert_eq!(lines, 1);
            assert!(timeout.is_none());
            assert!(bytes.is_none());
        } else {
            panic!("Expected Serial read");
        }
    }

    #[test]
    fn test_serial_write_no_newline() {
        let cli = Cli::parse_from(["sketchbridge", "serial", "write", "--data", "ping", "--no-nl"]);
        if let Commands::Serial(SerialArgs {
            command: SerialCommands::Write { data, no_nl },
        }) = cli.command
        {
            assert_eq!(data, "ping");
            assert!(no_nl);
        } else {
            panic!("Expected Serial write");
        }
    }

    #[test]
    fn test_serial_listen_options() {
        let cli = Cli::parse_from([
            "sketchbridge", "serial", "listen", "-d", "2.5", "--prefix", "T=",
        ]);
        if let Commands::Serial(SerialArgs {
            command: SerialCommands::Listen { duration, prefix },
        }) = cli.command
        {
            assert_eq!(duration, Some(2.5));
            assert_eq!(prefix.as_deref(), Some("T="));
        } else {
            panic!("Expected Serial listen");
        }
    }

    #[test]
    fn test_missing_command_is_an_error() {
        assert!(Cli::try_parse_from(["sketchbridge"]).is_err());
    }
}
