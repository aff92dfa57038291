//! Command implementations for lockpool.
//!
//! Every command takes its request from an input stream and writes its
//! response to an output stream, so tests can drive them with byte buffers.

mod check;
mod get;
mod put;

pub use check::cmd_check;
pub use get::cmd_in;
pub use put::cmd_out;

use crate::cli::Command;
use crate::error::{PoolError, Result};
use crate::protocol::parse_request;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{self, Read, Write};

/// Dispatch a command to its implementation with stdin and stdout.
pub fn dispatch(command: Command) -> Result<()> {
    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();

    match command {
        Command::Check => cmd_check(stdin, stdout),
        Command::In(args) => cmd_in(&args.destination, stdin, stdout),
        Command::Out(args) => cmd_out(&args.source_dir, stdin, stdout),
    }
}

fn read_request<T: DeserializeOwned>(mut input: impl Read) -> Result<T> {
    let mut buffer = String::new();
    input
        .read_to_string(&mut buffer)
        .map_err(|e| PoolError::UserError(format!("failed to read request: {}", e)))?;
    parse_request(&buffer)
}

fn write_response<T: Serialize>(mut output: impl Write, response: &T) -> Result<()> {
    let write_error = |e: &dyn std::fmt::Display| {
        PoolError::UserError(format!("failed to write response: {}", e))
    };

    serde_json::to_writer(&mut output, response).map_err(|e| write_error(&e))?;
    writeln!(output).map_err(|e| write_error(&e))?;
    output.flush().map_err(|e| write_error(&e))
}
