#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` implements the `sitewarden` command-line front end. Each subcommand
//! maps onto one [`client::SiteClient`] operation: inventory reads print a
//! short summary, mutations print their outcome, and `update-all` prints one
//! line per component followed by a tally.
//!
//! # Design
//!
//! [`run`] accepts an iterator of arguments together with handles for
//! standard output and error, so the binary and the tests drive the same
//! code path. A [`clap`] command definition parses the arguments into a typed
//! invocation; the site client is then built from `--url`/`--api-key` (or
//! their environment variables) plus the `SITEWARDEN_*` configuration
//! overrides, and the requested action runs against it.
//!
//! # Invariants
//!
//! - `run` never panics; I/O failures surface as non-zero exit codes.
//! - Help and version output go to standard output with exit code `0`.
//! - Results go to standard output, diagnostics to standard error.
//!
//! # Errors
//!
//! Usage and configuration problems exit with [`USAGE_EXIT_CODE`]. Client
//! failures exit with [`client::ErrorKind::exit_code`], and a mutation whose
//! outcome could not be confirmed exits with the code of
//! [`client::ErrorKind::UpdateUncertain`].
//!
//! # Examples
//!
//! ```
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let exit_code = cli::run(["sitewarden", "--version"], &mut stdout, &mut stderr);
//!
//! assert_eq!(exit_code, 0);
//! assert!(!stdout.is_empty());
//! assert!(stderr.is_empty());
//! ```

mod command;
mod execute;
mod invocation;
mod render;


use std::ffi::OsString;
use std::io::Write;

pub use crate::command::{API_KEY_ENV, PROGRAM_NAME, URL_ENV};
pub use crate::execute::USAGE_EXIT_CODE;
use crate::invocation::Parsed;

/// Largest exit code representable by the process.
const MAX_EXIT_CODE: i32 = u8::MAX as i32;

/// Runs the CLI using the provided arguments and output handles.
///
/// Returns the process exit code.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
    Out: Write,
    Err: Write,
{
    let invocation = match invocation::parse(arguments) {
        Parsed::Run(invocation) => invocation,
        Parsed::Info(text) => {
            return if stdout.write_all(text.as_bytes()).is_ok() {
                0
            } else {
                USAGE_EXIT_CODE
            };
        }
        Parsed::Usage(text) => {
            let _ = stderr.write_all(text.as_bytes());
            return USAGE_EXIT_CODE;
        }
    };

    logging::init_tracing(invocation.globals.verbosity);

    let site = match execute::connect(&invocation.globals) {
        Ok(site) => site,
        Err(message) => {
            tracing::debug!(target: "sitewarden::cli", %message, "could not build the site client");
            let _ = writeln!(stderr, "{PROGRAM_NAME}: {message}");
            return USAGE_EXIT_CODE;
        }
    };
    execute::execute(&site, &invocation, stdout, stderr)
}

/// Converts a status returned by [`run`] into a process exit code.
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, MAX_EXIT_CODE);
    std::process::ExitCode::from(clamped as u8)
}
