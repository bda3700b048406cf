//! crates/logging/src/verbosity.rs
//! Verbosity levels selected on the command line.

use std::fmt;
use std::str::FromStr;

/// How much diagnostic output the process emits.
///
/// Levels are ordered: every level includes the output of the levels before it.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Warnings and errors. The default.
    #[default]
    Normal,
    /// Client progress: mutations, verification verdicts, batch summaries.
    Info,
    /// Request-level detail: routing, pacing waits, namespace fallbacks.
    Debug,
    /// Everything, including dependency internals.
    Trace,
}

impl Verbosity {
    /// Maps a repeated `-v` count to a level.
    #[must_use]
    pub const fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Normal,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Returns the `EnvFilter` directive for this level.
    ///
    /// Client targets are raised one step above third-party crates so that
    /// `-vv` does not flood the output with HTTP stack internals.
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Info => "warn,sitewarden=info",
            Self::Debug => "warn,sitewarden=debug",
            Self::Trace => "debug,sitewarden=trace",
        }
    }

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quiet => "quiet",
            Self::Normal => "normal",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a verbosity name is not recognised.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseVerbosityError {
    input: String,
}

impl ParseVerbosityError {
    /// Returns the rejected input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for ParseVerbosityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown log level '{}' (expected quiet, normal, info, debug or trace)",
            self.input
        )
    }
}

impl std::error::Error for ParseVerbosityError {}

impl FromStr for Verbosity {
    type Err = ParseVerbosityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "0" => Ok(Self::Quiet),
            "normal" | "warn" | "warning" => Ok(Self::Normal),
            "info" | "1" => Ok(Self::Info),
            "debug" | "2" => Ok(Self::Debug),
            "trace" | "3" => Ok(Self::Trace),
            _ => Err(ParseVerbosityError {
                input: s.to_owned(),
            }),
        }
    }
}
