use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("i/o error: {0}")]
    Stream(#[from] io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("serial number {serial} does not refer to an atom (universe has {n_atoms} atoms)")]
    SerialOutOfRange { serial: usize, n_atoms: usize },

    #[error("unknown energy term '{0}'")]
    UnknownTerm(String),

    #[error("no parameters for energy term '{0}' in the structure file")]
    MissingParameters(String),

    #[error("atom {serial} has non-positive mass {mass}")]
    InvalidMass { serial: usize, mass: f64 },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid {setting}: {value}")]
    InvalidSetting { setting: &'static str, value: f64 },

    #[error("{0} has non-finite entries")]
    NonFinite(&'static str),

    #[error("mode {mode} out of range ({n_modes} modes available)")]
    ModeOutOfRange { mode: usize, n_modes: usize },

    #[error("invalid job configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}
