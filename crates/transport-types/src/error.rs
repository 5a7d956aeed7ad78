// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Error
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use std::panic::Location;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Ray trace error: {0}")]
    RayTrace(String),

    #[error("Solver diverged at iteration {iteration}: {message}")]
    SolverDiverged { iteration: usize, message: String },

    #[error("Invalid solver state: {0}")]
    StateMisuse(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error annotated on its way out by an enclosing routine.
    #[error("{location}: {message}")]
    Context {
        location: String,
        message: String,
        #[source]
        source: Box<TransportError>,
    },
}

pub type TransportResult<T> = Result<T, TransportError>;

impl TransportError {
    /// Innermost error, skipping any context layers.
    pub fn root_cause(&self) -> &TransportError {
        match self {
            TransportError::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Attach caller location and a message to an error being propagated.
pub trait ResultExt<T> {
    fn context(self, message: impl Into<String>) -> TransportResult<T>;
}

impl<T> ResultExt<T> for TransportResult<T> {
    #[track_caller]
    fn context(self, message: impl Into<String>) -> TransportResult<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => {
                let loc = Location::caller();
                Err(TransportError::Context {
                    location: format!("{}:{}", loc.file(), loc.line()),
                    message: message.into(),
                    source: Box::new(e),
                })
            }
        }
    }
}
