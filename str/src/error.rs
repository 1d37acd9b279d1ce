use std::{io, path::PathBuf};
use thiserror::Error;

/// Failures of the runner itself. These are never folded into a pass/fail
/// verdict.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("cannot create temporary bundle directory")]
    Workspace(#[source] io::Error),

    #[error("test file path is not valid UTF-8: {0:?}")]
    InvalidPath(PathBuf),

    #[error("cannot render test entry")]
    Render(#[source] askama::Error),

    #[error("cannot write bundle")]
    Bundle(#[from] anyhow::Error),

    #[error("cannot launch `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("test process was terminated without an exit status")]
    NoExitStatus,
}
