use crate::RunnerError;
use std::{path::Path, process::Stdio};
use tokio::process::Command;
use tracing::debug;

/// Executes `bundle` with `runtime`, inheriting the terminal, and waits for
/// it. `node_path` replaces any inherited `NODE_PATH`.
///
/// Returns the child's exit code.
pub async fn run_bundle(
    runtime: &str,
    bundle: &Path,
    node_path: &Path,
) -> Result<i32, RunnerError> {
    debug!(
        "running {} {} with NODE_PATH={}",
        runtime,
        bundle.display(),
        node_path.display()
    );
    let status = Command::new(runtime)
        .arg(bundle)
        .env("NODE_PATH", node_path)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|source| RunnerError::Spawn {
            program: runtime.to_string(),
            source,
        })?;

    debug!("test process exited with {status}");
    status.code().ok_or(RunnerError::NoExitStatus)
}
