use crate::{
    bundle_tests, run_bundle, runner_code, BuildOutcome, RunnerError, BUNDLE_FILE,
    TEMP_DIR_PREFIX,
};
use std::path::{Path, PathBuf};
use str_bundler::Message;
use tempfile::TempDir;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

/// Test files to run, relative to `cwd`, which is also the directory their
/// imports are resolved against.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RunRequest {
    pub files: Vec<PathBuf>,
    #[builder(setter(into))]
    pub cwd: PathBuf,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct RunnerSettings {
    /// Program the bundle is executed with.
    #[builder(default = "node".to_string(), setter(into))]
    pub runtime: String,
    /// Exported as `NODE_PATH`. Defaults to `<cwd>/node_modules`.
    #[builder(default, setter(strip_option, into))]
    pub node_modules: Option<PathBuf>,
    /// Where temporary bundle directories are created. Defaults to the
    /// system temp dir.
    #[builder(default, setter(strip_option, into))]
    pub temp_root: Option<PathBuf>,
    /// Colorize diagnostics.
    #[builder(default)]
    pub color: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Passed,
    /// The test process exited with a non-zero status.
    Failed { status: i32 },
    BundleFailed { messages: Vec<Message> },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Passed => 0,
            RunOutcome::Failed { status } => *status,
            RunOutcome::BundleFailed { .. } => 1,
        }
    }
}

/// Failure flag accumulated over several runs. Once failed it stays failed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    failed: bool,
}

impl Verdict {
    pub fn record(&mut self, outcome: &RunOutcome) {
        self.failed |= *outcome != RunOutcome::Passed;
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn exit_code(&self) -> i32 {
        i32::from(self.failed)
    }
}

#[derive(Debug, Clone)]
pub struct TestRunner {
    settings: RunnerSettings,
}

impl TestRunner {
    pub fn new(settings: RunnerSettings) -> Self {
        Self { settings }
    }

    /// Bundles all requested files into one script and runs it in a single
    /// process.
    ///
    /// The temporary bundle directory is removed before returning, whatever
    /// the outcome.
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutcome, RunnerError> {
        let workspace = self.workspace()?;
        let outfile = workspace.path().join(BUNDLE_FILE);

        let entry = runner_code(&request.files)?;
        let bundle = match bundle_tests(entry, &request.cwd, &outfile, self.settings.color)? {
            BuildOutcome::Built(path) => path,
            BuildOutcome::Failed(messages) => return Ok(RunOutcome::BundleFailed { messages }),
        };

        let node_path = self.node_path(&request.cwd);
        let status = run_bundle(&self.settings.runtime, &bundle, &node_path).await?;
        info!("{} test file(s) finished with status {}", request.files.len(), status);

        Ok(match status {
            0 => RunOutcome::Passed,
            status => RunOutcome::Failed { status },
        })
    }

    /// Runs every file in its own bundle and process, one after another.
    pub async fn run_isolated(&self, request: &RunRequest) -> Result<Verdict, RunnerError> {
        let mut verdict = Verdict::default();
        for file in &request.files {
            let single = RunRequest {
                files: vec![file.clone()],
                cwd: request.cwd.clone(),
            };
            let outcome = self.run(&single).await?;
            debug!("{}: {:?}", file.display(), outcome);
            verdict.record(&outcome);
        }
        Ok(verdict)
    }

    fn workspace(&self) -> Result<TempDir, RunnerError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_DIR_PREFIX);
        let dir = match &self.settings.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(RunnerError::Workspace)
    }

    fn node_path(&self, cwd: &Path) -> PathBuf {
        match &self.settings.node_modules {
            Some(dir) => cwd.join(dir),
            None => cwd.join("node_modules"),
        }
    }
}
