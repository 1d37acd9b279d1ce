use crate::{external_imports, inject_dirname, RunnerError};
use std::path::{Path, PathBuf};
use str_bundler::{
    build, format_messages, BuildOptions, FormatMessagesOptions, Loader, Message, Platform,
    StdinOptions,
};
use tracing::debug;

#[derive(Debug)]
pub enum BuildOutcome {
    /// The bundle was written to this path.
    Built(PathBuf),
    /// The build reported errors. They have already been printed to stderr.
    Failed(Vec<Message>),
}

/// Bundles the entry source, with `project_dir` as the directory its imports
/// resolve against, into a single Node script at `outfile`.
pub fn bundle_tests(
    entry: String,
    project_dir: &Path,
    outfile: &Path,
    color: bool,
) -> Result<BuildOutcome, RunnerError> {
    let options = BuildOptions {
        stdin: Some(StdinOptions {
            contents: entry,
            resolve_dir: project_dir.to_path_buf(),
            sourcefile: "stdin".to_string(),
            loader: Loader::Js,
        }),
        outfile: outfile.to_path_buf(),
        abs_working_dir: Some(project_dir.to_path_buf()),
        bundle: true,
        write: true,
        platform: Platform::Node,
        plugins: vec![external_imports(), inject_dirname()],
        ..Default::default()
    };
    let result = build(&options)?;

    if !result.errors.is_empty() {
        debug!("bundling failed with {} error(s)", result.errors.len());
        for formatted in format_messages(&result.errors, FormatMessagesOptions { color }) {
            eprint!("{formatted}");
        }
        return Ok(BuildOutcome::Failed(result.errors));
    }

    Ok(BuildOutcome::Built(outfile.to_path_buf()))
}
