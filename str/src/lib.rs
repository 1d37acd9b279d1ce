mod bundle;
mod cli;
mod config;
mod entry;
mod error;
mod hooks;
mod process;
mod runner;

pub use bundle::*;
pub use cli::*;
pub use config::*;
pub use entry::*;
pub use error::*;
pub use hooks::*;
pub use process::*;
pub use runner::*;

/// File name of the bundle inside its temporary directory.
pub const BUNDLE_FILE: &str = "main.js";
pub const TEMP_DIR_PREFIX: &str = "str-bundle";

#[allow(async_fn_in_trait)]
pub trait CmdExector {
    /// Returns the process exit code.
    async fn execute(self) -> anyhow::Result<i32>;
}
