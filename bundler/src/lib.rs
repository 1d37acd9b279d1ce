mod bundle;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use bundle::*;

pub type ModulePath = PathBuf;
pub type ModuleSource = String;

/// Default module resolution and loading, used when no plugin hook claims a
/// specifier or file.
pub trait ModuleLoader {
    fn load(&self, path: &Path) -> Result<ModuleSource>;
    fn resolve(&self, base: &Path, specifier: &str) -> Result<ModulePath>;
}
