use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use str_bundler::{Loader, OnLoadArgs, OnLoadResult, OnResolveArgs, OnResolveResult, Plugin};

lazy_static! {
    static ref SOURCE_FILTER: Regex = Regex::new(r"\.(js|jsx|ts|tsx)$").unwrap();
    // anything that is not a relative path
    static ref EXTERNAL_FILTER: Regex = Regex::new(r"^[^.]").unwrap();
    static ref LOADERS: HashMap<&'static str, Loader> = HashMap::from([
        (".js", Loader::Js),
        (".jsx", Loader::Jsx),
        (".ts", Loader::Ts),
        (".tsx", Loader::Tsx),
    ]);
}

/// Prefixes every source file with an assignment of its own directory to
/// `__dirname`, so tests see where they live rather than where the bundle
/// was written.
pub fn inject_dirname() -> Plugin {
    Plugin::new("inject __dirname").on_load(SOURCE_FILTER.clone(), load_with_dirname)
}

/// Leaves every non-relative import to the runtime's own module resolution.
pub fn external_imports() -> Plugin {
    Plugin::new("external imports").on_resolve(EXTERNAL_FILTER.clone(), mark_external)
}

fn load_with_dirname(args: &OnLoadArgs) -> Result<Option<OnLoadResult>> {
    let code = fs::read_to_string(args.path)
        .with_context(|| format!("cannot read {}", args.path.display()))?;
    let dirname = args.path.parent().unwrap_or(Path::new(""));

    Ok(Some(OnLoadResult {
        contents: format!("__dirname = '{}';{code}", dirname.display()),
        loader: pick_loader(args.path),
    }))
}

fn mark_external(args: &OnResolveArgs) -> Result<Option<OnResolveResult>> {
    Ok(Some(OnResolveResult {
        path: PathBuf::from(args.path),
        external: true,
    }))
}

/// Maps a source extension to its loader.
///
/// Only called for paths that passed the load filter, so any other
/// extension is a bug.
pub fn pick_loader(path: &Path) -> Loader {
    let ext = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    match LOADERS.get(ext.as_str()) {
        Some(loader) => *loader,
        None => panic!("impossible extension: {ext}"),
    }
}
