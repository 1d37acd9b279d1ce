use anyhow::Result;
use regex::Regex;
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Selects how a module's source text is parsed and transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Loader {
    Js,
    Jsx,
    Ts,
    Tsx,
    Json,
}

impl Loader {
    pub fn is_typescript(self) -> bool {
        matches!(self, Loader::Ts | Loader::Tsx)
    }

    pub fn is_jsx(self) -> bool {
        matches!(self, Loader::Jsx | Loader::Tsx)
    }
}

/// Why a specifier is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveKind {
    EntryPoint,
    Require,
}

#[derive(Debug)]
pub struct OnResolveArgs<'a> {
    /// The specifier as written in the importing module.
    pub path: &'a str,
    /// Id of the importing module, empty for entry points.
    pub importer: &'a str,
    /// Directory relative specifiers are resolved against.
    pub resolve_dir: &'a Path,
    pub kind: ResolveKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnResolveResult {
    pub path: PathBuf,
    /// External modules are left as runtime `require` calls.
    pub external: bool,
}

#[derive(Debug)]
pub struct OnLoadArgs<'a> {
    pub path: &'a Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnLoadResult {
    pub contents: String,
    pub loader: Loader,
}

/// Returning `Ok(None)` passes the specifier on to the next hook.
pub type ResolveCallback = fn(&OnResolveArgs) -> Result<Option<OnResolveResult>>;
pub type LoadCallback = fn(&OnLoadArgs) -> Result<Option<OnLoadResult>>;

/// A resolve hook. The filter is matched against the raw specifier.
#[derive(Clone)]
pub struct OnResolve {
    pub filter: Regex,
    pub callback: ResolveCallback,
}

/// A load hook. The filter is matched against the resolved file path.
#[derive(Clone)]
pub struct OnLoad {
    pub filter: Regex,
    pub callback: LoadCallback,
}

impl fmt::Debug for OnResolve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnResolve")
            .field("filter", &self.filter.as_str())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for OnLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnLoad")
            .field("filter", &self.filter.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Plugin {
    pub name: &'static str,
    pub on_resolve: Vec<OnResolve>,
    pub on_load: Vec<OnLoad>,
}

impl Plugin {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            on_resolve: vec![],
            on_load: vec![],
        }
    }

    pub fn on_resolve(mut self, filter: Regex, callback: ResolveCallback) -> Self {
        self.on_resolve.push(OnResolve { filter, callback });
        self
    }

    pub fn on_load(mut self, filter: Regex, callback: LoadCallback) -> Self {
        self.on_load.push(OnLoad { filter, callback });
        self
    }
}

/// A hook callback failed.
#[derive(Debug)]
pub(crate) struct HookError {
    pub plugin: &'static str,
    pub error: anyhow::Error,
}

/// Runs resolve hooks of all plugins in registration order. The first hook
/// that returns a result wins.
pub(crate) fn run_on_resolve(
    plugins: &[Plugin],
    args: &OnResolveArgs,
) -> Result<Option<(&'static str, OnResolveResult)>, HookError> {
    for plugin in plugins {
        for hook in &plugin.on_resolve {
            if !hook.filter.is_match(args.path) {
                continue;
            }
            match (hook.callback)(args) {
                Ok(Some(result)) => return Ok(Some((plugin.name, result))),
                Ok(None) => {}
                Err(error) => {
                    return Err(HookError {
                        plugin: plugin.name,
                        error,
                    })
                }
            }
        }
    }
    Ok(None)
}

pub(crate) fn run_on_load(
    plugins: &[Plugin],
    args: &OnLoadArgs,
) -> Result<Option<(&'static str, OnLoadResult)>, HookError> {
    let path = args.path.to_string_lossy();
    for plugin in plugins {
        for hook in &plugin.on_load {
            if !hook.filter.is_match(&path) {
                continue;
            }
            match (hook.callback)(args) {
                Ok(Some(result)) => return Ok(Some((plugin.name, result))),
                Ok(None) => {}
                Err(error) => {
                    return Err(HookError {
                        plugin: plugin.name,
                        error,
                    })
                }
            }
        }
    }
    Ok(None)
}
