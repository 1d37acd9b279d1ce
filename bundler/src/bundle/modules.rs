use crate::{Loader, ModuleLoader, ModulePath, ModuleSource};
use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use path_absolutize::Absolutize;
use regex::Regex;
use std::{
    fs,
    path::{Path, PathBuf},
};

lazy_static! {
    // Windows absolute path regex validator.
    static ref WINDOWS_REGEX: Regex = Regex::new(r"^[a-zA-Z]:\\").unwrap();
}

/// Extensions tried, in order, for extension-less imports.
static EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js", "mjs", "cjs", "json"];

/// Picks the default loader for a file from its extension.
pub fn default_loader(path: &Path) -> Option<Loader> {
    let ext = path.extension()?.to_str()?;
    let loader = match ext {
        "js" | "mjs" | "cjs" => Loader::Js,
        "jsx" => Loader::Jsx,
        "ts" | "mts" | "cts" => Loader::Ts,
        "tsx" => Loader::Tsx,
        "json" => Loader::Json,
        _ => return None,
    };
    Some(loader)
}

/// Checks whether a specifier points into the file system rather than at a package.
pub fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == ".."
        || specifier.starts_with('/')
        || WINDOWS_REGEX.is_match(specifier)
}

/// Resolves and loads modules straight from the file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsModuleLoader;

impl FsModuleLoader {
    /// Appends an extension without replacing an existing one (`a.test` -> `a.test.ts`).
    fn append_extension(&self, path: &Path, ext: &str) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(ext);
        PathBuf::from(name)
    }

    /// Resolves import as file.
    fn resolve_as_file(&self, path: &Path) -> Option<PathBuf> {
        // 1. Check if path is already a valid file.
        if path.is_file() {
            return Some(path.to_path_buf());
        }

        // 2. Check if we need to add an extension.
        for ext in EXTENSIONS {
            let candidate = self.append_extension(path, ext);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        // 3. TypeScript sources are imported with their emitted `.js` name.
        if path.extension().is_some_and(|ext| ext == "js") {
            for ext in ["ts", "tsx"] {
                let candidate = path.with_extension(ext);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }

        None
    }

    /// Resolves import as directory using the 'index.[ext]' convention.
    fn resolve_as_directory(&self, path: &Path) -> Option<PathBuf> {
        if !path.is_dir() {
            return None;
        }
        EXTENSIONS
            .iter()
            .map(|ext| path.join(format!("index.{ext}")))
            .find(|candidate| candidate.is_file())
    }
}

impl ModuleLoader for FsModuleLoader {
    fn resolve(&self, base: &Path, specifier: &str) -> Result<ModulePath> {
        if !is_path_specifier(specifier) {
            bail!("Could not resolve \"{specifier}\"");
        }

        let path = Path::new(specifier);
        let path = match path.is_absolute() || WINDOWS_REGEX.is_match(specifier) {
            true => path.absolutize()?.to_path_buf(),
            false => base.join(path).absolutize()?.to_path_buf(),
        };

        match self
            .resolve_as_file(&path)
            .or_else(|| self.resolve_as_directory(&path))
        {
            Some(path) => Ok(path),
            None => bail!("Could not resolve \"{specifier}\""),
        }
    }

    fn load(&self, path: &Path) -> Result<ModuleSource> {
        fs::read_to_string(path)
            .with_context(|| format!("Could not read from file: {}", path.display()))
    }
}

/// Wraps JSON data into a CommonJS module.
pub fn wrap_json(source: &str) -> Result<ModuleSource> {
    let value: serde_json::Value = serde_json::from_str(source)?;
    Ok(format!("module.exports = {value};\n"))
}
