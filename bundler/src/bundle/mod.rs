mod message;
mod modules;
mod plugin;
mod transpiler;

use crate::ModuleLoader;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::{
    collections::{HashMap, VecDeque},
    env,
    fmt::Write,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

pub use message::{format_messages, FormatMessagesOptions, Location, Message};
pub use modules::{default_loader, is_path_specifier, wrap_json, FsModuleLoader};
pub use plugin::{
    LoadCallback, Loader, OnLoad, OnLoadArgs, OnLoadResult, OnResolve, OnResolveArgs,
    OnResolveResult, Plugin, ResolveCallback, ResolveKind,
};
pub use transpiler::Transpiler;

use plugin::{run_on_load, run_on_resolve, HookError};

const RUNTIME: &str = include_str!("../js/runtime.js");

/// Target environment of the bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Platform {
    /// External modules are loaded with the host's `require`.
    #[default]
    Node,
    /// External modules throw when required.
    Browser,
}

/// An entry module given as in-memory source instead of a file.
#[derive(Debug, Clone)]
pub struct StdinOptions {
    pub contents: String,
    /// Directory relative imports of the stdin module are resolved against.
    pub resolve_dir: PathBuf,
    /// Name used for the module in diagnostics.
    pub sourcefile: String,
    pub loader: Loader,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub entry_points: Vec<PathBuf>,
    pub stdin: Option<StdinOptions>,
    pub outfile: PathBuf,
    /// Module ids are made relative to this directory. Defaults to the stdin
    /// resolve dir, then the current dir.
    pub abs_working_dir: Option<PathBuf>,
    /// Follow and inline imports. Without it only the entries are transformed.
    pub bundle: bool,
    /// Write the output to `outfile`.
    pub write: bool,
    pub platform: Platform,
    pub plugins: Vec<Plugin>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Result of a build. When `errors` is not empty no output was produced.
#[derive(Debug, Default)]
pub struct BuildResult {
    pub errors: Vec<Message>,
    pub output_files: Vec<OutputFile>,
}

/// Bundles the entries into a single script.
///
/// Problems with the input (syntax errors, unresolved imports, failing hooks)
/// are collected into [`BuildResult::errors`]. Only failing to write the
/// output is returned as an error.
pub fn build(options: &BuildOptions) -> Result<BuildResult> {
    let mut graph = ModuleGraph::new(options)?;

    let mut entries = vec![];
    if let Some(stdin) = &options.stdin {
        entries.push(graph.add_stdin(stdin));
    }
    for entry in &options.entry_points {
        if let Some(id) = graph.add_entry_point(entry) {
            entries.push(id);
        }
    }
    graph.process_queue();

    if !graph.errors.is_empty() {
        debug!("build failed with {} error(s)", graph.errors.len());
        return Ok(BuildResult {
            errors: graph.errors,
            ..Default::default()
        });
    }

    let contents = render(&graph.modules, &entries, options.platform);
    if options.write {
        if let Some(dir) = options.outfile.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&options.outfile, &contents)
            .with_context(|| format!("cannot write to \"{}\"", options.outfile.display()))?;
        info!(
            "bundled {} module(s) into {}",
            graph.modules.len(),
            options.outfile.display()
        );
    }

    Ok(BuildResult {
        output_files: vec![OutputFile {
            path: options.outfile.clone(),
            contents,
        }],
        ..Default::default()
    })
}

enum Source {
    Stdin(StdinOptions),
    File(PathBuf),
}

struct Pending {
    id: String,
    source: Source,
}

struct Loaded {
    contents: String,
    loader: Loader,
    resolve_dir: PathBuf,
}

struct ModuleGraph<'a> {
    options: &'a BuildOptions,
    fs: FsModuleLoader,
    root: PathBuf,
    // module id -> compiled body, in discovery order
    modules: IndexMap<String, String>,
    ids: HashMap<PathBuf, String>,
    queue: VecDeque<Pending>,
    errors: Vec<Message>,
}

impl<'a> ModuleGraph<'a> {
    fn new(options: &'a BuildOptions) -> Result<Self> {
        let root = match (&options.abs_working_dir, &options.stdin) {
            (Some(dir), _) => dir.clone(),
            (None, Some(stdin)) => stdin.resolve_dir.clone(),
            (None, None) => env::current_dir()?,
        };

        Ok(Self {
            options,
            fs: FsModuleLoader,
            root,
            modules: IndexMap::new(),
            ids: HashMap::new(),
            queue: VecDeque::new(),
            errors: vec![],
        })
    }

    fn add_stdin(&mut self, stdin: &StdinOptions) -> String {
        let id = format!("<{}>", stdin.sourcefile);
        self.queue.push_back(Pending {
            id: id.clone(),
            source: Source::Stdin(stdin.clone()),
        });
        id
    }

    fn add_entry_point(&mut self, entry: &Path) -> Option<String> {
        let specifier = entry.to_string_lossy();
        let specifier = match is_path_specifier(&specifier) {
            true => specifier.to_string(),
            false => format!("./{specifier}"),
        };
        let root = self.root.clone();
        self.resolve(
            "",
            &root,
            &specifier,
            ResolveKind::EntryPoint,
            None,
        )
    }

    fn process_queue(&mut self) {
        while let Some(pending) = self.queue.pop_front() {
            if self.modules.contains_key(&pending.id) {
                continue;
            }
            let code = self.compile(&pending).unwrap_or_default();
            self.modules.insert(pending.id, code);
        }
    }

    fn compile(&mut self, pending: &Pending) -> Option<String> {
        let name = display_name(&pending.id).to_string();
        let loaded = match self.load(pending) {
            Ok(loaded) => loaded,
            Err(message) => {
                self.errors.push(message);
                return None;
            }
        };

        if loaded.loader == Loader::Json {
            return match wrap_json(&loaded.contents) {
                Ok(code) => Some(code),
                Err(e) => {
                    self.errors.push(Message::new(format!("Invalid JSON in {name}: {e}")));
                    None
                }
            };
        }

        let importer = pending.id.as_str();
        let resolve_dir = loaded.resolve_dir;
        let mut resolve = |specifier: &str, location: Option<Location>| {
            self.resolve(
                importer,
                &resolve_dir,
                specifier,
                ResolveKind::Require,
                location,
            )
        };

        match Transpiler::compile(&name, &loaded.contents, loaded.loader, &mut resolve) {
            Ok(code) => Some(code),
            Err(messages) => {
                self.errors.extend(messages);
                None
            }
        }
    }

    fn load(&self, pending: &Pending) -> Result<Loaded, Message> {
        let path = match &pending.source {
            Source::Stdin(stdin) => {
                return Ok(Loaded {
                    contents: stdin.contents.clone(),
                    loader: stdin.loader,
                    resolve_dir: stdin.resolve_dir.clone(),
                })
            }
            Source::File(path) => path,
        };

        let resolve_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        match run_on_load(&self.options.plugins, &OnLoadArgs { path }) {
            Ok(Some((plugin, result))) => {
                debug!("loaded {} with plugin {plugin}", pending.id);
                return Ok(Loaded {
                    contents: result.contents,
                    loader: result.loader,
                    resolve_dir,
                });
            }
            Ok(None) => {}
            Err(HookError { plugin, error }) => {
                return Err(Message::new(format!("{error:#}")).with_plugin(plugin));
            }
        }

        let Some(loader) = default_loader(path) else {
            let ext = path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            return Err(Message::new(format!(
                "No loader is configured for \"{ext}\" files: {}",
                display_name(&pending.id)
            )));
        };
        let contents = self
            .fs
            .load(path)
            .map_err(|e| Message::new(format!("{e:#}")))?;

        Ok(Loaded {
            contents,
            loader,
            resolve_dir,
        })
    }

    /// Resolves a specifier to a module id and queues the module. Returns
    /// `None` for external modules and for failures, which are recorded.
    fn resolve(
        &mut self,
        importer: &str,
        resolve_dir: &Path,
        specifier: &str,
        kind: ResolveKind,
        location: Option<Location>,
    ) -> Option<String> {
        if kind == ResolveKind::Require && !self.options.bundle {
            return None;
        }

        let args = OnResolveArgs {
            path: specifier,
            importer,
            resolve_dir,
            kind,
        };
        let path = match run_on_resolve(&self.options.plugins, &args) {
            Ok(Some((plugin, result))) if result.external => {
                debug!("{specifier} marked as external by plugin {plugin}");
                return None;
            }
            Ok(Some((_, result))) => Ok(resolve_dir.join(result.path)),
            Ok(None) => self.fs.resolve(resolve_dir, specifier),
            Err(HookError { plugin, error }) => {
                let message = Message::new(format!("{error:#}"))
                    .with_plugin(plugin)
                    .with_location(location);
                self.errors.push(message);
                return None;
            }
        };

        let path = match path {
            Ok(path) => path,
            Err(e) => {
                self.errors
                    .push(Message::new(e.to_string()).with_location(location));
                return None;
            }
        };

        if let Some(id) = self.ids.get(&path) {
            return Some(id.clone());
        }
        let id = self.module_id(&path);
        debug!("resolved {specifier} from {importer:?} to {id}");
        self.ids.insert(path.clone(), id.clone());
        self.queue.push_back(Pending {
            id: id.clone(),
            source: Source::File(path),
        });
        Some(id)
    }

    fn module_id(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(relative) => {
                let relative: Vec<_> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect();
                format!("./{}", relative.join("/"))
            }
            Err(_) => path.to_string_lossy().to_string(),
        }
    }
}

/// Name of a module as shown in diagnostics.
fn display_name(id: &str) -> &str {
    id.strip_prefix("./").unwrap_or(id)
}

/// Quotes a string as a JavaScript string literal.
fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

fn render(modules: &IndexMap<String, String>, entries: &[String], platform: Platform) -> String {
    let mut out = String::from("(() => {\nvar __modules = {\n");
    for (id, code) in modules {
        let _ = writeln!(
            out,
            "{}: function (module, exports, require, __dirname) {{",
            quote(id)
        );
        out.push_str(code);
        out.push_str("},\n");
    }
    out.push_str("};\n");

    match platform {
        Platform::Node => {
            out.push_str("var __external = require;\nvar __root_dirname = __dirname;\n");
        }
        Platform::Browser => {
            out.push_str(concat!(
                "var __external = function (id) {\n",
                "  throw new Error('Dynamic require of \"' + id + '\" is not supported');\n",
                "};\n",
                "var __root_dirname = \"/\";\n",
            ));
        }
    }
    out.push_str(RUNTIME);

    for entry in entries {
        let _ = writeln!(out, "__require({});", quote(entry));
    }
    out.push_str("})();\n");
    out
}
