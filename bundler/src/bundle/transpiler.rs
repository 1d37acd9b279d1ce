use crate::{Loader, Location, Message};
use std::collections::HashMap;
use swc_core::{
    common::{
        comments::SingleThreadedComments, sync::Lrc, FileName, Globals, Mark, SourceMap, Span,
        Spanned, GLOBALS,
    },
    ecma::{
        ast::{
            CallExpr, Callee, EsVersion, ExportAll, Expr, ImportDecl, Lit, NamedExport, Program,
        },
        codegen::{text_writer::JsWriter, Emitter},
        parser::{
            error::Error as ParseError, lexer::Lexer, EsConfig, Parser, StringInput, Syntax,
            TsConfig,
        },
        transforms::{
            base::{
                feature::FeatureFlag,
                fixer::fixer,
                helpers::{inject_helpers, Helpers, HELPERS},
                hygiene::hygiene,
                resolver,
            },
            module::{common_js, util::ImportInterop},
            react::jsx,
            typescript::strip,
        },
        visit::{FoldWith, Visit, VisitMut, VisitMutWith, VisitWith},
    },
};

/// Called for every `require("<specifier>")` left after the module transform.
/// Returning `Some(id)` rewrites the specifier to `id`.
pub type RequireResolver<'a> = dyn FnMut(&str, Option<Location>) -> Option<String> + 'a;

pub struct Transpiler;

impl Transpiler {
    /// Compiles a module into a CommonJS function body.
    pub fn compile(
        name: &str,
        source: &str,
        loader: Loader,
        resolve: &mut RequireResolver,
    ) -> Result<String, Vec<Message>> {
        let globals = Globals::default();
        let cm: Lrc<SourceMap> = Default::default();
        let comments = SingleThreadedComments::default();

        let fm = cm.new_source_file(FileName::Custom(name.into()), source.into());

        let lexer = Lexer::new(
            syntax(loader),
            EsVersion::latest(),
            StringInput::from(&*fm),
            Some(&comments),
        );
        let mut parser = Parser::new_from(lexer);
        let parsed = parser.parse_module();

        let mut errors: Vec<Message> = parser
            .take_errors()
            .into_iter()
            .map(|e| parse_error(&cm, name, e))
            .collect();
        let module = match parsed {
            Ok(module) if errors.is_empty() => module,
            Ok(_) => return Err(errors),
            Err(e) => {
                errors.push(parse_error(&cm, name, e));
                return Err(errors);
            }
        };

        // This is where we're gonna store the JavaScript output.
        let mut buffer = vec![];

        GLOBALS.set(&globals, || {
            HELPERS.set(&Helpers::new(false), || {
                let unresolved_mark = Mark::new();
                let top_level_mark = Mark::new();

                let mut spans = ImportSpans::default();
                module.visit_with(&mut spans);

                let mut program = Program::Module(module).fold_with(&mut resolver(
                    unresolved_mark,
                    top_level_mark,
                    loader.is_typescript(),
                ));

                if loader.is_jsx() {
                    program = program.fold_with(&mut jsx(
                        cm.clone(),
                        Some(comments.clone()),
                        Default::default(),
                        top_level_mark,
                        unresolved_mark,
                    ));
                }
                if loader.is_typescript() {
                    program = program.fold_with(&mut strip(top_level_mark));
                }

                let config = common_js::Config {
                    import_interop: Some(ImportInterop::Swc),
                    ignore_dynamic: false,
                    ..Default::default()
                };
                program = program.fold_with(&mut common_js::common_js(
                    unresolved_mark,
                    config,
                    FeatureFlag::empty(),
                    Some(comments.clone()),
                ));

                program.visit_mut_with(&mut RequireRewriter {
                    cm: &cm,
                    name,
                    spans: &spans.0,
                    resolve,
                });

                let program = program
                    .fold_with(&mut inject_helpers(unresolved_mark))
                    .fold_with(&mut hygiene())
                    .fold_with(&mut fixer(Some(&comments)));

                let mut emitter = Emitter {
                    cfg: Default::default(),
                    cm: cm.clone(),
                    comments: Some(&comments),
                    wr: JsWriter::new(cm.clone(), "\n", &mut buffer, None),
                };
                emitter.emit_program(&program)
            })
        })
        .map_err(|e| vec![Message::new(format!("Failed to generate code for {name}: {e}"))])?;

        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

fn syntax(loader: Loader) -> Syntax {
    match loader {
        Loader::Ts | Loader::Tsx => Syntax::Typescript(TsConfig {
            tsx: loader == Loader::Tsx,
            ..Default::default()
        }),
        Loader::Js | Loader::Jsx | Loader::Json => Syntax::Es(EsConfig {
            jsx: loader == Loader::Jsx,
            ..Default::default()
        }),
    }
}

fn parse_error(cm: &SourceMap, name: &str, e: ParseError) -> Message {
    Message::new(e.kind().msg()).with_location(span_location(cm, name, e.span()))
}

pub(crate) fn span_location(cm: &SourceMap, name: &str, span: Span) -> Option<Location> {
    if span.is_dummy() {
        return None;
    }
    let loc = cm.lookup_char_pos(span.lo);
    let line_text = loc
        .file
        .get_line(loc.line - 1)
        .map(|line| line.to_string())
        .unwrap_or_default();

    Some(Location {
        file: name.to_string(),
        line: loc.line,
        column: loc.col.0,
        line_text,
    })
}

/// Where each specifier first appears in the original source. Requires
/// generated by the module transform do not always keep that span.
#[derive(Default)]
struct ImportSpans(HashMap<String, Span>);

impl ImportSpans {
    fn record(&mut self, src: &str, span: Span) {
        self.0.entry(src.to_string()).or_insert(span);
    }
}

impl Visit for ImportSpans {
    fn visit_import_decl(&mut self, decl: &ImportDecl) {
        self.record(&decl.src.value, decl.src.span);
    }

    fn visit_named_export(&mut self, export: &NamedExport) {
        if let Some(src) = &export.src {
            self.record(&src.value, src.span);
        }
    }

    fn visit_export_all(&mut self, export: &ExportAll) {
        self.record(&export.src.value, export.src.span);
    }

    fn visit_call_expr(&mut self, call: &CallExpr) {
        call.visit_children_with(self);

        if matches!(call.callee, Callee::Import(_)) || is_require_call(call) {
            if let Some(Expr::Lit(Lit::Str(src))) = call.args.first().map(|arg| &*arg.expr) {
                self.record(&src.value, src.span);
            }
        }
    }
}

struct RequireRewriter<'a, 'r> {
    cm: &'a SourceMap,
    name: &'a str,
    spans: &'a HashMap<String, Span>,
    resolve: &'a mut RequireResolver<'r>,
}

impl VisitMut for RequireRewriter<'_, '_> {
    fn visit_mut_call_expr(&mut self, call: &mut CallExpr) {
        call.visit_mut_children_with(self);

        if !is_require_call(call) {
            return;
        }
        if let Some(Expr::Lit(Lit::Str(src))) = call.args.first_mut().map(|arg| &mut *arg.expr) {
            let location = span_location(self.cm, self.name, src.span).or_else(|| {
                let span = self.spans.get(&*src.value)?;
                span_location(self.cm, self.name, *span)
            });
            if let Some(id) = (self.resolve)(&src.value, location) {
                src.value = id.into();
                src.raw = None;
            }
        }
    }
}

fn is_require_call(call: &CallExpr) -> bool {
    let Callee::Expr(callee) = &call.callee else {
        return false;
    };
    matches!(&**callee, Expr::Ident(ident) if &*ident.sym == "require") && call.args.len() == 1
}
