//! Script section compiler.
//!
//! Produces the script half of an assembled component: dialect scripts are
//! transpiled first, then the default export is turned into a local
//! `script` binding so the assembled module can normalize it before
//! exporting something else.
//!
//! The rewrite tries a cheap textual fast path and only accepts it when
//! nothing before the match could open a string, comment, template literal
//! or regex. Everything else goes through a real parse, so an
//! `export default` inside a string or comment is never touched.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::Statement;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use regex::Regex;
use tracing::{debug, warn};

use crate::compile::{ScriptLoader, ScriptTranspiler};
use crate::descriptor::Section;
use crate::SfcError;

lazy_static! {
    static ref DEFAULT_EXPORT_RE: Regex = Regex::new(r"((?:^|\n|;)\s*)export default").unwrap();
}

const DEFAULT_EXPORT: &str = "export default";
const BINDING: &str = "var script =";
/// Local name for a default re-exported from another module.
const REEXPORTED_DEFAULT: &str = "__script_default";

/// Script binding used when the document has no script section.
pub const EMPTY_SCRIPT: &str = "var script = {}";

/// How the default export was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStrategy {
    /// Single unambiguous statement-boundary match.
    FastPath,
    /// Located through the module's syntax tree.
    Parsed,
    /// The module did not parse; the first statement-boundary match was
    /// rewritten as a best effort.
    Fallback,
    /// No default export; an empty options object was bound instead.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultExportRewrite {
    pub code: String,
    pub strategy: RewriteStrategy,
}

/// Compile the script section (or its absence) into the script binding.
pub async fn compile_script<T: ScriptTranspiler>(
    transpiler: &T,
    script: Option<&Section>,
    logical_path: &str,
) -> Result<String, SfcError> {
    let Some(section) = script else {
        return Ok(EMPTY_SCRIPT.to_string());
    };
    if let Some(src) = section.src.as_deref() {
        if section.content.trim().is_empty() {
            warn!(logical_path, src, "external script `src` is not loaded");
        }
    }

    let code = match script_loader(section.lang.as_deref(), logical_path)? {
        Some(loader) => transpiler
            .transpile(&section.content, logical_path, loader)
            .await
            .map_err(|e| SfcError::Transpile {
                path: logical_path.to_string(),
                message: format!("{:#}", e),
            })?,
        None => section.content.clone(),
    };

    let rewritten = rewrite_default_export(&code);
    debug!(
        logical_path,
        strategy = ?rewritten.strategy,
        "rewrote script default export"
    );
    Ok(rewritten.code)
}

/// Map a section `lang` to the transpiler loader it needs, if any.
pub fn script_loader(lang: Option<&str>, path: &str) -> Result<Option<ScriptLoader>, SfcError> {
    match lang {
        None | Some("js") | Some("mjs") => Ok(None),
        Some("ts") => Ok(Some(ScriptLoader::Ts)),
        Some("tsx") => Ok(Some(ScriptLoader::Tsx)),
        Some("jsx") => Ok(Some(ScriptLoader::Jsx)),
        Some(other) => Err(SfcError::UnsupportedScriptLang {
            path: path.to_string(),
            lang: other.to_string(),
        }),
    }
}

/// Replace the module's default export with `var script = <expr>`,
/// leaving `<expr>` byte-identical.
pub fn rewrite_default_export(code: &str) -> DefaultExportRewrite {
    if let Some(code) = fast_path(code) {
        return DefaultExportRewrite {
            code,
            strategy: RewriteStrategy::FastPath,
        };
    }

    match parsed(code) {
        Ok(Some(code)) => DefaultExportRewrite {
            code,
            strategy: RewriteStrategy::Parsed,
        },
        Ok(None) => missing(code),
        Err(message) => {
            warn!("script did not parse, rewriting textually: {}", message);
            match textual(code) {
                Some(code) => DefaultExportRewrite {
                    code,
                    strategy: RewriteStrategy::Fallback,
                },
                None => missing(code),
            }
        }
    }
}

fn textual(code: &str) -> Option<String> {
    let caps = DEFAULT_EXPORT_RE.captures(code)?;
    let m = caps.get(0)?;
    Some(format!(
        "{}{}{}{}",
        &code[..m.start()],
        &caps[1],
        BINDING,
        &code[m.end()..]
    ))
}

fn fast_path(code: &str) -> Option<String> {
    if code.matches(DEFAULT_EXPORT).count() != 1 {
        return None;
    }
    let m = DEFAULT_EXPORT_RE.find(code)?;
    // Anything that could open a string, comment, template or regex literal
    // before the match makes it ambiguous.
    if code[..m.start()].contains(['\'', '"', '`', '/']) {
        return None;
    }
    textual(code)
}

fn parsed(code: &str) -> Result<Option<String>, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, code, SourceType::mjs()).parse();
    if !ret.errors.is_empty() {
        return Err(ret
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; "));
    }

    for stmt in &ret.program.body {
        match stmt {
            Statement::ExportDefaultDeclaration(decl) => {
                let start = decl.span.start as usize;
                let expr_start = decl.declaration.span().start as usize;
                return Ok(Some(format!(
                    "{}{} {}",
                    &code[..start],
                    BINDING,
                    &code[expr_start..]
                )));
            }
            // `export { options as default }`, optionally `from '...'`
            Statement::ExportNamedDeclaration(decl) => {
                let Some(default_spec) = decl
                    .specifiers
                    .iter()
                    .find(|s| s.exported.name().as_str() == "default")
                else {
                    continue;
                };
                let local = default_spec.local.name();
                let rest: Vec<&str> = decl
                    .specifiers
                    .iter()
                    .filter(|s| s.span != default_spec.span)
                    .map(|s| &code[s.span.start as usize..s.span.end as usize])
                    .collect();
                let replacement = match &decl.source {
                    None if rest.is_empty() => format!("{} {}", BINDING, local.as_str()),
                    None => format!(
                        "export {{ {} }}\n{} {}",
                        rest.join(", "),
                        BINDING,
                        local.as_str()
                    ),
                    Some(source) => {
                        let from = &code[source.span.start as usize..source.span.end as usize];
                        let mut out = String::new();
                        if !rest.is_empty() {
                            out.push_str(&format!("export {{ {} }} from {}\n", rest.join(", "), from));
                        }
                        out.push_str(&format!(
                            "import {{ {} as {} }} from {}\n{} {}",
                            local.as_str(),
                            REEXPORTED_DEFAULT,
                            from,
                            BINDING,
                            REEXPORTED_DEFAULT
                        ));
                        out
                    }
                };
                return Ok(Some(format!(
                    "{}{}{}",
                    &code[..decl.span.start as usize],
                    replacement,
                    &code[decl.span.end as usize..]
                )));
            }
            _ => {}
        }
    }

    Ok(None)
}

fn missing(code: &str) -> DefaultExportRewrite {
    DefaultExportRewrite {
        code: format!("{}\n{}", code, EMPTY_SCRIPT),
        strategy: RewriteStrategy::Missing,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
