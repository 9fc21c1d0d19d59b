//! Template section compiler.
//!
//! Hands the template body to the external compiler and turns its output
//! into a module exporting `render` and `staticRenderFns`. Compiler tips and
//! errors are logged and returned as diagnostics; the module is still
//! emitted so the rest of the page keeps working.

use tracing::{error, warn};

use crate::compile::{TemplateCompileOptions, TemplateCompiler};
use crate::descriptor::Section;
use crate::utils;
use crate::{Diagnostic, DiagnosticLevel, SfcError};

/// A compiled template sub-module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateModule {
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl TemplateModule {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.level == DiagnosticLevel::Error)
    }
}

/// Compile one template section.
///
/// `file_path` is where the document lives on disk, `logical_path` is the
/// path the browser requested it under.
pub async fn compile_template<C: TemplateCompiler>(
    compiler: &C,
    section: &Section,
    file_path: &str,
    logical_path: &str,
    is_production: bool,
) -> Result<TemplateModule, SfcError> {
    if let Some(src) = section.src.as_deref() {
        if section.content.trim().is_empty() {
            warn!(path = file_path, src, "external template `src` is not loaded");
        }
    }

    let options = TemplateCompileOptions {
        filename: file_path.to_string(),
        is_functional: section.has_attr("functional"),
        is_production,
        asset_url_base: utils::posix_dirname(logical_path).to_string(),
    };

    let output = compiler
        .compile(&section.content, &options)
        .await
        .map_err(|e| SfcError::TemplateCompiler {
            path: file_path.to_string(),
            message: format!("{:#}", e),
        })?;

    let mut diagnostics = Vec::with_capacity(output.tips.len() + output.errors.len());
    for tip in output.tips {
        warn!(path = file_path, "{}", tip);
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Warning,
            message: tip,
            context: Some(logical_path.to_string()),
        });
    }
    for err in output.errors {
        error!(path = file_path, "{}", err);
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Error,
            message: err,
            context: Some(logical_path.to_string()),
        });
    }

    Ok(TemplateModule {
        code: format!("{}\nexport {{ render, staticRenderFns }}", output.code),
        diagnostics,
    })
}
