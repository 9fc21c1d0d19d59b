//! Module Assembler - emits the glue module served for a bare component
//! path.
//!
//! The glue module is generated in a fixed order:
//! 1. render bindings, imported from the template sub-path or declared as
//!    placeholders
//! 2. the `script` binding (already rewritten by the script compiler)
//! 3. style imports and CSS-Modules registration, in document order
//! 4. the normalizer call producing `component`
//! 5. hot-update bootstrap
//! 6. `export default component.exports`
//!
//! **Invariants:**
//! - Output is a pure function of its inputs (no timestamps, no counters)
//! - `script`, `render` and `staticRenderFns` are bound before normalization
//! - `__cssModules` is declared at most once per document
//! - Hot-update records are only created when none exists for the path

use crate::descriptor::SfcDescriptor;
use crate::utils::{self, js_string};

/// Placeholder render bindings for documents without a template.
pub const TEMPLATE_PLACEHOLDER: &str = "var render, staticRenderFns";

/// Marker comment opening the hot-update bootstrap.
pub const HOT_RELOAD_MARKER: &str = "/* hot reload */";

/// Inputs that are not part of the descriptor.
#[derive(Debug, Clone, Copy)]
pub struct AssembleInput<'a> {
    /// Path the browser requested the component under.
    pub logical_path: &'a str,
    /// Compiled script binding (`var script = ...`).
    pub script: &'a str,
    /// Value for `component.options.__file`, if it should be exposed.
    pub file_label: Option<&'a str>,
}

/// Generate the glue module for one component.
pub fn assemble(descriptor: &SfcDescriptor, input: AssembleInput<'_>) -> String {
    let path = input.logical_path;
    let mut code = String::new();

    code.push_str(&template_import(descriptor, path));
    code.push('\n');
    code.push_str(input.script);
    code.push('\n');
    code.push_str(&style_code(descriptor, path));
    code.push_str(&normalizer_call(descriptor, path));

    if let Some(label) = input.file_label {
        code.push_str(&format!("component.options.__file = {}\n", js_string(label)));
    }

    code.push_str(&hot_reload_code(path));
    code.push_str("\nexport default component.exports");
    code
}

fn template_import(descriptor: &SfcDescriptor, logical_path: &str) -> String {
    match descriptor.template {
        Some(_) => format!(
            "import {{ render, staticRenderFns }} from {}",
            js_string(&utils::template_request(logical_path))
        ),
        None => TEMPLATE_PLACEHOLDER.to_string(),
    }
}

/// Style imports, one per section. Plain styles are side-effect imports;
/// CSS-Modules styles are bound to `__style{i}` and registered on the
/// script's options under their module name.
fn style_code(descriptor: &SfcDescriptor, logical_path: &str) -> String {
    let mut code = String::new();
    let mut has_css_modules = false;

    for (i, style) in descriptor.styles.iter().enumerate() {
        match &style.module {
            Some(module) => {
                if !has_css_modules {
                    code.push_str("const __cssModules = script.__cssModules = {}\n");
                    has_css_modules = true;
                }
                let style_var = format!("__style{}", i);
                code.push_str(&format!(
                    "import {} from {}\n",
                    style_var,
                    js_string(&utils::style_module_request(logical_path, i))
                ));
                code.push_str(&format!(
                    "__cssModules[{}] = {}\n",
                    js_string(module.name()),
                    style_var
                ));
            }
            None => {
                code.push_str(&format!(
                    "import {}\n",
                    js_string(&utils::style_request(logical_path, i))
                ));
            }
        }
    }
    code
}

fn normalizer_call(descriptor: &SfcDescriptor, logical_path: &str) -> String {
    let functional = if descriptor.is_functional() {
        "true"
    } else {
        "false"
    };
    let scope_id = if descriptor.has_scoped_style() {
        js_string(&utils::component_id(logical_path))
    } else {
        "null".to_string()
    };

    format!(
        r#"/* normalize component */
import normalizer from {normalizer}
var component = normalizer(
  script,
  render,
  staticRenderFns,
  {functional},
  null,
  {scope_id},
  null,
  null
)
"#,
        normalizer = js_string(utils::NORMALIZER_PATH),
    )
}

/// Hot-update bootstrap. Evaluated again on every module reload, so record
/// creation sits behind an `isRecorded` check.
pub fn hot_reload_code(logical_path: &str) -> String {
    let path = js_string(logical_path);
    format!(
        r#"{marker}
import __VUE_HMR_RUNTIME__ from {runtime}
import vue from "vue"
if (import.meta.hot) {{
  __VUE_HMR_RUNTIME__.install(vue)
  if (__VUE_HMR_RUNTIME__.compatible) {{
    if (!__VUE_HMR_RUNTIME__.isRecorded({path})) {{
      __VUE_HMR_RUNTIME__.createRecord({path}, component.options)
    }}
  }} else {{
    console.warn("[vue-sfc] hot reload is not compatible with this version of Vue.")
  }}
}}"#,
        marker = HOT_RELOAD_MARKER,
        runtime = js_string(utils::HOT_RELOAD_PATH),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
