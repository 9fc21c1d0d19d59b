//! Section compilers and the external toolchain they delegate to.
//!
//! The template-to-render-function compiler and the script dialect
//! transpiler live outside this crate. They are reached through the
//! [`TemplateCompiler`] and [`ScriptTranspiler`] traits so the host can plug
//! in whatever toolchain it runs.

pub mod script;
pub mod template;

use std::future::Future;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Template compiler
// ---------------------------------------------------------------------------

/// Options forwarded to the external template compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateCompileOptions {
    /// On-disk path of the component, for error messages.
    pub filename: String,
    /// Compile in functional-component mode.
    pub is_functional: bool,
    pub is_production: bool,
    /// Base that relative asset URLs in the template resolve against.
    /// Derived from the served path, not the on-disk path.
    pub asset_url_base: String,
}

/// What the template compiler hands back. `code` declares `render` and
/// `staticRenderFns`; `tips` and `errors` are reported, never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCompileOutput {
    pub code: String,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl TemplateCompileOutput {
    /// Decode the JSON payload printed by an out-of-process compiler.
    pub fn from_json(payload: &str) -> anyhow::Result<Self> {
        serde_json::from_str(payload).map_err(|e| anyhow::anyhow!("invalid compiler output JSON: {e}"))
    }
}

pub trait TemplateCompiler: Send + Sync {
    fn compile(
        &self,
        source: &str,
        options: &TemplateCompileOptions,
    ) -> impl Future<Output = anyhow::Result<TemplateCompileOutput>> + Send;
}

// ---------------------------------------------------------------------------
// Script transpiler
// ---------------------------------------------------------------------------

/// Non-native script dialects, named after the transpiler loader that
/// handles them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLoader {
    Ts,
    Tsx,
    Jsx,
}

impl ScriptLoader {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptLoader::Ts => "ts",
            ScriptLoader::Tsx => "tsx",
            ScriptLoader::Jsx => "jsx",
        }
    }
}

pub trait ScriptTranspiler: Send + Sync {
    /// Turn dialect source into plain JavaScript.
    fn transpile(
        &self,
        source: &str,
        path: &str,
        loader: ScriptLoader,
    ) -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// Transpiler for projects that only author native JavaScript.
/// Any dialect script fails the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTranspiler;

impl ScriptTranspiler for NoTranspiler {
    fn transpile(
        &self,
        _source: &str,
        path: &str,
        loader: ScriptLoader,
    ) -> impl Future<Output = anyhow::Result<String>> + Send {
        let message = format!(
            "no transpiler configured for `{}` script in {}",
            loader.as_str(),
            path
        );
        async move { Err(anyhow::anyhow!(message)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiler_output_from_json() {
        let out = TemplateCompileOutput::from_json(
            r#"{"code":"var render = function () {}","errors":["bad v-for"]}"#,
        )
        .unwrap();
        assert_eq!(out.code, "var render = function () {}");
        assert!(out.tips.is_empty());
        assert_eq!(out.errors, vec!["bad v-for".to_string()]);

        assert!(TemplateCompileOutput::from_json("render()").is_err());
    }

    #[test]
    fn options_serialize_for_external_compilers() {
        let options = TemplateCompileOptions {
            filename: "/p/App.vue".into(),
            is_functional: false,
            is_production: true,
            asset_url_base: "/".into(),
        };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["asset_url_base"], "/");
        assert_eq!(serde_json::to_value(ScriptLoader::Tsx).unwrap(), "tsx");
    }

    #[tokio::test]
    async fn no_transpiler_rejects_dialects() {
        let err = NoTranspiler
            .transpile("let a: number", "/A.vue", ScriptLoader::Ts)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("`ts`"));
    }
}
