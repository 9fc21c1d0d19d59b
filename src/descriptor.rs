//! # Document Parser
//!
//! Splits the raw text of a single-file component into typed sections:
//! at most one `<template>`, at most one `<script>`, any number of
//! `<style>` sections (document order preserved) and any number of custom
//! blocks.
//!
//! The parser only looks at the top level of the document. Section bodies
//! are kept verbatim, with their byte offsets, so downstream compilers see
//! exactly what the author wrote.
//!
//! **Invariants:**
//! - Pure function of `(source, filename)`; never touches the file system
//! - Parsing the same text twice yields equal descriptors
//! - Unbalanced or malformed top-level tags fail the whole document

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

lazy_static! {
    static ref OPEN_TAG_RE: Regex = Regex::new(
        r#"^<([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#
    )
    .unwrap();
    static ref ATTR_RE: Regex = Regex::new(
        r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#
    )
    .unwrap();
    static ref CLOSE_TAG_RE: Regex = Regex::new(r"^</\s*([A-Za-z][A-Za-z0-9-]*)").unwrap();
}

// ---------------------------------------------------------------------------
// Descriptor types
// ---------------------------------------------------------------------------

/// Value of a section attribute. Bare attributes (`scoped`) are flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Flag(bool),
    Text(String),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Flag(_) => None,
        }
    }
}

/// One top-level block of a component document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Raw text between the opening and closing tag.
    pub content: String,
    pub attrs: BTreeMap<String, AttrValue>,
    pub lang: Option<String>,
    pub src: Option<String>,
    /// Byte offset of `content` in the document.
    pub start: usize,
    /// Byte offset one past the end of `content`.
    pub end: usize,
}

impl Section {
    /// Whether the attribute is present at all, with or without a value.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }
}

/// CSS-Modules binding requested by a style section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CssModule {
    /// Bare `module` attribute, bound as `$style`.
    Default,
    /// `module="name"`.
    Named(String),
}

impl CssModule {
    pub const DEFAULT_NAME: &'static str = "$style";

    pub fn name(&self) -> &str {
        match self {
            CssModule::Default => Self::DEFAULT_NAME,
            CssModule::Named(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleSection {
    pub section: Section,
    pub scoped: bool,
    pub module: Option<CssModule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomBlock {
    /// Tag name of the block, e.g. `i18n` or `docs`.
    pub block_type: String,
    pub section: Section,
}

/// Structured view of one component document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SfcDescriptor {
    pub filename: String,
    pub template: Option<Section>,
    pub script: Option<Section>,
    pub styles: Vec<StyleSection>,
    pub customs: Vec<CustomBlock>,
}

impl SfcDescriptor {
    fn empty(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            template: None,
            script: None,
            styles: Vec::new(),
            customs: Vec::new(),
        }
    }

    /// Functional components are flagged on the template section.
    pub fn is_functional(&self) -> bool {
        self.template
            .as_ref()
            .map_or(false, |t| t.has_attr("functional"))
    }

    pub fn has_scoped_style(&self) -> bool {
        self.styles.iter().any(|s| s.scoped)
    }

    pub fn custom_block_types(&self) -> Vec<String> {
        self.customs.iter().map(|c| c.block_type.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("<{tag}> opened at offset {offset} is never closed")]
    UnclosedSection { tag: String, offset: usize },

    #[error("unexpected closing tag </{tag}> at offset {offset}")]
    UnexpectedClosingTag { tag: String, offset: usize },

    #[error("malformed top-level tag at offset {offset}")]
    MalformedTag { offset: usize },

    #[error("duplicate <{tag}> section at offset {offset}: only one is allowed")]
    DuplicateSection { tag: String, offset: usize },

    #[error("comment opened at offset {offset} is never closed")]
    UnclosedComment { offset: usize },
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a component document into its descriptor.
pub fn parse(source: &str, filename: &str) -> Result<SfcDescriptor, ParseError> {
    let mut descriptor = SfcDescriptor::empty(filename);
    // ASCII lowercasing keeps byte offsets intact.
    let lower = source.to_ascii_lowercase();
    let mut pos = 0;

    while let Some(rel) = source[pos..].find('<') {
        let offset = pos + rel;
        let rest = &source[offset..];

        if rest.starts_with("<!--") {
            let end = rest
                .find("-->")
                .ok_or(ParseError::UnclosedComment { offset })?;
            pos = offset + end + 3;
            continue;
        }

        if rest.starts_with("</") {
            let tag = CLOSE_TAG_RE
                .captures(rest)
                .map(|c| c[1].to_string())
                .ok_or(ParseError::MalformedTag { offset })?;
            return Err(ParseError::UnexpectedClosingTag { tag, offset });
        }

        let open = OPEN_TAG_RE
            .captures(rest)
            .ok_or(ParseError::MalformedTag { offset })?;
        let tag = open[1].to_ascii_lowercase();
        let attrs = parse_attrs(&open[2]);
        let self_closing = !open[3].is_empty();
        let content_start = offset + open[0].len();

        let (content_end, next) = if self_closing {
            (content_start, content_start)
        } else {
            // script and style bodies are raw text; everything else may nest
            let nested = !matches!(tag.as_str(), "script" | "style");
            find_close(&lower, content_start, &tag, nested).ok_or_else(|| {
                ParseError::UnclosedSection {
                    tag: tag.clone(),
                    offset,
                }
            })?
        };

        let section = Section {
            content: source[content_start..content_end].to_string(),
            lang: attrs.get("lang").and_then(|v| v.as_text()).map(str::to_string),
            src: attrs.get("src").and_then(|v| v.as_text()).map(str::to_string),
            attrs,
            start: content_start,
            end: content_end,
        };

        match tag.as_str() {
            "template" => {
                if descriptor.template.is_some() {
                    return Err(ParseError::DuplicateSection { tag, offset });
                }
                descriptor.template = Some(section);
            }
            "script" => {
                if descriptor.script.is_some() {
                    return Err(ParseError::DuplicateSection { tag, offset });
                }
                descriptor.script = Some(section);
            }
            "style" => {
                let scoped = section.has_attr("scoped");
                let module = section.attrs.get("module").map(|v| match v {
                    AttrValue::Text(name) if !name.is_empty() => CssModule::Named(name.clone()),
                    _ => CssModule::Default,
                });
                descriptor.styles.push(StyleSection {
                    section,
                    scoped,
                    module,
                });
            }
            _ => descriptor.customs.push(CustomBlock {
                block_type: tag,
                section,
            }),
        }

        pos = next;
    }

    Ok(descriptor)
}

fn parse_attrs(raw: &str) -> BTreeMap<String, AttrValue> {
    ATTR_RE
        .captures_iter(raw)
        .map(|cap| {
            let name = cap[1].to_string();
            let value = cap
                .get(2)
                .or(cap.get(3))
                .or(cap.get(4))
                .map(|m| AttrValue::Text(m.as_str().to_string()))
                .unwrap_or(AttrValue::Flag(true));
            (name, value)
        })
        .collect()
}

/// Find the closing tag for a section whose content starts at `from`.
/// Returns `(content_end, position after the closing tag)`.
fn find_close(lower: &str, from: usize, tag: &str, nested: bool) -> Option<(usize, usize)> {
    let open_pat = format!("<{}", tag);
    let close_pat = format!("</{}", tag);
    let mut depth = 0usize;
    let mut pos = from;

    loop {
        let close = find_tag(lower, pos, &close_pat)?;
        if nested {
            let open = find_tag(lower, pos, &open_pat).filter(|o| *o < close);
            // tags inside comments neither open nor close anything
            let comment = lower[pos..]
                .find("<!--")
                .map(|rel| pos + rel)
                .filter(|c| *c < close && open.map_or(true, |o| *c < o));
            if let Some(comment) = comment {
                let body = comment + "<!--".len();
                pos = body + lower[body..].find("-->")? + "-->".len();
                continue;
            }
            if let Some(open) = open {
                let gt = open + lower[open..].find('>')?;
                if !lower[..gt].ends_with('/') {
                    depth += 1;
                }
                pos = gt + 1;
                continue;
            }
        }
        let gt = close + lower[close..].find('>')?;
        if depth == 0 {
            return Some((close, gt + 1));
        }
        depth -= 1;
        pos = gt + 1;
    }
}

/// Find `pattern` at or after `from` where it is followed by a tag-name
/// boundary, so `<template` does not match `<templates`.
fn find_tag(haystack: &str, from: usize, pattern: &str) -> Option<usize> {
    let mut pos = from;
    while let Some(rel) = haystack[pos..].find(pattern) {
        let at = pos + rel;
        let after = at + pattern.len();
        match haystack[after..].chars().next() {
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => return Some(at),
            _ => pos = after,
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL: &str = r#"<template functional>
  <div class="app"><template v-if="ok"><span>{{ msg }}</span></template></div>
</template>

<script lang="ts">
export default { name: "App" }
</script>

<style scoped>
.app { color: red }
</style>
<style module="classes" lang="scss">
.x { color: blue }
</style>
<i18n locale="en">{ "hello": "Hello" }</i18n>
"#;

    #[test]
    fn parses_all_section_kinds() {
        let d = parse(FULL, "/src/App.vue").unwrap();

        let template = d.template.as_ref().unwrap();
        assert!(template.content.contains(r#"<template v-if="ok">"#));
        assert!(template.content.trim_end().ends_with("</div>"));
        assert!(d.is_functional());

        let script = d.script.as_ref().unwrap();
        assert_eq!(script.lang.as_deref(), Some("ts"));
        assert_eq!(script.content.trim(), r#"export default { name: "App" }"#);

        assert_eq!(d.styles.len(), 2);
        assert!(d.styles[0].scoped);
        assert_eq!(d.styles[0].module, None);
        assert!(!d.styles[1].scoped);
        assert_eq!(d.styles[1].module, Some(CssModule::Named("classes".into())));
        assert_eq!(d.styles[1].section.lang.as_deref(), Some("scss"));

        assert_eq!(d.custom_block_types(), vec!["i18n".to_string()]);
        assert_eq!(
            d.customs[0].section.attrs.get("locale"),
            Some(&AttrValue::Text("en".into()))
        );
    }

    #[test]
    fn offsets_point_at_content() {
        let d = parse(FULL, "App.vue").unwrap();
        let script = d.script.unwrap();
        assert_eq!(&FULL[script.start..script.end], script.content);
    }

    #[test]
    fn missing_sections_are_valid() {
        let d = parse("<template><p>hi</p></template>", "A.vue").unwrap();
        assert!(d.script.is_none());
        assert!(d.styles.is_empty());

        let d = parse("<script>export default {}</script>", "B.vue").unwrap();
        assert!(d.template.is_none());

        let d = parse("<style>.a{}</style>", "C.vue").unwrap();
        assert!(d.template.is_none() && d.script.is_none());
        assert_eq!(d.styles.len(), 1);

        let d = parse("", "D.vue").unwrap();
        assert!(d.template.is_none() && d.script.is_none() && d.styles.is_empty());
    }

    #[test]
    fn bare_module_attribute_uses_default_name() {
        let d = parse("<style module>.a{}</style>", "A.vue").unwrap();
        let module = d.styles[0].module.as_ref().unwrap();
        assert_eq!(module, &CssModule::Default);
        assert_eq!(module.name(), "$style");
    }

    #[test]
    fn script_body_is_raw_text() {
        let src = "<script>\nconst t = '<template>'\nexport default {}\n</script>";
        let d = parse(src, "A.vue").unwrap();
        assert!(d.script.unwrap().content.contains("'<template>'"));
        assert!(d.template.is_none());
    }

    #[test]
    fn top_level_comments_are_skipped() {
        let src = "<!-- <script>nope</script> -->\n<template><b/></template>";
        let d = parse(src, "A.vue").unwrap();
        assert!(d.script.is_none());
        assert_eq!(d.template.unwrap().content, "<b/>");
    }

    #[test]
    fn parse_is_idempotent() {
        let a = parse(FULL, "/src/App.vue").unwrap();
        let b = parse(FULL, "/src/App.vue").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unclosed_section_fails() {
        let err = parse("<template><div></div>", "A.vue").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnclosedSection {
                tag: "template".into(),
                offset: 0
            }
        );
    }

    #[test]
    fn unbalanced_nested_template_fails() {
        let err = parse("<template><template></template>", "A.vue").unwrap_err();
        assert!(matches!(err, ParseError::UnclosedSection { .. }));
    }

    #[test]
    fn commented_closing_tag_inside_template() {
        let src = "<template>\n  <div>\n    <!-- </template> -->\n  </div>\n</template>\n<script>export default {}</script>";
        let d = parse(src, "A.vue").unwrap();
        let template = d.template.unwrap();
        assert!(template.content.contains("<!-- </template> -->"));
        assert!(template.content.trim_end().ends_with("</div>"));
        assert!(d.script.is_some());
    }

    #[test]
    fn commented_opening_tag_inside_template() {
        let src = "<template>\n  <div>\n    <!-- <template v-if=\"old\"> -->\n  </div>\n</template>";
        let d = parse(src, "A.vue").unwrap();
        assert_eq!(
            d.template.unwrap().content,
            "\n  <div>\n    <!-- <template v-if=\"old\"> -->\n  </div>\n"
        );
    }

    #[test]
    fn commented_tags_inside_custom_block() {
        let d = parse("<docs><!-- </docs> --><p>usage</p></docs>", "A.vue").unwrap();
        assert_eq!(d.customs[0].section.content, "<!-- </docs> --><p>usage</p>");
    }

    #[test]
    fn stray_closing_tag_fails() {
        let err = parse("<script></script></style>", "A.vue").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedClosingTag { ref tag, .. } if tag == "style"));
    }

    #[test]
    fn malformed_tag_fails() {
        assert!(matches!(
            parse("< template></template>", "A.vue"),
            Err(ParseError::MalformedTag { offset: 0 })
        ));
    }

    #[test]
    fn duplicate_script_fails() {
        let err = parse("<script></script><script></script>", "A.vue").unwrap_err();
        assert!(matches!(err, ParseError::DuplicateSection { ref tag, .. } if tag == "script"));
    }
}
