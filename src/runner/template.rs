//! Template rendering for scripts, environment variable names and payloads
//!
//! Templates use `{{ expr }}` for output and `{% ... %}` for conditionals and
//! loops. Comments are written `{/* ... */}` so that shell constructs such as
//! `${#array[@]}` pass through untouched. A leading dot on a variable
//! reference (`{{.source}}`) is accepted and means the same as `{{ source }}`.

use crate::error::{TemplateError, TemplateResult};
use minijinja::syntax::SyntaxConfig;
use minijinja::Environment;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::OnceLock;
use tracing::warn;

/// Renders templates with the helper filters and functions registered
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);

        match SyntaxConfig::builder().comment_delimiters("{/*", "*/}").build() {
            Ok(syntax) => env.set_syntax(syntax),
            Err(e) => warn!(error = %e, "falling back to the default template syntax"),
        }

        env.add_function("env", env_var);
        env.add_filter("trim_prefix", trim_prefix);
        env.add_filter("trim_suffix", trim_suffix);
        env.add_filter("snake_case", snake_case);
        env.add_filter("kebab_case", kebab_case);

        Renderer { env }
    }

    /// Render `template` against `ctx`
    pub fn render<S: Serialize>(&self, template: &str, ctx: S) -> TemplateResult<String> {
        let source = strip_leading_dots(template);
        self.env
            .render_str(&source, ctx)
            .map_err(|e| TemplateError {
                template: template.to_string(),
                message: e.to_string(),
            })
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Render `template` with the shared renderer
pub fn render<S: Serialize>(template: &str, ctx: S) -> TemplateResult<String> {
    static RENDERER: OnceLock<Renderer> = OnceLock::new();
    RENDERER.get_or_init(Renderer::new).render(template, ctx)
}

/// Rewrite `{{.name}}` into `{{name}}`
fn strip_leading_dots(template: &str) -> Cow<'_, str> {
    static LEADING_DOT: OnceLock<Option<Regex>> = OnceLock::new();
    let re = LEADING_DOT.get_or_init(|| Regex::new(r"(\{\{-?\s*)\.([A-Za-z_])").ok());
    match re {
        Some(re) => re.replace_all(template, "${1}${2}"),
        None => Cow::Borrowed(template),
    }
}

fn env_var(name: String) -> String {
    std::env::var(name).unwrap_or_default()
}

fn trim_prefix(value: String, prefix: String) -> String {
    value
        .strip_prefix(prefix.as_str())
        .map(str::to_string)
        .unwrap_or(value)
}

fn trim_suffix(value: String, suffix: String) -> String {
    value
        .strip_suffix(suffix.as_str())
        .map(str::to_string)
        .unwrap_or(value)
}

fn snake_case(value: String) -> String {
    split_words(&value).join("_")
}

fn kebab_case(value: String) -> String {
    split_words(&value).join("-")
}

/// Lower-cased words split on separators and lower-to-upper case changes
fn split_words(value: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in value.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
}
