//! Template rendering for configuration documents and plugin files.
//!
//! Configuration sources and plugin files (profiles, playbooks) may reference
//! variables with `{{ name }}` placeholders. Dotted names (`{{ a.b }}`) walk
//! nested mappings. Rendering is a pure function of the template text and the
//! variables.

use regex_lite::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Errors produced while rendering a template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("undefined template variable '{name}' on line {line}")]
    Undefined { name: String, line: usize },
}

/// Renders template text against a variable mapping.
pub trait TemplateRenderer {
    fn render(&self, template: &str, variables: &Value) -> Result<String, TemplateError>;
}

/// `{{ name }}` substitution renderer.
///
/// Scalars are substituted verbatim, lists and mappings as compact JSON.
/// Referencing a variable that does not exist is an error, except on `#`
/// comment lines where the placeholder is kept as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\s*\}\}")
            .expect("placeholder pattern is valid")
    })
}

fn lookup<'a>(variables: &'a Value, name: &str) -> Option<&'a Value> {
    let mut current = variables;
    for part in name.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Whether the line ending in `before` is a `#` comment.
fn on_comment_line(before: &str) -> bool {
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    before[line_start..].trim_start().starts_with('#')
}

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, template: &str, variables: &Value) -> Result<String, TemplateError> {
        let re = placeholder();
        let mut out = String::with_capacity(template.len());
        let mut last = 0;

        for caps in re.captures_iter(template) {
            let whole = caps.get(0).expect("capture 0 always present");
            let name = &caps[1];
            let before = &template[..whole.start()];
            let text = match lookup(variables, name) {
                Some(value) => to_text(value),
                None if on_comment_line(before) => whole.as_str().to_string(),
                None => {
                    return Err(TemplateError::Undefined {
                        name: name.to_string(),
                        line: before.matches('\n').count() + 1,
                    });
                }
            };
            out.push_str(&template[last..whole.start()]);
            out.push_str(&text);
            last = whole.end();
        }
        out.push_str(&template[last..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_scalar_variables() {
        let vars = json!({"kernel_package": "linux-image-amd64", "count": 3, "flag": true});
        let text = PlaceholderRenderer
            .render("pkg={{ kernel_package }} n={{count}} f={{ flag }}", &vars)
            .unwrap();
        assert_eq!(text, "pkg=linux-image-amd64 n=3 f=true");
    }

    #[test]
    fn test_render_dotted_path() {
        let vars = json!({"network": {"bridge": "lxdbr0"}});
        let text = PlaceholderRenderer
            .render("parent: {{ network.bridge }}", &vars)
            .unwrap();
        assert_eq!(text, "parent: lxdbr0");
    }

    #[test]
    fn test_render_without_placeholders_is_identity() {
        let text = PlaceholderRenderer
            .render("general:\n  compression: xz\n", &json!({}))
            .unwrap();
        assert_eq!(text, "general:\n  compression: xz\n");
    }

    #[test]
    fn test_undefined_variable_is_error() {
        let err = PlaceholderRenderer
            .render("a\nb {{ missing }}", &json!({}))
            .unwrap_err();
        match err {
            TemplateError::Undefined { name, line } => {
                assert_eq!(name, "missing");
                assert_eq!(line, 2);
            }
        }
    }

    #[test]
    fn test_undefined_variable_in_comment_is_kept() {
        let vars = json!({"bridge": "lxdbr0"});
        let text = PlaceholderRenderer
            .render("# see {{ ansible_host }} on {{ bridge }}\nparent: {{ bridge }}\n", &vars)
            .unwrap();
        assert_eq!(text, "# see {{ ansible_host }} on lxdbr0\nparent: lxdbr0\n");

        let err = PlaceholderRenderer
            .render("value: x # {{ ansible_host }}\n", &vars)
            .unwrap_err();
        assert!(matches!(err, TemplateError::Undefined { line: 1, .. }));
    }

    #[test]
    fn test_render_list_as_json() {
        let vars = json!({"components": ["main", "contrib"]});
        let text = PlaceholderRenderer.render("{{ components }}", &vars).unwrap();
        assert_eq!(text, r#"["main","contrib"]"#);
    }
}
