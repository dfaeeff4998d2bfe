use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tera::{Context, Tera};

use vitrine_core::error::{Result, VitrineError};

const BUNDLED_INTENTION: &str = include_str!("../prompts/intention.toml");

/// A prompt file: named sections of tera template text.
///
/// ```toml
/// system = """You route messages. Tags: {{ available_tags | join(sep=", ") }}"""
/// user = """{{ message }}"""
/// ```
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    sections: BTreeMap<String, String>,
}

impl PromptTemplate {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VitrineError::Template(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let sections: BTreeMap<String, String> =
            toml::from_str(content).map_err(|e| VitrineError::Template(e.to_string()))?;
        Ok(Self { sections })
    }

    /// The intention prompt shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_toml_str(BUNDLED_INTENTION)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// Render each requested section with its own variables, in order.
    pub fn render(&self, requests: &[(&str, &Value)]) -> Result<Vec<String>> {
        requests
            .iter()
            .map(|(section, vars)| self.render_section(section, vars))
            .collect()
    }

    fn render_section(&self, section: &str, vars: &Value) -> Result<String> {
        let source = self
            .sections
            .get(section)
            .ok_or_else(|| VitrineError::Template(format!("missing section '{}'", section)))?;
        let context = match vars {
            Value::Null => Context::new(),
            other => Context::from_value(other.clone())
                .map_err(|e| VitrineError::Template(format!("{}: {}", section, e)))?,
        };
        Tera::one_off(source, &context, false)
            .map_err(|e| VitrineError::Template(format!("{}: {}", section, render_cause(&e))))
    }
}

/// Tera nests the useful message (e.g. the undefined variable) in the source chain.
fn render_cause(err: &tera::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"
system = "Tags: {{ tags | join(sep=', ') }}"
user = "{{ message }}"
"#;

    #[test]
    fn test_render_sections_in_order() {
        let t = PromptTemplate::from_toml_str(SAMPLE).unwrap();
        let vars = json!({"tags": ["Gaming", "Wireless"], "message": "cheapest mouse"});
        let out = t.render(&[("system", &vars), ("user", &vars)]).unwrap();
        assert_eq!(out, vec!["Tags: Gaming, Wireless", "cheapest mouse"]);
    }

    #[test]
    fn test_missing_section_fails() {
        let t = PromptTemplate::from_toml_str(SAMPLE).unwrap();
        let err = t.render(&[("developer", &json!({}))]).unwrap_err();
        assert!(matches!(err, VitrineError::Template(m) if m.contains("developer")));
    }

    #[test]
    fn test_undefined_variable_fails() {
        let t = PromptTemplate::from_toml_str(SAMPLE).unwrap();
        let err = t.render(&[("user", &json!({"other": 1}))]).unwrap_err();
        assert!(matches!(err, VitrineError::Template(m) if m.contains("message")));
    }

    #[test]
    fn test_bundled_prompt_renders() {
        let t = PromptTemplate::bundled().unwrap();
        assert!(t.has_section("system"));
        assert!(t.has_section("user"));
        let vars = json!({
            "message": "Tell me about the Logi Mouse",
            "available_tags": ["Gaming", "Wireless"],
            "available_products": ["Logitech G Pro X Superlight"],
        });
        let out = t.render(&[("system", &vars), ("user", &vars)]).unwrap();
        assert!(out[0].contains("Logitech G Pro X Superlight"));
        assert!(out[0].contains("Wireless"));
        assert!(out[1].contains("Logi Mouse"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intention.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let t = PromptTemplate::load(&path).unwrap();
        assert!(t.has_section("system"));

        let err = PromptTemplate::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, VitrineError::Template(_)));
    }
}
