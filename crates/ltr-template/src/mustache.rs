//! Mustache template engine.
//!
//! Templates are rendered into JSON documents, so substituted values are
//! JSON-string escaped unless referenced with `{{{name}}}` or `{{& name}}`.

use serde_json::Value;
use tracing::debug;

use ltr_core::{
    CompiledTemplate, RenderError, TemplateEngine, TemplateOptions, TemplateParams,
    DEFAULT_TEMPLATE_LANG,
};

use crate::parser::{parse, Node};

/// Mustache implementation of the template capability.
#[derive(Debug, Clone, Default)]
pub struct MustacheEngine;

impl MustacheEngine {
    /// Create a new mustache engine.
    pub fn new() -> Self {
        Self
    }
}

impl TemplateEngine for MustacheEngine {
    fn supports_language(&self, lang: &str) -> bool {
        lang == DEFAULT_TEMPLATE_LANG
    }

    fn compile(
        &self,
        source: &str,
        lang: &str,
        options: &TemplateOptions,
    ) -> Result<Box<dyn CompiledTemplate>, RenderError> {
        if !self.supports_language(lang) {
            return Err(RenderError::other(format!(
                "unsupported template language [{}]",
                lang
            )));
        }

        let template = MustacheTemplate::compile(source, *options)?;
        Ok(Box::new(template))
    }
}

/// A compiled mustache template.
#[derive(Debug, Clone)]
pub struct MustacheTemplate {
    nodes: Vec<Node>,
    options: TemplateOptions,
}

impl MustacheTemplate {
    /// Compile template source.
    pub fn compile(source: &str, options: TemplateOptions) -> Result<Self, RenderError> {
        let nodes = parse(source)?;
        debug!("Compiled mustache template into {} nodes", nodes.len());
        Ok(Self { nodes, options })
    }
}

impl CompiledTemplate for MustacheTemplate {
    fn render(&self, params: &TemplateParams) -> Result<String, RenderError> {
        let mut context = Context {
            params,
            stack: Vec::new(),
            strict: self.options.detect_missing_params,
        };
        let mut out = String::new();
        context.render_nodes(&self.nodes, &mut out)?;
        Ok(out)
    }
}

/// Name lookup scope while rendering.
///
/// Section values are pushed onto the stack; the parameters form the root.
struct Context<'a> {
    params: &'a TemplateParams,
    stack: Vec<&'a Value>,
    strict: bool,
}

impl<'a> Context<'a> {
    fn render_nodes(&mut self, nodes: &[Node], out: &mut String) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Variable { name, escape } => {
                    if let Some(value) = self.resolve(name)? {
                        let text = value_text(value);
                        if *escape {
                            out.push_str(&escape_json(&text)?);
                        } else {
                            out.push_str(&text);
                        }
                    }
                }
                Node::Section {
                    name,
                    inverted,
                    children,
                } => {
                    let value = self.lookup(name);
                    if *inverted {
                        if !is_truthy(value) {
                            self.render_nodes(children, out)?;
                        }
                        continue;
                    }
                    match value {
                        Some(Value::Array(items)) => {
                            for item in items {
                                self.stack.push(item);
                                let rendered = self.render_nodes(children, out);
                                self.stack.pop();
                                rendered?;
                            }
                        }
                        Some(Value::Bool(true)) => self.render_nodes(children, out)?,
                        Some(value) if is_truthy(Some(value)) => {
                            self.stack.push(value);
                            let rendered = self.render_nodes(children, out);
                            self.stack.pop();
                            rendered?;
                        }
                        _ => {}
                    }
                }
                Node::ToJson { name } => {
                    if let Some(value) = self.resolve(name)? {
                        let json = serde_json::to_string(value)
                            .map_err(|e| RenderError::other(e.to_string()))?;
                        out.push_str(&json);
                    }
                }
                Node::Join { name, delimiter } => {
                    if let Some(value) = self.resolve(name)? {
                        // The delimiter is template text and is already escaped
                        let joined = match value {
                            Value::Array(items) => items
                                .iter()
                                .map(|item| escape_json(&value_text(item)))
                                .collect::<Result<Vec<_>, _>>()?
                                .join(delimiter.as_str()),
                            other => escape_json(&value_text(other))?,
                        };
                        out.push_str(&joined);
                    }
                }
            }
        }
        Ok(())
    }

    /// Look up a referenced name, failing in strict mode when it is absent.
    fn resolve(&self, name: &str) -> Result<Option<&'a Value>, RenderError> {
        match self.lookup(name) {
            Some(value) => Ok(Some(value)),
            None if self.strict => Err(RenderError::missing(name)),
            None => Ok(None),
        }
    }

    /// Look up a name: `.` for the current item, otherwise a dotted path
    /// whose first segment is searched from the innermost section outwards.
    fn lookup(&self, name: &str) -> Option<&'a Value> {
        if name == "." {
            return self.stack.last().copied();
        }

        let mut segments = name.split('.');
        let first = segments.next()?;

        let params: &'a TemplateParams = self.params;
        let mut current = self
            .stack
            .iter()
            .rev()
            .find_map(|&frame| frame.as_object().and_then(|object| object.get(first)))
            .or_else(|| params.get(first))?;

        for segment in segments {
            current = match current {
                Value::Object(object) => object.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::String(text)) => !text.is_empty(),
        Some(_) => true,
    }
}

/// Text form of a value; strings are taken verbatim, null renders empty.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Escape text for embedding inside a JSON string literal.
fn escape_json(text: &str) -> Result<String, RenderError> {
    let quoted = serde_json::to_string(text).map_err(|e| RenderError::other(e.to_string()))?;
    Ok(quoted[1..quoted.len() - 1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> TemplateParams {
        serde_json::from_value(value).unwrap()
    }

    fn render(source: &str, value: Value) -> Result<String, RenderError> {
        MustacheEngine::new()
            .compile(source, DEFAULT_TEMPLATE_LANG, &TemplateOptions::strict())?
            .render(&params(value))
    }

    #[test]
    fn test_render_variable() {
        let rendered = render(r#"{"match":{"title":"{{q}}"}}"#, json!({"q": "shoes"})).unwrap();
        assert_eq!(rendered, r#"{"match":{"title":"shoes"}}"#);
    }

    #[test]
    fn test_render_escapes_json() {
        let rendered = render(
            r#"{"match":{"title":"{{q}}"}}"#,
            json!({"q": "say \"hi\"\n\\"}),
        )
        .unwrap();
        assert_eq!(rendered, r#"{"match":{"title":"say \"hi\"\n\\"}}"#);
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["match"]["title"], "say \"hi\"\n\\");
    }

    #[test]
    fn test_render_unescaped_and_numbers() {
        let rendered = render(
            r#"{"range":{"price":{"lte":{{{max}}},"gte":{{&min}}}}}"#,
            json!({"max": 100, "min": 2.5}),
        )
        .unwrap();
        assert_eq!(rendered, r#"{"range":{"price":{"lte":100,"gte":2.5}}}"#);
    }

    #[test]
    fn test_render_dotted_paths() {
        let rendered = render(
            "{{user.name}}/{{user.tags.1}}",
            json!({"user": {"name": "ada", "tags": ["a", "b"]}}),
        )
        .unwrap();
        assert_eq!(rendered, "ada/b");
    }

    #[test]
    fn test_render_sections() {
        let source = "{{#items}}<{{name}}>{{/items}}{{^items}}empty{{/items}}";
        assert_eq!(
            render(source, json!({"items": [{"name": "a"}, {"name": "b"}]})).unwrap(),
            "<a><b>"
        );
        assert_eq!(render(source, json!({"items": []})).unwrap(), "empty");
        // Missing section names are falsy, even in strict mode
        assert_eq!(render(source, json!({})).unwrap(), "empty");
    }

    #[test]
    fn test_render_helpers() {
        let value = json!({"tags": ["x", "y"], "filter": {"term": {"a": 1}}});
        assert_eq!(
            render("{{#toJson}}filter{{/toJson}}", value.clone()).unwrap(),
            r#"{"term":{"a":1}}"#
        );
        assert_eq!(render("{{#join}}tags{{/join}}", value.clone()).unwrap(), "x,y");
        assert_eq!(
            render("{{#join delimiter=' OR '}}tags{{/join}}", value).unwrap(),
            "x OR y"
        );
    }

    #[test]
    fn test_render_join_escapes_items() {
        let rendered = render(
            r#"{"query_string":{"query":"{{#join}}tags{{/join}}"}}"#,
            json!({"tags": ["x\",\"default_field\":\"secret", "a\\b"]}),
        )
        .unwrap();
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(
            parsed,
            json!({"query_string": {"query": "x\",\"default_field\":\"secret,a\\b"}})
        );

        assert_eq!(
            render("{{#join}}tag{{/join}}", json!({"tag": "say \"hi\""})).unwrap(),
            r#"say \"hi\""#
        );
    }

    #[test]
    fn test_missing_parameter_strict() {
        let err = render(r#"{"match":{"title":"{{q}}"}}"#, json!({})).unwrap_err();
        assert_eq!(err, RenderError::missing("q"));

        let err = render("{{#toJson}}filter{{/toJson}}", json!({})).unwrap_err();
        assert_eq!(err, RenderError::missing("filter"));

        let err = render("{{a.b}}", json!({"a": {"c": 1}})).unwrap_err();
        assert_eq!(err, RenderError::missing("a.b"));
    }

    #[test]
    fn test_missing_parameter_lenient() {
        let rendered = MustacheEngine::new()
            .compile(
                r#"{"match":{"title":"{{q}}"}}"#,
                DEFAULT_TEMPLATE_LANG,
                &TemplateOptions::default(),
            )
            .unwrap()
            .render(&TemplateParams::new())
            .unwrap();
        assert_eq!(rendered, r#"{"match":{"title":""}}"#);
    }

    #[test]
    fn test_null_is_present() {
        assert_eq!(render("[{{q}}]", json!({"q": null})).unwrap(), "[]");
    }

    #[test]
    fn test_unsupported_language() {
        let engine = MustacheEngine::new();
        assert!(engine.supports_language("mustache"));
        assert!(!engine.supports_language("painless"));
        assert!(engine
            .compile("{{q}}", "painless", &TemplateOptions::strict())
            .is_err());
    }

    #[test]
    fn test_malformed_template_is_not_missing_parameter() {
        let err = render("{{#a}}unclosed", json!({"a": true})).unwrap_err();
        assert!(matches!(err, RenderError::Other { .. }));
    }
}
