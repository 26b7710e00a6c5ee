//! Field descriptors
//!
//! A descriptor says where one named field lives in a document and how
//! its matches are reshaped before they are stored.

use tracing::warn;

use crate::error::ConfigurationError;
use crate::processors::{self, Processor};
use crate::selector::{Dialect, Document, Node};
use crate::value::Value;

/// Immutable description of one field. Builder methods return a new descriptor.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    dialect: Dialect,
    expression: String,
    auto_extract: bool,
    take_first: bool,
    processors: Vec<Processor>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, dialect: Dialect, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dialect,
            expression: expression.into(),
            auto_extract: false,
            take_first: false,
            processors: Vec::new(),
        }
    }

    pub fn css(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(name, Dialect::Css, expression)
    }

    pub fn xpath(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(name, Dialect::XPath, expression)
    }

    /// Convert matches to their text/attribute content
    pub fn auto_extract(mut self, yes: bool) -> Self {
        self.auto_extract = yes;
        self
    }

    /// Collapse matches to the first one, or `Null`
    pub fn take_first(mut self, yes: bool) -> Self {
        self.take_first = yes;
        self
    }

    /// Append a processor to the chain
    pub fn processor(mut self, processor: Processor) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn processors(mut self, processors: impl IntoIterator<Item = Processor>) -> Self {
        self.processors.extend(processors);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_auto_extract(&self) -> bool {
        self.auto_extract
    }

    pub fn is_take_first(&self) -> bool {
        self.take_first
    }

    pub fn processor_chain(&self) -> &[Processor] {
        &self.processors
    }

    /// Resolve against a document and run the pipeline.
    ///
    /// A malformed expression is an error for the whole pass; a failing
    /// processor only turns this field's value into `Value::Error`.
    pub fn resolve(&self, document: &Document) -> Result<Value, ConfigurationError> {
        let nodes = document.select(self.dialect, &self.expression)?;
        Ok(self.process(nodes))
    }

    /// Run extraction options and processors over already matched nodes
    pub fn process(&self, nodes: Vec<Node>) -> Value {
        let value = self.shape(nodes);
        match processors::apply_chain(&self.processors, value) {
            Ok(value) => value,
            Err((processor, e)) => {
                warn!(field = %self.name, processor = %processor, "processor failed: {}", e);
                Value::Error(format!("{processor}: {e}"))
            }
        }
    }

    fn shape(&self, nodes: Vec<Node>) -> Value {
        if self.auto_extract {
            let texts: Vec<String> = nodes.iter().map(Node::extract).collect();
            if self.take_first {
                // First non-empty match, else the first match
                let pick = texts
                    .iter()
                    .position(|t| !t.is_empty())
                    .unwrap_or(0);
                return texts.into_iter().nth(pick).map(Value::Text).unwrap_or(Value::Null);
            }
            return Value::List(texts.into_iter().map(Value::Text).collect());
        }

        if self.take_first {
            return nodes.into_iter().next().map(Value::Node).unwrap_or(Value::Null);
        }
        Value::List(nodes.into_iter().map(Value::Node).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessorError;

    const HTML: &str = r#"
    <ul>
        <li class="city">  sao paulo  </li>
        <li class="city">recife</li>
    </ul>
    "#;

    #[test]
    fn test_take_first_and_auto_extract() {
        let doc = Document::parse(HTML);

        let field = FieldDescriptor::css("city", "li.city::text")
            .auto_extract(true)
            .take_first(true);
        assert_eq!(field.resolve(&doc).unwrap(), Value::from("  sao paulo  "));

        let field = FieldDescriptor::css("cities", "li.city::text").auto_extract(true);
        assert_eq!(
            field.resolve(&doc).unwrap(),
            Value::from(vec!["  sao paulo  ", "recife"])
        );
    }

    #[test]
    fn test_nodes_kept_without_auto_extract() {
        let doc = Document::parse(HTML);

        let value = FieldDescriptor::css("cities", "li.city").resolve(&doc).unwrap();
        assert_eq!(value.nodes().len(), 2);
        assert_eq!(value.nodes()[1].text_content(), "recife");

        let value = FieldDescriptor::xpath("city", "//li")
            .take_first(true)
            .resolve(&doc)
            .unwrap();
        assert!(value.as_node().is_some());
    }

    #[test]
    fn test_no_match() {
        let doc = Document::parse(HTML);

        let first = FieldDescriptor::css("x", "table td::text")
            .auto_extract(true)
            .take_first(true);
        assert_eq!(first.resolve(&doc).unwrap(), Value::Null);

        let first = FieldDescriptor::css("x", "table td").take_first(true);
        assert_eq!(first.resolve(&doc).unwrap(), Value::Null);

        let all = FieldDescriptor::css("x", "table td::text").auto_extract(true);
        assert_eq!(all.resolve(&doc).unwrap(), Value::List(vec![]));
    }

    #[test]
    fn test_take_first_skips_empty_text() {
        let doc = Document::parse(r#"<a href="">none</a><a href="/x">x</a><p>  <b>bold</b> tail</p>"#);
        let href = FieldDescriptor::xpath("href", "//a/@href")
            .auto_extract(true)
            .take_first(true);
        assert_eq!(href.resolve(&doc).unwrap(), Value::from("/x"));

        // Whitespace is content
        let text = FieldDescriptor::xpath("text", "//p/text()")
            .auto_extract(true)
            .take_first(true);
        assert_eq!(text.resolve(&doc).unwrap(), Value::from("  "));
    }

    #[test]
    fn test_take_first_in_document_order() {
        let doc = Document::parse("<div><p><a>first</a></p><a>second</a></div>");
        let field = FieldDescriptor::xpath("link", "//a/text()")
            .auto_extract(true)
            .take_first(true);
        assert_eq!(field.resolve(&doc).unwrap(), Value::from("first"));
    }

    #[test]
    fn test_processors_run_in_order() {
        let doc = Document::parse(HTML);
        let field = FieldDescriptor::css("city", "li.city::text")
            .auto_extract(true)
            .take_first(true)
            .processors([processors::strip(), processors::uppercase()]);
        assert_eq!(field.resolve(&doc).unwrap(), Value::from("SAO PAULO"));
    }

    #[test]
    fn test_processor_failure_marks_field() {
        let doc = Document::parse(HTML);
        let field = FieldDescriptor::css("city", "li.city")
            .take_first(true)
            .processor(Processor::new("explode", |_| Err(ProcessorError::msg("bad input"))));
        assert_eq!(
            field.resolve(&doc).unwrap(),
            Value::Error("explode: bad input".to_string())
        );
    }

    #[test]
    fn test_malformed_expression() {
        let doc = Document::parse(HTML);
        assert!(FieldDescriptor::xpath("x", "//li[").resolve(&doc).is_err());
    }
}
