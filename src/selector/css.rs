//! CSS selector-based selection
//!
//! Uses the scraper crate to match elements, then applies the trailing
//! pseudo-element (`::text`, `::attr(name)`) if there is one.

use scraper::{ElementRef, Selector};

use super::{Document, Node, Scope};
use crate::error::ConfigurationError;

#[derive(Debug, PartialEq)]
enum Accessor {
    Element,
    Text,
    Attr(String),
}

pub(super) fn select(
    doc: &Document,
    scope: Scope<'_>,
    expression: &str,
) -> Result<Vec<Node>, ConfigurationError> {
    let (base, accessor) = split_pseudo(expression)?;
    let base = base.trim();

    let elements: Vec<ElementRef<'_>> = if base.is_empty() {
        // Bare accessor applies to the context node
        match scope {
            Scope::Element(el) => vec![el],
            Scope::Empty => vec![],
            Scope::Document => return Err(invalid(expression, "empty selector")),
        }
    } else {
        let selector = Selector::parse(base).map_err(|e| invalid(expression, &e.to_string()))?;
        match scope {
            Scope::Document => doc.html.select(&selector).collect(),
            Scope::Element(el) => el.select(&selector).collect(),
            Scope::Empty => vec![],
        }
    };

    let nodes = match accessor {
        Accessor::Element => elements
            .into_iter()
            .map(|el| Node::element(doc, el))
            .collect(),
        Accessor::Text => elements
            .into_iter()
            .flat_map(direct_text)
            .map(|text| Node::text(doc, text))
            .collect(),
        Accessor::Attr(name) => elements
            .into_iter()
            .filter_map(|el| el.value().attr(&name))
            .map(|value| Node::attribute(doc, &name, value))
            .collect(),
    };

    Ok(nodes)
}

/// Text nodes that are direct children of the element
pub(super) fn direct_text(el: ElementRef<'_>) -> Vec<String> {
    el.children()
        .filter_map(|child| {
            child.value().as_text().map(|text| {
                let text: &str = text;
                text.to_string()
            })
        })
        .collect()
}

// Split a trailing ::text / ::attr(x) off the selector
fn split_pseudo(input: &str) -> Result<(&str, Accessor), ConfigurationError> {
    let trimmed = input.trim_end();

    if let Some(base) = trimmed.strip_suffix("::text") {
        return Ok((base, Accessor::Text));
    }

    if let Some(pos) = trimmed.rfind("::attr(") {
        let attr_start = pos + 7;
        let attr_name = trimmed[attr_start..]
            .strip_suffix(')')
            .ok_or_else(|| invalid(input, "unterminated ::attr("))?
            .trim();
        if attr_name.is_empty() {
            return Err(invalid(input, "::attr() needs an attribute name"));
        }
        return Ok((&trimmed[..pos], Accessor::Attr(attr_name.to_ascii_lowercase())));
    }

    Ok((trimmed, Accessor::Element))
}

fn invalid(expression: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::Selector {
        dialect: "css",
        expression: expression.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Dialect;

    #[test]
    fn test_css_extract() {
        let html = r#"
        <html>
        <body>
            <div class="price">$19.99</div>
            <div class="price">$29.99</div>
            <a href="/product/123" class="link">Product</a>
        </body>
        </html>
        "#;
        let doc = Document::parse(html);

        let prices: Vec<String> = doc
            .select(Dialect::Css, ".price::text")
            .unwrap()
            .iter()
            .map(Node::extract)
            .collect();
        assert_eq!(prices, vec!["$19.99", "$29.99"]);

        let href = doc.select(Dialect::Css, ".link::attr(href)").unwrap();
        assert_eq!(href[0].extract(), "/product/123");

        let elements = doc.select(Dialect::Css, ".price").unwrap();
        assert_eq!(elements[0].extract(), r#"<div class="price">$19.99</div>"#);
    }

    #[test]
    fn test_text_is_direct_children_only() {
        let doc = Document::parse(r#"<span id="p">Bruno<a href="http://x.org">site</a></span>"#);
        let text = doc.select(Dialect::Css, "#p::text").unwrap();
        assert_eq!(text.len(), 1);
        assert_eq!(text[0].extract(), "Bruno");
    }

    #[test]
    fn test_missing_attribute_is_skipped() {
        let doc = Document::parse(r#"<a href="/x">x</a><a>y</a>"#);
        let hrefs = doc.select(Dialect::Css, "a::attr(href)").unwrap();
        assert_eq!(hrefs.len(), 1);
    }

    #[test]
    fn test_split_pseudo() {
        assert_eq!(split_pseudo("a::text").unwrap(), ("a", Accessor::Text));
        assert_eq!(
            split_pseudo("a.x::attr(HREF)").unwrap(),
            ("a.x", Accessor::Attr("href".to_string()))
        );
        assert_eq!(split_pseudo("div > p").unwrap(), ("div > p", Accessor::Element));
        assert!(split_pseudo("a::attr(href").is_err());
        assert!(split_pseudo("a::attr()").is_err());
    }

    #[test]
    fn test_malformed_selector() {
        let doc = Document::parse("<p>x</p>");
        let err = doc.select(Dialect::Css, "p[[").unwrap_err();
        assert!(matches!(err, ConfigurationError::Selector { dialect: "css", .. }));
        assert!(doc.select(Dialect::Css, "::text").is_err());
    }
}
