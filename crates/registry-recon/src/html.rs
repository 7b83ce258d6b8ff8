//! Selector-based queries over an HTML document.
//!
//! Connectors depend on [`DocumentQuery`] rather than on `scraper` directly,
//! so their extraction rules can be exercised against any implementation.

use scraper::{Html, Selector};

use crate::error::{RowError, RowResult};

/// Read-only queries over a parsed document. `index` is the 0-based
/// position among all elements matching `selector`, in document order.
pub trait DocumentQuery {
    /// Number of elements matching `selector`.
    fn count(&self, selector: &str) -> RowResult<usize>;

    /// Attribute of the `index`th match; `None` if there is no such match
    /// or it lacks the attribute.
    fn attr(&self, selector: &str, index: usize, attr: &str) -> RowResult<Option<String>>;

    /// Direct text-node children of the `index`th match, each trimmed.
    /// Whitespace-only nodes are kept as empty strings.
    fn own_text(&self, selector: &str, index: usize) -> RowResult<Option<Vec<String>>>;

    /// Full descendant text of the `index`th match, trimmed.
    fn text(&self, selector: &str, index: usize) -> RowResult<Option<String>>;
}

/// [`DocumentQuery`] over a `scraper` parse tree.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    fn nth(&self, selector: &str, index: usize) -> RowResult<Option<scraper::ElementRef<'_>>> {
        let sel = compile(selector)?;
        Ok(self.html.select(&sel).nth(index))
    }
}

fn compile(selector: &str) -> RowResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| RowError::Parse(format!("invalid selector {selector:?}: {e}")))
}

impl DocumentQuery for HtmlDocument {
    fn count(&self, selector: &str) -> RowResult<usize> {
        let sel = compile(selector)?;
        Ok(self.html.select(&sel).count())
    }

    fn attr(&self, selector: &str, index: usize, attr: &str) -> RowResult<Option<String>> {
        Ok(self
            .nth(selector, index)?
            .and_then(|el| el.value().attr(attr).map(str::to_string)))
    }

    fn own_text(&self, selector: &str, index: usize) -> RowResult<Option<Vec<String>>> {
        Ok(self.nth(selector, index)?.map(|el| {
            el.children()
                .filter_map(|child| child.value().as_text())
                .map(|text| text.trim().to_string())
                .collect()
        }))
    }

    fn text(&self, selector: &str, index: usize) -> RowResult<Option<String>> {
        Ok(self
            .nth(selector, index)?
            .map(|el| el.text().collect::<String>().trim().to_string()))
    }
}
