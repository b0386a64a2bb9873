//! fOS HTML Parser
//!
//! Turns server-rendered markup into documents and fragments, built on html5ever.

mod parser;

pub use fos_dom::{Document, Fragment, FragmentNode};
pub use parser::HtmlParser;

/// Parse an HTML string into a document
pub fn parse(html: &str) -> Result<Document, ParseError> {
    HtmlParser::new().parse(html)
}

/// Parse an HTML string into detached body-level nodes
pub fn parse_fragment(html: &str) -> Result<Fragment, ParseError> {
    HtmlParser::new().parse_fragment(html)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to read markup: {0}")]
    Io(#[from] std::io::Error),

    #[error("DOM error: {0}")]
    Dom(#[from] fos_dom::DomError),
}
