//! PageRenderer port - HTML page rendering, kept behind a narrow interface.

use crate::domain::chat::Author;

/// Pages the HTTP adapter can serve.
#[derive(Debug, Clone, Copy)]
pub enum Page<'a> {
    /// Landing page; shows a sign-in form or the signed-in name.
    Index { viewer: Option<&'a Author> },
}

/// Renders pages to HTML.
pub trait PageRenderer: Send + Sync {
    fn render(&self, page: Page<'_>) -> String;
}
