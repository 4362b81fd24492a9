//! Minimal server-rendered landing page.
//!
//! The page only tells a visitor who they are signed in as and where the
//! API lives. Interactive clients talk to the JSON and NDJSON endpoints.

use crate::domain::chat::Author;
use crate::ports::{Page, PageRenderer};

#[derive(Debug, Clone)]
pub struct StaticPageRenderer {
    title: String,
}

impl StaticPageRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    fn index(&self, viewer: Option<&Author>) -> String {
        let greeting = match viewer {
            Some(author) => format!(
                "<p>Signed in as <strong>{}</strong>.</p>",
                escape_html(author.as_str())
            ),
            None => "<p>Not signed in. <code>POST /api/login</code> with \
                     <code>{\"name\": \"...\"}</code> to pick a name.</p>"
                .to_string(),
        };

        format!(
            "<!DOCTYPE html>\n\
             <html lang=\"en\">\n\
             <head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
             <body>\n\
             <h1>{title}</h1>\n\
             {greeting}\n\
             <ul>\n\
             <li><code>GET /api/listen</code> streams messages as NDJSON</li>\n\
             <li><code>POST /api/send</code> posts <code>{{\"body\": \"...\"}}</code></li>\n\
             </ul>\n\
             </body>\n\
             </html>\n",
            title = escape_html(&self.title),
            greeting = greeting,
        )
    }
}

impl Default for StaticPageRenderer {
    fn default() -> Self {
        Self::new("Chat Relay")
    }
}

impl PageRenderer for StaticPageRenderer {
    fn render(&self, page: Page<'_>) -> String {
        match page {
            Page::Index { viewer } => self.index(viewer),
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
