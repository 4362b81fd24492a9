//! Page rendering adapters.

mod static_page;

pub use static_page::StaticPageRenderer;
