//! Name cookie: sign-in identity for posting.
//!
//! There are no accounts. Signing in stores the chosen display name in the
//! `name` cookie, and the cookie is what the publish endpoint trusts.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use std::convert::Infallible;

use crate::domain::chat::Author;

/// Cookie carrying the signed-in display name.
pub const SESSION_COOKIE: &str = "name";

/// Lifetime of the name cookie: one year.
pub const SESSION_MAX_AGE_SECS: u64 = 31_536_000;

/// Display name from the request's name cookie, if any.
///
/// Never rejects: a missing or invalid cookie simply means anonymous.
#[derive(Debug, Clone, Default)]
pub struct SessionAuthor(pub Option<Author>);

impl<S> axum::extract::FromRequestParts<S> for SessionAuthor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let author = cookie_value(&parts.headers, SESSION_COOKIE)
                .and_then(|name| Author::new(name).ok());
            Ok(SessionAuthor(author))
        })
    }
}

/// Finds a cookie by name across all `Cookie` headers.
///
/// Values are read as UTF-8 so non-ASCII display names survive.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| std::str::from_utf8(value.as_bytes()).ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
}

/// `Set-Cookie` header signing `author` in.
pub fn sign_in_cookie(author: &Author) -> Option<(HeaderName, HeaderValue)> {
    let cookie = format!(
        "{}={}; Max-Age={}; Path=/; SameSite=Lax",
        SESSION_COOKIE, author, SESSION_MAX_AGE_SECS
    );
    HeaderValue::from_bytes(cookie.as_bytes())
        .ok()
        .map(|value| (SET_COOKIE, value))
}

/// `Set-Cookie` header clearing the name cookie.
pub fn sign_out_cookie() -> (HeaderName, HeaderValue) {
    (
        SET_COOKIE,
        HeaderValue::from_static("name=; Max-Age=0; Path=/; SameSite=Lax"),
    )
}
