//! Embedded demo UI.
//!
//! The pages ship inside the binary so the service deploys as a single
//! artifact: `/` renders the bird card, `/admin` the fault-injection panel,
//! and `/static/style.css` the shared stylesheet.

use axum::http::header;
use axum::response::{Html, IntoResponse};

const INDEX_HTML: &str = include_str!("../assets/index.html");
const ADMIN_HTML: &str = include_str!("../assets/admin.html");
const STYLE_CSS: &str = include_str!("../assets/style.css");

pub(crate) async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub(crate) async fn admin() -> Html<&'static str> {
    Html(ADMIN_HTML)
}

pub(crate) async fn style() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLE_CSS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_pages_reference_their_endpoints() {
        assert!(INDEX_HTML.contains("/shuffle"));
        assert!(INDEX_HTML.contains("/static/style.css"));
        assert!(ADMIN_HTML.contains("error-rate"));
        assert!(ADMIN_HTML.contains("delay"));
        assert!(STYLE_CSS.contains("body"));
    }
}
