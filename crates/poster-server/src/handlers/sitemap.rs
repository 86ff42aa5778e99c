//! Static sitemap

use std::fmt::Write;

use axum::{extract::State, http::header, response::IntoResponse};

use crate::state::AppState;

const PAGES: &[(&str, &str)] = &[
    ("/", "1.0"),
    ("/posters", "0.8"),
    ("/privacy", "0.3"),
    ("/terms", "0.3"),
];

pub async fn sitemap(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        render_sitemap(&state.config.site_url),
    )
}

pub fn render_sitemap(site_url: &str) -> String {
    let base = escape_xml(site_url.trim_end_matches('/'));
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (path, priority) in PAGES {
        let _ = write!(
            xml,
            "  <url>\n    <loc>{base}{path}</loc>\n    <priority>{priority}</priority>\n  </url>\n"
        );
    }
    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
