//! Minimal HTML page shell

use axum::response::Html;

use tipline_core::message::escape_html;

/// Wrap already-escaped `body` in a page titled `title`
pub fn page(title: &str, body: &str) -> Html<String> {
    let title = escape_html(title);
    Html(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><h1>{title}</h1>{body}</body></html>"
    ))
}
