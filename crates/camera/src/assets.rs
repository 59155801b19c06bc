//! Static viewer page and fallback handler.

use axum::http::StatusCode;
use axum::response::Html;

/// Status page with the live stream embedded.
pub const VIEWER_PAGE: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <title>Raspberry Pi Camera Server</title>
        <style>
            body { font-family: Arial; margin: 20px; text-align: center; }
            h1 { color: #333; }
            .viewer {
                max-width: 640px;
                margin: 0 auto;
                border: 1px solid #ccc;
                background: #f0f0f0;
                padding: 10px;
            }
            img { max-width: 100%; border: 1px solid #333; }
        </style>
    </head>
    <body>
        <h1>Raspberry Pi Camera Server</h1>
        <div class="viewer">
            <p>Live Camera Feed:</p>
            <img src="/stream" />
        </div>
    </body>
</html>
"#;

/// Serve the viewer page.
pub async fn viewer_page() -> Html<&'static str> {
    Html(VIEWER_PAGE)
}

/// Unknown paths get a bare 404.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
