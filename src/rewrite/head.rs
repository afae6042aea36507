//! Static markup prepended to every relayed `<head>`.
//!
//! Everything here comes from [`AssetsConfig`]; nothing is derived from
//! upstream content.

use crate::config::AssetsConfig;

/// Build the head markup for the configured assets.
pub fn head_markup(assets: &AssetsConfig) -> String {
    let manifest = escape_attr(&assets.manifest_path);
    let icon = escape_attr(&assets.icon_path);
    let theme = escape_attr(&assets.theme_color);
    let title = escape_attr(&assets.app_title);

    format!(
        concat!(
            r#"<meta charset="UTF-8">"#,
            r#"<meta name="viewport" content="width=device-width, initial-scale=1.0">"#,
            r#"<meta name="theme-color" content="{theme}">"#,
            r#"<meta name="mobile-web-app-capable" content="yes">"#,
            r#"<meta name="apple-mobile-web-app-capable" content="yes">"#,
            r#"<meta name="apple-mobile-web-app-status-bar-style" content="default">"#,
            r#"<meta name="apple-mobile-web-app-title" content="{title}">"#,
            r#"<link rel="manifest" href="{manifest}">"#,
            r#"<link rel="icon" href="{icon}">"#,
            r#"<link rel="apple-touch-icon" href="{icon}">"#,
            "<script>{script}</script>",
        ),
        theme = theme,
        title = title,
        manifest = manifest,
        icon = icon,
        script = registration_script(&assets.service_worker_path),
    )
}

fn registration_script(worker_path: &str) -> String {
    // JSON string literal doubles as a JS string literal; `<` is escaped so the
    // path cannot close the script element.
    let path = serde_json::to_string(worker_path)
        .unwrap_or_else(|_| "\"/sw.js\"".to_string())
        .replace('<', "\\u003c");
    format!(
        "if('serviceWorker' in navigator){{window.addEventListener('load',function(){{\
navigator.serviceWorker.register({path}).catch(function(e){{console.log('SW registration failed',e);}});\
}});}}"
    )
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
