//! Shared HTML components.

use super::styles::STYLE;

// ============================================================================
// Text Escaping
// ============================================================================

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// ============================================================================
// Base Template
// ============================================================================

pub fn base_html(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        {content}
    </div>
</body>
</html>"#,
        title = html_escape(title),
        STYLE = STYLE,
        content = content,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_base_html_escapes_title() {
        let html = base_html("<Graph>", "<p>body</p>");
        assert!(html.contains("<title>&lt;Graph&gt;</title>"));
        assert!(html.contains("<p>body</p>"));
    }
}
