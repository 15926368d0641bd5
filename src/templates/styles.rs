//! CSS styles for the graph page.

// ============================================================================
// CSS Styles
// ============================================================================

pub const STYLE: &str = r#"
:root {
    --bg: #252525;
    --fg: #e0e0e0;
    --muted: #8a8a8a;
    --border: #3a3a3a;
    --link: #57c757;
}

* { box-sizing: border-box; margin: 0; padding: 0; }

body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
    line-height: 1.6;
    color: var(--fg);
    background: var(--bg);
}

.container {
    max-width: 1200px;
    margin: 0 auto;
    padding: 1rem;
}

a { color: var(--link); text-decoration: none; }
a:hover { text-decoration: underline; }

h1 { font-weight: 600; font-size: 1.4rem; margin-bottom: 0.5em; }

.graph-stats {
    display: flex;
    gap: 1.5rem;
    font-size: 0.85rem;
    color: var(--muted);
    margin-bottom: 0.5rem;
}

.graph-container {
    border: 1px solid var(--border);
    border-radius: 4px;
    height: calc(100vh - 160px);
    min-height: 400px;
}
.graph-container svg { width: 100%; height: 100%; display: block; }

.dangling-list {
    font-size: 0.85rem;
    color: var(--muted);
    margin-top: 1rem;
    padding-left: 1.2rem;
}
"#;
