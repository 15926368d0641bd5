//! HTTP route handlers for the graph page and the headless layout API.

use crate::controller::InteractionState;
use crate::graph::error_response;
use crate::simulation::{LayoutSimulation, LayoutSnapshot};
use crate::templates::{base_html, html_escape, render_graph_svg, SvgTheme};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

pub const DEFAULT_LAYOUT_DURATION_MS: f64 = 5000.0;
pub const DEFAULT_LAYOUT_STEP_MS: f64 = 16.0;
pub const MAX_LAYOUT_DURATION_MS: f64 = 60_000.0;
pub const MAX_LAYOUT_TICKS: usize = 10_000;

fn layout_failed(err: tokio::task::JoinError) -> Response {
    error!(error = %err, "layout task failed");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

// ============================================================================
// Index Handler
// ============================================================================

pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = match state.store.graph() {
        Ok(snapshot) => snapshot,
        Err(err) => return error_response(&err),
    };

    let graph = snapshot.graph.as_ref().clone();
    let (nodes, links) = (graph.node_count(), graph.link_count());
    let svg = tokio::task::spawn_blocking(move || {
        let mut sim = LayoutSimulation::new(graph);
        sim.settle(DEFAULT_LAYOUT_DURATION_MS, DEFAULT_LAYOUT_STEP_MS);
        render_graph_svg(&sim, &InteractionState::default(), &SvgTheme::default())
    })
    .await;
    let svg = match svg {
        Ok(svg) => svg,
        Err(err) => return layout_failed(err),
    };

    let mut dangling_html = String::new();
    if !snapshot.dangling.is_empty() {
        dangling_html.push_str("<ul class=\"dangling-list\">");
        for dangling in snapshot.dangling.iter() {
            dangling_html.push_str(&format!("<li>{}</li>", html_escape(&dangling.to_string())));
        }
        dangling_html.push_str("</ul>");
    }

    let html = format!(
        r#"
        <h1>Notes Graph</h1>
        <div class="graph-stats">
            <span><strong>{nodes}</strong> notes</span>
            <span><strong>{links}</strong> links</span>
            <span><strong>{dangling}</strong> dangling links</span>
            <span>built {built_at}</span>
        </div>
        <div class="graph-container">{svg}</div>
        {dangling_html}
        "#,
        nodes = nodes,
        links = links,
        dangling = snapshot.dangling.len(),
        built_at = snapshot.built_at.format("%Y-%m-%d %H:%M:%S UTC"),
        svg = svg,
        dangling_html = dangling_html,
    );

    Html(base_html("Notes Graph", &html)).into_response()
}

// ============================================================================
// Layout API
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LayoutQuery {
    /// Virtual milliseconds to simulate.
    pub duration: Option<f64>,
    /// Milliseconds per tick.
    pub step: Option<f64>,
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

pub async fn layout_api(
    Query(query): Query<LayoutQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let duration = query.duration.unwrap_or(DEFAULT_LAYOUT_DURATION_MS);
    let step = query.step.unwrap_or(DEFAULT_LAYOUT_STEP_MS);
    if !duration.is_finite() || duration < 0.0 {
        return bad_request("duration must be a non-negative number of milliseconds");
    }
    if !step.is_finite() || step <= 0.0 {
        return bad_request("step must be a positive number of milliseconds");
    }
    let duration = duration.min(MAX_LAYOUT_DURATION_MS);
    if (duration / step).ceil() > MAX_LAYOUT_TICKS as f64 {
        return bad_request("duration / step exceeds the tick limit");
    }

    let snapshot = match state.store.graph() {
        Ok(snapshot) => snapshot,
        Err(err) => return error_response(&err),
    };

    let graph = snapshot.graph.as_ref().clone();
    let layout = tokio::task::spawn_blocking(move || -> LayoutSnapshot {
        let mut sim = LayoutSimulation::new(graph);
        sim.settle(duration, step);
        sim.snapshot()
    })
    .await;

    match layout {
        Ok(layout) => Json(layout).into_response(),
        Err(err) => layout_failed(err),
    }
}
