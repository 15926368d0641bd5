//! SVG rendering of a layout simulation.
//!
//! Reads node and edge positions from the simulation; never mutates it.
//! Links are drawn first so nodes and titles sit on top of them.

use crate::controller::InteractionState;
use crate::simulation::LayoutSimulation;
use crate::vect2::Vect2;
use std::fmt::Write;

use super::components::html_escape;

#[derive(Debug, Clone)]
pub struct SvgTheme {
    pub background: &'static str,
    pub node_fill: &'static str,
    pub node_grabbed_fill: &'static str,
    pub node_stroke: &'static str,
    pub node_stroke_width: f64,
    pub title_color: &'static str,
    pub title_outline: &'static str,
    pub title_font_size: f64,
    pub title_font_family: &'static str,
    pub link_stroke: &'static str,
    pub link_grabbed_stroke: &'static str,
    pub link_stroke_width: f64,
    /// Space kept around the outermost nodes.
    pub padding: f64,
}

impl Default for SvgTheme {
    fn default() -> Self {
        Self {
            background: "#252525",
            node_fill: "#57C757",
            node_grabbed_fill: "#65ed68",
            node_stroke: "#36a56e",
            node_stroke_width: 2.0,
            title_color: "#e0e0e0",
            title_outline: "#505050",
            title_font_size: 16.0,
            title_font_family: "sans-serif",
            link_stroke: "#5b695b",
            link_grabbed_stroke: "#becebe",
            link_stroke_width: 2.0,
            padding: 40.0,
        }
    }
}

/// Render the simulation as a standalone `<svg>` element, with positions
/// scaled by `view.scale` around the origin.
pub fn render_graph_svg(sim: &LayoutSimulation, view: &InteractionState, theme: &SvgTheme) -> String {
    let (min, max) = bounds(sim, view, theme);
    let size = max - min;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{:.2} {:.2} {:.2} {:.2}" preserveAspectRatio="xMidYMid meet">"#,
        min.x, min.y, size.x, size.y
    );
    let _ = write!(
        svg,
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
        min.x, min.y, size.x, size.y, theme.background
    );

    // Links
    let _ = write!(svg, r#"<g stroke-width="{}">"#, theme.link_stroke_width);
    for edge in sim.edges() {
        let grabbed = sim.grabbed_index().is_some_and(|i| i == edge.source || i == edge.target);
        let color = if grabbed {
            theme.link_grabbed_stroke
        } else {
            theme.link_stroke
        };
        let start = view.to_display(edge.from);
        let end = view.to_display(edge.to);
        let _ = write!(
            svg,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}"/>"#,
            start.x, start.y, end.x, end.y, color
        );
    }
    svg.push_str("</g>");

    // Nodes
    let _ = write!(
        svg,
        r#"<g stroke="{}" stroke-width="{}">"#,
        theme.node_stroke, theme.node_stroke_width
    );
    for node in sim.nodes() {
        let pos = view.to_display(node.position);
        let fill = if node.grabbed {
            theme.node_grabbed_fill
        } else {
            theme.node_fill
        };
        let _ = write!(
            svg,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}"><title>{}</title></circle>"#,
            pos.x,
            pos.y,
            node.radius,
            fill,
            html_escape(node.title)
        );
    }
    svg.push_str("</g>");

    // Titles
    let _ = write!(
        svg,
        r#"<g font-family="{}" font-size="{:.2}" text-anchor="middle" dominant-baseline="hanging" fill="{}" stroke="{}" stroke-width="3" paint-order="stroke">"#,
        theme.title_font_family, theme.title_font_size, theme.title_color, theme.title_outline
    );
    for node in sim.nodes() {
        let pos = view.to_display(node.position);
        let y = pos.y + node.radius + theme.title_font_size;
        let _ = write!(
            svg,
            r#"<text x="{:.2}" y="{:.2}">{}</text>"#,
            pos.x,
            y,
            html_escape(node.title)
        );
    }
    svg.push_str("</g></svg>");

    svg
}

fn bounds(sim: &LayoutSimulation, view: &InteractionState, theme: &SvgTheme) -> (Vect2, Vect2) {
    let mut min = Vect2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Vect2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);

    for node in sim.nodes() {
        let pos = view.to_display(node.position);
        // leave room below the node for its title
        let below = node.radius + theme.title_font_size * 2.0;
        min.x = min.x.min(pos.x - node.radius);
        min.y = min.y.min(pos.y - node.radius);
        max.x = max.x.max(pos.x + node.radius);
        max.y = max.y.max(pos.y + below);
    }

    if !min.is_finite() || !max.is_finite() {
        min = Vect2::ZERO;
        max = Vect2::ZERO;
    }

    let padding = Vect2::new(theme.padding, theme.padding);
    (min - padding, max + padding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::MemoryNoteSource;
    use crate::graph::GraphBuilder;

    fn settled_simulation() -> LayoutSimulation {
        let source = MemoryNoteSource::new()
            .with_note("A", &["B & C"])
            .with_note("B & C", &[])
            .with_note("lonely", &[]);
        let mut builder = GraphBuilder::new();
        let report = builder.build_from_source(&source).unwrap();
        assert!(report.dangling.is_empty());
        let graph = report.graph.clone();
        let mut sim = LayoutSimulation::new(graph);
        sim.settle(500.0, 16.0);
        sim
    }

    #[test]
    fn test_render_contains_every_node_and_link() {
        let sim = settled_simulation();
        let svg = render_graph_svg(&sim, &InteractionState::default(), &SvgTheme::default());

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert_eq!(svg.matches("<line").count(), 1);
        assert_eq!(svg.matches(SvgTheme::default().link_stroke).count(), 1);
        assert_eq!(svg.matches("<text").count(), 3);
        assert!(svg.contains("B &amp; C"));
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_render_empty_simulation() {
        let sim = LayoutSimulation::new(Default::default());
        let svg = render_graph_svg(&sim, &InteractionState::default(), &SvgTheme::default());
        assert!(svg.contains(r#"viewBox="-40.00 -40.00 80.00 80.00""#));
        assert_eq!(svg.matches("<circle").count(), 0);
    }

    #[test]
    fn test_render_highlights_grabbed_node() {
        let mut sim = settled_simulation();
        let target = sim.node(2).unwrap().position;
        let input = InteractionState {
            pointer: target,
            primary_pressed: true,
            scale: 1.0,
        };
        sim.tick(sim.last_tick().unwrap_or(0.0) + 16.0, &input);
        assert_eq!(sim.grabbed_index(), Some(2));

        let theme = SvgTheme::default();
        let svg = render_graph_svg(&sim, &input, &theme);
        assert_eq!(svg.matches(theme.node_grabbed_fill).count(), 1);
    }
}
