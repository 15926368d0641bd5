//! HTML templates and the SVG renderer.
//!
//! ## Module Structure
//!
//! - `styles` - CSS for the graph page
//! - `components` - Base HTML template and escaping
//! - `svg` - Renders a layout simulation as SVG

mod components;
mod styles;
mod svg;

pub use components::{base_html, html_escape};
pub use styles::STYLE;
pub use svg::{render_graph_svg, SvgTheme};
