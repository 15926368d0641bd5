//! Notes graph library - re-exports for testing and external use.
//!
//! Builds an undirected link graph from a collection of notes, runs a
//! force-directed layout over it and serves both over HTTP.

use axum::{routing::get, Router};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod controller;
pub mod error;
pub mod graph;
pub mod handlers;
pub mod models;
pub mod notes;
pub mod simulation;
pub mod templates;
pub mod vect2;

// ============================================================================
// Configuration
// ============================================================================

pub const NOTES_DIR: &str = "notes";
pub const DEFAULT_ADDR: &str = "127.0.0.1:8003";

#[derive(Debug, Clone)]
pub struct Config {
    pub notes_dir: PathBuf,
    pub addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notes_dir: PathBuf::from(NOTES_DIR),
            addr: DEFAULT_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Read `NOTES_DIR` and `NOTES_GRAPH_ADDR`, falling back to the defaults
    /// for anything unset or empty.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            notes_dir: var("NOTES_DIR").map(PathBuf::from).unwrap_or(defaults.notes_dir),
            addr: var("NOTES_GRAPH_ADDR").unwrap_or(defaults.addr),
        }
    }
}

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub config: Config,
    pub store: graph::GraphStore,
}

impl AppState {
    /// State backed by the Markdown notes in `config.notes_dir`.
    pub fn new(config: Config) -> Self {
        let source = notes::FsNoteSource::new(config.notes_dir.clone());
        Self::with_source(config, source)
    }

    pub fn with_source(config: Config, source: impl notes::NoteSource + 'static) -> Self {
        Self {
            config,
            store: graph::GraphStore::new(source),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// All routes, with every request traced.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/get-notes-graph", get(graph::graph_api))
        .route("/api/layout", get(handlers::layout_api))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Re-export commonly used types
pub use controller::{InteractionState, UserController};
pub use error::{GraphError, NotesError};
pub use graph::{GraphBuilder, GraphSnapshot, GraphStore};
pub use models::{BuildReport, DanglingLink, Graph, GraphNode, Note, SimpleLink};
pub use notes::{extract_references, FsNoteSource, MemoryNoteSource, NoteSource};
pub use simulation::{LayoutSimulation, LayoutSnapshot, SimulationParams};
pub use vect2::Vect2;
