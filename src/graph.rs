//! Notes graph building and serving.
//!
//! This module turns note identities and their outgoing references into a
//! deduplicated, index-based undirected `Graph`, caches the last build until
//! the note source changes, and serves it as JSON.

use crate::error::{GraphError, Result};
use crate::models::{BuildReport, DanglingLink, Graph};
use crate::notes::NoteSource;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

// ============================================================================
// Graph Building
// ============================================================================

/// Builds a `Graph` from note identities and references. Every call to
/// `build` discards the previous graph; callers serialize builds.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    report: BuildReport,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph from the last successful build.
    pub fn graph(&self) -> &Graph {
        &self.report.graph
    }

    /// Build from `(index, title)` identities and `(index, targets)` references.
    ///
    /// Identities must carry indices `0..n` in order. Unresolved targets are
    /// skipped and reported as dangling links; links from a note to itself
    /// are dropped.
    pub fn build<I, R, T, S>(&mut self, identities: I, references: R) -> Result<&BuildReport>
    where
        I: IntoIterator<Item = (usize, String)>,
        R: IntoIterator<Item = (usize, T)>,
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.report = BuildReport::default();

        let mut graph = Graph::new();
        let mut title_index: HashMap<String, usize> = HashMap::new();

        // Nodes
        for (index, title) in identities {
            graph.push_node(index, title.clone())?;
            title_index.insert(title, index);
        }

        // Links
        let mut dangling = Vec::new();
        for (index, targets) in references {
            let source_title = graph
                .node(index)
                .ok_or(GraphError::UnknownNote(index))?
                .title
                .clone();

            for target in targets {
                let target = target.as_ref();
                match title_index.get(target) {
                    None => {
                        warn!(source = %source_title, missing = %target, "note links to missing target");
                        dangling.push(DanglingLink {
                            source_index: index,
                            source_title: source_title.clone(),
                            target: target.to_string(),
                        });
                    }
                    Some(&target_index) if target_index == index => {
                        debug!(note = %source_title, "dropping self-link");
                    }
                    Some(&target_index) => {
                        graph.insert_link(index, target_index);
                    }
                }
            }
        }

        info!(
            nodes = graph.node_count(),
            links = graph.link_count(),
            dangling = dangling.len(),
            "built notes graph"
        );

        self.report = BuildReport { graph, dangling };
        Ok(&self.report)
    }

    pub fn build_from_source(&mut self, source: &dyn NoteSource) -> Result<&BuildReport> {
        let titles = source.titles()?;
        let notes = source.notes()?;
        self.build(
            titles,
            notes.into_iter().map(|(index, note)| (index, note.references)),
        )
    }
}

// ============================================================================
// Graph Store
// ============================================================================

#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub graph: Arc<Graph>,
    pub dangling: Arc<Vec<DanglingLink>>,
    pub built_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreState {
    builder: GraphBuilder,
    cached: Option<(String, GraphSnapshot)>,
    stale: bool,
}

/// Owns a note source and the last graph built from it. The graph is rebuilt
/// lazily when it is marked stale or the source fingerprint changes.
pub struct GraphStore {
    source: Box<dyn NoteSource>,
    state: Mutex<StoreState>,
}

impl GraphStore {
    pub fn new(source: impl NoteSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn mark_stale(&self) {
        info!("graph is stale");
        self.lock().stale = true;
    }

    pub fn graph(&self) -> Result<GraphSnapshot> {
        let mut state = self.lock();
        let fingerprint = self.source.fingerprint()?;

        if let Some((cached_fingerprint, snapshot)) = &state.cached {
            if !state.stale && *cached_fingerprint == fingerprint {
                return Ok(snapshot.clone());
            }
        }

        info!("building graph");
        state.cached = None;
        let report = state.builder.build_from_source(self.source.as_ref())?;
        let snapshot = GraphSnapshot {
            graph: Arc::new(report.graph.clone()),
            dangling: Arc::new(report.dangling.clone()),
            built_at: Utc::now(),
        };
        state.cached = Some((fingerprint, snapshot.clone()));
        state.stale = false;
        Ok(snapshot)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

pub fn error_response(err: &GraphError) -> Response {
    error!(error = %err, "graph build failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}

pub async fn graph_api(State(state): State<Arc<AppState>>) -> Response {
    match state.store.graph() {
        Ok(snapshot) => Json(snapshot.graph.as_ref()).into_response(),
        Err(err) => error_response(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Note;
    use crate::notes::MemoryNoteSource;
    use crate::error::NotesError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn identities(titles: &[&str]) -> Vec<(usize, String)> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| (i, t.to_string()))
            .collect()
    }

    fn links(graph: &Graph) -> Vec<(usize, usize)> {
        graph.links().map(|l| (l.source(), l.target())).collect()
    }

    #[test]
    fn test_build_three_notes_with_dangling_link() {
        let mut builder = GraphBuilder::new();
        let report = builder
            .build(
                identities(&["A", "B", "C"]),
                vec![(0, vec!["B"]), (1, vec!["A", "C"]), (2, vec!["D"])],
            )
            .unwrap();

        let titles: Vec<_> = report.graph.nodes().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        let indices: Vec<_> = report.graph.nodes().iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(links(&report.graph), vec![(0, 1), (1, 2)]);
        assert_eq!(
            report.dangling,
            vec![DanglingLink {
                source_index: 2,
                source_title: "C".into(),
                target: "D".into(),
            }]
        );
    }

    #[test]
    fn test_build_keeps_valid_links_around_dangling_ones() {
        let mut builder = GraphBuilder::new();
        let report = builder
            .build(
                identities(&["A", "B", "C"]),
                vec![(0, vec!["nope", "B", "missing", "C"])],
            )
            .unwrap();
        assert_eq!(links(&report.graph), vec![(0, 1), (0, 2)]);
        assert_eq!(report.dangling.len(), 2);
    }

    #[test]
    fn test_build_drops_self_links() {
        let mut builder = GraphBuilder::new();
        let report = builder
            .build(identities(&["A", "B"]), vec![(0, vec!["A", "B"]), (1, vec!["B"])])
            .unwrap();
        assert_eq!(links(&report.graph), vec![(0, 1)]);
        assert!(report.dangling.is_empty());
        assert!(report.graph.links().all(|l| !l.is_self_loop()));
    }

    #[test]
    fn test_build_links_are_unique_and_normalized() {
        let titles = ["n0", "n1", "n2", "n3", "n4"];
        let references: Vec<(usize, Vec<&str>)> = (0..titles.len())
            .map(|i| (i, titles.iter().rev().copied().chain(titles).collect()))
            .collect();

        let mut builder = GraphBuilder::new();
        let report = builder.build(identities(&titles), references).unwrap();

        // complete graph on five nodes
        assert_eq!(report.graph.link_count(), 10);
        let mut seen = std::collections::HashSet::new();
        for link in report.graph.links() {
            assert!(link.source() < link.target());
            assert!(seen.insert((link.source(), link.target())));
        }
    }

    #[test]
    fn test_build_duplicate_titles_resolve_to_last() {
        let mut builder = GraphBuilder::new();
        let report = builder
            .build(identities(&["X", "dup", "dup"]), vec![(0, vec!["dup"])])
            .unwrap();
        assert_eq!(report.graph.node_count(), 3);
        assert_eq!(links(&report.graph), vec![(0, 2)]);
    }

    #[test]
    fn test_build_rejects_non_dense_identities() {
        let mut builder = GraphBuilder::new();
        let err = builder
            .build(
                vec![(0, "A".to_string()), (2, "C".to_string())],
                Vec::<(usize, Vec<&str>)>::new(),
            )
            .unwrap_err();
        assert!(matches!(err, GraphError::NonDenseIndex { expected: 1, found: 2 }));
    }

    #[test]
    fn test_build_rejects_references_for_unknown_note() {
        let mut builder = GraphBuilder::new();
        let err = builder
            .build(identities(&["A"]), vec![(4, vec!["A"])])
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownNote(4)));
    }

    #[test]
    fn test_rebuild_replaces_previous_graph() {
        let mut builder = GraphBuilder::new();
        builder
            .build(identities(&["A", "B"]), vec![(0, vec!["B"])])
            .unwrap();
        builder
            .build(identities(&["Z"]), Vec::<(usize, Vec<&str>)>::new())
            .unwrap();
        assert_eq!(builder.graph().node_count(), 1);
        assert_eq!(builder.graph().link_count(), 0);
    }

    #[test]
    fn test_build_empty() {
        let mut builder = GraphBuilder::new();
        let report = builder
            .build(Vec::new(), Vec::<(usize, Vec<&str>)>::new())
            .unwrap();
        assert!(report.graph.is_empty());
    }

    #[test]
    fn test_build_from_source() {
        let source = MemoryNoteSource::new()
            .with_note("A", &["B"])
            .with_note("B", &["A"])
            .with_note("C", &[]);
        let mut builder = GraphBuilder::new();
        let report = builder.build_from_source(&source).unwrap();
        assert_eq!(report.graph.node_count(), 3);
        assert_eq!(links(&report.graph), vec![(0, 1)]);
    }

    /// A source whose contents can change between builds.
    #[derive(Default)]
    struct CountingSource {
        notes: Mutex<Vec<Note>>,
        builds: AtomicUsize,
    }

    impl NoteSource for CountingSource {
        fn titles(&self) -> std::result::Result<Vec<(usize, String)>, NotesError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            let notes = self.notes.lock().unwrap();
            Ok(notes.iter().map(|n| n.title.clone()).enumerate().collect())
        }

        fn notes(&self) -> std::result::Result<Vec<(usize, Note)>, NotesError> {
            Ok(self.notes.lock().unwrap().iter().cloned().enumerate().collect())
        }

        fn fingerprint(&self) -> std::result::Result<String, NotesError> {
            Ok(self.notes.lock().unwrap().len().to_string())
        }
    }

    #[test]
    fn test_store_caches_until_stale_or_changed() {
        let source = Arc::new(CountingSource::default());
        source.notes.lock().unwrap().push(Note::new("A", vec![]));

        let store = GraphStore::new(source.clone());
        assert_eq!(store.graph().unwrap().graph.node_count(), 1);
        store.graph().unwrap();
        assert_eq!(source.builds.load(Ordering::SeqCst), 1);

        store.mark_stale();
        store.graph().unwrap();
        assert_eq!(source.builds.load(Ordering::SeqCst), 2);

        source.notes.lock().unwrap().push(Note::new("B", vec!["A".into()]));
        let snapshot = store.graph().unwrap();
        assert_eq!(source.builds.load(Ordering::SeqCst), 3);
        assert_eq!(snapshot.graph.node_count(), 2);
        assert_eq!(snapshot.graph.link_count(), 1);
    }

    #[tokio::test]
    async fn test_graph_api_returns_json() {
        let source = MemoryNoteSource::new()
            .with_note("A", &["B"])
            .with_note("B", &["A"]);
        let state = Arc::new(AppState::with_source(Default::default(), source));

        let response = graph_api(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["nodes"][1]["title"], "B");
        assert_eq!(json["links"], serde_json::json!([{"source": 0, "target": 1}]));
    }

    #[tokio::test]
    async fn test_graph_api_reports_source_errors() {
        let dir = tempfile::tempdir().unwrap();
        let source = crate::notes::FsNoteSource::new(dir.path().join("missing"));
        let state = Arc::new(AppState::with_source(Default::default(), source));

        let response = graph_api(State(state)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
