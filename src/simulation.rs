//! Force-directed layout simulation.
//!
//! Nodes repel each other, links act as springs around a target length, a
//! weak spring pulls everything toward the center, and velocities decay with
//! elapsed time. The caller drives the simulation with `tick(now, input)`
//! once per frame and reads positions back for rendering.
//!
//! Time is expressed in milliseconds.

use crate::controller::InteractionState;
use crate::models::Graph;
use crate::vect2::Vect2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// Parameters
// ============================================================================

/// Upper bound on the ticks a single `settle` call runs.
pub const MAX_SETTLE_TICKS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Map `value` linearly from `from` into `to`. A zero-width `from`
    /// maps everything to `to.min`.
    pub fn map(value: f64, from: Range, to: Range) -> f64 {
        if from.span() == 0.0 {
            return to.min;
        }
        let proportion = (value - from.min) / from.span();
        proportion * to.span() + to.min
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub center: Vect2,
    pub repulsion_factor: f64,
    /// Negative: the center force attracts.
    pub center_factor: f64,
    pub drag_factor: f64,
    pub link_length_sq: f64,
    pub link_factor: f64,
    /// Repulsion is computed as if nodes were never closer than this.
    pub min_distance: f64,
    pub radius_range: Range,
    /// Upper bound of the random offset applied to initial positions.
    pub jitter: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            center: Vect2::ZERO,
            repulsion_factor: 2.0,
            center_factor: -0.00001,
            drag_factor: 1.05,
            link_length_sq: 100.0,
            link_factor: 0.0001,
            min_distance: 20.0,
            radius_range: Range::new(4.0, 15.0),
            jitter: 0.001,
        }
    }
}

// ============================================================================
// Simulation State
// ============================================================================

#[derive(Debug, Clone, Default)]
struct KinematicState {
    position: Vect2,
    velocity: Vect2,
    link_count: usize,
    radius: f64,
    grabbed: bool,
}

/// Read-only view of one node for renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeView<'a> {
    pub index: usize,
    pub title: &'a str,
    pub position: Vect2,
    pub radius: f64,
    pub link_count: usize,
    pub grabbed: bool,
}

/// Read-only view of one link, with its endpoint positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeView {
    pub source: usize,
    pub target: usize,
    pub from: Vect2,
    pub to: Vect2,
}

#[derive(Debug)]
pub struct LayoutSimulation {
    graph: Graph,
    bodies: Vec<KinematicState>,
    params: SimulationParams,
    last_tick: Option<f64>,
    grabbed: Option<usize>,
    was_pressed: bool,
}

impl LayoutSimulation {
    pub fn new(graph: Graph) -> Self {
        Self::with_params(graph, SimulationParams::default())
    }

    pub fn with_params(graph: Graph, params: SimulationParams) -> Self {
        Self::with_rng(graph, params, &mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(graph: Graph, params: SimulationParams, rng: &mut R) -> Self {
        let degrees = graph.degrees();
        let observed = Range::new(
            degrees.iter().copied().min().unwrap_or(0) as f64,
            degrees.iter().copied().max().unwrap_or(0) as f64,
        );

        let bodies = degrees
            .iter()
            .map(|&link_count| {
                // Break the symmetry so repulsion has a direction to push in
                let salt = Vect2::new(rng.gen::<f64>(), rng.gen::<f64>()) * params.jitter;
                KinematicState {
                    position: Vect2::ZERO + salt,
                    velocity: Vect2::ZERO,
                    link_count,
                    radius: Range::map(link_count as f64, observed, params.radius_range),
                    grabbed: false,
                }
            })
            .collect();

        Self {
            graph,
            bodies,
            params,
            last_tick: None,
            grabbed: None,
            was_pressed: false,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn last_tick(&self) -> Option<f64> {
        self.last_tick
    }

    pub fn grabbed_index(&self) -> Option<usize> {
        self.grabbed
    }

    pub fn node(&self, index: usize) -> Option<NodeView<'_>> {
        let body = self.bodies.get(index)?;
        let node = self.graph.node(index)?;
        Some(NodeView {
            index,
            title: &node.title,
            position: body.position,
            radius: body.radius,
            link_count: body.link_count,
            grabbed: body.grabbed,
        })
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeView<'_>> + '_ {
        self.graph
            .nodes()
            .iter()
            .zip(&self.bodies)
            .map(|(node, body)| NodeView {
                index: node.index,
                title: &node.title,
                position: body.position,
                radius: body.radius,
                link_count: body.link_count,
                grabbed: body.grabbed,
            })
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeView> + '_ {
        self.graph.links().map(|link| EdgeView {
            source: link.source(),
            target: link.target(),
            from: self.bodies[link.source()].position,
            to: self.bodies[link.target()].position,
        })
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance the simulation to `now`. The first call only records the
    /// timestamp. Timestamps must not go backwards.
    pub fn tick(&mut self, now: f64, input: &InteractionState) {
        self.update_grab(input);

        let Some(last) = self.last_tick.replace(now) else {
            return;
        };
        let dt = now - last;

        self.apply_center_force(dt);
        self.apply_repulsion_force(dt);
        self.apply_link_force(dt);
        self.apply_drag(dt);
        self.apply_velocity(dt);
    }

    /// Tick from the current time (or zero) in `step` increments until
    /// `duration` more milliseconds have elapsed, with no user input.
    ///
    /// Runs at most `MAX_SETTLE_TICKS` ticks; a finer `step` is widened to
    /// fit. Returns the number of ticks run.
    pub fn settle(&mut self, duration: f64, step: f64) -> usize {
        if !(duration.is_finite() && step.is_finite() && duration > 0.0 && step > 0.0) {
            return 0;
        }

        let idle = InteractionState::default();
        let start = match self.last_tick {
            Some(t) => t,
            None => {
                self.tick(0.0, &idle);
                0.0
            }
        };

        let mut step = step;
        let mut ticks = (duration / step).ceil() as usize;
        if ticks > MAX_SETTLE_TICKS {
            warn!(ticks, max = MAX_SETTLE_TICKS, "settle step too fine, widening it");
            ticks = MAX_SETTLE_TICKS;
            step = duration / MAX_SETTLE_TICKS as f64;
        }

        for i in 1..=ticks {
            let elapsed = if i == ticks { duration } else { i as f64 * step };
            self.tick(start + elapsed, &idle);
        }
        ticks
    }

    fn update_grab(&mut self, input: &InteractionState) {
        let pressed = input.primary_pressed;

        if !pressed {
            if let Some(index) = self.grabbed.take() {
                self.bodies[index].grabbed = false;
                debug!(node = index, "released node");
            }
        } else if !self.was_pressed {
            self.grabbed = self.node_at(input.pointer, input.scale);
            if let Some(index) = self.grabbed {
                self.bodies[index].grabbed = true;
                debug!(node = index, "grabbed node");
            }
        }
        self.was_pressed = pressed;

        if let Some(index) = self.grabbed {
            let body = &mut self.bodies[index];
            body.position = input.to_simulation(input.pointer);
            body.velocity = Vect2::ZERO;
        }
    }

    /// Topmost node under a display-space point: the highest index wins.
    fn node_at(&self, point: Vect2, scale: f64) -> Option<usize> {
        self.bodies.iter().enumerate().rev().find_map(|(index, body)| {
            let displayed = body.position * scale;
            (displayed.distance_sq_to(point) <= body.radius * body.radius).then_some(index)
        })
    }

    // ========================================================================
    // Forces
    // ========================================================================

    /// Push `body` away from `target` by `factor * strength(distance) * dt`.
    /// A negative factor pulls instead.
    fn apply_distance_force(
        body: &mut KinematicState,
        target: Vect2,
        dt: f64,
        factor: f64,
        strength: impl Fn(f64) -> f64,
    ) {
        let distance = body.position.distance_to(target);
        let dv = (body.position - target).normalize() * (factor * strength(distance) * dt);
        body.velocity += dv;
    }

    fn electrostatic(&self) -> impl Fn(f64) -> f64 {
        let min_distance = self.params.min_distance;
        move |distance| 1.0 / distance.max(min_distance).powi(2)
    }

    fn spring(distance: f64) -> f64 {
        distance
    }

    fn positions(&self) -> Vec<Vect2> {
        self.bodies.iter().map(|b| b.position).collect()
    }

    fn apply_center_force(&mut self, dt: f64) {
        let SimulationParams {
            center,
            center_factor,
            ..
        } = self.params;
        for body in self.bodies.iter_mut().filter(|b| !b.grabbed) {
            Self::apply_distance_force(body, center, dt, center_factor, Self::spring);
        }
    }

    // O(n²); fine for note collections of a few hundred notes
    fn apply_repulsion_force(&mut self, dt: f64) {
        let positions = self.positions();
        let factor = self.params.repulsion_factor;
        let strength = self.electrostatic();

        for (index, body) in self.bodies.iter_mut().enumerate() {
            if body.grabbed {
                continue;
            }
            for (other, &target) in positions.iter().enumerate() {
                if other == index {
                    continue;
                }
                Self::apply_distance_force(body, target, dt, factor, &strength);
            }
        }
    }

    fn apply_link_force(&mut self, dt: f64) {
        let positions = self.positions();
        let SimulationParams {
            link_length_sq,
            link_factor,
            ..
        } = self.params;

        for link in self.graph.links() {
            let (a, b) = (link.source(), link.target());
            let distance_sq = positions[a].distance_sq_to(positions[b]);
            // Too close pushes apart, too far pulls together
            let factor = link_factor * sign(link_length_sq - distance_sq);

            if !self.bodies[a].grabbed {
                Self::apply_distance_force(&mut self.bodies[a], positions[b], dt, factor, Self::spring);
            }
            if !self.bodies[b].grabbed {
                Self::apply_distance_force(&mut self.bodies[b], positions[a], dt, factor, Self::spring);
            }
        }
    }

    fn apply_drag(&mut self, dt: f64) {
        let factor = 1.0 / self.params.drag_factor.powf(dt);
        for body in self.bodies.iter_mut().filter(|b| !b.grabbed) {
            body.velocity *= factor;
        }
    }

    fn apply_velocity(&mut self, dt: f64) {
        for body in self.bodies.iter_mut().filter(|b| !b.grabbed) {
            body.position += body.velocity * dt;
        }
    }

    // ========================================================================
    // Snapshot
    // ========================================================================

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            nodes: self
                .nodes()
                .map(|node| NodeLayout {
                    index: node.index,
                    title: node.title.to_string(),
                    x: node.position.x,
                    y: node.position.y,
                    radius: node.radius,
                    link_count: node.link_count,
                    grabbed: node.grabbed,
                })
                .collect(),
            links: self
                .graph
                .links()
                .map(|link| LinkLayout {
                    source: link.source(),
                    target: link.target(),
                })
                .collect(),
        }
    }
}

/// Like `f64::signum`, but zero maps to zero.
fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

// ============================================================================
// Serializable Layout
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeLayout {
    pub index: usize,
    pub title: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub link_count: usize,
    pub grabbed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkLayout {
    pub source: usize,
    pub target: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutSnapshot {
    pub nodes: Vec<NodeLayout>,
    pub links: Vec<LinkLayout>,
}
