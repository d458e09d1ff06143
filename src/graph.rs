//! Dependency graph between the four simulation passes.
//!
//! Each pass writes one field and reads some fields, either from the
//! previous generation (last tick's output) or from the current generation
//! (written earlier in this tick). Only current-generation reads order the
//! passes; previous-generation reads are satisfied by double buffering.
//!
//! ```text
//!               +--> Position   (cur lifecycle, prev position, prev velocity)
//! Lifecycle ----+--> Velocity   (cur lifecycle, prev position, prev velocity)
//!               +--> Color      (cur lifecycle, prev color)
//! ```
//!
//! The same edge list drives the GPU: every input of a pass becomes one
//! storage binding of its compute shader.

use crate::error::ConfigError;

/// One simulated field, and the pass that writes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassKind {
    Lifecycle,
    Position,
    Velocity,
    Color,
}

impl PassKind {
    pub const ALL: [PassKind; 4] = [
        PassKind::Lifecycle,
        PassKind::Position,
        PassKind::Velocity,
        PassKind::Color,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PassKind::Lifecycle => "lifecycle",
            PassKind::Position => "position",
            PassKind::Velocity => "velocity",
            PassKind::Color => "color",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

/// Which generation of a field a pass reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generation {
    /// Output of the previous tick.
    Previous,
    /// Written earlier in this tick.
    Current,
}

impl Generation {
    pub fn prefix(&self) -> &'static str {
        match self {
            Generation::Previous => "prev",
            Generation::Current => "cur",
        }
    }
}

/// `pass` reads `field` at `generation`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dependency {
    pub pass: PassKind,
    pub field: PassKind,
    pub generation: Generation,
}

impl Dependency {
    /// Binding name used in generated shaders, e.g. `prev_position`.
    pub fn binding_name(&self) -> String {
        format!("{}_{}", self.generation.prefix(), self.field.name())
    }
}

/// Pass dependency graph.
#[derive(Clone, Debug, Default)]
pub struct PassGraph {
    edges: Vec<Dependency>,
}

impl PassGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wiring the simulation runs with.
    pub fn standard() -> Self {
        use Generation::{Current, Previous};
        use PassKind::*;

        Self::new()
            .read(Lifecycle, Lifecycle, Previous)
            .read(Lifecycle, Position, Previous)
            .read(Position, Lifecycle, Current)
            .read(Position, Position, Previous)
            .read(Position, Velocity, Previous)
            .read(Velocity, Lifecycle, Current)
            .read(Velocity, Position, Previous)
            .read(Velocity, Velocity, Previous)
            .read(Color, Lifecycle, Current)
            .read(Color, Color, Previous)
    }

    /// Declare that `pass` reads `field` at `generation`.
    pub fn read(mut self, pass: PassKind, field: PassKind, generation: Generation) -> Self {
        self.edges.push(Dependency {
            pass,
            field,
            generation,
        });
        self
    }

    pub fn edges(&self) -> &[Dependency] {
        &self.edges
    }

    /// Inputs of one pass, in declaration order.
    pub fn inputs(&self, pass: PassKind) -> impl Iterator<Item = &Dependency> {
        self.edges.iter().filter(move |d| d.pass == pass)
    }

    /// Passes without same-tick inputs.
    pub fn roots(&self) -> Vec<PassKind> {
        PassKind::ALL
            .into_iter()
            .filter(|&p| {
                !self
                    .inputs(p)
                    .any(|d| d.generation == Generation::Current && d.field != p)
            })
            .collect()
    }

    /// Execution order: Kahn's algorithm over current-generation edges,
    /// ties broken by [`PassKind`] order.
    pub fn topological_order(&self) -> Result<Vec<PassKind>, ConfigError> {
        // A pass reading its own output from this tick can never run.
        if self
            .edges
            .iter()
            .any(|d| d.generation == Generation::Current && d.field == d.pass)
        {
            return Err(ConfigError::PassCycle);
        }

        let mut in_degree = [0usize; 4];
        for d in self.current_edges() {
            in_degree[d.pass.index()] += 1;
        }
        if in_degree.iter().all(|&n| n > 0) {
            return Err(ConfigError::NoRootPass);
        }

        let mut order = Vec::with_capacity(4);
        let mut done = [false; 4];
        while order.len() < PassKind::ALL.len() {
            let ready = PassKind::ALL
                .into_iter()
                .find(|p| !done[p.index()] && in_degree[p.index()] == 0)
                .ok_or(ConfigError::PassCycle)?;

            done[ready.index()] = true;
            order.push(ready);
            for d in self.current_edges().filter(|d| d.field == ready) {
                in_degree[d.pass.index()] -= 1;
            }
        }

        Ok(order)
    }

    /// Check that this graph can drive the simulation and return its
    /// execution order.
    ///
    /// Beyond being acyclic, Lifecycle must be the only root, and every
    /// input the pass bodies read must be declared exactly once. Extra
    /// edges are allowed; they only constrain the order further.
    pub fn validate(&self) -> Result<Vec<PassKind>, ConfigError> {
        let order = self.topological_order()?;

        let roots = self.roots();
        if roots != [PassKind::Lifecycle] {
            return Err(ConfigError::RootPass(roots));
        }

        for (i, d) in self.edges.iter().enumerate() {
            if self.edges[..i].contains(d) {
                return Err(ConfigError::DuplicateDependency {
                    pass: d.pass,
                    input: d.binding_name(),
                });
            }
        }

        let required = Self::standard();
        if let Some(missing) = required.edges.iter().find(|d| !self.edges.contains(d)) {
            return Err(ConfigError::MissingDependency {
                pass: missing.pass,
                input: missing.binding_name(),
            });
        }

        Ok(order)
    }

    fn current_edges(&self) -> impl Iterator<Item = &Dependency> {
        self.edges
            .iter()
            .filter(|d| d.generation == Generation::Current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Generation::*;
    use PassKind::*;

    #[test]
    fn test_standard_order() {
        let order = PassGraph::standard().topological_order().unwrap();
        assert_eq!(order, vec![Lifecycle, Position, Velocity, Color]);
    }

    #[test]
    fn test_lifecycle_is_sole_root() {
        assert_eq!(PassGraph::standard().roots(), vec![Lifecycle]);
    }

    #[test]
    fn test_velocity_reads_previous_position() {
        let graph = PassGraph::standard();
        let pos = graph
            .inputs(Velocity)
            .find(|d| d.field == Position)
            .unwrap();
        assert_eq!(pos.generation, Previous);
    }

    #[test]
    fn test_binding_names() {
        let names: Vec<_> = PassGraph::standard()
            .inputs(Position)
            .map(Dependency::binding_name)
            .collect();
        assert_eq!(names, ["cur_lifecycle", "prev_position", "prev_velocity"]);
    }

    #[test]
    fn test_cycle_detected() {
        let graph = PassGraph::standard()
            .read(Position, Velocity, Current)
            .read(Velocity, Position, Current);
        assert_eq!(graph.topological_order(), Err(ConfigError::PassCycle));
    }

    #[test]
    fn test_self_read_is_cycle() {
        let graph = PassGraph::new().read(Color, Color, Current);
        assert_eq!(graph.topological_order(), Err(ConfigError::PassCycle));
    }

    #[test]
    fn test_no_root() {
        let graph = PassGraph::new()
            .read(Lifecycle, Color, Current)
            .read(Position, Lifecycle, Current)
            .read(Velocity, Lifecycle, Current)
            .read(Color, Velocity, Current);
        assert_eq!(graph.topological_order(), Err(ConfigError::NoRootPass));
    }

    #[test]
    fn test_standard_graph_validates() {
        let order = PassGraph::standard().validate().unwrap();
        assert_eq!(order, PassKind::ALL);
    }

    #[test]
    fn test_lifecycle_after_position_is_rejected() {
        let graph = PassGraph::new().read(Lifecycle, Position, Current);
        assert_eq!(graph.topological_order().unwrap()[0], Position);
        assert_eq!(
            graph.validate(),
            Err(ConfigError::RootPass(vec![Position, Velocity, Color]))
        );
    }

    #[test]
    fn test_missing_input_is_rejected() {
        let mut graph = PassGraph::new();
        for d in PassGraph::standard().edges().iter().filter(|d| !(d.pass == Velocity && d.field == Position)) {
            graph = graph.read(d.pass, d.field, d.generation);
        }
        assert_eq!(
            graph.validate(),
            Err(ConfigError::MissingDependency {
                pass: Velocity,
                input: "prev_position".to_string(),
            })
        );
    }

    #[test]
    fn test_duplicate_input_is_rejected() {
        let graph = PassGraph::standard().read(Color, Lifecycle, Current);
        assert_eq!(
            graph.validate(),
            Err(ConfigError::DuplicateDependency {
                pass: Color,
                input: "cur_lifecycle".to_string(),
            })
        );
    }

    #[test]
    fn test_extra_ordering_edge_is_allowed() {
        let graph = PassGraph::standard().read(Position, Velocity, Current);
        assert_eq!(graph.validate().unwrap(), vec![Lifecycle, Velocity, Position, Color]);
    }

    #[test]
    fn test_reordered_dependencies() {
        let graph = PassGraph::new()
            .read(Position, Velocity, Current)
            .read(Velocity, Lifecycle, Current);
        let order = graph.topological_order().unwrap();
        assert_eq!(order, vec![Lifecycle, Velocity, Position, Color]);
    }
}
