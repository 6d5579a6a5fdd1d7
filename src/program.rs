//! Binary linear programs and the optimizer boundary.
//!
//! The formulator describes the placement problem as a [`BinaryProgram`];
//! anything implementing [`Optimizer`] can solve it. The crate bundles
//! [`BranchAndBound`](crate::optimizer::BranchAndBound).

use std::fmt;

/// Index of a decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

/// Relation between a constraint's left-hand side and its right-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Eq,
    Ge,
}

impl Sense {
    pub fn holds(self, activity: i64, rhs: i64) -> bool {
        match self {
            Sense::Le => activity <= rhs,
            Sense::Eq => activity == rhs,
            Sense::Ge => activity >= rhs,
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Le => write!(f, "<="),
            Sense::Eq => write!(f, "="),
            Sense::Ge => write!(f, ">="),
        }
    }
}

/// `sum(coef * x) <sense> rhs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub terms: Vec<(VarId, i64)>,
    pub sense: Sense,
    pub rhs: i64,
}

impl Constraint {
    pub fn activity(&self, values: &[bool]) -> i64 {
        self.terms
            .iter()
            .filter(|(var, _)| values[var.0])
            .map(|(_, coef)| coef)
            .sum()
    }
}

/// A maximization problem over 0/1 variables with linear constraints.
#[derive(Debug, Clone, Default)]
pub struct BinaryProgram {
    names: Vec<String>,
    objective: Vec<i64>,
    constraints: Vec<Constraint>,
}

impl BinaryProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable with its objective coefficient
    pub fn add_var(&mut self, name: impl Into<String>, objective: i64) -> VarId {
        self.names.push(name.into());
        self.objective.push(objective);
        VarId(self.objective.len() - 1)
    }

    pub fn add_constraint(&mut self, terms: Vec<(VarId, i64)>, sense: Sense, rhs: i64) {
        debug_assert!(terms.iter().all(|(v, _)| v.0 < self.objective.len()));
        self.constraints.push(Constraint { terms, sense, rhs });
    }

    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }

    pub fn name(&self, var: VarId) -> &str {
        &self.names[var.0]
    }

    pub fn objective(&self) -> &[i64] {
        &self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Objective value of a full assignment
    pub fn evaluate(&self, values: &[bool]) -> i64 {
        self.objective
            .iter()
            .zip(values)
            .filter(|(_, v)| **v)
            .map(|(c, _)| c)
            .sum()
    }

    /// Whether a full assignment satisfies every constraint
    pub fn is_feasible(&self, values: &[bool]) -> bool {
        values.len() == self.num_vars()
            && self
                .constraints
                .iter()
                .all(|c| c.sense.holds(c.activity(values), c.rhs))
    }
}

/// What an optimizer reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A provably maximal assignment
    Optimal { values: Vec<bool>, objective: i64 },
    /// No assignment satisfies the constraints
    Infeasible,
    /// The deadline expired before the search finished
    TimedOut,
}

/// Cross-platform time and node budget for one solve
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    #[cfg(not(target_arch = "wasm32"))]
    start: std::time::Instant,
    #[cfg(target_arch = "wasm32")]
    start_ms: f64,
    limit_ms: u64,
    node_limit: Option<u64>,
}

impl Deadline {
    pub fn new(limit_ms: u64, node_limit: Option<u64>) -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            start: std::time::Instant::now(),
            #[cfg(target_arch = "wasm32")]
            start_ms: now_ms(),
            limit_ms,
            node_limit,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.start.elapsed().as_millis() as u64
        }
        #[cfg(target_arch = "wasm32")]
        {
            (now_ms() - self.start_ms).max(0.0) as u64
        }
    }

    /// Whether the node budget alone is spent. Cheap enough to call per node.
    pub fn nodes_exhausted(&self, nodes: u64) -> bool {
        self.node_limit.is_some_and(|limit| nodes >= limit)
    }

    /// Whether the budget is spent after `nodes` search nodes
    pub fn is_expired(&self, nodes: u64) -> bool {
        self.nodes_exhausted(nodes) || self.elapsed_ms() >= self.limit_ms
    }
}

#[cfg(target_arch = "wasm32")]
fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// A 0/1 linear program maximizer.
pub trait Optimizer {
    fn maximize(&self, program: &BinaryProgram, deadline: &Deadline) -> Outcome;
}

impl<O: Optimizer + ?Sized> Optimizer for &O {
    fn maximize(&self, program: &BinaryProgram, deadline: &Deadline) -> Outcome {
        (**self).maximize(program, deadline)
    }
}

impl<O: Optimizer + ?Sized> Optimizer for Box<O> {
    fn maximize(&self, program: &BinaryProgram, deadline: &Deadline) -> Outcome {
        (**self).maximize(program, deadline)
    }
}
