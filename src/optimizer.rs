//! Exact branch and bound for binary programs.
//!
//! Depth-first search with bound propagation after every decision. Rows that
//! still need activity (`>=` / `=` rows below their right-hand side) are
//! branched first, exact-cover style, picking the row with the fewest free
//! candidates. Once every such row is satisfied the search branches on the
//! free variable with the largest objective coefficient. Pruning uses a
//! fractional knapsack relaxation over the nonnegative `<=` / `=` rows.

use tracing::trace;

use crate::program::{BinaryProgram, Deadline, Optimizer, Outcome, Sense};

const DEFAULT_CHECK_INTERVAL: u64 = 256;

/// The bundled exact optimizer
#[derive(Debug, Clone, Copy)]
pub struct BranchAndBound {
    check_interval: u64,
}

impl BranchAndBound {
    pub fn new() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Read the clock every `nodes` search nodes
    pub fn with_check_interval(nodes: u64) -> Self {
        Self {
            check_interval: nodes.max(1),
        }
    }
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for BranchAndBound {
    fn maximize(&self, program: &BinaryProgram, deadline: &Deadline) -> Outcome {
        Search::new(program, deadline, self.check_interval).run()
    }
}

/// Running activity of one constraint
#[derive(Debug, Clone, Copy, Default)]
struct RowState {
    /// Sum of coefficients of variables fixed to 1
    fixed: i64,
    /// Sum of positive coefficients of free variables
    free_pos: i64,
    /// Sum of negative coefficients of free variables
    free_neg: i64,
}

/// A `<=` or `=` row with nonnegative coefficients, used for the bound.
/// Items are (variable, weight, objective share), best ratio first.
struct KnapsackRow {
    row: usize,
    items: Vec<(usize, i64, f64)>,
}

enum Branch {
    /// Some row needs one of these variables at 1
    Cover(Vec<usize>),
    /// Try the variable at 1, then at 0
    Split(usize),
    /// Nothing left worth setting to 1
    Leaf,
    /// A row can no longer be satisfied
    Dead,
}

struct Search<'a> {
    program: &'a BinaryProgram,
    deadline: &'a Deadline,
    check_interval: u64,
    /// Per variable: (row, coefficient)
    columns: Vec<Vec<(usize, i64)>>,
    knapsacks: Vec<KnapsackRow>,
    /// Positive-objective variables outside every knapsack row
    uncovered: Vec<usize>,
    rows: Vec<RowState>,
    value: Vec<Option<bool>>,
    trail: Vec<usize>,
    fixed_objective: i64,
    best: Option<(i64, Vec<bool>)>,
    nodes: u64,
    aborted: bool,
}

impl<'a> Search<'a> {
    fn new(program: &'a BinaryProgram, deadline: &'a Deadline, check_interval: u64) -> Self {
        let n = program.num_vars();
        let objective = program.objective();

        let mut columns = vec![Vec::new(); n];
        let mut rows = Vec::with_capacity(program.constraints().len());
        for (r, constraint) in program.constraints().iter().enumerate() {
            let mut state = RowState::default();
            for &(var, coef) in &constraint.terms {
                columns[var.0].push((r, coef));
                if coef > 0 {
                    state.free_pos += coef;
                } else {
                    state.free_neg += coef;
                }
            }
            rows.push(state);
        }

        let bound_rows: Vec<usize> = program
            .constraints()
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.sense != Sense::Ge
                    && c.terms.iter().all(|&(_, coef)| coef >= 0)
                    && c.terms.iter().any(|&(_, coef)| coef > 0)
            })
            .map(|(r, _)| r)
            .collect();

        // Each variable's objective is split over its bound rows by weight.
        let mut row_weight = vec![0i64; n];
        for &r in &bound_rows {
            for &(var, coef) in &program.constraints()[r].terms {
                row_weight[var.0] += coef;
            }
        }

        let uncovered = (0..n)
            .filter(|&j| objective[j] > 0 && row_weight[j] == 0)
            .collect();

        let knapsacks = bound_rows
            .into_iter()
            .map(|r| {
                let mut items: Vec<(usize, i64, f64)> = program.constraints()[r]
                    .terms
                    .iter()
                    .filter(|&&(var, coef)| coef > 0 && objective[var.0] > 0)
                    .map(|&(var, coef)| {
                        let share =
                            objective[var.0] as f64 * coef as f64 / row_weight[var.0] as f64;
                        (var.0, coef, share)
                    })
                    .collect();
                // share / weight is the same for a variable in every row
                items.sort_by(|a, b| {
                    let ra = objective[a.0] as f64 / row_weight[a.0] as f64;
                    let rb = objective[b.0] as f64 / row_weight[b.0] as f64;
                    rb.total_cmp(&ra).then(a.0.cmp(&b.0))
                });
                KnapsackRow { row: r, items }
            })
            .collect();

        Self {
            program,
            deadline,
            check_interval: check_interval.max(1),
            columns,
            knapsacks,
            uncovered,
            rows,
            value: vec![None; n],
            trail: Vec::with_capacity(n),
            fixed_objective: 0,
            best: None,
            nodes: 0,
            aborted: false,
        }
    }

    fn run(mut self) -> Outcome {
        let all_rows: Vec<usize> = (0..self.rows.len()).collect();
        if !self.propagate(all_rows) {
            return Outcome::Infeasible;
        }

        self.descend();

        if self.aborted {
            trace!(
                nodes = self.nodes,
                incumbent = self.best.as_ref().map(|(o, _)| *o),
                "branch and bound aborted"
            );
            return Outcome::TimedOut;
        }
        trace!(nodes = self.nodes, "branch and bound finished");

        match self.best {
            Some((objective, values)) => Outcome::Optimal { values, objective },
            None => Outcome::Infeasible,
        }
    }

    fn descend(&mut self) {
        self.nodes += 1;
        if self.deadline.nodes_exhausted(self.nodes)
            || (self.nodes % self.check_interval == 0 && self.deadline.is_expired(self.nodes))
        {
            self.aborted = true;
        }
        if self.aborted {
            return;
        }

        if let Some((best, _)) = &self.best {
            if self.upper_bound() <= *best {
                return;
            }
        }

        match self.choose_branch() {
            Branch::Cover(candidates) => self.branch_cover(&candidates),
            Branch::Split(var) => self.branch_split(var),
            Branch::Leaf => self.close_leaf(),
            Branch::Dead => {}
        }
    }

    fn choose_branch(&self) -> Branch {
        let program = self.program;
        let objective = program.objective();

        let mut cover: Option<(usize, usize)> = None;
        for (r, constraint) in program.constraints().iter().enumerate() {
            if constraint.sense == Sense::Le || self.rows[r].fixed >= constraint.rhs {
                continue;
            }
            let free = constraint
                .terms
                .iter()
                .filter(|&&(var, coef)| coef > 0 && self.value[var.0].is_none())
                .count();
            if free == 0 {
                return Branch::Dead;
            }
            if cover.is_none_or(|(fewest, _)| free < fewest) {
                cover = Some((free, r));
            }
        }

        if let Some((_, r)) = cover {
            let mut candidates: Vec<usize> = program.constraints()[r]
                .terms
                .iter()
                .filter(|&&(var, coef)| coef > 0 && self.value[var.0].is_none())
                .map(|&(var, _)| var.0)
                .collect();
            candidates.sort_by(|&a, &b| objective[b].cmp(&objective[a]).then(a.cmp(&b)));
            return Branch::Cover(candidates);
        }

        let best_free = (0..objective.len())
            .filter(|&j| self.value[j].is_none() && objective[j] > 0)
            .max_by(|&a, &b| objective[a].cmp(&objective[b]).then(b.cmp(&a)));
        match best_free {
            Some(var) => Branch::Split(var),
            None => Branch::Leaf,
        }
    }

    /// Try each candidate at 1, excluding the ones already tried.
    fn branch_cover(&mut self, candidates: &[usize]) {
        let mark = self.trail.len();
        for &var in candidates {
            match self.value[var] {
                Some(true) => {
                    // forced on by earlier exclusions: the row is now covered
                    self.descend();
                    break;
                }
                Some(false) => continue,
                None => {}
            }

            let inner = self.trail.len();
            if self.assign(var, true) {
                self.descend();
            }
            self.undo_to(inner);
            if self.aborted || !self.assign(var, false) {
                break;
            }
        }
        self.undo_to(mark);
    }

    fn branch_split(&mut self, var: usize) {
        for value in [true, false] {
            let mark = self.trail.len();
            if self.assign(var, value) {
                self.descend();
            }
            self.undo_to(mark);
            if self.aborted {
                return;
            }
        }
    }

    /// Free variables left here have no objective value: set them to 0.
    fn close_leaf(&mut self) {
        let program = self.program;
        let feasible = program
            .constraints()
            .iter()
            .zip(&self.rows)
            .all(|(c, state)| c.sense.holds(state.fixed, c.rhs));

        if !feasible {
            // a row with negative terms needs some zero-value variable set
            if let Some(var) = self.value.iter().position(Option::is_none) {
                self.branch_split(var);
            }
            return;
        }

        let objective = self.fixed_objective;
        if self.best.as_ref().is_none_or(|(best, _)| objective > *best) {
            let values = self.value.iter().map(|v| v.unwrap_or(false)).collect();
            self.best = Some((objective, values));
        }
    }

    fn upper_bound(&self) -> i64 {
        let program = self.program;
        let objective = program.objective();

        let mut bound = self.fixed_objective as f64;
        for &var in &self.uncovered {
            if self.value[var].is_none() {
                bound += objective[var] as f64;
            }
        }

        for knapsack in &self.knapsacks {
            let rhs = program.constraints()[knapsack.row].rhs;
            let mut residual = (rhs - self.rows[knapsack.row].fixed) as f64;
            for &(var, weight, share) in &knapsack.items {
                if residual <= 0.0 {
                    break;
                }
                if self.value[var].is_some() {
                    continue;
                }
                let weight = weight as f64;
                if weight <= residual {
                    bound += share;
                    residual -= weight;
                } else {
                    bound += share * residual / weight;
                    break;
                }
            }
        }

        (bound + 1e-6).floor() as i64
    }

    fn row_feasible(&self, r: usize) -> bool {
        let constraint = &self.program.constraints()[r];
        let state = self.rows[r];
        let min = state.fixed + state.free_neg;
        let max = state.fixed + state.free_pos;
        match constraint.sense {
            Sense::Le => min <= constraint.rhs,
            Sense::Ge => max >= constraint.rhs,
            Sense::Eq => min <= constraint.rhs && max >= constraint.rhs,
        }
    }

    fn fix(&mut self, var: usize, value: bool) {
        self.value[var] = Some(value);
        self.trail.push(var);
        for &(r, coef) in &self.columns[var] {
            let row = &mut self.rows[r];
            if coef > 0 {
                row.free_pos -= coef;
            } else {
                row.free_neg -= coef;
            }
            if value {
                row.fixed += coef;
            }
        }
        if value {
            self.fixed_objective += self.program.objective()[var];
        }
    }

    fn unfix(&mut self, var: usize) {
        let Some(value) = self.value[var].take() else {
            return;
        };
        for &(r, coef) in &self.columns[var] {
            let row = &mut self.rows[r];
            if coef > 0 {
                row.free_pos += coef;
            } else {
                row.free_neg += coef;
            }
            if value {
                row.fixed -= coef;
            }
        }
        if value {
            self.fixed_objective -= self.program.objective()[var];
        }
    }

    fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some(var) = self.trail.pop() {
                self.unfix(var);
            }
        }
    }

    /// Fix a variable and propagate. False means a row became unsatisfiable;
    /// the caller undoes the trail either way.
    fn assign(&mut self, var: usize, value: bool) -> bool {
        self.fix(var, value);
        let touched = self.columns[var].iter().map(|&(r, _)| r).collect();
        self.propagate(touched)
    }

    fn propagate(&mut self, mut queue: Vec<usize>) -> bool {
        let program = self.program;
        while let Some(r) = queue.pop() {
            if !self.row_feasible(r) {
                return false;
            }

            let constraint = &program.constraints()[r];
            let state = self.rows[r];
            let min = state.fixed + state.free_neg;
            let max = state.fixed + state.free_pos;
            let upper = constraint.sense != Sense::Ge;
            let lower = constraint.sense != Sense::Le;
            let rhs = constraint.rhs;

            for &(var, coef) in &constraint.terms {
                if self.value[var.0].is_some() {
                    continue;
                }
                let forced = if upper && coef > 0 && min + coef > rhs {
                    Some(false)
                } else if upper && coef < 0 && min - coef > rhs {
                    Some(true)
                } else if lower && coef > 0 && max - coef < rhs {
                    Some(true)
                } else if lower && coef < 0 && max + coef < rhs {
                    Some(false)
                } else {
                    None
                };

                if let Some(value) = forced {
                    self.fix(var.0, value);
                    queue.extend(self.columns[var.0].iter().map(|&(row, _)| row));
                }
            }
        }
        true
    }
}
