//! Public query API: best placement, playable moves, face-level lookup.
//!
//! Every query runs the same pipeline:
//! universe -> formulation -> optimizer -> reconstruction. Search failures
//! never surface as errors; the caller gets the table back unchanged with a
//! [`SolveStatus`] saying why. The one exception is a table run gap that no
//! wild can fill, which is rejected as [`Error::InvalidMeld`].

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::SolverConfig;
use crate::deck::TileMint;
use crate::error::{Error, Result};
use crate::formulate::formulate;
use crate::moves::{self, PlayableMove};
use crate::optimizer::BranchAndBound;
use crate::program::{Deadline, Optimizer, Outcome};
use crate::reconstruct::{merge_table, reconstruct};
use crate::universe::Universe;
use crate::{Face, Table, Tile, TileId};

/// Why a placement looks the way it does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// At least one rack tile was placed
    Improved,
    /// The best arrangement places no rack tile
    NoImprovement,
    /// Nothing to place; no search was run
    EmptyRack,
    /// The budget ran out before the search finished
    TimedOut,
    /// No arrangement keeps every table tile in a valid meld
    Infeasible,
    /// The optimizer's answer could not be laid out
    ReconstructionFailed,
}

impl SolveStatus {
    pub fn is_improved(self) -> bool {
        self == SolveStatus::Improved
    }
}

/// Result of a best-placement query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub table: Table,
    /// Rack tiles placed, in rack order
    pub consumed: Vec<TileId>,
    pub status: SolveStatus,
}

impl Placement {
    fn unchanged(table: &Table, status: SolveStatus) -> Self {
        Placement {
            table: table.clone(),
            consumed: Vec::new(),
            status,
        }
    }

    pub fn tiles_played(&self) -> usize {
        self.consumed.len()
    }

    /// The rack after the consumed tiles leave it
    pub fn remaining_rack(&self, rack: &[Tile]) -> Vec<Tile> {
        let consumed: HashSet<TileId> = self.consumed.iter().copied().collect();
        rack.iter()
            .filter(|t| !consumed.contains(&t.id()))
            .copied()
            .collect()
    }
}

/// Runs placement queries with one configuration and optimizer.
#[derive(Debug, Clone)]
pub struct Solver<O: Optimizer = BranchAndBound> {
    config: SolverConfig,
    optimizer: O,
}

impl Solver<BranchAndBound> {
    pub fn new(config: SolverConfig) -> Self {
        let optimizer = BranchAndBound::with_check_interval(config.check_interval);
        Solver { config, optimizer }
    }
}

impl Default for Solver<BranchAndBound> {
    fn default() -> Self {
        Solver::new(SolverConfig::default())
    }
}

impl<O: Optimizer> Solver<O> {
    /// Use a different optimizer behind the same pipeline
    pub fn with_optimizer(config: SolverConfig, optimizer: O) -> Self {
        Solver { config, optimizer }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Place as many rack tiles as possible, keeping every table tile.
    /// Same-color runs in the answer are merged wherever they form one run.
    pub fn best_placement(&self, table: &Table, rack: &[Tile]) -> Result<Placement> {
        let placement = self.solve(table, rack)?;
        Ok(merged(table, placement))
    }

    /// The melds of a best placement that take rack tiles, described as moves.
    /// Runs are left unmerged so each move maps to one meld.
    pub fn playable_moves(&self, table: &Table, rack: &[Tile]) -> Result<Vec<PlayableMove>> {
        let placement = self.solve(table, rack)?;
        Ok(describe_moves(table, &placement, rack))
    }

    /// [`Solver::best_placement`] and [`Solver::playable_moves`] from a single
    /// search.
    pub fn placement_with_moves(
        &self,
        table: &Table,
        rack: &[Tile],
    ) -> Result<(Placement, Vec<PlayableMove>)> {
        let placement = self.solve(table, rack)?;
        let moves = describe_moves(table, &placement, rack);
        Ok((merged(table, placement), moves))
    }

    /// Best placement for a rack given as bare faces
    pub fn find_moves(&self, table: &Table, faces: &[Face]) -> Result<Table> {
        let rack = TileMint::after(table).mint_all(faces.iter().copied());
        Ok(self.best_placement(table, &rack)?.table)
    }

    /// One search, laid out a meld per slot.
    ///
    /// A table with an unfilled run gap is never handed back as is: it is
    /// either rearranged into valid melds or rejected.
    fn solve(&self, table: &Table, rack: &[Tile]) -> Result<Placement> {
        validate(table, rack)?;
        let table_valid = table.is_valid();
        if rack.is_empty() && table_valid {
            debug!("empty rack, nothing to place");
            return Ok(Placement::unchanged(table, SolveStatus::EmptyRack));
        }

        let universe = Universe::build(table, rack);
        let formulation = formulate(&universe);
        debug!(
            table_tiles = universe.mandatory_count(),
            rack_tiles = universe.optional_count(),
            wilds = universe.wild_count(),
            slots = formulation.slots.len(),
            slot_bound = formulation.slot_bound,
            constraints = formulation.program.constraints().len(),
            "formulated placement model"
        );

        let deadline = Deadline::new(self.config.time_limit_ms, self.config.node_limit);
        let outcome = self.optimizer.maximize(&formulation.program, &deadline);
        let elapsed_ms = deadline.elapsed_ms();

        let (values, objective) = match outcome {
            Outcome::Optimal { values, objective } => (values, objective),
            Outcome::TimedOut => {
                warn!(elapsed_ms, "search budget exhausted, keeping the table");
                return Ok(Placement::unchanged(table, SolveStatus::TimedOut));
            }
            Outcome::Infeasible if !table_valid => {
                warn!(elapsed_ms, "no wild can fill the table's run gaps");
                return Err(first_invalid_meld(table));
            }
            Outcome::Infeasible => {
                warn!(elapsed_ms, "no valid arrangement of the table tiles, keeping the table");
                return Ok(Placement::unchanged(table, SolveStatus::Infeasible));
            }
        };

        let played = formulation.rack_tiles_placed(objective);
        let idle = if rack.is_empty() {
            SolveStatus::EmptyRack
        } else {
            SolveStatus::NoImprovement
        };
        if played <= 0 && table_valid {
            info!(elapsed_ms, "no rack tile can be placed");
            return Ok(Placement::unchanged(table, idle));
        }

        let rebuilt = match reconstruct(&universe, formulation.active_slots(&values)) {
            Ok(rebuilt) if rebuilt.consumed.len() as i64 == played.max(0) => rebuilt,
            Ok(rebuilt) => {
                error!(
                    expected = played,
                    consumed = rebuilt.consumed.len(),
                    "rack tile count disagrees with the model, keeping the table"
                );
                return Ok(Placement::unchanged(table, SolveStatus::ReconstructionFailed));
            }
            Err(e) => {
                error!(error = %e, "failed to lay out the solution, keeping the table");
                return Ok(Placement::unchanged(table, SolveStatus::ReconstructionFailed));
            }
        };

        let status = if played > 0 { SolveStatus::Improved } else { idle };
        info!(
            played,
            melds = rebuilt.table.len(),
            elapsed_ms,
            "placement found"
        );
        Ok(Placement {
            table: rebuilt.table,
            consumed: rebuilt.consumed,
            status,
        })
    }
}

/// Merge the runs of a rebuilt table; a table handed back unchanged stays as given
fn merged(original: &Table, mut placement: Placement) -> Placement {
    if placement.table != *original {
        placement.table = merge_table(placement.table);
    }
    placement
}

fn describe_moves(table: &Table, placement: &Placement, rack: &[Tile]) -> Vec<PlayableMove> {
    if !placement.status.is_improved() {
        return Vec::new();
    }
    moves::describe(table, &placement.table, rack)
}

fn first_invalid_meld(table: &Table) -> Error {
    let (index, meld) = table
        .melds()
        .iter()
        .enumerate()
        .find(|(_, m)| !m.is_valid())
        .map_or((0, String::new()), |(i, m)| (i, m.to_string()));
    Error::InvalidMeld { index, meld }
}

/// Reject malformed table melds and reused tile ids.
fn validate(table: &Table, rack: &[Tile]) -> Result<()> {
    for (index, meld) in table.melds().iter().enumerate() {
        if !meld.is_well_formed() {
            return Err(Error::InvalidMeld {
                index,
                meld: meld.to_string(),
            });
        }
    }

    let mut seen = HashSet::new();
    for tile in table.tiles().chain(rack) {
        if !seen.insert(tile.id()) {
            return Err(Error::DuplicateTile(tile.id()));
        }
    }
    Ok(())
}

/// Best placement with the default configuration
pub fn compute_best_placement(table: &Table, rack: &[Tile]) -> Result<Placement> {
    Solver::default().best_placement(table, rack)
}

/// Playable moves with the default configuration
pub fn list_playable_moves(table: &Table, rack: &[Tile]) -> Result<Vec<PlayableMove>> {
    Solver::default().playable_moves(table, rack)
}

/// Best table for a rack of bare faces, with the default configuration
pub fn find_moves(table: &Table, faces: &[Face]) -> Result<Table> {
    Solver::default().find_moves(table, faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::BinaryProgram;
    use crate::{Meld, MeldType};

    fn faces(list: &str) -> Vec<Face> {
        list.split_whitespace().map(|s| s.parse().unwrap()).collect()
    }

    fn setup(table: &[&str], rack: &str) -> (Table, Vec<Tile>) {
        let mut mint = TileMint::new();
        let mut t = Table::new();
        for meld in table {
            let (kind, list) = crate::parse_meld(meld).unwrap();
            t.add_meld(Meld::new(kind, mint.mint_all(list).into()));
        }
        (t, mint.mint_all(faces(rack)))
    }

    /// Gives up immediately
    struct Stubborn;

    impl Optimizer for Stubborn {
        fn maximize(&self, _: &BinaryProgram, _: &Deadline) -> Outcome {
            Outcome::TimedOut
        }
    }

    #[test]
    fn test_extend_run() {
        let (table, rack) = setup(&["k 1 2 3"], "k4");
        let placement = compute_best_placement(&table, &rack).unwrap();
        assert_eq!(placement.status, SolveStatus::Improved);
        assert_eq!(placement.consumed, vec![rack[0].id()]);
        assert_eq!(placement.table.to_string(), "  1. Run(k1 k2 k3 k4)\n");
        assert!(placement.remaining_rack(&rack).is_empty());
    }

    #[test]
    fn test_empty_rack() {
        let (table, _) = setup(&["k 1 2 3"], "");
        let placement = compute_best_placement(&table, &[]).unwrap();
        assert_eq!(placement.status, SolveStatus::EmptyRack);
        assert_eq!(placement.table, table);
    }

    #[test]
    fn test_no_improvement() {
        let (table, rack) = setup(&["k 6 7 8"], "r1 b3");
        let placement = compute_best_placement(&table, &rack).unwrap();
        assert_eq!(placement.status, SolveStatus::NoImprovement);
        assert_eq!(placement.table, table);
        assert_eq!(placement.remaining_rack(&rack), rack);
    }

    #[test]
    fn test_unfillable_gap_is_rejected() {
        let (table, rack) = setup(&["5 k b y", "r 1 2 4"], "k9");
        assert!(matches!(
            compute_best_placement(&table, &rack),
            Err(Error::InvalidMeld { index: 1, .. })
        ));
        assert!(matches!(
            compute_best_placement(&table, &[]),
            Err(Error::InvalidMeld { index: 1, .. })
        ));
    }

    #[test]
    fn test_table_wild_fills_gap_without_rack_tiles() {
        let (table, rack) = setup(&["r 1 2 4", "5 k b y w"], "k13");
        let placement = compute_best_placement(&table, &rack).unwrap();
        assert_eq!(placement.status, SolveStatus::NoImprovement);
        assert!(placement.consumed.is_empty());
        assert!(placement.table.is_valid());
        assert_eq!(
            placement.table.to_string(),
            "  1. Run(r1 r2 w:r3 r4)\n  2. Group(b5 y5 k5)\n"
        );
        assert!(list_playable_moves(&table, &rack).unwrap().is_empty());

        let idle = compute_best_placement(&table, &[]).unwrap();
        assert_eq!(idle.status, SolveStatus::EmptyRack);
        assert!(idle.table.is_valid());
        assert_eq!(idle.table.tile_count(), 7);
    }

    #[test]
    fn test_placement_with_moves_matches_separate_queries() {
        let (table, rack) = setup(&["r 1 2 3", "r 5 6 7"], "r4 b9 b10 b11");
        let solver = Solver::default();
        let (placement, moves) = solver.placement_with_moves(&table, &rack).unwrap();
        assert_eq!(placement, solver.best_placement(&table, &rack).unwrap());
        assert_eq!(moves, solver.playable_moves(&table, &rack).unwrap());
        assert_eq!(placement.table.len(), 2);
    }

    #[test]
    fn test_timeout_keeps_table() {
        let (table, rack) = setup(&["k 1 2 3"], "k4");
        let solver = Solver::with_optimizer(SolverConfig::default(), Stubborn);
        let placement = solver.best_placement(&table, &rack).unwrap();
        assert_eq!(placement.status, SolveStatus::TimedOut);
        assert_eq!(placement.table, table);
        assert!(placement.consumed.is_empty());
    }

    #[test]
    fn test_fallback_table_is_not_merged() {
        let (table, rack) = setup(&["k 4 5 6", "k 1 2 3"], "r9");
        let solver = Solver::with_optimizer(SolverConfig::default(), Stubborn);
        let placement = solver.best_placement(&table, &rack).unwrap();
        assert_eq!(placement.table, table);

        let placement = compute_best_placement(&table, &rack).unwrap();
        assert_eq!(placement.status, SolveStatus::NoImprovement);
        assert_eq!(placement.table, table);
    }

    #[test]
    fn test_node_limit_times_out() {
        let (table, rack) = setup(&["k 1 2 3", "r 5 6 7"], "k4 r8 b8 y8");
        let solver = Solver::new(SolverConfig::default().with_node_limit(1));
        let placement = solver.best_placement(&table, &rack).unwrap();
        assert_eq!(placement.status, SolveStatus::TimedOut);
    }

    #[test]
    fn test_rejects_malformed_meld() {
        let mut mint = TileMint::new();
        let mut table = Table::new();
        table.add_meld(Meld::new(MeldType::Run, mint.mint_all(faces("r1 b2 r3")).into()));
        assert!(matches!(
            compute_best_placement(&table, &[]),
            Err(Error::InvalidMeld { index: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let (table, _) = setup(&["k 1 2 3"], "");
        let reused = vec![table.melds()[0].tiles[0]];
        assert!(matches!(
            compute_best_placement(&table, &reused),
            Err(Error::DuplicateTile(_))
        ));
    }

    #[test]
    fn test_find_moves_with_faces() {
        let (table, _) = setup(&["r 1 2 3", "r 5 6 7"], "");
        let result = find_moves(&table, &faces("r4")).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.tile_count(), 7);
        assert!(result.is_valid());
    }

    #[test]
    fn test_playable_moves() {
        let (table, rack) = setup(&["k 1 2 3"], "k4 r9 r10 r11");
        let moves = list_playable_moves(&table, &rack).unwrap();
        assert_eq!(moves.len(), 2);
        let placed: usize = moves.iter().map(|m| m.rack_tiles.len()).sum();
        assert_eq!(placed, 4);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SolveStatus::NoImprovement).unwrap(),
            "\"no_improvement\""
        );
    }
}
