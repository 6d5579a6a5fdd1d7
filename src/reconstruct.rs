//! Turns an optimizer assignment back into melds of concrete tiles.

use std::collections::{BTreeMap, HashSet, VecDeque};

use thiserror::Error;

use crate::formulate::Slot;
use crate::universe::{Entry, Universe};
use crate::{Face, MAX_RANK, Meld, MeldType, Table, Tile, TileId};

/// A table rebuilt from active slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub table: Table,
    /// Rack tiles placed, in rack order
    pub consumed: Vec<TileId>,
}

/// A solution that cannot be laid out; always a modeling defect
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconstructError {
    #[error("no tile left for face {0}")]
    MissingTile(Face),

    #[error("table tile {0} was not placed")]
    LostTableTile(TileId),

    #[error("rebuilt meld {0} is not valid")]
    InvalidMeld(String),
}

/// Lay out the active slots with real tiles, one meld per slot.
///
/// Table tiles are drawn before rack tiles of the same face.
pub fn reconstruct<'a>(
    universe: &Universe,
    slots: impl IntoIterator<Item = &'a Slot>,
) -> Result<Reconstruction, ReconstructError> {
    let mut pools: BTreeMap<Face, VecDeque<Entry>> = BTreeMap::new();
    for entry in universe.entries() {
        pools.entry(entry.tile.face()).or_default().push_back(*entry);
    }

    let mut take = |face: Face| -> Result<Tile, ReconstructError> {
        pools
            .get_mut(&face)
            .and_then(VecDeque::pop_front)
            .map(|entry| entry.tile)
            .ok_or(ReconstructError::MissingTile(face))
    };

    let mut melds = Vec::new();
    for slot in slots {
        let plain = slot
            .faces
            .iter()
            .map(|&face| take(face))
            .collect::<Result<Vec<_>, _>>()?;
        let wilds = (0..slot.wilds)
            .map(|_| take(Face::wild()))
            .collect::<Result<Vec<_>, _>>()?;

        melds.push(match slot.kind {
            MeldType::Run => order_run(plain, wilds),
            MeldType::Group => order_group(plain, wilds),
        });
    }

    let placed: HashSet<TileId> = melds
        .iter()
        .flat_map(|m| m.tiles.iter().map(Tile::id))
        .collect();
    if let Some(lost) = universe
        .entries()
        .iter()
        .find(|e| e.mandatory && !placed.contains(&e.tile.id()))
    {
        return Err(ReconstructError::LostTableTile(lost.tile.id()));
    }

    if let Some(bad) = melds.iter().find(|m| !m.is_valid()) {
        return Err(ReconstructError::InvalidMeld(bad.to_string()));
    }
    sort_canonical(&mut melds);

    let consumed = universe
        .entries()
        .iter()
        .filter(|e| !e.mandatory && placed.contains(&e.tile.id()))
        .map(|e| e.tile.id())
        .collect();

    Ok(Reconstruction {
        table: Table::from(melds),
        consumed,
    })
}

/// Lay out a run: plain tiles by rank, wilds filling gaps in order, leftover
/// wilds after the highest rank or, once the run reaches 13, before the lowest.
pub fn order_run(mut plain: Vec<Tile>, wilds: Vec<Tile>) -> Meld {
    plain.sort_by_key(|t| t.face().rank());
    let mut wilds = wilds.into_iter();
    let mut tiles = VecDeque::with_capacity(plain.len() + wilds.len());

    let mut previous: Option<u8> = None;
    for tile in plain {
        let rank = tile.face().rank();
        if let Some(prev) = previous {
            for _ in prev + 1..rank {
                match wilds.next() {
                    Some(wild) => tiles.push_back(wild),
                    None => break,
                }
            }
        }
        tiles.push_back(tile);
        previous = Some(rank);
    }

    let mut high = previous.unwrap_or(MAX_RANK);
    for wild in wilds {
        if high < MAX_RANK {
            tiles.push_back(wild);
            high += 1;
        } else {
            tiles.push_front(wild);
        }
    }

    Meld::new(MeldType::Run, tiles)
}

/// Lay out a group: plain tiles by color, then wilds
pub fn order_group(mut plain: Vec<Tile>, wilds: Vec<Tile>) -> Meld {
    plain.sort_by_key(|t| t.face().color());
    Meld::group(plain.into_iter().chain(wilds))
}

/// Join same-color runs until no two of them lay out as one run.
///
/// Joined tiles are laid out afresh, so a wild left over at the end of one
/// piece can move to whichever side lets the pieces meet.
pub fn merge_runs(mut melds: Vec<Meld>) -> Vec<Meld> {
    loop {
        let Some((left, right, joined)) = find_joinable_runs(&melds) else {
            return melds;
        };
        melds[left] = joined;
        melds.remove(right);
    }
}

/// Merge the runs of a table and put it in canonical order
pub fn merge_table(table: Table) -> Table {
    let mut melds = merge_runs(table.into_melds());
    sort_canonical(&mut melds);
    Table::from(melds)
}

fn find_joinable_runs(melds: &[Meld]) -> Option<(usize, usize, Meld)> {
    for (i, a) in melds.iter().enumerate() {
        if a.meld_type != MeldType::Run {
            continue;
        }
        for (j, b) in melds.iter().enumerate().skip(i + 1) {
            if b.meld_type != MeldType::Run || a.color() != b.color() {
                continue;
            }
            if let Some(joined) = join_runs(a, b) {
                return Some((i, j, joined));
            }
        }
    }
    None
}

/// The single run holding both runs' tiles, if there is one
fn join_runs(a: &Meld, b: &Meld) -> Option<Meld> {
    let (wilds, plain): (Vec<Tile>, Vec<Tile>) = a
        .tiles
        .iter()
        .chain(&b.tiles)
        .copied()
        .partition(Tile::is_wild);
    let joined = order_run(plain, wilds);
    (joined.is_valid() && joined.run_bounds().is_some()).then_some(joined)
}

/// Runs by (color, lowest rank), then groups by rank
pub fn sort_canonical(melds: &mut [Meld]) {
    melds.sort_by_cached_key(|meld| {
        let faces = meld.faces();
        match meld.meld_type {
            MeldType::Run => {
                let color = meld.color().map_or(u8::MAX, |c| c as u8);
                let low = meld.run_bounds().map_or(0, |(low, _)| low);
                (0u8, color, low, faces)
            }
            MeldType::Group => {
                let rank = faces.iter().find(|f| !f.is_wild()).map_or(0, |f| f.rank());
                (1u8, rank, 0, faces)
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::TileMint;

    fn faces(list: &str) -> Vec<Face> {
        list.split_whitespace().map(|s| s.parse().unwrap()).collect()
    }

    fn shown(melds: &[Meld]) -> Vec<String> {
        melds.iter().map(Meld::to_string).collect()
    }

    fn run_slot(list: &str, wilds: u8) -> Slot {
        Slot {
            kind: MeldType::Run,
            faces: faces(list),
            wilds,
        }
    }

    #[test]
    fn test_order_run_fills_gap() {
        let mut mint = TileMint::new();
        let plain = mint.mint_all(faces("r4 r1 r2"));
        let wilds = mint.mint_all(faces("w"));
        let meld = order_run(plain, wilds);
        assert_eq!(meld.to_string(), "Run(r1 r2 w:r3 r4)");
        assert!(meld.is_valid());
    }

    #[test]
    fn test_order_run_leftover_wilds() {
        let mut mint = TileMint::new();
        let meld = order_run(mint.mint_all(faces("r1 r2")), mint.mint_all(faces("w")));
        assert_eq!(meld.to_string(), "Run(r1 r2 w:r3)");

        let top = order_run(mint.mint_all(faces("b12 b13")), mint.mint_all(faces("w")));
        assert_eq!(top.to_string(), "Run(w:b11 b12 b13)");

        let both = order_run(mint.mint_all(faces("y12")), mint.mint_all(faces("w w")));
        assert_eq!(both.to_string(), "Run(w:y11 y12 w:y13)");
    }

    #[test]
    fn test_order_group() {
        let mut mint = TileMint::new();
        let meld = order_group(mint.mint_all(faces("k5 r5")), mint.mint_all(faces("w")));
        assert_eq!(meld.to_string(), "Group(r5 k5 w)");
    }

    #[test]
    fn test_merge_runs() {
        let mut mint = TileMint::new();
        let melds = vec![
            Meld::run(mint.mint_all(faces("r5 r6 r7"))),
            Meld::run(mint.mint_all(faces("r1 r2 r3"))),
            Meld::run(mint.mint_all(faces("b4 b5 b6"))),
            Meld::run(mint.mint_all(faces("r4"))),
        ];
        let mut merged = merge_runs(melds);
        sort_canonical(&mut merged);
        assert_eq!(
            shown(&merged),
            vec!["Run(r1 r2 r3 r4 r5 r6 r7)", "Run(b4 b5 b6)"]
        );
    }

    #[test]
    fn test_merge_leaves_overlaps_alone() {
        let mut mint = TileMint::new();
        let melds = vec![
            Meld::run(mint.mint_all(faces("k1 k2 k3 k4"))),
            Meld::run(mint.mint_all(faces("k4 k5 k6"))),
        ];
        assert_eq!(merge_runs(melds).len(), 2);
    }

    #[test]
    fn test_merge_moves_leftover_wild() {
        let mut mint = TileMint::new();
        let melds = vec![
            order_run(mint.mint_all(faces("b1 b2 b3")), mint.mint_all(faces("w"))),
            Meld::run(mint.mint_all(faces("b4 b5 b6"))),
        ];
        assert_eq!(melds[0].to_string(), "Run(b1 b2 b3 w:b4)");
        assert_eq!(shown(&merge_runs(melds)), vec!["Run(b1 b2 b3 b4 b5 b6 w:b7)"]);

        let melds = vec![
            Meld::run(mint.mint_all(faces("r5 r6 r7"))),
            order_run(mint.mint_all(faces("r2 r3 r4")), mint.mint_all(faces("w"))),
        ];
        assert_eq!(shown(&merge_runs(melds)), vec!["Run(r2 r3 r4 r5 r6 r7 w:r8)"]);
    }

    #[test]
    fn test_merge_keeps_runs_a_wild_cannot_bridge() {
        let mut mint = TileMint::new();
        let melds = vec![
            order_run(mint.mint_all(faces("k1 k2")), mint.mint_all(faces("w"))),
            Meld::run(mint.mint_all(faces("k6 k7 k8"))),
        ];
        assert_eq!(merge_runs(melds).len(), 2);
    }

    #[test]
    fn test_merge_table() {
        let mut mint = TileMint::new();
        let table = Table::from(vec![
            Meld::group(mint.mint_all(faces("r9 b9 k9"))),
            Meld::run(mint.mint_all(faces("y4 y5 y6"))),
            Meld::run(mint.mint_all(faces("y1 y2 y3"))),
        ]);
        let merged = merge_table(table);
        assert_eq!(
            shown(merged.melds()),
            vec!["Run(y1 y2 y3 y4 y5 y6)", "Group(r9 b9 k9)"]
        );
    }

    #[test]
    fn test_canonical_order() {
        let mut mint = TileMint::new();
        let mut melds = vec![
            Meld::group(mint.mint_all(faces("r2 b2 k2"))),
            Meld::run(mint.mint_all(faces("k1 k2 k3"))),
            Meld::group(mint.mint_all(faces("r1 b1 k1"))),
            Meld::run(mint.mint_all(faces("r7 r8 r9"))),
            Meld::run(mint.mint_all(faces("r1 r2 r3"))),
        ];
        sort_canonical(&mut melds);
        assert_eq!(
            shown(&melds),
            vec![
                "Run(r1 r2 r3)",
                "Run(r7 r8 r9)",
                "Run(k1 k2 k3)",
                "Group(r1 b1 k1)",
                "Group(r2 b2 k2)",
            ]
        );
    }

    #[test]
    fn test_reconstruct_prefers_table_tiles() {
        let mut mint = TileMint::new();
        let mut table = Table::new();
        table.add_meld(Meld::run(mint.mint_all(faces("k1 k2 k3"))));
        let rack = mint.mint_all(faces("k3 k4"));
        let universe = Universe::build(&table, &rack);

        let slot = run_slot("k1 k2 k3 k4", 0);
        let result = reconstruct(&universe, [&slot]).unwrap();
        assert_eq!(result.consumed, vec![rack[1].id()]);
        assert_eq!(result.table.tile_count(), 4);
        assert!(result.table.melds()[0].contains(TileId(2)));
    }

    #[test]
    fn test_reconstruct_reports_lost_table_tile() {
        let mut mint = TileMint::new();
        let mut table = Table::new();
        table.add_meld(Meld::run(mint.mint_all(faces("k1 k2 k3"))));
        table.add_meld(Meld::run(mint.mint_all(faces("r1 r2 r3"))));
        let universe = Universe::build(&table, &[]);

        let slot = run_slot("k1 k2 k3", 0);
        assert_eq!(
            reconstruct(&universe, [&slot]),
            Err(ReconstructError::LostTableTile(TileId(3)))
        );
    }

    #[test]
    fn test_reconstruct_reports_missing_tile() {
        let universe = Universe::build(&Table::new(), &TileMint::new().mint_all(faces("k1 k2")));
        let slot = run_slot("k1 k2", 1);
        assert_eq!(
            reconstruct(&universe, [&slot]),
            Err(ReconstructError::MissingTile(Face::wild()))
        );
    }
}
