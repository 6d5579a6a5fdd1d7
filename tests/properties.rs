//! Property-based tests for the placement pipeline.

use std::collections::BTreeSet;

use proptest::prelude::*;

use rummikub_move_solver::deck::{TileMint, shuffled_set};
use rummikub_move_solver::{
    Color, Face, Meld, SolveStatus, Table, Tile, TileId, compute_best_placement, is_valid_group,
    is_valid_run, list_playable_moves,
};

/// Whether the faces split into valid melds, by exhaustive search
fn partitionable(faces: &[Face]) -> bool {
    let Some((&first, rest)) = faces.split_first() else {
        return true;
    };
    let n = rest.len();
    for mask in 0u32..(1 << n) {
        let size = mask.count_ones() as usize + 1;
        if size < 3 {
            continue;
        }
        let mut meld = vec![first];
        let mut others = Vec::with_capacity(n);
        for (i, face) in rest.iter().enumerate() {
            if mask & (1 << i) != 0 {
                meld.push(*face);
            } else {
                others.push(*face);
            }
        }
        if (is_valid_run(&meld) || is_valid_group(&meld)) && partitionable(&others) {
            return true;
        }
    }
    false
}

/// Most rack tiles any valid arrangement can place
fn brute_force_best(table: &Table, rack: &[Tile]) -> usize {
    let table_faces: Vec<Face> = table.tiles().map(Tile::face).collect();
    let mut best = 0;
    for mask in 0u32..(1 << rack.len()) {
        let size = mask.count_ones() as usize;
        if size <= best {
            continue;
        }
        let mut faces = table_faces.clone();
        faces.extend(
            rack.iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, t)| t.face()),
        );
        if partitionable(&faces) {
            best = size;
        }
    }
    best
}

/// A valid table built from `table_draw` tiles of a shuffled set, plus a rack
/// of the next `rack_draw` tiles.
fn deal(seed: u64, table_draw: usize, rack_draw: usize) -> (Table, Vec<Tile>) {
    let set = shuffled_set(seed);
    let seeded = compute_best_placement(&Table::new(), &set[..table_draw]).unwrap();
    let rack = set[table_draw..table_draw + rack_draw].to_vec();
    (seeded.table, rack)
}

/// A table holding a wild: either inside a run, or in a group of four while
/// the run it could fill is left with a gap. The rack comes from a shuffled
/// set, so table faces may repeat rack faces.
fn wild_table(
    color: Color,
    start: u8,
    len: u8,
    hole: u8,
    group_rank: u8,
    gapped: bool,
    rack: &[Tile],
) -> Table {
    let mut mint = TileMint::after_tiles(rack);
    let mut run = Vec::new();
    for rank in start..start + len {
        if rank != start + hole {
            run.push(Face::new(color, rank));
        } else if !gapped {
            run.push(Face::wild());
        }
    }

    let mut table = Table::new();
    table.add_meld(Meld::run(mint.mint_all(run)));
    if gapped {
        let group = [Color::Red, Color::Blue, Color::Yellow]
            .map(|c| Face::new(c, group_rank))
            .into_iter()
            .chain([Face::wild()]);
        table.add_meld(Meld::group(mint.mint_all(group)));
    }
    table
}

fn ids(table: &Table) -> BTreeSet<TileId> {
    table.tiles().map(Tile::id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    // 1. Every meld that leaves the solver is valid
    #[test]
    fn placement_is_valid(seed in any::<u64>(), table_draw in 0..12usize, rack_draw in 0..8usize) {
        let (table, rack) = deal(seed, table_draw, rack_draw);
        let placement = compute_best_placement(&table, &rack).unwrap();
        prop_assert!(placement.table.is_valid(), "invalid table:\n{}", placement.table);
    }

    // 2. Tiles are neither lost nor invented
    #[test]
    fn tiles_are_conserved(seed in any::<u64>(), table_draw in 0..12usize, rack_draw in 0..8usize) {
        let (table, rack) = deal(seed, table_draw, rack_draw);
        let placement = compute_best_placement(&table, &rack).unwrap();

        let consumed: BTreeSet<TileId> = placement.consumed.iter().copied().collect();
        prop_assert_eq!(consumed.len(), placement.consumed.len());
        prop_assert_eq!(placement.table.tile_count(), ids(&placement.table).len());
        prop_assert_eq!(ids(&placement.table), &ids(&table) | &consumed);
        prop_assert_eq!(
            placement.remaining_rack(&rack).len() + placement.tiles_played(),
            rack.len()
        );
    }

    // 3. An empty rack changes nothing
    #[test]
    fn empty_rack_is_identity(seed in any::<u64>(), table_draw in 0..14usize) {
        let (table, _) = deal(seed, table_draw, 0);
        let placement = compute_best_placement(&table, &[]).unwrap();
        prop_assert_eq!(placement.status, SolveStatus::EmptyRack);
        prop_assert_eq!(placement.table, table);
    }

    // 4. No arrangement places more rack tiles
    #[test]
    fn placement_is_maximal(seed in any::<u64>(), table_draw in 0..8usize, rack_draw in 0..5usize) {
        let (table, rack) = deal(seed, table_draw, rack_draw);
        let placement = compute_best_placement(&table, &rack).unwrap();
        prop_assert_eq!(placement.tiles_played(), brute_force_best(&table, &rack));
    }

    // 5. Moves account for exactly the placed rack tiles
    #[test]
    fn moves_cover_placement(
        seed in any::<u64>(),
        table_draw in 0..10usize,
        rack_draw in 0..6usize,
    ) {
        let (table, rack) = deal(seed, table_draw, rack_draw);
        let placement = compute_best_placement(&table, &rack).unwrap();
        let moves = list_playable_moves(&table, &rack).unwrap();

        let placed: usize = moves.iter().map(|m| m.rack_tiles.len()).sum();
        prop_assert_eq!(placed, placement.tiles_played());
        for playable in &moves {
            prop_assert!(playable.meld.is_valid());
        }
    }

    // 6. Wilds already on the table, including a gap one of them must fill
    #[test]
    fn table_wilds_stay_valid(
        suit in 0..4usize,
        start in 1..=8u8,
        len in 4..=6u8,
        hole_seed in any::<u8>(),
        group_rank in 1..=13u8,
        gapped in any::<bool>(),
        seed in any::<u64>(),
        rack_draw in 0..6usize,
    ) {
        let rack = shuffled_set(seed)[..rack_draw].to_vec();
        let hole = 1 + hole_seed % (len - 2);
        let table = wild_table(Color::SUITS[suit], start, len, hole, group_rank, gapped, &rack);
        prop_assert_eq!(table.is_valid(), !gapped);

        let placement = compute_best_placement(&table, &rack).unwrap();
        prop_assert!(placement.table.is_valid(), "invalid table:\n{}", placement.table);
        let consumed: BTreeSet<TileId> = placement.consumed.iter().copied().collect();
        prop_assert_eq!(ids(&placement.table), &ids(&table) | &consumed);
    }

    // 7. A straight with a spare wild comes back as one run
    #[test]
    fn straight_with_wild_is_one_run(
        suit in 0..4usize,
        len in 6..=12u8,
        start_seed in any::<u8>(),
    ) {
        let color = Color::SUITS[suit];
        let start = 1 + start_seed % (14 - len);
        let mut mint = TileMint::new();
        let rack = mint.mint_all(
            (start..start + len)
                .map(|rank| Face::new(color, rank))
                .chain([Face::wild()]),
        );

        let placement = compute_best_placement(&Table::new(), &rack).unwrap();
        prop_assert_eq!(placement.tiles_played(), rack.len());
        prop_assert_eq!(placement.table.len(), 1, "not merged:\n{}", placement.table);
        prop_assert!(placement.table.is_valid());
    }
}
