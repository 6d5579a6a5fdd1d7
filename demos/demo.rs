use rummikub_move_solver::deck::{TileMint, shuffled_set};
use rummikub_move_solver::{Meld, Table, compute_best_placement, list_playable_moves, parse_meld};

fn main() {
    println!("Rummikub Move Solver\n");

    // Deal a rack of 14 from a reproducible shuffle
    let rack: Vec<_> = shuffled_set(42).into_iter().take(14).collect();
    let mut mint = TileMint::after_tiles(&rack);

    let mut table = Table::new();
    for text in ["k 1 2 3", "r 5 6 7", "9 r b y"] {
        let (kind, faces) = parse_meld(text).expect("demo melds are well formed");
        table.add_meld(Meld::new(kind, mint.mint_all(faces).into()));
    }

    print!("Rack:");
    for tile in &rack {
        print!(" {tile}");
    }
    println!("\n\nTable:\n{table}");

    let placement = compute_best_placement(&table, &rack).expect("demo input is valid");
    println!("Best placement ({:?}, {} tiles played):", placement.status, placement.tiles_played());
    println!("{}", placement.table);

    print!("Left in rack:");
    for tile in placement.remaining_rack(&rack) {
        print!(" {tile}");
    }
    println!("\n");

    println!("Moves:");
    for playable in list_playable_moves(&table, &rack).expect("demo input is valid") {
        println!("  {playable}");
    }
}
