//! Command-line front end for the move solver.
//!
//! ```text
//! rummikub-move-solver --meld "k 1 2 3" --meld "5 r b y" --rack k4 w --moves
//! rummikub-move-solver --deal 14 --seed 7 --json
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rummikub_move_solver::deck::{TileMint, shuffled_set};
use rummikub_move_solver::json::{self, SolveResponse};
use rummikub_move_solver::{
    Face, Meld, Result, Solver, SolverConfig, Table, Tile, TileId, parse_meld,
};

#[derive(Parser, Debug)]
#[command(name = "rummikub-move-solver")]
#[command(
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_COMMIT"), ")"),
    about = "Find the table rearrangement that plays the most rack tiles"
)]
struct Cli {
    /// Table meld: "5 r b k" for a group, "y 6 7 8" for a run, `w` for a joker
    #[arg(long = "meld", short = 'm')]
    melds: Vec<String>,

    /// Rack tiles, e.g. r4 b13 w
    #[arg(long, short = 'r', num_args = 1..)]
    rack: Vec<String>,

    /// Deal this many rack tiles from a shuffled set instead of --rack
    #[arg(long, conflicts_with = "rack")]
    deal: Option<usize>,

    /// Shuffle seed for --deal
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Solver configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the search time limit
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Also list the melds that take rack tiles, unmerged
    #[arg(long)]
    moves: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => SolverConfig::load(path)?,
        None => SolverConfig::default(),
    };
    if let Some(ms) = cli.time_limit_ms {
        config = config.with_time_limit_ms(ms);
    }
    debug!(?config, "solver configuration");

    // Dealt tiles keep their set ids, so table tiles are minted after them.
    let (table, rack) = match cli.deal {
        Some(count) => {
            let rack: Vec<Tile> = shuffled_set(cli.seed).into_iter().take(count).collect();
            let table = build_table(&cli.melds, &mut TileMint::after_tiles(&rack))?;
            (table, rack)
        }
        None => {
            let mut mint = TileMint::new();
            let table = build_table(&cli.melds, &mut mint)?;
            let faces = cli
                .rack
                .iter()
                .map(|s| s.parse::<Face>())
                .collect::<Result<Vec<_>>>()?;
            (table, mint.mint_all(faces))
        }
    };

    let solver = Solver::new(config);
    let (placement, moves) = if cli.moves {
        solver.placement_with_moves(&table, &rack)?
    } else {
        (solver.best_placement(&table, &rack)?, Vec::new())
    };

    if cli.json {
        let index: HashMap<TileId, usize> =
            rack.iter().enumerate().map(|(i, t)| (t.id(), i)).collect();
        let response = SolveResponse {
            success: true,
            status: Some(placement.status),
            table: Some(placement.table.melds().iter().map(json::meld_to_json).collect()),
            consumed: Some(
                placement
                    .consumed
                    .iter()
                    .filter_map(|id| index.get(id).copied())
                    .collect(),
            ),
            moves: cli
                .moves
                .then(|| moves.iter().map(json::move_to_json).collect()),
            error: None,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("Rack: {}", tiles_line(&rack));
    println!("Table before:\n{table}");
    println!("Table after ({:?}):\n{}", placement.status, placement.table);

    let played: Vec<Tile> = rack
        .iter()
        .filter(|t| placement.consumed.contains(&t.id()))
        .copied()
        .collect();
    println!("Played ({}): {}", played.len(), tiles_line(&played));
    println!(
        "Remaining: {}",
        tiles_line(&placement.remaining_rack(&rack))
    );

    if cli.moves {
        println!("\nMoves:");
        for playable in &moves {
            println!("  {playable}");
        }
    }
    Ok(())
}

fn build_table(melds: &[String], mint: &mut TileMint) -> Result<Table> {
    let mut table = Table::new();
    for text in melds {
        let (kind, faces) = parse_meld(text)?;
        table.add_meld(Meld::new(kind, mint.mint_all(faces).into()));
    }
    Ok(table)
}

fn tiles_line(tiles: &[Tile]) -> String {
    if tiles.is_empty() {
        return "-".to_string();
    }
    tiles
        .iter()
        .map(Tile::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
