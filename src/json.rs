//! JSON request/response surface shared by the WASM bindings and the CLI.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::deck::TileMint;
use crate::error::Result;
use crate::moves::{MoveKind, PlayableMove};
use crate::solver::{SolveStatus, Solver};
use crate::{Face, Meld, MeldType, Table, Tile, TileId};

/// JSON-serializable representation of a meld
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MeldJson {
    #[serde(rename = "group")]
    Group { tiles: Vec<String> },
    #[serde(rename = "run")]
    Run { tiles: Vec<String> },
}

/// A solve request
#[derive(Debug, Clone, Deserialize)]
pub struct SolveRequest {
    #[serde(default)]
    pub table: Vec<MeldJson>,
    #[serde(default)]
    pub rack: Vec<String>,
    pub time_limit_ms: Option<u64>,
    pub node_limit: Option<u64>,
    /// Also describe the placement as moves
    #[serde(default)]
    pub moves: bool,
}

/// JSON-serializable representation of a playable move
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum MoveJson {
    #[serde(rename = "play_from_rack")]
    PlayFromRack { meld: MeldJson, rack_tiles: Vec<String> },

    #[serde(rename = "extend")]
    Extend {
        original: MeldJson,
        rack_tiles: Vec<String>,
        meld: MeldJson,
    },

    #[serde(rename = "join")]
    Join {
        sources: Vec<MeldJson>,
        rack_tiles: Vec<String>,
        meld: MeldJson,
    },

    #[serde(rename = "rearrange")]
    Rearrange {
        sources: Vec<MeldJson>,
        rack_tiles: Vec<String>,
        meld: MeldJson,
    },
}

/// Result of a solve request
#[derive(Debug, Clone, Default, Serialize)]
pub struct SolveResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SolveStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<Vec<MeldJson>>,
    /// Indices into the request's rack
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moves: Option<Vec<MoveJson>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Answer a JSON request with a JSON response. Never fails: problems are
/// reported in the response's `error` field.
pub fn solve_json(request: &str) -> String {
    let response = match handle(request) {
        Ok(response) => response,
        Err(e) => SolveResponse {
            error: Some(e.to_string()),
            ..SolveResponse::default()
        },
    };
    serde_json::to_string(&response)
        .unwrap_or_else(|e| format!(r#"{{"success":false,"error":"Serialization error: {e}"}}"#))
}

fn handle(request: &str) -> Result<SolveResponse> {
    let request: SolveRequest = serde_json::from_str(request)?;

    let mut config = SolverConfig::default();
    if let Some(ms) = request.time_limit_ms {
        config = config.with_time_limit_ms(ms);
    }
    if let Some(nodes) = request.node_limit {
        config = config.with_node_limit(nodes);
    }
    let solver = Solver::new(config);

    let mut mint = TileMint::new();
    let mut table = Table::new();
    for meld in &request.table {
        table.add_meld(meld_from_json(meld, &mut mint)?);
    }
    let rack = request
        .rack
        .iter()
        .map(|s| -> Result<Tile> { Ok(mint.mint(s.parse()?)) })
        .collect::<Result<Vec<_>>>()?;

    let (placement, moves) = if request.moves {
        let (placement, moves) = solver.placement_with_moves(&table, &rack)?;
        (placement, Some(moves.iter().map(move_to_json).collect::<Vec<_>>()))
    } else {
        (solver.best_placement(&table, &rack)?, None)
    };
    let rack_index: HashMap<TileId, usize> =
        rack.iter().enumerate().map(|(i, t)| (t.id(), i)).collect();

    Ok(SolveResponse {
        success: true,
        status: Some(placement.status),
        table: Some(placement.table.melds().iter().map(meld_to_json).collect()),
        consumed: Some(
            placement
                .consumed
                .iter()
                .filter_map(|id| rack_index.get(id).copied())
                .collect(),
        ),
        moves,
        error: None,
    })
}

/// Convert JSON meld to internal Meld type, minting fresh tile ids
pub fn meld_from_json(meld_json: &MeldJson, mint: &mut TileMint) -> Result<Meld> {
    let (meld_type, tile_strs) = match meld_json {
        MeldJson::Group { tiles } => (MeldType::Group, tiles),
        MeldJson::Run { tiles } => (MeldType::Run, tiles),
    };

    let faces = tile_strs
        .iter()
        .map(|s| s.parse::<Face>())
        .collect::<Result<Vec<_>>>()?;
    Ok(Meld::new(meld_type, mint.mint_all(faces).into()))
}

/// Convert internal Meld to JSON representation
pub fn meld_to_json(meld: &Meld) -> MeldJson {
    let tiles: Vec<String> = meld.tiles.iter().map(|t| t.to_string()).collect();

    match meld.meld_type {
        MeldType::Group => MeldJson::Group { tiles },
        MeldType::Run => MeldJson::Run { tiles },
    }
}

/// Convert a playable move to JSON representation
pub fn move_to_json(playable: &PlayableMove) -> MoveJson {
    let rack_tiles = playable.rack_tiles.iter().map(|t| t.to_string()).collect();
    let meld = meld_to_json(&playable.meld);
    match &playable.kind {
        MoveKind::PlayFromRack => MoveJson::PlayFromRack { meld, rack_tiles },
        MoveKind::Extend { original } => MoveJson::Extend {
            original: meld_to_json(original),
            rack_tiles,
            meld,
        },
        MoveKind::Join { sources } => MoveJson::Join {
            sources: sources.iter().map(meld_to_json).collect(),
            rack_tiles,
            meld,
        },
        MoveKind::Rearrange { sources } => MoveJson::Rearrange {
            sources: sources.iter().map(meld_to_json).collect(),
            rack_tiles,
            meld,
        },
    }
}
