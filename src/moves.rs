//! Describing a new table in terms of the moves a player would make.

use std::collections::HashMap;
use std::fmt;

use crate::{Meld, Table, Tile, TileId};

/// How a meld holding rack tiles came about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveKind {
    /// Every tile came from the rack
    PlayFromRack,

    /// Rack tiles added to one table meld kept whole
    Extend { original: Meld },

    /// Several whole table melds joined, with rack tiles
    Join { sources: Vec<Meld> },

    /// Tiles taken from table melds that were broken up
    Rearrange { sources: Vec<Meld> },
}

/// A meld of the new table that places at least one rack tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableMove {
    pub meld: Meld,
    /// Rack tiles placed in this meld
    pub rack_tiles: Vec<Tile>,
    pub kind: MoveKind,
}

impl fmt::Display for PlayableMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let played: Vec<String> = self.rack_tiles.iter().map(Tile::to_string).collect();
        let played = played.join(" ");
        match &self.kind {
            MoveKind::PlayFromRack => write!(f, "play {}", self.meld),
            MoveKind::Extend { original } => {
                write!(f, "add {played} to {original} -> {}", self.meld)
            }
            MoveKind::Join { sources } => {
                write!(f, "join")?;
                for source in sources {
                    write!(f, " {source}")?;
                }
                write!(f, " with {played} -> {}", self.meld)
            }
            MoveKind::Rearrange { sources } => {
                write!(f, "rearrange")?;
                for source in sources {
                    write!(f, " {source}")?;
                }
                write!(f, " with {played} -> {}", self.meld)
            }
        }
    }
}

/// Compare the new table with the old one, meld by meld.
///
/// Provenance is tracked by tile id, so duplicate faces never confuse which
/// table meld a tile came from.
pub fn describe(original: &Table, new_table: &Table, rack: &[Tile]) -> Vec<PlayableMove> {
    let origin: HashMap<TileId, usize> = original
        .melds()
        .iter()
        .enumerate()
        .flat_map(|(i, meld)| meld.tiles.iter().map(move |t| (t.id(), i)))
        .collect();
    let rack_ids: HashMap<TileId, Tile> = rack.iter().map(|t| (t.id(), *t)).collect();

    let mut moves = Vec::new();
    for meld in new_table.melds() {
        let rack_tiles: Vec<Tile> = meld
            .tiles
            .iter()
            .filter_map(|t| rack_ids.get(&t.id()).copied())
            .collect();
        if rack_tiles.is_empty() {
            continue;
        }

        let mut sources: Vec<usize> = meld
            .tiles
            .iter()
            .filter_map(|t| origin.get(&t.id()).copied())
            .collect();
        sources.sort_unstable();
        sources.dedup();

        let whole = sources.iter().all(|&i| {
            original.melds()[i]
                .tiles
                .iter()
                .all(|t| meld.contains(t.id()))
        });
        let source_melds = || -> Vec<Meld> {
            sources.iter().map(|&i| original.melds()[i].clone()).collect()
        };

        let kind = match sources.as_slice() {
            [] => MoveKind::PlayFromRack,
            [only] if whole => MoveKind::Extend {
                original: original.melds()[*only].clone(),
            },
            _ if whole => MoveKind::Join {
                sources: source_melds(),
            },
            _ => MoveKind::Rearrange {
                sources: source_melds(),
            },
        };

        moves.push(PlayableMove {
            meld: meld.clone(),
            rack_tiles,
            kind,
        });
    }
    moves
}
