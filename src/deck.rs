//! Tile set construction and identity minting

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::{Color, Face, MAX_RANK, Table, Tile, TileId};

/// Copies of each colored face in a standard set
pub const COPIES_PER_FACE: usize = 2;
/// Jokers in a standard set
pub const WILDS_PER_SET: usize = 2;

/// Hands out tile identities that are unique within one game.
#[derive(Debug, Clone, Default)]
pub struct TileMint {
    next: u32,
}

impl TileMint {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mint whose ids never collide with tiles already on the table
    pub fn after(table: &Table) -> Self {
        Self::after_tiles(table.tiles())
    }

    /// A mint whose ids start after the highest id among `tiles`
    pub fn after_tiles<'a>(tiles: impl IntoIterator<Item = &'a Tile>) -> Self {
        let next = tiles
            .into_iter()
            .map(|t| t.id().0.saturating_add(1))
            .max()
            .unwrap_or(0);
        TileMint { next }
    }

    pub fn mint(&mut self, face: Face) -> Tile {
        let tile = Tile::new(TileId(self.next), face);
        self.next = self.next.saturating_add(1);
        tile
    }

    pub fn mint_all(&mut self, faces: impl IntoIterator<Item = Face>) -> Vec<Tile> {
        faces.into_iter().map(|face| self.mint(face)).collect()
    }
}

/// The standard 106-tile set: every colored face twice, plus two jokers.
pub fn standard_set() -> Vec<Tile> {
    let mut mint = TileMint::new();
    let mut tiles = Vec::with_capacity(
        Color::SUITS.len() * MAX_RANK as usize * COPIES_PER_FACE + WILDS_PER_SET,
    );
    for color in Color::SUITS {
        for rank in 1..=MAX_RANK {
            for _ in 0..COPIES_PER_FACE {
                tiles.push(mint.mint(Face::new(color, rank)));
            }
        }
    }
    for _ in 0..WILDS_PER_SET {
        tiles.push(mint.mint(Face::wild()));
    }
    tiles
}

/// The standard set in a reproducible random order
pub fn shuffled_set(seed: u64) -> Vec<Tile> {
    let mut tiles = standard_set();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    tiles.shuffle(&mut rng);
    tiles
}
