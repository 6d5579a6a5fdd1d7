use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

pub mod config;
pub mod deck;
pub mod error;
pub mod formulate;
pub mod json;
pub mod moves;
pub mod optimizer;
pub mod program;
pub mod reconstruct;
pub mod solver;
pub mod universe;
#[cfg(target_arch = "wasm32")]
pub mod wasm_api;

pub use config::SolverConfig;
pub use error::{Error, Result};
pub use solver::{
    Placement, SolveStatus, Solver, compute_best_placement, find_moves, list_playable_moves,
};

/// Highest rank printed on a tile.
pub const MAX_RANK: u8 = 13;

/// Tile color. The four suits carry the codes 0-3 used by [`Face`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Color {
    Red = 0,
    Blue = 1,
    Yellow = 2,
    Black = 3,
    Wild = 4,
}

impl Color {
    /// The four real colors, in code order
    pub const SUITS: [Color; 4] = [Color::Red, Color::Blue, Color::Yellow, Color::Black];

    fn from_code(code: u8) -> Self {
        match code {
            0 => Color::Red,
            1 => Color::Blue,
            2 => Color::Yellow,
            3 => Color::Black,
            _ => Color::Wild,
        }
    }

    /// Letter used in the text notation: r, b, y, k or w
    pub fn letter(self) -> char {
        match self {
            Color::Red => 'r',
            Color::Blue => 'b',
            Color::Yellow => 'y',
            Color::Black => 'k',
            Color::Wild => 'w',
        }
    }

    /// Parse a suit letter. Wild is not a suit and yields None.
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "r" => Some(Color::Red),
            "b" => Some(Color::Blue),
            "y" => Some(Color::Yellow),
            "k" => Some(Color::Black),
            _ => None,
        }
    }
}

/// The interchangeable value of a tile, packed into a u8.
/// - Bits 0-1: Color (00 = Red, 01 = Blue, 10 = Yellow, 11 = Black)
/// - Bits 2-5: Rank (1-13)
/// - All 1s (0xFF): Wild/Joker
///
/// Faces order by rank first, then color; Wild sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Face(u8);

impl Face {
    const COLOR_MASK: u8 = 0b0000_0011;
    const RANK_MASK: u8 = 0b0011_1100;
    const RANK_SHIFT: u8 = 2;
    const WILD: u8 = 0xFF;

    /// Create a face from a suit color and a rank (1-13)
    pub fn new(color: Color, rank: u8) -> Self {
        assert!(color != Color::Wild, "Use Face::wild() for jokers");
        assert!((1..=MAX_RANK).contains(&rank), "Rank must be 1-13");
        Face((rank << Self::RANK_SHIFT) | color as u8)
    }

    /// Checked variant of [`Face::new`]
    pub fn try_new(color: Color, rank: u8) -> Option<Self> {
        if color == Color::Wild || !(1..=MAX_RANK).contains(&rank) {
            return None;
        }
        Some(Face::new(color, rank))
    }

    /// The wild/joker face
    pub fn wild() -> Self {
        Face(Self::WILD)
    }

    pub fn color(self) -> Color {
        if self.is_wild() {
            Color::Wild
        } else {
            Color::from_code(self.0 & Self::COLOR_MASK)
        }
    }

    /// Rank 1-13, or 0 for the wild
    pub fn rank(self) -> u8 {
        if self.is_wild() {
            0
        } else {
            (self.0 & Self::RANK_MASK) >> Self::RANK_SHIFT
        }
    }

    pub fn is_wild(self) -> bool {
        self.0 == Self::WILD
    }
}

/// Format: "r13" (red 13), "b1" (blue 1), "y7" (yellow 7), "k9" (black 9), "w" (wild)
impl FromStr for Face {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| Error::ParseTile {
            input: s.to_string(),
            reason,
        };

        if s == "w" {
            return Ok(Face::wild());
        }

        let mut chars = s.chars();
        let letter = match chars.next() {
            Some(c) => c.to_string(),
            None => return Err(invalid("empty tile".to_string())),
        };
        let digits = chars.as_str();
        if digits.is_empty() {
            return Err(invalid("missing rank".to_string()));
        }

        let color = Color::from_letter(&letter)
            .ok_or_else(|| invalid(format!("unknown color '{letter}'")))?;
        let rank: u8 = digits
            .parse()
            .map_err(|_| invalid(format!("invalid rank '{digits}'")))?;

        Face::try_new(color, rank).ok_or_else(|| invalid(format!("rank must be 1-13, got {rank}")))
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wild() {
            write!(f, "w")
        } else {
            write!(f, "{}{}", self.color().letter(), self.rank())
        }
    }
}

/// Unique identity of a physical tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(pub u32);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A physical tile: an identity plus the face printed on it.
///
/// Two tiles with the same face are interchangeable inside melds, but the
/// solver reports consumed rack tiles by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tile {
    id: TileId,
    face: Face,
}

impl Tile {
    pub fn new(id: TileId, face: Face) -> Self {
        Tile { id, face }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn face(&self) -> Face {
        self.face
    }

    pub fn is_wild(&self) -> bool {
        self.face.is_wild()
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.face.fmt(f)
    }
}

/// Sorted distinct ranks and the wild count of a would-be run, or None when
/// the plain tiles mix colors, repeat a rank, or are absent.
fn run_ranks(faces: &[Face]) -> Option<(Vec<u8>, usize)> {
    let mut color = None;
    let mut ranks = Vec::with_capacity(faces.len());
    let mut wilds = 0;

    for face in faces {
        if face.is_wild() {
            wilds += 1;
            continue;
        }
        match color {
            None => color = Some(face.color()),
            Some(c) if c != face.color() => return None,
            Some(_) => {}
        }
        ranks.push(face.rank());
    }

    if ranks.is_empty() {
        return None;
    }
    ranks.sort_unstable();
    if ranks.windows(2).any(|w| w[0] == w[1]) {
        return None;
    }
    Some((ranks, wilds))
}

/// Rank positions missing between consecutive sorted ranks
fn rank_gaps(sorted_ranks: &[u8]) -> usize {
    sorted_ranks
        .windows(2)
        .map(|w| (w[1] - w[0] - 1) as usize)
        .sum()
}

/// Whether the faces can be laid out as a run.
///
/// Order does not matter: at least 3 faces, one color among the plain faces,
/// distinct ranks, and no more missing ranks between them than wilds present.
pub fn is_valid_run(faces: &[Face]) -> bool {
    if faces.len() < 3 || faces.len() > MAX_RANK as usize {
        return false;
    }
    match run_ranks(faces) {
        Some((ranks, wilds)) => rank_gaps(&ranks) <= wilds,
        None => false,
    }
}

/// Whether the faces form a group: 3 or 4 faces, one rank, distinct colors
pub fn is_valid_group(faces: &[Face]) -> bool {
    if !(3..=4).contains(&faces.len()) {
        return false;
    }

    let mut rank = None;
    let mut seen = [false; 4];
    let mut plain = 0;
    for face in faces.iter().filter(|f| !f.is_wild()) {
        match rank {
            None => rank = Some(face.rank()),
            Some(r) if r != face.rank() => return false,
            Some(_) => {}
        }
        let code = face.color() as usize;
        if seen[code] {
            return false;
        }
        seen[code] = true;
        plain += 1;
    }

    plain > 0
}

/// Type of meld in Rummikub
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MeldType {
    /// A group: same rank, different colors
    Group,
    /// A run: consecutive ranks, same color
    Run,
}

/// A meld (set of tiles) on the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meld {
    pub meld_type: MeldType,
    pub tiles: VecDeque<Tile>,
}

impl Meld {
    /// Create a new meld
    pub fn new(meld_type: MeldType, tiles: VecDeque<Tile>) -> Self {
        Meld { meld_type, tiles }
    }

    pub fn run(tiles: impl IntoIterator<Item = Tile>) -> Self {
        Meld::new(MeldType::Run, tiles.into_iter().collect())
    }

    pub fn group(tiles: impl IntoIterator<Item = Tile>) -> Self {
        Meld::new(MeldType::Group, tiles.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn faces(&self) -> Vec<Face> {
        self.tiles.iter().map(Tile::face).collect()
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.tiles.iter().any(|t| t.id() == id)
    }

    /// Check the meld against the run or group predicate
    pub fn is_valid(&self) -> bool {
        let faces = self.faces();
        match self.meld_type {
            MeldType::Run => is_valid_run(&faces),
            MeldType::Group => is_valid_group(&faces),
        }
    }

    /// Structural check applied to melds handed to the solver.
    ///
    /// Same as [`Meld::is_valid`] except that a run may have rank gaps not yet
    /// covered by wilds.
    pub fn is_well_formed(&self) -> bool {
        match self.meld_type {
            MeldType::Run => {
                (3..=MAX_RANK as usize).contains(&self.len()) && run_ranks(&self.faces()).is_some()
            }
            MeldType::Group => self.is_valid(),
        }
    }

    /// Color of the plain tiles, or None for an all-wild meld
    pub fn color(&self) -> Option<Color> {
        self.tiles.iter().find(|t| !t.is_wild()).map(|t| t.face().color())
    }

    /// Lowest and highest rank covered by a run, reading wilds by position
    pub fn run_bounds(&self) -> Option<(u8, u8)> {
        if self.meld_type != MeldType::Run {
            return None;
        }
        let low = self.tiles.iter().enumerate().find_map(|(i, t)| {
            (!t.is_wild()).then(|| t.face().rank() as i32 - i as i32)
        })?;
        let high = low + self.len() as i32 - 1;
        if low < 1 || high > MAX_RANK as i32 {
            return None;
        }
        Some((low as u8, high as u8))
    }

    /// The face the tile at `position` stands for.
    ///
    /// For runs: the wild's position determines its rank.
    /// For groups: a wild is determined only when exactly one color is missing.
    pub fn represented(&self, position: usize) -> Option<Face> {
        let tile = self.tiles.get(position)?;
        if !tile.is_wild() {
            return Some(tile.face());
        }

        match self.meld_type {
            MeldType::Run => {
                let (low, _) = self.run_bounds()?;
                Face::try_new(self.color()?, low + position as u8)
            }
            MeldType::Group => {
                let rank = self.tiles.iter().find(|t| !t.is_wild())?.face().rank();
                let missing: Vec<Color> = Color::SUITS
                    .into_iter()
                    .filter(|c| !self.tiles.iter().any(|t| t.face().color() == *c))
                    .collect();
                match missing.as_slice() {
                    [only] => Some(Face::new(*only, rank)),
                    _ => None,
                }
            }
        }
    }

    /// Sum of the ranks on the meld, wilds counted as what they stand for
    pub fn points(&self) -> u32 {
        let group_rank = self
            .tiles
            .iter()
            .find(|t| !t.is_wild())
            .map_or(0, |t| t.face().rank() as u32);

        (0..self.len())
            .map(|i| match self.represented(i) {
                Some(face) => face.rank() as u32,
                None if self.meld_type == MeldType::Group => group_rank,
                None => 0,
            })
            .sum()
    }

    /// Whether the meld would stay valid with one more tile
    pub fn can_add(&self, tile: Tile) -> bool {
        let mut faces = self.faces();
        faces.push(tile.face());
        match self.meld_type {
            MeldType::Run => is_valid_run(&faces),
            MeldType::Group => is_valid_group(&faces),
        }
    }
}

impl fmt::Display for Meld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.meld_type {
            MeldType::Run => "Run",
            MeldType::Group => "Group",
        };
        write!(f, "{label}(")?;
        for (i, tile) in self.tiles.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match self.represented(i) {
                Some(face) if tile.is_wild() => write!(f, "w:{face}")?,
                _ => write!(f, "{tile}")?,
            }
        }
        write!(f, ")")
    }
}

/// Parse a meld from text, auto-detecting type
/// Formats:
/// - Group: "5 r b k" (rank followed by color letters, `w` for a joker)
/// - Run: "y 6 7 8" (color letter followed by ranks, `w` for a joker)
pub fn parse_meld(input: &str) -> Result<(MeldType, Vec<Face>)> {
    let invalid = |reason: String| Error::ParseMeld {
        input: input.to_string(),
        reason,
    };

    let tokens: Vec<&str> = input.split_whitespace().collect();
    let Some((head, rest)) = tokens.split_first() else {
        return Err(invalid("empty meld".to_string()));
    };

    let (meld_type, faces) = if let Ok(rank) = head.parse::<u8>() {
        if !(1..=MAX_RANK).contains(&rank) {
            return Err(invalid(format!("rank must be 1-13, got {rank}")));
        }
        let mut faces = Vec::with_capacity(rest.len());
        for token in rest {
            if *token == "w" {
                faces.push(Face::wild());
                continue;
            }
            let color = Color::from_letter(token)
                .ok_or_else(|| invalid(format!("invalid color '{token}'")))?;
            faces.push(Face::new(color, rank));
        }
        (MeldType::Group, faces)
    } else if let Some(color) = Color::from_letter(head) {
        let mut faces = Vec::with_capacity(rest.len());
        for token in rest {
            if *token == "w" {
                faces.push(Face::wild());
                continue;
            }
            let rank: u8 = token
                .parse()
                .map_err(|_| invalid(format!("invalid rank '{token}'")))?;
            let face = Face::try_new(color, rank)
                .ok_or_else(|| invalid(format!("rank must be 1-13, got {rank}")))?;
            faces.push(face);
        }
        (MeldType::Run, faces)
    } else {
        return Err(invalid(
            "use 'N c1 c2 c3' for a group or 'C n1 n2 n3' for a run".to_string(),
        ));
    };

    if faces.len() < 3 {
        return Err(invalid(format!("a meld needs at least 3 tiles, got {}", faces.len())));
    }
    Ok((meld_type, faces))
}

/// A multiset of faces
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tally(BTreeMap<Face, u8>);

impl Tally {
    /// Create a new empty tally
    pub fn new() -> Self {
        Tally(BTreeMap::new())
    }

    /// Add a face to the tally
    pub fn add(&mut self, face: Face) {
        *self.0.entry(face).or_insert(0) += 1;
    }

    /// Get the count of a specific face
    pub fn count(&self, face: &Face) -> u8 {
        self.0.get(face).copied().unwrap_or(0)
    }

    /// Total number of faces counted
    pub fn total(&self) -> usize {
        self.0.values().map(|&c| c as usize).sum()
    }

    /// Iterate faces and their counts in face order
    pub fn iter(&self) -> impl Iterator<Item = (&Face, &u8)> {
        self.0.iter()
    }
}

impl FromIterator<Face> for Tally {
    fn from_iter<I: IntoIterator<Item = Face>>(iter: I) -> Self {
        let mut tally = Tally::new();
        for face in iter {
            tally.add(face);
        }
        tally
    }
}

/// The table state (all melds currently on the table)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table(Vec<Meld>);

impl Table {
    /// Create a new empty table
    pub fn new() -> Self {
        Table(Vec::new())
    }

    /// Add a meld to the table
    pub fn add_meld(&mut self, meld: Meld) {
        self.0.push(meld);
    }

    /// Get all melds on the table
    pub fn melds(&self) -> &[Meld] {
        &self.0
    }

    /// Take the melds out of the table
    pub fn into_melds(self) -> Vec<Meld> {
        self.0
    }

    /// Get the number of melds on the table
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every tile on the table, meld by meld
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.0.iter().flat_map(|m| m.tiles.iter())
    }

    pub fn tile_count(&self) -> usize {
        self.0.iter().map(Meld::len).sum()
    }

    /// True when every meld passes its own validity predicate
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(Meld::is_valid)
    }
}

impl From<Vec<Meld>> for Table {
    fn from(melds: Vec<Meld>) -> Self {
        Table(melds)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "(empty table)");
        }
        for (i, meld) in self.0.iter().enumerate() {
            writeln!(f, "{:>3}. {}", i + 1, meld)?;
        }
        Ok(())
    }
}
