//! The combined tile set considered in one solve.

use crate::{Face, Table, Tally, Tile};

/// A tile of the universe and whether it has to stay on the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub tile: Tile,
    /// Table tiles are mandatory; rack tiles are optional.
    pub mandatory: bool,
}

/// Table tiles followed by rack tiles, each tagged mandatory or optional.
///
/// Every mandatory tile must end up in exactly one meld of the answer;
/// optional tiles in at most one.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    entries: Vec<Entry>,
    mandatory: Tally,
    available: Tally,
}

impl Universe {
    pub fn build(table: &Table, rack: &[Tile]) -> Self {
        let table_tiles = table.tiles().map(|&tile| Entry {
            tile,
            mandatory: true,
        });
        let rack_tiles = rack.iter().map(|&tile| Entry {
            tile,
            mandatory: false,
        });

        let mut universe = Universe::default();
        for entry in table_tiles.chain(rack_tiles) {
            if entry.mandatory {
                universe.mandatory.add(entry.tile.face());
            }
            universe.available.add(entry.tile.face());
            universe.entries.push(entry);
        }
        universe
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Faces that must be placed, with multiplicity
    pub fn mandatory(&self) -> &Tally {
        &self.mandatory
    }

    /// All faces in the universe, with multiplicity
    pub fn available(&self) -> &Tally {
        &self.available
    }

    pub fn mandatory_count(&self) -> usize {
        self.mandatory.total()
    }

    pub fn optional_count(&self) -> usize {
        self.len() - self.mandatory_count()
    }

    pub fn wild_count(&self) -> u8 {
        self.available.count(&Face::wild())
    }

    /// Upper bound on the melds of one kind any answer can contain
    pub fn slot_bound(&self) -> usize {
        self.len().div_ceil(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::TileMint;
    use crate::{Color, Meld};

    #[test]
    fn test_build_tags_table_and_rack() {
        let mut mint = TileMint::new();
        let mut table = Table::new();
        table.add_meld(Meld::run(mint.mint_all([
            Face::new(Color::Black, 1),
            Face::new(Color::Black, 2),
            Face::new(Color::Black, 3),
        ])));
        let rack = mint.mint_all([Face::new(Color::Black, 3), Face::wild()]);

        let universe = Universe::build(&table, &rack);
        assert_eq!(universe.len(), 5);
        assert_eq!(universe.mandatory_count(), 3);
        assert_eq!(universe.optional_count(), 2);
        assert_eq!(universe.available().count(&Face::new(Color::Black, 3)), 2);
        assert_eq!(universe.mandatory().count(&Face::new(Color::Black, 3)), 1);
        assert_eq!(universe.wild_count(), 1);
        assert_eq!(universe.slot_bound(), 2);

        assert!(universe.entries()[..3].iter().all(|e| e.mandatory));
        assert!(universe.entries()[3..].iter().all(|e| !e.mandatory));
    }

    #[test]
    fn test_empty_inputs() {
        let universe = Universe::build(&Table::new(), &[]);
        assert!(universe.is_empty());
        assert_eq!(universe.slot_bound(), 0);
    }
}
