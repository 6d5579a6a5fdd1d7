//! Builds the binary program for one solve.
//!
//! Each decision variable activates one copy of a candidate [`Slot`]: a face
//! multiset that lays out as a valid run or group. Per-face rows require every
//! table tile to be used and no face to be used more often than the universe
//! holds it. The objective counts the tiles placed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::program::{BinaryProgram, Sense, VarId};
use crate::universe::Universe;
use crate::{Color, Face, MAX_RANK, MeldType};

/// Longest run worth enumerating while the universe holds fewer than three
/// wilds. Any longer run splits into runs of 3 to 5 tiles that each keep a
/// plain tile, and run merging rejoins them.
const SHORT_RUN_LIMIT: u8 = 5;

/// Candidate meld content: plain faces (sorted, distinct) plus a wild count
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    pub kind: MeldType,
    pub faces: Vec<Face>,
    pub wilds: u8,
}

impl Slot {
    pub fn size(&self) -> usize {
        self.faces.len() + self.wilds as usize
    }

    /// Faces with multiplicity, wilds last
    pub fn all_faces(&self) -> impl Iterator<Item = Face> + '_ {
        self.faces
            .iter()
            .copied()
            .chain(std::iter::repeat_n(Face::wild(), self.wilds as usize))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            MeldType::Run => "run",
            MeldType::Group => "group",
        };
        write!(f, "{label}[")?;
        for (i, face) in self.all_faces().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{face}")?;
        }
        write!(f, "]")
    }
}

/// The program plus what its variables mean
#[derive(Debug, Clone)]
pub struct Formulation {
    pub program: BinaryProgram,
    /// Slot activated by each variable, indexed by [`VarId`]
    pub slots: Vec<Slot>,
    /// Tiles that are placed whatever the solution
    pub table_tiles: usize,
    pub slot_bound: usize,
}

impl Formulation {
    /// Slots switched on by a solution
    pub fn active_slots<'a>(&'a self, values: &'a [bool]) -> impl Iterator<Item = &'a Slot> + 'a {
        self.slots
            .iter()
            .zip(values)
            .filter(|(_, active)| **active)
            .map(|(slot, _)| slot)
    }

    /// Rack tiles placed by a solution with the given objective value
    pub fn rack_tiles_placed(&self, objective: i64) -> i64 {
        objective - self.table_tiles as i64
    }
}

/// Build the program for a universe.
pub fn formulate(universe: &Universe) -> Formulation {
    let available = universe.available();

    let mut candidates = BTreeSet::new();
    for color in Color::SUITS {
        enumerate_runs(color, universe, &mut candidates);
    }
    for rank in 1..=MAX_RANK {
        enumerate_groups(rank, universe, &mut candidates);
    }

    let mut program = BinaryProgram::new();
    let mut slots = Vec::new();
    let mut usage: BTreeMap<Face, Vec<(VarId, i64)>> = BTreeMap::new();

    for slot in candidates {
        let copies = copies_available(&slot, universe);
        let mut previous: Option<VarId> = None;
        for copy in 0..copies {
            let var = program.add_var(format!("{slot}#{copy}"), slot.size() as i64);
            for face in slot.faces.iter().copied() {
                usage.entry(face).or_default().push((var, 1));
            }
            if slot.wilds > 0 {
                usage
                    .entry(Face::wild())
                    .or_default()
                    .push((var, slot.wilds as i64));
            }
            if let Some(prev) = previous {
                program.add_constraint(vec![(var, 1), (prev, -1)], Sense::Le, 0);
            }
            previous = Some(var);
            slots.push(slot.clone());
        }
    }

    for (&face, &count) in available.iter() {
        let mandatory = universe.mandatory().count(&face) as i64;
        let count = count as i64;
        let terms = usage.remove(&face).unwrap_or_default();
        if terms.is_empty() && mandatory == 0 {
            continue;
        }
        if mandatory == count {
            program.add_constraint(terms, Sense::Eq, count);
        } else {
            if mandatory > 0 {
                program.add_constraint(terms.clone(), Sense::Ge, mandatory);
            }
            program.add_constraint(terms, Sense::Le, count);
        }
    }

    Formulation {
        program,
        slots,
        table_tiles: universe.mandatory_count(),
        slot_bound: universe.slot_bound(),
    }
}

/// How many disjoint copies of the slot the universe can supply
fn copies_available(slot: &Slot, universe: &Universe) -> u8 {
    let available = universe.available();
    let plain = slot.faces.iter().map(|f| available.count(f)).min();
    let wild = (slot.wilds > 0).then(|| universe.wild_count() / slot.wilds);
    match (plain, wild) {
        (Some(p), Some(w)) => p.min(w),
        (Some(p), None) => p,
        (None, Some(w)) => w,
        (None, None) => 0,
    }
}

/// Add every run of `color` the universe could lay out
fn enumerate_runs(color: Color, universe: &Universe, candidates: &mut BTreeSet<Slot>) {
    let available = universe.available();
    let wilds = universe.wild_count();
    let longest = if wilds < 3 { SHORT_RUN_LIMIT } else { MAX_RANK };

    for start in 1..=(MAX_RANK - 2) {
        let max_len = (MAX_RANK + 1 - start).min(longest);
        for length in 3..=max_len {
            let window: Vec<Face> = (start..start + length).map(|r| Face::new(color, r)).collect();
            let missing = window.iter().filter(|f| available.count(f) == 0).count();
            let budget = (wilds as usize).min(length as usize - 1);
            if missing > budget {
                continue;
            }

            // Wilds must cover the missing ranks and may stand in for present ones.
            let present: Vec<Face> = window
                .iter()
                .copied()
                .filter(|f| available.count(f) > 0)
                .collect();
            for extra in 0..=(budget - missing) {
                for_each_subset(present.len(), extra, |skipped| {
                    let faces: Vec<Face> = present
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| !skipped.contains(i))
                        .map(|(_, f)| *f)
                        .collect();
                    if !faces.is_empty() {
                        candidates.insert(Slot {
                            kind: MeldType::Run,
                            faces,
                            wilds: (missing + extra) as u8,
                        });
                    }
                });
            }
        }
    }
}

/// Add every group of `rank` the universe could lay out
fn enumerate_groups(rank: u8, universe: &Universe, candidates: &mut BTreeSet<Slot>) {
    let available = universe.available();
    let wilds = universe.wild_count() as usize;
    let colors: Vec<Face> = Color::SUITS
        .into_iter()
        .map(|c| Face::new(c, rank))
        .filter(|f| available.count(f) > 0)
        .collect();

    for size in 3..=4usize {
        for wild_count in 0..=wilds.min(size - 1) {
            let plain = size - wild_count;
            if plain > colors.len() {
                continue;
            }
            // choose which colors to leave out
            for_each_subset(colors.len(), colors.len() - plain, |skipped| {
                let mut faces: Vec<Face> = colors
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !skipped.contains(i))
                    .map(|(_, f)| *f)
                    .collect();
                faces.sort();
                candidates.insert(Slot {
                    kind: MeldType::Group,
                    faces,
                    wilds: wild_count as u8,
                });
            });
        }
    }
}

/// Call `f` with every `k`-element subset of `0..n`, as ascending indices
fn for_each_subset(n: usize, k: usize, mut f: impl FnMut(&[usize])) {
    fn helper(
        n: usize,
        k: usize,
        start: usize,
        chosen: &mut Vec<usize>,
        f: &mut impl FnMut(&[usize]),
    ) {
        if chosen.len() == k {
            f(chosen);
            return;
        }
        for i in start..n {
            if n - i < k - chosen.len() {
                break;
            }
            chosen.push(i);
            helper(n, k, i + 1, chosen, f);
            chosen.pop();
        }
    }

    if k > n {
        return;
    }
    let mut chosen = Vec::with_capacity(k);
    helper(n, k, 0, &mut chosen, &mut f);
}
