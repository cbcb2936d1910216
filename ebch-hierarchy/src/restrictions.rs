//! Turn restrictions and the maneuver rule shared by contraction and queries.
//!
//! A restriction is a sequence of original vertices that a route must not traverse contiguously,
//! e.g. `[a, b, c]` forbids turning from `a` through `b` into `c`, and `[a, b, c, d]` forbids
//! driving through `b` and `c` in one go.  Routes are checked at every vertex where two of their
//! edges meet: the check looks at the original vertices on both sides of that vertex and forbids
//! the maneuver when it is a u-turn or when a restriction covers the meeting vertex.
//!
//! A restriction of length `L` that covers a vertex has at most `L - 2` vertices on either side
//! of it, as long as it does not start or end there.  Searches therefore remember
//! [`history_len`](RestrictionLookup::history_len) original vertices on each side, and shortcuts
//! store that many original vertices next to their ends.
use std::borrow::Cow;
use std::collections::HashMap;
use std::iter;

use fixedbitset::FixedBitSet;
use itertools::Itertools;

use crate::graph::DirectedDynamicGraph;

/// The shortest window length the maneuver rule works with: one vertex on either side.
const MIN_WINDOW: usize = 3;

/// Lookup of the forbidden sequences registered for a vertex.
pub trait RestrictionLookup {
    /// Every forbidden sequence registered for `vertex`; empty when there are none.
    fn restrictions(&self, vertex: u32) -> Cow<'_, [Vec<u32>]>;

    /// Length of the longest sequence [`restrictions`](Self::restrictions) may return.
    fn max_len(&self) -> usize {
        MIN_WINDOW
    }

    /// How many original vertices a search has to remember on each side of a vertex.
    fn history_len(&self) -> usize {
        self.max_len().max(MIN_WINDOW) - 2
    }
}

impl<T: RestrictionLookup + ?Sized> RestrictionLookup for &T {
    fn restrictions(&self, vertex: u32) -> Cow<'_, [Vec<u32>]> {
        (**self).restrictions(vertex)
    }

    fn max_len(&self) -> usize {
        (**self).max_len()
    }
}

/// A network without restrictions.  U-turns are still suppressed.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRestrictions;

impl RestrictionLookup for NoRestrictions {
    fn restrictions(&self, _vertex: u32) -> Cow<'_, [Vec<u32>]> {
        Cow::Borrowed(&[][..])
    }
}

/// Adapts a closure `vertex -> sequences` to [`RestrictionLookup`].
pub struct FnRestrictions<F> {
    /// Returns the sequences registered for a vertex.
    lookup: F,
    /// Upper bound on the length of the returned sequences.
    max_len: usize,
}

impl<F> FnRestrictions<F>
where
    F: Fn(u32) -> Vec<Vec<u32>>,
{
    /// A lookup whose sequences are at most three vertices long.
    pub const fn new(lookup: F) -> Self {
        Self { lookup, max_len: MIN_WINDOW }
    }

    /// A lookup that may return sequences of up to `max_len` vertices.
    pub const fn with_max_len(lookup: F, max_len: usize) -> Self {
        Self { lookup, max_len }
    }
}

impl<F> RestrictionLookup for FnRestrictions<F>
where
    F: Fn(u32) -> Vec<Vec<u32>>,
{
    fn restrictions(&self, vertex: u32) -> Cow<'_, [Vec<u32>]> {
        Cow::Owned((self.lookup)(vertex))
    }

    fn max_len(&self) -> usize {
        self.max_len
    }
}

/// Restrictions indexed under every vertex they contain.
#[derive(Clone, Debug, Default)]
pub struct RestrictionTable {
    /// Sequences by member vertex; a sequence appears once under each distinct member.
    by_vertex: HashMap<u32, Vec<Vec<u32>>>,
    /// Number of registered sequences.
    len: usize,
    /// Length of the longest registered sequence.
    max_len: usize,
}

impl RestrictionTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a forbidden sequence.  Empty sequences are ignored.
    pub fn add(&mut self, sequence: Vec<u32>) {
        if sequence.is_empty() {
            return;
        }
        self.max_len = self.max_len.max(sequence.len());
        for vertex in sequence.iter().copied().unique() {
            self.by_vertex.entry(vertex).or_default().push(sequence.clone());
        }
        self.len += 1;
    }

    /// Number of registered sequences.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no sequence is registered.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FromIterator<Vec<u32>> for RestrictionTable {
    fn from_iter<I: IntoIterator<Item = Vec<u32>>>(iter: I) -> Self {
        let mut table = Self::new();
        for sequence in iter {
            table.add(sequence);
        }
        table
    }
}

impl RestrictionLookup for RestrictionTable {
    fn restrictions(&self, vertex: u32) -> Cow<'_, [Vec<u32>]> {
        self.by_vertex
            .get(&vertex)
            .map_or(Cow::Borrowed(&[][..]), |sequences| Cow::Borrowed(sequences.as_slice()))
    }

    fn max_len(&self) -> usize {
        self.max_len.max(MIN_WINDOW)
    }
}

/// Whether `needle` occurs as a contiguous run inside `haystack`.
pub fn contains_sequence(haystack: &[u32], needle: &[u32]) -> bool {
    !needle.is_empty() && needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|window| window == needle)
}

/// Whether `needle` occurs inside `window` at a position that includes `window[via]`.
fn covers(window: &[u32], needle: &[u32], via: usize) -> bool {
    if needle.is_empty() || needle.len() > window.len() {
        return false;
    }
    window
        .windows(needle.len())
        .enumerate()
        .any(|(start, run)| start <= via && via < start + needle.len() && run == needle)
}

/// Whether a route may pass `via` with `before` right in front of it and `after` right behind it,
/// both in travel order.
///
/// Either side may be empty, e.g. at the start of a route.  The maneuver is forbidden when it
/// turns straight back or when a restriction covering `via` lies inside `before + via + after`.
pub fn is_legal_joint<R: RestrictionLookup + ?Sized>(restrictions: &R, before: &[u32], via: u32, after: &[u32]) -> bool {
    if before.last().is_some() && before.last() == after.first() {
        return false;
    }

    let window: Vec<u32> = before.iter().copied().chain(iter::once(via)).chain(after.iter().copied()).collect();
    window.iter().unique().all(|&vertex| {
        restrictions
            .restrictions(vertex)
            .iter()
            .all(|sequence| !covers(&window, sequence, before.len()))
    })
}

/// Whether a route may enter `via` from `from` and leave it towards `to`.
pub fn is_legal_turn<R: RestrictionLookup + ?Sized>(restrictions: &R, from: u32, via: u32, to: u32) -> bool {
    is_legal_joint(restrictions, &[from], via, &[to])
}

/// The last `len` original vertices of a path that had `history` before `vertex` and then went on
/// through `interior`.
///
/// `interior` holds at most `len` vertices; when it holds fewer it is complete, so the vertices in
/// front of it still count.
pub fn extend_history(history: &[u32], vertex: u32, interior: &[u32], len: usize) -> Vec<u32> {
    let combined: Vec<u32> = history.iter().copied().chain(iter::once(vertex)).chain(interior.iter().copied()).collect();
    combined[combined.len().saturating_sub(len)..].to_vec()
}

/// The first `len` original vertices of an edge: its `interior` vertices, then `end`.
pub fn leading_vertices(interior: &[u32], end: u32, len: usize) -> Vec<u32> {
    interior.iter().copied().chain(iter::once(end)).take(len).collect()
}

/// Flag every vertex that is part of a restriction, plus the graph neighbours of those vertices.
///
/// Contraction keeps track of exact entry and exit vertices at flagged vertices only.
pub fn restriction_flags<R: RestrictionLookup + ?Sized>(graph: &DirectedDynamicGraph, restrictions: &R) -> FixedBitSet {
    let vertex_count = graph.vertex_count();
    let mut members = FixedBitSet::with_capacity(vertex_count as usize);
    for vertex in 0..vertex_count {
        for sequence in restrictions.restrictions(vertex).iter() {
            members.insert(vertex as usize);
            for &member in sequence {
                if member < vertex_count {
                    members.insert(member as usize);
                }
            }
        }
    }

    let mut flags = members.clone();
    for member in members.ones() {
        #[allow(clippy::cast_possible_truncation)]
        let member = member as u32;
        for edge in graph.edges(member) {
            flags.insert(edge.neighbour() as usize);
        }
    }
    flags
}

#[cfg(test)]
#[allow(clippy::missing_docs_in_private_items)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::inside(&[1, 2, 3], &[2, 3], true)]
    #[case::whole(&[1, 2, 3], &[1, 2, 3], true)]
    #[case::gap(&[1, 2, 3], &[1, 3], false)]
    #[case::longer(&[1, 2], &[1, 2, 3], false)]
    #[case::empty(&[1, 2, 3], &[], false)]
    fn test_contains_sequence(#[case] haystack: &[u32], #[case] needle: &[u32], #[case] expected: bool) {
        assert_eq!(contains_sequence(haystack, needle), expected);
    }

    #[rstest]
    fn test_u_turns_are_never_legal() {
        assert!(!is_legal_turn(&NoRestrictions, 4, 5, 4));
        assert!(is_legal_turn(&NoRestrictions, 4, 5, 6));
        assert!(!is_legal_joint(&NoRestrictions, &[3, 4], 5, &[4, 3]));
    }

    #[rstest]
    fn test_restriction_forbids_only_its_direction() {
        let table = RestrictionTable::from_iter([vec![1, 2, 3]]);
        assert!(!is_legal_turn(&table, 1, 2, 3));
        assert!(is_legal_turn(&table, 3, 2, 1));
        assert!(is_legal_turn(&table, 1, 2, 4));
    }

    #[rstest]
    #[case::through_second(&[0, 1], 2, &[3], false)]
    #[case::through_third(&[0], 1, &[2, 3], false)]
    #[case::cut_short(&[1], 2, &[3], true)]
    #[case::other_exit(&[0, 1], 2, &[4], true)]
    #[case::other_entry(&[5, 1], 2, &[3], true)]
    fn test_long_restriction_needs_whole_window(
        #[case] before: &[u32],
        #[case] via: u32,
        #[case] after: &[u32],
        #[case] legal: bool,
    ) {
        let table = RestrictionTable::from_iter([vec![0, 1, 2, 3]]);
        assert_eq!(table.history_len(), 2);
        assert_eq!(is_legal_joint(&table, before, via, after), legal);
    }

    #[rstest]
    fn test_restriction_must_cover_the_joint() {
        let table = RestrictionTable::from_iter([vec![7, 8, 9]]);
        // the forbidden run lies entirely behind vertex 1
        assert!(is_legal_joint(&table, &[7, 8, 9], 1, &[2]));
        assert!(!is_legal_joint(&table, &[7, 8], 9, &[2]));
    }

    #[rstest]
    fn test_table_indexes_every_member() {
        let table = RestrictionTable::from_iter([vec![1, 2, 1], vec![]]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.restrictions(1).len(), 1);
        assert_eq!(table.restrictions(2).len(), 1);
        assert!(table.restrictions(3).is_empty());
        assert_eq!(table.history_len(), 1);
    }

    #[rstest]
    fn test_history_follows_longest_restriction() {
        assert_eq!(NoRestrictions.history_len(), 1);
        let table = RestrictionTable::from_iter([vec![1, 2], vec![1, 2, 3, 4, 5]]);
        assert_eq!(table.max_len(), 5);
        assert_eq!((&table).history_len(), 3);
    }

    #[rstest]
    #[case::keeps_everything(&[4], &[7], 3, vec![4, 5, 7])]
    #[case::short_interior(&[4], &[7], 2, vec![5, 7])]
    #[case::full_interior(&[4], &[7, 8], 2, vec![7, 8])]
    #[case::empty_history(&[], &[], 2, vec![5])]
    #[case::single(&[3, 4], &[], 1, vec![5])]
    fn test_extend_history(#[case] history: &[u32], #[case] interior: &[u32], #[case] len: usize, #[case] expected: Vec<u32>) {
        assert_eq!(extend_history(history, 5, interior, len), expected);
    }

    #[rstest]
    fn test_leading_vertices() {
        assert_eq!(leading_vertices(&[], 9, 2), vec![9]);
        assert_eq!(leading_vertices(&[3], 9, 2), vec![3, 9]);
        assert_eq!(leading_vertices(&[3, 4], 9, 2), vec![3, 4]);
        assert_eq!(leading_vertices(&[3, 4], 9, 1), vec![3]);
    }

    #[rstest]
    fn test_closure_lookup_keyed_by_first_vertex() {
        let lookup = FnRestrictions::new(|vertex: u32| if vertex == 7 { vec![vec![7, 8, 9]] } else { vec![] });
        assert!(!is_legal_turn(&lookup, 7, 8, 9));
        assert!(is_legal_turn(&lookup, 6, 8, 9));
        assert_eq!(lookup.history_len(), 1);
        assert_eq!(FnRestrictions::with_max_len(|_| vec![], 4).history_len(), 2);
    }
}
