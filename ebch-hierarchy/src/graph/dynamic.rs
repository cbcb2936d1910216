use std::fmt;

use super::codec::{
    self,
    EdgeKind,
};
use crate::errors::GraphError;

/// Words in front of every edge record: the neighbour and the number of dynamic words.
const RECORD_HEADER: usize = 2;
/// Smallest block a vertex gets once it stores an edge.
const MIN_BLOCK_CAPACITY: usize = 8;

/// A directed edge id: the edge index plus one, negated when the edge is travelled against the
/// direction it is stored in.  Zero is never a valid id.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DirectedEdgeId(pub i64);

/// The id used for paths that did not arrive over an edge.
pub const NO_EDGE: DirectedEdgeId = DirectedEdgeId(0);

impl DirectedEdgeId {
    /// The id travelling edge `index` the way it is stored.
    pub fn forward(index: u32) -> Self {
        Self(i64::from(index) + 1)
    }

    /// The id travelling edge `index` against the way it is stored.
    pub fn backward(index: u32) -> Self {
        Self(-(i64::from(index) + 1))
    }

    /// Whether this is [`NO_EDGE`].
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Whether the id travels its edge the way it is stored.
    pub const fn is_forward(self) -> bool {
        self.0 > 0
    }

    /// The edge index this id points at.
    pub fn index(self) -> Result<u32, GraphError> {
        if self.0 == 0 {
            return Err(GraphError::InvalidEdgeId(self.0));
        }
        u32::try_from(self.0.unsigned_abs() - 1).map_err(|_| GraphError::InvalidEdgeId(self.0))
    }
}

impl fmt::Display for DirectedEdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The arena region owned by one vertex.
#[derive(Clone, Copy, Debug, Default)]
struct VertexBlock {
    /// Offset of the first word.
    pointer: usize,
    /// Words in use.
    size: usize,
    /// Words owned.
    capacity: usize,
}

/// A directed graph whose edges carry variable-length `u32` payloads.
///
/// Each vertex owns a contiguous block in a single word arena.  An edge record is laid out as
/// `[neighbour, dynamic_len, fixed..., dynamic...]`; the edge index is the offset of the record in
/// the arena, so indices are only stable until the next mutation of the owning vertex or the next
/// [`compress`](Self::compress).  Edges are stored at one endpoint only: an edge that should be
/// visible from both ends has to be added at both.
///
/// A block that outgrows its capacity moves to the end of the arena and its old region stays
/// unused until the next [`compress`](Self::compress).  Capacities at least double on every move,
/// so the abandoned regions of a block add up to less than its current capacity and the arena
/// never holds more than twice the [reserved](Self::reserved_words) words.
#[derive(Clone, Debug)]
pub struct DirectedDynamicGraph {
    /// Payload words every edge carries in front of its dynamic part.
    fixed_size: usize,
    /// One block per vertex.
    blocks: Vec<VertexBlock>,
    /// The arena.
    words: Vec<u32>,
    /// Number of stored edge records.
    edge_count: usize,
}

impl DirectedDynamicGraph {
    /// An empty graph whose edges carry `fixed_size` fixed words.
    pub const fn new(fixed_size: usize) -> Self {
        Self { fixed_size, blocks: Vec::new(), words: Vec::new(), edge_count: 0 }
    }

    /// A graph with `vertex_count` isolated vertices.
    pub fn with_vertices(vertex_count: u32, fixed_size: usize) -> Self {
        let mut graph = Self::new(fixed_size);
        graph.blocks.resize(vertex_count as usize, VertexBlock::default());
        graph
    }

    /// Number of vertices, isolated ones included.
    #[allow(clippy::cast_possible_truncation)]
    pub fn vertex_count(&self) -> u32 {
        self.blocks.len() as u32
    }

    /// Number of stored edge records.
    pub const fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Number of fixed payload words every edge carries.
    pub const fn fixed_size(&self) -> usize {
        self.fixed_size
    }

    /// Length of the arena, abandoned regions included.
    pub fn allocated_words(&self) -> usize {
        self.words.len()
    }

    /// Words owned by vertex blocks, spare capacity included.
    pub fn reserved_words(&self) -> usize {
        self.blocks.iter().map(|block| block.capacity).sum()
    }

    /// Make sure `vertex` exists, adding every vertex up to it.
    pub fn add_vertex(&mut self, vertex: u32) {
        let needed = vertex as usize + 1;
        if self.blocks.len() < needed {
            self.blocks.resize(needed, VertexBlock::default());
        }
    }

    /// Store an edge at `from` pointing to `to` and return its index.
    pub fn add_edge(&mut self, from: u32, to: u32, fixed: &[u32], dynamic: &[u32]) -> Result<u32, GraphError> {
        if fixed.len() != self.fixed_size {
            return Err(GraphError::FixedSizeMismatch { expected: self.fixed_size, actual: fixed.len() });
        }
        self.add_vertex(from.max(to));

        let length = RECORD_HEADER + fixed.len() + dynamic.len();
        self.reserve(from as usize, length);

        let block = &mut self.blocks[from as usize];
        let offset = block.pointer + block.size;
        block.size += length;

        let index = u32::try_from(offset).map_err(|_| GraphError::InvalidEdgeId(i64::MAX))?;
        self.words[offset] = to;
        #[allow(clippy::cast_possible_truncation)]
        let dynamic_len = dynamic.len() as u32;
        self.words[offset + 1] = dynamic_len;
        let fixed_start = offset + RECORD_HEADER;
        self.words[fixed_start..fixed_start + fixed.len()].copy_from_slice(fixed);
        let dynamic_start = fixed_start + fixed.len();
        self.words[dynamic_start..dynamic_start + dynamic.len()].copy_from_slice(dynamic);

        self.edge_count += 1;
        Ok(index)
    }

    /// Remove every edge stored at `from` pointing to `to`; returns how many were removed.
    pub fn remove_edge(&mut self, from: u32, to: u32) -> usize {
        self.retain_edges(from, |edge| edge.neighbour() != to)
    }

    /// Remove every edge stored at `vertex`.
    pub fn remove_edges(&mut self, vertex: u32) -> usize {
        self.retain_edges(vertex, |_| false)
    }

    /// Keep only the edges at `vertex` for which `keep` returns true; returns how many were removed.
    pub fn retain_edges<F>(&mut self, vertex: u32, mut keep: F) -> usize
    where
        F: FnMut(&EdgeView<'_>) -> bool,
    {
        let Some(block) = self.blocks.get(vertex as usize).copied() else {
            return 0;
        };

        let end = block.pointer + block.size;
        let mut read = block.pointer;
        let mut write = block.pointer;
        let mut removed = 0;
        while read < end {
            let length = self.record_len(read);
            let kept = keep(&EdgeView::at(&self.words, read, self.fixed_size));
            if kept {
                if write != read {
                    self.words.copy_within(read..read + length, write);
                }
                write += length;
            } else {
                removed += 1;
            }
            read += length;
        }

        self.blocks[vertex as usize].size = write - block.pointer;
        self.edge_count -= removed;
        removed
    }

    /// Iterate the edges stored at `vertex`, in insertion order.
    pub fn edges(&self, vertex: u32) -> Edges<'_> {
        let (offset, end) = self
            .blocks
            .get(vertex as usize)
            .map_or((0, 0), |block| (block.pointer, block.pointer + block.size));
        Edges { graph: self, offset, end }
    }

    /// Look up an edge by directed id, regardless of the direction the id travels it in.
    pub fn edge(&self, id: DirectedEdgeId) -> Result<EdgeView<'_>, GraphError> {
        let offset = id.index()? as usize;
        if offset + RECORD_HEADER + self.fixed_size > self.words.len() {
            return Err(GraphError::InvalidEdgeId(id.0));
        }
        if offset + self.record_len(offset) > self.words.len() {
            return Err(GraphError::InvalidEdgeId(id.0));
        }
        Ok(EdgeView::at(&self.words, offset, self.fixed_size))
    }

    /// Rewrite the arena so every vertex block is tight and blocks follow vertex order.
    ///
    /// Invalidates all previously returned edge indices.
    pub fn compress(&mut self) {
        let used: usize = self.blocks.iter().map(|block| block.size).sum();
        let mut words = Vec::with_capacity(used);
        for block in &mut self.blocks {
            let pointer = words.len();
            words.extend_from_slice(&self.words[block.pointer..block.pointer + block.size]);
            *block = VertexBlock { pointer, size: block.size, capacity: block.size };
        }
        self.words = words;
    }

    /// Length of the record starting at `offset`.
    fn record_len(&self, offset: usize) -> usize {
        RECORD_HEADER + self.fixed_size + self.words[offset + 1] as usize
    }

    /// Grow the block of `vertex` so it fits `extra` more words.
    fn reserve(&mut self, vertex: usize, extra: usize) {
        let block = &mut self.blocks[vertex];
        if block.size + extra <= block.capacity {
            return;
        }

        let capacity = (block.capacity * 2).max(block.size + extra).max(MIN_BLOCK_CAPACITY);
        if block.pointer + block.capacity == self.words.len() {
            // the last block grows in place
            self.words.resize(block.pointer + capacity, 0);
        } else {
            let pointer = self.words.len();
            self.words.resize(pointer + capacity, 0);
            self.words.copy_within(block.pointer..block.pointer + block.size, pointer);
            block.pointer = pointer;
        }
        block.capacity = capacity;
    }
}

/// Iterator over the edges stored at one vertex.
pub struct Edges<'a> {
    /// The graph being read.
    graph: &'a DirectedDynamicGraph,
    /// Offset of the next record.
    offset: usize,
    /// End of the vertex block.
    end: usize,
}

impl<'a> Iterator for Edges<'a> {
    type Item = EdgeView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.end {
            return None;
        }
        let view = EdgeView::at(&self.graph.words, self.offset, self.graph.fixed_size);
        self.offset += self.graph.record_len(self.offset);
        Some(view)
    }
}

/// A borrowed view of one edge record.
#[derive(Clone, Copy, Debug)]
pub struct EdgeView<'a> {
    /// Offset of the record in the arena.
    index: u32,
    /// The endpoint that does not store the edge.
    neighbour: u32,
    /// Fixed payload words.
    fixed: &'a [u32],
    /// Dynamic payload words.
    dynamic: &'a [u32],
}

impl<'a> EdgeView<'a> {
    /// The record starting at `offset`.
    fn at(words: &'a [u32], offset: usize, fixed_size: usize) -> Self {
        let fixed_start = offset + RECORD_HEADER;
        let dynamic_start = fixed_start + fixed_size;
        let dynamic_end = dynamic_start + words[offset + 1] as usize;
        #[allow(clippy::cast_possible_truncation)]
        let index = offset as u32;
        Self {
            index,
            neighbour: words[offset],
            fixed: &words[fixed_start..dynamic_start],
            dynamic: &words[dynamic_start..dynamic_end],
        }
    }

    /// The edge index.
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// The directed id that travels this edge the way it is stored.
    pub fn id(&self) -> DirectedEdgeId {
        DirectedEdgeId::forward(self.index)
    }

    /// The endpoint that does not store the edge.
    pub const fn neighbour(&self) -> u32 {
        self.neighbour
    }

    /// Fixed payload words.
    pub const fn fixed(&self) -> &'a [u32] {
        self.fixed
    }

    /// Dynamic payload words.
    pub const fn dynamic(&self) -> &'a [u32] {
        self.dynamic
    }

    /// Whether the edge is an input segment.
    pub const fn is_original(&self) -> bool {
        self.dynamic.is_empty()
    }

    /// The vertex this edge bypasses, `None` for original edges.
    pub fn contracted(&self) -> Option<u32> {
        self.dynamic.first().copied()
    }

    /// Decode the dynamic words.
    pub fn kind(&self) -> Result<EdgeKind, GraphError> {
        codec::decode_dynamic(self.index, self.dynamic)
    }

    /// Sequence 1 of a shortcut.
    pub fn sequence1(&self) -> Result<Vec<u32>, GraphError> {
        match self.kind()? {
            EdgeKind::Original => Err(GraphError::NotAShortcut(self.index)),
            EdgeKind::Shortcut(shortcut) => Ok(shortcut.sequence1()),
        }
    }

    /// Sequence 2 of a shortcut.
    pub fn sequence2(&self) -> Result<Vec<u32>, GraphError> {
        match self.kind()? {
            EdgeKind::Original => Err(GraphError::NotAShortcut(self.index)),
            EdgeKind::Shortcut(shortcut) => Ok(shortcut.sequence2()),
        }
    }

    /// The stored original vertices right after the storing vertex; empty for original edges.
    pub fn leading(&self) -> Vec<u32> {
        codec::leading_sequence(self.dynamic)
    }

    /// The stored original vertices right before the neighbour; empty for original edges.
    pub fn trailing(&self) -> Vec<u32> {
        codec::trailing_sequence(self.dynamic)
    }
}
