use super::{BlockTypeIndex, Layer, Position, VoxelGrid};

pub struct BlockIndexIter<'a> {
    inner: std::slice::Iter<'a, BlockTypeIndex>,
}

impl<'a> BlockIndexIter<'a> {
    pub(super) fn new(parent: &'a VoxelGrid, layer: Layer) -> Self {
        Self {
            inner: parent.layer(layer).iter(),
        }
    }
}

impl<'a> Iterator for BlockIndexIter<'a> {
    type Item = BlockTypeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().copied()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Walks one layer in storage order, yielding each cell's position, linear
/// index and palette reference.
pub struct BlockCoordIter<'a> {
    parent: &'a VoxelGrid,
    inner: std::iter::Enumerate<std::slice::Iter<'a, BlockTypeIndex>>,
}

impl<'a> BlockCoordIter<'a> {
    pub(super) fn new(parent: &'a VoxelGrid, layer: Layer) -> Self {
        Self {
            parent,
            inner: parent.layer(layer).iter().enumerate(),
        }
    }
}

impl<'a> Iterator for BlockCoordIter<'a> {
    type Item = (Position, usize, BlockTypeIndex);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(i, v)| (self.parent.position_of(i), i, *v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
