use super::{Element, FlatMatrix, MatrixError, MatrixId, TileMut, TileRef};

/// Descriptor of one tile of a [`HierMatrix`].
///
/// Offsets and strides address the storage of the underlying flat matrix,
/// so a descriptor is enough to construct a strided view of the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub matrix: MatrixId,
    /// tile coordinate in the grid
    pub row_block: usize,
    pub col_block: usize,
    /// first logical row and column of the tile within the flat matrix
    pub row0: usize,
    pub col0: usize,
    pub nrows: usize,
    pub ncols: usize,
    /// storage offset of element (0,0)
    pub offset: usize,
    pub row_stride: usize,
    pub col_stride: usize,
}

impl Tile {
    /// true if the two tiles share at least one storage element
    pub fn overlaps(&self, other: &Tile) -> bool {
        self.matrix == other.matrix
            && self.row0 < other.row0 + other.nrows
            && other.row0 < self.row0 + self.nrows
            && self.col0 < other.col0 + other.ncols
            && other.col0 < self.col0 + self.ncols
    }
}

/// Tiled view over a rectangular region of a [`FlatMatrix`].
///
/// The region is partitioned into a grid of `ceil(rows/bm) x ceil(cols/bn)`
/// tiles; tiles in the last block row and column are ragged when the block
/// size does not divide the extent.  The view holds an exclusive borrow of
/// the flat matrix, so the flat matrix outlives every view of it and no two
/// live views can alias.
#[derive(Debug)]
pub struct HierMatrix<'a, T> {
    flat: &'a mut FlatMatrix<T>,
    origin: (usize, usize),
    extent: (usize, usize),
    block: (usize, usize),
    grid: (usize, usize),
    // column major over the grid
    tiles: Vec<Tile>,
    depth: usize,
}

impl<'a, T> HierMatrix<'a, T>
where
    T: Element,
{
    /// Tile the whole of `flat` with `bm x bn` blocks.
    pub fn new(flat: &'a mut FlatMatrix<T>, bm: usize, bn: usize) -> Result<Self, MatrixError> {
        let extent = flat.size();
        Self::over_region(flat, (0, 0), extent, (bm, bn), 0)
    }

    fn over_region(
        flat: &'a mut FlatMatrix<T>,
        origin: (usize, usize),
        extent: (usize, usize),
        block: (usize, usize),
        depth: usize,
    ) -> Result<Self, MatrixError> {
        if flat.is_released() {
            return Err(MatrixError::Released);
        }
        let (bm, bn) = block;
        if bm == 0 || bn == 0 {
            return Err(MatrixError::InvalidDimension { rows: bm, cols: bn });
        }
        let (m, n) = extent;
        if m == 0 || n == 0 {
            return Err(MatrixError::InvalidDimension { rows: m, cols: n });
        }
        let grid = ((m + bm - 1) / bm, (n + bn - 1) / bn);
        let (rs, cs) = flat.strides();

        let mut tiles = Vec::with_capacity(grid.0 * grid.1);
        for jb in 0..grid.1 {
            for ib in 0..grid.0 {
                let row0 = origin.0 + ib * bm;
                let col0 = origin.1 + jb * bn;
                tiles.push(Tile {
                    matrix: flat.id(),
                    row_block: ib,
                    col_block: jb,
                    row0,
                    col0,
                    nrows: bm.min(m - ib * bm),
                    ncols: bn.min(n - jb * bn),
                    offset: row0 * rs + col0 * cs,
                    row_stride: rs,
                    col_stride: cs,
                });
            }
        }

        Ok(Self {
            flat,
            origin,
            extent,
            block,
            grid,
            tiles,
            depth,
        })
    }

    pub fn matrix_id(&self) -> MatrixId {
        self.flat.id()
    }

    /// logical size of the tiled region
    pub fn size(&self) -> (usize, usize) {
        self.extent
    }

    pub fn origin(&self) -> (usize, usize) {
        self.origin
    }

    pub fn block_size(&self) -> (usize, usize) {
        self.block
    }

    /// number of tile rows and tile columns
    pub fn grid(&self) -> (usize, usize) {
        self.grid
    }

    /// nesting depth; zero for a view created directly over a flat matrix
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn tile(&self, i: usize, j: usize) -> Result<&Tile, MatrixError> {
        if i >= self.grid.0 || j >= self.grid.1 {
            return Err(MatrixError::IndexOutOfBounds {
                index: (i, j),
                bound: self.grid,
            });
        }
        Ok(&self.tiles[i + j * self.grid.0])
    }

    /// all tiles in column major grid order
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn flat(&self) -> &FlatMatrix<T> {
        &*self.flat
    }

    /// strided view of tile `(i, j)`
    pub fn tile_view(&self, i: usize, j: usize) -> Result<TileRef<'_, T>, MatrixError> {
        let t = *self.tile(i, j)?;
        let base = self.flat.storage()?.as_ptr();
        // SAFETY: the tile lies within the storage and `self` is borrowed
        Ok(unsafe {
            TileRef::from_raw_parts(
                base.add(t.offset),
                t.nrows,
                t.ncols,
                t.row_stride,
                t.col_stride,
            )
        })
    }

    /// mutable strided view of tile `(i, j)`
    pub fn tile_view_mut(&mut self, i: usize, j: usize) -> Result<TileMut<'_, T>, MatrixError> {
        let t = *self.tile(i, j)?;
        let base = self.flat.storage_mut()?.as_mut_ptr();
        // SAFETY: the tile lies within the storage and `self` is borrowed mutably
        Ok(unsafe {
            TileMut::from_raw_parts(
                base.add(t.offset),
                t.nrows,
                t.ncols,
                t.row_stride,
                t.col_stride,
            )
        })
    }

    /// Drop the tiling and hand back the flat matrix borrow.
    pub fn free(self) -> &'a mut FlatMatrix<T> {
        self.flat
    }

    /// Nested tiled view over tile `(i, j)` with a finer block size.
    ///
    /// The parent view is borrowed for as long as the nested view is alive.
    pub fn subdivide(
        &mut self,
        i: usize,
        j: usize,
        bm: usize,
        bn: usize,
    ) -> Result<HierMatrix<'_, T>, MatrixError> {
        let t = *self.tile(i, j)?;
        HierMatrix::over_region(
            &mut *self.flat,
            (t.row0, t.col0),
            (t.nrows, t.ncols),
            (bm, bn),
            self.depth + 1,
        )
    }

    /// Check that the tiles cover the region exactly once.
    pub fn check_cover(&self) -> Result<(), MatrixError> {
        let (m, n) = self.extent;
        let mut hits = vec![0u8; m * n];
        for t in &self.tiles {
            if t.row0 < self.origin.0
                || t.col0 < self.origin.1
                || t.row0 + t.nrows > self.origin.0 + m
                || t.col0 + t.ncols > self.origin.1 + n
            {
                return Err(MatrixError::CoverViolation);
            }
            for c in 0..t.ncols {
                for r in 0..t.nrows {
                    let idx = (t.row0 - self.origin.0 + r) + (t.col0 - self.origin.1 + c) * m;
                    hits[idx] += 1;
                    if hits[idx] > 1 {
                        return Err(MatrixError::CoverViolation);
                    }
                }
            }
        }
        if hits.iter().all(|&h| h == 1) {
            Ok(())
        } else {
            Err(MatrixError::CoverViolation)
        }
    }

    /// base pointer of the flat storage, for use by the scheduler
    pub(crate) fn storage_ptr(&mut self) -> Result<*mut T, MatrixError> {
        Ok(self.flat.storage_mut()?.as_mut_ptr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_grid() {
        let mut a = FlatMatrix::<f64>::create(500, 300).unwrap();
        let h = HierMatrix::new(&mut a, 192, 128).unwrap();
        assert_eq!(h.grid(), (3, 3));

        let last = h.tile(2, 2).unwrap();
        assert_eq!((last.nrows, last.ncols), (500 - 384, 300 - 256));
        assert_eq!((last.row0, last.col0), (384, 256));
        assert_eq!(last.offset, 384 + 256 * 500);
        assert!(h.check_cover().is_ok());
        assert!(h.tile(3, 0).is_err());
    }

    #[test]
    fn test_block_larger_than_matrix() {
        let mut a = FlatMatrix::<f32>::create(5, 7).unwrap();
        let h = HierMatrix::new(&mut a, 192, 192).unwrap();
        assert_eq!(h.grid(), (1, 1));
        assert_eq!(h.tile(0, 0).unwrap().nrows, 5);
        assert!(h.check_cover().is_ok());
    }

    #[test]
    fn test_free_returns_flat() {
        let mut a = FlatMatrix::<f64>::create(6, 4).unwrap();
        let h = HierMatrix::new(&mut a, 4, 4).unwrap();
        let flat = h.free();
        flat.set(5, 3, 2.0).unwrap();
        let h = HierMatrix::new(flat, 3, 2).unwrap();
        assert_eq!(h.grid(), (2, 2));
        assert_eq!(h.tile_view(1, 1).unwrap()[(2, 1)], 2.0);
    }

    #[test]
    fn test_zero_block_size() {
        let mut a = FlatMatrix::<f64>::create(4, 4).unwrap();
        assert!(matches!(
            HierMatrix::new(&mut a, 0, 2),
            Err(MatrixError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_released_flat() {
        let mut a = FlatMatrix::<f64>::create(4, 4).unwrap();
        a.free().unwrap();
        assert_eq!(
            HierMatrix::new(&mut a, 2, 2).err(),
            Some(MatrixError::Released)
        );
    }

    #[test]
    fn test_tile_views_write_through() {
        let mut a = FlatMatrix::<f64>::create(5, 5).unwrap();
        {
            let mut h = HierMatrix::new(&mut a, 2, 2).unwrap();
            let mut t = h.tile_view_mut(1, 2).unwrap();
            assert_eq!(t.size(), (2, 1));
            t[(1, 0)] = 7.0;
            assert_eq!(h.tile_view(1, 2).unwrap()[(1, 0)], 7.0);
        }
        assert_eq!(a[(3, 4)], 7.0);
    }

    #[test]
    fn test_subdivide() {
        let mut a = FlatMatrix::<f64>::create(10, 10).unwrap();
        let mut h = HierMatrix::new(&mut a, 6, 6).unwrap();
        let mut s = h.subdivide(1, 1, 3, 3).unwrap();
        assert_eq!(s.origin(), (6, 6));
        assert_eq!(s.size(), (4, 4));
        assert_eq!(s.grid(), (2, 2));
        assert_eq!(s.depth(), 1);
        assert!(s.check_cover().is_ok());

        s.tile_view_mut(1, 1).unwrap()[(0, 0)] = 1.5;
        assert_eq!(h.tile_view(1, 1).unwrap()[(3, 3)], 1.5);
    }

    #[test]
    fn test_transposed_tiles() {
        let mut a = FlatMatrix::from_rows(&[[1., 2., 3.], [4., 5., 6.]]).unwrap();
        a.set_transposed(true);
        let h = HierMatrix::new(&mut a, 2, 1).unwrap();
        assert_eq!(h.grid(), (2, 2));
        let t = h.tile_view(1, 1).unwrap();
        assert_eq!(t.size(), (1, 1));
        assert_eq!(t[(0, 0)], 6.0);
    }
}
