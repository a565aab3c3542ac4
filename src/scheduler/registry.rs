use super::{MatrixHandle, SchedulerError, TileCoord};
use crate::algebra::{Element, HierMatrix, MatrixError, Tile, TileMut, TileRef};

// raw storage pointer shared with the worker threads
#[derive(Clone, Copy)]
struct SendPtr<T>(*mut T);
unsafe impl<T: Send> Send for SendPtr<T> {}
unsafe impl<T: Sync> Sync for SendPtr<T> {}

struct Registered<'a, T> {
    view: HierMatrix<'a, T>,
    base: SendPtr<T>,
}

/// Hierarchical matrices registered with a scheduler.
///
/// Each view holds an exclusive borrow of its flat matrix, so the storage
/// behind `base` stays valid and unaliased for the lifetime `'a`.
pub(crate) struct Registry<'a, T> {
    views: Vec<Registered<'a, T>>,
}

impl<'a, T> Default for Registry<'a, T> {
    fn default() -> Self {
        Self { views: Vec::new() }
    }
}

impl<'a, T> Registry<'a, T>
where
    T: Element,
{
    pub fn register(&mut self, mut view: HierMatrix<'a, T>) -> Result<MatrixHandle, MatrixError> {
        view.check_cover()?;
        let base = SendPtr(view.storage_ptr()?);
        self.views.push(Registered { view, base });
        Ok(MatrixHandle(self.views.len() - 1))
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn view(&self, h: MatrixHandle) -> Result<&HierMatrix<'a, T>, SchedulerError> {
        self.views
            .get(h.0)
            .map(|r| &r.view)
            .ok_or(SchedulerError::UnknownMatrix(h))
    }

    /// descriptor of a tile, validating the coordinate
    pub fn tile(&self, c: TileCoord) -> Result<&Tile, SchedulerError> {
        self.view(c.matrix)?
            .tile(c.row, c.col)
            .map_err(|_| SchedulerError::IndexOutOfBounds(c))
    }

    /// descriptor of a tile whose coordinate was validated on submission
    pub fn descriptor(&self, c: TileCoord) -> Tile {
        let view = &self.views[c.matrix.0].view;
        view.tiles()[c.row + c.col * view.grid().0]
    }

    /// # Safety
    /// The coordinate must be valid, and no task may write the tile while
    /// the returned view is alive.
    pub unsafe fn tile_ref<'t>(&self, c: TileCoord) -> TileRef<'t, T> {
        let t = self.descriptor(c);
        TileRef::from_raw_parts(
            self.views[c.matrix.0].base.0.add(t.offset),
            t.nrows,
            t.ncols,
            t.row_stride,
            t.col_stride,
        )
    }

    /// # Safety
    /// The coordinate must be valid, and no other view of the tile may be
    /// alive while the returned view is.
    pub unsafe fn tile_mut<'t>(&self, c: TileCoord) -> TileMut<'t, T> {
        let t = self.descriptor(c);
        TileMut::from_raw_parts(
            self.views[c.matrix.0].base.0.add(t.offset),
            t.nrows,
            t.ncols,
            t.row_stride,
            t.col_stride,
        )
    }
}
