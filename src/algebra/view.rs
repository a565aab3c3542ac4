use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Read-only strided view of a rectangular block of matrix storage.
///
/// Element `(i, j)` lives at `ptr + i * row_stride + j * col_stride`.
/// Views are produced by [`FlatMatrix`](crate::algebra::FlatMatrix),
/// [`HierMatrix`](crate::algebra::HierMatrix) and by the scheduler when a
/// tile task is dispatched to the kernels.
#[derive(Clone, Copy)]
pub struct TileRef<'a, T> {
    ptr: *const T,
    nrows: usize,
    ncols: usize,
    row_stride: usize,
    col_stride: usize,
    phantom: PhantomData<&'a T>,
}

/// Mutable strided view of a rectangular block of matrix storage.
pub struct TileMut<'a, T> {
    ptr: *mut T,
    nrows: usize,
    ncols: usize,
    row_stride: usize,
    col_stride: usize,
    phantom: PhantomData<&'a mut T>,
}

unsafe impl<T: Sync> Send for TileRef<'_, T> {}
unsafe impl<T: Sync> Sync for TileRef<'_, T> {}
unsafe impl<T: Send> Send for TileMut<'_, T> {}
unsafe impl<T: Sync> Sync for TileMut<'_, T> {}

// number of storage elements spanned by a strided block
#[inline]
fn span(nrows: usize, ncols: usize, row_stride: usize, col_stride: usize) -> usize {
    if nrows == 0 || ncols == 0 {
        0
    } else {
        (nrows - 1) * row_stride + (ncols - 1) * col_stride + 1
    }
}

impl<'a, T> TileRef<'a, T> {
    /// column major view of a slice
    pub fn from_slice(data: &'a [T], nrows: usize, ncols: usize) -> Self {
        assert!(data.len() >= nrows * ncols);
        // SAFETY: bounds checked above
        unsafe { Self::from_raw_parts(data.as_ptr(), nrows, ncols, 1, nrows.max(1)) }
    }

    /// # Safety
    /// `ptr` must be valid for reads of every element addressed by the
    /// strides for the lifetime `'a`, and no mutable access to those
    /// elements may happen during that lifetime.
    pub unsafe fn from_raw_parts(
        ptr: *const T,
        nrows: usize,
        ncols: usize,
        row_stride: usize,
        col_stride: usize,
    ) -> Self {
        Self {
            ptr,
            nrows,
            ncols,
            row_stride,
            col_stride,
            phantom: PhantomData,
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }
    pub fn ncols(&self) -> usize {
        self.ncols
    }
    pub fn size(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }
    pub fn col_stride(&self) -> usize {
        self.col_stride
    }
    pub fn is_empty(&self) -> bool {
        self.nrows == 0 || self.ncols == 0
    }

    /// true if the view is column major with a leading dimension
    pub fn is_col_major(&self) -> bool {
        self.row_stride == 1
    }

    /// view of the transpose, sharing the same storage
    pub fn transpose(self) -> Self {
        Self {
            nrows: self.ncols,
            ncols: self.nrows,
            row_stride: self.col_stride,
            col_stride: self.row_stride,
            ..self
        }
    }

    /// storage spanned by the view.  Only meaningful for column major views.
    pub(crate) fn as_storage_slice(&self) -> &'a [T] {
        let len = span(self.nrows, self.ncols, self.row_stride, self.col_stride);
        if len == 0 {
            return &[];
        }
        // SAFETY: construction guarantees the spanned storage is readable
        unsafe { std::slice::from_raw_parts(self.ptr, len) }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<&'a T> {
        if i < self.nrows && j < self.ncols {
            // SAFETY: index is in bounds
            Some(unsafe { &*self.ptr.add(i * self.row_stride + j * self.col_stride) })
        } else {
            None
        }
    }
}

impl<'a, T: Copy> TileRef<'a, T> {
    /// iterator over the elements in column major order
    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        let this = *self;
        (0..this.ncols).flat_map(move |j| (0..this.nrows).map(move |i| this[(i, j)]))
    }

    /// column major copy of the view contents
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T> Index<(usize, usize)> for TileRef<'_, T> {
    type Output = T;
    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(i < self.nrows && j < self.ncols, "tile index out of bounds");
        // SAFETY: index is in bounds
        unsafe { &*self.ptr.add(i * self.row_stride + j * self.col_stride) }
    }
}

impl<'a, T> TileMut<'a, T> {
    /// column major view of a mutable slice
    pub fn from_slice(data: &'a mut [T], nrows: usize, ncols: usize) -> Self {
        assert!(data.len() >= nrows * ncols);
        // SAFETY: bounds checked above, and the slice is borrowed mutably
        unsafe { Self::from_raw_parts(data.as_mut_ptr(), nrows, ncols, 1, nrows.max(1)) }
    }

    /// # Safety
    /// `ptr` must be valid for reads and writes of every element addressed
    /// by the strides for the lifetime `'a`, distinct indices must address
    /// distinct elements, and no other access to those elements may happen
    /// during that lifetime.
    pub unsafe fn from_raw_parts(
        ptr: *mut T,
        nrows: usize,
        ncols: usize,
        row_stride: usize,
        col_stride: usize,
    ) -> Self {
        Self {
            ptr,
            nrows,
            ncols,
            row_stride,
            col_stride,
            phantom: PhantomData,
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }
    pub fn ncols(&self) -> usize {
        self.ncols
    }
    pub fn size(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }
    pub fn col_stride(&self) -> usize {
        self.col_stride
    }
    pub fn is_empty(&self) -> bool {
        self.nrows == 0 || self.ncols == 0
    }
    pub fn is_col_major(&self) -> bool {
        self.row_stride == 1
    }

    /// reborrow as a read-only view
    pub fn rb(&self) -> TileRef<'_, T> {
        // SAFETY: shared reborrow of an exclusive view
        unsafe {
            TileRef::from_raw_parts(
                self.ptr,
                self.nrows,
                self.ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }

    /// reborrow as a shorter lived mutable view
    pub fn rb_mut(&mut self) -> TileMut<'_, T> {
        // SAFETY: exclusive reborrow
        unsafe {
            TileMut::from_raw_parts(
                self.ptr,
                self.nrows,
                self.ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }

    /// mutable view of the transpose, sharing the same storage
    pub fn transpose(self) -> Self {
        Self {
            nrows: self.ncols,
            ncols: self.nrows,
            row_stride: self.col_stride,
            col_stride: self.row_stride,
            ..self
        }
    }

    pub(crate) fn as_storage_slice_mut(&mut self) -> &mut [T] {
        let len = span(self.nrows, self.ncols, self.row_stride, self.col_stride);
        if len == 0 {
            return &mut [];
        }
        // SAFETY: construction guarantees the spanned storage is writable
        unsafe { std::slice::from_raw_parts_mut(self.ptr, len) }
    }
}

impl<T: Copy> TileMut<'_, T> {
    pub fn fill(&mut self, v: T) {
        for j in 0..self.ncols {
            for i in 0..self.nrows {
                self[(i, j)] = v;
            }
        }
    }

    /// overwrite the view with the contents of a same sized view
    pub fn copy_from(&mut self, src: &TileRef<'_, T>) {
        assert_eq!(self.size(), src.size());
        for j in 0..self.ncols {
            for i in 0..self.nrows {
                self[(i, j)] = src[(i, j)];
            }
        }
    }

    /// overwrite the view with column major data
    pub fn copy_from_slice(&mut self, src: &[T]) {
        assert_eq!(src.len(), self.nrows * self.ncols);
        let m = self.nrows;
        for j in 0..self.ncols {
            for i in 0..m {
                self[(i, j)] = src[i + j * m];
            }
        }
    }
}

impl<T> Index<(usize, usize)> for TileMut<'_, T> {
    type Output = T;
    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(i < self.nrows && j < self.ncols, "tile index out of bounds");
        // SAFETY: index is in bounds
        unsafe { &*self.ptr.add(i * self.row_stride + j * self.col_stride) }
    }
}

impl<T> IndexMut<(usize, usize)> for TileMut<'_, T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        assert!(i < self.nrows && j < self.ncols, "tile index out of bounds");
        // SAFETY: index is in bounds and the view is exclusive
        unsafe { &mut *self.ptr.add(i * self.row_stride + j * self.col_stride) }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for TileRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "TileRef {} x {}", self.nrows, self.ncols)?;
        for i in 0..self.nrows {
            for j in 0..self.ncols {
                write!(f, "{:?} ", self[(i, j)])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for TileMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.rb().fmt(f)
    }
}

#[test]
fn test_tile_views() {
    let mut data: Vec<f64> = (0..6).map(|x| x as f64).collect();

    // 2 x 3 column major
    let v = TileRef::from_slice(&data, 2, 3);
    assert_eq!(v[(1, 2)], 5.0);
    assert_eq!(v.transpose()[(2, 1)], 5.0);
    assert_eq!(v.to_vec(), vec![0., 1., 2., 3., 4., 5.]);
    assert!(v.get(2, 0).is_none());

    let mut m = TileMut::from_slice(&mut data, 2, 3);
    m[(0, 1)] = -1.0;
    let mut t = m.rb_mut().transpose();
    t[(2, 0)] = 9.0;
    assert_eq!(data, vec![0., 1., -1., 3., 9., 5.]);
}
