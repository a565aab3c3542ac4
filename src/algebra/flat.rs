use super::{AsFloatT, DataType, Element, FloatT, MatrixError, TileMut, TileRef};
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MATRIX_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`FlatMatrix`].
///
/// Identities are never reused, so they can key per-matrix state such as
/// cached tile results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatrixId(u64);

impl MatrixId {
    fn next() -> Self {
        MatrixId(NEXT_MATRIX_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MatrixId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Dense matrix that exclusively owns a contiguous column major buffer.
///
/// A `FlatMatrix` may be marked as transposed, in which case it presents
/// the transpose of its storage without moving any data.  All dimensions
/// reported by the public API are logical, i.e. after transposition.
///
/// Storage is released either on drop or by an explicit call to
/// [`free`](FlatMatrix::free).  Any access after `free` reports
/// [`MatrixError::Released`].
#[derive(Debug)]
pub struct FlatMatrix<T> {
    id: MatrixId,
    // physical storage dimensions
    m: usize,
    n: usize,
    transposed: bool,
    data: Option<Vec<T>>,
}

fn allocate<T: Element>(len: usize) -> Result<Vec<T>, MatrixError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| MatrixError::AllocationError { elements: len })?;
    data.resize(len, T::zero());
    Ok(data)
}

fn checked_len(rows: usize, cols: usize) -> Result<usize, MatrixError> {
    if rows == 0 || cols == 0 {
        return Err(MatrixError::InvalidDimension { rows, cols });
    }
    rows.checked_mul(cols)
        .ok_or(MatrixError::AllocationError { elements: usize::MAX })
}

impl<T> FlatMatrix<T>
where
    T: Element,
{
    /// Zero initialized `rows x cols` matrix.
    pub fn create(rows: usize, cols: usize) -> Result<Self, MatrixError> {
        let len = checked_len(rows, cols)?;
        let data = allocate(len)?;
        Ok(Self {
            id: MatrixId::next(),
            m: rows,
            n: cols,
            transposed: false,
            data: Some(data),
        })
    }

    /// Matrix taking ownership of column major data.
    pub fn from_col_major(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, MatrixError> {
        let len = checked_len(rows, cols)?;
        if data.len() != len {
            return Err(MatrixError::IncompatibleDimension);
        }
        Ok(Self {
            id: MatrixId::next(),
            m: rows,
            n: cols,
            transposed: false,
            data: Some(data),
        })
    }

    /// Matrix built from a row major array of rows.
    pub fn from_rows<const C: usize>(rows: &[[T; C]]) -> Result<Self, MatrixError> {
        let mut out = Self::create(rows.len(), C)?;
        for (i, row) in rows.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                out.set(i, j, *v)?;
            }
        }
        Ok(out)
    }

    pub fn id(&self) -> MatrixId {
        self.id
    }

    pub fn datatype(&self) -> DataType {
        T::DATATYPE
    }

    /// logical number of rows
    pub fn nrows(&self) -> usize {
        if self.transposed {
            self.n
        } else {
            self.m
        }
    }

    /// logical number of columns
    pub fn ncols(&self) -> usize {
        if self.transposed {
            self.m
        } else {
            self.n
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    /// leading dimension of the column major storage
    pub fn ld(&self) -> usize {
        self.m
    }

    pub fn is_transposed(&self) -> bool {
        self.transposed
    }

    /// present the transpose of the storage (or undo it)
    pub fn set_transposed(&mut self, transposed: bool) {
        self.transposed = transposed;
    }

    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }

    /// logical (row, col) strides into storage
    pub fn strides(&self) -> (usize, usize) {
        if self.transposed {
            (self.m, 1)
        } else {
            (1, self.m)
        }
    }

    /// Release the storage.  Releasing twice is an error.
    pub fn free(&mut self) -> Result<(), MatrixError> {
        match self.data.take() {
            Some(_) => Ok(()),
            None => Err(MatrixError::Released),
        }
    }

    /// raw column major storage, ignoring the transpose flag
    pub fn storage(&self) -> Result<&[T], MatrixError> {
        self.data.as_deref().ok_or(MatrixError::Released)
    }

    pub fn storage_mut(&mut self) -> Result<&mut [T], MatrixError> {
        self.data.as_deref_mut().ok_or(MatrixError::Released)
    }

    fn linear_index(&self, i: usize, j: usize) -> Result<usize, MatrixError> {
        let (m, n) = self.size();
        if i >= m || j >= n {
            return Err(MatrixError::IndexOutOfBounds {
                index: (i, j),
                bound: (m, n),
            });
        }
        let (rs, cs) = self.strides();
        Ok(i * rs + j * cs)
    }

    pub fn get(&self, i: usize, j: usize) -> Result<T, MatrixError> {
        let idx = self.linear_index(i, j)?;
        Ok(self.storage()?[idx])
    }

    pub fn set(&mut self, i: usize, j: usize, v: T) -> Result<(), MatrixError> {
        let idx = self.linear_index(i, j)?;
        self.storage_mut()?[idx] = v;
        Ok(())
    }

    /// strided view of the whole (logical) matrix
    pub fn view(&self) -> Result<TileRef<'_, T>, MatrixError> {
        let data = self.storage()?;
        let (m, n) = self.size();
        let (rs, cs) = self.strides();
        // SAFETY: the view spans exactly the owned storage
        Ok(unsafe { TileRef::from_raw_parts(data.as_ptr(), m, n, rs, cs) })
    }

    /// view of the logical transpose, without touching the flag or the data
    pub fn transposed_view(&self) -> Result<TileRef<'_, T>, MatrixError> {
        Ok(self.view()?.transpose())
    }

    /// mutable strided view of the whole (logical) matrix
    pub fn view_mut(&mut self) -> Result<TileMut<'_, T>, MatrixError> {
        let (m, n) = self.size();
        let (rs, cs) = self.strides();
        let data = self.storage_mut()?;
        // SAFETY: the view spans exactly the exclusively borrowed storage
        Ok(unsafe { TileMut::from_raw_parts(data.as_mut_ptr(), m, n, rs, cs) })
    }

    /// explicit deep copy with a fresh identity
    pub fn try_clone(&self) -> Result<Self, MatrixError> {
        let src = self.storage()?;
        let mut data = allocate(src.len())?;
        data.copy_from_slice(src);
        Ok(Self {
            id: MatrixId::next(),
            m: self.m,
            n: self.n,
            transposed: self.transposed,
            data: Some(data),
        })
    }

    /// overwrite with the logical contents of a same sized matrix
    pub fn copy_from(&mut self, src: &FlatMatrix<T>) -> Result<(), MatrixError> {
        if self.size() != src.size() {
            return Err(MatrixError::IncompatibleDimension);
        }
        let from = src.view()?;
        self.view_mut()?.copy_from(&from);
        Ok(())
    }
}

impl<T> FlatMatrix<T>
where
    T: FloatT,
{
    pub fn identity(n: usize) -> Result<Self, MatrixError> {
        let mut out = Self::create(n, n)?;
        for i in 0..n {
            out.set(i, i, T::one())?;
        }
        Ok(out)
    }

    /// maximum absolute column sum
    pub fn norm_one(&self) -> Result<T, MatrixError> {
        let v = self.view()?;
        Ok(norm_one(&v, |_, _| true))
    }

    /// maximum absolute column sum of the lower triangle of `self - other`
    pub fn norm_one_lower_diff(&self, other: &FlatMatrix<T>) -> Result<T, MatrixError> {
        self.diff_norm(other, |i, j| i >= j)
    }

    /// maximum absolute column sum of the upper triangle of `self - other`
    pub fn norm_one_upper_diff(&self, other: &FlatMatrix<T>) -> Result<T, MatrixError> {
        self.diff_norm(other, |i, j| i <= j)
    }

    fn diff_norm<F>(&self, other: &FlatMatrix<T>, keep: F) -> Result<T, MatrixError>
    where
        F: Fn(usize, usize) -> bool,
    {
        if self.size() != other.size() {
            return Err(MatrixError::IncompatibleDimension);
        }
        let (a, b) = (self.view()?, other.view()?);
        let mut out = T::zero();
        for j in 0..a.ncols() {
            let mut colsum = T::zero();
            for i in (0..a.nrows()).filter(|&i| keep(i, j)) {
                colsum += (a[(i, j)] - b[(i, j)]).abs();
            }
            out = T::max(out, colsum);
        }
        Ok(out)
    }

    /// symmetric positive definite test matrix `B*B' + n*I`, where `B` has
    /// entries drawn from `entries`
    pub fn spd_from<I>(n: usize, mut entries: I) -> Result<Self, MatrixError>
    where
        I: Iterator<Item = T>,
    {
        let mut b = Self::create(n, n)?;
        for v in b.storage_mut()?.iter_mut() {
            *v = entries.next().unwrap_or_else(T::zero);
        }
        let mut out = Self::create(n, n)?;
        let bv = b.view()?;
        let mut ov = out.view_mut()?;
        for j in 0..n {
            for i in j..n {
                let mut s = T::zero();
                for k in 0..n {
                    s += bv[(i, k)] * bv[(j, k)];
                }
                ov[(i, j)] = s;
                ov[(j, i)] = s;
            }
            ov[(j, j)] += n.as_T();
        }
        Ok(out)
    }
}

fn norm_one<T: FloatT, F: Fn(usize, usize) -> bool>(v: &TileRef<'_, T>, keep: F) -> T {
    let mut out = T::zero();
    for j in 0..v.ncols() {
        let mut colsum = T::zero();
        for i in (0..v.nrows()).filter(|&i| keep(i, j)) {
            colsum += v[(i, j)].abs();
        }
        out = T::max(out, colsum);
    }
    out
}

impl<T: Element> Index<(usize, usize)> for FlatMatrix<T> {
    type Output = T;
    fn index(&self, (i, j): (usize, usize)) -> &T {
        let idx = match self.linear_index(i, j) {
            Ok(idx) => idx,
            Err(e) => panic!("{}", e),
        };
        match self.data.as_ref() {
            Some(data) => &data[idx],
            None => panic!("{}", MatrixError::Released),
        }
    }
}

impl<T: Element> IndexMut<(usize, usize)> for FlatMatrix<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        let idx = match self.linear_index(i, j) {
            Ok(idx) => idx,
            Err(e) => panic!("{}", e),
        };
        match self.data.as_mut() {
            Some(data) => &mut data[idx],
            None => panic!("{}", MatrixError::Released),
        }
    }
}

impl<T: FloatT> std::fmt::Display for FlatMatrix<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (m, n) = self.size();
        writeln!(f, "{} x {} {} matrix {}", m, n, T::DATATYPE, self.id)?;
        let Ok(v) = self.view() else {
            return writeln!(f, "  (released)");
        };
        for i in 0..m {
            write!(f, "  ")?;
            for j in 0..n {
                write!(f, " {:10.3e}", v[(i, j)])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_create_and_index() {
        let mut a = FlatMatrix::<f64>::create(3, 2).unwrap();
        assert_eq!(a.size(), (3, 2));
        assert_eq!(a.datatype(), DataType::Real64);
        a.set(2, 1, 4.0).unwrap();
        assert_eq!(a[(2, 1)], 4.0);
        assert_eq!(a.storage().unwrap()[5], 4.0);

        assert!(matches!(
            a.get(3, 0),
            Err(MatrixError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            FlatMatrix::<f32>::create(0, 4),
            Err(MatrixError::InvalidDimension { rows: 0, cols: 4 })
        ));
    }

    #[test]
    fn test_other_datatypes() {
        let a = FlatMatrix::<Complex64>::create(2, 2).unwrap();
        assert_eq!(a.datatype(), DataType::Complex64);
        let b = FlatMatrix::<i32>::create(2, 2).unwrap();
        assert_eq!(b.datatype(), DataType::Int32);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_transposed() {
        let mut a = FlatMatrix::from_rows(&[[1., 2., 3.], [4., 5., 6.]]).unwrap();
        a.set_transposed(true);
        assert_eq!(a.size(), (3, 2));
        assert_eq!(a[(2, 0)], 3.0);
        assert_eq!(a.view().unwrap()[(0, 1)], 4.0);
        let at = a.transposed_view().unwrap();
        assert_eq!(at.size(), (2, 3));
        assert_eq!(at[(1, 0)], 4.0);
    }

    #[test]
    fn test_free_twice() {
        let mut a = FlatMatrix::<f64>::identity(4).unwrap();
        assert!(a.free().is_ok());
        assert!(a.is_released());
        assert_eq!(a.free(), Err(MatrixError::Released));
        assert_eq!(a.get(0, 0), Err(MatrixError::Released));
    }

    #[test]
    fn test_clone_and_norms() {
        let a = FlatMatrix::from_rows(&[[1., -2.], [3., 4.]]).unwrap();
        let mut b = a.try_clone().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.norm_one().unwrap(), 6.0);

        b[(0, 1)] = 0.0;
        assert_eq!(a.norm_one_lower_diff(&b).unwrap(), 0.0);
        assert_eq!(a.norm_one_upper_diff(&b).unwrap(), 2.0);
    }
}
