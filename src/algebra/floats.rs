#![allow(non_snake_case)]
use num_complex::{Complex32, Complex64};
use num_traits::{Float, FloatConst, FromPrimitive, NumAssign, Zero};
use std::fmt::{Debug, Display, LowerExp};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "blas")]
use crate::algebra::kernels::BlasFloatT;

/// Element datatype of the storage owned by a
/// [`FlatMatrix`](crate::algebra::FlatMatrix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataType {
    Real32,
    Real64,
    Complex32,
    Complex64,
    Int32,
    Int64,
}

impl DataType {
    /// size in bytes of a single element
    pub fn size_of(&self) -> usize {
        match self {
            DataType::Real32 | DataType::Int32 => 4,
            DataType::Real64 | DataType::Int64 | DataType::Complex32 => 8,
            DataType::Complex64 => 16,
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, DataType::Complex32 | DataType::Complex64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataType::Real32 => "f32",
            DataType::Real64 => "f64",
            DataType::Complex32 => "c32",
            DataType::Complex64 => "c64",
            DataType::Int32 => "i32",
            DataType::Int64 => "i64",
        };
        write!(f, "{}", s)
    }
}

/// Scalar types that can be stored in a flat matrix.
///
/// The byte conversions are used when tile contents are fingerprinted or
/// spilled to disk by the scheduler's tile cache.
pub trait Element: 'static + Copy + Send + Sync + Debug + PartialEq + Zero {
    const DATATYPE: DataType;

    /// append the little endian byte representation of `self` to `out`
    fn write_le_bytes(&self, out: &mut Vec<u8>);

    /// read a value back from exactly `DATATYPE.size_of()` bytes
    fn read_le_bytes(bytes: &[u8]) -> Self;
}

macro_rules! impl_element_primitive {
    ($T:ty, $tag:expr, $N:expr) => {
        impl Element for $T {
            const DATATYPE: DataType = $tag;

            fn write_le_bytes(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le_bytes(bytes: &[u8]) -> Self {
                let mut buf = [0u8; $N];
                buf.copy_from_slice(bytes);
                <$T>::from_le_bytes(buf)
            }
        }
    };
}

impl_element_primitive!(f32, DataType::Real32, 4);
impl_element_primitive!(f64, DataType::Real64, 8);
impl_element_primitive!(i32, DataType::Int32, 4);
impl_element_primitive!(i64, DataType::Int64, 8);

macro_rules! impl_element_complex {
    ($T:ty, $R:ty, $tag:expr, $N:expr) => {
        impl Element for $T {
            const DATATYPE: DataType = $tag;

            fn write_le_bytes(&self, out: &mut Vec<u8>) {
                self.re.write_le_bytes(out);
                self.im.write_le_bytes(out);
            }

            fn read_le_bytes(bytes: &[u8]) -> Self {
                let (re, im) = bytes.split_at($N);
                <$T>::new(<$R>::read_le_bytes(re), <$R>::read_le_bytes(im))
            }
        }
    };
}

impl_element_complex!(Complex32, f32, DataType::Complex32, 4);
impl_element_complex!(Complex64, f64, DataType::Complex64, 8);

/// Core traits for floating point values that tile kernels operate on.
pub trait CoreFloatT:
    Element + Float + FloatConst + NumAssign + Default + FromPrimitive + Display + LowerExp
{
}

impl<T> CoreFloatT for T where
    T: Element + Float + FloatConst + NumAssign + Default + FromPrimitive + Display + LowerExp
{
}

// if "blas" is enabled, kernels may be handed to BLAS/LAPACK, so
// restrict FloatT to the f32/f64 types those libraries support

cfg_if::cfg_if! {
    if #[cfg(not(feature="blas"))] {
        /// Main trait for floating point types used by the tile kernels.
        ///
        /// `FloatT` relies on [`num_traits`](num_traits) for most of its
        /// constituent trait bounds.  When compiled with the "blas" feature
        /// it is additionally restricted to the f32/f64 types supported by
        /// BLAS/LAPACK.
        pub trait FloatT: CoreFloatT {}
        impl<T> FloatT for T where T: CoreFloatT {}
    } else {
        pub trait FloatT: CoreFloatT + BlasFloatT {}
        impl<T> FloatT for T where T: CoreFloatT + BlasFloatT {}
    }
}

/// Convenience conversion of `f64` constants into [`FloatT`].
pub trait AsFloatT<T>: 'static {
    fn as_T(&self) -> T;
}

impl<T> AsFloatT<T> for f64
where
    T: FloatT,
{
    #[inline]
    fn as_T(&self) -> T {
        T::from_f64(*self).unwrap()
    }
}

impl<T> AsFloatT<T> for usize
where
    T: FloatT,
{
    #[inline]
    fn as_T(&self) -> T {
        T::from_usize(*self).unwrap()
    }
}

#[test]
fn test_element_bytes() {
    let mut buf = Vec::new();
    (-1.5f64).write_le_bytes(&mut buf);
    7i32.write_le_bytes(&mut buf);
    Complex32::new(2.0, -3.0).write_le_bytes(&mut buf);
    assert_eq!(buf.len(), 8 + 4 + 8);

    assert_eq!(f64::read_le_bytes(&buf[0..8]), -1.5);
    assert_eq!(i32::read_le_bytes(&buf[8..12]), 7);
    assert_eq!(
        Complex32::read_le_bytes(&buf[12..20]),
        Complex32::new(2.0, -3.0)
    );
}

#[test]
fn test_datatype_sizes() {
    assert_eq!(f32::DATATYPE.size_of(), 4);
    assert_eq!(Complex64::DATATYPE.size_of(), 16);
    assert!(Complex32::DATATYPE.is_complex());
    assert!(i64::DATATYPE.is_integer());
    assert!(!f64::DATATYPE.is_integer());
}
