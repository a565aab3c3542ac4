use std::fmt;

/// Handle of a hierarchical matrix registered with a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatrixHandle(pub(crate) usize);

impl fmt::Display for MatrixHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// A tile named by its matrix handle and grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub matrix: MatrixHandle,
    pub row: usize,
    pub col: usize,
}

impl TileCoord {
    pub fn new(matrix: MatrixHandle, row: usize, col: usize) -> Self {
        Self { matrix, row, col }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.matrix, self.row, self.col)
    }
}

/// Operation tag of a tile task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileOpKind {
    Potrf,
    Trsm,
    Syrk,
    Gemm,
    Geqrt,
    Unmqr,
    Tsqrt,
    Tsmqr,
    Axpy,
    Copy,
}

impl TileOpKind {
    pub const ALL: [TileOpKind; 10] = [
        TileOpKind::Potrf,
        TileOpKind::Trsm,
        TileOpKind::Syrk,
        TileOpKind::Gemm,
        TileOpKind::Geqrt,
        TileOpKind::Unmqr,
        TileOpKind::Tsqrt,
        TileOpKind::Tsmqr,
        TileOpKind::Axpy,
        TileOpKind::Copy,
    ];

    // critical path rank: diagonal factorizations, then panel operations,
    // then trailing updates
    pub(crate) fn rank(&self) -> u8 {
        match self {
            TileOpKind::Potrf | TileOpKind::Geqrt => 0,
            TileOpKind::Trsm | TileOpKind::Tsqrt | TileOpKind::Unmqr => 1,
            TileOpKind::Syrk | TileOpKind::Gemm | TileOpKind::Tsmqr => 2,
            TileOpKind::Axpy | TileOpKind::Copy => 3,
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for TileOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TileOpKind::Potrf => "POTRF",
            TileOpKind::Trsm => "TRSM",
            TileOpKind::Syrk => "SYRK",
            TileOpKind::Gemm => "GEMM",
            TileOpKind::Geqrt => "GEQRT",
            TileOpKind::Unmqr => "UNMQR",
            TileOpKind::Tsqrt => "TSQRT",
            TileOpKind::Tsmqr => "TSMQR",
            TileOpKind::Axpy => "AXPY",
            TileOpKind::Copy => "COPY",
        };
        write!(f, "{}", s)
    }
}

/// A tile operation and its operands.
///
/// See [`TileKernels`](crate::algebra::TileKernels) for the meaning of each
/// operation.  Operand names follow the kernel arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TileOp<T> {
    Potrf {
        a: TileCoord,
    },
    Trsm {
        l: TileCoord,
        b: TileCoord,
    },
    Syrk {
        a: TileCoord,
        c: TileCoord,
    },
    Gemm {
        a: TileCoord,
        b: TileCoord,
        c: TileCoord,
    },
    Geqrt {
        a: TileCoord,
        tau: TileCoord,
    },
    Unmqr {
        v: TileCoord,
        tau: TileCoord,
        c: TileCoord,
    },
    Tsqrt {
        r: TileCoord,
        a: TileCoord,
        tau: TileCoord,
    },
    Tsmqr {
        c1: TileCoord,
        c2: TileCoord,
        v: TileCoord,
        tau: TileCoord,
    },
    Axpy {
        alpha: T,
        x: TileCoord,
        y: TileCoord,
    },
    Copy {
        x: TileCoord,
        y: TileCoord,
    },
}

impl<T> TileOp<T> {
    pub fn kind(&self) -> TileOpKind {
        match self {
            TileOp::Potrf { .. } => TileOpKind::Potrf,
            TileOp::Trsm { .. } => TileOpKind::Trsm,
            TileOp::Syrk { .. } => TileOpKind::Syrk,
            TileOp::Gemm { .. } => TileOpKind::Gemm,
            TileOp::Geqrt { .. } => TileOpKind::Geqrt,
            TileOp::Unmqr { .. } => TileOpKind::Unmqr,
            TileOp::Tsqrt { .. } => TileOpKind::Tsqrt,
            TileOp::Tsmqr { .. } => TileOpKind::Tsmqr,
            TileOp::Axpy { .. } => TileOpKind::Axpy,
            TileOp::Copy { .. } => TileOpKind::Copy,
        }
    }

    /// tiles read but not written
    pub fn reads(&self) -> Vec<TileCoord> {
        match *self {
            TileOp::Potrf { .. } | TileOp::Geqrt { .. } | TileOp::Tsqrt { .. } => vec![],
            TileOp::Trsm { l, .. } => vec![l],
            TileOp::Syrk { a, .. } => vec![a],
            TileOp::Gemm { a, b, .. } => vec![a, b],
            TileOp::Unmqr { v, tau, .. } => vec![v, tau],
            TileOp::Tsmqr { v, tau, .. } => vec![v, tau],
            TileOp::Axpy { x, .. } | TileOp::Copy { x, .. } => vec![x],
        }
    }

    /// tiles written (and possibly read).  The first entry is the primary
    /// output used when reporting failures.
    pub fn writes(&self) -> Vec<TileCoord> {
        match *self {
            TileOp::Potrf { a } => vec![a],
            TileOp::Trsm { b, .. } => vec![b],
            TileOp::Syrk { c, .. } | TileOp::Gemm { c, .. } | TileOp::Unmqr { c, .. } => vec![c],
            TileOp::Geqrt { a, tau } => vec![a, tau],
            TileOp::Tsqrt { r, a, tau } => vec![a, r, tau],
            TileOp::Tsmqr { c1, c2, .. } => vec![c2, c1],
            TileOp::Axpy { y, .. } | TileOp::Copy { y, .. } => vec![y],
        }
    }

    /// writes followed by reads
    pub fn operands(&self) -> Vec<TileCoord> {
        let mut out = self.writes();
        out.extend(self.reads());
        out
    }
}

/// A tile operation submitted to the scheduler.
///
/// `level` is the step of the blocked algorithm that produced the task
/// (e.g. the panel index `k`) and is only used to prioritize ready tasks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileTask<T> {
    pub op: TileOp<T>,
    pub level: usize,
}

impl<T> TileTask<T> {
    pub fn new(op: TileOp<T>, level: usize) -> Self {
        Self { op, level }
    }

    pub fn kind(&self) -> TileOpKind {
        self.op.kind()
    }
}

#[test]
fn test_task_operands() {
    let m = MatrixHandle(0);
    let t = |i, j| TileCoord::new(m, i, j);

    let op: TileOp<f64> = TileOp::Gemm {
        a: t(2, 0),
        b: t(1, 0),
        c: t(2, 1),
    };
    assert_eq!(op.kind(), TileOpKind::Gemm);
    assert_eq!(op.reads(), vec![t(2, 0), t(1, 0)]);
    assert_eq!(op.writes(), vec![t(2, 1)]);
    assert_eq!(op.operands().len(), 3);

    let op: TileOp<f64> = TileOp::Tsqrt {
        r: t(0, 0),
        a: t(1, 0),
        tau: TileCoord::new(MatrixHandle(1), 1, 0),
    };
    assert!(op.reads().is_empty());
    assert_eq!(op.writes()[0], t(1, 0));
    assert_eq!(format!("{}", op.kind()), "TSQRT");
    assert_eq!(format!("{}", t(1, 0)), "M0(1,0)");
}
