use std::fmt;

/// Coefficient × frame matrix, row-major.
///
/// Rows are spectral coefficients (MFCC or mel bands), columns are time frames.
///
/// # Example
/// ```
/// use eb_core::features::FeatureMatrix;
/// let m = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
/// assert_eq!(m.shape(), (2, 2));
/// assert_eq!(m.flatten(), vec![1.0, 2.0, 3.0, 4.0]);
/// assert_eq!(m.to_time_major(), vec![1.0, 3.0, 2.0, 4.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    /// Zero-filled matrix.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wrap a row-major buffer. Returns `None` if `data.len() != rows * cols`.
    #[must_use]
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { rows, cols, data })
    }

    /// Build from equally sized rows. Returns `None` for ragged input.
    #[must_use]
    pub fn from_rows(rows: &[Vec<f32>]) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let data = rows.iter().flatten().copied().collect();
        Some(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// `(rows, cols)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element at `(row, col)`, if in range.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Mutable element at `(row, col)`, if in range.
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut f32> {
        if row < self.rows && col < self.cols {
            Some(&mut self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// One coefficient across all frames.
    #[must_use]
    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Row iterator, mutable. Normalization overwrites values through this.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        // chunks_exact_mut panics on 0
        let step = self.cols.max(1);
        self.data.chunks_exact_mut(step).take(self.rows)
    }

    /// Row-major backing buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Row-major copy (the flat feature vector).
    #[must_use]
    pub fn flatten(&self) -> Vec<f32> {
        self.data.clone()
    }

    /// Transposed copy: frames × coefficients, row-major.
    #[must_use]
    pub fn to_time_major(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.data.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                out.push(self.data[r * self.cols + c]);
            }
        }
        out
    }

    /// True when every element is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// Input layout a backend declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputShape {
    /// Row-major flattened coefficient matrix.
    Flat {
        /// Total number of features.
        len: usize,
    },
    /// Frames × coefficients (sequence models).
    TimeMajor {
        /// Number of time steps.
        frames: usize,
        /// Features per time step.
        coeffs: usize,
    },
    /// Channels × height × width image.
    Image {
        /// Channel count.
        channels: usize,
        /// Rows (frequency bins).
        height: usize,
        /// Columns (time frames).
        width: usize,
    },
}

impl InputShape {
    /// Number of scalars the shape holds.
    #[must_use]
    pub fn numel(&self) -> usize {
        match *self {
            Self::Flat { len } => len,
            Self::TimeMajor { frames, coeffs } => frames * coeffs,
            Self::Image {
                channels,
                height,
                width,
            } => channels * height * width,
        }
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Flat { len } => write!(f, "[{len}]"),
            Self::TimeMajor { frames, coeffs } => write!(f, "[{frames}×{coeffs}]"),
            Self::Image {
                channels,
                height,
                width,
            } => write!(f, "[{channels}×{height}×{width}]"),
        }
    }
}

/// Feature buffer tagged with its layout, as handed to a backend.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelInput {
    shape: InputShape,
    data: Vec<f32>,
}

impl ModelInput {
    /// Flat feature vector.
    #[must_use]
    pub fn flat(matrix: &FeatureMatrix) -> Self {
        let data = matrix.flatten();
        Self {
            shape: InputShape::Flat { len: data.len() },
            data,
        }
    }

    /// Time-major sequence (frames × coefficients).
    #[must_use]
    pub fn time_major(matrix: &FeatureMatrix) -> Self {
        Self {
            shape: InputShape::TimeMajor {
                frames: matrix.cols(),
                coeffs: matrix.rows(),
            },
            data: matrix.to_time_major(),
        }
    }

    /// Single-channel image with rows as height.
    #[must_use]
    pub fn image(matrix: &FeatureMatrix) -> Self {
        Self {
            shape: InputShape::Image {
                channels: 1,
                height: matrix.rows(),
                width: matrix.cols(),
            },
            data: matrix.flatten(),
        }
    }

    /// Raw constructor. Returns `None` if `data` does not fill `shape`.
    #[must_use]
    pub fn new(shape: InputShape, data: Vec<f32>) -> Option<Self> {
        (shape.numel() == data.len()).then_some(Self { shape, data })
    }

    #[must_use]
    pub fn shape(&self) -> InputShape {
        self.shape
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}
