use crate::error::MeshError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridDimensions2D(pub usize, pub usize); // nx, ny (cells per axis)

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize2D(pub f64, pub f64); // dx, dy

/// Structured tensor mesh with uniform spacing.
///
/// Cells are numbered x-fastest, faces normal to x come first (also
/// x-fastest), then faces normal to y. For a 3 x 2 mesh:
///
/// ```text
/// +--14--+--15--+--16--+
/// |      |      |      |
/// 4  c3  5  c4  6  c5  7
/// |      |      |      |
/// +--11--+--12--+--13--+
/// |      |      |      |
/// 0  c0  1  c1  2  c2  3
/// |      |      |      |
/// +---8--+---9--+--10--+
/// ```
///
/// `c#` are cell indices, numbers on vertical edges are x-face indices,
/// numbers on horizontal edges are y-face indices (offset by the number
/// of x-faces).
#[derive(Debug, Clone)]
pub struct TensorMesh2D {
    pub dimensions: GridDimensions2D,
    pub cell_size: CellSize2D,
}

impl TensorMesh2D {
    pub fn new(dimensions: GridDimensions2D, cell_size: CellSize2D) -> Result<Self, MeshError> {
        let GridDimensions2D(nx, ny) = dimensions;
        if nx < 1 || ny < 1 {
            return Err(MeshError::InvalidResolution(
                "Mesh dimensions (nx, ny) must be at least 1x1.".to_string(),
            ));
        }
        let CellSize2D(dx, dy) = cell_size;
        if !dx.is_finite() || !dy.is_finite() || dx <= 0.0 || dy <= 0.0 {
            return Err(MeshError::InvalidSpacing(
                "Cell sizes (dx, dy) must be finite and positive.".to_string(),
            ));
        }
        Ok(Self {
            dimensions,
            cell_size,
        })
    }

    /// Mesh over `[0,1] x [0,1]` with `n` cells per axis.
    pub fn unit_square(n: usize) -> Result<Self, MeshError> {
        if n < 1 {
            return Err(MeshError::InvalidResolution(
                "Unit-square mesh needs at least 1 cell per axis.".to_string(),
            ));
        }
        let h = 1.0 / n as f64;
        Self::new(GridDimensions2D(n, n), CellSize2D(h, h))
    }

    pub fn n_cells(&self) -> usize {
        self.dimensions.0 * self.dimensions.1
    }

    pub fn n_faces_x(&self) -> usize {
        (self.dimensions.0 + 1) * self.dimensions.1
    }

    pub fn n_faces_y(&self) -> usize {
        self.dimensions.0 * (self.dimensions.1 + 1)
    }

    pub fn n_faces(&self) -> usize {
        self.n_faces_x() + self.n_faces_y()
    }

    pub fn cell_index(&self, ix: usize, iy: usize) -> usize {
        debug_assert!(ix < self.dimensions.0 && iy < self.dimensions.1);
        ix + iy * self.dimensions.0
    }

    pub fn cell_center(&self, k: usize) -> (f64, f64) {
        debug_assert!(k < self.n_cells());
        let nx = self.dimensions.0;
        let ix = k % nx;
        let iy = k / nx;
        (
            (ix as f64 + 0.5) * self.cell_size.0,
            (iy as f64 + 0.5) * self.cell_size.1,
        )
    }

    /// Uniform spacing, so every cell has the same volume.
    pub fn cell_volume(&self) -> f64 {
        self.cell_size.0 * self.cell_size.1
    }

    /// Face `ix + iy*(nx+1)` is the x-normal face left of cell column `ix`.
    pub fn x_face_index(&self, ix: usize, iy: usize) -> usize {
        debug_assert!(ix <= self.dimensions.0 && iy < self.dimensions.1);
        ix + iy * (self.dimensions.0 + 1)
    }

    pub fn y_face_index(&self, ix: usize, iy: usize) -> usize {
        debug_assert!(ix < self.dimensions.0 && iy <= self.dimensions.1);
        self.n_faces_x() + ix + iy * self.dimensions.0
    }

    /// In 2-D the "area" of a face is the edge length it spans.
    pub fn face_area(&self, f: usize) -> f64 {
        debug_assert!(f < self.n_faces());
        if f < self.n_faces_x() {
            self.cell_size.1
        } else {
            self.cell_size.0
        }
    }

    /// Index of the cell whose center is nearest to `(x, y)`.
    ///
    /// The scan runs over ascending flat indices with a strict `<`
    /// comparison, so an exact tie resolves to the lowest index.
    pub fn closest_cell_index(&self, x: f64, y: f64) -> usize {
        let mut best = 0;
        let mut best_d2 = f64::INFINITY;
        for k in 0..self.n_cells() {
            let (cx, cy) = self.cell_center(k);
            let d2 = (cx - x) * (cx - x) + (cy - y) * (cy - y);
            if d2 < best_d2 {
                best = k;
                best_d2 = d2;
            }
        }
        best
    }
}
