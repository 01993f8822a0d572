use nalgebra::DVector;
use rsparse::data::{Sprs, Trpl};

use crate::domain::mesh::TensorMesh2D;

// Cells adjacent to a face, each with the sign it carries in the
// divergence stencil: a cell counts a face positively when the face sits
// on its high-coordinate side. Boundary faces have a single neighbor.
fn face_adjacency(
    mesh: &TensorMesh2D,
    f: usize,
) -> (Option<(usize, f64)>, Option<(usize, f64)>) {
    let nx = mesh.dimensions.0;
    let ny = mesh.dimensions.1;
    if f < mesh.n_faces_x() {
        let ix = f % (nx + 1);
        let iy = f / (nx + 1);
        let left = (ix > 0).then(|| (mesh.cell_index(ix - 1, iy), 1.0));
        let right = (ix < nx).then(|| (mesh.cell_index(ix, iy), -1.0));
        (left, right)
    } else {
        let g = f - mesh.n_faces_x();
        let ix = g % nx;
        let iy = g / nx;
        let below = (iy > 0).then(|| (mesh.cell_index(ix, iy - 1), 1.0));
        let above = (iy < ny).then(|| (mesh.cell_index(ix, iy), -1.0));
        (below, above)
    }
}

/// Discrete face divergence `D` as `(cell, face, value)` triplets with
/// `value = sign * area / volume`, so `(D u)_c` is the net outflux of the
/// face field `u` through the cell boundary per unit volume.
pub fn divergence_triplets(mesh: &TensorMesh2D) -> Vec<(usize, usize, f64)> {
    let vol = mesh.cell_volume();
    let mut triplets = Vec::with_capacity(2 * mesh.n_faces());
    for f in 0..mesh.n_faces() {
        let area = mesh.face_area(f);
        let (a, b) = face_adjacency(mesh, f);
        for (cell, sign) in a.into_iter().chain(b) {
            triplets.push((cell, f, sign * area / vol));
        }
    }
    triplets
}

/// Diagonal of the face inner-product matrix `Mf(m)` for a per-cell scalar
/// `m`: each face collects `volume * m / 2` from its adjacent cells. On a
/// tensor mesh with an isotropic model the full matrix is diagonal, so the
/// diagonal is the operator.
///
/// `invert_model` replaces `m` by `1/m` before assembly; `invert_matrix`
/// returns the entrywise reciprocal of the assembled diagonal.
pub fn face_inner_product_diagonal(
    mesh: &TensorMesh2D,
    model: &DVector<f64>,
    invert_model: bool,
    invert_matrix: bool,
) -> Vec<f64> {
    let vol = mesh.cell_volume();
    let mut diag = vec![0.0; mesh.n_faces()];
    for (f, entry) in diag.iter_mut().enumerate() {
        let (a, b) = face_adjacency(mesh, f);
        for (cell, _) in a.into_iter().chain(b) {
            let m = if invert_model {
                1.0 / model[cell]
            } else {
                model[cell]
            };
            *entry += 0.5 * vol * m;
        }
    }
    if invert_matrix {
        for entry in diag.iter_mut() {
            *entry = 1.0 / *entry;
        }
    }
    diag
}

/// System matrix `A = Vol * Div * Sigma * Div^T * Vol` as a CSC sparse
/// matrix, with `Sigma = [Mf(1/sigma)]^-1`.
///
/// Since `Vol * Div` has per-face columns holding `sign * area` on the
/// adjacent cells, the product folds into one transmissibility
/// `area^2 * Sigma_ff` per face: it adds to both adjacent diagonals and
/// subtracts on the off-diagonal pair. Boundary faces touch only their
/// single cell's diagonal, which pins the potential against an implicit
/// zero ghost value outside the domain. The result is symmetric by
/// construction.
pub fn assemble_system(mesh: &TensorMesh2D, sigma: &DVector<f64>) -> Sprs<f64> {
    let n = mesh.n_cells();
    let sigma_face = face_inner_product_diagonal(mesh, sigma, true, true);

    // Accumulate the diagonal separately so every (row, col) pair is
    // emitted exactly once and conversion never has to merge duplicates.
    let mut diagonal = vec![0.0; n];
    let mut collected_triplets: Vec<(usize, usize, f64)> = Vec::with_capacity(5 * n);
    for f in 0..mesh.n_faces() {
        let area = mesh.face_area(f);
        let t = area * area * sigma_face[f];
        match face_adjacency(mesh, f) {
            (Some((c1, s1)), Some((c2, s2))) => {
                diagonal[c1] += t;
                diagonal[c2] += t;
                collected_triplets.push((c1, c2, s1 * s2 * t));
                collected_triplets.push((c2, c1, s1 * s2 * t));
            }
            (Some((c, _)), None) | (None, Some((c, _))) => {
                diagonal[c] += t;
            }
            (None, None) => unreachable!("face without adjacent cells"),
        }
    }
    for (c, value) in diagonal.into_iter().enumerate() {
        collected_triplets.push((c, c, value));
    }

    let mut trpl_mat = Trpl::<f64> {
        m: n,
        n,
        p: Vec::with_capacity(collected_triplets.len()),
        i: Vec::with_capacity(collected_triplets.len()),
        x: Vec::with_capacity(collected_triplets.len()),
    };
    for (row_idx, col_idx, value) in collected_triplets.iter() {
        trpl_mat.i.push(*row_idx);
        trpl_mat.p.push(*col_idx as isize);
        trpl_mat.x.push(*value);
    }

    let mut sprs_mat = Sprs::<f64>::new();
    sprs_mat.from_trpl(&trpl_mat);
    sprs_mat
}

/// Face current density `j = Sigma * Div^T * Vol * phi`.
pub fn face_current(
    mesh: &TensorMesh2D,
    sigma: &DVector<f64>,
    phi: &DVector<f64>,
) -> DVector<f64> {
    let sigma_face = face_inner_product_diagonal(mesh, sigma, true, true);
    let vol = mesh.cell_volume();
    let mut j = DVector::zeros(mesh.n_faces());
    for (cell, f, value) in divergence_triplets(mesh) {
        j[f] += value * vol * phi[cell];
    }
    for f in 0..mesh.n_faces() {
        j[f] *= sigma_face[f];
    }
    j
}

/// Average a face field to cell centers, one component per direction:
/// each cell takes the mean of its two x-faces and of its two y-faces.
pub fn faces_to_cell_vectors(
    mesh: &TensorMesh2D,
    u: &DVector<f64>,
) -> (DVector<f64>, DVector<f64>) {
    let nx = mesh.dimensions.0;
    let ny = mesh.dimensions.1;
    let mut ux = DVector::zeros(mesh.n_cells());
    let mut uy = DVector::zeros(mesh.n_cells());
    for iy in 0..ny {
        for ix in 0..nx {
            let k = mesh.cell_index(ix, iy);
            ux[k] = 0.5 * (u[mesh.x_face_index(ix, iy)] + u[mesh.x_face_index(ix + 1, iy)]);
            uy[k] = 0.5 * (u[mesh.y_face_index(ix, iy)] + u[mesh.y_face_index(ix, iy + 1)]);
        }
    }
    (ux, uy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mesh::{CellSize2D, GridDimensions2D};
    use crate::model::{conductivity_model, BlockRegion};
    use approx::assert_relative_eq;
    use nalgebra::dvector;
    use std::collections::HashMap;

    fn triplet_map(triplets: &[(usize, usize, f64)]) -> HashMap<(usize, usize), f64> {
        let mut map = HashMap::new();
        for &(r, c, v) in triplets {
            *map.entry((r, c)).or_insert(0.0) += v;
        }
        map
    }

    fn csc_map(a: &Sprs<f64>) -> HashMap<(usize, usize), f64> {
        let mut map = HashMap::new();
        for col in 0..a.n {
            for idx in a.p[col] as usize..a.p[col + 1] as usize {
                *map.entry((a.i[idx], col)).or_insert(0.0) += a.x[idx];
            }
        }
        map
    }

    #[test]
    fn test_divergence_entries() {
        let mesh = TensorMesh2D::new(GridDimensions2D(2, 2), CellSize2D(0.5, 0.5)).unwrap();
        let triplets = divergence_triplets(&mesh);
        // 2 interior + 4 boundary faces per direction: 8 entries each.
        assert_eq!(triplets.len(), 16);

        // Cell 0 sees its four faces with sign * area/vol = +-2.
        let map = triplet_map(&triplets);
        assert_relative_eq!(map[&(0, 0)], -2.0, epsilon = 1e-12); // left x-face
        assert_relative_eq!(map[&(0, 1)], 2.0, epsilon = 1e-12); // right x-face
        assert_relative_eq!(map[&(0, 6)], -2.0, epsilon = 1e-12); // bottom y-face
        assert_relative_eq!(map[&(0, 8)], 2.0, epsilon = 1e-12); // top y-face
    }

    #[test]
    fn test_divergence_of_uniform_field_is_zero() {
        let mesh = TensorMesh2D::unit_square(5).unwrap();
        let mut div = vec![0.0; mesh.n_cells()];
        for (cell, _f, value) in divergence_triplets(&mesh) {
            div[cell] += value;
        }
        for v in div {
            assert_relative_eq!(v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_divergence_of_linear_flux() {
        // u = (x, 0) has divergence 1 everywhere, and the face field picks
        // up the exact face coordinates, so boundary cells agree too.
        let mesh = TensorMesh2D::new(GridDimensions2D(3, 2), CellSize2D(1.0 / 3.0, 0.5)).unwrap();
        let mut u = vec![0.0; mesh.n_faces()];
        for iy in 0..2 {
            for ix in 0..=3 {
                u[mesh.x_face_index(ix, iy)] = ix as f64 * mesh.cell_size.0;
            }
        }
        let mut div = vec![0.0; mesh.n_cells()];
        for (cell, f, value) in divergence_triplets(&mesh) {
            div[cell] += value * u[f];
        }
        for v in div {
            assert_relative_eq!(v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_face_inner_product_diagonal_flags() {
        // 2x1 mesh, vol = 0.5, model (2, 4). Face order: x-faces 0..3
        // (boundary, interior, boundary), then y-faces 3..7.
        let mesh = TensorMesh2D::new(GridDimensions2D(2, 1), CellSize2D(0.5, 1.0)).unwrap();
        let m = dvector![2.0, 4.0];

        let plain = face_inner_product_diagonal(&mesh, &m, false, false);
        assert_relative_eq!(plain[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(plain[1], 1.5, epsilon = 1e-12);
        assert_relative_eq!(plain[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(plain[3], 0.5, epsilon = 1e-12);
        assert_relative_eq!(plain[6], 1.0, epsilon = 1e-12);

        let inv_model = face_inner_product_diagonal(&mesh, &m, true, false);
        assert_relative_eq!(inv_model[0], 0.125, epsilon = 1e-12);
        assert_relative_eq!(inv_model[1], 0.1875, epsilon = 1e-12);
        assert_relative_eq!(inv_model[2], 0.0625, epsilon = 1e-12);

        let inv_matrix = face_inner_product_diagonal(&mesh, &m, false, true);
        assert_relative_eq!(inv_matrix[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(inv_matrix[1], 1.0 / 1.5, epsilon = 1e-12);

        let both = face_inner_product_diagonal(&mesh, &m, true, true);
        assert_relative_eq!(both[0], 8.0, epsilon = 1e-12);
        assert_relative_eq!(both[1], 1.0 / 0.1875, epsilon = 1e-12);
        assert_relative_eq!(both[2], 16.0, epsilon = 1e-12);
    }

    #[test]
    fn test_assemble_system_small_mesh_values() {
        // Uniform sigma = 2 on a 2x1 mesh gives transmissibilities 8, 4, 8
        // on the x-faces and 2 on each y-face.
        let mesh = TensorMesh2D::new(GridDimensions2D(2, 1), CellSize2D(0.5, 1.0)).unwrap();
        let sigma = dvector![2.0, 2.0];
        let a = assemble_system(&mesh, &sigma);
        assert_eq!(a.m, 2);
        assert_eq!(a.n, 2);

        let map = csc_map(&a);
        assert_eq!(map.len(), 4);
        assert_relative_eq!(map[&(0, 0)], 16.0, epsilon = 1e-12);
        assert_relative_eq!(map[&(1, 1)], 16.0, epsilon = 1e-12);
        assert_relative_eq!(map[&(0, 1)], -4.0, epsilon = 1e-12);
        assert_relative_eq!(map[&(1, 0)], -4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_assemble_system_symmetry_and_structure() {
        let mesh = TensorMesh2D::unit_square(100).unwrap();
        let sigma = conductivity_model(&mesh, 1.0, 2.0, &BlockRegion::default());
        let a = assemble_system(&mesh, &sigma);
        assert_eq!(a.m, 10_000);
        assert_eq!(a.n, 10_000);
        // Diagonal plus two entries per interior face.
        assert_eq!(a.p[a.n] as usize, 49_600);

        let map = csc_map(&a);
        for (&(r, c), &v) in map.iter() {
            let vt = map[&(c, r)];
            assert_relative_eq!(v, vt, epsilon = 1e-12 * v.abs().max(1.0));
            if r == c {
                assert!(v > 0.0);
            }
        }
    }

    #[test]
    fn test_face_current_values() {
        // sigma = 2 everywhere, phi = (0.25, 0.75) on the 2x1 mesh. The
        // interior face carries the harmonic flux -2; boundary faces see
        // the implicit zero ghost potential.
        let mesh = TensorMesh2D::new(GridDimensions2D(2, 1), CellSize2D(0.5, 1.0)).unwrap();
        let sigma = dvector![2.0, 2.0];
        let phi = dvector![0.25, 0.75];
        let j = face_current(&mesh, &sigma, &phi);
        let expected = dvector![-2.0, -2.0, 6.0, -1.0, -3.0, 1.0, 3.0];
        assert_relative_eq!(j, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_faces_to_cell_vectors() {
        let mesh = TensorMesh2D::new(GridDimensions2D(2, 1), CellSize2D(0.5, 1.0)).unwrap();
        let u = dvector![-2.0, -2.0, 6.0, -1.0, -3.0, 1.0, 3.0];
        let (ux, uy) = faces_to_cell_vectors(&mesh, &u);
        assert_relative_eq!(ux, dvector![-2.0, 2.0], epsilon = 1e-12);
        assert_relative_eq!(uy, dvector![0.0, 0.0], epsilon = 1e-12);
    }
}
