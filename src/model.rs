use nalgebra::DVector;

use crate::domain::mesh::TensorMesh2D;
use crate::error::SimulationError;

/// Axis-aligned rectangular anomaly, bounds inclusive on all four sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockRegion {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for BlockRegion {
    fn default() -> Self {
        Self {
            x_min: 0.4,
            x_max: 0.6,
            y_min: 0.4,
            y_max: 0.6,
        }
    }
}

impl BlockRegion {
    /// Inclusion test with exact comparisons, no tolerance.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

/// Current injection and extraction locations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectrodePair {
    pub source: (f64, f64),
    pub sink: (f64, f64),
}

impl Default for ElectrodePair {
    fn default() -> Self {
        Self {
            source: (0.2, 0.5),
            sink: (0.8, 0.5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceTerm {
    pub q: DVector<f64>,
    pub source_cell: usize,
    pub sink_cell: usize,
}

/// Per-cell conductivity: `10^log_sigma_background` everywhere, overwritten
/// with `10^log_sigma_block` on cells whose center falls inside `block`.
///
/// Inputs are log-conductivities and are assumed finite; the caller
/// validates them before building the model.
pub fn conductivity_model(
    mesh: &TensorMesh2D,
    log_sigma_background: f64,
    log_sigma_block: f64,
    block: &BlockRegion,
) -> DVector<f64> {
    let sigma_background = 10f64.powf(log_sigma_background);
    let sigma_block = 10f64.powf(log_sigma_block);

    let mut sigma = DVector::from_element(mesh.n_cells(), sigma_background);
    for k in 0..mesh.n_cells() {
        let (x, y) = mesh.cell_center(k);
        if block.contains(x, y) {
            sigma[k] = sigma_block;
        }
    }
    sigma
}

/// Unit dipole source: `+1` at the cell nearest the source electrode, `-1`
/// at the cell nearest the sink, zero elsewhere. The two cells must be
/// distinct so the injected current sums to zero.
pub fn source_term(
    mesh: &TensorMesh2D,
    electrodes: &ElectrodePair,
) -> Result<SourceTerm, SimulationError> {
    let source_cell = mesh.closest_cell_index(electrodes.source.0, electrodes.source.1);
    let sink_cell = mesh.closest_cell_index(electrodes.sink.0, electrodes.sink.1);
    if source_cell == sink_cell {
        return Err(SimulationError::InvalidArgument(format!(
            "Electrode locations {:?} and {:?} resolve to the same cell {} at this resolution",
            electrodes.source, electrodes.sink, source_cell
        )));
    }

    let mut q = DVector::zeros(mesh.n_cells());
    q[source_cell] = 1.0;
    q[sink_cell] = -1.0;
    Ok(SourceTerm {
        q,
        source_cell,
        sink_cell,
    })
}
