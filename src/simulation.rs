use std::path::Path;
use std::time::Instant;

use nalgebra::DVector;
use tracing::{info, info_span, warn};

use crate::domain::mesh::TensorMesh2D;
use crate::error::SimulationError;
use crate::model::{conductivity_model, source_term, BlockRegion, ElectrodePair, SourceTerm};
use crate::operators::{assemble_system, face_current, faces_to_cell_vectors};
use crate::render::{plot_conductivity, plot_current, plot_potential, RenderConfig};
use crate::solver::solve_direct;

/// Cells per axis of the unit-square simulation mesh.
pub const MESH_CELLS_PER_AXIS: usize = 100;

/// Which field of the forward simulation to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Conductivity,
    Potential,
    Current,
}

impl PlotKind {
    pub fn name(self) -> &'static str {
        match self {
            PlotKind::Conductivity => "conductivity",
            PlotKind::Potential => "potential",
            PlotKind::Current => "current",
        }
    }
}

impl std::str::FromStr for PlotKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conductivity" => Ok(PlotKind::Conductivity),
            "potential" => Ok(PlotKind::Potential),
            "current" => Ok(PlotKind::Current),
            other => Err(SimulationError::InvalidArgument(format!(
                "unrecognized plot type '{}', expected conductivity, potential, or current",
                other
            ))),
        }
    }
}

/// Assemble the mixed-formulation system for the given conductivity and
/// solve it for the cell-centered potential.
pub fn solve_potential(
    mesh: &TensorMesh2D,
    sigma: &DVector<f64>,
    source: &SourceTerm,
) -> Result<DVector<f64>, SimulationError> {
    let a = assemble_system(mesh, sigma);
    info!(
        "Assembled {}x{} system with {} nonzeros",
        a.m,
        a.n,
        a.p[a.n]
    );

    let solve_start = Instant::now();
    let phi = solve_direct(&a, &source.q)?;
    info!(
        "Direct solve finished in {:.2}ms",
        solve_start.elapsed().as_secs_f64() * 1e3
    );
    Ok(phi)
}

/// Run the DC resistivity forward simulation and render the requested view
/// to `output` as a PNG.
///
/// The model is fixed: a unit square meshed at 100x100 cells, a conductive
/// block over [0.4, 0.6] x [0.4, 0.6] in a homogeneous background, and a
/// +1/-1 electrode pair at (0.2, 0.5) and (0.8, 0.5). The two log10
/// conductivities select the background and block values. The conductivity
/// view renders the model directly and never assembles or solves the
/// system; the potential and current views do.
pub fn run(
    log_sigma_background: f64,
    log_sigma_block: f64,
    plot: PlotKind,
    config: &RenderConfig,
    output: &Path,
) -> Result<(), SimulationError> {
    let run_span = info_span!("forward_simulation", plot = plot.name()).entered();

    if !log_sigma_background.is_finite() || !log_sigma_block.is_finite() {
        return Err(SimulationError::InvalidArgument(format!(
            "log conductivities must be finite, got background={} block={}",
            log_sigma_background, log_sigma_block
        )));
    }

    let start = Instant::now();

    // --- Mesh, conductivity model, and source term ---
    let mesh = TensorMesh2D::unit_square(MESH_CELLS_PER_AXIS)
        .map_err(|e| SimulationError::MeshConstruction(e.to_string()))?;
    let sigma = conductivity_model(
        &mesh,
        log_sigma_background,
        log_sigma_block,
        &BlockRegion::default(),
    );
    let st = source_term(&mesh, &ElectrodePair::default())?;
    info!(
        "Built {} cell / {} face mesh, injecting +1/-1 at cells {} and {}",
        mesh.n_cells(),
        mesh.n_faces(),
        st.source_cell,
        st.sink_cell
    );

    // --- Solve where the view needs it, then render ---
    match plot {
        PlotKind::Conductivity => {
            plot_conductivity(&mesh, &sigma, st.source_cell, st.sink_cell, config, output)
                .map_err(|e| rendering_failure(output, e))?;
        }
        PlotKind::Potential => {
            let phi = solve_potential(&mesh, &sigma, &st)?;
            plot_potential(&mesh, &phi, config, output)
                .map_err(|e| rendering_failure(output, e))?;
        }
        PlotKind::Current => {
            let phi = solve_potential(&mesh, &sigma, &st)?;
            let j = face_current(&mesh, &sigma, &phi);
            let (jx, jy) = faces_to_cell_vectors(&mesh, &j);
            plot_current(&mesh, &jx, &jy, config, output)
                .map_err(|e| rendering_failure(output, e))?;
        }
    }

    info!(
        "Wrote {} view to {} in {:.2}s",
        plot.name(),
        output.display(),
        start.elapsed().as_secs_f64()
    );
    drop(run_span);
    Ok(())
}

fn rendering_failure(output: &Path, e: Box<dyn std::error::Error>) -> SimulationError {
    let error_msg = format!("writing {}: {}", output.display(), e);
    warn!(%error_msg, "Rendering failed");
    SimulationError::Rendering(error_msg)
}
