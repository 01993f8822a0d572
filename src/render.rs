use plotters::prelude::*;
use std::path::Path;

use nalgebra::DVector;

use crate::domain::mesh::TensorMesh2D;

/// Figure sizing, passed explicitly into every render call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
        }
    }
}

/// Map a value to a blue-white-red colour over the frame-local range:
/// min maps to blue, the midpoint to white, max to red.
fn field_color(value: f64, min_value: f64, max_value: f64) -> RGBColor {
    let span = max_value - min_value;
    let scale = max_value.abs().max(min_value.abs()).max(1.0);
    let x = if !value.is_finite() || !span.is_finite() || span <= 1e-12 * scale {
        0.5
    } else {
        ((value - min_value) / span).clamp(0.0, 1.0)
    };

    if x < 0.5 {
        let t = 2.0 * x;
        RGBColor((255.0 * t) as u8, (255.0 * t) as u8, 255)
    } else {
        let t = 2.0 * (1.0 - x);
        RGBColor(255, (255.0 * t) as u8, (255.0 * t) as u8)
    }
}

// Frame-local range over the finite entries; stays infinite when there
// are none, which field_color treats as a degenerate range.
fn finite_min_max<I: Iterator<Item = f64>>(values: I) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        if v.is_finite() {
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
    }
    (lo, hi)
}

/// Render the conductivity model as a per-cell heatmap with white
/// triangle markers on the electrode cells: down-pointing at the source,
/// up-pointing at the sink.
pub fn plot_conductivity(
    mesh: &TensorMesh2D,
    sigma: &DVector<f64>,
    source_cell: usize,
    sink_cell: usize,
    config: &RenderConfig,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (lo, hi) = finite_min_max(sigma.iter().copied());
    let root = BitMapBackend::new(output, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = scalar_chart(&root, mesh, "electrical conductivity, sigma")?;
    draw_cells(&mut chart, mesh, sigma, lo, hi)?;

    let (dx, dy) = (mesh.cell_size.0, mesh.cell_size.1);
    let (hw, hh) = (1.5 * dx, 1.5 * dy);
    let (sx, sy) = mesh.cell_center(source_cell);
    chart.draw_series(std::iter::once(Polygon::new(
        vec![(sx - hw, sy + hh), (sx + hw, sy + hh), (sx, sy - hh)],
        WHITE.filled(),
    )))?;
    let (kx, ky) = mesh.cell_center(sink_cell);
    chart.draw_series(std::iter::once(Polygon::new(
        vec![(kx - hw, ky - hh), (kx + hw, ky - hh), (kx, ky + hh)],
        WHITE.filled(),
    )))?;

    draw_range_annotation(&mut chart, mesh, "sigma", lo, hi)?;
    root.present()?;
    Ok(())
}

/// Render the electric potential as a per-cell heatmap.
pub fn plot_potential(
    mesh: &TensorMesh2D,
    phi: &DVector<f64>,
    config: &RenderConfig,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (lo, hi) = finite_min_max(phi.iter().copied());
    let root = BitMapBackend::new(output, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = scalar_chart(&root, mesh, "Electric Potential, phi")?;
    draw_cells(&mut chart, mesh, phi, lo, hi)?;
    draw_range_annotation(&mut chart, mesh, "phi", lo, hi)?;
    root.present()?;
    Ok(())
}

/// Render the cell-averaged current density: magnitude heatmap plus white
/// direction segments (dot at the head) on a coarse stride, with segment
/// length scaled by the local magnitude.
pub fn plot_current(
    mesh: &TensorMesh2D,
    jx: &DVector<f64>,
    jy: &DVector<f64>,
    config: &RenderConfig,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let magnitude = DVector::from_fn(mesh.n_cells(), |k, _| jx[k].hypot(jy[k]));
    let (lo, hi) = finite_min_max(magnitude.iter().copied());

    let root = BitMapBackend::new(output, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = scalar_chart(&root, mesh, "Current, j")?;
    draw_cells(&mut chart, mesh, &magnitude, lo, hi)?;

    let nx = mesh.dimensions.0;
    let ny = mesh.dimensions.1;
    let stride = (nx.max(ny) / 20).max(1);
    let mut segments = Vec::new();
    let mut heads = Vec::new();
    for iy in (stride / 2..ny).step_by(stride) {
        for ix in (stride / 2..nx).step_by(stride) {
            let k = mesh.cell_index(ix, iy);
            let m = magnitude[k];
            if !(m > 0.0) || !m.is_finite() || !(hi > 0.0) {
                continue;
            }
            let (cx, cy) = mesh.cell_center(k);
            let length = 0.9 * stride as f64 * mesh.cell_size.0 * (m / hi);
            let (ux, uy) = (jx[k] / m, jy[k] / m);
            let tail = (cx - 0.5 * length * ux, cy - 0.5 * length * uy);
            let head = (cx + 0.5 * length * ux, cy + 0.5 * length * uy);
            segments.push(PathElement::new(vec![tail, head], &WHITE));
            heads.push(Circle::new(head, 2, WHITE.filled()));
        }
    }
    chart.draw_series(segments)?;
    chart.draw_series(heads)?;

    draw_range_annotation(&mut chart, mesh, "|j|", lo, hi)?;
    root.present()?;
    Ok(())
}

type Chart2D<'a, 'b> = ChartContext<
    'a,
    BitMapBackend<'b>,
    Cartesian2d<plotters::coord::types::RangedCoordf64, plotters::coord::types::RangedCoordf64>,
>;

fn scalar_chart<'a, 'b>(
    root: &'a DrawingArea<BitMapBackend<'b>, plotters::coord::Shift>,
    mesh: &TensorMesh2D,
    title: &str,
) -> Result<Chart2D<'a, 'b>, Box<dyn std::error::Error>> {
    let extent_x = mesh.dimensions.0 as f64 * mesh.cell_size.0;
    let extent_y = mesh.dimensions.1 as f64 * mesh.cell_size.1;
    let mut chart = ChartBuilder::on(root)
        .margin(40)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(0.0..extent_x, 0.0..extent_y)?;

    chart
        .configure_mesh()
        .x_desc("x")
        .y_desc("y")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;
    Ok(chart)
}

// One coloured rectangle per cell, like an image plot.
fn draw_cells(
    chart: &mut Chart2D<'_, '_>,
    mesh: &TensorMesh2D,
    values: &DVector<f64>,
    lo: f64,
    hi: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let nx = mesh.dimensions.0;
    let ny = mesh.dimensions.1;
    let (dx, dy) = (mesh.cell_size.0, mesh.cell_size.1);
    chart.draw_series((0..nx).flat_map(|ix| {
        (0..ny).map(move |iy| {
            let k = ix + iy * nx;
            let color = field_color(values[k], lo, hi);
            let x0 = ix as f64 * dx;
            let y0 = iy as f64 * dy;
            Rectangle::new([(x0, y0), (x0 + dx, y0 + dy)], color.filled())
        })
    }))?;
    Ok(())
}

// The colour-range annotation stands in for a colorbar.
fn draw_range_annotation(
    chart: &mut Chart2D<'_, '_>,
    mesh: &TensorMesh2D,
    name: &str,
    lo: f64,
    hi: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let extent_x = mesh.dimensions.0 as f64 * mesh.cell_size.0;
    let extent_y = mesh.dimensions.1 as f64 * mesh.cell_size.1;
    chart.draw_series(std::iter::once(Text::new(
        format!("{} in [{:.3e}, {:.3e}] (blue = min, white = mid, red = max)", name, lo, hi),
        (0.02 * extent_x, 0.97 * extent_y),
        ("sans-serif", 15),
    )))?;
    Ok(())
}
