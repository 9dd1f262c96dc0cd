//! Renders the validation RMSE curve.

use std::path::Path;

use plotters::prelude::*;

use crate::prelude::*;

pub fn render(history: &[f64], path: &Path) -> Result {
    let max_rmse = history.iter().copied().fold(f64::EPSILON, f64::max);
    let last_epoch = history.len().saturating_sub(1).max(1) as u32;

    let root = BitMapBackend::new(path, (640, 480)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|error| anyhow!("failed to fill the chart area: {error}"))?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(0..last_epoch, 0.0..max_rmse)
        .map_err(|error| anyhow!("failed to build the chart: {error}"))?;
    chart
        .configure_mesh()
        .x_desc("EPOCH")
        .y_desc("ValidSet RMSE")
        .draw()
        .map_err(|error| anyhow!("failed to draw the mesh: {error}"))?;
    chart
        .draw_series(LineSeries::new(
            history
                .iter()
                .enumerate()
                .map(|(epoch, rmse)| (epoch as u32, *rmse)),
            &BLUE,
        ))
        .map_err(|error| anyhow!("failed to draw the series: {error}"))?;
    root.present()
        .map_err(|error| anyhow!("failed to write `{}`: {error}", path.display()))
}
