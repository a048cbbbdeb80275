use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::ArrayView1;
use plotters::prelude::*;

use super::padding::PaddedRecording;
use super::{Detection, DetectionMethod, Plotter};

fn bounds<'a>(series: impl IntoIterator<Item = &'a f64>) -> (f64, f64) {
    let (min, max) = series
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        (-1.0, 1.0)
    } else if min == max {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}

/// Voltage and envelope over time with the detected peaks circled. Envelope
/// peaks sit on the envelope, threshold peaks on the voltage trace.
pub fn plot_detection(
    padded: &PaddedRecording,
    envelope: ArrayView1<f64>,
    detection: &Detection,
    title: &str,
    file_path: &Path,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(file_path, (1280, 480)).into_drawing_area();
    root.fill(&WHITE)?;

    let time = padded.time();
    let voltage = padded.voltage();
    let (t_min, t_max) = bounds(time.iter());
    let (v_min, v_max) = bounds(voltage.iter().chain(envelope.iter()));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(t_min..t_max, v_min..v_max)?;

    chart.configure_mesh().x_desc("time [s]").draw()?;

    chart
        .draw_series(LineSeries::new(
            time.iter().zip(voltage.iter()).map(|(&t, &v)| (t, v)),
            &BLUE,
        ))?
        .label("voltage")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .draw_series(LineSeries::new(
            time.iter()
                .zip(envelope.iter())
                .filter(|(_, e)| e.is_finite())
                .map(|(&t, &e)| (t, e)),
            &GREEN,
        ))?
        .label("envelope")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &GREEN));

    chart.draw_series(detection.peaks.iter().map(|peak| {
        let y = match detection.method {
            DetectionMethod::Envelope => envelope.get(peak.index).copied().unwrap_or(peak.value),
            DetectionMethod::Threshold => padded.voltage_at(peak.index),
        };
        Circle::new((peak.time, y), 5, RED.filled())
    }))?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// A [`Plotter`] writing `<label stem>.png` into `dir`.
pub fn png_plotter(dir: impl Into<PathBuf>) -> Plotter {
    let dir = dir.into();
    Box::new(
        move |padded: &PaddedRecording, envelope: ArrayView1<f64>, detection: &Detection, label: &str| {
            fs::create_dir_all(&dir)?;
            let stem = Path::new(label)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "recording".to_string());
            let title = format!("{label} ({} beats)", detection.peaks.len());
            plot_detection(
                padded,
                envelope,
                detection,
                &title,
                &dir.join(format!("{stem}.png")),
            )
        },
    )
}
