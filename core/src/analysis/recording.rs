use ndarray::Array1;
use ndarray_stats::QuantileExt;
use slog::{info, warn, Logger};

/// One row as it came out of the loader, before anything was parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    pub time: String,
    pub voltage: String,
}

impl RawSample {
    pub fn new(time: impl Into<String>, voltage: impl Into<String>) -> Self {
        RawSample {
            time: time.into(),
            voltage: voltage.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub voltage: f64,
}

/// An ordered, fully numeric single-channel recording.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recording {
    samples: Vec<Sample>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageExtremes {
    pub max: f64,
    pub min: f64,
}

impl VoltageExtremes {
    pub fn as_tuple(&self) -> (f64, f64) {
        (self.max, self.min)
    }
}

impl Recording {
    pub fn new(samples: Vec<Sample>) -> Self {
        Recording { samples }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Recording {
            samples: pairs
                .into_iter()
                .map(|(time, voltage)| Sample { time, voltage })
                .collect(),
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn times(&self) -> Array1<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn voltages(&self) -> Array1<f64> {
        self.samples.iter().map(|s| s.voltage).collect()
    }

    pub fn mean_voltage(&self) -> Option<f64> {
        self.voltages().mean()
    }

    /// Max and min voltage. An empty recording reports `(0, 0)`.
    pub fn extremes(&self) -> VoltageExtremes {
        let voltages = self.voltages();
        match (voltages.max(), voltages.min()) {
            (Ok(&max), Ok(&min)) => VoltageExtremes { max, min },
            _ => VoltageExtremes { max: 0.0, min: 0.0 },
        }
    }

    /// Time spanned by the recording, measured from its second sample to
    /// its last one. Shorter recordings have no duration.
    pub fn duration(&self) -> f64 {
        match (self.samples.get(1), self.samples.last()) {
            (Some(second), Some(last)) => last.time - second.time,
            _ => 0.0,
        }
    }
}

fn parse_field(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Casts raw rows to numbers, dropping every row where either field does
/// not parse to a finite real. Returns the recording and the drop count.
pub fn validate(rows: &[RawSample], log: &Logger) -> (Recording, usize) {
    let mut samples = Vec::with_capacity(rows.len());
    let mut dropped = 0;

    for (row, raw) in rows.iter().enumerate() {
        match (parse_field(&raw.time), parse_field(&raw.voltage)) {
            (Some(time), Some(voltage)) => samples.push(Sample { time, voltage }),
            _ => {
                dropped += 1;
                warn!(log, "dropping malformed sample";
                    "row" => row, "time" => &raw.time, "voltage" => &raw.voltage);
            }
        }
    }

    if dropped > 0 {
        info!(log, "validation finished"; "kept" => samples.len(), "dropped" => dropped);
    }

    (Recording { samples }, dropped)
}
