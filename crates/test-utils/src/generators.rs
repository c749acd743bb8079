//! Synthetic grid sources shaped like the real model outputs.
//!
//! Sample values follow a predictable pattern so tests can compute the
//! expected CSV text: the sample at flat index `i` (row-major over time,
//! latitude, longitude) is `i % 30000` raw for quantized variables and
//! `i * 0.5` for physical ones.

use extraction::{Encoding, GridShape, SourceKind};
use netcdf_parser::{AttrValue, GridValues, MemoryGridSource};

/// `_FillValue` of synthetic quantized variables.
pub const WAVE_FILL: i16 = -32767;
/// `scale_factor` of synthetic quantized variables.
pub const WAVE_SCALE: f32 = 0.01;
/// `_FillValue` of synthetic fill-only variables.
pub const CURRENT_FILL: f32 = -999.0;

/// Evenly spaced coordinate values.
///
/// # Example
///
/// ```
/// use test_utils::axis;
///
/// assert_eq!(axis(90.0, -0.25, 3), vec![90.0, 89.75, 89.5]);
/// ```
pub fn axis(start: f64, step: f64, len: usize) -> Vec<f64> {
    (0..len).map(|i| start + step * i as f64).collect()
}

/// Builder for a [`MemoryGridSource`] holding every variable of one layout.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticGrid {
    kind: SourceKind,
    shape: GridShape,
}

impl SyntheticGrid {
    pub fn new(kind: SourceKind, times: usize, latitudes: usize, longitudes: usize) -> Self {
        Self {
            kind,
            shape: GridShape::new(times, latitudes, longitudes),
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn latitudes(&self) -> Vec<f64> {
        match self.kind {
            SourceKind::Atmosphere => axis(90.0, -0.25, self.shape.latitudes),
            SourceKind::Wave | SourceKind::Current => axis(-80.0, 1.0 / 12.0, self.shape.latitudes),
        }
    }

    pub fn longitudes(&self) -> Vec<f64> {
        match self.kind {
            SourceKind::Atmosphere => axis(0.0, 0.25, self.shape.longitudes),
            SourceKind::Wave | SourceKind::Current => axis(-180.0, 1.0 / 12.0, self.shape.longitudes),
        }
    }

    pub fn build(&self) -> MemoryGridSource {
        let layout = self.kind.layout();
        let GridShape {
            times,
            latitudes,
            longitudes,
        } = self.shape;
        let cells = self.shape.cells();

        let mut source = MemoryGridSource::new()
            .with_axis(layout.latitude, self.latitudes())
            .with_axis(layout.longitude, self.longitudes());

        for spec in layout.variables {
            // Atmosphere surface pressure has no level axis; wave files have none at all
            let dims = if self.kind == SourceKind::Wave || spec.name == "sp" {
                vec![times, latitudes, longitudes]
            } else {
                vec![times, 1, latitudes, longitudes]
            };

            source = match spec.encoding {
                Encoding::Quantized => source.with_variable(
                    spec.name,
                    dims,
                    GridValues::I16((0..cells).map(|i| (i % 30000) as i16).collect()),
                    vec![
                        ("_FillValue", AttrValue::Short(WAVE_FILL)),
                        ("scale_factor", AttrValue::Float(WAVE_SCALE)),
                        ("add_offset", AttrValue::Float(0.0)),
                    ],
                ),
                Encoding::FillOnly => source.with_variable(
                    spec.name,
                    dims,
                    GridValues::F32((0..cells).map(|i| i as f32 * 0.5).collect()),
                    vec![("_FillValue", AttrValue::Float(CURRENT_FILL))],
                ),
                Encoding::Plain => source.with_variable(
                    spec.name,
                    dims,
                    GridValues::F32((0..cells).map(|i| i as f32 * 0.5).collect()),
                    Vec::new(),
                ),
            };
        }

        source
    }
}

/// Overwrite one stored sample of `variable`, in stored (raw) units.
///
/// Panics if the variable does not exist or the index is out of range.
pub fn poke(source: &mut MemoryGridSource, variable: &str, (t, y, x): (usize, usize, usize), raw: f64) {
    let var = source
        .variable_mut(variable)
        .unwrap_or_else(|| panic!("no variable {variable}"));

    let rank = var.shape.len();
    let (lats, lons) = (var.shape[rank - 2], var.shape[rank - 1]);
    let index = (t * lats + y) * lons + x;

    match &mut var.values {
        GridValues::I16(values) => values[index] = raw as i16,
        GridValues::F32(values) => values[index] = raw as f32,
        GridValues::F64(values) => values[index] = raw,
    }
}

/// Replace (or with `None`, drop) one attribute of `variable`.
pub fn set_attribute(source: &mut MemoryGridSource, variable: &str, name: &str, value: Option<AttrValue>) {
    let var = source
        .variable_mut(variable)
        .unwrap_or_else(|| panic!("no variable {variable}"));

    match value {
        Some(value) => var.attributes.insert(name, value),
        None => {
            var.attributes.remove(name);
        }
    }
}
