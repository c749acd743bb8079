//! Variable decoding.
//!
//! Quantized variables are kept as their raw `i16` samples; the physical value
//! is computed per cell at render time with [`dequantize`] so a second
//! full-size float array is never materialized.

use netcdf_parser::{Attributes, GridSource, GridValues, ValueKind};
use tracing::trace;

use crate::error::{ExtractionError, Result};
use crate::layout::{
    Encoding, GridShape, VariableSpec, ADD_OFFSET_ATTR, FILL_VALUE_ATTR, SCALE_FACTOR_ATTR,
};

/// Convert a packed sample to its physical value.
#[inline]
pub fn dequantize(raw: i16, scale: f32, offset: f32) -> f32 {
    f32::from(raw) * scale + offset
}

/// Fill/scale/offset triad of one quantized variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantization {
    pub fill: i16,
    pub scale: f32,
    pub offset: f32,
}

impl Quantization {
    /// Physical value, or `None` when the raw sample is the fill value.
    #[inline]
    pub fn decode(&self, raw: i16) -> Option<f32> {
        if raw == self.fill {
            None
        } else {
            Some(dequantize(raw, self.scale, self.offset))
        }
    }
}

/// Samples of one variable, as stored.
#[derive(Debug, Clone)]
pub enum Samples {
    Quantized {
        raw: Vec<i16>,
        quantization: Quantization,
    },
    Physical {
        values: Vec<f32>,
        fill: Option<f32>,
    },
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Quantized { raw, .. } => raw.len(),
            Samples::Physical { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn value(&self, index: usize) -> Option<f32> {
        match self {
            Samples::Quantized { raw, quantization } => quantization.decode(raw[index]),
            Samples::Physical { values, fill } => {
                let value = values[index];
                match fill {
                    Some(fill) if value == *fill => None,
                    _ => Some(value),
                }
            }
        }
    }
}

/// A decoded variable with the optional level axis collapsed.
#[derive(Debug, Clone)]
pub struct DecodedVariable {
    pub spec: VariableSpec,
    pub shape: GridShape,
    pub samples: Samples,
}

impl DecodedVariable {
    /// Physical value at `(time, lat, lon)`, `None` if missing.
    ///
    /// Panics if an index is outside [`Self::shape`].
    #[inline]
    pub fn value_at(&self, time: usize, lat: usize, lon: usize) -> Option<f32> {
        let index = (time * self.shape.latitudes + lat) * self.shape.longitudes + lon;
        self.samples.value(index)
    }
}

/// Read a 1-D coordinate variable as `f64`.
pub fn read_axis(source: &dyn GridSource, name: &str) -> Result<Vec<f64>> {
    let var = source
        .read_variable(name, ValueKind::F64)
        .map_err(|e| ExtractionError::from_read(name, e))?;

    if var.shape.len() != 1 {
        return Err(ExtractionError::invalid_variable(
            name,
            format!("coordinate must be 1-D, got shape {:?}", var.shape),
        ));
    }

    match var.values.convert(ValueKind::F64) {
        GridValues::F64(values) => Ok(values),
        other => Err(ExtractionError::invalid_variable(
            name,
            format!("coordinate read as {:?}", other.kind()),
        )),
    }
}

/// Read one physical variable and its encoding attributes.
pub fn decode_variable(source: &dyn GridSource, spec: &VariableSpec) -> Result<DecodedVariable> {
    let kind = match spec.encoding {
        Encoding::Quantized => ValueKind::I16,
        Encoding::FillOnly | Encoding::Plain => ValueKind::F32,
    };

    let var = source
        .read_variable(spec.name, kind)
        .map_err(|e| ExtractionError::from_read(spec.name, e))?;

    let shape = grid_shape(spec.name, &var.shape)?;
    if var.values.len() != shape.cells() {
        return Err(ExtractionError::invalid_variable(
            spec.name,
            format!(
                "expected {} values for shape {:?}, got {}",
                shape.cells(),
                var.shape,
                var.values.len()
            ),
        ));
    }

    let samples = match (spec.encoding, var.values) {
        (Encoding::Quantized, GridValues::I16(raw)) => Samples::Quantized {
            raw,
            quantization: quantization(spec.name, &var.attributes)?,
        },
        (Encoding::FillOnly, GridValues::F32(values)) => Samples::Physical {
            values,
            fill: Some(required_f32(spec.name, &var.attributes, FILL_VALUE_ATTR)?),
        },
        (Encoding::Plain, GridValues::F32(values)) => Samples::Physical {
            values,
            fill: optional_f32(spec.name, &var.attributes, FILL_VALUE_ATTR)?,
        },
        (_, other) => {
            return Err(ExtractionError::invalid_variable(
                spec.name,
                format!("source returned {:?} values, requested {:?}", other.kind(), kind),
            ))
        }
    };

    trace!(variable = spec.name, ?shape, "Decoded variable");

    Ok(DecodedVariable {
        spec: *spec,
        shape,
        samples,
    })
}

/// `[time][lat][lon]` or `[time][level=1][lat][lon]`.
fn grid_shape(name: &str, dims: &[usize]) -> Result<GridShape> {
    match *dims {
        [times, latitudes, longitudes] => Ok(GridShape::new(times, latitudes, longitudes)),
        [times, 1, latitudes, longitudes] => Ok(GridShape::new(times, latitudes, longitudes)),
        [_, levels, _, _] => Err(ExtractionError::invalid_variable(
            name,
            format!("level dimension must have size 1, got {levels}"),
        )),
        _ => Err(ExtractionError::invalid_variable(
            name,
            format!("expected 3 or 4 dimensions, got shape {dims:?}"),
        )),
    }
}

fn quantization(name: &str, attributes: &Attributes) -> Result<Quantization> {
    let fill = attributes
        .get(FILL_VALUE_ATTR)
        .ok_or_else(|| ExtractionError::missing_attribute(name, FILL_VALUE_ATTR))?;
    let fill = fill.as_i16().ok_or_else(|| {
        ExtractionError::invalid_variable(name, format!("{FILL_VALUE_ATTR} {fill:?} is not an i16"))
    })?;

    Ok(Quantization {
        fill,
        scale: required_f32(name, attributes, SCALE_FACTOR_ATTR)?,
        offset: required_f32(name, attributes, ADD_OFFSET_ATTR)?,
    })
}

fn required_f32(name: &str, attributes: &Attributes, attribute: &str) -> Result<f32> {
    optional_f32(name, attributes, attribute)?
        .ok_or_else(|| ExtractionError::missing_attribute(name, attribute))
}

fn optional_f32(name: &str, attributes: &Attributes, attribute: &str) -> Result<Option<f32>> {
    match attributes.get(attribute) {
        None => Ok(None),
        Some(value) => value.as_f32().map(Some).ok_or_else(|| {
            ExtractionError::invalid_variable(name, format!("{attribute} {value:?} is not numeric"))
        }),
    }
}
