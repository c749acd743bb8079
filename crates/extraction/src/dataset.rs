//! Decoded contents of one input file.

use netcdf_parser::GridSource;
use tracing::{debug, warn};

use crate::decoder::{decode_variable, read_axis, DecodedVariable};
use crate::error::{ExtractionError, Result};
use crate::layout::{GridShape, SourceLayout};

/// Coordinate axes plus every physical variable a layout requires.
///
/// Only ever constructed complete: [`GridDataset::decode`] fails on the first
/// variable or attribute it cannot resolve.
#[derive(Debug)]
pub struct GridDataset {
    layout: &'static SourceLayout,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    shape: GridShape,
    variables: Vec<DecodedVariable>,
}

impl GridDataset {
    /// Decode the axes and then each variable in table order.
    pub fn decode(source: &dyn GridSource, layout: &'static SourceLayout) -> Result<Self> {
        let latitudes = read_axis(source, layout.latitude)?;
        let longitudes = read_axis(source, layout.longitude)?;

        let mut times = None;
        let mut variables = Vec::with_capacity(layout.variables.len());

        for spec in layout.variables {
            let var = decode_variable(source, spec)?;

            if var.shape.latitudes != latitudes.len() || var.shape.longitudes != longitudes.len() {
                return Err(ExtractionError::invalid_variable(
                    spec.name,
                    format!(
                        "grid is {}x{}, axes are {}x{}",
                        var.shape.latitudes,
                        var.shape.longitudes,
                        latitudes.len(),
                        longitudes.len()
                    ),
                ));
            }

            match times {
                None => times = Some(var.shape.times),
                Some(t) if t != var.shape.times => {
                    return Err(ExtractionError::invalid_variable(
                        spec.name,
                        format!("has {} time slices, expected {t}", var.shape.times),
                    ));
                }
                Some(_) => {}
            }

            variables.push(var);
        }

        let mut shape = GridShape::new(times.unwrap_or(0), latitudes.len(), longitudes.len());
        if shape != layout.nominal {
            warn!(
                source = %layout.kind,
                ?shape,
                nominal = ?layout.nominal,
                "Grid extent differs from the model's usual shape"
            );
        }

        if let Some(max) = layout.max_slices() {
            if shape.times > max {
                warn!(
                    source = %layout.kind,
                    times = shape.times,
                    kept = max,
                    "Extra time slices ignored"
                );
                shape.times = max;
            }
        }

        debug!(source = %layout.kind, ?shape, variables = variables.len(), "Decoded dataset");

        Ok(Self {
            layout,
            latitudes,
            longitudes,
            shape,
            variables,
        })
    }

    pub fn layout(&self) -> &'static SourceLayout {
        self.layout
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    /// Variables in column order.
    pub fn variables(&self) -> &[DecodedVariable] {
        &self.variables
    }

    /// Number of rows the renderer will emit.
    pub fn row_count(&self) -> usize {
        self.layout.strides.row_count(self.shape)
    }
}
