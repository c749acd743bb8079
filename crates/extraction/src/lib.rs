//! Extraction of gridded model output into flat CSV files.
//!
//! A [`GridJob`] names one input file and the artifact to produce from it.
//! [`run_job`] opens the input through a [`netcdf_parser::GridOpener`],
//! decodes every variable its [`SourceLayout`] requires into a
//! [`GridDataset`], streams the rows to CSV and optionally zips the result.
//!
//! # Example
//!
//! ```ignore
//! use extraction::{run_job, GridJob, SourceKind};
//! use netcdf_parser::NetCdfOpener;
//!
//! let job = GridJob::new(SourceKind::Wave, timestamp, input, output, Some(compressed));
//! let report = run_job(&job, &NetCdfOpener)?;
//! println!("{} rows -> {}", report.rows, report.artifact.display());
//! ```

pub mod dataset;
pub mod decoder;
pub mod error;
pub mod finalize;
pub mod job;
pub mod layout;
pub mod pipeline;
pub mod render;

pub use dataset::GridDataset;
pub use decoder::{decode_variable, dequantize, read_axis, DecodedVariable, Quantization, Samples};
pub use error::{ExtractionError, Result};
pub use finalize::finalize;
pub use job::{GridJob, JobReport};
pub use layout::{
    Encoding, GridShape, SourceKind, SourceLayout, Strides, VariableSpec, ATMOSPHERE, CURRENT, WAVE,
};
pub use pipeline::run_job;
pub use render::{header, render_file, render_to, Row, Rows, MISSING_TOKEN, TIMESTAMP_FORMAT};
