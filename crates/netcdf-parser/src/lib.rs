//! Grid source handles for gridded model output.
//!
//! This crate exposes NetCDF files as a [`GridSource`]: named variables with
//! their flattened values, shape and scalar attributes. It does no decoding
//! of its own; packed integers come back raw so callers can apply the
//! `_FillValue` / `scale_factor` / `add_offset` convention themselves.
//!
//! # Implementations
//!
//! - [`NetCdfSource`] reads files through the native `netcdf` library
//!   (libnetcdf + HDF5). System requirements: libhdf5-dev libnetcdf-dev.
//! - [`MemoryGridSource`] keeps variables in memory, for synthetic grids.

pub mod error;
pub mod memory;
pub mod native;
pub mod source;

pub use error::{NetCdfError, NetCdfResult};
pub use memory::{MemoryGridSource, MemoryOpener};
pub use native::{silence_hdf5_errors, NetCdfOpener, NetCdfSource};
pub use source::{AttrValue, Attributes, GridOpener, GridSource, GridValues, GridVariable, ValueKind};
