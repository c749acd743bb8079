//! Native NetCDF access using the netcdf library.
//!
//! The netcdf crate wraps libnetcdf/HDF5, so a [`NetCdfSource`] keeps the
//! underlying file handle open until it is dropped.

use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::source::{AttrValue, Attributes, GridOpener, GridSource, GridValues, GridVariable, ValueKind};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// Only needs to run once per process; [`NetCdfSource::open`] calls it.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// An open NetCDF file.
pub struct NetCdfSource {
    path: PathBuf,
    file: netcdf::File,
}

impl NetCdfSource {
    pub fn open(path: impl AsRef<Path>) -> NetCdfResult<Self> {
        silence_hdf5_errors();

        let path = path.as_ref();
        let file = netcdf::open(path).map_err(|e| NetCdfError::open(path, e.to_string()))?;
        debug!(path = %path.display(), "Opened NetCDF file");

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GridSource for NetCdfSource {
    fn read_variable(&self, name: &str, kind: ValueKind) -> NetCdfResult<GridVariable> {
        let var = self
            .file
            .variable(name)
            .ok_or_else(|| NetCdfError::VariableNotFound(name.to_string()))?;

        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        // libnetcdf converts from the stored type on read
        let values = match kind {
            ValueKind::I16 => GridValues::I16(
                var.get_values::<i16, _>(..)
                    .map_err(|e| NetCdfError::read(name, e.to_string()))?,
            ),
            ValueKind::F32 => GridValues::F32(
                var.get_values::<f32, _>(..)
                    .map_err(|e| NetCdfError::read(name, e.to_string()))?,
            ),
            ValueKind::F64 => GridValues::F64(
                var.get_values::<f64, _>(..)
                    .map_err(|e| NetCdfError::read(name, e.to_string()))?,
            ),
        };

        let attributes = read_attributes(&var);

        Ok(GridVariable {
            name: name.to_string(),
            shape,
            values,
            attributes,
        })
    }
}

/// Opens [`NetCdfSource`]s from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfOpener;

impl GridOpener for NetCdfOpener {
    fn open(&self, path: &Path) -> NetCdfResult<Box<dyn GridSource>> {
        Ok(Box::new(NetCdfSource::open(path)?))
    }
}

/// Collect the scalar attributes of a variable.
///
/// Attributes that fail to read or hold arrays of more than one element are
/// left out; the decoder reports the ones it needs as missing.
fn read_attributes(var: &netcdf::Variable) -> Attributes {
    var.attributes()
        .filter_map(|attr| {
            let value = attr.value().ok()?;
            Some((attr.name().to_string(), convert_attribute(value)?))
        })
        .collect()
}

fn convert_attribute(value: netcdf::AttributeValue) -> Option<AttrValue> {
    use netcdf::AttributeValue as V;

    match value {
        V::Schar(v) => Some(AttrValue::Short(i16::from(v))),
        V::Uchar(v) => Some(AttrValue::Short(i16::from(v))),
        V::Short(v) => Some(AttrValue::Short(v)),
        V::Ushort(v) => Some(AttrValue::Int(i32::from(v))),
        V::Int(v) => Some(AttrValue::Int(v)),
        V::Float(v) => Some(AttrValue::Float(v)),
        V::Double(v) => Some(AttrValue::Double(v)),
        V::Str(v) => Some(AttrValue::Text(v)),
        V::Shorts(v) if v.len() == 1 => Some(AttrValue::Short(v[0])),
        V::Ints(v) if v.len() == 1 => Some(AttrValue::Int(v[0])),
        V::Floats(v) if v.len() == 1 => Some(AttrValue::Float(v[0])),
        V::Doubles(v) if v.len() == 1 => Some(AttrValue::Double(v[0])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_fails() {
        let dir = std::env::temp_dir().join("netcdf_parser_missing_dir");
        let result = NetCdfSource::open(dir.join("does_not_exist.nc"));
        assert!(matches!(result, Err(NetCdfError::Open { .. })));
    }

    #[test]
    fn test_convert_scalar_attributes() {
        use netcdf::AttributeValue as V;

        assert_eq!(convert_attribute(V::Short(-32767)), Some(AttrValue::Short(-32767)));
        assert_eq!(convert_attribute(V::Floats(vec![0.01])), Some(AttrValue::Float(0.01)));
        assert_eq!(convert_attribute(V::Doubles(vec![1.0, 2.0])), None);
        assert_eq!(
            convert_attribute(V::Str("m s-1".to_string())),
            Some(AttrValue::Text("m s-1".to_string()))
        );
    }
}
