//! In-memory grid sources.
//!
//! Used for synthetic grids in tests and for exercising extraction without a
//! libnetcdf-readable file on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{NetCdfError, NetCdfResult};
use crate::source::{AttrValue, Attributes, GridOpener, GridSource, GridValues, GridVariable, ValueKind};

/// A grid source holding its variables in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryGridSource {
    variables: HashMap<String, GridVariable>,
}

impl MemoryGridSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a variable.
    pub fn with_variable(
        mut self,
        name: &str,
        shape: Vec<usize>,
        values: GridValues,
        attributes: Vec<(&str, AttrValue)>,
    ) -> Self {
        self.insert(name, shape, values, attributes.into_iter().collect());
        self
    }

    /// Add a 1-D coordinate variable.
    pub fn with_axis(self, name: &str, values: Vec<f64>) -> Self {
        let len = values.len();
        self.with_variable(name, vec![len], GridValues::F64(values), Vec::new())
    }

    pub fn insert(&mut self, name: &str, shape: Vec<usize>, values: GridValues, attributes: Attributes) {
        self.variables.insert(
            name.to_string(),
            GridVariable {
                name: name.to_string(),
                shape,
                values,
                attributes,
            },
        );
    }

    pub fn remove(&mut self, name: &str) -> Option<GridVariable> {
        self.variables.remove(name)
    }

    /// Mutable access, e.g. to drop an attribute or poke a sample.
    pub fn variable_mut(&mut self, name: &str) -> Option<&mut GridVariable> {
        self.variables.get_mut(name)
    }
}

impl GridSource for MemoryGridSource {
    fn read_variable(&self, name: &str, kind: ValueKind) -> NetCdfResult<GridVariable> {
        let var = self
            .variables
            .get(name)
            .ok_or_else(|| NetCdfError::VariableNotFound(name.to_string()))?;

        Ok(GridVariable {
            values: var.values.clone().convert(kind),
            ..var.clone()
        })
    }
}

/// Serves registered in-memory sources by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    sources: HashMap<PathBuf, Arc<MemoryGridSource>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl Into<PathBuf>, source: MemoryGridSource) {
        self.sources.insert(path.into(), Arc::new(source));
    }
}

struct SharedSource(Arc<MemoryGridSource>);

impl GridSource for SharedSource {
    fn read_variable(&self, name: &str, kind: ValueKind) -> NetCdfResult<GridVariable> {
        self.0.read_variable(name, kind)
    }
}

impl GridOpener for MemoryOpener {
    fn open(&self, path: &Path) -> NetCdfResult<Box<dyn GridSource>> {
        let source = self
            .sources
            .get(path)
            .ok_or_else(|| NetCdfError::open(path, "no in-memory grid registered"))?;
        Ok(Box::new(SharedSource(Arc::clone(source))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryGridSource {
        MemoryGridSource::new()
            .with_axis("latitude", vec![10.0, 20.0])
            .with_variable(
                "VHM0",
                vec![1, 2, 1],
                GridValues::I16(vec![250, -32767]),
                vec![
                    ("_FillValue", AttrValue::Short(-32767)),
                    ("scale_factor", AttrValue::Float(0.01)),
                ],
            )
    }

    #[test]
    fn test_read_variable_with_attributes() {
        let var = sample().read_variable("VHM0", ValueKind::I16).unwrap();
        assert_eq!(var.shape, vec![1, 2, 1]);
        assert_eq!(var.values, GridValues::I16(vec![250, -32767]));
        assert_eq!(var.attributes.get("_FillValue"), Some(&AttrValue::Short(-32767)));
        assert!(!var.attributes.contains("add_offset"));
    }

    #[test]
    fn test_read_converts_kind() {
        let var = sample().read_variable("latitude", ValueKind::F32).unwrap();
        assert_eq!(var.values, GridValues::F32(vec![10.0, 20.0]));
    }

    #[test]
    fn test_missing_variable() {
        let err = sample().read_variable("VMDR", ValueKind::I16).unwrap_err();
        assert!(matches!(err, NetCdfError::VariableNotFound(name) if name == "VMDR"));
    }

    #[test]
    fn test_opener_by_path() {
        let mut opener = MemoryOpener::new();
        opener.register("/in/a.nc", sample());

        let source = opener.open(Path::new("/in/a.nc")).unwrap();
        assert!(source.read_variable("latitude", ValueKind::F64).is_ok());
        assert!(matches!(
            opener.open(Path::new("/in/b.nc")),
            Err(NetCdfError::Open { .. })
        ));
    }
}
