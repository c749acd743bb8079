//! The grid source capability: named variables with values and attributes.

use std::collections::HashMap;
use std::path::Path;

use crate::error::NetCdfResult;

/// Element type requested when reading a variable.
///
/// Sources convert stored values to the requested type; for quantized
/// variables callers ask for `I16` so the raw packed samples come back
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    I16,
    F32,
    F64,
}

/// Flattened (row-major) variable values.
#[derive(Debug, Clone, PartialEq)]
pub enum GridValues {
    I16(Vec<i16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl GridValues {
    pub fn len(&self) -> usize {
        match self {
            GridValues::I16(v) => v.len(),
            GridValues::F32(v) => v.len(),
            GridValues::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            GridValues::I16(_) => ValueKind::I16,
            GridValues::F32(_) => ValueKind::F32,
            GridValues::F64(_) => ValueKind::F64,
        }
    }

    /// Convert to the requested element type.
    ///
    /// Float to integer conversion saturates, so it is only meaningful for
    /// values that were integral to begin with.
    pub fn convert(self, kind: ValueKind) -> GridValues {
        match (self, kind) {
            (v @ GridValues::I16(_), ValueKind::I16)
            | (v @ GridValues::F32(_), ValueKind::F32)
            | (v @ GridValues::F64(_), ValueKind::F64) => v,
            (GridValues::I16(v), ValueKind::F32) => {
                GridValues::F32(v.into_iter().map(f32::from).collect())
            }
            (GridValues::I16(v), ValueKind::F64) => {
                GridValues::F64(v.into_iter().map(f64::from).collect())
            }
            (GridValues::F32(v), ValueKind::F64) => {
                GridValues::F64(v.into_iter().map(f64::from).collect())
            }
            (GridValues::F32(v), ValueKind::I16) => {
                GridValues::I16(v.into_iter().map(|x| x as i16).collect())
            }
            (GridValues::F64(v), ValueKind::F32) => {
                GridValues::F32(v.into_iter().map(|x| x as f32).collect())
            }
            (GridValues::F64(v), ValueKind::I16) => {
                GridValues::I16(v.into_iter().map(|x| x as i16).collect())
            }
        }
    }
}

/// A single attribute value attached to a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Short(i16),
    Int(i32),
    Float(f32),
    Double(f64),
    Text(String),
}

impl AttrValue {
    /// Exact `i16` view; floats qualify only when integral and in range.
    pub fn as_i16(&self) -> Option<i16> {
        match *self {
            AttrValue::Short(v) => Some(v),
            AttrValue::Int(v) => i16::try_from(v).ok(),
            AttrValue::Float(v) if v.fract() == 0.0 => float_to_i16(f64::from(v)),
            AttrValue::Double(v) if v.fract() == 0.0 => float_to_i16(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            AttrValue::Short(v) => Some(f32::from(v)),
            AttrValue::Int(v) => Some(v as f32),
            AttrValue::Float(v) => Some(v),
            AttrValue::Double(v) => Some(v as f32),
            AttrValue::Text(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            AttrValue::Short(v) => Some(f64::from(v)),
            AttrValue::Int(v) => Some(f64::from(v)),
            AttrValue::Float(v) => Some(f64::from(v)),
            AttrValue::Double(v) => Some(v),
            AttrValue::Text(_) => None,
        }
    }
}

fn float_to_i16(v: f64) -> Option<i16> {
    if v >= f64::from(i16::MIN) && v <= f64::from(i16::MAX) {
        Some(v as i16)
    } else {
        None
    }
}

/// Attribute set of one variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(HashMap<String, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AttrValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, AttrValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, AttrValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A variable read from a grid source.
#[derive(Debug, Clone, PartialEq)]
pub struct GridVariable {
    pub name: String,
    /// Dimension lengths, slowest-varying first.
    pub shape: Vec<usize>,
    pub values: GridValues,
    pub attributes: Attributes,
}

/// An open grid file exposing named variables.
///
/// The handle is released when the value is dropped.
pub trait GridSource {
    /// Read every value of `name` as `kind`, together with its attributes.
    ///
    /// Returns [`NetCdfError::VariableNotFound`](crate::NetCdfError::VariableNotFound)
    /// when the source has no such variable.
    fn read_variable(&self, name: &str, kind: ValueKind) -> NetCdfResult<GridVariable>;
}

/// Opens grid sources by path.
pub trait GridOpener: Send + Sync {
    fn open(&self, path: &Path) -> NetCdfResult<Box<dyn GridSource>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_i16_exact_only() {
        assert_eq!(AttrValue::Short(-32768).as_i16(), Some(-32768));
        assert_eq!(AttrValue::Int(-32767).as_i16(), Some(-32767));
        assert_eq!(AttrValue::Int(40_000).as_i16(), None);
        assert_eq!(AttrValue::Double(-999.0).as_i16(), Some(-999));
        assert_eq!(AttrValue::Double(1.5).as_i16(), None);
        assert_eq!(AttrValue::Text("x".into()).as_i16(), None);
    }

    #[test]
    fn test_attr_float_views() {
        assert_eq!(AttrValue::Float(0.01).as_f32(), Some(0.01));
        assert_eq!(AttrValue::Short(3).as_f64(), Some(3.0));
        assert_eq!(AttrValue::Text("m".into()).as_f32(), None);
    }

    #[test]
    fn test_values_convert() {
        let v = GridValues::I16(vec![1, -2]).convert(ValueKind::F32);
        assert_eq!(v, GridValues::F32(vec![1.0, -2.0]));
        assert_eq!(v.kind(), ValueKind::F32);

        let v = GridValues::F32(vec![0.5]).convert(ValueKind::F64);
        assert_eq!(v, GridValues::F64(vec![0.5]));
        assert_eq!(v.len(), 1);
    }
}
