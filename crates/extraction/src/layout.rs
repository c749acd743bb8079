//! Static layouts of the three supported model outputs.
//!
//! Each [`SourceLayout`] is a declarative table: which coordinate variables
//! to read, which physical variables to decode (and how they are encoded),
//! how to downsample, and how far apart the embedded time slices are. A
//! single generic decode loop in [`crate::dataset`] walks these tables.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;

pub const FILL_VALUE_ATTR: &str = "_FillValue";
pub const SCALE_FACTOR_ATTR: &str = "scale_factor";
pub const ADD_OFFSET_ATTR: &str = "add_offset";

/// The model outputs this service knows how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// ECMWF 0.25° operational forecast.
    Atmosphere,
    /// Copernicus MFWAM wave analysis.
    Wave,
    /// Copernicus SMOC surface currents.
    Current,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Atmosphere, SourceKind::Wave, SourceKind::Current];

    /// Prefix used for input subtrees and output file names.
    pub fn prefix(&self) -> &'static str {
        match self {
            SourceKind::Atmosphere => "ec",
            SourceKind::Wave => "mfwam",
            SourceKind::Current => "smoc",
        }
    }

    pub fn layout(&self) -> &'static SourceLayout {
        match self {
            SourceKind::Atmosphere => &ATMOSPHERE,
            SourceKind::Wave => &WAVE,
            SourceKind::Current => &CURRENT,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ec" | "atmosphere" => Ok(SourceKind::Atmosphere),
            "mfwam" | "wave" => Ok(SourceKind::Wave),
            "smoc" | "current" => Ok(SourceKind::Current),
            other => Err(format!("unknown source: {other} (expected ec, mfwam or smoc)")),
        }
    }
}

/// How a physical variable is stored in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Packed `i16` with required `_FillValue`, `scale_factor` and `add_offset`.
    Quantized,
    /// Physical `f32` with a required `_FillValue`.
    FillOnly,
    /// Physical `f32`; a `_FillValue` is honoured when present.
    Plain,
}

/// One physical variable to decode and the CSV column it becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub encoding: Encoding,
}

impl VariableSpec {
    const fn new(name: &'static str, column: &'static str, encoding: Encoding) -> Self {
        Self {
            name,
            column,
            encoding,
        }
    }
}

/// Extent of a decoded grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub times: usize,
    pub latitudes: usize,
    pub longitudes: usize,
}

impl GridShape {
    pub const fn new(times: usize, latitudes: usize, longitudes: usize) -> Self {
        Self {
            times,
            latitudes,
            longitudes,
        }
    }

    pub fn cells(&self) -> usize {
        self.times * self.latitudes * self.longitudes
    }
}

/// Downsampling step along each axis. Every step is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strides {
    pub time: usize,
    pub latitude: usize,
    pub longitude: usize,
}

impl Strides {
    pub const fn new(time: usize, latitude: usize, longitude: usize) -> Self {
        Self {
            time,
            latitude,
            longitude,
        }
    }

    /// Number of rows emitted for a grid of the given shape.
    pub fn row_count(&self, shape: GridShape) -> usize {
        shape.times.div_ceil(self.time)
            * shape.latitudes.div_ceil(self.latitude)
            * shape.longitudes.div_ceil(self.longitude)
    }
}

/// Everything needed to decode and render one source kind.
#[derive(Debug)]
pub struct SourceLayout {
    pub kind: SourceKind,
    pub latitude: &'static str,
    pub longitude: &'static str,
    /// Decode order, which is also the column order.
    pub variables: &'static [VariableSpec],
    /// Shape the model normally produces; other extents are accepted.
    pub nominal: GridShape,
    pub strides: Strides,
    /// Hours between time slices. Zero marks a single-instant source.
    pub slice_hours: i64,
    /// Decimal places for latitude/longitude columns.
    pub coordinate_precision: usize,
}

impl SourceLayout {
    pub fn slice_duration(&self) -> Duration {
        Duration::hours(self.slice_hours)
    }

    /// Most time slices that can be rendered with distinct timestamps.
    pub fn max_slices(&self) -> Option<usize> {
        (self.slice_hours == 0).then_some(1)
    }
}

pub static ATMOSPHERE: SourceLayout = SourceLayout {
    kind: SourceKind::Atmosphere,
    latitude: "lat",
    longitude: "lon",
    variables: &[
        VariableSpec::new("10u", "wind10mU", Encoding::Plain),
        VariableSpec::new("10v", "wind10mV", Encoding::Plain),
        VariableSpec::new("2t", "temperature2m", Encoding::Plain),
        VariableSpec::new("sp", "surfacePressure", Encoding::Plain),
    ],
    nominal: GridShape::new(1, 721, 1440),
    strides: Strides::new(1, 1, 1),
    slice_hours: 0,
    coordinate_precision: 2,
};

pub static WAVE: SourceLayout = SourceLayout {
    kind: SourceKind::Wave,
    latitude: "latitude",
    longitude: "longitude",
    variables: &[
        VariableSpec::new("VHM0", "seaWaveHeight", Encoding::Quantized),
        VariableSpec::new("VMDR", "seaWaveDirection", Encoding::Quantized),
        VariableSpec::new("VTM10", "seaWavePeriod", Encoding::Quantized),
        VariableSpec::new("VHM0_SW1", "swellWaveHeight", Encoding::Quantized),
        VariableSpec::new("VMDR_SW1", "swellWaveDirection", Encoding::Quantized),
        VariableSpec::new("VTM01_SW1", "swellWavePeriod", Encoding::Quantized),
        VariableSpec::new("VHM0_WW", "windWaveHeight", Encoding::Quantized),
        VariableSpec::new("VMDR_WW", "windWaveDirection", Encoding::Quantized),
        VariableSpec::new("VTM01_WW", "windWavePeriod", Encoding::Quantized),
    ],
    nominal: GridShape::new(4, 2041, 4320),
    strides: Strides::new(1, 3, 3),
    slice_hours: 3,
    coordinate_precision: 3,
};

pub static CURRENT: SourceLayout = SourceLayout {
    kind: SourceKind::Current,
    latitude: "latitude",
    longitude: "longitude",
    variables: &[
        VariableSpec::new("utotal", "uCurrent", Encoding::FillOnly),
        VariableSpec::new("vtotal", "vCurrent", Encoding::FillOnly),
        VariableSpec::new("utide", "uTideCurrent", Encoding::FillOnly),
        VariableSpec::new("vtide", "vTideCurrent", Encoding::FillOnly),
    ],
    nominal: GridShape::new(24, 2041, 4320),
    strides: Strides::new(1, 3, 3),
    slice_hours: 1,
    coordinate_precision: 3,
};
