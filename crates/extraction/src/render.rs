//! Streaming CSV rendering of a decoded dataset.
//!
//! Rows are produced lazily in (time, latitude, longitude) order at the
//! layout's strides and written through a `BufWriter` that is flushed after
//! every completed time slice, so at most one slice of text is buffered.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::iter::FusedIterator;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::dataset::GridDataset;
use crate::error::{ExtractionError, Result};
use crate::finalize::partial_path;
use crate::layout::SourceLayout;

/// Text written in place of a missing value.
pub const MISSING_TOKEN: &str = "NaN";

/// Format of the `dateTime` column (UTC).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Decimal places for physical values.
pub const VALUE_PRECISION: usize = 6;

/// Header row (without line terminator).
pub fn header(layout: &SourceLayout) -> String {
    let mut header = String::from("lat,lon,dateTime");
    for spec in layout.variables {
        header.push(',');
        header.push_str(spec.column);
    }
    header
}

/// Timestamp of time slice `index` for a file whose first slice is `base`.
pub fn slice_timestamp(layout: &SourceLayout, base: DateTime<Utc>, index: usize) -> DateTime<Utc> {
    base + Duration::hours(layout.slice_hours * index as i64)
}

/// One sampled grid cell.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    dataset: &'a GridDataset,
    pub time_index: usize,
    pub lat_index: usize,
    pub lon_index: usize,
}

impl Row<'_> {
    pub fn latitude(&self) -> f64 {
        self.dataset.latitudes()[self.lat_index]
    }

    pub fn longitude(&self) -> f64 {
        self.dataset.longitudes()[self.lon_index]
    }

    /// Physical values in column order, `None` where missing.
    pub fn values(&self) -> impl Iterator<Item = Option<f32>> + '_ {
        self.dataset
            .variables()
            .iter()
            .map(|var| var.value_at(self.time_index, self.lat_index, self.lon_index))
    }

    /// Write the row as one CSV line; `stamp` is the formatted slice time.
    pub fn write_csv<W: Write>(&self, out: &mut W, stamp: &str) -> io::Result<()> {
        let precision = self.dataset.layout().coordinate_precision;
        write!(
            out,
            "{:.prec$},{:.prec$},{}",
            self.latitude(),
            self.longitude(),
            stamp,
            prec = precision
        )?;
        for value in self.values() {
            match value {
                Some(v) => write!(out, ",{:.prec$}", v, prec = VALUE_PRECISION)?,
                None => write!(out, ",{MISSING_TOKEN}")?,
            }
        }
        out.write_all(b"\n")
    }
}

/// Lazy row iterator over a dataset. Single pass; not restartable.
#[derive(Debug)]
pub struct Rows<'a> {
    dataset: &'a GridDataset,
    next: Option<(usize, usize, usize)>,
}

impl<'a> Rows<'a> {
    pub fn new(dataset: &'a GridDataset) -> Self {
        let shape = dataset.shape();
        let next = (shape.cells() > 0).then_some((0, 0, 0));
        Self { dataset, next }
    }
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (t, y, x) = self.next?;
        let shape = self.dataset.shape();
        let strides = self.dataset.layout().strides;

        self.next = if x + strides.longitude < shape.longitudes {
            Some((t, y, x + strides.longitude))
        } else if y + strides.latitude < shape.latitudes {
            Some((t, y + strides.latitude, 0))
        } else if t + strides.time < shape.times {
            Some((t + strides.time, 0, 0))
        } else {
            None
        };

        Some(Row {
            dataset: self.dataset,
            time_index: t,
            lat_index: y,
            lon_index: x,
        })
    }
}

impl FusedIterator for Rows<'_> {}

/// Write header and rows to `writer`, returning the number of rows.
pub fn render_to<W: Write>(dataset: &GridDataset, base: DateTime<Utc>, writer: W) -> io::Result<u64> {
    let layout = dataset.layout();
    let mut out = BufWriter::new(writer);
    writeln!(out, "{}", header(layout))?;

    let mut rows = 0u64;
    let mut slice = None;
    let mut stamp = String::new();

    for row in Rows::new(dataset) {
        if slice != Some(row.time_index) {
            if slice.is_some() {
                out.flush()?;
            }
            slice = Some(row.time_index);
            stamp = slice_timestamp(layout, base, row.time_index)
                .format(TIMESTAMP_FORMAT)
                .to_string();
        }
        row.write_csv(&mut out, &stamp)?;
        rows += 1;
    }

    out.flush()?;
    Ok(rows)
}

/// Render to `path` via a `.partial` sibling that is renamed into place only
/// after the final flush. The partial file is removed on failure.
pub fn render_file(dataset: &GridDataset, base: DateTime<Utc>, path: &Path) -> Result<u64> {
    let partial = partial_path(path);

    let result = File::create(&partial)
        .and_then(|file| {
            let rows = render_to(dataset, base, &file)?;
            file.sync_all()?;
            Ok(rows)
        })
        .and_then(|rows| fs::rename(&partial, path).map(|()| rows));

    match result {
        Ok(rows) => {
            debug!(path = %path.display(), rows, "Wrote CSV");
            Ok(rows)
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(ExtractionError::write_failed(path, e))
        }
    }
}
