use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{DatasetLoadError, MalformedRecordError};

/// Header columns the earthquake table must provide
pub const COLUMNS: [&str; 8] = [
    "longitude",
    "latitude",
    "magnitude",
    "location",
    "date_time",
    "tsunami",
    "magType",
    "depth",
];

/// Stable identifier of a record: its position among accepted rows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub usize);

/// One earthquake event. Text fields are kept exactly as they appear in the file.
#[derive(Clone, Debug, PartialEq)]
pub struct EarthquakeRecord {
    pub longitude: f64,
    pub latitude: f64,
    /// May be NaN when the source value is not numeric
    pub magnitude: f64,
    pub location: String,
    pub date_time: String,
    pub tsunami: String,
    pub mag_type: String,
    pub depth: String,
    /// Coordinates as written in the file, for display
    pub longitude_text: String,
    pub latitude_text: String,
}

/// Result of loading the earthquake table
#[derive(Debug, Default)]
pub struct QuakeSet {
    pub records: Vec<EarthquakeRecord>,
    /// Rows rejected as malformed
    pub skipped: usize,
}

#[derive(Deserialize)]
struct RawRecord {
    longitude: String,
    latitude: String,
    magnitude: String,
    location: String,
    date_time: String,
    tsunami: String,
    #[serde(rename = "magType")]
    mag_type: String,
    depth: String,
}

impl RawRecord {
    fn into_record(self, row: u64) -> Result<EarthquakeRecord, MalformedRecordError> {
        Ok(EarthquakeRecord {
            longitude: parse_coordinate(row, "longitude", &self.longitude)?,
            latitude: parse_coordinate(row, "latitude", &self.latitude)?,
            magnitude: coerce_number(&self.magnitude),
            location: self.location,
            date_time: self.date_time,
            tsunami: self.tsunami,
            mag_type: self.mag_type,
            depth: self.depth,
            longitude_text: self.longitude,
            latitude_text: self.latitude,
        })
    }
}

/// Numeric cast with loose semantics: blank is 0, anything unparsable is NaN.
/// Only the spelled-out `Infinity` is infinite; `inf` and `NaN` spellings are NaN.
pub fn coerce_number(text: &str) -> f64 {
    let text = text.trim();
    match text {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => text
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(f64::NAN),
    }
}

fn parse_coordinate(row: u64, field: &'static str, value: &str) -> Result<f64, MalformedRecordError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| MalformedRecordError::NonNumeric {
            row,
            field,
            value: value.to_string(),
        })
}

/// Load the earthquake table from a CSV file
pub fn load_quakes(path: &Path) -> Result<QuakeSet, DatasetLoadError> {
    let file = File::open(path).map_err(|source| DatasetLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_quakes(file, path)
}

/// Parse CSV from any reader. Malformed rows are logged and skipped.
pub fn parse_quakes<R: Read>(input: R, path: &Path) -> Result<QuakeSet, DatasetLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers().map_err(|source| DatasetLoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(column) = COLUMNS.into_iter().find(|c| !headers.iter().any(|h| h == *c)) {
        return Err(DatasetLoadError::MissingColumn {
            path: path.to_path_buf(),
            column,
        });
    }

    let mut set = QuakeSet::default();
    for (idx, row) in reader.deserialize::<RawRecord>().enumerate() {
        let row_number = idx as u64 + 1;
        let parsed = row
            .map_err(|source| MalformedRecordError::Decode {
                row: row_number,
                source,
            })
            .and_then(|raw| raw.into_record(row_number));

        match parsed {
            Ok(record) => set.records.push(record),
            Err(err) => {
                warn!(path = %path.display(), "skipping malformed record: {err}");
                set.skipped += 1;
            }
        }
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "longitude,latitude,magnitude,location,date_time,tsunami,magType,depth\n";

    fn parse(body: &str) -> QuakeSet {
        let csv = format!("{HEADER}{body}");
        parse_quakes(csv.as_bytes(), Path::new("test.csv")).unwrap()
    }

    #[test]
    fn test_parses_all_fields() {
        let set = parse("142.37,38.29,9.1,\"Tohoku, Japan\",11-03-2011 05:46,1,mww,29\n");
        assert_eq!(set.skipped, 0);
        let r = &set.records[0];
        assert_eq!(r.longitude, 142.37);
        assert_eq!(r.latitude, 38.29);
        assert_eq!(r.magnitude, 9.1);
        assert_eq!(r.location, "Tohoku, Japan");
        assert_eq!(r.date_time, "11-03-2011 05:46");
        assert_eq!(r.tsunami, "1");
        assert_eq!(r.mag_type, "mww");
        assert_eq!(r.depth, "29");
    }

    #[test]
    fn test_coordinate_text_kept_verbatim() {
        let set = parse("142.370,38.290,9.1,Japan,t,1,mww,29\n");
        let r = &set.records[0];
        assert_eq!(r.longitude, 142.37);
        assert_eq!(r.longitude_text, "142.370");
        assert_eq!(r.latitude_text, "38.290");
    }

    #[test]
    fn test_column_order_and_extra_columns() {
        let csv = "depth,magType,title,tsunami,date_time,location,magnitude,latitude,longitude\n\
                   10,mb,x,0,2020,Somewhere,7.2,-5.5,120.0\n";
        let set = parse_quakes(csv.as_bytes(), Path::new("test.csv")).unwrap();
        assert_eq!(set.records.len(), 1);
        assert_eq!(set.records[0].longitude, 120.0);
        assert_eq!(set.records[0].magnitude, 7.2);
    }

    #[test]
    fn test_missing_column_is_load_error() {
        let csv = "longitude,latitude,magnitude\n1,2,3\n";
        let err = parse_quakes(csv.as_bytes(), Path::new("test.csv")).unwrap_err();
        assert!(matches!(err, DatasetLoadError::MissingColumn { column: "location", .. }));
    }

    #[test]
    fn test_malformed_coordinates_are_skipped() {
        let set = parse(
            "abc,10,7.0,A,t,0,mw,1\n\
             10,,7.0,B,t,0,mw,1\n\
             10,20,7.0,C,t,0,mw,1\n",
        );
        assert_eq!(set.skipped, 2);
        assert_eq!(set.records.len(), 1);
        assert_eq!(set.records[0].location, "C");
    }

    #[test]
    fn test_short_row_is_skipped() {
        let set = parse("10,20,7.0\n10,20,8.0,D,t,0,mw,1\n");
        assert_eq!(set.skipped, 1);
        assert_eq!(set.records[0].location, "D");
    }

    #[test]
    fn test_magnitude_coercion() {
        assert_eq!(coerce_number(""), 0.0);
        assert_eq!(coerce_number("  "), 0.0);
        assert_eq!(coerce_number(" 7.5 "), 7.5);
        assert!(coerce_number("strong").is_nan());
        assert_eq!(coerce_number("Infinity"), f64::INFINITY);
        assert_eq!(coerce_number("-Infinity"), f64::NEG_INFINITY);
        for junk in ["inf", "+inf", "infinity", "INF", "nan", "NaN"] {
            assert!(coerce_number(junk).is_nan(), "{junk}");
        }

        let set = parse("10,20,n/a,A,t,0,mw,1\n10,20,inf,B,t,0,mw,1\n");
        assert_eq!(set.records.len(), 2);
        assert!(set.records[0].magnitude.is_nan());
        assert!(set.records[1].magnitude.is_nan());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}-70.5,-33.4,8.8,Chile,2010,1,mww,22.9").unwrap();
        let set = load_quakes(file.path()).unwrap();
        assert_eq!(set.records.len(), 1);
        assert_eq!(set.records[0].location, "Chile");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_quakes(Path::new("/nonexistent/quakes.csv")).unwrap_err();
        assert!(matches!(err, DatasetLoadError::Io { .. }));
    }
}
