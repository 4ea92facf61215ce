//! Parsing of NOAA's `isd-history.csv` station catalog.

use crate::catalog::error::CatalogError;
use crate::types::station::StationRecord;
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;
use std::path::Path;

/// Column names of the catalog, in file order.
pub const CATALOG_COLUMNS: [&str; 11] = [
    "USAF",
    "WBAN",
    "STATION_NAME",
    "CTRY",
    "STATE",
    "ICAO",
    "LAT",
    "LON",
    "ELEV",
    "BEGIN",
    "END",
];

fn get_opt_str(column: &Column, idx: usize) -> Option<String> {
    column
        .str()
        .ok()
        .and_then(|ca| ca.get(idx))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn get_opt_float(column: &Column, idx: usize) -> Option<f64> {
    get_opt_str(column, idx).and_then(|s| s.parse::<f64>().ok())
}

// Dates are written as YYYYMMDD.
fn get_opt_date(column: &Column, idx: usize) -> Option<NaiveDate> {
    get_opt_str(column, idx).and_then(|s| NaiveDate::parse_from_str(&s, "%Y%m%d").ok())
}

/// Reads the station catalog CSV at `path`.
///
/// The header row is required but its names are ignored: columns are taken
/// positionally as [`CATALOG_COLUMNS`]. Every cell is read as text so that
/// identifiers keep their leading zeros.
///
/// # Errors
///
/// * [`CatalogError::FileNotFound`] if `path` does not exist.
/// * [`CatalogError::SchemaMismatch`] if the file does not have 11 columns.
/// * [`CatalogError::MissingIdentifier`] if a row lacks USAF or WBAN.
pub fn read_history_csv(path: &Path) -> Result<Vec<StationRecord>, CatalogError> {
    if !path.is_file() {
        return Err(CatalogError::FileNotFound(path.to_path_buf()));
    }

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| CatalogError::CsvReadPolars(path.to_path_buf(), e))?
        .finish()
        .map_err(|e| CatalogError::CsvReadPolars(path.to_path_buf(), e))?;

    if df.width() != CATALOG_COLUMNS.len() {
        warn!(
            "Catalog column count ({}) does not match schema length ({}) for {}",
            df.width(),
            CATALOG_COLUMNS.len(),
            path.display()
        );
        return Err(CatalogError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: CATALOG_COLUMNS.len(),
            found: df.width(),
        });
    }
    df.set_column_names(CATALOG_COLUMNS.iter().copied())?;

    let records = records_from_frame(&df)?;
    info!("Parsed {} stations from {}", records.len(), path.display());
    Ok(records)
}

/// Converts a catalog frame with [`CATALOG_COLUMNS`] string columns into records.
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<StationRecord>, CatalogError> {
    let usaf = df.column("USAF")?;
    let wban = df.column("WBAN")?;
    let name = df.column("STATION_NAME")?;
    let country = df.column("CTRY")?;
    let state = df.column("STATE")?;
    let icao = df.column("ICAO")?;
    let lat = df.column("LAT")?;
    let lon = df.column("LON")?;
    let elev = df.column("ELEV")?;
    let begin = df.column("BEGIN")?;
    let end = df.column("END")?;

    (0..df.height())
        .map(|row| -> Result<StationRecord, CatalogError> {
            Ok(StationRecord {
                usaf: get_opt_str(usaf, row).ok_or(CatalogError::MissingIdentifier {
                    row,
                    column: "USAF",
                })?,
                wban: get_opt_str(wban, row).ok_or(CatalogError::MissingIdentifier {
                    row,
                    column: "WBAN",
                })?,
                station_name: get_opt_str(name, row),
                country: get_opt_str(country, row),
                state: get_opt_str(state, row),
                icao: get_opt_str(icao, row),
                latitude: get_opt_float(lat, row),
                longitude: get_opt_float(lon, row),
                elevation: get_opt_float(elev, row),
                begin: get_opt_date(begin, row),
                end: get_opt_date(end, row),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#""USAF","WBAN","STATION NAME","CTRY","STATE","ICAO","LAT","LON","ELEV(M)","BEGIN","END"
"007018","99999","WXPOD 7018","","","","+00.000","+000.000","+7018.0","20110309","20130730"
"727930","24233","SEATTLE-TACOMA INTERNATIONAL A","US","WA","KSEA","+47.444","-122.314","+0112.8","19480101","20240625"
"A00002","00103","NO LOCATION","US","","","","","","",""
"#;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parses_isd_history() {
        let file = write_csv(SAMPLE);
        let records = read_history_csv(file.path()).unwrap();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.usaf, "007018");
        assert_eq!(first.wban, "99999");
        assert_eq!(first.country, None);

        let sea = &records[1];
        assert_eq!(sea.station_name.as_deref(), Some("SEATTLE-TACOMA INTERNATIONAL A"));
        assert_eq!(sea.icao.as_deref(), Some("KSEA"));
        assert_eq!(sea.latitude, Some(47.444));
        assert_eq!(sea.longitude, Some(-122.314));
        assert_eq!(sea.elevation, Some(112.8));
        assert_eq!(sea.begin, NaiveDate::from_ymd_opt(1948, 1, 1));
        assert_eq!(sea.end, NaiveDate::from_ymd_opt(2024, 6, 25));

        let no_location = &records[2];
        assert_eq!(no_location.longitude, None);
        assert_eq!(no_location.end, None);
    }

    #[test]
    fn test_wrong_column_count() {
        let file = write_csv("\"USAF\",\"WBAN\"\n\"727930\",\"24233\"\n");
        let err = read_history_csv(file.path()).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::SchemaMismatch {
                expected: 11,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = read_history_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, CatalogError::FileNotFound(_)));
    }
}
