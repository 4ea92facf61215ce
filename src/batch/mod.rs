//! Batch resolution: the nearest station for every row of a table of points.
//!
//! Input tables need `Latitude` and `Longitude` columns; every other column is
//! carried through untouched. Output tables gain `USAF`, `WBAN` and
//! `distance_miles`, in that order. A batch is all-or-nothing: the first row
//! that fails to resolve aborts it and no output is produced.

pub mod error;

use crate::batch::error::BatchError;
use crate::stations::error::LocateStationError;
use crate::stations::resolve::{resolve_point, ResolveOptions};
use crate::store::StationStore;
use crate::types::resolution::ResolutionResult;
use crate::types::station::LatLon;
use log::info;
use polars::prelude::*;
use std::path::{Path, PathBuf};

pub const LATITUDE_COLUMN: &str = "Latitude";
pub const LONGITUDE_COLUMN: &str = "Longitude";
pub const USAF_COLUMN: &str = "USAF";
pub const WBAN_COLUMN: &str = "WBAN";
pub const DISTANCE_COLUMN: &str = "distance_miles";
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "labeled_stations.csv";

/// Resolves many points against one store.
///
/// Each point is resolved independently in single-match mode; nothing is
/// shared between points or between calls.
pub struct BatchResolver<'a, S: StationStore + ?Sized> {
    store: &'a S,
    options: ResolveOptions,
}

impl<'a, S: StationStore + ?Sized> BatchResolver<'a, S> {
    pub fn new(store: &'a S, options: ResolveOptions) -> Self {
        Self { store, options }
    }

    /// Lazily resolves `points`, yielding one result per point in order.
    ///
    /// Nothing is computed until the iterator is advanced; calling this again
    /// starts over from scratch.
    pub fn resolve_points<'b, I>(
        &'b self,
        points: I,
    ) -> impl Iterator<Item = Result<ResolutionResult, LocateStationError>> + 'b
    where
        I: IntoIterator<Item = LatLon>,
        I::IntoIter: 'b,
    {
        points
            .into_iter()
            .map(move |point| resolve_point(self.store, point, &self.options).map(|r| r.single()))
    }

    /// Appends `USAF`, `WBAN` and `distance_miles` to every row of `df`.
    ///
    /// # Errors
    ///
    /// * [`BatchError::MissingColumn`] if `Latitude` or `Longitude` is absent.
    /// * [`BatchError::OutputColumnConflict`] if `USAF`, `WBAN` or `distance_miles`
    ///   is already present, e.g. when a labelled file is fed back in.
    /// * [`BatchError::NullCoordinate`] if a row lacks a numeric coordinate.
    /// * [`BatchError::Row`] for the first row that fails to resolve.
    pub fn resolve_frame(&self, df: &DataFrame) -> Result<DataFrame, BatchError> {
        let points = points_from_frame(df)?;
        check_output_columns(df)?;

        let results = self
            .resolve_points(points)
            .enumerate()
            .map(|(row, result)| result.map_err(|source| BatchError::Row { row, source }))
            .collect::<Result<Vec<_>, _>>()?;

        let (usaf, wban, distance): (Vec<String>, Vec<String>, Vec<f64>) = results
            .into_iter()
            .map(|r| (r.usaf, r.wban, r.distance_miles))
            .fold(
                (Vec::new(), Vec::new(), Vec::new()),
                |(mut u, mut w, mut d), (usaf, wban, dist)| {
                    u.push(usaf);
                    w.push(wban);
                    d.push(dist);
                    (u, w, d)
                },
            );

        let labeled = df.hstack(&[
            Column::new(USAF_COLUMN.into(), usaf),
            Column::new(WBAN_COLUMN.into(), wban),
            Column::new(DISTANCE_COLUMN.into(), distance),
        ])?;
        info!("Resolved nearest stations for {} rows", labeled.height());
        Ok(labeled)
    }
}

fn require_column<'df>(df: &'df DataFrame, name: &str) -> Result<&'df Column, BatchError> {
    df.column(name)
        .map_err(|_| BatchError::MissingColumn(name.to_string()))
}

fn check_output_columns(df: &DataFrame) -> Result<(), BatchError> {
    match [USAF_COLUMN, WBAN_COLUMN, DISTANCE_COLUMN]
        .into_iter()
        .find(|name| df.column(name).is_ok())
    {
        Some(name) => Err(BatchError::OutputColumnConflict(name.to_string())),
        None => Ok(()),
    }
}

/// Extracts the query points from the `Latitude`/`Longitude` columns of `df`.
pub fn points_from_frame(df: &DataFrame) -> Result<Vec<LatLon>, BatchError> {
    let lat = require_column(df, LATITUDE_COLUMN)?.cast(&DataType::Float64)?;
    let lon = require_column(df, LONGITUDE_COLUMN)?.cast(&DataType::Float64)?;

    lat.f64()?
        .into_iter()
        .zip(lon.f64()?.into_iter())
        .enumerate()
        .map(|(row, cells)| match cells {
            (Some(lat), Some(lon)) => Ok(LatLon(lat, lon)),
            (None, _) => Err(BatchError::NullCoordinate {
                row,
                column: LATITUDE_COLUMN,
            }),
            (_, None) => Err(BatchError::NullCoordinate {
                row,
                column: LONGITUDE_COLUMN,
            }),
        })
        .collect()
}

/// Reads a CSV table of points with a header row.
pub fn read_points_csv(path: &Path) -> Result<DataFrame, BatchError> {
    if !path.is_file() {
        return Err(BatchError::InputFileNotFound(path.to_path_buf()));
    }
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| BatchError::CsvRead(path.to_path_buf(), e))?
        .finish()
        .map_err(|e| BatchError::CsvRead(path.to_path_buf(), e))
}

/// Writes `df` as CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), BatchError> {
    let mut file = std::fs::File::create(path)
        .map_err(|e| BatchError::CsvWriteIo(path.to_path_buf(), e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| BatchError::CsvWritePolars(path.to_path_buf(), e))
}

/// Labels every point of the CSV at `input` with its nearest station and
/// writes the result to `output_dir/labeled_stations.csv`.
///
/// Returns the labelled table and the path it was written to.
pub fn find_closest_csv<S: StationStore + ?Sized>(
    store: &S,
    input: &Path,
    output_dir: &Path,
    options: ResolveOptions,
) -> Result<(DataFrame, PathBuf), BatchError> {
    let points = read_points_csv(input)?;
    let mut labeled = BatchResolver::new(store, options).resolve_frame(&points)?;

    std::fs::create_dir_all(output_dir)
        .map_err(|e| BatchError::CsvWriteIo(output_dir.to_path_buf(), e))?;
    let output = output_dir.join(DEFAULT_OUTPUT_FILE_NAME);
    write_csv(&mut labeled, &output)?;
    info!("Wrote labelled points to {}", output.display());

    Ok((labeled, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::types::station::StationRecord;
    use std::io::Write;
    use tempfile::tempdir;

    fn store() -> MemoryStore {
        MemoryStore::from_records(vec![
            StationRecord::new("727930", "24233", 47.6062, -122.3321),
            StationRecord::new("727935", "24234", 47.4502, -122.3088),
            StationRecord::new("725030", "14732", 40.7769, -73.8740),
        ])
        .unwrap()
    }

    fn options() -> ResolveOptions {
        ResolveOptions::builder().active_only(false).build()
    }

    fn points() -> DataFrame {
        polars::df!(
            "site" => ["fremont", "sea-tac", "queens"],
            LATITUDE_COLUMN => [47.6519, 47.45, 40.75],
            LONGITUDE_COLUMN => [-122.3434, -122.31, -73.85],
            "elevation_ft" => [130, 400, 20]
        )
        .unwrap()
    }

    #[test]
    fn test_shape_and_passthrough() {
        let input = points();
        let store = store();
        let labeled = BatchResolver::new(&store, options())
            .resolve_frame(&input)
            .unwrap();

        assert_eq!(labeled.height(), input.height());
        assert_eq!(labeled.width(), input.width() + 3);

        let names: Vec<&str> = labeled
            .get_column_names()
            .iter()
            .map(|n| n.as_str())
            .collect();
        assert_eq!(
            names,
            ["site", "Latitude", "Longitude", "elevation_ft", "USAF", "WBAN", "distance_miles"]
        );
        assert!(labeled.select(["site", "Latitude", "Longitude", "elevation_ft"]).unwrap().equals(&input));

        let usaf: Vec<Option<&str>> = labeled.column(USAF_COLUMN).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(usaf, [Some("727930"), Some("727935"), Some("725030")]);
    }

    #[test]
    fn test_lazy_results_match_single_point_resolution() {
        let store = store();
        let resolver = BatchResolver::new(&store, options());
        let points = [LatLon(47.6519, -122.3434), LatLon(40.75, -73.85)];

        let first: Vec<ResolutionResult> = resolver
            .resolve_points(points)
            .collect::<Result<_, _>>()
            .unwrap();
        let second: Vec<ResolutionResult> = resolver
            .resolve_points(points)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(first, second);
        let single = resolve_point(&store, points[0], &options()).unwrap().single();
        assert_eq!(first[0], single);
    }

    #[test]
    fn test_missing_column() {
        let df = polars::df!("lat" => [1.0], LONGITUDE_COLUMN => [1.0]).unwrap();
        let store = store();
        let err = BatchResolver::new(&store, options())
            .resolve_frame(&df)
            .unwrap_err();
        assert!(matches!(err, BatchError::MissingColumn(c) if c == LATITUDE_COLUMN));
    }

    #[test]
    fn test_existing_output_column_is_rejected() {
        let store = store();
        let resolver = BatchResolver::new(&store, options());

        let df = polars::df!(
            USAF_COLUMN => ["x"],
            LATITUDE_COLUMN => [47.6],
            LONGITUDE_COLUMN => [-122.3]
        )
        .unwrap();
        let err = resolver.resolve_frame(&df).unwrap_err();
        assert!(matches!(err, BatchError::OutputColumnConflict(c) if c == USAF_COLUMN));

        // Feeding a labelled table back in hits the same check.
        let labeled = resolver.resolve_frame(&points()).unwrap();
        let err = resolver.resolve_frame(&labeled).unwrap_err();
        assert!(matches!(err, BatchError::OutputColumnConflict(_)));
    }

    #[test]
    fn test_invalid_row_aborts_batch() {
        let df = polars::df!(
            LATITUDE_COLUMN => [47.6, 91.0, 47.5],
            LONGITUDE_COLUMN => [-122.3, -122.3, -122.3]
        )
        .unwrap();
        let store = store();
        let err = BatchResolver::new(&store, options())
            .resolve_frame(&df)
            .unwrap_err();
        assert!(matches!(
            err,
            BatchError::Row {
                row: 1,
                source: LocateStationError::InvalidCoordinate { .. }
            }
        ));
    }

    #[test]
    fn test_null_coordinate() {
        let df = polars::df!(
            LATITUDE_COLUMN => [Some(47.6), None],
            LONGITUDE_COLUMN => [Some(-122.3), Some(-122.3)]
        )
        .unwrap();
        let err = points_from_frame(&df).unwrap_err();
        assert!(matches!(
            err,
            BatchError::NullCoordinate { row: 1, column: LATITUDE_COLUMN }
        ));
    }

    #[test]
    fn test_find_closest_csv() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("points.csv");
        let mut file = std::fs::File::create(&input).unwrap();
        writeln!(file, "id,Latitude,Longitude").unwrap();
        writeln!(file, "a,47.6519,-122.3434").unwrap();
        writeln!(file, "b,40.75,-73.85").unwrap();
        drop(file);

        let output_dir = dir.path().join("output");
        let (labeled, written) = find_closest_csv(&store(), &input, &output_dir, options()).unwrap();

        assert_eq!(written, output_dir.join(DEFAULT_OUTPUT_FILE_NAME));
        assert_eq!(labeled.shape(), (2, 6));

        let reread = read_points_csv(&written).unwrap();
        assert_eq!(reread.shape(), (2, 6));
        let distances = reread.column(DISTANCE_COLUMN).unwrap().f64().unwrap();
        assert!((distances.get(0).unwrap() - 3.2).abs() < 0.05);
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempdir().unwrap();
        let err = find_closest_csv(
            &store(),
            &dir.path().join("nope.csv"),
            dir.path(),
            options(),
        )
        .unwrap_err();
        assert!(matches!(err, BatchError::InputFileNotFound(_)));
    }
}
