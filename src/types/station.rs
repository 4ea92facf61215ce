//! Defines the station catalog record as found in NOAA's ISD history file,
//! together with the query coordinate type and the predicates used to decide
//! whether a record may take part in a nearest-station search.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Reserved USAF identifier used by NOAA for stations without a real USAF id.
pub const PLACEHOLDER_USAF: &str = "999999";
/// Reserved WBAN identifier used by NOAA for stations without a real WBAN id.
pub const PLACEHOLDER_WBAN: &str = "99999";
/// Number of days after which a station (or the whole catalog) stops counting as current.
pub const STALENESS_DAYS: i64 = 14;

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// # Examples
///
/// ```
/// use isd_locator::LatLon;
///
/// let seattle = LatLon(47.6519, -122.3434);
/// assert_eq!(seattle.0, 47.6519); // Latitude
/// assert_eq!(seattle.1, -122.3434); // Longitude
/// assert!(seattle.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    /// Latitude in decimal degrees.
    pub fn lat(&self) -> f64 {
        self.0
    }

    /// Longitude in decimal degrees.
    pub fn lon(&self) -> f64 {
        self.1
    }

    /// Returns `true` when latitude lies in `[-90, 90]` and longitude in `[-180, 180]`.
    ///
    /// NaN and infinite values are never valid.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.0) && (-180.0..=180.0).contains(&self.1)
    }
}

/// One row of the ISD station history catalog.
///
/// The `(usaf, wban)` pair is the natural key of the catalog. Everything except
/// the two identifiers may be missing in the source file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StationRecord {
    /// Air Force station identifier (e.g. "727930"). May start with a letter.
    pub usaf: String,
    /// Weather Bureau Army Navy identifier (e.g. "24233").
    pub wban: String,
    pub station_name: Option<String>,
    /// FIPS country code.
    pub country: Option<String>,
    /// US state or region code.
    pub state: Option<String>,
    pub icao: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Elevation in meters.
    pub elevation: Option<f64>,
    /// First day with observations.
    pub begin: Option<NaiveDate>,
    /// Last day with observations.
    pub end: Option<NaiveDate>,
}

impl StationRecord {
    /// Creates a record with only identifiers and a location set.
    pub fn new(usaf: impl Into<String>, wban: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            usaf: usaf.into(),
            wban: wban.into(),
            station_name: None,
            country: None,
            state: None,
            icao: None,
            latitude: Some(latitude),
            longitude: Some(longitude),
            elevation: None,
            begin: None,
            end: None,
        }
    }

    /// Sets the end of the operational window.
    pub fn with_end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    /// Sets the station name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.station_name = Some(name.into());
        self
    }

    /// The location of the station, if both coordinates are known.
    pub fn location(&self) -> Option<LatLon> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(LatLon(lat, lon)),
            _ => None,
        }
    }

    /// Whether this entry is a virtual or aggregate entry rather than a physical station.
    ///
    /// NOAA marks those with USAF `999999`, WBAN `99999` or a USAF starting with `A`.
    pub fn is_placeholder(&self) -> bool {
        self.usaf == PLACEHOLDER_USAF || self.wban == PLACEHOLDER_WBAN || self.usaf.starts_with('A')
    }

    /// Whether the station reported within the staleness window before `reference_date`.
    ///
    /// A station without an end date is never active.
    pub fn is_active(&self, reference_date: NaiveDate, staleness_days: i64) -> bool {
        let cutoff = activity_cutoff(reference_date, staleness_days);
        self.end.is_some_and(|end| end > cutoff)
    }
}

/// The day on or before which an end date counts as inactive.
pub fn activity_cutoff(reference_date: NaiveDate, staleness_days: i64) -> NaiveDate {
    reference_date - Duration::days(staleness_days)
}
