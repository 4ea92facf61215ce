mod batch;
mod catalog;
mod error;
mod locator;
mod stations;
mod store;
mod types;
mod utils;

pub use error::IsdError;
pub use locator::*;

pub use types::resolution::*;
pub use types::station::*;

pub use stations::candidates::{nearest_by_planar, planar_distance_2, select_candidates, DEFAULT_CANDIDATE_LIMIT};
pub use stations::refine::{distance_miles, drop_placeholders, refine_distances};
pub use stations::resolve::{resolve_point, select_minimum, validate_point, ResolveOptions};

pub use store::file_store::{FileStore, STORE_FILE_NAME};
pub use store::memory::MemoryStore;
pub use store::{StationStore, StoreStatus, CHUNK_SIZE};

pub use batch::{
    find_closest_csv, points_from_frame, read_points_csv, write_csv, BatchResolver,
    DEFAULT_OUTPUT_FILE_NAME, DISTANCE_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN, USAF_COLUMN,
    WBAN_COLUMN,
};
pub use catalog::history::{read_history_csv, CATALOG_COLUMNS};
pub use catalog::{fetch_history, populate_from_file, replace_blocking, ISD_HISTORY_URL};

pub use batch::error::BatchError;
pub use catalog::error::CatalogError;
pub use stations::error::LocateStationError;
pub use store::error::StoreError;
