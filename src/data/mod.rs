pub mod boundaries;
pub mod quakes;
pub mod topojson;

pub use boundaries::{load_boundaries, BoundaryFeature, GeometryKind};
pub use quakes::{load_quakes, EarthquakeRecord, QuakeSet, RecordId};

use tracing::{error, info};

use crate::config::Config;
use crate::error::DatasetLoadError;

/// Outcome of both loads. Either side may fail independently.
pub struct Datasets {
    pub boundaries: Result<Vec<BoundaryFeature>, DatasetLoadError>,
    pub quakes: Result<QuakeSet, DatasetLoadError>,
}

/// Load the boundary and earthquake datasets in parallel. The projection is
/// fitted only after both have finished, so neither load waits on the other.
pub fn load_datasets(config: &Config) -> Datasets {
    let (boundaries, quakes) = rayon::join(
        || load_boundaries(&config.world_path, &config.object),
        || load_quakes(&config.quakes_path),
    );

    match &boundaries {
        Ok(features) => info!(
            path = %config.world_path.display(),
            features = features.len(),
            "loaded boundary dataset"
        ),
        Err(e) => error!("boundary dataset unavailable: {e}"),
    }
    match &quakes {
        Ok(set) => info!(
            path = %config.quakes_path.display(),
            records = set.records.len(),
            skipped = set.skipped,
            "loaded earthquake dataset"
        ),
        Err(e) => error!("earthquake dataset unavailable: {e}"),
    }

    Datasets { boundaries, quakes }
}
