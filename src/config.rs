//! Command-line configuration.

use std::path::PathBuf;

use clap::Parser;

/// Interactive terminal map of earthquake events
#[derive(Debug, Parser)]
#[command(name = "quakemap", version, about)]
pub struct Cli {
    /// Country boundaries as TopoJSON or GeoJSON
    #[arg(long = "world", value_name = "PATH", default_value = "data/world.json")]
    pub world_path: PathBuf,

    /// Earthquake table (CSV with longitude, latitude, magnitude, ... columns)
    #[arg(long = "quakes", value_name = "PATH", default_value = "data/earthquake_data.csv")]
    pub quakes_path: PathBuf,

    /// TopoJSON object holding the boundary geometries
    #[arg(long = "object", value_name = "NAME", default_value = "countries")]
    pub object: String,

    /// Log file (defaults to quakemap.log in the temp directory)
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Resolved settings used by the loaders and the binary
#[derive(Clone, Debug)]
pub struct Config {
    pub world_path: PathBuf,
    pub quakes_path: PathBuf,
    pub object: String,
    pub log_file: PathBuf,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            world_path: cli.world_path,
            quakes_path: cli.quakes_path,
            object: cli.object,
            log_file: cli
                .log_file
                .unwrap_or_else(|| std::env::temp_dir().join("quakemap.log")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from(Cli::parse_from(["quakemap"]));
        assert_eq!(config.world_path, PathBuf::from("data/world.json"));
        assert_eq!(config.quakes_path, PathBuf::from("data/earthquake_data.csv"));
        assert_eq!(config.object, "countries");
        assert!(config.log_file.ends_with("quakemap.log"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from(Cli::parse_from([
            "quakemap",
            "--world",
            "land.geojson",
            "--quakes",
            "q.csv",
            "--object",
            "land",
            "--log-file",
            "/tmp/x.log",
        ]));
        assert_eq!(config.world_path, PathBuf::from("land.geojson"));
        assert_eq!(config.quakes_path, PathBuf::from("q.csv"));
        assert_eq!(config.object, "land");
        assert_eq!(config.log_file, PathBuf::from("/tmp/x.log"));
    }
}
