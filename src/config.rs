use std::path::{Path, PathBuf};

use clap::Parser;

pub const DEFAULT_FANS_FILE: &str = "fans_con_score_y_cluster.csv";
pub const DEFAULT_SUMMARY_FILE: &str = "resumen_clusters.csv";

// ---------------------------------------------------------------------------
// Startup configuration
// ---------------------------------------------------------------------------

/// Command line and environment configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "fan-value-engine", version, about = "Fan engagement dashboard")]
pub struct Config {
    /// Fan table (.csv, .json or .parquet)
    #[arg(long, env = "FVE_FANS", value_name = "PATH")]
    pub fans: Option<PathBuf>,

    /// Per-cluster summary table (.csv)
    #[arg(long, env = "FVE_SUMMARY", value_name = "PATH")]
    pub summary: Option<PathBuf>,
}

/// Where a startup file comes from. A missing default file is skipped
/// quietly; a missing explicit file is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Explicit(PathBuf),
    Default(PathBuf),
}

impl DataSource {
    pub fn path(&self) -> &Path {
        match self {
            DataSource::Explicit(p) | DataSource::Default(p) => p,
        }
    }

    /// Whether loading should be attempted at all.
    pub fn should_load(&self) -> bool {
        match self {
            DataSource::Explicit(_) => true,
            DataSource::Default(p) => p.exists(),
        }
    }
}

impl Config {
    pub fn fans_source(&self) -> DataSource {
        source(self.fans.as_ref(), DEFAULT_FANS_FILE)
    }

    pub fn summary_source(&self) -> DataSource {
        source(self.summary.as_ref(), DEFAULT_SUMMARY_FILE)
    }
}

fn source(explicit: Option<&PathBuf>, default: &str) -> DataSource {
    match explicit {
        Some(p) => DataSource::Explicit(p.clone()),
        None => DataSource::Default(PathBuf::from(default)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_working_directory() {
        let cfg = Config::try_parse_from(["fan-value-engine"]).unwrap();
        // the environment may set FVE_*; only check the fallback when it doesn't
        if cfg.fans.is_none() {
            assert_eq!(
                cfg.fans_source(),
                DataSource::Default(PathBuf::from(DEFAULT_FANS_FILE))
            );
        }
        if cfg.summary.is_none() {
            assert_eq!(cfg.summary_source().path(), Path::new(DEFAULT_SUMMARY_FILE));
        }
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = Config::try_parse_from([
            "fan-value-engine",
            "--fans",
            "data/fans.parquet",
            "--summary",
            "data/resumen.csv",
        ])
        .unwrap();
        assert_eq!(
            cfg.fans_source(),
            DataSource::Explicit(PathBuf::from("data/fans.parquet"))
        );
        assert!(cfg.summary_source().should_load());
    }

    #[test]
    fn missing_default_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let absent = DataSource::Default(dir.path().join("nope.csv"));
        assert!(!absent.should_load());
        let explicit = DataSource::Explicit(dir.path().join("nope.csv"));
        assert!(explicit.should_load());
    }
}
