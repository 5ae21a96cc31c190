//! Data source resolution and raw reads (local files or HTTP).

use std::env;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use tracing::debug;

use crate::domain::DataSource;
use crate::io::ingest::LoadError;

/// Directory prepended to relative partition paths.
pub const ENV_DATA_DIR: &str = "KIVA_DATA_DIR";
/// Comma-separated partition list.
pub const ENV_PARTS: &str = "KIVA_PARTS";

/// Partition file names of the published Kiva loans export.
pub const DEFAULT_PARTS: [&str; 3] = [
    "kiva_loans_part_0.csv",
    "kiva_loans_part_1.csv",
    "kiva_loans_part_2.csv",
];

/// Resolve the sources to load: flags first, then environment (`.env` honoured), then defaults.
pub fn resolve_sources(data_dir: Option<&Path>, parts: &[String]) -> Vec<DataSource> {
    dotenvy::dotenv().ok();
    let env_dir = env::var_os(ENV_DATA_DIR).map(PathBuf::from);
    let env_parts = env::var(ENV_PARTS).ok();
    resolve_sources_with(data_dir, parts, env_dir, env_parts.as_deref())
}

fn resolve_sources_with(
    data_dir: Option<&Path>,
    parts: &[String],
    env_dir: Option<PathBuf>,
    env_parts: Option<&str>,
) -> Vec<DataSource> {
    let dir = data_dir.map(Path::to_path_buf).or(env_dir);

    let names: Vec<String> = if !parts.is_empty() {
        parts.to_vec()
    } else if let Some(list) = env_parts.filter(|s| !s.trim().is_empty()) {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        DEFAULT_PARTS.iter().map(|s| s.to_string()).collect()
    };

    names
        .iter()
        .map(|name| match (DataSource::parse(name), &dir) {
            (DataSource::File(path), Some(dir)) if path.is_relative() => DataSource::File(dir.join(path)),
            (source, _) => source,
        })
        .collect()
}

/// Open a source for reading.
pub fn read_source(source: &DataSource) -> Result<Box<dyn Read + Send>, LoadError> {
    match source {
        DataSource::File(path) => {
            let file = File::open(path).map_err(|error| LoadError::Open {
                path: path.display().to_string(),
                error,
            })?;
            Ok(Box::new(file))
        }
        DataSource::Url(url) => {
            let body = fetch_url(url)?;
            Ok(Box::new(Cursor::new(body)))
        }
    }
}

fn fetch_url(url: &str) -> Result<Vec<u8>, LoadError> {
    debug!(url, "fetching partition");
    let fetch_err = |message: String| LoadError::Fetch {
        url: url.to_string(),
        message,
    };

    let resp = Client::new()
        .get(url)
        .send()
        .map_err(|e| fetch_err(format!("request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(fetch_err(format!("status {}", resp.status())));
    }

    let body = resp
        .bytes()
        .map_err(|e| fetch_err(format!("failed to read body: {e}")))?;
    Ok(body.to_vec())
}
