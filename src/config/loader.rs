use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{AppError, Context, Result};

use super::{validator, Config};

pub const DEFAULT_CONFIG_FILE: &str = "nse-snapshot.json";

impl Config {
    /// Load configuration from `path`, searching next to the executable and in the working
    /// directory as well. When the default file name is requested and nothing is found, the
    /// built-in defaults are returned instead.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut last_error = None;
        for search_path in search_paths(path) {
            match fs::read_to_string(&search_path) {
                Ok(content) => {
                    let config = parse_config(&content, &search_path)?;
                    log::debug!("loaded configuration from {}", search_path.display());
                    return Ok(config);
                }
                Err(err) => {
                    last_error = Some(format!("failed to read {}: {}", search_path.display(), err));
                }
            }
        }

        if path == Path::new(DEFAULT_CONFIG_FILE) {
            log::debug!("no {} found, using built-in configuration", DEFAULT_CONFIG_FILE);
            return Ok(Config::builtin());
        }

        Err(AppError::message(format!(
            "could not find config file. Last error: {}",
            last_error.unwrap_or_else(|| "no search paths".to_string())
        )))
    }
}

fn search_paths(path: &Path) -> Vec<PathBuf> {
    let mut paths = vec![path.to_path_buf()];
    if path.is_absolute() {
        return paths;
    }

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(dir.join(path));
    }
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(path));
    }

    paths.dedup();
    paths
}

fn parse_config(content: &str, source: &Path) -> Result<Config> {
    let config: Config = serde_json::from_str(content)
        .with_context(|| format!("failed to parse config JSON at {}", source.display()))?;
    validator::validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.json")).expect_err("file does not exist");
        assert!(
            err.to_string().contains("could not find config file"),
            "unexpected error message: {err}"
        );
    }

    #[test]
    fn loads_and_validates_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"poll": {{"interval_secs": 0}}}}"#).unwrap();

        let err = Config::load(file.path()).expect_err("zero interval should be rejected");
        assert!(
            err.to_string().contains("interval"),
            "unexpected error message: {err}"
        );
    }

    #[test]
    fn reads_overrides_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"storage": {{"snapshot_dir": "snapshots"}}, "retry": {{"max_renewals": 2}}}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.storage.snapshot_dir, PathBuf::from("snapshots"));
        assert_eq!(config.retry.max_renewals, 2);
        assert_eq!(config.retry.max_retries, 3);
    }
}
