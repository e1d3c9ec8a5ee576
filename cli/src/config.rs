use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// A batch of documents to compile, read from a TOML file.
///
/// ```toml
/// full_document = true
///
/// [[targets]]
/// source = "pages/index.hml"
/// destination = "public"
///
/// [[targets]]
/// comment = "drafts are not published"
/// ```
#[derive(Debug, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_true")]
    pub full_document: bool,

    #[serde(default)]
    pub skip_errors: bool,

    #[serde(default)]
    pub targets: Vec<Target>,
}

#[derive(Debug, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub source: Option<PathBuf>,

    /// Directory receiving `<source stem>.html`.
    #[serde(default)]
    pub destination: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Free text. An entry holding only a comment is ignored.
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_true() -> bool {
    true
}

/// A target resolved against the configuration file's directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub source: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Toml(toml::de::Error),
    /// A target that is neither complete nor a comment.
    MalformedTarget(usize),
    MissingSource(PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, err) => write!(f, "cannot read '{}': {}", path.display(), err),
            ConfigError::Toml(err) => write!(f, "invalid configuration: {}", err),
            ConfigError::MalformedTarget(index) => write!(
                f,
                "target #{} needs both a source and a destination",
                index + 1
            ),
            ConfigError::MissingSource(path) => {
                write!(f, "{} is an invalid target", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl BatchConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        toml::from_str(&raw).map_err(ConfigError::Toml)
    }

    /// The enabled targets, with paths relative to `base_dir`. Fails on the
    /// first malformed target or missing source so nothing is half-built.
    pub fn jobs(&self, base_dir: &Path) -> Result<Vec<Job>, ConfigError> {
        let mut jobs = Vec::new();
        for (index, target) in self.targets.iter().enumerate() {
            let (source, destination) = match (&target.source, &target.destination) {
                (Some(source), Some(destination)) => (source, destination),
                (None, None) if target.comment.is_some() => continue,
                _ => return Err(ConfigError::MalformedTarget(index)),
            };
            if !target.enabled {
                continue;
            }

            let source = base_dir.join(source);
            if !source.is_file() {
                return Err(ConfigError::MissingSource(source));
            }
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let output = base_dir.join(destination).join(format!("{}.html", stem));
            jobs.push(Job { source, output });
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: BatchConfig = toml::from_str("").unwrap();
        assert!(config.full_document);
        assert!(!config.skip_errors);
        assert!(config.targets.is_empty());
    }

    #[test]
    fn resolves_jobs_beside_the_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.hml"), "# Hi").unwrap();
        std::fs::write(dir.path().join("draft.hml"), "wip").unwrap();
        let config_path = dir.path().join("site.toml");
        std::fs::write(
            &config_path,
            r#"
skip_errors = true

[[targets]]
comment = "main page"

[[targets]]
source = "index.hml"
destination = "out"

[[targets]]
source = "draft.hml"
destination = "out"
enabled = false
"#,
        )
        .unwrap();

        let config = BatchConfig::load(&config_path).unwrap();
        assert!(config.skip_errors);
        assert_eq!(
            config.jobs(dir.path()).unwrap(),
            vec![Job {
                source: dir.path().join("index.hml"),
                output: dir.path().join("out").join("index.html"),
            }]
        );
    }

    #[test]
    fn rejects_incomplete_targets() {
        let config: BatchConfig = toml::from_str("[[targets]]\nsource = \"a.hml\"").unwrap();
        assert!(matches!(
            config.jobs(Path::new(".")),
            Err(ConfigError::MalformedTarget(0))
        ));
    }

    #[test]
    fn rejects_missing_sources() {
        let dir = tempfile::tempdir().unwrap();
        let config: BatchConfig =
            toml::from_str("[[targets]]\nsource = \"nope.hml\"\ndestination = \"out\"").unwrap();
        assert!(matches!(
            config.jobs(dir.path()),
            Err(ConfigError::MissingSource(_))
        ));
    }
}
