//! Site table loading and per-request resolution.

use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;
use thiserror::Error;

use crate::models::SiteConfig;

/// File name looked up by [`SiteTable::discover`].
pub const DEFAULT_CONFIG_FILE: &str = "image-cdn.json";

/// Errors raised while loading or validating the site table.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Source I/O error.
        source: std::io::Error,
    },
    /// Failed to parse a JSON configuration file.
    #[error("failed to parse {}: {source}", .path.display())]
    Json {
        /// Path that caused the error.
        path: PathBuf,
        /// Source parse error.
        source: serde_json::Error,
    },
    /// Failed to parse a YAML configuration file.
    #[error("failed to parse {}: {source}", .path.display())]
    Yaml {
        /// Path that caused the error.
        path: PathBuf,
        /// Source parse error.
        source: serde_yaml::Error,
    },
    /// The file extension is neither JSON nor YAML.
    #[error("unsupported configuration format for {}", .path.display())]
    UnsupportedFormat {
        /// Path that caused the error.
        path: PathBuf,
    },
    /// Two records share a domain.
    #[error("domain `{0}` is configured more than once")]
    DuplicateDomain(String),
    /// More than one record lacks a domain.
    #[error("more than one site record has no domain")]
    DuplicateDefault,
    /// A record carries an out-of-range option.
    #[error("invalid configuration for {site}: {reason}")]
    Invalid {
        /// Domain of the offending record, or `default`.
        site: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// On-disk layout of the site table.
#[derive(Debug, Default, Deserialize)]
struct SiteTableFile {
    #[serde(default)]
    sites: Vec<SiteConfig>,
}

/// Immutable mapping from request host to site configuration.
#[derive(Debug, Clone)]
pub struct SiteTable {
    default: Arc<SiteConfig>,
    sites: HashMap<String, Arc<SiteConfig>>,
}

impl Default for SiteTable {
    fn default() -> Self {
        Self {
            default: Arc::new(SiteConfig::default()),
            sites: HashMap::new(),
        }
    }
}

impl SiteTable {
    /// Build a table from site records.
    ///
    /// The record without a domain becomes the default; when none is given the built-in
    /// defaults apply. Domains are compared case-insensitively.
    pub fn new(records: impl IntoIterator<Item = SiteConfig>) -> Result<Self, ConfigError> {
        let mut default = None;
        let mut sites = HashMap::new();

        for record in records {
            validate(&record)?;
            match record.domain.as_deref().map(normalise_domain) {
                None => {
                    if default.replace(Arc::new(record)).is_some() {
                        return Err(ConfigError::DuplicateDefault);
                    }
                }
                Some(domain) => {
                    if sites.contains_key(&domain) {
                        return Err(ConfigError::DuplicateDomain(domain));
                    }
                    sites.insert(domain, Arc::new(record));
                }
            }
        }

        Ok(Self {
            default: default.unwrap_or_else(|| Arc::new(SiteConfig::default())),
            sites,
        })
    }

    /// Configuration for a request host, or the default record.
    pub fn resolve(&self, domain: &str) -> Arc<SiteConfig> {
        self.sites
            .get(&normalise_domain(domain))
            .unwrap_or(&self.default)
            .clone()
    }

    /// The record used when no domain matches.
    pub fn default_site(&self) -> Arc<SiteConfig> {
        self.default.clone()
    }

    /// Number of domain-specific records.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// True when only the default record exists.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SiteTable {
    /// Load the table from `dir`, falling back to the built-in defaults.
    ///
    /// A missing file is not an error. A file that fails to load is reported and ignored so the
    /// rewriter keeps serving pages with default settings.
    pub fn discover(dir: &Path) -> Self {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if !candidate.exists() {
            return Self::default();
        }
        Self::from_path(&candidate).unwrap_or_else(|err| {
            tracing::warn!("ignoring site configuration: {err}");
            Self::default()
        })
    }

    /// Read a JSON (`.json`) or YAML (`.yaml`, `.yml`) site table.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let file: SiteTableFile = match extension.as_deref() {
            Some("json") => serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?,
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };

        let table = Self::new(file.sites)?;
        tracing::debug!(
            "loaded {} site record(s) from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }
}

/// Site table that can be replaced while documents are being rewritten.
///
/// Readers take an `Arc` snapshot, so a document keeps the configuration it started with even
/// if the table is swapped mid-flight.
#[derive(Debug)]
pub struct SharedSiteTable {
    current: ArcSwap<SiteTable>,
}

impl SharedSiteTable {
    /// Wrap an initial table.
    pub fn new(table: SiteTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
        }
    }

    /// Current table.
    pub fn snapshot(&self) -> Arc<SiteTable> {
        self.current.load_full()
    }

    /// Resolve a host against the current table.
    pub fn resolve(&self, domain: &str) -> Arc<SiteConfig> {
        self.current.load().resolve(domain)
    }

    /// Atomically install a new table.
    pub fn replace(&self, table: SiteTable) {
        self.current.store(Arc::new(table));
    }
}

fn normalise_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn validate(config: &SiteConfig) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        site: config.domain.clone().unwrap_or_else(|| "default".into()),
        reason,
    };

    if let Some(domain) = &config.domain
        && normalise_domain(domain).is_empty()
    {
        return Err(invalid("domain must not be empty".into()));
    }
    if let Some(quality) = config.quality
        && !(1..=100).contains(&quality)
    {
        return Err(invalid(format!("quality {quality} is outside 1-100")));
    }
    if let Some(sharpen) = config.sharpen
        && !(sharpen.is_finite() && (0.0..=10.0).contains(&sharpen))
    {
        return Err(invalid(format!("sharpen {sharpen} is outside 0-10")));
    }
    if let Some(gravity) = &config.gravity
        && (gravity.is_empty()
            || gravity
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, ',' | '/')))
    {
        return Err(invalid(format!("gravity `{gravity}` is not a single token")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Fit;
    use tempfile::tempdir;

    fn site(domain: &str, quality: u8) -> SiteConfig {
        SiteConfig {
            domain: Some(domain.into()),
            quality: Some(quality),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn resolves_case_insensitively_and_falls_back_to_default() {
        let table = SiteTable::new(vec![site("Example.com", 70)]).unwrap();

        assert_eq!(table.resolve("EXAMPLE.COM").quality, Some(70));
        assert_eq!(table.resolve("example.com.").quality, Some(70));
        assert_eq!(table.resolve("other.org").quality, Some(90));
        assert!(table.resolve("other.org").domain.is_none());
    }

    #[test]
    fn record_without_domain_replaces_builtin_default() {
        let default = SiteConfig {
            quality: Some(60),
            ..SiteConfig::default()
        };
        let table = SiteTable::new(vec![default, site("a.com", 80)]).unwrap();
        assert_eq!(table.resolve("b.com").quality, Some(60));
        assert_eq!(table.default_site().quality, Some(60));
    }

    #[test]
    fn rejects_duplicates() {
        let err = SiteTable::new(vec![site("a.com", 80), site("A.com", 70)]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateDomain(domain) if domain == "a.com"));

        let err = SiteTable::new(vec![SiteConfig::default(), SiteConfig::default()]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateDefault));
    }

    #[test]
    fn rejects_out_of_range_options() {
        assert!(SiteTable::new(vec![site("a.com", 0)]).is_err());
        assert!(SiteTable::new(vec![site("a.com", 101)]).is_err());

        let sharpen = SiteConfig {
            sharpen: Some(11.0),
            ..SiteConfig::default()
        };
        assert!(SiteTable::new(vec![sharpen]).is_err());

        let gravity = SiteConfig {
            gravity: Some("left,top".into()),
            ..SiteConfig::default()
        };
        assert!(SiteTable::new(vec![gravity]).is_err());
    }

    #[test]
    fn loads_json_tables() {
        let temp = tempdir().expect("failed to create temp dir");
        let path = temp.path().join("sites.json");
        fs::write(
            &path,
            r#"{"sites": [
                {"quality": 85},
                {"domain": "shop.example.com", "fit": "crop", "REWRITE_SVG_TAGS": false}
            ]}"#,
        )
        .expect("failed to write config");

        let table = SiteTable::from_path(&path).expect("table should load");
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("unknown").quality, Some(85));

        let shop = table.resolve("shop.example.com");
        assert_eq!(shop.fit, Some(Fit::Crop));
        assert!(!shop.rewrite_svg_tags);
        assert_eq!(shop.quality, Some(90));
    }

    #[test]
    fn loads_yaml_tables() {
        let temp = tempdir().expect("failed to create temp dir");
        let path = temp.path().join("sites.yaml");
        fs::write(
            &path,
            "sites:\n  - domain: blog.example.com\n    quality: null\n    lazyLoad: false\n",
        )
        .expect("failed to write config");

        let table = SiteTable::from_path(&path).expect("table should load");
        let blog = table.resolve("blog.example.com");
        assert_eq!(blog.quality, None);
        assert!(!blog.lazy_load);
    }

    #[test]
    fn reports_unsupported_and_malformed_files() {
        let temp = tempdir().expect("failed to create temp dir");

        let toml = temp.path().join("sites.toml");
        fs::write(&toml, "").unwrap();
        assert!(matches!(
            SiteTable::from_path(&toml),
            Err(ConfigError::UnsupportedFormat { .. })
        ));

        let broken = temp.path().join("sites.json");
        fs::write(&broken, "{").unwrap();
        assert!(matches!(
            SiteTable::from_path(&broken),
            Err(ConfigError::Json { .. })
        ));
    }

    #[test]
    fn discover_falls_back_to_defaults() {
        let temp = tempdir().expect("failed to create temp dir");
        let table = SiteTable::discover(temp.path());
        assert!(table.is_empty());
        assert_eq!(*table.default_site(), SiteConfig::default());

        fs::write(temp.path().join(DEFAULT_CONFIG_FILE), "not json").unwrap();
        assert!(SiteTable::discover(temp.path()).is_empty());
    }

    #[test]
    fn snapshots_survive_replacement() {
        let shared = SharedSiteTable::new(SiteTable::new(vec![site("a.com", 50)]).unwrap());
        let before = shared.snapshot();

        shared.replace(SiteTable::new(vec![site("a.com", 60)]).unwrap());

        assert_eq!(before.resolve("a.com").quality, Some(50));
        assert_eq!(shared.resolve("a.com").quality, Some(60));
    }

    #[test]
    fn concurrent_readers_never_see_torn_tables() {
        let shared = SharedSiteTable::new(SiteTable::new(vec![site("a.com", 10)]).unwrap());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let snapshot = shared.snapshot();
                        let first = snapshot.resolve("a.com").quality;
                        let second = snapshot.resolve("A.COM").quality;
                        assert_eq!(first, second);
                    }
                });
            }
            for quality in 11..50 {
                shared.replace(SiteTable::new(vec![site("a.com", quality)]).unwrap());
            }
        });
    }
}
