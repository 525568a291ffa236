//! Config file
//!
//! The native format is INI with `[general]` and `[stream]` sections:
//!
//! ```ini
//! [general]
//! log_level = debug
//!
//! [stream]
//! device = fb0
//! width = auto
//! height = 240
//! depth = 16
//! minthreads = 1
//! maxthreads = 4
//! port = 8808
//! ```
//!
//! Files ending in `.yaml` or `.yml` are read as YAML with the same two
//! sections as mappings. Both formats produce the same [`FileConfig`].

use ini::Ini;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::geometry::Dimension;
use crate::{Result, StreamError};

/// INI file looked up in the search directories
pub const INI_FILE_NAME: &str = "fbstream.ini";

/// YAML file looked up after the INI file in each search directory
pub const YAML_FILE_NAME: &str = "fbstream.yaml";

/// File names tried in every search directory, in order
pub const CONFIG_FILE_NAMES: &[&str] = &[INI_FILE_NAME, YAML_FILE_NAME];

/// Directories searched when no config file is named, in order
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::with_capacity(4);
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.canonicalize().ok())
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }
    dirs.extend(["/usr/local/etc/", "/etc/", "/conf/"].into_iter().map(PathBuf::from));
    dirs
}

/// First config file found in `dirs`
pub fn locate_config_file(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| {
            debug!(path = %candidate.display(), "Looking for config file");
            candidate.is_file()
        })
}

/// On-disk syntax of a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Ini,
    Yaml,
}

impl ConfigFormat {
    /// YAML for `.yaml`/`.yml`, INI for everything else
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Ini,
        }
    }
}

/// Parsed config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub general: Option<GeneralSection>,
    pub stream: Option<StreamSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralSection {
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamSection {
    pub device: Option<String>,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub depth: Option<Dimension>,
    #[serde(alias = "min_threads")]
    pub minthreads: Option<usize>,
    #[serde(alias = "max_threads")]
    pub maxthreads: Option<usize>,
    pub port: Option<u16>,
}

impl FileConfig {
    /// Parse INI text
    ///
    /// Section and key names are case-insensitive. Sections other than
    /// `general` and `stream` are ignored; unknown keys inside them and keys
    /// outside any section are errors.
    pub fn parse_ini(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str(text).map_err(|e| {
            StreamError::config_error_with_source("malformed INI", Box::new(e))
        })?;

        let mut config = FileConfig::default();
        for (section, properties) in ini.iter() {
            let section = section.map(str::to_ascii_lowercase);
            match section.as_deref() {
                None => {
                    if let Some((key, _)) = properties.iter().next() {
                        return Err(StreamError::config_error(format!(
                            "key '{}' is outside any section",
                            key
                        )));
                    }
                }
                Some("general") => {
                    let general = config.general.get_or_insert_with(GeneralSection::default);
                    for (key, value) in properties.iter() {
                        match key.to_ascii_lowercase().as_str() {
                            "log_level" => general.log_level = Some(value.trim().to_string()),
                            other => return Err(unknown_key("general", other)),
                        }
                    }
                }
                Some("stream") => {
                    let stream = config.stream.get_or_insert_with(StreamSection::default);
                    for (key, value) in properties.iter() {
                        stream.set(&key.to_ascii_lowercase(), value)?;
                    }
                }
                Some(other) => debug!(section = other, "Ignoring config file section"),
            }
        }
        Ok(config)
    }

    /// Parse YAML text; a document with no content yields the empty config
    pub fn parse_yaml(text: &str) -> Result<Self> {
        let has_content = text.lines().any(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#') && line != "---"
        });
        if !has_content {
            return Ok(Self::default());
        }

        serde_yaml_ng::from_str(text)
            .map_err(|e| StreamError::config_error_with_source("malformed YAML", Box::new(e)))
    }

    /// Parse text in the given format
    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Ini => Self::parse_ini(text),
            ConfigFormat::Yaml => Self::parse_yaml(text),
        }
    }

    /// Read and parse the file at `path`, picking the format from its name
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StreamError::config_error_with_source(
                format!("cannot read config file {}", path.display()),
                Box::new(e),
            )
        })?;

        Self::parse(&text, ConfigFormat::of(path)).map_err(|e| match e {
            StreamError::Config { reason, source } => StreamError::Config {
                reason: format!("{} in config file {}", reason, path.display()),
                source,
            },
            other => other,
        })
    }
}

impl StreamSection {
    /// Apply one INI `key = value` pair
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "device" => self.device = Some(value.to_string()),
            "width" => self.width = Some(parse_value(key, value)?),
            "height" => self.height = Some(parse_value(key, value)?),
            "depth" => self.depth = Some(parse_value(key, value)?),
            "minthreads" | "min_threads" => self.minthreads = Some(parse_value(key, value)?),
            "maxthreads" | "max_threads" => self.maxthreads = Some(parse_value(key, value)?),
            "port" => self.port = Some(parse_value(key, value)?),
            other => return Err(unknown_key("stream", other)),
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        StreamError::config_error_with_source(
            format!("invalid {} '{}'", key, value),
            Box::new(e),
        )
    })
}

fn unknown_key(section: &str, key: &str) -> StreamError {
    StreamError::config_error(format!("unknown key '{}' in section [{}]", key, section))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ini_file_in_the_classic_layout_parses() {
        let config = FileConfig::parse_ini(
            "[general]\nlog_level = debug\n\n[stream]\ndevice = fb0\nwidth = auto\n\
             height = 240\ndepth = 16\nminthreads = 2\nmaxthreads = 6\nport = 9000\n",
        )
        .unwrap();

        assert_eq!(
            config.general,
            Some(GeneralSection { log_level: Some("debug".to_string()) })
        );
        let stream = config.stream.unwrap();
        assert_eq!(stream.device.as_deref(), Some("fb0"));
        assert_eq!(stream.width, Some(Dimension::Auto));
        assert_eq!(stream.height, Some(Dimension::Explicit(240)));
        assert_eq!(stream.depth, Some(Dimension::Explicit(16)));
        assert_eq!((stream.minthreads, stream.maxthreads), (Some(2), Some(6)));
        assert_eq!(stream.port, Some(9000));
    }

    #[test]
    fn ini_minimal_stream_section() {
        let config = FileConfig::parse_ini("[stream]\ndevice = fb0\nwidth = auto").unwrap();

        assert_eq!(config.general, None);
        let stream = config.stream.unwrap();
        assert_eq!(stream.device.as_deref(), Some("fb0"));
        assert_eq!(stream.width, Some(Dimension::Auto));
        assert_eq!(stream.height, None);
    }

    #[test]
    fn ini_names_are_case_insensitive_and_comments_skipped() {
        let config = FileConfig::parse_ini(
            "; deployed config\n[Stream]\n# panel on SPI\nDevice = fb1\nMaxThreads = 2\n",
        )
        .unwrap();

        let stream = config.stream.unwrap();
        assert_eq!(stream.device.as_deref(), Some("fb1"));
        assert_eq!(stream.maxthreads, Some(2));
    }

    #[test]
    fn ini_other_sections_are_ignored() {
        let config = FileConfig::parse_ini("[display]\nrotate = 90\n[stream]\nport = 8000\n")
            .unwrap();
        assert_eq!(config.stream.unwrap().port, Some(8000));
    }

    #[test]
    fn ini_unknown_keys_and_bad_values_are_errors() {
        let err = FileConfig::parse_ini("[stream]\ncolour = red\n").unwrap_err();
        assert!(err.to_string().contains("colour"), "{}", err);

        let err = FileConfig::parse_ini("[stream]\nwidth = wide\n").unwrap_err();
        assert!(err.to_string().contains("width"), "{}", err);

        assert!(FileConfig::parse_ini("[stream]\nminthreads = -1\n").is_err());
        assert!(FileConfig::parse_ini("[stream]\nport = 70000\n").is_err());
        assert!(FileConfig::parse_ini("[general]\ndebug = yes\n").is_err());
        assert!(FileConfig::parse_ini("device = fb0\n[stream]\n").is_err());
    }

    #[test]
    fn empty_ini_is_an_empty_config() {
        assert_eq!(FileConfig::parse_ini("").unwrap(), FileConfig::default());
        assert_eq!(FileConfig::parse_ini("; nothing\n").unwrap(), FileConfig::default());
    }

    #[test]
    fn full_yaml_file_parses() {
        let config = FileConfig::parse_yaml(
            "general:\n  log_level: debug\nstream:\n  device: fb0\n  width: auto\n  height: 240\n  \
             depth: '16'\n  minthreads: 2\n  maxthreads: 6\n  port: 9000\n",
        )
        .unwrap();

        assert_eq!(
            config.general,
            Some(GeneralSection { log_level: Some("debug".to_string()) })
        );
        let stream = config.stream.unwrap();
        assert_eq!(stream.device.as_deref(), Some("fb0"));
        assert_eq!(stream.width, Some(Dimension::Auto));
        assert_eq!(stream.height, Some(Dimension::Explicit(240)));
        assert_eq!(stream.depth, Some(Dimension::Explicit(16)));
        assert_eq!((stream.minthreads, stream.maxthreads), (Some(2), Some(6)));
        assert_eq!(stream.port, Some(9000));
    }

    #[test]
    fn empty_and_comment_only_yaml_files_are_empty_configs() {
        assert_eq!(FileConfig::parse_yaml("").unwrap(), FileConfig::default());
        assert_eq!(FileConfig::parse_yaml("# nothing here\n\n").unwrap(), FileConfig::default());
    }

    #[test]
    fn yaml_sections_may_be_omitted_or_empty() {
        let config = FileConfig::parse_yaml("general:\nstream:\n  max_threads: 3\n").unwrap();
        assert_eq!(config.general, None);
        assert_eq!(config.stream.unwrap().maxthreads, Some(3));
    }

    #[test]
    fn yaml_unknown_keys_and_bad_values_are_errors() {
        assert!(matches!(
            FileConfig::parse_yaml("stream:\n  colour: red\n"),
            Err(StreamError::Config { .. })
        ));
        assert!(FileConfig::parse_yaml("stream:\n  width: 0\n").is_err());
        assert!(FileConfig::parse_yaml("stream:\n  port: 70000\n").is_err());
        assert!(FileConfig::parse_yaml("stream: [1, 2\n").is_err());
    }

    #[test]
    fn format_follows_the_file_extension() {
        assert_eq!(ConfigFormat::of(Path::new("/etc/fbstream.ini")), ConfigFormat::Ini);
        assert_eq!(ConfigFormat::of(Path::new("/etc/fbstream.conf")), ConfigFormat::Ini);
        assert_eq!(ConfigFormat::of(Path::new("fbstream")), ConfigFormat::Ini);
        assert_eq!(ConfigFormat::of(Path::new("fbstream.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::of(Path::new("fbstream.YML")), ConfigFormat::Yaml);
    }

    #[test]
    fn read_picks_the_format_and_names_the_file_in_errors() {
        let dir = tempfile::tempdir().unwrap();

        let ini = dir.path().join(INI_FILE_NAME);
        std::fs::write(&ini, "[stream]\ndevice = fb0\n").unwrap();
        assert_eq!(FileConfig::read(&ini).unwrap().stream.unwrap().device.as_deref(), Some("fb0"));

        let yaml = dir.path().join(YAML_FILE_NAME);
        std::fs::write(&yaml, "stream:\n  width: wide\n").unwrap();
        let err = FileConfig::read(&yaml).unwrap_err();
        assert!(err.to_string().contains(YAML_FILE_NAME), "{}", err);
    }

    #[test]
    fn search_returns_the_first_hit() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let third = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join(YAML_FILE_NAME), "").unwrap();
        std::fs::write(third.path().join(INI_FILE_NAME), "").unwrap();

        let dirs = vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
            third.path().to_path_buf(),
        ];
        assert_eq!(locate_config_file(&dirs), Some(second.path().join(YAML_FILE_NAME)));
        assert_eq!(locate_config_file(&dirs[..1]), None);
    }

    #[test]
    fn ini_wins_over_yaml_in_the_same_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(YAML_FILE_NAME), "").unwrap();
        std::fs::write(dir.path().join(INI_FILE_NAME), "").unwrap();

        assert_eq!(
            locate_config_file(&[dir.path().to_path_buf()]),
            Some(dir.path().join(INI_FILE_NAME))
        );
    }

    #[test]
    fn default_search_ends_with_system_dirs() {
        let dirs = default_search_dirs();
        assert_eq!(
            &dirs[dirs.len() - 3..],
            &[PathBuf::from("/usr/local/etc/"), PathBuf::from("/etc/"), PathBuf::from("/conf/")]
        );
    }
}
