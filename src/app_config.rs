//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use vidfetch_core::QualityPreference;

/// Environment variable that supplies the lookup API key.
pub const API_KEY_ENV: &str = "VIDFETCH_API_KEY";

/// File configuration for vidfetch defaults.
#[derive(Clone, Default)]
pub struct FileConfig {
    /// Default output directory for downloads.
    pub output_dir: Option<PathBuf>,
    /// Default quality preference (`highest`, `720`, `720p`).
    pub quality: Option<String>,
    /// Default attempts per request (1..=10).
    pub max_attempts: Option<u32>,
    /// Metadata lookup endpoint.
    pub lookup_endpoint: Option<String>,
    /// Value for the vendor host header.
    pub api_host: Option<String>,
    /// Lookup API key.
    pub api_key: Option<String>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl std::fmt::Debug for FileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfig")
            .field("output_dir", &self.output_dir)
            .field("quality", &self.quality)
            .field("max_attempts", &self.max_attempts)
            .field("lookup_endpoint", &self.lookup_endpoint)
            .field("api_host", &self.api_host)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("verbosity", &self.verbosity)
            .finish()
    }
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_attempts) = self.max_attempts
            && !(1..=10).contains(&max_attempts)
        {
            bail!("Invalid config value for `max_attempts`: {max_attempts}. Expected range: 1..=10");
        }

        if let Some(quality) = &self.quality {
            quality
                .parse::<QualityPreference>()
                .with_context(|| format!("Invalid config value for `quality`: '{quality}'"))?;
        }

        if let Some(endpoint) = &self.lookup_endpoint {
            url::Url::parse(endpoint).with_context(|| {
                format!("Invalid config value for `lookup_endpoint`: '{endpoint}'")
            })?;
        }

        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;

        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the log filter directive for this mode.
    #[must_use]
    pub fn filter_directive(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/vidfetch/config.toml`
/// 2. `$HOME/.config/vidfetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("vidfetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("vidfetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Reads the API key from the environment, ignoring empty values.
#[must_use]
pub fn api_key_from_env() -> Option<String> {
    env::var(API_KEY_ENV).ok().filter(|key| !key.trim().is_empty())
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig { path, config: None });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig { path, config: None });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_no = line_index + 1;

        match key {
            "output_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output_dir` value on line {line_no}"))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "quality" => {
                // Bare integers are accepted as a convenience: quality = 720
                let parsed = parse_string_literal(value)
                    .or_else(|_| parse_integer_u64(value).map(|n| n.to_string()))
                    .with_context(|| format!("Invalid `quality` value on line {line_no}"))?;
                cfg.quality = Some(parsed);
            }
            "max_attempts" => {
                let parsed = parse_integer_u64(value)
                    .with_context(|| format!("Invalid `max_attempts` value on line {line_no}"))?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("max_attempts out of range for u32"))?;
                cfg.max_attempts = Some(n);
            }
            "lookup_endpoint" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `lookup_endpoint` value on line {line_no}")
                })?;
                cfg.lookup_endpoint = Some(parsed);
            }
            "api_host" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `api_host` value on line {line_no}"))?;
                cfg.api_host = Some(parsed);
            }
            "api_key" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `api_key` value on line {line_no}"))?;
                cfg.api_key = Some(parsed);
            }
            "connect_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `connect_timeout_secs` value on line {line_no}")
                })?;
                cfg.connect_timeout_secs = Some(parsed);
            }
            "read_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `read_timeout_secs` value on line {line_no}")
                })?;
                cfg.read_timeout_secs = Some(parsed);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `verbosity` value on line {line_no}"))?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
max_attempts = 5
verbosity = "verbose"
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.max_attempts, Some(5));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
        assert!(cfg.output_dir.is_none());
    }

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
output_dir = "/tmp/videos"
quality = "720p"
max_attempts = 4
lookup_endpoint = "https://lookup.example/dl"
api_host = "lookup.example"
api_key = "k-123"
connect_timeout_secs = 15
read_timeout_secs = 120
verbosity = "quiet"
"#,
        )
        .expect("full config should parse");
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/tmp/videos")));
        assert_eq!(cfg.quality.as_deref(), Some("720p"));
        assert_eq!(cfg.max_attempts, Some(4));
        assert_eq!(cfg.lookup_endpoint.as_deref(), Some("https://lookup.example/dl"));
        assert_eq!(cfg.api_host.as_deref(), Some("lookup.example"));
        assert_eq!(cfg.api_key.as_deref(), Some("k-123"));
        assert_eq!(cfg.connect_timeout_secs, Some(15));
        assert_eq!(cfg.read_timeout_secs, Some(120));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Quiet));
    }

    #[test]
    fn test_parse_config_quality_accepts_bare_integer() {
        let cfg = parse_config_str("quality = 480").expect("bare integer quality should parse");
        assert_eq!(cfg.quality.as_deref(), Some("480"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_quality() {
        let err = parse_config_str(r#"quality = "best""#).expect_err("invalid quality expected");
        assert!(err.to_string().contains("quality"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_max_attempts() {
        let err = parse_config_str("max_attempts = 0").expect_err("invalid max_attempts expected");
        assert!(err.to_string().contains("max_attempts"));

        let err = parse_config_str("max_attempts = 11").expect_err("above range expected");
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err = parse_config_str("max_attempts = 4 trailing")
            .expect_err("expected trailing token error");
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_endpoint() {
        let err = parse_config_str(r#"lookup_endpoint = "not a url""#)
            .expect_err("invalid endpoint expected");
        assert!(err.to_string().contains("lookup_endpoint"));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
max_attempts = 2 # keep it short
api_host = "host#1" # hash inside string is kept
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.max_attempts, Some(2));
        assert_eq!(cfg.api_host.as_deref(), Some("host#1"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_timeout_value() {
        let err =
            parse_config_str("connect_timeout_secs = 0").expect_err("invalid timeout expected");
        assert!(err.to_string().contains("connect_timeout_secs"));

        let err =
            parse_config_str("read_timeout_secs = 3601").expect_err("invalid timeout expected");
        assert!(err.to_string().contains("read_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_string() {
        let err = parse_config_str("output_dir = /tmp").expect_err("unquoted string expected");
        assert!(err.to_string().contains("output_dir"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("output_dir").expect_err("syntax error expected");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("unknown_key = 123").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("unknown_key"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let cfg = parse_config_str(r#"api_key = "top-secret""#).expect("api_key should parse");
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("top-secret"));
    }

    #[test]
    fn test_verbosity_filter_directive() {
        assert_eq!(VerbositySetting::Default.filter_directive(), "info");
        assert_eq!(VerbositySetting::Verbose.filter_directive(), "debug");
        assert_eq!(VerbositySetting::Quiet.filter_directive(), "error");
        assert_eq!(VerbositySetting::Debug.filter_directive(), "trace");
    }
}
