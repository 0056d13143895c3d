//! Application configuration loading for CLI defaults.
//!
//! The config file is a flat `key = value` file at
//! `$XDG_CONFIG_HOME/media-acquire/config.toml` (or
//! `$HOME/.config/media-acquire/config.toml`). CLI flags override it.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// File configuration for endpoints, timeouts, and defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Relay base URLs in priority order.
    pub relays: Option<Vec<String>>,
    /// Quota service endpoint.
    pub quota_endpoint: Option<String>,
    /// Parse API endpoint.
    pub parse_endpoint: Option<String>,
    /// Identity exchange endpoint.
    pub auth_endpoint: Option<String>,
    /// Where saved media and archives go.
    pub output_dir: Option<PathBuf>,
    /// Where the fingerprint and session files live.
    pub state_dir: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,
    pub response_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(relays) = &self.relays
            && relays.is_empty()
        {
            bail!("Invalid config value for `relays`: expected at least one relay URL");
        }
        if let Some(relays) = &self.relays {
            for relay in relays {
                validate_http_url("relays", relay)?;
            }
        }
        for (field, value) in [
            ("quota_endpoint", &self.quota_endpoint),
            ("parse_endpoint", &self.parse_endpoint),
            ("auth_endpoint", &self.auth_endpoint),
        ] {
            if let Some(value) = value {
                validate_http_url(field, value)?;
            }
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("response_timeout_secs", self.response_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .with_context(|| format!("Invalid config value for `{field}`: '{value}' is not a URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Invalid config value for `{field}`: '{value}' must use http or https");
    }
    Ok(())
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
    /// Log level this setting maps to when no CLI flag overrides it.
    #[must_use]
    pub fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config, or defaults when no file exists.
    pub config: FileConfig,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/media-acquire/config.toml`
/// 2. `$HOME/.config/media-acquire/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("media-acquire")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("media-acquire")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `explicit` when given, else from the default path if present.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: load_file_config(path)?,
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => load_file_config(path_ref)?,
        _ => FileConfig::default(),
    };
    Ok(LoadedConfig { path, config })
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
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "relays" => {
                cfg.relays = Some(parse_string_array(value).with_context(invalid)?);
            }
            "quota_endpoint" => {
                cfg.quota_endpoint = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "parse_endpoint" => {
                cfg.parse_endpoint = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "auth_endpoint" => {
                cfg.auth_endpoint = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "output_dir" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "state_dir" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.state_dir = Some(PathBuf::from(parsed));
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "response_timeout_secs" => {
                cfg.response_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
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
    let raw_value = raw_value.trim();
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

/// Parses a single-line `["a", "b"]` array of strings.
fn parse_string_array(raw_value: &str) -> Result<Vec<String>> {
    let Some(inner) = raw_value
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        bail!("Expected array of double-quoted strings");
    };

    let mut items = Vec::new();
    let mut in_string = false;
    let mut start = 0;
    for (index, ch) in inner.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            ',' if !in_string => {
                push_array_item(&mut items, &inner[start..index])?;
                start = index + 1;
            }
            _ => {}
        }
    }
    if in_string {
        bail!("Unterminated string in array");
    }
    push_array_item(&mut items, &inner[start..])?;
    Ok(items)
}

fn push_array_item(items: &mut Vec<String>, raw_item: &str) -> Result<()> {
    // A trailing comma leaves an empty final segment.
    if raw_item.trim().is_empty() {
        return Ok(());
    }
    items.push(parse_string_literal(raw_item)?);
    Ok(())
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
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_full() {
        let cfg = parse_config_str(
            r#"
relays = ["https://r1.example/api", "https://r2.example/api?x=1,2"]
quota_endpoint = "https://quota.example/usage"
parse_endpoint = "https://parse.example/parse"
auth_endpoint = "https://auth.example/me"
output_dir = "/tmp/media"
state_dir = "/tmp/state"
connect_timeout_secs = 5
response_timeout_secs = 20
read_timeout_secs = 40
verbosity = "verbose"
"#,
        )
        .expect("full config should parse");
        assert_eq!(
            cfg.relays,
            Some(vec![
                "https://r1.example/api".to_string(),
                "https://r2.example/api?x=1,2".to_string()
            ])
        );
        assert_eq!(cfg.quota_endpoint.as_deref(), Some("https://quota.example/usage"));
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/tmp/media")));
        assert_eq!(cfg.state_dir, Some(PathBuf::from("/tmp/state")));
        assert_eq!(cfg.connect_timeout_secs, Some(5));
        assert_eq!(cfg.response_timeout_secs, Some(20));
        assert_eq!(cfg.read_timeout_secs, Some(40));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
    }

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(r#"verbosity = "quiet" # noise level"#)
            .expect("partial config should parse");
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Quiet));
        assert!(cfg.relays.is_none());
        assert!(cfg.output_dir.is_none());
    }

    #[test]
    fn test_parse_string_array_trailing_comma_and_spacing() {
        let items = parse_string_array(r#"[ "a" , "b", ]"#).unwrap();
        assert_eq!(items, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_string_array_rejects_bare_values() {
        assert!(parse_string_array("[a, b]").is_err());
        assert!(parse_string_array(r#""a""#).is_err());
        assert!(parse_string_array(r#"["a]"#).is_err());
    }

    #[test]
    fn test_parse_config_rejects_empty_relays() {
        let err = parse_config_str("relays = []").expect_err("empty relay list expected");
        assert!(err.to_string().contains("relays"));
    }

    #[test]
    fn test_parse_config_rejects_non_http_relay() {
        let err = parse_config_str(r#"relays = ["ftp://r.example"]"#)
            .expect_err("non-http relay expected");
        assert!(err.to_string().contains("relays"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_timeout_value() {
        let err = parse_config_str("read_timeout_secs = 0").expect_err("invalid timeout expected");
        assert!(err.to_string().contains("read_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err = parse_config_str("connect_timeout_secs = 4 trailing")
            .expect_err("expected trailing token error");
        assert!(err.to_string().contains("connect_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("unknown_key = 123").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("unknown_key"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("relays").expect_err("syntax error expected");
        assert!(err.to_string().contains("expected key = value"));
    }

    #[test]
    fn test_verbosity_log_levels() {
        assert_eq!(VerbositySetting::Default.log_level(), "info");
        assert_eq!(VerbositySetting::Verbose.log_level(), "debug");
        assert_eq!(VerbositySetting::Quiet.log_level(), "error");
        assert_eq!(VerbositySetting::Debug.log_level(), "trace");
    }

    #[test]
    fn test_load_config_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, r#"output_dir = "/srv/media""#).unwrap();

        let loaded = load_config(Some(&path)).unwrap();

        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.config.output_dir, Some(PathBuf::from("/srv/media")));
    }

    #[test]
    fn test_load_config_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }
}
