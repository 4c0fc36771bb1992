//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::cli::HostChoice;

/// File configuration for trackgrab defaults.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// Resolution endpoint URL.
    pub api_endpoint: Option<String>,
    /// Default output directory for browser-host downloads.
    pub output_dir: Option<PathBuf>,
    /// Default download host.
    pub host: Option<HostChoice>,
    /// Storage root for the shell host.
    pub storage_root: Option<PathBuf>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
    /// Optional resolver client connect timeout in seconds.
    pub resolver_connect_timeout_secs: Option<u64>,
    /// Optional resolver client read timeout in seconds.
    pub resolver_read_timeout_secs: Option<u64>,
    /// Optional download client connect timeout in seconds.
    pub download_connect_timeout_secs: Option<u64>,
    /// Optional download client read timeout in seconds.
    pub download_read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.api_endpoint
            && url::Url::parse(endpoint).is_err()
        {
            bail!("Invalid config value for `api_endpoint`: '{endpoint}'. Expected an absolute URL");
        }
        validate_timeout_secs(
            "resolver_connect_timeout_secs",
            self.resolver_connect_timeout_secs,
        )?;
        validate_timeout_secs(
            "resolver_read_timeout_secs",
            self.resolver_read_timeout_secs,
        )?;
        validate_timeout_secs(
            "download_connect_timeout_secs",
            self.download_connect_timeout_secs,
        )?;
        validate_timeout_secs(
            "download_read_timeout_secs",
            self.download_read_timeout_secs,
        )?;
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
    /// Log filter used when neither `RUST_LOG` nor a CLI flag decides.
    #[must_use]
    pub fn filter(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose | Self::Debug => "debug",
            Self::Quiet => "error",
        }
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/trackgrab/config.toml`
/// 2. `$HOME/.config/trackgrab/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("trackgrab")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("trackgrab")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path; a missing file yields the defaults.
pub fn load_default_file_config() -> Result<FileConfig> {
    match resolve_default_config_path() {
        Some(path) if path.exists() => load_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
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
            "api_endpoint" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `api_endpoint` value on line {line_no}"))?;
                cfg.api_endpoint = Some(parsed);
            }
            "output_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output_dir` value on line {line_no}"))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "storage_root" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `storage_root` value on line {line_no}"))?;
                cfg.storage_root = Some(PathBuf::from(parsed));
            }
            "host" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `host` value on line {line_no}"))?;
                cfg.host = Some(parse_host(&parsed).with_context(|| {
                    format!("Invalid `host` value '{parsed}' on line {line_no}")
                })?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `verbosity` value on line {line_no}"))?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            "resolver_connect_timeout_secs" => {
                cfg.resolver_connect_timeout_secs = Some(parse_timeout(key, value, line_no)?);
            }
            "resolver_read_timeout_secs" => {
                cfg.resolver_read_timeout_secs = Some(parse_timeout(key, value, line_no)?);
            }
            "download_connect_timeout_secs" => {
                cfg.download_connect_timeout_secs = Some(parse_timeout(key, value, line_no)?);
            }
            "download_read_timeout_secs" => {
                cfg.download_read_timeout_secs = Some(parse_timeout(key, value, line_no)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn parse_timeout(key: &str, value: &str, line_no: usize) -> Result<u64> {
    parse_integer_u64(value).with_context(|| format!("Invalid `{key}` value on line {line_no}"))
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

fn parse_host(value: &str) -> Result<HostChoice> {
    match value {
        "browser" => Ok(HostChoice::Browser),
        "shell" => Ok(HostChoice::Shell),
        _ => bail!("Expected one of: browser, shell"),
    }
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
