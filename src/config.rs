//! Command line configuration

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;

use crate::looper::ReportFormat;
use crate::registry::LooperSpec;

/// Micro looper: press a key to record, again to stop, again to play in loop
#[derive(Parser, Debug, Clone)]
#[command(name = "milo")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Root record directory
    #[arg(short, long, default_value = "records")]
    pub path: PathBuf,

    /// Keyboard characters, one looper per character
    #[arg(short, long, default_value = "123", value_parser = parse_keys)]
    pub keys: String,

    /// Capture PCM device, e.g. "hw:1,0" (see `arecord -l`)
    #[arg(short = 'D', long, default_value = "hw:0,0")]
    pub device: String,

    /// Show stderr of arecord and mplayer
    #[arg(short, long)]
    pub verbose: bool,

    /// Format of the state report written to stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Keys must be distinct, visible characters: whitespace never reaches the
/// registry as a trigger
fn parse_keys(keys: &str) -> Result<String, String> {
    if keys.is_empty() {
        return Err("at least one key is required".to_string());
    }
    for (i, key) in keys.chars().enumerate() {
        if key.is_whitespace() {
            return Err(format!("whitespace cannot be used as a key (position {})", i + 1));
        }
        if keys.chars().take(i).any(|k| k == key) {
            return Err(format!("key {:?} is listed more than once", key));
        }
    }
    Ok(keys.to_string())
}

impl Config {
    /// Directory for this session's takes: `<path>/rec_<YYYYmmdd-HHMMSS>`
    pub fn record_dir(&self, now: DateTime<Local>) -> PathBuf {
        self.path
            .join(format!("rec_{}", now.format("%Y%m%d-%H%M%S")))
    }

    /// Create the record directory
    pub fn ensure_dir(dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create record directory {}", dir.display()))?;
        Ok(())
    }

    /// One looper per key, recording to `rec_<key>.raw` under `record_dir`
    pub fn looper_specs(&self, record_dir: &Path) -> Vec<LooperSpec> {
        self.keys
            .chars()
            .map(|key| LooperSpec {
                key,
                tag: format!("LOOP_{}", key),
                file: record_dir.join(format!("rec_{}.raw", key)),
                device: self.device.clone(),
                debug: self.verbose,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["milo"]);
        assert_eq!(config.path, PathBuf::from("records"));
        assert_eq!(config.keys, "123");
        assert_eq!(config.device, "hw:0,0");
        assert!(!config.verbose);
        assert_eq!(config.format, ReportFormat::Text);
    }

    #[test]
    fn test_short_flags() {
        let config = Config::parse_from([
            "milo", "-p", "/tmp/takes", "-k", "ab", "-D", "hw:1,0", "-v", "--format", "json",
        ]);
        assert_eq!(config.path, PathBuf::from("/tmp/takes"));
        assert_eq!(config.keys, "ab");
        assert_eq!(config.device, "hw:1,0");
        assert!(config.verbose);
        assert_eq!(config.format, ReportFormat::Json);
    }

    #[test]
    fn test_whitespace_key_rejected() {
        for keys in ["1 2", "12\t", " "] {
            assert!(
                Config::try_parse_from(["milo", "-k", keys]).is_err(),
                "accepted {keys:?}"
            );
        }
    }

    #[test]
    fn test_empty_and_repeated_keys_rejected() {
        assert!(Config::try_parse_from(["milo", "-k", ""]).is_err());
        assert!(Config::try_parse_from(["milo", "-k", "121"]).is_err());
    }

    #[test]
    fn test_every_key_is_reachable() {
        let config = Config::parse_from(["milo", "-k", "a1?"]);
        let specs = config.looper_specs(Path::new("records"));
        let reachable: String = crate::trigger::keys_in(&config.keys).collect();

        assert_eq!(
            specs.iter().map(|s| s.key).collect::<String>(),
            reachable
        );
    }

    #[test]
    fn test_record_dir_is_timestamped() {
        let config = Config::parse_from(["milo"]);
        let now = Local.with_ymd_and_hms(2016, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            config.record_dir(now),
            PathBuf::from("records/rec_20160304-050607")
        );
    }

    #[test]
    fn test_looper_specs() {
        let config = Config::parse_from(["milo", "-k", "12", "-D", "hw:2,0", "-v"]);
        let specs = config.looper_specs(Path::new("records/rec_x"));

        assert_eq!(specs.len(), 2);
        assert_eq!(
            specs[1],
            LooperSpec {
                key: '2',
                tag: "LOOP_2".to_string(),
                file: PathBuf::from("records/rec_x/rec_2.raw"),
                device: "hw:2,0".to_string(),
                debug: true,
            }
        );
    }

    #[test]
    fn test_ensure_dir() {
        let dir = std::env::temp_dir().join(format!("miclooper-test-{}", std::process::id()));
        let nested = dir.join("rec_now");
        Config::ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
