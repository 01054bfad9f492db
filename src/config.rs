//! Settings file handling

use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use xc0424::hid::HidOptions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: UsbConfig,
    pub logging: LoggingConfig,
}

impl Config {
    const FILE_NAME: &'static str = "config.toml";
    const HEADER: &'static str = "\
# xc-sync settings
#
# [device] selects the logger by USB id and tunes the transport.
# strict_checksum rejects responses whose checksum does not match.
# [logging] filter takes tracing directives, RUST_LOG overrides it.

";

    /// Platform directory holding the settings file and logger locks
    pub fn dir() -> Result<PathBuf, Box<dyn Error>> {
        ProjectDirs::from("", "", "xc-sync")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| "could not determine config directory".into())
    }

    /// Load the settings file, writing the defaults on first run
    pub fn load_or_create() -> Result<Self, Box<dyn Error>> {
        Self::load_from(&Self::dir()?.join(Self::FILE_NAME))
    }

    pub fn load_from(path: &Path) -> Result<Self, Box<dyn Error>> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let config = Self::default();
                config.write_to(path)?;
                // stdout is reserved for readings
                eprintln!("created default config at {}", path.display());
                Ok(config)
            },
            Err(e) => Err(e.into()),
        }
    }

    fn write_to(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, format!("{}{contents}", Self::HEADER))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsbConfig {
    /// USB vendor id of the logger
    pub vendor_id: u16,
    /// USB product id of the logger
    pub product_id: u16,
    /// Fixed report size in bytes
    pub frame_size: usize,
    /// How long to wait for each response
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Reject responses with a bad checksum
    pub strict_checksum: bool,
}

impl Default for UsbConfig {
    fn default() -> Self {
        let options = HidOptions::default();
        Self {
            vendor_id: options.vendor_id,
            product_id: options.product_id,
            frame_size: options.frame_size,
            timeout: options.timeout,
            strict_checksum: false,
        }
    }
}

impl UsbConfig {
    pub fn hid_options(&self) -> HidOptions {
        HidOptions {
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            frame_size: self.frame_size,
            timeout: self.timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter directive, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}
