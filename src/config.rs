//! Optional settings file supplying defaults for output, scanning, polling and serial links.
//!
//! The file is TOML or JSON, chosen by extension. Every section and field may be omitted.

use crate::error::{Error, Result};
use crate::output::{OutputFormat, OutputOptions};
use crate::scan::{DEFAULT_WINDOW_SIZE, ScanPlan};
use crate::util::str;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tokio_serial::{DataBits, Parity, SerialPortBuilder, StopBits};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum FileType {
    Toml,
    Json,
}

impl FileType {
    /// Pick the file type from the extension, TOML unless it is `.json`.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub output: OutputSettings,
    pub session: SessionSettings,
    pub scan: ScanSettings,
    pub poll: PollSettings,
    pub serial: SerialSettings,
}

impl Settings {
    /// Read settings from file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match FileType::from_path(path) {
            FileType::Json => {
                let file = File::open(path).map_err(|e| Error::Config(e.to_string()))?;
                serde_json::from_reader(BufReader::new(file))
                    .map_err(|e| Error::Config(e.to_string()))
            }
            FileType::Toml => {
                let content =
                    std::fs::read_to_string(path).map_err(|e| Error::Config(e.to_string()))?;
                Self::from_toml(&content)
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub verbose: bool,
    pub quiet: bool,
    /// Colors are used unless disabled here or through `NO_COLOR`.
    pub no_color: bool,
}

impl OutputSettings {
    pub fn options(&self) -> OutputOptions {
        let colors = !self.no_color
            && self.format == OutputFormat::Human
            && std::env::var_os("NO_COLOR").is_none_or(|v| v.is_empty());
        OutputOptions {
            format: self.format,
            verbose: self.verbose,
            quiet: self.quiet,
            colors_enabled: colors,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    pub unit_id: u8,
    pub timeout_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            unit_id: 1,
            timeout_ms: 5000,
        }
    }
}

impl SessionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ScanSettings {
    pub window_size: u32,
    /// Defaults to the window size, giving non-overlapping windows.
    pub step: Option<u32>,
    pub include_partial: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            step: None,
            include_partial: true,
        }
    }
}

impl ScanSettings {
    pub fn plan(&self, start: u32, end: u32) -> ScanPlan {
        ScanPlan::new(start, end)
            .window_size(self.window_size)
            .step(self.step.unwrap_or(self.window_size))
            .include_partial(self.include_partial)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PollSettings {
    /// Number of iterations, `0` polls until interrupted.
    pub count: u32,
    pub interval_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            count: 1,
            interval_ms: 1000,
        }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SerialSettings {
    pub baud_rate: u32,
    /// 5, 6, 7 or 8
    pub data_bits: u8,
    /// `N`, `E` or `O`
    pub parity: String,
    /// 1 or 2
    pub stop_bits: u8,
    /// RS-485 transceiver mode, not available through the serial backend.
    pub rs485: bool,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: 8,
            parity: str!("N"),
            stop_bits: 1,
            rs485: false,
        }
    }
}

impl SerialSettings {
    pub fn data_bits(&self) -> Result<DataBits> {
        match self.data_bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            v => Err(Error::validation(format!(
                "data bits must be 5, 6, 7, or 8 (got {v})"
            ))),
        }
    }

    pub fn stop_bits(&self) -> Result<StopBits> {
        match self.stop_bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            v => Err(Error::validation(format!(
                "stop bits must be 1 or 2 (got {v})"
            ))),
        }
    }

    pub fn parity(&self) -> Result<Parity> {
        match self.parity.trim().to_uppercase().as_str() {
            "N" | "NONE" => Ok(Parity::None),
            "E" | "EVEN" => Ok(Parity::Even),
            "O" | "ODD" => Ok(Parity::Odd),
            _ => Err(Error::validation(format!(
                "parity must be N, E, or O (got '{}')",
                self.parity
            ))),
        }
    }

    /// Serial port builder for `path` with the configured line settings.
    pub fn builder(&self, path: &str, timeout: Duration) -> Result<SerialPortBuilder> {
        if self.rs485 {
            return Err(Error::validation(
                "RS-485 mode is not supported by the serial backend",
            ));
        }
        Ok(tokio_serial::new(path, self.baud_rate)
            .data_bits(self.data_bits()?)
            .stop_bits(self.stop_bits()?)
            .parity(self.parity()?)
            .timeout(timeout))
    }
}
