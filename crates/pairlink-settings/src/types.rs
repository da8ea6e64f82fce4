use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PairlinkSettings {
    pub server: ServerSettings,
    pub dispatch: DispatchSettings,
    pub qr: QrSettings,
    pub logging: LoggingSettings,
}

/// Widest quiet zone accepted, in modules.
pub const MAX_QR_BORDER: u32 = 64;

impl PairlinkSettings {
    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        let rate = self.dispatch.failure_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(SettingsError::InvalidValue(format!(
                "dispatch.failureRate must be within [0, 1], got {rate}"
            )));
        }
        if self.dispatch.min_latency_ms > self.dispatch.max_latency_ms {
            return Err(SettingsError::InvalidValue(format!(
                "dispatch.minLatencyMs ({}) exceeds maxLatencyMs ({})",
                self.dispatch.min_latency_ms, self.dispatch.max_latency_ms
            )));
        }
        if self.qr.module_size == 0 {
            return Err(SettingsError::InvalidValue(
                "qr.moduleSize must be positive".to_string(),
            ));
        }
        if self.qr.border > MAX_QR_BORDER {
            return Err(SettingsError::InvalidValue(format!(
                "qr.border must be at most {MAX_QR_BORDER} modules, got {}",
                self.qr.border
            )));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port. `0` picks an ephemeral port.
    pub port: u16,
    /// Identity used by `simulate_connect` when the request names none.
    pub default_phone: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            default_phone: "919876543210".to_string(),
        }
    }
}

/// Send simulation knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchSettings {
    /// Probability that a dispatch task fails.
    pub failure_rate: f64,
    /// Lower bound of the simulated send latency.
    pub min_latency_ms: u64,
    /// Upper bound of the simulated send latency.
    pub max_latency_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            failure_rate: 0.10,
            min_latency_ms: 0,
            max_latency_ms: 250,
        }
    }
}

/// Pairing code image settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QrSettings {
    /// Pixels per module.
    pub module_size: u32,
    /// Quiet zone in modules.
    pub border: u32,
}

impl Default for QrSettings {
    fn default() -> Self {
        Self {
            module_size: 10,
            border: 4,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive. `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
