//! Configuração do controlador (TOML)
//!
//! Guarda apenas o que o controlador persiste: resolução, ritmo do motor e,
//! por canal, limites de calibração e fator de suavização.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::calibration::{validate_bound, DRIVE_MAX_16BIT};
use crate::channel::DEFAULT_SMOOTHING;
use crate::error::{MotionError, MotionResult};

/// Configuração completa do controlador
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Número de canais (fixo durante a vida do controlador)
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,

    /// Valor máximo de acionamento (65535 para 16 bits)
    #[serde(default = "default_drive_max")]
    pub drive_max: u32,

    /// Intervalo entre passos de movimento (ms)
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Ângulo inicial assumido para todos os canais
    #[serde(default)]
    pub rest_angle: f64,

    /// Limite de passos por canal antes de declarar não-convergência
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Rejeitar fatores de suavização fora de (0, 1]
    #[serde(default)]
    pub strict_smoothing: bool,

    /// Fator de suavização inicial
    #[serde(default = "default_smoothing")]
    pub default_smoothing: f64,

    /// Ajustes por canal
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

/// Ajustes de um canal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub index: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_angle: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_angle: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing_factor: Option<f64>,
}

impl ChannelConfig {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            min_angle: None,
            max_angle: None,
            smoothing_factor: None,
        }
    }
}

fn default_channel_count() -> usize {
    8
}

fn default_drive_max() -> u32 {
    DRIVE_MAX_16BIT
}

fn default_pacing_ms() -> u64 {
    10
}

fn default_max_steps() -> u32 {
    10_000
}

fn default_smoothing() -> f64 {
    DEFAULT_SMOOTHING
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            channel_count: default_channel_count(),
            drive_max: default_drive_max(),
            pacing_ms: default_pacing_ms(),
            rest_angle: 0.0,
            max_steps: default_max_steps(),
            strict_smoothing: false,
            default_smoothing: default_smoothing(),
            channels: Vec::new(),
        }
    }
}

/// Fator aceitável no modo estrito
pub fn is_valid_smoothing(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value <= 1.0
}

impl ControllerConfig {
    /// Configuração padrão com `channel_count` canais
    pub fn with_channels(channel_count: usize) -> Self {
        Self {
            channel_count,
            ..Default::default()
        }
    }

    /// Lê de uma string TOML e valida
    pub fn from_str(content: &str) -> MotionResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| MotionError::ConfigFormat(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Lê de um arquivo TOML
    pub fn from_file(path: &Path) -> MotionResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MotionError::ConfigFormat(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Serializa para TOML
    pub fn to_string(&self) -> MotionResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| MotionError::ConfigFormat(format!("Failed to serialize config: {}", e)))
    }

    /// Grava em arquivo TOML
    pub fn save(&self, path: &Path) -> MotionResult<()> {
        let content = self.to_string()?;
        std::fs::write(path, content).map_err(|e| {
            MotionError::ConfigFormat(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Ajustes de um canal, se existirem
    pub fn channel(&self, index: usize) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.index == index)
    }

    /// Valida valores globais e por canal
    pub fn validate(&self) -> MotionResult<()> {
        if self.channel_count == 0 {
            return Err(MotionError::InvalidConfig(
                "channel_count must be at least 1".into(),
            ));
        }
        if self.drive_max == 0 {
            return Err(MotionError::InvalidConfig("drive_max must be positive".into()));
        }
        if self.max_steps == 0 {
            return Err(MotionError::InvalidConfig("max_steps must be positive".into()));
        }
        if !self.rest_angle.is_finite() {
            return Err(MotionError::InvalidConfig("rest_angle must be finite".into()));
        }
        self.check_smoothing(self.default_smoothing)?;

        let mut seen = HashSet::new();
        for channel in &self.channels {
            if channel.index >= self.channel_count {
                return Err(MotionError::InvalidChannel {
                    channel: channel.index,
                    count: self.channel_count,
                });
            }
            if !seen.insert(channel.index) {
                return Err(MotionError::InvalidConfig(format!(
                    "Channel {} configured more than once",
                    channel.index
                )));
            }

            let min = channel.min_angle.unwrap_or(crate::channel::DEFAULT_MIN_ANGLE);
            let max = channel.max_angle.unwrap_or(crate::channel::DEFAULT_MAX_ANGLE);
            if validate_bound(min)? > validate_bound(max)? {
                return Err(MotionError::InvalidConfig(format!(
                    "Channel {}: min_angle ({}°) exceeds max_angle ({}°)",
                    channel.index, min, max
                )));
            }
            if let Some(factor) = channel.smoothing_factor {
                self.check_smoothing(factor)?;
            }
        }
        Ok(())
    }

    fn check_smoothing(&self, value: f64) -> MotionResult<()> {
        if !value.is_finite() || (self.strict_smoothing && !is_valid_smoothing(value)) {
            return Err(MotionError::InvalidConfig(format!(
                "Smoothing factor must be in (0, 1], got {}",
                value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.channel_count, 8);
        assert_eq!(config.drive_max, 65_535);
        assert_eq!(config.pacing(), Duration::from_millis(10));
        assert_eq!(config.default_smoothing, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal() {
        let config = ControllerConfig::from_str("").unwrap();
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn test_parse_channels() {
        let toml = r#"
channel_count = 4
drive_max = 4095
pacing_ms = 20

[[channels]]
index = 2
min_angle = 30.0
max_angle = 150.0
smoothing_factor = 0.5

[[channels]]
index = 3
smoothing_factor = 0.9
"#;
        let config = ControllerConfig::from_str(toml).unwrap();
        assert_eq!(config.channel_count, 4);
        assert_eq!(config.drive_max, 4095);
        assert_eq!(config.pacing_ms, 20);
        let ch2 = config.channel(2).unwrap();
        assert_eq!(ch2.min_angle, Some(30.0));
        assert_eq!(ch2.max_angle, Some(150.0));
        assert_eq!(config.channel(3).unwrap().min_angle, None);
        assert!(config.channel(0).is_none());
    }

    #[test]
    fn test_roundtrip() {
        let mut config = ControllerConfig::with_channels(2);
        config.channels.push(ChannelConfig {
            index: 1,
            min_angle: Some(20.0),
            max_angle: Some(160.0),
            smoothing_factor: Some(0.25),
        });
        let text = config.to_string().unwrap();
        assert_eq!(ControllerConfig::from_str(&text).unwrap(), config);
    }

    #[test]
    fn test_reject_unknown_channel() {
        let toml = "channel_count = 2\n[[channels]]\nindex = 5\n";
        assert!(matches!(
            ControllerConfig::from_str(toml),
            Err(MotionError::InvalidChannel { channel: 5, count: 2 })
        ));
    }

    #[test]
    fn test_reject_duplicate_channel() {
        let toml = "[[channels]]\nindex = 1\n[[channels]]\nindex = 1\n";
        assert!(ControllerConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_reject_inverted_bounds() {
        let toml = "[[channels]]\nindex = 0\nmin_angle = 120.0\nmax_angle = 60.0\n";
        assert!(matches!(
            ControllerConfig::from_str(toml),
            Err(MotionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_strict_smoothing() {
        let mut config = ControllerConfig::default();
        config.default_smoothing = 1.5;
        assert!(config.validate().is_ok());
        config.strict_smoothing = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ControllerConfig::from_str("channel_count = \"eight\""),
            Err(MotionError::ConfigFormat(_))
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("servo-motion-{}.toml", std::process::id()));
        let config = ControllerConfig::with_channels(3);
        config.save(&path).unwrap();
        let loaded = ControllerConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
