//! Erros do controlador de movimento

use thiserror::Error;

pub type MotionResult<T> = Result<T, MotionError>;

/// Falha reportada pelo transporte (barramento até o hardware)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Escrita rejeitada pelo barramento
    #[error("Bus write failed: {0}")]
    Bus(String),

    /// Dispositivo não responde
    #[error("Device unavailable")]
    Unavailable,
}

/// Erros do controlador
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MotionError {
    /// Configuração inválida (limites, fator de suavização, arquivo)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Índice de canal fora de 0..N
    #[error("Invalid channel {channel} (controller has {count} channels)")]
    InvalidChannel { channel: usize, count: usize },

    /// Ângulo fora da tabela de acionamento
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Falha do transporte num canal
    #[error("Transport failure on channel {channel}: {source}")]
    Transport {
        channel: usize,
        #[source]
        source: TransportError,
    },

    /// Canal não entrou na zona morta
    #[error("Channel {channel} did not converge after {steps} steps")]
    NonConvergence { channel: usize, steps: u32 },

    /// Já existe um movimento em execução
    #[error("Controller busy")]
    Busy,

    /// Erro de leitura/escrita de configuração TOML
    #[error("Config format error: {0}")]
    ConfigFormat(String),

    /// Lock envenenado
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl<T> From<std::sync::PoisonError<T>> for MotionError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        MotionError::LockPoisoned(err.to_string())
    }
}

impl MotionError {
    /// Erro restrito a um único canal (não aborta os demais)
    pub fn is_channel_scoped(&self) -> bool {
        matches!(
            self,
            MotionError::Transport { .. } | MotionError::NonConvergence { .. }
        )
    }
}
