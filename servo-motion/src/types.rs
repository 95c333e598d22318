//! Tipos de dados do controlador

use serde::{Deserialize, Serialize};
use crate::error::{MotionError, MotionResult};

/// Estado de um canal na máquina de movimento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelStatus {
    /// Parado no alvo (ou sem tarefa em execução)
    #[default]
    Idle,
    /// Convergindo para o alvo
    Converging,
    /// Última execução falhou neste canal
    Fault,
}

/// Fotografia pública do estado de um canal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    /// Índice do canal (0..N)
    pub index: usize,
    /// Limite mínimo (graus)
    pub min_angle: f64,
    /// Limite máximo (graus)
    pub max_angle: f64,
    /// Último ângulo escrito
    pub current_angle: f64,
    /// Ângulo comandado
    pub target_angle: f64,
    /// Fração do erro corrigida por passo
    pub smoothing_factor: f64,
    /// Status atual
    pub status: ChannelStatus,
    /// Entradas da tabela de acionamento
    pub table_len: usize,
    /// Revisão da reconstrução de tabelas que gerou a tabela deste canal
    pub table_revision: u64,
}

/// Resultado de um canal numa execução
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelResult {
    /// Chegou exatamente ao alvo
    Converged,
    /// Interrompido por cancelamento
    Cancelled,
    /// Abortado por erro (transporte ou não-convergência)
    Failed(MotionError),
}

/// Resumo de um canal ao fim de uma execução
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelOutcome {
    pub channel: usize,
    /// Passos de movimento executados (a escrita final não conta)
    pub steps: u32,
    pub result: ChannelResult,
}

impl ChannelOutcome {
    pub fn converged(&self) -> bool {
        self.result == ChannelResult::Converged
    }

    /// Converte o resultado em `Result`, expondo o erro do canal
    pub fn into_result(self) -> MotionResult<u32> {
        match self.result {
            ChannelResult::Converged => Ok(self.steps),
            ChannelResult::Cancelled => Ok(self.steps),
            ChannelResult::Failed(err) => Err(err),
        }
    }
}

/// Relatório de uma execução multi-canal
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunReport {
    pub outcomes: Vec<ChannelOutcome>,
}

impl RunReport {
    /// Todos os canais convergiram
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ChannelOutcome::converged)
    }

    /// Algum canal foi cancelado
    pub fn was_cancelled(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.result == ChannelResult::Cancelled)
    }

    pub fn total_steps(&self) -> u32 {
        self.outcomes.iter().map(|o| o.steps).sum()
    }

    /// Maior número de passos entre os canais (define a duração da execução)
    pub fn max_steps(&self) -> u32 {
        self.outcomes.iter().map(|o| o.steps).max().unwrap_or(0)
    }

    pub fn outcome(&self, channel: usize) -> Option<&ChannelOutcome> {
        self.outcomes.iter().find(|o| o.channel == channel)
    }

    /// Canais que falharam com o respectivo erro
    pub fn failures(&self) -> Vec<(usize, &MotionError)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.result {
                ChannelResult::Failed(err) => Some((o.channel, err)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    fn outcome(channel: usize, steps: u32, result: ChannelResult) -> ChannelOutcome {
        ChannelOutcome { channel, steps, result }
    }

    #[test]
    fn test_report_success() {
        let report = RunReport {
            outcomes: vec![
                outcome(0, 3, ChannelResult::Converged),
                outcome(1, 7, ChannelResult::Converged),
            ],
        };
        assert!(report.is_success());
        assert_eq!(report.total_steps(), 10);
        assert_eq!(report.max_steps(), 7);
        assert!(report.failures().is_empty());
    }

    #[test]
    fn test_report_failures() {
        let err = MotionError::Transport {
            channel: 1,
            source: TransportError::Unavailable,
        };
        let report = RunReport {
            outcomes: vec![
                outcome(0, 3, ChannelResult::Converged),
                outcome(1, 2, ChannelResult::Failed(err.clone())),
                outcome(2, 1, ChannelResult::Cancelled),
            ],
        };
        assert!(!report.is_success());
        assert!(report.was_cancelled());
        assert_eq!(report.failures(), vec![(1, &err)]);
        assert_eq!(report.outcome(1).unwrap().clone().into_result(), Err(err));
    }

    #[test]
    fn test_empty_report() {
        let report = RunReport::default();
        assert!(report.is_success());
        assert_eq!(report.max_steps(), 0);
    }

    #[test]
    fn test_default_status() {
        assert_eq!(ChannelStatus::default(), ChannelStatus::Idle);
    }
}
