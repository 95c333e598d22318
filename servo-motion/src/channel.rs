//! Estado por canal: limites, alvo, ângulo atual e passo de suavização

use crate::calibration::DriveTable;
use crate::error::MotionResult;
use crate::types::{ChannelState, ChannelStatus};

/// Tolerância angular abaixo da qual o canal chegou ao alvo (graus)
pub const DEADBAND_DEG: f64 = 1.0;

/// Passo mínimo quando o arredondamento anularia o movimento (graus)
pub const MIN_STEP_DEG: f64 = 1.0;

/// Limites padrão de um canal recém-criado
pub const DEFAULT_MIN_ANGLE: f64 = 0.0;
pub const DEFAULT_MAX_ANGLE: f64 = 180.0;

/// Fator de suavização padrão
pub const DEFAULT_SMOOTHING: f64 = 0.1;

/// Canal físico (um servo)
#[derive(Debug, Clone)]
pub struct Channel {
    min_angle: f64,
    max_angle: f64,
    current_angle: f64,
    target_angle: f64,
    smoothing_factor: f64,
    status: ChannelStatus,
    table: DriveTable,
    table_revision: u64,
}

impl Channel {
    /// Cria canal com curso completo, parado em `rest_angle`
    pub fn new(rest_angle: f64, smoothing_factor: f64, drive_max: u32) -> MotionResult<Self> {
        let table = DriveTable::build(DEFAULT_MIN_ANGLE, DEFAULT_MAX_ANGLE, drive_max)?;
        Ok(Self {
            min_angle: DEFAULT_MIN_ANGLE,
            max_angle: DEFAULT_MAX_ANGLE,
            current_angle: rest_angle,
            target_angle: rest_angle.clamp(DEFAULT_MIN_ANGLE, DEFAULT_MAX_ANGLE),
            smoothing_factor,
            status: ChannelStatus::Idle,
            table,
            table_revision: 0,
        })
    }

    pub fn min_angle(&self) -> f64 {
        self.min_angle
    }

    pub fn max_angle(&self) -> f64 {
        self.max_angle
    }

    pub fn current_angle(&self) -> f64 {
        self.current_angle
    }

    pub fn target_angle(&self) -> f64 {
        self.target_angle
    }

    pub fn smoothing_factor(&self) -> f64 {
        self.smoothing_factor
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn table(&self) -> &DriveTable {
        &self.table
    }

    pub(crate) fn set_status(&mut self, status: ChannelStatus) {
        self.status = status;
    }

    /// Troca os limites. A tabela é reconstruída depois, para todos os canais.
    ///
    /// Retorna `true` quando o alvo precisou ser reajustado aos novos limites.
    pub(crate) fn set_bounds(&mut self, min_angle: f64, max_angle: f64) -> bool {
        self.min_angle = min_angle;
        self.max_angle = max_angle;
        let clamped = self.clamp(self.target_angle);
        let moved = clamped != self.target_angle;
        self.target_angle = clamped;
        moved
    }

    /// Reconstrói a tabela inteira a partir dos limites atuais
    pub(crate) fn rebuild_table(&mut self, drive_max: u32, revision: u64) -> MotionResult<()> {
        self.table = DriveTable::build(self.min_angle, self.max_angle, drive_max)?;
        self.table_revision = revision;
        Ok(())
    }

    /// Limita um ângulo ao curso do canal
    pub fn clamp(&self, angle: f64) -> f64 {
        angle.clamp(self.min_angle, self.max_angle)
    }

    /// Define o alvo absoluto, limitado ao curso; retorna o valor armazenado
    pub fn set_target(&mut self, angle: f64) -> f64 {
        self.target_angle = self.clamp(angle);
        self.target_angle
    }

    /// Converte uma fração do curso em ângulo inteiro (sem limitar).
    ///
    /// Empates arredondam para o par: 0.5 em `[0, 1]` dá 0°.
    pub fn fractional_angle(&self, fraction: f64) -> f64 {
        (self.min_angle + (self.max_angle - self.min_angle) * fraction).round_ties_even()
    }

    pub fn set_smoothing_factor(&mut self, value: f64) {
        self.smoothing_factor = value;
    }

    /// Fora da zona morta?
    pub fn needs_motion(&self) -> bool {
        (self.current_angle - self.target_angle).abs() > DEADBAND_DEG
    }

    /// Próximo ângulo da convergência.
    ///
    /// Corrige a fração `smoothing_factor` do erro, arredonda ao grau
    /// (empates para o par) e limita ao curso. Se o arredondamento anular o passo, avança
    /// `MIN_STEP_DEG` na direção do alvo. `None` para fatores não finitos.
    pub fn next_angle(&self) -> Option<f64> {
        let error = self.target_angle - self.current_angle;
        let mut next = (self.current_angle + error * self.smoothing_factor).round_ties_even();
        if !next.is_finite() {
            return None;
        }
        if next == self.current_angle {
            next = self.current_angle + MIN_STEP_DEG.copysign(error);
        }
        Some(self.clamp(next))
    }

    /// Registra o ângulo efetivamente escrito
    pub(crate) fn record_write(&mut self, angle: f64) {
        self.current_angle = angle;
    }

    /// Pousa exatamente no alvo
    pub(crate) fn settle(&mut self) {
        self.current_angle = self.target_angle;
        self.status = ChannelStatus::Idle;
    }

    pub fn snapshot(&self, index: usize) -> ChannelState {
        ChannelState {
            index,
            min_angle: self.min_angle,
            max_angle: self.max_angle,
            current_angle: self.current_angle,
            target_angle: self.target_angle,
            smoothing_factor: self.smoothing_factor,
            status: self.status,
            table_len: self.table.len(),
            table_revision: self.table_revision,
        }
    }
}
