//! Controlador multi-canal: calibração e gerência de alvos
//!
//! O controlador é um handle barato de clonar sobre estado compartilhado.
//! Todos os setters são síncronos e imediatos; nenhum produz escrita no
//! transporte. Uma execução em andamento ([`ServoController::run`]) lê os
//! novos alvos e tabelas no próximo passo.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::calibration::DriveTable;
use crate::channel::{Channel, DEFAULT_MAX_ANGLE, DEFAULT_MIN_ANGLE};
use crate::config::{is_valid_smoothing, ChannelConfig, ControllerConfig};
use crate::error::{MotionError, MotionResult};
use crate::transport::DriveTransport;
use crate::types::{ChannelState, ChannelStatus};

/// Parâmetros do motor de movimento
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MotionSettings {
    pub drive_max: u32,
    /// Intervalo entre passos, em milissegundos inteiros
    pub pacing_ms: u64,
    pub max_steps: u32,
    pub strict_smoothing: bool,
    pub rest_angle: f64,
    pub default_smoothing: f64,
}

impl From<&ControllerConfig> for MotionSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            drive_max: config.drive_max,
            pacing_ms: config.pacing_ms,
            max_steps: config.max_steps,
            strict_smoothing: config.strict_smoothing,
            rest_angle: config.rest_angle,
            default_smoothing: config.default_smoothing,
        }
    }
}

pub(crate) struct ControllerInner<T> {
    pub channels: Vec<Channel>,
    pub transport: T,
    pub settings: MotionSettings,
    /// Incrementada a cada reconstrução completa das tabelas
    pub table_revision: u64,
}

impl MotionSettings {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

/// Rejeita entradas não finitas antes de qualquer clamp
fn finite(value: f64, what: &str) -> MotionResult<f64> {
    if !value.is_finite() {
        return Err(MotionError::InvalidConfig(format!(
            "{} must be finite, got {}",
            what, value
        )));
    }
    Ok(value)
}

impl<T> ControllerInner<T> {
    pub fn channel(&self, channel: usize) -> MotionResult<&Channel> {
        let count = self.channels.len();
        self.channels
            .get(channel)
            .ok_or(MotionError::InvalidChannel { channel, count })
    }

    pub fn channel_mut(&mut self, channel: usize) -> MotionResult<&mut Channel> {
        let count = self.channels.len();
        self.channels
            .get_mut(channel)
            .ok_or(MotionError::InvalidChannel { channel, count })
    }

    /// Reconstrói a tabela de todos os canais
    fn rebuild_tables(&mut self) -> MotionResult<()> {
        self.table_revision += 1;
        let revision = self.table_revision;
        for channel in &mut self.channels {
            channel.rebuild_table(self.settings.drive_max, revision)?;
        }
        debug!(revision, channels = self.channels.len(), "Rebuilt drive tables");
        Ok(())
    }

    /// Aplica novos limites a um canal, validando antes de mudar estado
    fn apply_bounds(&mut self, channel: usize, min_angle: f64, max_angle: f64) -> MotionResult<()> {
        self.channel(channel)?;
        DriveTable::build(min_angle, max_angle, self.settings.drive_max)?;

        let ch = self.channel_mut(channel)?;
        if ch.set_bounds(min_angle, max_angle) {
            warn!(
                channel,
                target = ch.target_angle(),
                "Target re-clamped into new calibration bounds"
            );
        }
        self.rebuild_tables()
    }
}

/// Controlador de um banco de servos
pub struct ServoController<T> {
    pub(crate) inner: Arc<Mutex<ControllerInner<T>>>,
    pub(crate) running: Arc<AtomicBool>,
}

impl<T> Clone for ServoController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            running: Arc::clone(&self.running),
        }
    }
}

impl<T> std::fmt::Debug for ServoController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("ServoController");
        if let Ok(inner) = self.inner.lock() {
            s.field("channels", &inner.channels.len())
                .field("settings", &inner.settings)
                .field("table_revision", &inner.table_revision);
        }
        s.finish()
    }
}

impl<T: DriveTransport> ServoController<T> {
    /// Cria controlador com `channel_count` canais e configuração padrão
    pub fn new(transport: T, channel_count: usize) -> MotionResult<Self> {
        Self::from_config(&ControllerConfig::with_channels(channel_count), transport)
    }

    /// Cria controlador a partir de uma configuração
    pub fn from_config(config: &ControllerConfig, transport: T) -> MotionResult<Self> {
        config.validate()?;
        let settings = MotionSettings::from(config);

        let mut channels = (0..config.channel_count)
            .map(|_| Channel::new(settings.rest_angle, settings.default_smoothing, settings.drive_max))
            .collect::<MotionResult<Vec<_>>>()?;

        for channel_config in &config.channels {
            let ch = &mut channels[channel_config.index];
            let min = channel_config.min_angle.unwrap_or(DEFAULT_MIN_ANGLE);
            let max = channel_config.max_angle.unwrap_or(DEFAULT_MAX_ANGLE);
            ch.set_bounds(min, max);
            if let Some(factor) = channel_config.smoothing_factor {
                ch.set_smoothing_factor(factor);
            }
        }

        let mut inner = ControllerInner {
            channels,
            transport,
            settings,
            table_revision: 0,
        };
        inner.rebuild_tables()?;

        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
            running: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl<T> ServoController<T> {
    pub(crate) fn lock(&self) -> MotionResult<MutexGuard<'_, ControllerInner<T>>> {
        Ok(self.inner.lock()?)
    }

    /// Exporta o estado persistível (limites e fatores) como configuração
    pub fn export_config(&self) -> MotionResult<ControllerConfig> {
        let inner = self.lock()?;
        let settings = inner.settings;
        let channels = inner
            .channels
            .iter()
            .enumerate()
            .map(|(index, ch)| ChannelConfig {
                index,
                min_angle: Some(ch.min_angle()),
                max_angle: Some(ch.max_angle()),
                smoothing_factor: Some(ch.smoothing_factor()),
            })
            .collect();

        Ok(ControllerConfig {
            channel_count: inner.channels.len(),
            drive_max: settings.drive_max,
            pacing_ms: settings.pacing_ms,
            rest_angle: settings.rest_angle,
            max_steps: settings.max_steps,
            strict_smoothing: settings.strict_smoothing,
            default_smoothing: settings.default_smoothing,
            channels,
        })
    }

    pub fn channel_count(&self) -> MotionResult<usize> {
        Ok(self.lock()?.channels.len())
    }

    /// Intervalo entre passos de movimento
    pub fn pacing(&self) -> MotionResult<Duration> {
        Ok(self.lock()?.settings.pacing())
    }

    /// Altera o intervalo entre passos (vale a partir da próxima execução).
    ///
    /// A configuração guarda milissegundos inteiros, então frações de
    /// milissegundo são rejeitadas.
    pub fn set_pacing(&self, pacing: Duration) -> MotionResult<()> {
        let pacing_ms = u64::try_from(pacing.as_millis())
            .ok()
            .filter(|&ms| Duration::from_millis(ms) == pacing)
            .ok_or_else(|| {
                MotionError::InvalidConfig(format!(
                    "Pacing must be a whole number of milliseconds, got {:?}",
                    pacing
                ))
            })?;
        self.lock()?.settings.pacing_ms = pacing_ms;
        Ok(())
    }

    /// Fotografia do estado de um canal
    pub fn channel(&self, channel: usize) -> MotionResult<ChannelState> {
        Ok(self.lock()?.channel(channel)?.snapshot(channel))
    }

    /// Fotografia de todos os canais
    pub fn channels(&self) -> MotionResult<Vec<ChannelState>> {
        let inner = self.lock()?;
        Ok(inner
            .channels
            .iter()
            .enumerate()
            .map(|(i, ch)| ch.snapshot(i))
            .collect())
    }

    /// Cópia da tabela de acionamento de um canal
    pub fn drive_table(&self, channel: usize) -> MotionResult<Vec<u32>> {
        Ok(self.lock()?.channel(channel)?.table().entries().to_vec())
    }

    pub fn bounds(&self, channel: usize) -> MotionResult<(f64, f64)> {
        let inner = self.lock()?;
        let ch = inner.channel(channel)?;
        Ok((ch.min_angle(), ch.max_angle()))
    }

    pub fn target_angle(&self, channel: usize) -> MotionResult<f64> {
        Ok(self.lock()?.channel(channel)?.target_angle())
    }

    pub fn current_angle(&self, channel: usize) -> MotionResult<f64> {
        Ok(self.lock()?.channel(channel)?.current_angle())
    }

    pub fn smoothing_factor(&self, channel: usize) -> MotionResult<f64> {
        Ok(self.lock()?.channel(channel)?.smoothing_factor())
    }

    pub fn status(&self, channel: usize) -> MotionResult<ChannelStatus> {
        Ok(self.lock()?.channel(channel)?.status())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CALIBRAÇÃO
    // ═══════════════════════════════════════════════════════════════════════

    /// Define o limite mínimo e reconstrói as tabelas de todos os canais
    pub fn set_min_angle(&self, channel: usize, angle: f64) -> MotionResult<()> {
        let mut inner = self.lock()?;
        let max = inner.channel(channel)?.max_angle();
        inner.apply_bounds(channel, angle, max)
    }

    /// Define o limite máximo e reconstrói as tabelas de todos os canais
    pub fn set_max_angle(&self, channel: usize, angle: f64) -> MotionResult<()> {
        let mut inner = self.lock()?;
        let min = inner.channel(channel)?.min_angle();
        inner.apply_bounds(channel, min, angle)
    }

    /// Define os dois limites de uma vez
    pub fn set_bounds(&self, channel: usize, min_angle: f64, max_angle: f64) -> MotionResult<()> {
        self.lock()?.apply_bounds(channel, min_angle, max_angle)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ALVOS
    // ═══════════════════════════════════════════════════════════════════════

    /// Define o alvo absoluto (graus), limitado ao curso do canal
    pub fn set_absolute_angle(&self, channel: usize, angle: f64) -> MotionResult<()> {
        finite(angle, "Angle")?;
        let mut inner = self.lock()?;
        let stored = inner.channel_mut(channel)?.set_target(angle);
        if stored != angle {
            debug!(channel, requested = angle, stored, "Target clamped");
        }
        Ok(())
    }

    /// Define o alvo como fração do curso (0.0 = mínimo, 1.0 = máximo)
    pub fn set_fractional_angle(&self, channel: usize, fraction: f64) -> MotionResult<()> {
        finite(fraction, "Fraction")?;
        let mut inner = self.lock()?;
        let ch = inner.channel_mut(channel)?;
        let angle = finite(ch.fractional_angle(fraction), "Fractional angle")?;
        ch.set_target(angle);
        Ok(())
    }

    /// Alvos absolutos para os canais `0..angles.len()`
    pub fn set_absolute_angles(&self, angles: &[f64]) -> MotionResult<()> {
        let mut inner = self.lock()?;
        Self::check_batch(&inner, angles.len())?;
        for &angle in angles {
            finite(angle, "Angle")?;
        }
        for (ch, &angle) in inner.channels.iter_mut().zip(angles) {
            ch.set_target(angle);
        }
        Ok(())
    }

    /// Alvos fracionários para os canais `0..fractions.len()`
    pub fn set_fractional_angles(&self, fractions: &[f64]) -> MotionResult<()> {
        let mut inner = self.lock()?;
        Self::check_batch(&inner, fractions.len())?;
        let angles = inner
            .channels
            .iter()
            .zip(fractions)
            .map(|(ch, &fraction)| {
                finite(fraction, "Fraction")?;
                finite(ch.fractional_angle(fraction), "Fractional angle")
            })
            .collect::<MotionResult<Vec<_>>>()?;
        for (ch, angle) in inner.channels.iter_mut().zip(angles) {
            ch.set_target(angle);
        }
        Ok(())
    }

    fn check_batch(inner: &ControllerInner<T>, len: usize) -> MotionResult<()> {
        let count = inner.channels.len();
        if len > count {
            return Err(MotionError::InvalidChannel { channel: len - 1, count });
        }
        Ok(())
    }

    /// Define o fator de suavização.
    ///
    /// O valor é guardado como veio. Fora de (0, 1] o movimento pode oscilar
    /// ou divergir; só é rejeitado com `strict_smoothing` ativo.
    pub fn set_smoothing_factor(&self, channel: usize, value: f64) -> MotionResult<()> {
        let mut inner = self.lock()?;
        if inner.settings.strict_smoothing && !is_valid_smoothing(value) {
            return Err(MotionError::InvalidConfig(format!(
                "Smoothing factor must be in (0, 1], got {}",
                value
            )));
        }
        inner.channel_mut(channel)?.set_smoothing_factor(value);
        Ok(())
    }
}
