//! Motor de movimento: convergência suavizada multi-canal
//!
//! Um único tick avança cada canal ativo um passo; depois a execução inteira
//! suspende por um intervalo de ritmo. O lock do controlador só é mantido
//! durante a parte síncrona do tick, nunca através da suspensão.
//!
//! ```text
//!  tick ──► canal fora da zona morta? ──sim──► passo + escrita ──┐
//!   ▲                 │                                           │
//!   │                não                                          │
//!   │                 ▼                                           │
//!   │       escrita final no alvo (Converged)                     │
//!   └────────────── sleep(pacing) / cancelamento ◄────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::channel::Channel;
use crate::controller::{ControllerInner, MotionSettings, ServoController};
use crate::error::{MotionError, MotionResult};
use crate::transport::DriveTransport;
use crate::types::{ChannelOutcome, ChannelResult, ChannelStatus, RunReport};

/// Marca o controlador como ocupado enquanto existir
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> MotionResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| MotionError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Progresso de um canal dentro de uma execução
#[derive(Debug)]
struct Track {
    channel: usize,
    steps: u32,
    result: Option<ChannelResult>,
}

impl Track {
    fn is_active(&self) -> bool {
        self.result.is_none()
    }
}

/// Avança um canal um passo. `Some` quando o canal terminou nesta execução.
fn advance<T: DriveTransport>(
    track: &mut Track,
    channel: &mut Channel,
    transport: &mut T,
    settings: &MotionSettings,
) -> Option<ChannelResult> {
    let index = track.channel;

    if !channel.needs_motion() {
        let target = channel.target_angle();
        let written = channel
            .table()
            .lookup(target)
            .and_then(|drive| write(transport, index, drive));
        return Some(match written {
            Ok(drive) => {
                channel.settle();
                debug!(channel = index, angle = target, drive, "Channel settled on target");
                ChannelResult::Converged
            }
            Err(err) => fail(channel, index, err),
        });
    }

    if track.steps >= settings.max_steps {
        let err = MotionError::NonConvergence { channel: index, steps: track.steps };
        return Some(fail(channel, index, err));
    }

    let Some(next) = channel.next_angle() else {
        let err = MotionError::NonConvergence { channel: index, steps: track.steps };
        return Some(fail(channel, index, err));
    };

    let written = channel
        .table()
        .lookup(next)
        .and_then(|drive| write(transport, index, drive));
    match written {
        Ok(drive) => {
            channel.record_write(next);
            track.steps += 1;
            debug!(channel = index, angle = next, drive, "Moving channel");
            None
        }
        Err(err) => Some(fail(channel, index, err)),
    }
}

fn write<T: DriveTransport>(transport: &mut T, channel: usize, drive: u32) -> MotionResult<u32> {
    transport
        .write_drive_value(channel, drive)
        .map_err(|source| MotionError::Transport { channel, source })?;
    Ok(drive)
}

fn fail(channel: &mut Channel, index: usize, err: MotionError) -> ChannelResult {
    warn!(channel = index, error = %err, "Channel aborted");
    channel.set_status(ChannelStatus::Fault);
    ChannelResult::Failed(err)
}

impl<T: DriveTransport> ServoController<T> {
    /// Converge todos os canais para os alvos atuais
    pub async fn run(&self) -> MotionResult<RunReport> {
        self.run_with_cancel(&CancelToken::new()).await
    }

    /// Como [`run`](Self::run), interrompível por `cancel`
    pub async fn run_with_cancel(&self, cancel: &CancelToken) -> MotionResult<RunReport> {
        let all: Vec<usize> = (0..self.channel_count()?).collect();
        self.run_channels(&all, cancel).await
    }

    /// Converge um único canal
    pub async fn move_channel(&self, channel: usize) -> MotionResult<ChannelOutcome> {
        let mut report = self.run_channels(&[channel], &CancelToken::new()).await?;
        match report.outcomes.pop() {
            Some(outcome) => Ok(outcome),
            None => Err(MotionError::InvalidChannel {
                channel,
                count: self.channel_count()?,
            }),
        }
    }

    /// Converge os canais indicados, em paralelo cooperativo.
    ///
    /// Só retorna quando todos terminaram (convergência, falha ou
    /// cancelamento). Falhas ficam restritas ao canal e aparecem no
    /// relatório; `Err` só para canal inválido ou controlador ocupado.
    pub async fn run_channels(
        &self,
        channels: &[usize],
        cancel: &CancelToken,
    ) -> MotionResult<RunReport> {
        let _guard = RunGuard::acquire(&self.running)?;
        let (mut tracks, pacing) = self.begin(channels)?;

        while self.tick(&mut tracks)? {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.cancel_remaining(&mut tracks)?;
                    break;
                }
                _ = tokio::time::sleep(pacing) => {}
            }
        }

        Ok(RunReport {
            outcomes: tracks
                .into_iter()
                .map(|t| ChannelOutcome {
                    channel: t.channel,
                    steps: t.steps,
                    result: t.result.unwrap_or(ChannelResult::Cancelled),
                })
                .collect(),
        })
    }

    /// Valida os canais e os marca como em convergência
    fn begin(&self, channels: &[usize]) -> MotionResult<(Vec<Track>, std::time::Duration)> {
        let mut inner = self.lock()?;
        let mut tracks: Vec<Track> = Vec::with_capacity(channels.len());
        for &channel in channels {
            inner.channel(channel)?;
            if tracks.iter().all(|t| t.channel != channel) {
                tracks.push(Track { channel, steps: 0, result: None });
            }
        }
        for track in &tracks {
            inner.channel_mut(track.channel)?.set_status(ChannelStatus::Converging);
        }
        Ok((tracks, inner.settings.pacing()))
    }

    /// Um tick: avança cada canal ativo. `true` se algum continua ativo.
    fn tick(&self, tracks: &mut [Track]) -> MotionResult<bool> {
        let mut inner = self.lock()?;
        let ControllerInner { channels, transport, settings, .. } = &mut *inner;
        let count = channels.len();
        for track in tracks.iter_mut().filter(|t| t.is_active()) {
            let channel = channels
                .get_mut(track.channel)
                .ok_or(MotionError::InvalidChannel { channel: track.channel, count })?;
            let result = advance(track, channel, transport, settings);
            track.result = result;
        }
        Ok(tracks.iter().any(Track::is_active))
    }

    fn cancel_remaining(&self, tracks: &mut [Track]) -> MotionResult<()> {
        let mut inner = self.lock()?;
        for track in tracks.iter_mut().filter(|t| t.is_active()) {
            let channel = inner.channel_mut(track.channel)?;
            channel.set_status(ChannelStatus::Idle);
            debug!(
                channel = track.channel,
                angle = channel.current_angle(),
                "Channel motion cancelled"
            );
            track.result = Some(ChannelResult::Cancelled);
        }
        Ok(())
    }
}
