//! Homing: leva todos os canais ao meio do curso

use tracing::info;

use crate::cancel::CancelToken;
use crate::controller::ServoController;
use crate::error::MotionResult;
use crate::transport::DriveTransport;
use crate::types::RunReport;

/// Fração do curso usada como posição de repouso
pub const HOME_FRACTION: f64 = 0.5;

impl<T: DriveTransport> ServoController<T> {
    /// Centraliza todos os canais e aguarda a convergência
    pub async fn homing(&self) -> MotionResult<RunReport> {
        self.homing_with_cancel(&CancelToken::new()).await
    }

    /// Como [`homing`](Self::homing), interrompível por `cancel`
    pub async fn homing_with_cancel(&self, cancel: &CancelToken) -> MotionResult<RunReport> {
        let count = self.channel_count()?;
        info!(channels = count, "Homing all channels to mid-range");
        self.set_fractional_angles(&vec![HOME_FRACTION; count])?;

        let report = self.run_with_cancel(cancel).await?;
        info!(
            steps = report.max_steps(),
            success = report.is_success(),
            "Homing complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[tokio::test(start_paused = true)]
    async fn test_homing_centres_every_channel() {
        let ctl = ServoController::new(MockTransport::new(), 4).unwrap();
        ctl.set_bounds(2, 30.0, 150.0).unwrap();
        ctl.set_bounds(3, 0.0, 100.0).unwrap();

        let report = ctl.homing().await.unwrap();
        assert!(report.is_success());
        assert_eq!(ctl.current_angle(0).unwrap(), 90.0);
        assert_eq!(ctl.current_angle(2).unwrap(), 90.0);
        assert_eq!(ctl.current_angle(3).unwrap(), 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_homing_twice_is_idle() {
        let ctl = ServoController::new(MockTransport::new(), 2).unwrap();
        ctl.homing().await.unwrap();
        let second = ctl.homing().await.unwrap();
        assert_eq!(second.total_steps(), 0);
    }
}
