//! # 🦾 servo-motion - Controlador de movimento suavizado
//!
//! Comanda um banco de servos independentes a partir de ângulos de alto
//! nível, suavizando o movimento de cada canal até o alvo para que
//! movimentos simultâneos pareçam contínuos.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            ServoController (N canais)        │
//! │  ┌──────────────┐   ┌──────────────────────┐ │
//! │  │ Calibração   │──►│ Alvos (clamp, fração)│ │
//! │  │ DriveTable   │   │ smoothing_factor     │ │
//! │  └──────────────┘   └──────────────────────┘ │
//! │           ↓                    ↓             │
//! │  ┌────────────────────────────────────────┐  │
//! │  │ Motor de movimento (tick + pacing)     │  │
//! │  │ run(), move_channel(), homing()        │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//!                       ↓
//!        DriveTransport::write_drive_value
//! ```
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use servo_motion::{MockTransport, ServoController};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = MockTransport::new();
//! let controller = ServoController::new(transport.clone(), 8)?;
//!
//! controller.set_bounds(2, 30.0, 150.0)?;
//! controller.set_fractional_angle(2, 0.5)?;
//! controller.set_smoothing_factor(2, 0.5)?;
//!
//! let report = controller.run().await?;
//! assert!(report.is_success());
//! assert_eq!(controller.current_angle(2)?, 90.0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Características
//!
//! - **Tabela por canal**: reconstruída por inteiro a cada mudança de limite
//! - **Alvos sempre no curso**: clamp no momento da escrita
//! - **Suavização**: fração do erro corrigida por passo, zona morta de 1°
//! - **Cooperativo**: um tick por intervalo de ritmo, sem threads extras
//! - **Cancelamento**: [`CancelToken`] observado a cada suspensão
//! - **Falhas isoladas**: erro de transporte aborta só o canal afetado
//! - **Mock hardware**: [`MockTransport`] para testes sem hardware real

pub mod calibration;
pub mod cancel;
pub mod channel;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod homing;
pub mod transport;
pub mod types;

pub use calibration::{DriveTable, DRIVE_MAX_16BIT, FULL_SCALE_DEG};
pub use cancel::CancelToken;
pub use config::{ChannelConfig, ControllerConfig};
pub use controller::ServoController;
pub use error::{MotionError, MotionResult, TransportError};
pub use homing::HOME_FRACTION;
pub use transport::{DriveTransport, DriveWrite, MockTransport};
pub use types::{ChannelOutcome, ChannelResult, ChannelState, ChannelStatus, RunReport};
