//! Transporte até o hardware e transporte simulado
//!
//! O controlador só conhece uma primitiva: escrever o valor de acionamento
//! bruto de um canal. Barramento, retentativas e recuperação ficam do lado
//! de quem implementa [`DriveTransport`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use serde::{Deserialize, Serialize};
use crate::error::TransportError;

/// Colaborador externo que entrega valores de acionamento ao hardware
pub trait DriveTransport {
    /// Escreve o valor bruto de um canal (síncrono, idempotente)
    fn write_drive_value(&mut self, channel: usize, value: u32) -> Result<(), TransportError>;
}

impl<T: DriveTransport + ?Sized> DriveTransport for Box<T> {
    fn write_drive_value(&mut self, channel: usize, value: u32) -> Result<(), TransportError> {
        (**self).write_drive_value(channel, value)
    }
}

/// Uma escrita registrada pelo transporte simulado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveWrite {
    pub channel: usize,
    pub value: u32,
}

#[derive(Debug, Default)]
struct MockState {
    writes: Vec<DriveWrite>,
    /// Escritas restantes antes de falhar, por canal
    fail_after: HashMap<usize, usize>,
}

/// Transporte simulado para testes sem hardware real.
///
/// Clones compartilham o mesmo registro, então o teste pode entregar um
/// clone ao controlador e inspecionar as escritas pelo outro.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Faz o canal falhar a partir da próxima escrita
    pub fn fail_channel(&self, channel: usize) {
        self.fail_channel_after(channel, 0);
    }

    /// Aceita `writes` escritas no canal e depois falha
    pub fn fail_channel_after(&self, channel: usize, writes: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.fail_after.insert(channel, writes);
    }

    /// Remove a falha injetada
    pub fn restore_channel(&self, channel: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.fail_after.remove(&channel);
    }

    /// Todas as escritas, em ordem
    pub fn writes(&self) -> Vec<DriveWrite> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.writes.clone()
    }

    /// Valores escritos num canal, em ordem
    pub fn writes_for(&self, channel: usize) -> Vec<u32> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .writes
            .iter()
            .filter(|w| w.channel == channel)
            .map(|w| w.value)
            .collect()
    }

    pub fn last_value(&self, channel: usize) -> Option<u32> {
        self.writes_for(channel).last().copied()
    }

    pub fn write_count(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.writes.len()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.writes.clear();
    }
}

impl DriveTransport for MockTransport {
    fn write_drive_value(&mut self, channel: usize, value: u32) -> Result<(), TransportError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| TransportError::Bus(e.to_string()))?;

        if let Some(remaining) = state.fail_after.get_mut(&channel) {
            if *remaining == 0 {
                return Err(TransportError::Bus(format!(
                    "simulated failure on channel {}",
                    channel
                )));
            }
            *remaining -= 1;
        }

        state.writes.push(DriveWrite { channel, value });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_writes() {
        let mock = MockTransport::new();
        let mut handle = mock.clone();
        handle.write_drive_value(0, 100).unwrap();
        handle.write_drive_value(1, 200).unwrap();
        handle.write_drive_value(0, 150).unwrap();

        assert_eq!(mock.write_count(), 3);
        assert_eq!(mock.writes_for(0), vec![100, 150]);
        assert_eq!(mock.last_value(1), Some(200));
        assert_eq!(mock.last_value(2), None);
    }

    #[test]
    fn test_mock_failure_injection() {
        let mock = MockTransport::new();
        let mut handle = mock.clone();
        mock.fail_channel_after(3, 2);

        assert!(handle.write_drive_value(3, 1).is_ok());
        assert!(handle.write_drive_value(3, 2).is_ok());
        assert!(matches!(
            handle.write_drive_value(3, 3),
            Err(TransportError::Bus(_))
        ));
        // Outros canais não são afetados
        assert!(handle.write_drive_value(4, 9).is_ok());

        mock.restore_channel(3);
        assert!(handle.write_drive_value(3, 4).is_ok());
        assert_eq!(mock.writes_for(3), vec![1, 2, 4]);
    }

    #[test]
    fn test_boxed_transport() {
        let mock = MockTransport::new();
        let mut boxed: Box<dyn DriveTransport> = Box::new(mock.clone());
        boxed.write_drive_value(7, 42).unwrap();
        assert_eq!(mock.writes(), vec![DriveWrite { channel: 7, value: 42 }]);
    }

    #[test]
    fn test_clear() {
        let mock = MockTransport::new();
        mock.clone().write_drive_value(0, 1).unwrap();
        mock.clear();
        assert_eq!(mock.write_count(), 0);
    }
}
