//! Tabela de calibração: ângulo inteiro → valor de acionamento
//!
//! A escala usa sempre a referência global de 180°, não o curso de cada
//! canal. Dois canais com limites diferentes produzem o mesmo valor de
//! acionamento para o mesmo ângulo físico; a calibração só restringe o
//! subconjunto endereçável da tabela.

use serde::{Deserialize, Serialize};
use crate::error::{MotionError, MotionResult};

/// Referência angular da escala (graus)
pub const FULL_SCALE_DEG: f64 = 180.0;

/// Valor máximo de acionamento de um canal de 16 bits
pub const DRIVE_MAX_16BIT: u32 = 65_535;

/// Converte um ângulo inteiro para valor de acionamento
pub fn angle_to_drive(angle: i32, drive_max: u32) -> u32 {
    (angle as f64 * drive_max as f64 / FULL_SCALE_DEG).round() as u32
}

/// Valida um limite de calibração e o converte para grau inteiro
pub fn validate_bound(angle: f64) -> MotionResult<i32> {
    if !angle.is_finite() {
        return Err(MotionError::InvalidConfig(format!(
            "Bound must be finite, got {}",
            angle
        )));
    }
    if angle.fract() != 0.0 {
        return Err(MotionError::InvalidConfig(format!(
            "Bound must be a whole degree, got {}°",
            angle
        )));
    }
    if !(0.0..=FULL_SCALE_DEG).contains(&angle) {
        return Err(MotionError::InvalidConfig(format!(
            "Bound must be 0-{}°, got {}°",
            FULL_SCALE_DEG, angle
        )));
    }
    Ok(angle as i32)
}

/// Tabela de acionamento de um canal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveTable {
    min_angle: i32,
    entries: Vec<u32>,
}

impl DriveTable {
    /// Constrói a tabela completa para `[min_angle, max_angle]`
    pub fn build(min_angle: f64, max_angle: f64, drive_max: u32) -> MotionResult<Self> {
        let lo = validate_bound(min_angle)?;
        let hi = validate_bound(max_angle)?;
        if lo > hi {
            return Err(MotionError::InvalidConfig(format!(
                "min_angle ({}°) must not exceed max_angle ({}°)",
                lo, hi
            )));
        }

        let entries = (lo..=hi).map(|a| angle_to_drive(a, drive_max)).collect();
        Ok(Self { min_angle: lo, entries })
    }

    /// Valor de acionamento para um ângulo (arredondado ao grau, empates para o par)
    pub fn lookup(&self, angle: f64) -> MotionResult<u32> {
        if !angle.is_finite() {
            return Err(MotionError::OutOfRange(format!("{}° is not a finite angle", angle)));
        }
        let index = angle.round_ties_even() as i64 - self.min_angle as i64;
        usize::try_from(index)
            .ok()
            .and_then(|i| self.entries.get(i).copied())
            .ok_or_else(|| {
                MotionError::OutOfRange(format!(
                    "{}° outside table {}-{}°",
                    angle,
                    self.min_angle,
                    self.max_angle()
                ))
            })
    }

    pub fn min_angle(&self) -> i32 {
        self.min_angle
    }

    pub fn max_angle(&self) -> i32 {
        self.min_angle + self.entries.len() as i32 - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[u32] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_range_table() {
        let table = DriveTable::build(0.0, 180.0, DRIVE_MAX_16BIT).unwrap();
        assert_eq!(table.len(), 181);
        assert_eq!(table.entries()[0], 0);
        assert_eq!(table.entries()[180], 65_535);
        assert_eq!(table.entries()[90], 32_768);
    }

    #[test]
    fn test_partial_range_uses_global_scale() {
        let table = DriveTable::build(30.0, 150.0, DRIVE_MAX_16BIT).unwrap();
        assert_eq!(table.len(), 121);
        assert_eq!(table.entries()[0], angle_to_drive(30, DRIVE_MAX_16BIT));
        assert_eq!(table.entries()[0], 10_923);
        assert_eq!(table.entries()[120], 54_613);
        // 90° tem o mesmo valor em qualquer calibração
        let full = DriveTable::build(0.0, 180.0, DRIVE_MAX_16BIT).unwrap();
        assert_eq!(table.lookup(90.0).unwrap(), full.lookup(90.0).unwrap());
    }

    #[test]
    fn test_twelve_bit_resolution() {
        let table = DriveTable::build(0.0, 180.0, 4095).unwrap();
        assert_eq!(table.entries()[180], 4095);
        assert_eq!(table.entries()[45], 1024);
    }

    #[test]
    fn test_single_entry_table() {
        let table = DriveTable::build(60.0, 60.0, DRIVE_MAX_16BIT).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.max_angle(), 60);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        assert!(matches!(
            DriveTable::build(150.0, 30.0, DRIVE_MAX_16BIT),
            Err(MotionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        assert!(validate_bound(-1.0).is_err());
        assert!(validate_bound(181.0).is_err());
        assert!(validate_bound(45.5).is_err());
        assert!(validate_bound(f64::NAN).is_err());
        assert_eq!(validate_bound(45.0).unwrap(), 45);
    }

    #[test]
    fn test_lookup_out_of_range() {
        let table = DriveTable::build(30.0, 150.0, DRIVE_MAX_16BIT).unwrap();
        assert!(table.lookup(29.0).is_err());
        assert!(table.lookup(151.0).is_err());
        assert_eq!(table.lookup(30.4).unwrap(), table.entries()[0]);
        assert_eq!(table.lookup(30.5).unwrap(), table.entries()[0]);
        assert!(table.lookup(f64::NAN).is_err());
    }
}
