pub(crate) mod hbridge;

pub use hbridge::{Direction, HBridge};

use crate::error::HardwareError;

/// Трейт для драйверов двигателя постоянного тока
pub trait MotorDriver {
    /// Скважность со знаком (%): знак задает направление
    fn set_output(&mut self, duty: f32) -> Result<(), HardwareError>;

    /// Снятие напряжения с двигателя (выбег)
    fn coast(&mut self) -> Result<(), HardwareError>;

    /// Состояние внешней кнопки аварийной остановки
    fn emergency_asserted(&mut self) -> Result<bool, HardwareError>;
}
