//! Объект управления: реальный двигатель или его модель
//!
//! Оба варианта реализуют [`PlantModel`]. Состояние объекта хранится под
//! блокирующим мьютексом, читатели получают согласованный снимок
//! [`Measurements`]. Писатель состояния один: цикл мониторинга через
//! [`PlantModel::update`].

pub mod real;
pub mod simulated;

pub use real::RealActuator;
pub use simulated::SimulatedMotor;

use embassy_time::Instant;

use crate::data::Measurements;
use crate::error::HardwareError;

/// Что произошло на объекте за шаг обновления
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlantEvents {
    /// Сработал внешний вход аварийной остановки
    pub emergency_requested: bool,
}

/// Единый контракт измерений и управления объектом
pub trait PlantModel: Sync {
    fn start_actuation(&self) -> Result<(), HardwareError>;

    /// Снятие управляющего воздействия
    fn stop_actuation(&self) -> Result<(), HardwareError>;

    /// Скважность со знаком в процентах, ограничивается пределом привода
    fn set_duty_cycle(&self, duty: f32) -> Result<(), HardwareError>;

    /// Заданная скорость, ограничивается диапазоном двигателя
    fn set_target_speed(&self, rpm: f32);

    /// Согласованный снимок состояния
    fn measurements(&self) -> Measurements;

    /// Шаг цикла мониторинга
    fn update(&self, now: Instant) -> PlantEvents;

    /// Активен ли сейчас внешний сигнал остановки
    fn emergency_input_asserted(&self) -> bool;
}
