//! Ошибки системы управления двигателем

use thiserror::Error;

/// Ошибки конфигурации. Фатальны при создании контроллера.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Поддерживаются только два входа: ошибка и скорость изменения ошибки
    #[error("unsupported input count {0}, expected 2")]
    InputCount(usize),
    /// Количество функций принадлежности вне допустимого диапазона
    #[error("membership function count {0} is out of range 1..={1}")]
    MembershipCount(usize, usize),
    /// Длина списка термов не совпадает с объявленной
    #[error("input `{input}` defines {actual} sets, expected {expected}")]
    SetCountMismatch {
        input: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Нарушено условие a <= b <= c
    #[error("input `{input}` set #{index} violates a <= b <= c")]
    InvalidSet { input: &'static str, index: usize },
    /// Треугольный терм с нарушенным порядком параметров
    #[error("triangular set violates a <= b <= c")]
    InvalidShape,
    /// Частота дискретизации должна быть положительной
    #[error("sampling rate `{0}` must be positive")]
    NonPositiveRate(&'static str),
    /// Некорректный параметр обучения
    #[error("training parameter `{0}` is out of range")]
    TrainingParam(&'static str),
    /// Некорректный параметр двигателя или симуляции
    #[error("plant parameter `{0}` is out of range")]
    PlantParam(&'static str),
    /// Ошибка разбора конфигурации (сообщение усечено до емкости буфера)
    #[error("malformed configuration: {0}")]
    Parse(heapless::String<96>),
}

/// Ошибки вычисления управляющего воздействия
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Число правил не совпадает с числом строк матрицы заключений
    #[error("rule base has {rules} rules but consequent matrix has {rows} rows")]
    ShapeMismatch { rules: usize, rows: usize },
    /// Выход не является конечным числом
    #[error("controller output is not finite")]
    NonFinite,
}

/// Ошибки аппаратного уровня
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareError {
    /// Ошибка ШИМ канала
    #[error("PWM channel error")]
    Pwm,
    /// Ошибка дискретного входа/выхода
    #[error("GPIO error")]
    Gpio,
}

/// Ошибки обучения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrainingError {
    /// Обучение этого контроллера уже выполняется
    #[error("training is already in progress")]
    AlreadyRunning,
    /// Пустая обучающая выборка
    #[error("training set is empty")]
    EmptySampleSet,
    /// Модель не может вычислить выход на обучающем примере
    #[error("model evaluation failed: {0}")]
    Model(#[from] ControlError),
}

/// Ошибки внешних команд
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Прямое задание скважности допустимо только в ручном режиме
    #[error("duty cycle can only be set in manual mode")]
    NotInManualMode,
    /// Запуск запрещен до сброса аварийной остановки
    #[error("emergency stop is latched")]
    EmergencyLatched,
}
