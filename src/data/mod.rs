//! Общие данные системы: измерения, режимы, события датчиков, команды

pub mod recorder;

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_time::Instant;

use crate::config::hardware::events::EDGE_QUEUE_SIZE;

/// Снимок состояния объекта
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurements {
    pub speed: f32,        // Скорость (об/мин)
    pub current: f32,      // Ток (А)
    pub duty_cycle: f32,   // Скважность со знаком (%)
    pub target_speed: f32, // Заданная скорость (об/мин)
    pub timestamp_us: u64,
}

impl Measurements {
    pub const fn zero() -> Self {
        Self {
            speed: 0.0,
            current: 0.0,
            duty_cycle: 0.0,
            target_speed: 0.0,
            timestamp_us: 0,
        }
    }

    /// Метка времени в секундах
    pub fn timestamp_s(&self) -> f32 {
        self.timestamp_us as f32 / 1_000_000.0
    }

    /// Ошибка регулирования: задание минус скорость
    pub fn speed_error(&self) -> f32 {
        self.target_speed - self.speed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMode {
    /// Скважность задается оператором
    Manual,
    /// Скважность вычисляет ANFIS контроллер
    Adaptive,
}

/// Источник аппаратного события
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeLine {
    /// Спадающий фронт датчика оборотов
    Speed,
    /// Кнопка аварийной остановки
    EmergencyStop,
}

/// Фронт на входе с меткой времени
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeEvent {
    pub line: EdgeLine,
    pub at: Instant,
}

/// Канал событий от обработчиков прерываний к модели объекта
pub type EdgeChannel = Channel<CriticalSectionRawMutex, EdgeEvent, EDGE_QUEUE_SIZE>;

#[derive(Clone, Copy, Debug, PartialEq)]
struct CommandState {
    mode: ControlMode,
    manual_duty: f32,
    shutdown: bool,
}

/// Команды оператора для цикла управления
pub struct Commands {
    state: Mutex<CriticalSectionRawMutex, Cell<CommandState>>,
}

impl Commands {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(CommandState {
                mode: ControlMode::Manual,
                manual_duty: 0.0,
                shutdown: false,
            })),
        }
    }

    fn update(&self, f: impl FnOnce(&mut CommandState)) {
        self.state.lock(|s| {
            let mut state = s.get();
            f(&mut state);
            s.set(state);
        });
    }

    pub fn mode(&self) -> ControlMode {
        self.state.lock(|s| s.get().mode)
    }

    pub fn set_mode(&self, mode: ControlMode) {
        self.update(|s| s.mode = mode);
    }

    /// Скважность ручного режима
    pub fn manual_duty(&self) -> f32 {
        self.state.lock(|s| s.get().manual_duty)
    }

    pub fn set_manual_duty(&self, duty: f32) {
        self.update(|s| s.manual_duty = duty);
    }

    /// Запрос на завершение циклов
    pub fn request_shutdown(&self) {
        self.update(|s| s.shutdown = true);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.state.lock(|s| s.get().shutdown)
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_default_to_manual_zero() {
        let commands = Commands::new();
        assert_eq!(commands.mode(), ControlMode::Manual);
        assert_eq!(commands.manual_duty(), 0.0);
        assert!(!commands.shutdown_requested());

        commands.set_mode(ControlMode::Adaptive);
        commands.set_manual_duty(35.0);
        commands.request_shutdown();
        assert_eq!(commands.mode(), ControlMode::Adaptive);
        assert_eq!(commands.manual_duty(), 35.0);
        assert!(commands.shutdown_requested());
    }

    #[test]
    fn measurement_helpers() {
        let m = Measurements {
            speed: 400.0,
            target_speed: 1000.0,
            timestamp_us: 2_500_000,
            ..Measurements::zero()
        };
        assert_eq!(m.speed_error(), 600.0);
        assert!((m.timestamp_s() - 2.5).abs() < 1e-6);
    }
}
