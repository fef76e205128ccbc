//! Значения конфигурации по умолчанию

/// Структура нечеткой системы
pub mod anfis {
    /// Количество входов: ошибка и скорость изменения ошибки
    pub const INPUT_VARS: usize = 2;

    /// Количество функций принадлежности на вход
    pub const MEMBERSHIP_FUNCTIONS: usize = 3;

    /// Максимум термов на один вход (емкость статических буферов)
    pub const MAX_SETS: usize = 7;

    /// Максимум правил
    pub const MAX_RULES: usize = MAX_SETS * MAX_SETS;

    /// Термы ошибки (об/мин): отрицательная, ноль, положительная
    pub const ERROR_SETS: [[f32; 3]; 3] = [
        [-100.0, -100.0, 0.0],
        [-50.0, 0.0, 50.0],
        [0.0, 100.0, 100.0],
    ];

    /// Термы скорости изменения ошибки
    pub const DELTA_ERROR_SETS: [[f32; 3]; 3] = [
        [-10.0, -10.0, 0.0],
        [-5.0, 0.0, 5.0],
        [0.0, 10.0, 10.0],
    ];

    /// Защита от деления на ноль при нормализации
    pub const FIRING_EPSILON: f32 = 1e-10;

    /// Допустимый диапазон выхода (скважность, %)
    pub const OUTPUT_LIMIT: f32 = 100.0;
}

/// Параметры обучения
pub mod training {
    pub const EPOCHS: u32 = 100;
    pub const LEARNING_RATE: f32 = 0.1;
    pub const MOMENTUM: f32 = 0.5;
    pub const ERROR_GOAL: f32 = 1.0;
}

/// Частоты циклов
pub mod sampling {
    /// Частота цикла управления (Гц)
    pub const CONTROL_RATE_HZ: u32 = 100;

    /// Частота обновления модели / опроса датчиков (Гц)
    pub const MONITOR_RATE_HZ: u32 = 100;
}

/// Параметры двигателя
pub mod motor {
    pub const MIN_SPEED_RPM: f32 = 0.0;
    pub const MAX_SPEED_RPM: f32 = 1750.0;

    /// Частота ШИМ (Гц)
    pub const PWM_FREQUENCY_HZ: u32 = 1000;

    /// Импульсов ИК датчика на оборот
    pub const PULSES_PER_REVOLUTION: u32 = 1;

    /// Ограничение скважности (%)
    pub const DUTY_LIMIT: f32 = 100.0;
}

/// Параметры модели двигателя
pub mod simulation {
    /// Момент инерции ротора
    pub const INERTIA: f32 = 0.01;
    /// Коэффициент вязкого трения
    pub const DAMPING: f32 = 0.1;
    /// Моментная постоянная
    pub const TORQUE_CONSTANT: f32 = 0.01;
    /// Момент нагрузки
    pub const LOAD_TORQUE: f32 = 0.1;
    /// СКО шума измерения скорости (об/мин)
    pub const NOISE_LEVEL: f32 = 0.1;
    /// Ток холостого хода (А)
    pub const BASE_CURRENT: f32 = 0.2;
    /// Ток на единицу скважности (А)
    pub const DUTY_CURRENT_GAIN: f32 = 2.0;
    /// Ток на максимальной скорости (А)
    pub const SPEED_CURRENT_GAIN: f32 = 3.0;
    /// СКО шума измерения тока (А)
    pub const CURRENT_NOISE: f32 = 0.02;
    /// Максимальная скорость модели (об/мин)
    pub const MAX_SPEED_RPM: f32 = 1750.0;
}
