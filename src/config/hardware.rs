//! Конфигурация аппаратного обеспечения драйвера двигателя (RP2040)

/// Конфигурация пинов GPIO
pub mod pins {
    /// H-мост (L298N или аналог)
    pub mod motor {
        /// ШИМ выход на вход ENA
        pub const PWM_PIN: u8 = 18; // GPIO18 - PWM1A
        /// Вход IN1 (вперед)
        pub const IN1_PIN: u8 = 20; // GPIO20
        /// Вход IN2 (назад)
        pub const IN2_PIN: u8 = 21; // GPIO21
    }

    /// Датчики
    pub mod sensors {
        /// ИК датчик оборотов, активный низкий уровень
        pub const IR_SENSOR_PIN: u8 = 16; // GPIO16
        /// Кнопка аварийной остановки, замыкает на землю
        pub const EMERGENCY_STOP_PIN: u8 = 15; // GPIO15
    }

    /// Встроенный светодиод на Pico
    pub const LED_PIN: u8 = 25;
}

/// Параметры ШИМ
pub mod pwm {
    /// Делитель частоты: 125 МГц / 125 = 1 МГц
    pub const DIVIDER: u8 = 125;

    /// Период счетчика для 1 кГц при 1 МГц
    pub const TOP: u16 = 1000;
}

/// Параметры канала событий от датчиков
pub mod events {
    /// Емкость очереди фронтов
    pub const EDGE_QUEUE_SIZE: usize = 32;

    /// Время без импульсов, после которого скорость считается нулевой (мс)
    pub const SPEED_TIMEOUT_MS: u64 = 500;

    /// Минимальный интервал между импульсами, защита от дребезга (мкс)
    pub const MIN_PULSE_INTERVAL_US: u64 = 500;
}
