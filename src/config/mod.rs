//! Конфигурация системы управления двигателем
//!
//! Структура повторяет JSON-файл конфигурации ANFIS контроллера и драйвера:
//! `anfis_structure`, `membership_functions`, `training_params`, `sampling`,
//! `motor`, а также необязательные `actuation` и `simulation`.

pub mod defaults;
pub mod hardware;

use heapless::Vec;
use serde::Deserialize;

use crate::control::membership::TriangularSet;
use crate::error::ConfigError;
use defaults::anfis::{INPUT_VARS, MAX_SETS};

/// Список термов одного входа
pub type SetList = Vec<TriangularSet, MAX_SETS>;

/// Полная конфигурация
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MotorConfig {
    pub anfis_structure: AnfisStructure,
    pub membership_functions: MembershipFunctions,
    pub training_params: TrainingParams,
    pub sampling: Sampling,
    pub motor: MotorParams,
    #[serde(default)]
    pub actuation: Actuation,
    #[serde(default)]
    pub simulation: SimulationParams,
}

/// Структура нечеткой системы
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AnfisStructure {
    pub input_vars: usize,
    pub membership_functions: usize,
    pub training_epochs: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MembershipFunctions {
    pub error: InputSets,
    pub delta_error: InputSets,
}

/// Термы одного входа в порядке их индексов
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InputSets {
    pub ranges: SetList,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TrainingParams {
    pub learning_rate: f32,
    pub momentum: f32,
    pub error_goal: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Sampling {
    /// Частота цикла управления (Гц)
    pub rate_hz: f32,
    /// Частота цикла обновления объекта (Гц)
    #[serde(default = "default_monitor_rate")]
    pub monitor_rate_hz: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MotorParams {
    pub min_speed_rpm: f32,
    pub max_speed_rpm: f32,
    #[serde(alias = "pwm_frequency", default = "default_pwm_frequency")]
    pub pwm_frequency_hz: u32,
    #[serde(default = "default_pulses_per_revolution")]
    pub pulses_per_revolution: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Actuation {
    /// Предел |скважности| на входе объекта (%)
    pub duty_limit: f32,
}

/// Коэффициенты модели двигателя первого порядка
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub inertia: f32,
    pub damping: f32,
    pub torque_constant: f32,
    pub load_torque: f32,
    pub noise_level: f32,
    pub base_current: f32,
    pub duty_current_gain: f32,
    pub speed_current_gain: f32,
    pub current_noise: f32,
    pub max_speed_rpm: f32,
}

fn default_monitor_rate() -> f32 {
    defaults::sampling::MONITOR_RATE_HZ as f32
}

fn default_pwm_frequency() -> u32 {
    defaults::motor::PWM_FREQUENCY_HZ
}

fn default_pulses_per_revolution() -> u32 {
    defaults::motor::PULSES_PER_REVOLUTION
}

impl Default for Actuation {
    fn default() -> Self {
        Self {
            duty_limit: defaults::motor::DUTY_LIMIT,
        }
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        use defaults::simulation::*;
        Self {
            inertia: INERTIA,
            damping: DAMPING,
            torque_constant: TORQUE_CONSTANT,
            load_torque: LOAD_TORQUE,
            noise_level: NOISE_LEVEL,
            base_current: BASE_CURRENT,
            duty_current_gain: DUTY_CURRENT_GAIN,
            speed_current_gain: SPEED_CURRENT_GAIN,
            current_noise: CURRENT_NOISE,
            max_speed_rpm: MAX_SPEED_RPM,
        }
    }
}

fn set_list(params: &[[f32; 3]]) -> SetList {
    params
        .iter()
        .take(MAX_SETS)
        .map(|&[a, b, c]| TriangularSet::new(a, b, c))
        .collect()
}

impl Default for MotorConfig {
    fn default() -> Self {
        use defaults::{anfis, motor, sampling, training};
        Self {
            anfis_structure: AnfisStructure {
                input_vars: anfis::INPUT_VARS,
                membership_functions: anfis::MEMBERSHIP_FUNCTIONS,
                training_epochs: training::EPOCHS,
            },
            membership_functions: MembershipFunctions {
                error: InputSets {
                    ranges: set_list(&anfis::ERROR_SETS),
                },
                delta_error: InputSets {
                    ranges: set_list(&anfis::DELTA_ERROR_SETS),
                },
            },
            training_params: TrainingParams {
                learning_rate: training::LEARNING_RATE,
                momentum: training::MOMENTUM,
                error_goal: training::ERROR_GOAL,
            },
            sampling: Sampling {
                rate_hz: sampling::CONTROL_RATE_HZ as f32,
                monitor_rate_hz: sampling::MONITOR_RATE_HZ as f32,
            },
            motor: MotorParams {
                min_speed_rpm: motor::MIN_SPEED_RPM,
                max_speed_rpm: motor::MAX_SPEED_RPM,
                pwm_frequency_hz: motor::PWM_FREQUENCY_HZ,
                pulses_per_revolution: motor::PULSES_PER_REVOLUTION,
            },
            actuation: Actuation::default(),
            simulation: SimulationParams::default(),
        }
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

impl MotorConfig {
    /// Разбор и проверка JSON конфигурации
    #[cfg(feature = "std")]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        use std::string::ToString;

        let config: Self = serde_json::from_str(json).map_err(|e| {
            let mut msg = heapless::String::new();
            for ch in e.to_string().chars() {
                if msg.push(ch).is_err() {
                    break;
                }
            }
            ConfigError::Parse(msg)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Проверка всех инвариантов конфигурации
    pub fn validate(&self) -> Result<(), ConfigError> {
        let structure = &self.anfis_structure;
        if structure.input_vars != INPUT_VARS {
            return Err(ConfigError::InputCount(structure.input_vars));
        }
        if structure.membership_functions == 0 || structure.membership_functions > MAX_SETS {
            return Err(ConfigError::MembershipCount(
                structure.membership_functions,
                MAX_SETS,
            ));
        }

        let inputs = [
            ("error", &self.membership_functions.error.ranges),
            ("delta_error", &self.membership_functions.delta_error.ranges),
        ];
        for (input, sets) in inputs {
            if sets.len() != structure.membership_functions {
                return Err(ConfigError::SetCountMismatch {
                    input,
                    expected: structure.membership_functions,
                    actual: sets.len(),
                });
            }
            for (index, set) in sets.iter().enumerate() {
                if !set.is_valid() {
                    return Err(ConfigError::InvalidSet { input, index });
                }
            }
        }

        let training = &self.training_params;
        if structure.training_epochs == 0 {
            return Err(ConfigError::TrainingParam("training_epochs"));
        }
        if !(positive(training.learning_rate) && training.learning_rate < 2.0) {
            return Err(ConfigError::TrainingParam("learning_rate"));
        }
        if !(non_negative(training.momentum) && training.momentum < 1.0) {
            return Err(ConfigError::TrainingParam("momentum"));
        }
        if !non_negative(training.error_goal) {
            return Err(ConfigError::TrainingParam("error_goal"));
        }

        if !positive(self.sampling.rate_hz) {
            return Err(ConfigError::NonPositiveRate("rate_hz"));
        }
        if !positive(self.sampling.monitor_rate_hz) {
            return Err(ConfigError::NonPositiveRate("monitor_rate_hz"));
        }

        let motor = &self.motor;
        if !non_negative(motor.min_speed_rpm) {
            return Err(ConfigError::PlantParam("min_speed_rpm"));
        }
        if !(motor.max_speed_rpm.is_finite() && motor.max_speed_rpm > motor.min_speed_rpm) {
            return Err(ConfigError::PlantParam("max_speed_rpm"));
        }
        if motor.pwm_frequency_hz == 0 {
            return Err(ConfigError::PlantParam("pwm_frequency_hz"));
        }
        if motor.pulses_per_revolution == 0 {
            return Err(ConfigError::PlantParam("pulses_per_revolution"));
        }
        if !(positive(self.actuation.duty_limit) && self.actuation.duty_limit <= 100.0) {
            return Err(ConfigError::PlantParam("duty_limit"));
        }

        let sim = &self.simulation;
        let checks = [
            ("inertia", positive(sim.inertia)),
            ("damping", non_negative(sim.damping)),
            ("torque_constant", sim.torque_constant.is_finite()),
            ("load_torque", sim.load_torque.is_finite()),
            ("noise_level", non_negative(sim.noise_level)),
            ("base_current", non_negative(sim.base_current)),
            ("duty_current_gain", non_negative(sim.duty_current_gain)),
            ("speed_current_gain", non_negative(sim.speed_current_gain)),
            ("current_noise", non_negative(sim.current_noise)),
            ("max_speed_rpm", positive(sim.max_speed_rpm)),
        ];
        if let Some(&(name, _)) = checks.iter().find(|(_, ok)| !*ok) {
            return Err(ConfigError::PlantParam(name));
        }

        Ok(())
    }

    /// Количество правил: произведение количеств термов по входам
    pub fn rule_count(&self) -> usize {
        self.membership_functions.error.ranges.len()
            * self.membership_functions.delta_error.ranges.len()
    }

    /// Период дискретизации цикла управления (с)
    pub fn control_period_s(&self) -> f32 {
        1.0 / self.sampling.rate_hz
    }
}
