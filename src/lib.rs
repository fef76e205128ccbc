//! Управление двигателем постоянного тока адаптивным нечетким
//! контроллером (ANFIS, Сугено первого порядка)

#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod utils;

pub mod config;
pub mod context;
pub mod control;
pub mod data;
pub mod drivers;
pub mod error;
pub mod plant;
pub mod sensors;
pub mod system;
pub mod tasks;

pub use utils::{filters, logging, math};

pub use config::MotorConfig;
pub use context::Context;
pub use control::{AdaptiveTrainer, AnfisModel, SafetyMonitor, SafetyState, TrainingSample};
pub use data::recorder::{SampleSink, SessionRecorder};
pub use data::{ControlMode, EdgeChannel, EdgeEvent, EdgeLine, Measurements};
pub use error::{CommandError, ConfigError, ControlError, HardwareError, TrainingError};
pub use plant::{PlantModel, RealActuator, SimulatedMotor};
pub use system::MotorSystem;
