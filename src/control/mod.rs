//! Нечеткое управление двигателем и автомат безопасности

pub mod anfis;
pub mod membership;
pub mod rules;
pub mod safety;
pub mod sugeno;
pub mod training;

pub use anfis::{AnfisController, AnfisModel, ControlOutput, ControllerState, TrainingStatus};
pub use membership::TriangularSet;
pub use rules::FuzzyRuleEngine;
pub use safety::{SafetyMonitor, SafetyState};
pub use sugeno::{ConsequentMatrix, ConsequentStore, SugenoDefuzzifier};
pub use training::{AdaptiveTrainer, TrainingReport, TrainingSample};
