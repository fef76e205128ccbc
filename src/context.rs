//! Контекст, передаваемый компонентам при создании

use crate::config::MotorConfig;
use crate::utils::logging::LogSink;

/// Конфигурация и канал журналирования. Глобальных синглтонов нет:
/// каждый компонент получает контекст явно.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub config: &'a MotorConfig,
    pub log: &'a dyn LogSink,
}

impl<'a> Context<'a> {
    pub fn new(config: &'a MotorConfig, log: &'a dyn LogSink) -> Self {
        Self { config, log }
    }
}
