//! ANFIS контроллер: база правил, общее хранилище заключений и состояние
//! контура управления

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::rules::FuzzyRuleEngine;
use super::sugeno::{ConsequentMatrix, ConsequentStore, SugenoDefuzzifier};
use crate::context::Context;
use crate::error::{ConfigError, ControlError};
use crate::utils::logging::LogSink;

/// Состояние обучения модели
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrainingStatus {
    pub trained: bool,
    /// Сколько эпох выполнено за все запуски обучения
    pub epochs: u32,
}

/// Модель нечеткого вывода, разделяемая контуром управления и обучением
pub struct AnfisModel {
    engine: FuzzyRuleEngine,
    consequents: ConsequentStore,
    status: Mutex<CriticalSectionRawMutex, Cell<TrainingStatus>>,
    training: Mutex<CriticalSectionRawMutex, Cell<bool>>,
}

impl AnfisModel {
    /// Создание модели со случайными заключениями N(0, 1)
    pub fn new(ctx: Context<'_>, seed: u64) -> Result<Self, ConfigError> {
        let engine = FuzzyRuleEngine::from_config(ctx.config)?;
        let mut rng = SmallRng::seed_from_u64(seed);
        let consequents = ConsequentMatrix::random(engine.rule_count(), &mut rng);
        info!(
            ctx.log,
            "ANFIS: {} правил, заключения инициализированы случайно",
            engine.rule_count()
        );
        Ok(Self::with_consequents(engine, consequents))
    }

    pub fn with_consequents(engine: FuzzyRuleEngine, consequents: ConsequentMatrix) -> Self {
        Self {
            engine,
            consequents: ConsequentStore::new(consequents),
            status: Mutex::new(Cell::new(TrainingStatus::default())),
            training: Mutex::new(Cell::new(false)),
        }
    }

    pub fn engine(&self) -> &FuzzyRuleEngine {
        &self.engine
    }

    pub fn consequents(&self) -> &ConsequentStore {
        &self.consequents
    }

    /// Замена всей матрицы заключений (например, сохраненной ранее)
    pub fn load_consequents(&self, matrix: ConsequentMatrix) -> Result<(), ControlError> {
        if matrix.len() != self.engine.rule_count() {
            return Err(ControlError::ShapeMismatch {
                rules: self.engine.rule_count(),
                rows: matrix.len(),
            });
        }
        self.consequents.replace(matrix);
        Ok(())
    }

    pub fn status(&self) -> TrainingStatus {
        self.status.lock(|s| s.get())
    }

    pub(crate) fn record_epoch(&self) {
        self.status.lock(|s| {
            let mut status = s.get();
            status.epochs = status.epochs.saturating_add(1);
            s.set(status);
        });
    }

    pub(crate) fn mark_trained(&self) {
        self.status.lock(|s| {
            let mut status = s.get();
            status.trained = true;
            s.set(status);
        });
    }

    /// Захват права на обучение. `None`, если обучение уже идет.
    pub fn begin_training(&self) -> Option<TrainingGuard<'_>> {
        self.training.lock(|busy| {
            if busy.get() {
                None
            } else {
                busy.set(true);
                Some(TrainingGuard { model: self })
            }
        })
    }

    pub fn is_training(&self) -> bool {
        self.training.lock(|busy| busy.get())
    }

    /// Выход без ограничения по текущим заключениям
    pub fn raw_output(&self, error: f32, delta_error: f32) -> Result<f32, ControlError> {
        let strengths = self.engine.normalized_strengths(error, delta_error);
        self.consequents
            .with(|m| SugenoDefuzzifier::raw_output(error, delta_error, &strengths, m))
    }

    /// Полный конвейер вывода с ограничением [-100, 100]
    pub fn infer(&self, error: f32, delta_error: f32, log: &dyn LogSink) -> f32 {
        SugenoDefuzzifier::new(log).finish(self.raw_output(error, delta_error))
    }
}

/// Флаг обучения снимается при выходе из области видимости
pub struct TrainingGuard<'a> {
    model: &'a AnfisModel,
}

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        self.model.training.lock(|busy| busy.set(false));
    }
}

/// Состояние контура: последняя ошибка и период дискретизации
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerState {
    pub last_error: Option<f32>,
    pub sample_period: f32,
}

/// Результат одного шага контроллера
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlOutput {
    pub error: f32,
    pub delta_error: f32,
    pub output: f32,
}

/// Адаптивный контроллер для цикла управления. Единственный писатель
/// своего состояния.
pub struct AnfisController<'a> {
    model: &'a AnfisModel,
    state: ControllerState,
    log: &'a dyn LogSink,
}

impl<'a> AnfisController<'a> {
    pub fn new(ctx: Context<'a>, model: &'a AnfisModel) -> Self {
        Self {
            model,
            state: ControllerState {
                last_error: None,
                sample_period: ctx.config.control_period_s(),
            },
            log: ctx.log,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn model(&self) -> &'a AnfisModel {
        self.model
    }

    /// Обновление ошибки без вычисления выхода (ручной режим).
    /// Возвращает производную ошибки; на первом шаге она равна нулю.
    pub fn track(&mut self, error: f32) -> f32 {
        let delta_error = match self.state.last_error {
            Some(previous) => (error - previous) / self.state.sample_period,
            None => 0.0,
        };
        self.state.last_error = Some(error);
        delta_error
    }

    /// Шаг адаптивного управления. Ошибки вычисления не выходят наружу:
    /// выход становится нулевым, а ошибка пишется в журнал.
    pub fn compute(&mut self, error: f32) -> ControlOutput {
        let delta_error = self.track(error);
        let output = self.model.infer(error, delta_error, self.log);
        ControlOutput {
            error,
            delta_error,
            output,
        }
    }

    /// Сброс истории, чтобы следующий шаг не дал скачка производной
    pub fn reset(&mut self) {
        self.state.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotorConfig;
    use crate::utils::logging::testing::RecordingLog;
    use crate::utils::logging::{LogLevel, NoopLog};

    fn model(config: &MotorConfig) -> AnfisModel {
        AnfisModel::new(Context::new(config, &NoopLog), 42).unwrap()
    }

    #[test]
    fn zero_inputs_yield_zero_rule_bias() {
        let config = MotorConfig::default();
        let model = model(&config);
        let mut rows = [[0.0f32; 3]; 9];
        for (k, row) in rows.iter_mut().enumerate() {
            *row = [k as f32 * 10.0 - 40.0, 1.0, 1.0];
        }
        // правило 4 = (ошибка ноль, производная ноль)
        rows[4][0] = 7.5;
        model.load_consequents(ConsequentMatrix::from_rows(&rows)).unwrap();
        let out = model.infer(0.0, 0.0, &NoopLog);
        assert!((out - 7.5).abs() < 1e-4);
    }

    #[test]
    fn output_stays_within_actuation_range() {
        let config = MotorConfig::default();
        let model = model(&config);
        let mut e = -500.0;
        while e <= 500.0 {
            let mut de = -50.0;
            while de <= 50.0 {
                let out = model.infer(e, de, &NoopLog);
                assert!((-100.0..=100.0).contains(&out), "e={} de={} out={}", e, de, out);
                de += 3.5;
            }
            e += 12.5;
        }
    }

    #[test]
    fn rejects_consequents_of_wrong_shape() {
        let config = MotorConfig::default();
        let model = model(&config);
        assert_eq!(
            model.load_consequents(ConsequentMatrix::zeros(4)),
            Err(ControlError::ShapeMismatch { rules: 9, rows: 4 })
        );
    }

    #[test]
    fn first_step_has_zero_delta_error() {
        let config = MotorConfig::default();
        let model = model(&config);
        let mut controller = AnfisController::new(Context::new(&config, &NoopLog), &model);
        assert_eq!(controller.compute(30.0).delta_error, 0.0);
        // (20 - 30) / 0.01
        let step = controller.compute(20.0);
        assert!((step.delta_error + 1000.0).abs() < 1e-2);
        assert_eq!(controller.state().last_error, Some(20.0));

        controller.reset();
        assert_eq!(controller.track(5.0), 0.0);
    }

    #[test]
    fn failed_inference_is_logged_and_zeroed() {
        let config = MotorConfig::default();
        let engine = FuzzyRuleEngine::from_config(&config).unwrap();
        let model = AnfisModel::with_consequents(engine, ConsequentMatrix::zeros(3));
        let log = RecordingLog::new();
        let mut controller = AnfisController::new(Context::new(&config, &log), &model);
        assert_eq!(controller.compute(10.0).output, 0.0);
        assert_eq!(log.count(LogLevel::Error), 1);
    }

    #[test]
    fn training_guard_is_exclusive() {
        let config = MotorConfig::default();
        let model = model(&config);
        let guard = model.begin_training();
        assert!(guard.is_some());
        assert!(model.is_training());
        assert!(model.begin_training().is_none());
        drop(guard);
        assert!(!model.is_training());
        assert!(model.begin_training().is_some());
    }
}
