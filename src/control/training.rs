//! Обучение параметров заключений
//!
//! Нормированный градиентный шаг (NLMS) с инерцией по каждому примеру.
//! Для правила `k` с нормированной степенью `w_k` и регрессором
//! `x = [1, e, de]`:
//!
//! ```text
//! dp_k = lr * (y - y_raw) * w_k * x / (delta + sum_j(w_j^2) * |x|^2)
//! v_k  = momentum * v_k + dp_k
//! p_k += v_k
//! ```
//!
//! Обучение идет на локальной копии матрицы; после каждой эпохи матрица
//! публикуется целиком, поэтому контур управления никогда не видит частично
//! обновленную строку.

use crate::config::defaults::anfis::OUTPUT_LIMIT;
use crate::config::TrainingParams;
use crate::context::Context;
use crate::error::TrainingError;
use crate::utils::logging::LogSink;
use crate::utils::math::constrain_symmetric;

use super::anfis::{AnfisModel, TrainingGuard};
use super::sugeno::{regressor, ConsequentMatrix, SugenoDefuzzifier};

/// Регуляризация знаменателя нормированного шага
const NLMS_DELTA: f32 = 1e-6;

/// Обучающий пример: (ошибка, производная ошибки, желаемый выход)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrainingSample {
    pub error: f32,
    pub delta_error: f32,
    pub target_output: f32,
}

impl TrainingSample {
    pub const fn new(error: f32, delta_error: f32, target_output: f32) -> Self {
        Self {
            error,
            delta_error,
            target_output,
        }
    }
}

/// Итог обучения
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrainingReport {
    pub epochs_run: u32,
    /// Среднеквадратичная ошибка последней эпохи
    pub final_error: f32,
    pub converged: bool,
}

/// Состояние одного запуска обучения. Флаг занятости модели снимается
/// при уничтожении вместе с `_guard`.
struct TrainingRun<'a> {
    _guard: TrainingGuard<'a>,
    params: ConsequentMatrix,
    velocity: ConsequentMatrix,
    report: TrainingReport,
}

pub struct AdaptiveTrainer<'a> {
    model: &'a AnfisModel,
    params: TrainingParams,
    log: &'a dyn LogSink,
}

impl<'a> AdaptiveTrainer<'a> {
    pub fn new(ctx: Context<'a>, model: &'a AnfisModel) -> Self {
        Self {
            model,
            params: ctx.config.training_params,
            log: ctx.log,
        }
    }

    /// Обучение до `epochs` эпох или до MSE < `error_goal`
    pub fn train(
        &self,
        samples: &[TrainingSample],
        epochs: u32,
        error_goal: f32,
    ) -> Result<TrainingReport, TrainingError> {
        let mut run = self.begin(samples, epochs, error_goal)?;
        for epoch in 1..=epochs {
            if self.epoch(&mut run, samples, epoch, error_goal)? {
                break;
            }
        }
        Ok(self.finish(run))
    }

    /// То же, что [`train`](Self::train), но между эпохами управление
    /// возвращается исполнителю, и циклы управления не простаивают
    pub async fn train_async(
        &self,
        samples: &[TrainingSample],
        epochs: u32,
        error_goal: f32,
    ) -> Result<TrainingReport, TrainingError> {
        let mut run = self.begin(samples, epochs, error_goal)?;
        for epoch in 1..=epochs {
            if self.epoch(&mut run, samples, epoch, error_goal)? {
                break;
            }
            if epoch < epochs {
                embassy_futures::yield_now().await;
            }
        }
        Ok(self.finish(run))
    }

    fn begin(
        &self,
        samples: &[TrainingSample],
        epochs: u32,
        error_goal: f32,
    ) -> Result<TrainingRun<'a>, TrainingError> {
        if samples.is_empty() {
            return Err(TrainingError::EmptySampleSet);
        }
        let guard = self
            .model
            .begin_training()
            .ok_or(TrainingError::AlreadyRunning)?;

        info!(
            self.log,
            "Обучение: {} примеров, до {} эпох, цель {}",
            samples.len(),
            epochs,
            error_goal
        );

        let params = self.model.consequents().snapshot();
        let velocity = ConsequentMatrix::zeros(params.len());
        Ok(TrainingRun {
            _guard: guard,
            params,
            velocity,
            report: TrainingReport {
                epochs_run: 0,
                final_error: f32::INFINITY,
                converged: false,
            },
        })
    }

    /// Одна эпоха с публикацией матрицы. Возвращает true, если цель достигнута.
    fn epoch(
        &self,
        run: &mut TrainingRun<'a>,
        samples: &[TrainingSample],
        epoch: u32,
        error_goal: f32,
    ) -> Result<bool, TrainingError> {
        let engine = self.model.engine();
        let mut squared_error = 0.0f32;
        for sample in samples {
            let strengths = engine.normalized_strengths(sample.error, sample.delta_error);
            let raw = SugenoDefuzzifier::raw_output(
                sample.error,
                sample.delta_error,
                &strengths,
                &run.params,
            )?;
            let residual = sample.target_output - constrain_symmetric(raw, OUTPUT_LIMIT);
            squared_error += residual * residual;

            let x = regressor(sample.error, sample.delta_error);
            let energy: f32 = strengths.iter().map(|w| w * w).sum();
            let norm = NLMS_DELTA + energy * x.norm_squared();
            let gain = self.params.learning_rate * (sample.target_output - raw) / norm;

            for (k, &w) in strengths.iter().enumerate() {
                if w == 0.0 {
                    continue;
                }
                if let (Some(v), Some(p)) = (run.velocity.row_mut(k), run.params.row_mut(k)) {
                    *v = *v * self.params.momentum + x * (gain * w);
                    *p += *v;
                }
            }
        }

        let mse = squared_error / samples.len() as f32;
        self.model.consequents().replace(run.params.clone());
        self.model.record_epoch();
        run.report.epochs_run = epoch;
        run.report.final_error = mse;
        debug!(self.log, "Эпоха {}: MSE = {}", epoch, mse);

        run.report.converged = mse < error_goal;
        Ok(run.report.converged)
    }

    fn finish(&self, run: TrainingRun<'a>) -> TrainingReport {
        let report = run.report;
        // без единой эпохи модель не считается обученной
        if report.epochs_run > 0 {
            self.model.mark_trained();
        }
        info!(
            self.log,
            "Обучение завершено: эпох {}, MSE {}, сходимость {}",
            report.epochs_run,
            report.final_error,
            report.converged
        );
        report
    }

    /// Обучение с параметрами из конфигурации
    pub fn train_configured(
        &self,
        samples: &[TrainingSample],
        epochs: u32,
    ) -> Result<TrainingReport, TrainingError> {
        self.train(samples, epochs, self.params.error_goal)
    }

    /// Асинхронное обучение с параметрами из конфигурации
    pub async fn train_configured_async(
        &self,
        samples: &[TrainingSample],
        epochs: u32,
    ) -> Result<TrainingReport, TrainingError> {
        self.train_async(samples, epochs, self.params.error_goal).await
    }

    /// Среднеквадратичная ошибка без изменения параметров
    pub fn evaluate(&self, samples: &[TrainingSample]) -> Result<f32, TrainingError> {
        if samples.is_empty() {
            return Err(TrainingError::EmptySampleSet);
        }
        let mut squared_error = 0.0f32;
        for sample in samples {
            let out = constrain_symmetric(
                self.model.raw_output(sample.error, sample.delta_error)?,
                OUTPUT_LIMIT,
            );
            let residual = sample.target_output - out;
            squared_error += residual * residual;
        }
        Ok(squared_error / samples.len() as f32)
    }
}
