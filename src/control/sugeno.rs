//! Дефаззификация Сугено первого порядка и матрица заключений

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::config::defaults::anfis::{MAX_RULES, OUTPUT_LIMIT};
use crate::error::ControlError;
use crate::utils::logging::LogSink;
use crate::utils::math::constrain_symmetric;

/// Линейное заключение правила: [смещение, коэф. ошибки, коэф. производной]
pub type Consequent = Vector3<f32>;

/// Вектор входов заключения с единицей для смещения
#[inline]
pub fn regressor(error: f32, delta_error: f32) -> Vector3<f32> {
    Vector3::new(1.0, error, delta_error)
}

/// Матрица заключений, одна строка на правило
#[derive(Debug, Clone, PartialEq)]
pub struct ConsequentMatrix {
    rows: Vec<Consequent, MAX_RULES>,
}

impl ConsequentMatrix {
    pub fn zeros(rules: usize) -> Self {
        let mut rows = Vec::new();
        for _ in 0..rules.min(MAX_RULES) {
            let _ = rows.push(Consequent::zeros());
        }
        Self { rows }
    }

    /// Случайная инициализация из стандартного нормального распределения
    pub fn random<R: Rng + ?Sized>(rules: usize, rng: &mut R) -> Self {
        let mut matrix = Self::zeros(rules);
        for row in matrix.rows.iter_mut() {
            *row = Consequent::new(
                rng.sample(StandardNormal),
                rng.sample(StandardNormal),
                rng.sample(StandardNormal),
            );
        }
        matrix
    }

    pub fn from_rows(rows: &[[f32; 3]]) -> Self {
        Self {
            rows: rows
                .iter()
                .take(MAX_RULES)
                .map(|&[bias, k_error, k_delta]| Consequent::new(bias, k_error, k_delta))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, k: usize) -> Option<&Consequent> {
        self.rows.get(k)
    }

    pub fn row_mut(&mut self, k: usize) -> Option<&mut Consequent> {
        self.rows.get_mut(k)
    }

    pub fn rows(&self) -> &[Consequent] {
        &self.rows
    }

    /// Выход правила `k`: bias + k_e * e + k_de * de
    pub fn rule_output(&self, k: usize, error: f32, delta_error: f32) -> Option<f32> {
        self.row(k).map(|p| p.dot(&regressor(error, delta_error)))
    }
}

/// Общее хранилище параметров заключений: читает дефаззификатор, пишет обучение.
///
/// Читатель всегда получает целую копию матрицы, поэтому частично обновленная
/// строка ему не видна.
pub struct ConsequentStore {
    matrix: Mutex<CriticalSectionRawMutex, RefCell<ConsequentMatrix>>,
}

impl ConsequentStore {
    pub fn new(matrix: ConsequentMatrix) -> Self {
        Self {
            matrix: Mutex::new(RefCell::new(matrix)),
        }
    }

    pub fn snapshot(&self) -> ConsequentMatrix {
        self.matrix.lock(|m| m.borrow().clone())
    }

    pub fn replace(&self, matrix: ConsequentMatrix) {
        self.matrix.lock(|m| *m.borrow_mut() = matrix);
    }

    /// Вычисление над текущей матрицей без копирования
    pub fn with<R>(&self, f: impl FnOnce(&ConsequentMatrix) -> R) -> R {
        self.matrix.lock(|m| f(&m.borrow()))
    }
}

/// Взвешенная сумма заключений
pub struct SugenoDefuzzifier<'a> {
    log: &'a dyn LogSink,
}

impl<'a> SugenoDefuzzifier<'a> {
    pub fn new(log: &'a dyn LogSink) -> Self {
        Self { log }
    }

    /// Выход без ограничения. Ошибка, если форма не совпадает.
    pub fn raw_output(
        error: f32,
        delta_error: f32,
        normalized: &[f32],
        consequents: &ConsequentMatrix,
    ) -> Result<f32, ControlError> {
        if normalized.len() != consequents.len() {
            return Err(ControlError::ShapeMismatch {
                rules: normalized.len(),
                rows: consequents.len(),
            });
        }
        let x = regressor(error, delta_error);
        let output: f32 = normalized
            .iter()
            .zip(consequents.rows())
            .map(|(w, p)| w * p.dot(&x))
            .sum();
        if output.is_finite() {
            Ok(output)
        } else {
            Err(ControlError::NonFinite)
        }
    }

    /// Четкий выход в диапазоне [-100, 100]. При ошибке пишет в журнал и
    /// возвращает безопасный ноль.
    pub fn output(
        &self,
        error: f32,
        delta_error: f32,
        normalized: &[f32],
        consequents: &ConsequentMatrix,
    ) -> f32 {
        self.finish(Self::raw_output(error, delta_error, normalized, consequents))
    }

    /// Ограничение результата или безопасный ноль с записью в журнал
    pub fn finish(&self, result: Result<f32, ControlError>) -> f32 {
        match result {
            Ok(output) => constrain_symmetric(output, OUTPUT_LIMIT),
            Err(e) => {
                error!(self.log, "Ошибка дефаззификации: {}", e);
                0.0
            }
        }
    }
}
