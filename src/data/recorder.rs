//! Запись сеанса управления и статистика по нему

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::{HistoryBuffer, Vec};

use super::{ControlMode, Measurements};
use crate::control::safety::SafetyState;
use crate::control::training::TrainingSample;
use crate::utils::math::RunningStats;

/// Запись одного такта цикла управления
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    pub measurements: Measurements,
    pub error: f32,
    pub delta_error: f32,
    /// Скважность, прошедшая через автомат безопасности
    pub commanded: f32,
    pub mode: ControlMode,
    pub safety: SafetyState,
}

/// Приемник записей цикла управления
pub trait SampleSink: Sync {
    fn record(&self, sample: &Sample);
}

/// Отбрасывает записи
pub struct NullSink;

impl SampleSink for NullSink {
    fn record(&self, _sample: &Sample) {}
}

/// Статистика одного поля
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldStats {
    pub mean: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
}

impl From<&RunningStats> for FieldStats {
    fn from(stats: &RunningStats) -> Self {
        Self {
            mean: stats.mean(),
            std: stats.std_deviation(),
            min: stats.min(),
            max: stats.max(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionStatistics {
    pub samples: usize,
    pub speed: FieldStats,
    pub current: FieldStats,
    pub duty_cycle: FieldStats,
    pub error: FieldStats,
}

/// Кольцевой буфер последних `N` записей
pub struct SessionRecorder<const N: usize> {
    samples: Mutex<CriticalSectionRawMutex, RefCell<HistoryBuffer<Sample, N>>>,
}

impl<const N: usize> SessionRecorder<N> {
    pub const fn new() -> Self {
        Self {
            samples: Mutex::new(RefCell::new(HistoryBuffer::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.lock(|s| s.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.samples.lock(|s| s.borrow_mut().clear());
    }

    pub fn latest(&self) -> Option<Sample> {
        self.samples.lock(|s| s.borrow().recent().copied())
    }

    /// Среднее, СКО и экстремумы по всем записям буфера
    pub fn statistics(&self) -> SessionStatistics {
        self.samples.lock(|s| {
            let samples = s.borrow();
            let mut speed = RunningStats::new();
            let mut current = RunningStats::new();
            let mut duty = RunningStats::new();
            let mut error = RunningStats::new();
            for sample in samples.oldest_ordered() {
                speed.push(sample.measurements.speed);
                current.push(sample.measurements.current);
                duty.push(sample.commanded);
                error.push(sample.error);
            }
            SessionStatistics {
                samples: samples.len(),
                speed: (&speed).into(),
                current: (&current).into(),
                duty_cycle: (&duty).into(),
                error: (&error).into(),
            }
        })
    }

    /// Обучающая выборка из тактов, когда двигатель работал:
    /// (ошибка, производная ошибки, выданная скважность)
    pub fn training_samples(&self) -> Vec<TrainingSample, N> {
        self.samples.lock(|s| {
            s.borrow()
                .oldest_ordered()
                .filter(|sample| sample.safety == SafetyState::Running)
                .map(|sample| {
                    TrainingSample::new(sample.error, sample.delta_error, sample.commanded)
                })
                .collect()
        })
    }
}

impl<const N: usize> Default for SessionRecorder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SampleSink for SessionRecorder<N> {
    fn record(&self, sample: &Sample) {
        self.samples.lock(|s| s.borrow_mut().write(*sample));
    }
}
