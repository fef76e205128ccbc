//! База правил: декартово произведение термов ошибки и ее производной

use heapless::Vec;

use crate::config::defaults::anfis::{FIRING_EPSILON, MAX_RULES, MAX_SETS};
use crate::config::{MotorConfig, SetList};
use crate::error::ConfigError;

/// Степени срабатывания в каноническом порядке правил
pub type Strengths = Vec<f32, MAX_RULES>;

/// Нечеткий вывод по правилам вида
/// "ЕСЛИ ошибка есть E_i И производная есть D_j".
///
/// Правило `k` соответствует паре `(k / |D|, k % |D|)`: внешний цикл по термам
/// ошибки, внутренний по термам производной. Строки матрицы заключений
/// адресуются тем же индексом.
#[derive(Debug, Clone)]
pub struct FuzzyRuleEngine {
    error_sets: SetList,
    delta_sets: SetList,
}

impl FuzzyRuleEngine {
    pub fn new(error_sets: SetList, delta_sets: SetList) -> Result<Self, ConfigError> {
        for (input, sets) in [("error", &error_sets), ("delta_error", &delta_sets)] {
            if sets.is_empty() {
                return Err(ConfigError::MembershipCount(0, MAX_SETS));
            }
            if let Some(index) = sets.iter().position(|s| !s.is_valid()) {
                return Err(ConfigError::InvalidSet { input, index });
            }
        }
        Ok(Self {
            error_sets,
            delta_sets,
        })
    }

    pub fn from_config(config: &MotorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(
            config.membership_functions.error.ranges.clone(),
            config.membership_functions.delta_error.ranges.clone(),
        )
    }

    /// Количество правил, фиксировано при создании
    pub fn rule_count(&self) -> usize {
        self.error_sets.len() * self.delta_sets.len()
    }

    /// Индексы термов (ошибка, производная) правила `k`
    pub fn antecedents(&self, k: usize) -> (usize, usize) {
        (k / self.delta_sets.len(), k % self.delta_sets.len())
    }

    /// Степени срабатывания, t-норма минимума
    pub fn firing_strengths(&self, error: f32, delta_error: f32) -> Strengths {
        let delta_grades: Vec<f32, MAX_SETS> =
            self.delta_sets.iter().map(|s| s.grade(delta_error)).collect();

        let mut strengths = Strengths::new();
        for set in self.error_sets.iter() {
            let error_grade = set.grade(error);
            for &delta_grade in delta_grades.iter() {
                // емкость MAX_RULES = MAX_SETS^2 не может быть превышена
                let _ = strengths.push(error_grade.min(delta_grade));
            }
        }
        strengths
    }

    /// Нормированные степени срабатывания
    pub fn normalized_strengths(&self, error: f32, delta_error: f32) -> Strengths {
        let mut strengths = self.firing_strengths(error, delta_error);
        normalize(&mut strengths);
        strengths
    }
}

/// Деление на сумму плюс эпсилон. Если не сработало ни одно правило,
/// все степени остаются нулевыми.
pub fn normalize(strengths: &mut [f32]) {
    let total: f32 = strengths.iter().sum::<f32>() + FIRING_EPSILON;
    for w in strengths.iter_mut() {
        *w /= total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> FuzzyRuleEngine {
        FuzzyRuleEngine::from_config(&MotorConfig::default()).unwrap()
    }

    #[test]
    fn rule_count_is_product_of_set_counts() {
        assert_eq!(engine().rule_count(), 9);

        let mut config = MotorConfig::default();
        config.anfis_structure.membership_functions = 2;
        config.membership_functions.error.ranges.truncate(2);
        config.membership_functions.delta_error.ranges.truncate(2);
        let small = FuzzyRuleEngine::from_config(&config).unwrap();
        assert_eq!(small.rule_count(), 4);
    }

    #[test]
    fn canonical_order_is_error_major() {
        let engine = engine();
        assert_eq!(engine.antecedents(0), (0, 0));
        assert_eq!(engine.antecedents(1), (0, 1));
        assert_eq!(engine.antecedents(3), (1, 0));
        assert_eq!(engine.antecedents(8), (2, 2));
    }

    #[test]
    fn zero_inputs_fire_only_zero_rule() {
        let strengths = engine().firing_strengths(0.0, 0.0);
        for (k, w) in strengths.iter().enumerate() {
            let expected = if k == 4 { 1.0 } else { 0.0 };
            assert_eq!(*w, expected, "rule {}", k);
        }
    }

    #[test]
    fn uses_minimum_t_norm() {
        // ошибка: Z=0.5, P=0.25; производная: Z=0.5, P=0.25
        let strengths = engine().firing_strengths(25.0, 2.5);
        assert_eq!(strengths[4], 0.5); // произведение дало бы 0.25
        assert_eq!(strengths[5], 0.25);
        assert_eq!(strengths[7], 0.25);
        assert_eq!(strengths[8], 0.25);
        assert_eq!(strengths[0], 0.0);

        let normalized = engine().normalized_strengths(25.0, 2.5);
        assert!((normalized[4] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn normalized_strengths_are_bounded() {
        let engine = engine();
        let mut e = -150.0;
        while e <= 150.0 {
            let mut de = -15.0;
            while de <= 15.0 {
                let normalized = engine.normalized_strengths(e, de);
                let sum: f32 = normalized.iter().sum();
                assert!(normalized.iter().all(|w| (0.0..=1.0).contains(w)));
                assert!(sum <= 1.0 + 1e-5, "sum {} at ({}, {})", sum, e, de);
                let fired = engine.firing_strengths(e, de).iter().any(|w| *w > 0.0);
                if fired {
                    assert!((sum - 1.0).abs() < 1e-5, "sum {} at ({}, {})", sum, e, de);
                } else {
                    assert_eq!(sum, 0.0);
                }
                de += 1.25;
            }
            e += 7.5;
        }
    }

    #[test]
    fn out_of_range_inputs_fire_nothing() {
        let normalized = engine().normalized_strengths(500.0, 0.0);
        assert!(normalized.iter().all(|w| *w == 0.0));
    }

    #[test]
    fn rejects_invalid_sets() {
        let mut sets = MotorConfig::default().membership_functions.error.ranges;
        sets[0] = crate::control::membership::TriangularSet::new(1.0, 0.0, 0.0);
        let delta = MotorConfig::default().membership_functions.delta_error.ranges;
        assert_eq!(
            FuzzyRuleEngine::new(sets, delta).unwrap_err(),
            ConfigError::InvalidSet {
                input: "error",
                index: 0
            }
        );
    }
}
