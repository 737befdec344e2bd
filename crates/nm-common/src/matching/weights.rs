use serde::Serialize;
use thiserror::Error;

const SUM_TOLERANCE: f64 = 1e-6;

/// Component weights for the deterministic engine.
/// skills / interests / goals carry most of the signal; location is a tie-breaker.
pub const DEFAULT_WEIGHTS: Weights = Weights {
    skills: 0.30,
    interests: 0.25,
    goals: 0.25,
    experience: 0.15,
    location: 0.05,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weights {
    pub skills: f64,
    pub interests: f64,
    pub goals: f64,
    pub experience: f64,
    pub location: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum WeightsError {
    #[error("weight `{0}` must be a finite non-negative number")]
    InvalidComponent(&'static str),
    #[error("weights must sum to 1.0 (got {0})")]
    BadSum(f64),
}

impl Default for Weights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.skills + self.interests + self.goals + self.experience + self.location
    }

    pub fn validate(&self) -> Result<(), WeightsError> {
        let components = [
            ("skills", self.skills),
            ("interests", self.interests),
            ("goals", self.goals),
            ("experience", self.experience),
            ("location", self.location),
        ];

        for (name, value) in components {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::InvalidComponent(name));
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(WeightsError::BadSum(sum));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        assert!((DEFAULT_WEIGHTS.sum() - 1.0).abs() < 1e-6);
        assert!(DEFAULT_WEIGHTS.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_sum_and_negative_components() {
        let heavy = Weights {
            skills: 0.9,
            ..DEFAULT_WEIGHTS
        };
        assert!(matches!(heavy.validate(), Err(WeightsError::BadSum(_))));

        let negative = Weights {
            location: -0.05,
            skills: 0.40,
            ..DEFAULT_WEIGHTS
        };
        assert_eq!(
            negative.validate(),
            Err(WeightsError::InvalidComponent("location"))
        );
    }
}
