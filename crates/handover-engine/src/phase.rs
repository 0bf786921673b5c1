//! Elevation phase classification.
//!
//! Layered thresholds: monitoring above `pre_handover`, preparation
//! between `pre_handover` and `execution`, execution down to `critical`,
//! then critical until the satellite sets.

use crate::{Environment, HandoverError, Result, Urgency};
use serde::{Deserialize, Serialize};

/// Declared in descent order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoverPhase {
    Monitoring,
    PreHandover,
    Execution,
    Critical,
    Disconnected,
}

impl HandoverPhase {
    /// Position in the descent order, Monitoring = 0
    pub fn rank(&self) -> u8 {
        match self {
            HandoverPhase::Monitoring => 0,
            HandoverPhase::PreHandover => 1,
            HandoverPhase::Execution => 2,
            HandoverPhase::Critical => 3,
            HandoverPhase::Disconnected => 4,
        }
    }
}

/// ITU-R P.618 elevation compliance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItuCompliance {
    /// At or above the execution threshold
    Standard,
    /// Between the critical minimum and execution
    Minimum,
    BelowMinimum,
}

/// Elevation thresholds in degrees, `pre_handover > execution > critical > 0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseThresholds {
    pub pre_handover_deg: f64,
    pub execution_deg: f64,
    pub critical_deg: f64,
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            pre_handover_deg: 15.0,
            execution_deg: 10.0,
            critical_deg: 5.0,
        }
    }
}

impl PhaseThresholds {
    pub fn new(pre_handover_deg: f64, execution_deg: f64, critical_deg: f64) -> Result<Self> {
        let t = Self {
            pre_handover_deg,
            execution_deg,
            critical_deg,
        };
        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> Result<()> {
        let ordered = self.pre_handover_deg > self.execution_deg
            && self.execution_deg > self.critical_deg
            && self.critical_deg > 0.0;

        if !ordered || !self.pre_handover_deg.is_finite() {
            return Err(HandoverError::InvalidConfig(format!(
                "thresholds must satisfy pre_handover > execution > critical > 0, got {}/{}/{}",
                self.pre_handover_deg, self.execution_deg, self.critical_deg
            )));
        }
        Ok(())
    }

    /// Scale pre-handover and execution by `factor`. Critical stays fixed.
    pub fn scaled(&self, factor: f64) -> Result<Self> {
        let t = Self {
            pre_handover_deg: self.pre_handover_deg * factor,
            execution_deg: self.execution_deg * factor,
            critical_deg: self.critical_deg,
        };
        t.validate()?;
        Ok(t)
    }

    pub fn for_environment(&self, environment: Environment) -> Result<Self> {
        self.scaled(environment.threshold_factor())
    }
}

pub fn classify(elevation_deg: f64, thresholds: &PhaseThresholds) -> HandoverPhase {
    // NaN compares false everywhere and falls through to Disconnected
    if elevation_deg >= thresholds.pre_handover_deg {
        HandoverPhase::Monitoring
    } else if elevation_deg >= thresholds.execution_deg {
        HandoverPhase::PreHandover
    } else if elevation_deg >= thresholds.critical_deg {
        HandoverPhase::Execution
    } else if elevation_deg > 0.0 {
        HandoverPhase::Critical
    } else {
        HandoverPhase::Disconnected
    }
}

/// Urgency from how close the serving satellite is to the critical floor
pub fn elevation_urgency(elevation_deg: f64, thresholds: &PhaseThresholds) -> Urgency {
    let crit = thresholds.critical_deg;
    if elevation_deg <= crit {
        Urgency::Critical
    } else if elevation_deg <= crit + 1.0 {
        Urgency::High
    } else if elevation_deg <= crit + 2.0 {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

pub fn itu_compliance(elevation_deg: f64, thresholds: &PhaseThresholds) -> ItuCompliance {
    if elevation_deg >= thresholds.execution_deg {
        ItuCompliance::Standard
    } else if elevation_deg >= thresholds.critical_deg {
        ItuCompliance::Minimum
    } else {
        ItuCompliance::BelowMinimum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_bands() {
        let t = PhaseThresholds::default();
        assert_eq!(classify(45.0, &t), HandoverPhase::Monitoring);
        assert_eq!(classify(15.0, &t), HandoverPhase::Monitoring);
        assert_eq!(classify(12.0, &t), HandoverPhase::PreHandover);
        assert_eq!(classify(10.0, &t), HandoverPhase::PreHandover);
        assert_eq!(classify(8.0, &t), HandoverPhase::Execution);
        assert_eq!(classify(5.0, &t), HandoverPhase::Execution);
        assert_eq!(classify(4.0, &t), HandoverPhase::Critical);
        assert_eq!(classify(0.0, &t), HandoverPhase::Disconnected);
        assert_eq!(classify(-12.0, &t), HandoverPhase::Disconnected);
        assert_eq!(classify(f64::NAN, &t), HandoverPhase::Disconnected);
    }

    #[test]
    fn test_environment_keeps_critical() {
        let t = PhaseThresholds::default().for_environment(Environment::HeavyRain).unwrap();
        assert!((t.pre_handover_deg - 21.0).abs() < 1e-9);
        assert!((t.execution_deg - 14.0).abs() < 1e-9);
        assert_eq!(t.critical_deg, 5.0);

        // 18° is monitoring in open sky, preparation in heavy rain
        assert_eq!(classify(18.0, &PhaseThresholds::default()), HandoverPhase::Monitoring);
        assert_eq!(classify(18.0, &t), HandoverPhase::PreHandover);
    }

    #[test]
    fn test_invalid_ordering_rejected() {
        assert!(PhaseThresholds::new(10.0, 15.0, 5.0).is_err());
        assert!(PhaseThresholds::new(15.0, 10.0, 0.0).is_err());
        assert!(PhaseThresholds::default().scaled(0.4).is_err());
    }

    #[test]
    fn test_elevation_urgency() {
        let t = PhaseThresholds::default();
        assert_eq!(elevation_urgency(4.0, &t), Urgency::Critical);
        assert_eq!(elevation_urgency(5.0, &t), Urgency::Critical);
        assert_eq!(elevation_urgency(5.5, &t), Urgency::High);
        assert_eq!(elevation_urgency(6.8, &t), Urgency::Medium);
        assert_eq!(elevation_urgency(9.0, &t), Urgency::Low);
    }

    #[test]
    fn test_itu_compliance() {
        let t = PhaseThresholds::default();
        assert_eq!(itu_compliance(30.0, &t), ItuCompliance::Standard);
        assert_eq!(itu_compliance(7.0, &t), ItuCompliance::Minimum);
        assert_eq!(itu_compliance(2.0, &t), ItuCompliance::BelowMinimum);
    }

    fn any_environment() -> impl Strategy<Value = Environment> {
        prop::sample::select(Environment::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_monitoring_above_pre(env in any_environment(), extra in 0.0f64..75.0) {
            let t = PhaseThresholds::default().for_environment(env).unwrap();
            prop_assert_eq!(classify(t.pre_handover_deg + extra, &t), HandoverPhase::Monitoring);
        }

        #[test]
        fn prop_descent_is_monotonic(
            env in any_environment(),
            a in -90.0f64..90.0,
            b in -90.0f64..90.0,
        ) {
            let t = PhaseThresholds::default().for_environment(env).unwrap();
            let (high, low) = if a >= b { (a, b) } else { (b, a) };
            prop_assert!(classify(high, &t).rank() <= classify(low, &t).rank());
        }

        #[test]
        fn prop_classify_idempotent(el in -90.0f64..90.0) {
            let t = PhaseThresholds::default();
            prop_assert_eq!(classify(el, &t), classify(el, &t));
        }
    }
}
