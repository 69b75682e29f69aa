//! Policy rule model: the floor/cap/rate table for one half-year.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PolicyPeriod;
use crate::error::{EngineError, EngineResult};

/// The five contribution types computed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceType {
    /// Pension insurance.
    Pension,
    /// Medical insurance.
    Medical,
    /// Unemployment insurance.
    Unemployment,
    /// Work-injury insurance.
    Injury,
    /// Housing provident fund.
    HousingFund,
}

impl InsuranceType {
    /// Every insurance type, in result-row order.
    pub const ALL: [InsuranceType; 5] = [
        InsuranceType::Pension,
        InsuranceType::Medical,
        InsuranceType::Unemployment,
        InsuranceType::Injury,
        InsuranceType::HousingFund,
    ];
}

impl fmt::Display for InsuranceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InsuranceType::Pension => "pension",
            InsuranceType::Medical => "medical",
            InsuranceType::Unemployment => "unemployment",
            InsuranceType::Injury => "injury",
            InsuranceType::HousingFund => "housing_fund",
        };
        write!(f, "{name}")
    }
}

/// Base bounds and enterprise rate for one insurance type.
///
/// A missing `floor` or `cap` means that side is not clamped. Only injury
/// insurance may omit them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceBounds {
    /// Minimum contribution base.
    #[serde(default)]
    pub floor: Option<Decimal>,
    /// Maximum contribution base.
    #[serde(default)]
    pub cap: Option<Decimal>,
    /// Enterprise contribution rate as a fraction (e.g. 0.16).
    pub rate: Decimal,
}

impl InsuranceBounds {
    /// Creates bounds with both a floor and a cap.
    pub fn clamped(floor: Decimal, cap: Decimal, rate: Decimal) -> Self {
        Self {
            floor: Some(floor),
            cap: Some(cap),
            rate,
        }
    }

    /// Creates bounds that never clamp.
    pub fn unbounded(rate: Decimal) -> Self {
        Self {
            floor: None,
            cap: None,
            rate,
        }
    }
}

/// The policy rule for one `(year, half)`.
///
/// # Example
///
/// ```
/// use contribution_engine::models::{Half, InsuranceBounds, PolicyPeriod, PolicyRule};
/// use rust_decimal::Decimal;
///
/// let bounds = InsuranceBounds::clamped(Decimal::new(3958, 0), Decimal::new(24546, 0), Decimal::new(16, 2));
/// let rule = PolicyRule {
///     period: PolicyPeriod::new(2023, Half::H1),
///     injury_base_clamped: false,
///     pension: bounds.clone(),
///     medical: bounds.clone(),
///     unemployment: bounds.clone(),
///     injury: InsuranceBounds::unbounded(Decimal::new(2, 3)),
///     housing_fund: bounds,
/// };
/// assert!(rule.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// The half-year this rule applies to.
    pub period: PolicyPeriod,
    /// Whether injury insurance bases are clamped by their floor/cap.
    #[serde(default)]
    pub injury_base_clamped: bool,
    /// Pension insurance bounds.
    pub pension: InsuranceBounds,
    /// Medical insurance bounds.
    pub medical: InsuranceBounds,
    /// Unemployment insurance bounds.
    pub unemployment: InsuranceBounds,
    /// Work-injury insurance bounds; floor and cap may be absent.
    pub injury: InsuranceBounds,
    /// Housing provident fund bounds.
    pub housing_fund: InsuranceBounds,
}

impl PolicyRule {
    /// Returns the bounds configured for an insurance type.
    pub fn bounds(&self, insurance: InsuranceType) -> &InsuranceBounds {
        match insurance {
            InsuranceType::Pension => &self.pension,
            InsuranceType::Medical => &self.medical,
            InsuranceType::Unemployment => &self.unemployment,
            InsuranceType::Injury => &self.injury,
            InsuranceType::HousingFund => &self.housing_fund,
        }
    }

    /// Checks the rule's invariants.
    ///
    /// Every type except injury needs a floor and a cap; any floor must not
    /// exceed its cap; bounds must be non-negative and rates between 0 and 1.
    pub fn validate(&self) -> EngineResult<()> {
        for insurance in InsuranceType::ALL {
            let bounds = self.bounds(insurance);
            let invalid = |message: String| EngineError::InvalidPolicyRule {
                period: self.period,
                message,
            };

            if insurance != InsuranceType::Injury && (bounds.floor.is_none() || bounds.cap.is_none())
            {
                return Err(invalid(format!("{insurance} requires both floor and cap")));
            }
            if let (Some(floor), Some(cap)) = (bounds.floor, bounds.cap) {
                if floor > cap {
                    return Err(invalid(format!(
                        "{insurance} floor {floor} exceeds cap {cap}"
                    )));
                }
            }
            if bounds.floor.is_some_and(|f| f < Decimal::ZERO)
                || bounds.cap.is_some_and(|c| c < Decimal::ZERO)
            {
                return Err(invalid(format!("{insurance} bounds must not be negative")));
            }
            if bounds.rate < Decimal::ZERO || bounds.rate > Decimal::ONE {
                return Err(invalid(format!(
                    "{insurance} rate {} must be between 0 and 1",
                    bounds.rate
                )));
            }
        }
        Ok(())
    }
}
