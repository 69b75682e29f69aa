//! Insurance base adjustment and payment calculation.
//!
//! This module clamps a reference wage into each insurance type's floor/cap
//! window and applies the enterprise rate.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{AuditStep, InsuranceLine, InsuranceType, PolicyRule};

/// Decimal places kept on every monetary output.
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Rounds a monetary amount to 2 dp, halves away from zero.
///
/// # Example
///
/// ```
/// use contribution_engine::calculation::round_money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_money(Decimal::from_str("31.445").unwrap()), Decimal::from_str("31.45").unwrap());
/// assert_eq!(round_money(Decimal::from_str("31.444").unwrap()), Decimal::from_str("31.44").unwrap());
/// ```
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamps a value into `[floor, cap]`, ignoring an absent bound.
pub fn clamp_base(reference_wage: Decimal, floor: Option<Decimal>, cap: Option<Decimal>) -> Decimal {
    let raised = match floor {
        Some(floor) if reference_wage < floor => floor,
        _ => reference_wage,
    };
    match cap {
        Some(cap) if raised > cap => cap,
        _ => raised,
    }
}

/// The result of adjusting bases for all insurance types.
#[derive(Debug, Clone)]
pub struct AdjustmentResult {
    /// Pension insurance.
    pub pension: InsuranceLine,
    /// Medical insurance.
    pub medical: InsuranceLine,
    /// Unemployment insurance.
    pub unemployment: InsuranceLine,
    /// Work-injury insurance.
    pub injury: InsuranceLine,
    /// Housing provident fund.
    pub housing_fund: InsuranceLine,
    /// Sum of the five rounded payments.
    pub theoretical_total: Decimal,
    /// The audit step recording the adjustment.
    pub audit_step: AuditStep,
}

impl AdjustmentResult {
    /// Returns the line for an insurance type.
    pub fn line(&self, insurance: InsuranceType) -> &InsuranceLine {
        match insurance {
            InsuranceType::Pension => &self.pension,
            InsuranceType::Medical => &self.medical,
            InsuranceType::Unemployment => &self.unemployment,
            InsuranceType::Injury => &self.injury,
            InsuranceType::HousingFund => &self.housing_fund,
        }
    }
}

fn adjust_line(reference_wage: Decimal, rule: &PolicyRule, insurance: InsuranceType) -> InsuranceLine {
    let bounds = rule.bounds(insurance);

    // Injury bases are only clamped when the rule opts in.
    let (floor, cap) = if insurance == InsuranceType::Injury && !rule.injury_base_clamped {
        (None, None)
    } else {
        (bounds.floor, bounds.cap)
    };

    let adjusted_base = round_money(clamp_base(reference_wage, floor, cap));
    let payment = round_money(adjusted_base * bounds.rate);

    InsuranceLine {
        floor,
        cap,
        rate: bounds.rate,
        adjusted_base,
        payment,
    }
}

/// Adjusts the reference wage into each insurance base and computes payments.
///
/// Pension, medical, unemployment and housing-fund bases are clamped to their
/// floor and cap. The injury base is clamped only when
/// `rule.injury_base_clamped` is set; otherwise it is the raw reference wage.
/// Bases and payments are rounded to 2 dp before the total is summed.
///
/// # Example
///
/// ```
/// use contribution_engine::calculation::adjust_insurance_bases;
/// use contribution_engine::models::{Half, InsuranceBounds, PolicyPeriod, PolicyRule};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let dec = |s: &str| Decimal::from_str(s).unwrap();
/// let bounds = InsuranceBounds::clamped(dec("3958"), dec("24546"), dec("0.14"));
/// let rule = PolicyRule {
///     period: PolicyPeriod::new(2023, Half::H1),
///     injury_base_clamped: false,
///     pension: bounds.clone(),
///     medical: bounds.clone(),
///     unemployment: bounds.clone(),
///     injury: InsuranceBounds::unbounded(dec("0.002")),
///     housing_fund: bounds,
/// };
///
/// let result = adjust_insurance_bases(dec("2000"), &rule, 3);
/// assert_eq!(result.pension.adjusted_base, dec("3958.00"));
/// assert_eq!(result.pension.payment, dec("554.12"));
/// assert_eq!(result.injury.adjusted_base, dec("2000.00"));
/// ```
pub fn adjust_insurance_bases(
    reference_wage: Decimal,
    rule: &PolicyRule,
    step_number: u32,
) -> AdjustmentResult {
    let pension = adjust_line(reference_wage, rule, InsuranceType::Pension);
    let medical = adjust_line(reference_wage, rule, InsuranceType::Medical);
    let unemployment = adjust_line(reference_wage, rule, InsuranceType::Unemployment);
    let injury = adjust_line(reference_wage, rule, InsuranceType::Injury);
    let housing_fund = adjust_line(reference_wage, rule, InsuranceType::HousingFund);

    let theoretical_total = [&pension, &medical, &unemployment, &injury, &housing_fund]
        .iter()
        .map(|line| line.payment)
        .sum::<Decimal>();

    let lines_json: serde_json::Map<String, serde_json::Value> = [
        (InsuranceType::Pension, &pension),
        (InsuranceType::Medical, &medical),
        (InsuranceType::Unemployment, &unemployment),
        (InsuranceType::Injury, &injury),
        (InsuranceType::HousingFund, &housing_fund),
    ]
    .iter()
    .map(|(insurance, line)| {
        (
            insurance.to_string(),
            serde_json::json!({
                "adjusted_base": line.adjusted_base.to_string(),
                "payment": line.payment.to_string()
            }),
        )
    })
    .collect();

    let clamped: Vec<String> = [
        (InsuranceType::Pension, &pension),
        (InsuranceType::Medical, &medical),
        (InsuranceType::Unemployment, &unemployment),
        (InsuranceType::Injury, &injury),
        (InsuranceType::HousingFund, &housing_fund),
    ]
    .iter()
    .filter(|(_, line)| line.adjusted_base != round_money(reference_wage))
    .map(|(insurance, line)| format!("{insurance} → {}", line.adjusted_base))
    .collect();

    let reasoning = if clamped.is_empty() {
        format!(
            "Reference wage {} within every floor/cap; total {}",
            reference_wage, theoretical_total
        )
    } else {
        format!(
            "Reference wage {} clamped ({}); total {}",
            reference_wage,
            clamped.join(", "),
            theoretical_total
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "base_adjustment".to_string(),
        rule_name: "Insurance Base Adjustment".to_string(),
        input: serde_json::json!({
            "reference_wage": reference_wage.to_string(),
            "policy_period": rule.period.to_string(),
            "injury_base_clamped": rule.injury_base_clamped
        }),
        output: serde_json::json!({
            "lines": lines_json,
            "theoretical_total": theoretical_total.to_string()
        }),
        reasoning,
    };

    AdjustmentResult {
        pension,
        medical,
        unemployment,
        injury,
        housing_fund,
        theoretical_total,
        audit_step,
    }
}
