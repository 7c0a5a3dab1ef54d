//! Declarative trading rule structures.
//!
//! A rule compares a left operand to a right operand with one of four
//! comparators. Operands are price fields, fixed thresholds, or indicator
//! references (with a field selector for tuple-valued indicators).

use crate::domain::indicator::IndicatorType;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Open,
    High,
    Low,
    Close,
    Volume,
    Constant(f64),
    Indicator(IndicatorRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRef {
    pub indicator_type: IndicatorType,
    pub field: IndicatorField,
}

impl IndicatorRef {
    pub fn value(indicator_type: IndicatorType) -> Self {
        IndicatorRef {
            indicator_type,
            field: IndicatorField::Value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorField {
    Value,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    StochasticK,
    StochasticD,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Above,
    Below,
    CrossesAbove,
    CrossesBelow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub left: Operand,
    pub comparator: Comparator,
    pub right: Operand,
}

impl Rule {
    pub fn new(left: Operand, comparator: Comparator, right: Operand) -> Self {
        Rule {
            left,
            comparator,
            right,
        }
    }

    /// Indicators referenced by either operand, for pre-computation.
    pub fn indicators(&self) -> Vec<IndicatorType> {
        let mut out = Vec::new();
        for operand in [&self.left, &self.right] {
            if let Operand::Indicator(ind_ref) = operand {
                out.push(ind_ref.indicator_type);
            }
        }
        out
    }
}

/// All indicators referenced across a rule set, deduplicated.
pub fn collect_indicators(rules: &[Rule]) -> Vec<IndicatorType> {
    let mut out: Vec<IndicatorType> = Vec::new();
    for rule in rules {
        for indicator in rule.indicators() {
            if !out.contains(&indicator) {
                out.push(indicator);
            }
        }
    }
    out
}
