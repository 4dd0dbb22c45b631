//! Heuristic operand classification for tokens the schema cannot place.
//!
//! When reconstruction encounters more operands than a command's declared
//! roles, or operands arrive out of the expected shape, each leftover token
//! is classified from surface features alone. The rules run in a fixed
//! priority order so classification is deterministic.

/// The column a heuristically classified operand is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandClass {
    /// Numeric literals, `=`-prefixed formulas, and structural punctuation.
    Condition,
    /// A known measurement-unit word.
    Unit,
    /// A parenthesised bounds pair such as `(119,121)`.
    Tolerance,
    /// Nothing matched; the caller decides where it lands.
    Unclassified,
}

/// Unit words recognised by the classifier. Matching is exact and
/// case-sensitive; `MM` or `Sec` are not units.
pub const KNOWN_UNITS: [&str; 6] = ["mm", "sec", "N", "kgf", "Force", "Move"];

/// Classify a single operand token.
///
/// Rules are tried strictly in order; the first match wins:
/// 1. numeric literal or `=`-prefixed formula → [`OperandClass::Condition`]
/// 2. exact match against [`KNOWN_UNITS`] → [`OperandClass::Unit`]
/// 3. contains both `(` and `)` → [`OperandClass::Tolerance`]
/// 4. contains structural punctuation (`()[],+-*/`) → [`OperandClass::Condition`]
pub fn classify(value: &str) -> OperandClass {
    if is_numeric(value) || value.starts_with('=') {
        return OperandClass::Condition;
    }
    if KNOWN_UNITS.contains(&value) {
        return OperandClass::Unit;
    }
    if value.contains('(') && value.contains(')') {
        return OperandClass::Tolerance;
    }
    if value.chars().any(|c| "()[],+-*/".contains(c)) {
        return OperandClass::Condition;
    }
    OperandClass::Unclassified
}

/// A plain decimal literal: non-empty, digits only apart from at most one
/// `.`. No sign, no exponent — the equipment never writes those.
fn is_numeric(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    let mut seen_dot = false;
    let mut seen_digit = false;
    for c in value.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_literals_are_conditions() {
        assert_eq!(classify("120"), OperandClass::Condition);
        assert_eq!(classify("119.5"), OperandClass::Condition);
        assert_eq!(classify("0.25"), OperandClass::Condition);
    }

    #[test]
    fn formulas_are_conditions() {
        assert_eq!(classify("=R01-R02"), OperandClass::Condition);
    }

    #[test]
    fn known_units() {
        for unit in KNOWN_UNITS {
            assert_eq!(classify(unit), OperandClass::Unit, "{unit}");
        }
    }

    #[test]
    fn unit_match_is_case_sensitive() {
        assert_eq!(classify("MM"), OperandClass::Unclassified);
        assert_eq!(classify("Sec"), OperandClass::Unclassified);
    }

    #[test]
    fn parenthesised_pairs_are_tolerances() {
        assert_eq!(classify("(119,121)"), OperandClass::Tolerance);
        // A leading number does not make it numeric: '(' breaks the literal.
        assert_eq!(classify("120(119,121)"), OperandClass::Tolerance);
    }

    #[test]
    fn tolerance_vs_condition_priority() {
        // Contains a comma AND parens: the paren rule runs first.
        assert_eq!(classify("(1,2)"), OperandClass::Tolerance);
    }

    #[test]
    fn structural_punctuation_is_condition() {
        assert_eq!(classify("R03,3"), OperandClass::Condition);
        assert_eq!(classify("R05/R04"), OperandClass::Condition);
        assert_eq!(classify("L1-L2"), OperandClass::Condition);
    }

    #[test]
    fn plain_words_unclassified() {
        assert_eq!(classify("Height"), OperandClass::Unclassified);
        assert_eq!(classify(""), OperandClass::Unclassified);
        assert_eq!(classify("12.3.4"), OperandClass::Unclassified);
        assert_eq!(classify("."), OperandClass::Unclassified);
    }
}
