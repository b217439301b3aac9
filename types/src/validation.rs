//! Value kinds and the light-weight checks applied before an entry is saved.
//!
//! Checks operate on raw dictionary text. They never parse nested
//! structures; `foamDictionary` remains the authority on file contents.

use std::fmt;

use thiserror::Error;

/// A rejected value, carrying the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Kind of an entry value, as inferred from its key and current text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Dict,
    Dimensions,
    Field,
    Dimensioned,
    Vector,
    BooleanLike,
    Word,
    Integer,
    Float,
    Text,
    /// Closed set reported by `foamDictionary -list`.
    Enum(Vec<String>),
}

impl ValueKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dict => "dict",
            Self::Dimensions => "dimensions",
            Self::Field => "field",
            Self::Dimensioned => "dimensioned",
            Self::Vector => "vector",
            Self::BooleanLike => "boolean-like",
            Self::Word => "word",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Enum(_) => "enum",
        }
    }

    pub fn validate(&self, value: &str) -> Result<(), ValidationError> {
        match self {
            Self::Dict | Self::Word | Self::Text => non_empty(value),
            Self::Integer => integer(value),
            Self::Float => float(value),
            Self::BooleanLike => boolean_like(value),
            Self::Vector => vector(value),
            Self::Dimensions => dimension_set(value),
            Self::Dimensioned => dimensioned(value),
            Self::Field => field(value),
            Self::Enum(allowed) => one_of(allowed, value),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn non_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("Value must not be empty."));
    }
    Ok(())
}

fn strip_terminator(value: &str) -> &str {
    let text = value.trim();
    text.strip_suffix(';').map_or(text, str::trim)
}

fn integer(value: &str) -> Result<(), ValidationError> {
    strip_terminator(value)
        .parse::<i64>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("Value must be an integer."))
}

fn float(value: &str) -> Result<(), ValidationError> {
    strip_terminator(value)
        .parse::<f64>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("Value must be a number."))
}

fn boolean_like(value: &str) -> Result<(), ValidationError> {
    let token = strip_terminator(value).to_ascii_lowercase();
    if matches!(token.as_str(), "on" | "off" | "true" | "false" | "yes" | "no") {
        return Ok(());
    }
    Err(ValidationError::new(
        "Value should be a boolean-like flag (on/off, true/false).",
    ))
}

fn vector(value: &str) -> Result<(), ValidationError> {
    let mut text = value.trim();
    if text.to_ascii_lowercase().starts_with("uniform") {
        text = text
            .split_once(char::is_whitespace)
            .map_or("", |(_, rest)| rest.trim());
    }
    if let (Some(open), Some(close)) = (text.find('('), text.rfind(')'))
        && open < close
    {
        text = &text[open + 1..close];
    }
    let parts: Vec<&str> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        return Err(ValidationError::new(
            "Vector must contain at least one numeric value.",
        ));
    }
    if parts.iter().any(|p| p.parse::<f64>().is_err()) {
        return Err(ValidationError::new("Vector entries must be numeric."));
    }
    Ok(())
}

fn dimension_set(value: &str) -> Result<(), ValidationError> {
    let text = value.trim().trim_end_matches(';');
    let inner = match (text.find('['), text.rfind(']')) {
        (Some(open), Some(close)) if open < close => &text[open + 1..close],
        _ => {
            return Err(ValidationError::new(
                "Dimensions must be in brackets, e.g. [0 1 -2 0 0 0 0].",
            ));
        }
    };
    let parts: Vec<&str> = inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 7 {
        return Err(ValidationError::new(
            "Dimensions must contain exactly 7 integers.",
        ));
    }
    if parts.iter().any(|p| p.parse::<i64>().is_err()) {
        return Err(ValidationError::new("Dimensions entries must be integers."));
    }
    Ok(())
}

fn dimensioned(value: &str) -> Result<(), ValidationError> {
    let text = value.trim().trim_end_matches(';');
    if !text.starts_with('[') {
        return Err(ValidationError::new(
            "Dimensioned value must start with dimensions, e.g. [0 1 -2 0 0 0 0] 1e-05.",
        ));
    }
    let Some((dims, rest)) = text.split_once(']') else {
        return Err(ValidationError::new(
            "Dimensioned value missing closing bracket.",
        ));
    };
    dimension_set(&format!("{dims}]"))?;
    if rest.trim().is_empty() {
        return Err(ValidationError::new(
            "Dimensioned value missing numeric value.",
        ));
    }
    Ok(())
}

fn field(value: &str) -> Result<(), ValidationError> {
    let text = value.trim().trim_end_matches(';');
    if text.is_empty() {
        return Err(ValidationError::new("Value must not be empty."));
    }
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("uniform") {
        let has_value = text
            .split_once(char::is_whitespace)
            .is_some_and(|(_, rest)| !rest.trim().is_empty());
        if !has_value {
            return Err(ValidationError::new("Uniform field requires a value."));
        }
        return Ok(());
    }
    if lower.starts_with("nonuniform") {
        if lower.contains("list") || text.contains('(') || text.contains('{') {
            return Ok(());
        }
        return Err(ValidationError::new(
            "Nonuniform field should include list data.",
        ));
    }
    Err(ValidationError::new(
        "Field value should start with 'uniform' or 'nonuniform'.",
    ))
}

fn one_of(allowed: &[String], value: &str) -> Result<(), ValidationError> {
    let token = normalize_scalar_token(value);
    if allowed.iter().any(|a| *a == token) {
        return Ok(());
    }
    let mut sorted: Vec<&str> = allowed.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    Err(ValidationError::new(format!(
        "Value must be one of: {}.",
        sorted.join(", ")
    )))
}

/// Reduces a value to its last scalar token: `;` separators dropped, quotes stripped.
#[must_use]
pub fn normalize_scalar_token(value: &str) -> String {
    value
        .replace(';', " ")
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

/// True when the value is exactly one token with no brackets.
#[must_use]
pub fn is_scalar_value(value: &str) -> bool {
    let cleaned = value.replace(';', " ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.contains(['{', '}', '[', ']', '(', ')']) {
        return false;
    }
    cleaned.split_whitespace().count() == 1
}

#[must_use]
pub fn looks_like_dict(value: &str) -> bool {
    let cleaned = value.trim();
    !cleaned.is_empty() && cleaned.contains('{')
}

/// Normalizes user input before it is written back.
///
/// Trailing newlines are always removed. Multi-line values keep their inner
/// layout; single-line values are trimmed.
#[must_use]
pub fn autoformat_value(value: &str) -> String {
    let text = value.trim_end_matches(['\n', '\r']);
    if text.contains('\n') {
        text.to_string()
    } else {
        text.trim().to_string()
    }
}

fn is_word_token(token: &str) -> bool {
    let stripped = token.trim().trim_matches('"');
    !stripped.is_empty()
        && stripped.chars().any(char::is_alphabetic)
        && stripped
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
}

/// Picks the kind used to validate a replacement for `key`.
///
/// Value shape wins over key name; the key is only consulted for the
/// well-known OpenFOAM entries and as a last-resort guess.
#[must_use]
pub fn choose_kind(key: &str, value: &str) -> ValueKind {
    if looks_like_dict(value) {
        return ValueKind::Dict;
    }

    let key_lower = key.to_ascii_lowercase();
    if key_lower.ends_with("dimensions") || key_lower.ends_with("dimension") {
        return ValueKind::Dimensions;
    }
    if key_lower.ends_with("internalfield")
        || (key_lower.contains("boundaryfield") && key_lower.ends_with("value"))
    {
        return ValueKind::Field;
    }
    if value.trim().starts_with('[') && value.contains(']') {
        return ValueKind::Dimensioned;
    }
    if value.contains('(') && value.contains(')') && vector(value).is_ok() {
        return ValueKind::Vector;
    }
    if is_scalar_value(value) {
        let token = normalize_scalar_token(value);
        let lower = token.to_ascii_lowercase();
        if matches!(lower.as_str(), "on" | "off" | "true" | "false" | "yes" | "no") {
            return ValueKind::BooleanLike;
        }
        if is_word_token(&token) {
            return ValueKind::Word;
        }
    }
    if let Some(last) = value.replace(';', " ").split_whitespace().last() {
        let lower = last.to_ascii_lowercase();
        if last.parse::<i64>().is_ok() && !lower.contains('.') && !lower.contains('e') {
            return ValueKind::Integer;
        }
        if last.parse::<f64>().is_ok() {
            return ValueKind::Float;
        }
    }
    guess_from_key(&key_lower)
}

fn guess_from_key(key_lower: &str) -> ValueKind {
    let has_any = |tokens: &[&str]| tokens.iter().any(|t| key_lower.contains(t));
    if has_any(&["on", "off", "switch", "enable", "disable"]) {
        ValueKind::BooleanLike
    } else if has_any(&["iter", "step", "count"]) {
        ValueKind::Integer
    } else if has_any(&["tol", "dt", "time", "coeff", "alpha", "beta"]) {
        ValueKind::Float
    } else {
        ValueKind::Text
    }
}

#[cfg(test)]
mod tests {
    use super::{ValueKind, autoformat_value, choose_kind, normalize_scalar_token};

    fn message(kind: &ValueKind, value: &str) -> Option<String> {
        kind.validate(value).err().map(|e| e.message().to_string())
    }

    #[test]
    fn numeric_checks_accept_trailing_semicolon() {
        assert_eq!(message(&ValueKind::Integer, " 42; "), None);
        assert_eq!(
            message(&ValueKind::Integer, "4.2"),
            Some("Value must be an integer.".to_string())
        );
        assert_eq!(message(&ValueKind::Float, "1e-05;"), None);
        assert_eq!(
            message(&ValueKind::Float, "fast"),
            Some("Value must be a number.".to_string())
        );
    }

    #[test]
    fn boolean_like_flags() {
        for ok in ["on", "off", "true", "False", "yes"] {
            assert_eq!(message(&ValueKind::BooleanLike, ok), None, "{ok}");
        }
        assert_eq!(
            message(&ValueKind::BooleanLike, "maybe"),
            Some("Value should be a boolean-like flag (on/off, true/false).".to_string())
        );
    }

    #[test]
    fn vectors() {
        assert_eq!(message(&ValueKind::Vector, "(1 0 0)"), None);
        assert_eq!(message(&ValueKind::Vector, "uniform (0 0 -9.81)"), None);
        assert_eq!(
            message(&ValueKind::Vector, "()"),
            Some("Vector must contain at least one numeric value.".to_string())
        );
        assert_eq!(
            message(&ValueKind::Vector, "(1 a 0)"),
            Some("Vector entries must be numeric.".to_string())
        );
    }

    #[test]
    fn dimension_sets() {
        assert_eq!(message(&ValueKind::Dimensions, "[0 1 -2 0 0 0 0];"), None);
        assert_eq!(
            message(&ValueKind::Dimensions, "0 1 -2 0 0 0 0"),
            Some("Dimensions must be in brackets, e.g. [0 1 -2 0 0 0 0].".to_string())
        );
        assert_eq!(
            message(&ValueKind::Dimensions, "[0 1 -2]"),
            Some("Dimensions must contain exactly 7 integers.".to_string())
        );
        assert_eq!(
            message(&ValueKind::Dimensions, "[0 1 -2 0 0 0 x]"),
            Some("Dimensions entries must be integers.".to_string())
        );
    }

    #[test]
    fn dimensioned_values() {
        assert_eq!(
            message(&ValueKind::Dimensioned, "[0 2 -1 0 0 0 0] 1e-05"),
            None
        );
        assert_eq!(
            message(&ValueKind::Dimensioned, "1e-05"),
            Some(
                "Dimensioned value must start with dimensions, e.g. [0 1 -2 0 0 0 0] 1e-05."
                    .to_string()
            )
        );
        assert_eq!(
            message(&ValueKind::Dimensioned, "[0 2 -1 0 0 0 0"),
            Some("Dimensioned value missing closing bracket.".to_string())
        );
        assert_eq!(
            message(&ValueKind::Dimensioned, "[0 2 -1 0 0 0 0]"),
            Some("Dimensioned value missing numeric value.".to_string())
        );
    }

    #[test]
    fn field_values() {
        assert_eq!(message(&ValueKind::Field, "uniform (0 0 0)"), None);
        assert_eq!(message(&ValueKind::Field, "nonuniform List<scalar> 2(1 2)"), None);
        assert_eq!(
            message(&ValueKind::Field, "uniform"),
            Some("Uniform field requires a value.".to_string())
        );
        assert_eq!(
            message(&ValueKind::Field, "nonuniform"),
            Some("Nonuniform field should include list data.".to_string())
        );
        assert_eq!(
            message(&ValueKind::Field, "0"),
            Some("Field value should start with 'uniform' or 'nonuniform'.".to_string())
        );
    }

    #[test]
    fn enum_lists_allowed_values_sorted() {
        let kind = ValueKind::Enum(vec!["startTime".into(), "latestTime".into()]);
        assert_eq!(message(&kind, "latestTime;"), None);
        assert_eq!(
            message(&kind, "firstTime"),
            Some("Value must be one of: latestTime, startTime.".to_string())
        );
    }

    #[test]
    fn kind_selection_prefers_value_shape() {
        assert_eq!(choose_kind("solvers", "{ p { solver PCG; } }"), ValueKind::Dict);
        assert_eq!(choose_kind("dimensions", "[0 1 -1 0 0 0 0]"), ValueKind::Dimensions);
        assert_eq!(choose_kind("internalField", "uniform 0"), ValueKind::Field);
        assert_eq!(
            choose_kind("boundaryField.inlet.value", "uniform (1 0 0)"),
            ValueKind::Field
        );
        assert_eq!(choose_kind("nu", "[0 2 -1 0 0 0 0] 1e-05"), ValueKind::Dimensioned);
        assert_eq!(choose_kind("g", "(0 0 -9.81)"), ValueKind::Vector);
        assert_eq!(choose_kind("runTimeModifiable", "true"), ValueKind::BooleanLike);
        assert_eq!(choose_kind("application", "icoFoam"), ValueKind::Word);
        assert_eq!(choose_kind("writeInterval", "20"), ValueKind::Integer);
        assert_eq!(choose_kind("deltaT", "0.005"), ValueKind::Float);
    }

    #[test]
    fn kind_selection_falls_back_to_key_name() {
        assert_eq!(choose_kind("maxIter", ""), ValueKind::Integer);
        assert_eq!(choose_kind("relTol", ""), ValueKind::Float);
        assert_eq!(choose_kind("enableFeature", ""), ValueKind::BooleanLike);
        assert_eq!(choose_kind("libs", ""), ValueKind::Text);
    }

    #[test]
    fn scalar_token_normalization() {
        assert_eq!(normalize_scalar_token("  \"startTime\"; "), "startTime");
        assert_eq!(normalize_scalar_token("uniform 0;"), "0");
        assert_eq!(normalize_scalar_token(""), "");
    }

    #[test]
    fn autoformat_trims_single_line_only() {
        assert_eq!(autoformat_value("  icoFoam \n\n"), "icoFoam");
        assert_eq!(autoformat_value("{\n  a 1;\n}\n"), "{\n  a 1;\n}");
    }
}
