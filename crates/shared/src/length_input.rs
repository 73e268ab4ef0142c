use crate::Units;
use evalexpr::{build_operator_tree, ContextWithMutableVariables, HashMapContext, Value};

/// Ошибки разбора введённой пользователем длины
#[derive(Debug, Clone, PartialEq)]
pub enum LengthInputError {
    /// Пустая строка
    Empty,
    /// Неизвестный суффикс единиц
    UnknownUnit(String),
    /// Ошибка парсинга выражения
    ParseError(String),
    /// Ошибка вычисления выражения
    EvaluationError(String),
    /// Результат не является числом
    NotANumber(String),
    /// Длина должна быть конечной и больше нуля
    NotPositive(f64),
}

impl std::fmt::Display for LengthInputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LengthInputError::Empty => write!(f, "Length is empty"),
            LengthInputError::UnknownUnit(unit) => write!(f, "Unknown unit '{}'", unit),
            LengthInputError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            LengthInputError::EvaluationError(msg) => write!(f, "Evaluation error: {}", msg),
            LengthInputError::NotANumber(msg) => write!(f, "Not a number: {}", msg),
            LengthInputError::NotPositive(value) => {
                write!(f, "Length must be a positive finite number, got {}", value)
            }
        }
    }
}

impl std::error::Error for LengthInputError {}

/// Разобрать длину, введённую пользователем, и вернуть её в миллиметрах.
///
/// Поддерживается:
/// - обычное число: `4500`, `4500.5`, `4500,5` (десятичная запятая)
/// - арифметика: `3000 + 1200`, `2 * 4500`
/// - суффикс единиц: `4.5 m`, `450cm`, `12in` (по умолчанию мм)
pub fn parse_length_mm(input: &str) -> Result<f64, LengthInputError> {
    parse_length(input, Units::Millimeters)
}

/// То же, что [`parse_length_mm`], но без суффикса используются `default_units`
pub fn parse_length(input: &str, default_units: Units) -> Result<f64, LengthInputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LengthInputError::Empty);
    }

    let (body, units) = split_unit_suffix(trimmed, default_units)?;
    let normalized = body.replace(',', ".");

    let value = match normalized.trim().parse::<f64>() {
        Ok(v) => v,
        Err(_) => evaluate_expression(&normalized)?,
    };

    let mm = value * units.to_mm();
    if !mm.is_finite() || mm <= 0.0 {
        return Err(LengthInputError::NotPositive(mm));
    }
    Ok(mm)
}

/// Отделить буквенный суффикс единиц от числовой части
fn split_unit_suffix(input: &str, default_units: Units) -> Result<(&str, Units), LengthInputError> {
    let split_at = input
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphabetic() || *c == '"')
        .last()
        .map(|(i, _)| i);

    let Some(idx) = split_at else {
        return Ok((input, default_units));
    };

    let (body, suffix) = input.split_at(idx);
    if body.trim().is_empty() {
        return Err(LengthInputError::ParseError(input.to_string()));
    }
    let units =
        Units::from_suffix(suffix).ok_or_else(|| LengthInputError::UnknownUnit(suffix.to_string()))?;
    Ok((body, units))
}

fn evaluate_expression(expression: &str) -> Result<f64, LengthInputError> {
    let mut context = HashMapContext::new();
    context
        .set_value("PI".to_string(), Value::Float(std::f64::consts::PI))
        .ok();

    let tree = build_operator_tree(&float_literals(expression))
        .map_err(|e| LengthInputError::ParseError(e.to_string()))?;

    let value = tree
        .eval_with_context(&context)
        .map_err(|e| LengthInputError::EvaluationError(e.to_string()))?;

    match value {
        Value::Float(f) => Ok(f),
        Value::Int(i) => Ok(i as f64),
        _ => Err(LengthInputError::NotANumber(format!("{:?}", value))),
    }
}

/// Записать целые литералы как вещественные (`10` -> `10.0`),
/// иначе evalexpr делит нацело: `10000 / 3` дало бы 3333
fn float_literals(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len() + 8);
    let mut chars = expression.chars().peekable();
    let mut prev: Option<char> = None;

    while let Some(c) = chars.next() {
        let starts_number = c.is_ascii_digit()
            && !matches!(prev, Some(p) if p.is_alphanumeric() || p == '_' || p == '.');
        if !starts_number {
            out.push(c);
            prev = Some(c);
            continue;
        }

        let mut literal = String::from(c);
        while let Some(&next) = chars.peek() {
            let exponent_sign =
                (next == '+' || next == '-') && matches!(literal.chars().last(), Some('e' | 'E'));
            if next.is_ascii_digit() || matches!(next, '.' | 'e' | 'E') || exponent_sign {
                literal.push(next);
                chars.next();
            } else {
                break;
            }
        }

        out.push_str(&literal);
        if literal.chars().all(|d| d.is_ascii_digit()) {
            out.push_str(".0");
        }
        prev = literal.chars().last();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_number() {
        assert_eq!(parse_length_mm("4500"), Ok(4500.0));
        assert_eq!(parse_length_mm("  4500.5 "), Ok(4500.5));
    }

    #[test]
    fn test_decimal_comma() {
        assert_eq!(parse_length_mm("4500,5"), Ok(4500.5));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(parse_length_mm("3000 + 1200"), Ok(4200.0));
        assert_eq!(parse_length_mm("2 * 4500"), Ok(9000.0));
        assert_eq!(parse_length_mm("1000.0 / 4"), Ok(250.0));
    }

    #[test]
    fn test_division_keeps_fraction() {
        let third = parse_length_mm("10000 / 3").unwrap();
        assert!((third - 3333.333_333).abs() < 1e-3);
        assert_eq!(parse_length_mm("10/4 m"), Ok(2500.0));
        assert_eq!(parse_length_mm("1/2 m"), Ok(500.0));
        assert_eq!(parse_length_mm("(3000 + 1500) / 2"), Ok(2250.0));
    }

    #[test]
    fn test_float_literals() {
        assert_eq!(float_literals("10000 / 3"), "10000.0 / 3.0");
        assert_eq!(float_literals("2.5*4"), "2.5*4.0");
        assert_eq!(float_literals("PI * 2"), "PI * 2.0");
    }

    #[test]
    fn test_unit_suffix() {
        assert_eq!(parse_length_mm("4.5 m"), Ok(4500.0));
        assert_eq!(parse_length_mm("45cm"), Ok(450.0));
        assert_eq!(parse_length_mm("10 mm"), Ok(10.0));
        let inches = parse_length_mm("2in").unwrap();
        assert!((inches - 50.8).abs() < 1e-9);
    }

    #[test]
    fn test_default_units() {
        assert_eq!(parse_length("4", Units::Meters), Ok(4000.0));
        assert_eq!(parse_length("400 mm", Units::Meters), Ok(400.0));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(parse_length_mm("   "), Err(LengthInputError::Empty));
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(matches!(parse_length_mm("0"), Err(LengthInputError::NotPositive(_))));
        assert!(matches!(parse_length_mm("-250"), Err(LengthInputError::NotPositive(_))));
        assert!(matches!(parse_length_mm("100 - 300"), Err(LengthInputError::NotPositive(_))));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_length_mm("abc").is_err());
        assert!(parse_length_mm("12 ft").is_err());
        assert!(parse_length_mm("3000 +").is_err());
    }

    #[test]
    fn test_error_display() {
        let err = LengthInputError::UnknownUnit("ft".to_string());
        assert_eq!(err.to_string(), "Unknown unit 'ft'");
    }
}
