use super::datatype;

/// Calculator folds constant arithmetic over the textual form of literals.
/// Operands arrive as lexemes and results leave as lexemes, so the parser
/// can splice folded values straight back into the AST. Float results are
/// rendered with six fixed fractional digits.
///
/// Division by zero is the only defined error besides an unknown or
/// unsupported operand type.
pub struct Calculator;

impl Calculator {
    pub fn add(lhs: &str, rhs: &str, type_name: &str) -> Result<String, String> {
        Self::check_known_type(type_name)?;
        match type_name {
            datatype::INTEGER => Ok((Self::parse_integer(lhs) + Self::parse_integer(rhs)).to_string()),
            datatype::FLOAT => Ok(Self::format_float(
                Self::parse_float(lhs) + Self::parse_float(rhs),
            )),
            _ => Err(format!("Unsupported type for adding: \"{}\"", type_name)),
        }
    }

    pub fn subtract(lhs: &str, rhs: &str, type_name: &str) -> Result<String, String> {
        Self::check_known_type(type_name)?;
        match type_name {
            datatype::INTEGER => Ok((Self::parse_integer(lhs) - Self::parse_integer(rhs)).to_string()),
            datatype::FLOAT => Ok(Self::format_float(
                Self::parse_float(lhs) - Self::parse_float(rhs),
            )),
            _ => Err(format!("Unsupported type for subtracting: \"{}\"", type_name)),
        }
    }

    pub fn multiply(lhs: &str, rhs: &str, type_name: &str) -> Result<String, String> {
        Self::check_known_type(type_name)?;
        match type_name {
            datatype::INTEGER => Ok((Self::parse_integer(lhs) * Self::parse_integer(rhs)).to_string()),
            datatype::FLOAT => Ok(Self::format_float(
                Self::parse_float(lhs) * Self::parse_float(rhs),
            )),
            _ => Err(format!("Unsupported type for multiplying: \"{}\"", type_name)),
        }
    }

    /// Integer division truncates both operands to integers first and always
    /// produces an integer lexeme.
    pub fn integer_division(lhs: &str, rhs: &str, type_name: &str) -> Result<String, String> {
        Self::check_known_type(type_name)?;
        let rhs_integer = Self::parse_integer(rhs);
        if rhs_integer == 0 {
            return Err(String::from("Cannot divide by zero"));
        }
        match type_name {
            datatype::INTEGER | datatype::FLOAT => {
                Ok((Self::parse_integer(lhs) / rhs_integer).to_string())
            }
            _ => Err(format!(
                "Unsupported type for integer dividing: \"{}\"",
                type_name
            )),
        }
    }

    /// Regular division works over floats and always produces a float lexeme.
    pub fn division(lhs: &str, rhs: &str, type_name: &str) -> Result<String, String> {
        Self::check_known_type(type_name)?;
        let rhs_float = Self::parse_float(rhs);
        if rhs_float == 0.0 {
            return Err(String::from("Cannot divide by zero"));
        }
        match type_name {
            datatype::INTEGER | datatype::FLOAT => {
                Ok(Self::format_float(Self::parse_float(lhs) / rhs_float))
            }
            _ => Err(format!("Unsupported type for dividing: \"{}\"", type_name)),
        }
    }

    pub fn modulus(lhs: &str, rhs: &str, type_name: &str) -> Result<String, String> {
        Self::check_known_type(type_name)?;
        let rhs_integer = Self::parse_integer(rhs);
        if rhs_integer == 0 {
            return Err(String::from("Cannot divide by zero"));
        }
        match type_name {
            datatype::INTEGER | datatype::FLOAT => {
                Ok((Self::parse_integer(lhs) % rhs_integer).to_string())
            }
            _ => Err(format!("Unsupported type for moduling: \"{}\"", type_name)),
        }
    }

    fn check_known_type(type_name: &str) -> Result<(), String> {
        const KNOWN_TYPES: &[&str] = &[
            datatype::INTEGER,
            datatype::FLOAT,
            datatype::BOOLEAN,
            datatype::CHARACTER,
            datatype::STRING,
            datatype::ARRAY,
            datatype::STRING_LITERAL,
            datatype::CHARACTER_LITERAL,
            datatype::BOOLEAN_LITERAL,
            datatype::ARRAY_LITERAL,
        ];
        if KNOWN_TYPES.contains(&type_name) {
            Ok(())
        } else {
            Err(format!("Unknown type \"{}\"", type_name))
        }
    }

    /// Parse the leading integer of a lexeme, so that "3.7" truncates to 3
    /// the way a float lexeme reaching an integer operation should.
    fn parse_integer(lexeme: &str) -> i64 {
        let trimmed = lexeme.trim();
        let (sign, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, trimmed),
        };
        let prefix: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
        sign * prefix.parse::<i64>().unwrap_or(0)
    }

    fn parse_float(lexeme: &str) -> f64 {
        lexeme.trim().parse().unwrap_or(0.0)
    }

    fn format_float(value: f64) -> String {
        format!("{:.6}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_addition_folds() {
        assert_eq!(Calculator::add("2", "3", "integer").unwrap(), "5");
        assert_eq!(Calculator::add("-4", "3", "integer").unwrap(), "-1");
    }

    #[test]
    fn float_addition_uses_six_fractional_digits() {
        assert_eq!(Calculator::add("2", "3.0", "float").unwrap(), "5.000000");
        assert_eq!(Calculator::add("0.5", "0.25", "float").unwrap(), "0.750000");
    }

    #[test]
    fn subtraction_and_multiplication() {
        assert_eq!(Calculator::subtract("10", "4", "integer").unwrap(), "6");
        assert_eq!(Calculator::multiply("6", "7", "integer").unwrap(), "42");
        assert_eq!(Calculator::multiply("1.5", "2.0", "float").unwrap(), "3.000000");
    }

    #[test]
    fn integer_division_truncates() {
        assert_eq!(Calculator::integer_division("7", "2", "integer").unwrap(), "3");
        assert_eq!(Calculator::integer_division("7.9", "2", "float").unwrap(), "3");
    }

    #[test]
    fn division_always_produces_float_text() {
        assert_eq!(Calculator::division("7", "2", "float").unwrap(), "3.500000");
    }

    #[test]
    fn division_by_zero_is_reported() {
        assert_eq!(
            Calculator::integer_division("1", "0", "integer").unwrap_err(),
            "Cannot divide by zero"
        );
        assert_eq!(
            Calculator::division("1", "0", "float").unwrap_err(),
            "Cannot divide by zero"
        );
        assert_eq!(
            Calculator::modulus("1", "0", "integer").unwrap_err(),
            "Cannot divide by zero"
        );
    }

    #[test]
    fn modulus_folds_integers() {
        assert_eq!(Calculator::modulus("7", "3", "integer").unwrap(), "1");
    }

    #[test]
    fn unknown_type_is_reported() {
        assert_eq!(
            Calculator::add("1", "2", "matrix").unwrap_err(),
            "Unknown type \"matrix\""
        );
    }

    #[test]
    fn known_but_unsupported_type_is_reported() {
        assert_eq!(
            Calculator::add("a", "b", "string").unwrap_err(),
            "Unsupported type for adding: \"string\""
        );
    }
}
