use strum_macros::{Display, EnumString};

/// Tokens of the Remora language. The display form of each variant is the
/// spelling used inside LL table files and as the `name` of AST leaves, so
/// the strum serialisation is the single source of truth for token names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
pub enum Token {
    #[strum(serialize = "identifier")]
    Identifier,

    // Literals. Note that integer and float literals share their name with
    // the matching core type, while the remaining literal kinds carry an
    // explicit `_literal` suffix. The type compatibility table relies on
    // these exact spellings.
    #[strum(serialize = "integer")]
    Integer,
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "string_literal")]
    StringLiteral,
    #[strum(serialize = "character_literal")]
    CharacterLiteral,
    #[strum(serialize = "boolean_literal")]
    BooleanLiteral,

    // Type keywords
    #[strum(serialize = "int")]
    IntType,
    #[strum(serialize = "float_type")]
    FloatType,
    #[strum(serialize = "bool")]
    BoolType,
    #[strum(serialize = "char")]
    CharType,
    #[strum(serialize = "string_type")]
    StringType,

    // Statement keywords
    #[strum(serialize = "if")]
    If,
    #[strum(serialize = "else")]
    Else,
    #[strum(serialize = "while")]
    While,
    #[strum(serialize = "read")]
    Read,
    #[strum(serialize = "write")]
    Write,

    #[strum(serialize = "assignment")]
    Assignment,

    // Arithmetic operators
    #[strum(serialize = "plus")]
    Plus,
    #[strum(serialize = "minus")]
    Minus,
    #[strum(serialize = "multiply")]
    Multiply,
    #[strum(serialize = "divide")]
    Divide,
    #[strum(serialize = "integer_divide")]
    IntegerDivide,
    #[strum(serialize = "modulus")]
    Modulus,

    // Relational operators
    #[strum(serialize = "equivalence")]
    Equivalence,
    #[strum(serialize = "not_equivalence")]
    NotEquivalence,
    #[strum(serialize = "less")]
    Less,
    #[strum(serialize = "less_or_equivalence")]
    LessOrEquivalence,
    #[strum(serialize = "more")]
    More,
    #[strum(serialize = "more_or_equivalence")]
    MoreOrEquivalence,

    // Brackets and separators
    #[strum(serialize = "round_bracket_open")]
    RoundBracketOpen,
    #[strum(serialize = "round_bracket_close")]
    RoundBracketClose,
    #[strum(serialize = "curly_bracket_open")]
    CurlyBracketOpen,
    #[strum(serialize = "curly_bracket_close")]
    CurlyBracketClose,
    #[strum(serialize = "square_bracket_open")]
    SquareBracketOpen,
    #[strum(serialize = "square_bracket_close")]
    SquareBracketClose,
    #[strum(serialize = "semicolon")]
    Semicolon,
    #[strum(serialize = "comma")]
    Comma,

    #[strum(serialize = "comment")]
    Comment,
    #[strum(serialize = "end_of_file")]
    EndOfFile,
}

impl Token {
    /// Keyword and boolean spellings are lexed as identifiers first and
    /// reclassified here.
    pub fn classify_word(word: &str) -> Token {
        match word {
            "int" => Token::IntType,
            "float" => Token::FloatType,
            "bool" => Token::BoolType,
            "char" => Token::CharType,
            "string" => Token::StringType,
            "if" => Token::If,
            "else" => Token::Else,
            "while" => Token::While,
            "read" => Token::Read,
            "write" => Token::Write,
            "True" | "False" => Token::BooleanLiteral,
            _ => Token::Identifier,
        }
    }
}

/// Source position of a token as 1-based (line, column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPosition {
    pub line: usize,
    pub column: usize,
}

/// A token paired with its lexeme and source position. This is the unit the
/// lexer hands to the LL driver.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInformation {
    pub token: Token,
    pub lexeme: String,
    pub position: TokenPosition,
}

impl TokenInformation {
    pub fn new(token: Token, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        TokenInformation {
            token,
            lexeme: lexeme.into(),
            position: TokenPosition { line, column },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn token_names_round_trip() {
        let tokens = [
            Token::Identifier,
            Token::Integer,
            Token::Float,
            Token::StringLiteral,
            Token::BooleanLiteral,
            Token::IntType,
            Token::FloatType,
            Token::IntegerDivide,
            Token::MoreOrEquivalence,
            Token::EndOfFile,
        ];
        for token in tokens {
            let spelling = token.to_string();
            assert_eq!(Token::from_str(&spelling).unwrap(), token);
        }
    }

    #[test]
    fn keywords_are_reclassified() {
        assert_eq!(Token::classify_word("int"), Token::IntType);
        assert_eq!(Token::classify_word("while"), Token::While);
        assert_eq!(Token::classify_word("True"), Token::BooleanLiteral);
        assert_eq!(Token::classify_word("winter"), Token::Identifier);
    }
}
