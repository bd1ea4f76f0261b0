use pest::Parser;

use super::token::{Token, TokenInformation};
use super::TokenSource;

/// Pest grammar wrapper. The grammar in src/remora.pest only describes
/// tokens; all statement structure lives in the LL control table.
#[derive(pest_derive::Parser)]
#[grammar = "remora.pest"]
struct RemoraPestLexer;

/// RemoraLexer is a concrete TokenSource. It tokenises a whole source string
/// up front using pest and then hands out tokens one at a time. A single
/// end_of_file token is emitted after the last real token, after which the
/// source is exhausted for good.
pub struct RemoraLexer {
    tokens: std::vec::IntoIter<TokenInformation>,
    end_emitted: bool,
    end_position: (usize, usize),
}

impl RemoraLexer {
    /// Tokenise a source string.
    /// @return: a lexer over the token stream, or the pest error message if
    /// the source contains a character sequence outside the token grammar.
    pub fn new(source: &str) -> Result<Self, String> {
        let mut pairs = RemoraPestLexer::parse(Rule::file, source)
            .map_err(|error| format!("{}", error))?;

        let file = pairs.next().expect("pest file rule always produces a pair");
        let mut tokens = Vec::new();
        let mut end_position = (1, 1);
        for pair in file.into_inner() {
            if let Rule::EOI = pair.as_rule() {
                end_position = pair.as_span().start_pos().line_col();
                continue;
            }
            let (line, column) = pair.as_span().start_pos().line_col();
            let lexeme = pair.as_str().to_string();
            let token = Self::token_from_rule(pair.as_rule(), &lexeme);
            tokens.push(TokenInformation::new(token, lexeme, line, column));
        }

        Ok(RemoraLexer {
            tokens: tokens.into_iter(),
            end_emitted: false,
            end_position,
        })
    }

    fn token_from_rule(rule: Rule, lexeme: &str) -> Token {
        match rule {
            Rule::comment => Token::Comment,
            Rule::identifier => Token::classify_word(lexeme),
            Rule::float => Token::Float,
            Rule::integer => Token::Integer,
            Rule::string_literal => Token::StringLiteral,
            Rule::character_literal => Token::CharacterLiteral,
            Rule::equivalence => Token::Equivalence,
            Rule::not_equivalence => Token::NotEquivalence,
            Rule::less_or_equivalence => Token::LessOrEquivalence,
            Rule::more_or_equivalence => Token::MoreOrEquivalence,
            Rule::less => Token::Less,
            Rule::more => Token::More,
            Rule::assignment => Token::Assignment,
            Rule::integer_divide => Token::IntegerDivide,
            Rule::plus => Token::Plus,
            Rule::minus => Token::Minus,
            Rule::multiply => Token::Multiply,
            Rule::divide => Token::Divide,
            Rule::modulus => Token::Modulus,
            Rule::round_bracket_open => Token::RoundBracketOpen,
            Rule::round_bracket_close => Token::RoundBracketClose,
            Rule::curly_bracket_open => Token::CurlyBracketOpen,
            Rule::curly_bracket_close => Token::CurlyBracketClose,
            Rule::square_bracket_open => Token::SquareBracketOpen,
            Rule::square_bracket_close => Token::SquareBracketClose,
            Rule::semicolon => Token::Semicolon,
            Rule::comma => Token::Comma,
            _ => panic!("Unprocessed lexer rule: {:?}", rule),
        }
    }
}

impl TokenSource for RemoraLexer {
    fn next_token(&mut self) -> Option<TokenInformation> {
        match self.tokens.next() {
            Some(token) => Some(token),
            None => {
                if self.end_emitted {
                    return None;
                }
                self.end_emitted = true;
                let (line, column) = self.end_position;
                Some(TokenInformation::new(Token::EndOfFile, "", line, column))
            }
        }
    }
}
