use std::str::FromStr;

use simple_error::{bail, SimpleError};

use super::{LlTable, TableRow};
use crate::compiler::lexer::token::Token;

/// Text parser for LL control tables identified by the extension .llt.
/// Each non-empty line describes one table row; row ids are 1-based in file
/// order. A line has five `;` separated fields:
///
///     <referencing set> ; <next id> ; <push id> ; <flags> ; <action name>
///
/// The referencing set is a space separated list of token names, or `~` for
/// an empty set. Flags is any combination of `s` (shift), `e` (end) and `x`
/// (error), or `-` for none; `h` is accepted as a synonym of `s`. The action
/// name field is optional and taken verbatim to the end of the line.
/// Empty lines are ignored as well as comments starting with # (excl
/// whitespace).
pub struct LlTableTextParser {
    delimiter: String,
}

impl LlTableTextParser {
    const COMMENT_TOKEN: &'static str = "#";
    const EMPTY_SET_TOKEN: &'static str = "~";

    /// Creates new table parser with the default line delimiter '\n'
    pub fn new() -> Self {
        Self {
            delimiter: String::from('\n'),
        }
    }

    /// Creates new table parser with a custom row delimiter
    #[allow(dead_code)]
    pub(crate) fn using_delimiter(mut self, delimiter: String) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse table text into an LlTable.
    /// @return: LlTable if every row line is well formed, otherwise a
    /// SimpleError naming the offending line.
    pub fn parse_str(&self, data: &str) -> Result<LlTable, SimpleError> {
        let mut rows = Vec::new();

        for (line_number, line) in data.split(self.delimiter.as_str()).enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(Self::COMMENT_TOKEN) {
                continue;
            }

            match Self::parse_row(line) {
                Ok(row) => rows.push(row),
                Err(why) => bail!("table line {}: {}", line_number + 1, why),
            }
        }

        Ok(LlTable::new(rows))
    }

    /// Parse a single row line.
    fn parse_row(line: &str) -> Result<TableRow, SimpleError> {
        let fields: Vec<&str> = line.splitn(5, ';').collect();
        if fields.len() < 4 {
            bail!("expected at least 4 `;` separated fields, found {}", fields.len());
        }

        let referencing_set = Self::parse_referencing_set(fields[0].trim())?;
        let next_id = Self::parse_row_id(fields[1].trim())?;
        let push_id = Self::parse_row_id(fields[2].trim())?;
        let (do_shift, is_end, is_error) = Self::parse_flags(fields[3].trim())?;
        let action_name = fields
            .get(4)
            .map(|field| field.trim().to_string())
            .unwrap_or_default();

        let mut row = TableRow::new(&referencing_set)
            .next(next_id)
            .push(push_id)
            .action(&action_name);
        row.do_shift = do_shift;
        row.is_end = is_end;
        row.is_error = is_error;

        Ok(row)
    }

    fn parse_referencing_set(field: &str) -> Result<Vec<Token>, SimpleError> {
        if field == Self::EMPTY_SET_TOKEN {
            return Ok(vec![]);
        }

        let mut tokens = Vec::new();
        for word in field.split_whitespace() {
            match Token::from_str(word) {
                Ok(token) => tokens.push(token),
                Err(_) => bail!("unknown token name \"{}\"", word),
            }
        }
        Ok(tokens)
    }

    fn parse_row_id(field: &str) -> Result<u32, SimpleError> {
        match field.parse() {
            Ok(id) => Ok(id),
            Err(_) => bail!("row id \"{}\" is not a non-negative integer", field),
        }
    }

    fn parse_flags(field: &str) -> Result<(bool, bool, bool), SimpleError> {
        let mut do_shift = false;
        let mut is_end = false;
        let mut is_error = false;
        for flag in field.chars() {
            match flag {
                's' | 'h' => do_shift = true,
                'e' => is_end = true,
                'x' => is_error = true,
                '-' => {}
                unknown => bail!("unknown flag '{}'", unknown),
            }
        }
        Ok((do_shift, is_end, is_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_table() {
        let text = "\
# declaration head
int float_type ; 2 ; 0 ; s ;
identifier ; 3 ; 0 ; s ; CheckIdentifierForAlreadyExisting
~ ; 0 ; 0 ; - ; Create AST node ExtendedType using 2
end_of_file ; 0 ; 0 ; e ; Create AST node Program using 1
";
        let table = LlTableTextParser::new().parse_str(text).unwrap();
        assert_eq!(table.row_count(), 4);

        let first = table.get_row(1).unwrap();
        assert!(first.do_shift);
        assert!(first.referencing_set.contains(&Token::IntType));
        assert!(first.referencing_set.contains(&Token::FloatType));
        assert_eq!(first.next_id, 2);
        assert_eq!(first.action_name, "");

        let second = table.get_row(2).unwrap();
        assert_eq!(second.action_name, "CheckIdentifierForAlreadyExisting");

        let third = table.get_row(3).unwrap();
        assert!(third.referencing_set.is_empty());
        assert_eq!(third.action_name, "Create AST node ExtendedType using 2");

        let last = table.get_row(4).unwrap();
        assert!(last.is_end);
    }

    #[test]
    fn row_ids_are_one_based() {
        let table = LlTableTextParser::new()
            .parse_str("~ ; 0 ; 0 ; e ;")
            .unwrap();
        assert!(table.get_row(0).is_none());
        assert!(table.get_row(1).is_some());
        assert!(table.get_row(2).is_none());
    }

    #[test]
    fn rejects_unknown_token_name() {
        let result = LlTableTextParser::new().parse_str("lambda ; 0 ; 0 ; - ;");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_flag() {
        let result = LlTableTextParser::new().parse_str("~ ; 0 ; 0 ; q ;");
        assert!(result.is_err());
    }

    #[test]
    fn error_flag_round_trips() {
        let table = LlTableTextParser::new()
            .parse_str("identifier ; 0 ; 0 ; x ;")
            .unwrap();
        assert!(table.get_row(1).unwrap().is_error);
    }
}
