use crate::compiler::semantic_analyser::datatype;

use super::ll_driver::LlDriver;

/// Read and write intrinsics desugar to scanf and printf calls against
/// prototypes declared once and cached on first use.
impl LlDriver {
    /// `write(<expression>)`: print the value on top of the stack with the
    /// format directive matching its type.
    pub(super) fn create_write_statement(&mut self) -> bool {
        let operand = match self.resolve_operand_at(0) {
            Ok(operand) => operand,
            Err(()) => return false,
        };
        let directive = match Self::format_directive(&operand.type_name) {
            Some(directive) => directive,
            None => {
                let index = self.ast_stack.top().and_then(|node| node.token_index);
                return self.report_error(
                    index,
                    &format!("Cannot write a value of type \"{}\"", operand.type_name),
                );
            }
        };
        let value = operand
            .ir_value
            .unwrap_or_else(|| panic!("Malformed AST! Write argument carries no IR value"));

        let printf = self.printf_prototype();
        let format = self
            .builder
            .create_global_string_pointer(directive, "printf_format");
        self.builder
            .create_call(printf, vec![format, value], "printf_call");
        true
    }

    /// `read(<identifier>)`: scan straight into the variable's allocation.
    pub(super) fn create_read_statement(&mut self) -> bool {
        let target = match self.ast_stack.top() {
            Some(node) if node.declared_type == datatype::IDENTIFIER => node.clone(),
            _ => panic!("Malformed AST! Read argument is not an identifier"),
        };
        let row_index = match self.scopes.resolve(&target.lexeme) {
            Some(row_index) => row_index,
            None => {
                return self.report_error(
                    target.token_index,
                    &format!("Undeclared identifier \"{}\"", target.lexeme),
                )
            }
        };
        let row = self.symbols.get(row_index).unwrap();
        let directive = match Self::format_directive(&row.type_name) {
            Some(directive) => directive,
            None => {
                return self.report_error(
                    target.token_index,
                    &format!(
                        "Cannot read into variable \"{}\" of type \"{}\"",
                        target.lexeme, row.type_name
                    ),
                )
            }
        };
        let pointer = row
            .ir_handle
            .expect("declared variables always carry an allocation");

        let scanf = self.scanf_prototype();
        let format = self
            .builder
            .create_global_string_pointer(directive, "scanf_format");
        self.builder
            .create_call(scanf, vec![format, pointer], "scanf_call");
        true
    }
}
