use std::str::FromStr;

use crate::compiler::backend::IrType;
use crate::compiler::lexer::token::Token;
use crate::compiler::semantic_analyser::datatype;

use super::ll_driver::LlDriver;

/// Scope and declaration actions.
///
/// `AddVariableToScope` expects the declaration subtree on the stack tail:
/// either a lone extended type node (`int x;`) or
/// `extended type, assignment leaf, initialiser` for the initialising forms.
/// The extended type node owns the type keyword leaf, the identifier leaf
/// and any array dimension leaves.
impl LlDriver {
    pub(super) fn create_scope(&mut self) -> bool {
        self.scopes.push_scope();
        true
    }

    pub(super) fn destroy_scope(&mut self) -> bool {
        if !self.scopes.pop_scope(&mut self.symbols) {
            return self.report_error(None, "No scope left to destroy");
        }
        true
    }

    /// Declaration-side check: the current token names the variable about
    /// to be declared, which must not resolve in any live scope.
    pub(super) fn check_identifier_for_already_existing(&mut self) -> bool {
        let name = self.current.lexeme.clone();
        if self.scopes.resolve(&name).is_some() {
            let index = self.input_index;
            return self.report_error(
                Some(index),
                &format!("Redeclaring identifier \"{}\"", name),
            );
        }
        true
    }

    /// Use-side check: the current token must name a declared variable.
    pub(super) fn check_identifier_for_existing(&mut self) -> bool {
        let name = self.current.lexeme.clone();
        if self.scopes.resolve(&name).is_none() {
            let index = self.input_index;
            return self.report_error(
                Some(index),
                &format!("Undeclared identifier \"{}\"", name),
            );
        }
        true
    }

    pub(super) fn add_variable_to_scope(&mut self) -> bool {
        let has_initializer = self
            .ast_stack
            .from_top(1)
            .map_or(false, |node| node.name == "assignment");

        let extended_offset = if has_initializer { 2 } else { 0 };
        let extended = match self.ast_stack.from_top(extended_offset) {
            Some(node) if node.children.len() >= 2 => node.clone(),
            _ => panic!("Malformed AST! Variable declaration is missing its extended type node"),
        };

        let variable_type = Token::from_str(&extended.children[0].name)
            .ok()
            .and_then(datatype::core_type_for_keyword)
            .unwrap_or_else(|| {
                panic!("Malformed AST! Declaration does not start with a type keyword")
            });
        let variable_name = extended.children[1].lexeme.clone();
        let name_index = extended.children[1].token_index;
        let dimensions: Vec<u32> = extended.children[2..]
            .iter()
            .filter(|child| child.name == "integer")
            .filter_map(|child| child.lexeme.parse().ok())
            .collect();

        let ir_type = match self
            .builder
            .create_type(variable_type, dimensions.first().copied())
        {
            Ok(ir_type) => ir_type,
            Err(why) => return self.report_error(name_index, &why),
        };
        let allocation = self
            .builder
            .create_alloca(ir_type.clone(), &format!("({})_pointer", variable_name));

        if has_initializer {
            if dimensions.is_empty() {
                let initializer = match self.resolve_operand_at(0) {
                    Ok(operand) => operand,
                    Err(()) => return false,
                };
                let compatible =
                    datatype::are_types_compatible(variable_type, &initializer.type_name);
                if compatible != Some(variable_type) {
                    let value_index = self.ast_stack.top().and_then(|node| node.token_index);
                    return self.report_error(
                        value_index,
                        &format!(
                            "Cannot assign value of type \"{}\" to variable \"{}\" of type \"{}\"",
                            initializer.type_name, variable_name, variable_type
                        ),
                    );
                }
                let mut value = initializer
                    .ir_value
                    .unwrap_or_else(|| panic!("Malformed AST! Initialiser carries no value"));
                if variable_type == datatype::FLOAT
                    && initializer.type_name == datatype::INTEGER
                {
                    value = self.builder.convert_to_float(value);
                }
                self.builder.create_store(value, allocation);
            } else if !self.copy_array_initializer(&extended, &ir_type, allocation) {
                return false;
            }
        }

        let row_index =
            self.symbols
                .create_row(variable_type, &variable_name, Some(allocation), &dimensions);
        if !self.scopes.declare(&variable_name, row_index) {
            return self.report_error(
                name_index,
                &format!("Redeclaring identifier \"{}\"", variable_name),
            );
        }
        true
    }

    /// Arrays initialise by copying the array-literal global into the fresh
    /// allocation.
    fn copy_array_initializer(
        &mut self,
        extended: &crate::compiler::ast::AstNode,
        ir_type: &IrType,
        allocation: crate::compiler::backend::IrValue,
    ) -> bool {
        let initializer = self
            .ast_stack
            .top()
            .cloned()
            .unwrap_or_else(|| panic!("Malformed AST! Array declaration is missing its initialiser"));
        if initializer.computed_type != datatype::ARRAY_LITERAL || initializer.ir_value.is_none() {
            let name = extended.children[1].lexeme.clone();
            return self.report_error(
                initializer.token_index,
                &format!(
                    "Array variable \"{}\" needs an array literal initialiser",
                    name
                ),
            );
        }

        let element_size: i64 = match ir_type.element_type() {
            Some(IrType::Float64) => 8,
            Some(IrType::Integer32) => 4,
            _ => 1,
        };
        let length = match ir_type {
            IrType::Array(_, length) => *length as i64,
            _ => 1,
        };

        let memcpy = self.memcpy_prototype();
        let byte_pointer = IrType::Character.pointer_to();
        let destination =
            self.builder
                .create_bitcast(allocation, byte_pointer.clone(), "array_destination");
        let source = self.builder.create_bitcast(
            initializer.ir_value.unwrap(),
            byte_pointer,
            "array_source",
        );
        let size = self.builder.create_integer_constant(length * element_size);
        self.builder
            .create_call(memcpy, vec![destination, source, size], "");
        true
    }

    /// Store the value on top of the stack into the allocation of the
    /// variable three below it (`identifier, assignment, value`).
    pub(super) fn update_variable_in_scope(&mut self) -> bool {
        let value = match self.resolve_operand_at(0) {
            Ok(operand) => operand,
            Err(()) => return false,
        };
        let variable = match self.ast_stack.from_top(2) {
            Some(node) if node.declared_type == datatype::IDENTIFIER => node.clone(),
            _ => panic!("Malformed AST! Assignment target is not an identifier"),
        };

        let row_index = match self.scopes.resolve(&variable.lexeme) {
            Some(row_index) => row_index,
            None => {
                return self.report_error(
                    variable.token_index,
                    &format!("Undeclared identifier \"{}\"", variable.lexeme),
                )
            }
        };
        let row = self.symbols.get(row_index).unwrap();

        let mut ir_value = value
            .ir_value
            .unwrap_or_else(|| panic!("Malformed AST! Assignment value carries no IR value"));
        if row.type_name == datatype::FLOAT && value.type_name == datatype::INTEGER {
            ir_value = self.builder.convert_to_float(ir_value);
        }
        let pointer = row
            .ir_handle
            .expect("declared variables always carry an allocation");
        self.builder.create_store(ir_value, pointer);
        true
    }

    /// Type-compatibility check between an assignment target and the value
    /// about to be stored, on the same stack tail as
    /// `UpdateVariableInScope`.
    pub(super) fn check_identifier_type_with_assignment_right_hand_type_for_equality(
        &mut self,
    ) -> bool {
        let value = match self.resolve_operand_at(0) {
            Ok(operand) => operand,
            Err(()) => return false,
        };
        let variable = match self.ast_stack.from_top(2) {
            Some(node) if node.declared_type == datatype::IDENTIFIER => node.clone(),
            _ => panic!("Malformed AST! Assignment target is not an identifier"),
        };
        let row_index = match self.scopes.resolve(&variable.lexeme) {
            Some(row_index) => row_index,
            None => {
                return self.report_error(
                    variable.token_index,
                    &format!("Undeclared identifier \"{}\"", variable.lexeme),
                )
            }
        };
        let row = self.symbols.get(row_index).unwrap();

        let compatible = datatype::are_types_compatible(&row.type_name, &value.type_name);
        if compatible != Some(row.type_name.as_str()) {
            let value_index = self.ast_stack.top().and_then(|node| node.token_index);
            return self.report_error(
                value_index,
                &format!(
                    "Cannot assign value of type \"{}\" to variable \"{}\" of type \"{}\"",
                    value.type_name, variable.lexeme, row.type_name
                ),
            );
        }
        true
    }
}
