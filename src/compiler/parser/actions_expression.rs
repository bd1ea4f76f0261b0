use enum_assoc::Assoc;

use crate::compiler::ast::AstNode;
use crate::compiler::backend::ComparePredicate;
use crate::compiler::semantic_analyser::datatype;
use crate::compiler::semantic_analyser::Calculator;

use super::ll_driver::LlDriver;

/// Binary operators of the source language with their spelling and family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Assoc)]
#[func(pub const fn symbol(&self) -> &'static str)]
#[func(pub const fn is_relational(&self) -> bool)]
pub(super) enum BinaryOperator {
    #[assoc(symbol = "+")]
    #[assoc(is_relational = false)]
    Add,
    #[assoc(symbol = "-")]
    #[assoc(is_relational = false)]
    Subtract,
    #[assoc(symbol = "*")]
    #[assoc(is_relational = false)]
    Multiply,
    #[assoc(symbol = "/")]
    #[assoc(is_relational = false)]
    Divide,
    #[assoc(symbol = "//")]
    #[assoc(is_relational = false)]
    IntegerDivide,
    #[assoc(symbol = "%")]
    #[assoc(is_relational = false)]
    Modulus,
    #[assoc(symbol = "==")]
    #[assoc(is_relational = true)]
    Equal,
    #[assoc(symbol = "!=")]
    #[assoc(is_relational = true)]
    NotEqual,
    #[assoc(symbol = "<")]
    #[assoc(is_relational = true)]
    Less,
    #[assoc(symbol = "<=")]
    #[assoc(is_relational = true)]
    LessOrEqual,
    #[assoc(symbol = ">")]
    #[assoc(is_relational = true)]
    More,
    #[assoc(symbol = ">=")]
    #[assoc(is_relational = true)]
    MoreOrEqual,
}

impl BinaryOperator {
    fn predicate(&self) -> ComparePredicate {
        match self {
            BinaryOperator::Equal => ComparePredicate::Eq,
            BinaryOperator::NotEqual => ComparePredicate::Ne,
            BinaryOperator::Less => ComparePredicate::Slt,
            BinaryOperator::LessOrEqual => ComparePredicate::Sle,
            BinaryOperator::More => ComparePredicate::Sgt,
            BinaryOperator::MoreOrEqual => ComparePredicate::Sge,
            _ => panic!("{:?} is not a relational operator", self),
        }
    }
}

/// Expression synthesis. Each handler works on the stack tail
/// `lhs, operator-rhs` where the operator node's second child is the right
/// operand. The synthesised result replaces the lhs node and both nodes'
/// children are cleared, so the pair later collapses into a single
/// expression node.
impl LlDriver {
    pub(super) fn synthesis_plus(&mut self) -> bool {
        self.synthesise_binary(BinaryOperator::Add)
    }

    pub(super) fn synthesis_minus(&mut self) -> bool {
        self.synthesise_binary(BinaryOperator::Subtract)
    }

    pub(super) fn synthesis_multiply(&mut self) -> bool {
        self.synthesise_binary(BinaryOperator::Multiply)
    }

    pub(super) fn synthesis_divide(&mut self) -> bool {
        self.synthesise_binary(BinaryOperator::Divide)
    }

    pub(super) fn synthesis_integer_divide(&mut self) -> bool {
        self.synthesise_binary(BinaryOperator::IntegerDivide)
    }

    pub(super) fn synthesis_modulus(&mut self) -> bool {
        self.synthesise_binary(BinaryOperator::Modulus)
    }

    pub(super) fn synthesis_equivalence(&mut self) -> bool {
        self.synthesise_binary(BinaryOperator::Equal)
    }

    pub(super) fn synthesis_not_equivalence(&mut self) -> bool {
        self.synthesise_binary(BinaryOperator::NotEqual)
    }

    pub(super) fn synthesis_less(&mut self) -> bool {
        self.synthesise_binary(BinaryOperator::Less)
    }

    pub(super) fn synthesis_less_or_equivalence(&mut self) -> bool {
        self.synthesise_binary(BinaryOperator::LessOrEqual)
    }

    pub(super) fn synthesis_more(&mut self) -> bool {
        self.synthesise_binary(BinaryOperator::More)
    }

    pub(super) fn synthesis_more_or_equivalence(&mut self) -> bool {
        self.synthesise_binary(BinaryOperator::MoreOrEqual)
    }

    /// A minus with no left operand is a negation. The left slot then holds
    /// an operator or opening bracket leaf rather than a value.
    fn is_unary_minus(lexeme: &str) -> bool {
        matches!(lexeme, "=" | "+" | "-" | "*" | "/" | "//" | "%" | "(")
    }

    fn synthesise_binary(&mut self, operator: BinaryOperator) -> bool {
        if operator == BinaryOperator::Subtract {
            let unary = self
                .ast_stack
                .from_top(1)
                .map_or(true, |node| Self::is_unary_minus(&node.lexeme));
            if unary {
                let zero_value = self.builder.create_integer_constant(0);
                let zero = AstNode {
                    name: String::from("integer"),
                    declared_type: String::from(datatype::INTEGER),
                    computed_type: String::from(datatype::INTEGER),
                    lexeme: String::from("0"),
                    ir_value: Some(zero_value),
                    ..Default::default()
                };
                self.ast_stack.insert_from_top(1, zero);
            }
        }

        let mut rhs_node = match self.ast_stack.top() {
            Some(node) if node.children.len() >= 2 => node.children[1].clone(),
            _ => panic!("Malformed AST! Operator node is missing its right-hand operand"),
        };
        let rhs = match self.resolve_operand(&mut rhs_node) {
            Ok(operand) => operand,
            Err(()) => return false,
        };
        self.ast_stack.top_mut().unwrap().children[1] = rhs_node.clone();

        let mut lhs_node = self
            .ast_stack
            .from_top(1)
            .cloned()
            .unwrap_or_else(|| panic!("Malformed AST! Operator is missing its left-hand operand"));
        let lhs = match self.resolve_operand(&mut lhs_node) {
            Ok(operand) => operand,
            Err(()) => return false,
        };
        *self.ast_stack.from_top_mut(1).unwrap() = lhs_node.clone();

        let combined = match datatype::are_types_compatible(&lhs.type_name, &rhs.type_name) {
            Some(combined) => String::from(combined),
            None => {
                return self.report_error(
                    rhs_node.token_index,
                    &format!(
                        "Cannot apply operator \"{}\" to types \"{}\" and \"{}\"",
                        operator.symbol(),
                        lhs.type_name,
                        rhs.type_name
                    ),
                )
            }
        };

        let temporary_name = format!(
            "({} {} {})",
            lhs_node.lexeme,
            operator.symbol(),
            rhs_node.lexeme
        );

        if operator.is_relational() {
            return self.synthesise_comparison(operator, &combined, &lhs_node, &rhs_node, &temporary_name);
        }

        let result_type = match operator {
            BinaryOperator::Divide => String::from(datatype::FLOAT),
            BinaryOperator::IntegerDivide => String::from(datatype::INTEGER),
            BinaryOperator::Modulus => {
                if combined != datatype::INTEGER {
                    return self.report_error(
                        rhs_node.token_index,
                        &format!(
                            "Operator \"%\" needs integer operands, found \"{}\"",
                            combined
                        ),
                    );
                }
                String::from(datatype::INTEGER)
            }
            _ => combined.clone(),
        };

        if matches!(operator, BinaryOperator::Divide | BinaryOperator::IntegerDivide)
            && combined != datatype::INTEGER
            && combined != datatype::FLOAT
        {
            return self.report_error(
                rhs_node.token_index,
                &format!(
                    "Cannot apply operator \"{}\" to values of type \"{}\"",
                    operator.symbol(),
                    combined
                ),
            );
        }

        let identifiers_exist = lhs.is_identifier || rhs.is_identifier;
        if identifiers_exist {
            let lhs_value = lhs
                .ir_value
                .unwrap_or_else(|| panic!("Malformed AST! Operand carries no IR value"));
            let rhs_value = rhs
                .ir_value
                .unwrap_or_else(|| panic!("Malformed AST! Operand carries no IR value"));

            let emitted = match operator {
                BinaryOperator::Add => {
                    self.builder
                        .create_add(&result_type, lhs_value, rhs_value, &temporary_name)
                }
                BinaryOperator::Subtract => {
                    self.builder
                        .create_sub(&result_type, lhs_value, rhs_value, &temporary_name)
                }
                BinaryOperator::Multiply => {
                    self.builder
                        .create_mul(&result_type, lhs_value, rhs_value, &temporary_name)
                }
                BinaryOperator::Divide => {
                    self.builder
                        .create_div(&result_type, lhs_value, rhs_value, &temporary_name)
                }
                BinaryOperator::IntegerDivide => {
                    self.builder
                        .create_exact_sdiv(&result_type, lhs_value, rhs_value, &temporary_name)
                }
                BinaryOperator::Modulus => {
                    self.builder
                        .create_srem(&result_type, lhs_value, rhs_value, &temporary_name)
                }
                _ => unreachable!(),
            };
            let value = match emitted {
                Ok(value) => value,
                Err(why) => return self.report_error(rhs_node.token_index, &why),
            };

            let lhs_slot = self.ast_stack.from_top_mut(1).unwrap();
            lhs_slot.declared_type = String::from(datatype::IDENTIFIER);
            lhs_slot.computed_type = result_type;
            lhs_slot.lexeme = temporary_name;
            lhs_slot.is_temporary = true;
            lhs_slot.ir_value = Some(value);
            lhs_slot.children.clear();
            self.ast_stack.top_mut().unwrap().children.clear();
            return true;
        }

        // Both sides are constants: fold the operation over the lexemes.
        let folded = match operator {
            BinaryOperator::Add => Calculator::add(&lhs_node.lexeme, &rhs_node.lexeme, &result_type),
            BinaryOperator::Subtract => {
                Calculator::subtract(&lhs_node.lexeme, &rhs_node.lexeme, &result_type)
            }
            BinaryOperator::Multiply => {
                Calculator::multiply(&lhs_node.lexeme, &rhs_node.lexeme, &result_type)
            }
            BinaryOperator::Divide => {
                Calculator::division(&lhs_node.lexeme, &rhs_node.lexeme, &result_type)
            }
            BinaryOperator::IntegerDivide => {
                Calculator::integer_division(&lhs_node.lexeme, &rhs_node.lexeme, &result_type)
            }
            BinaryOperator::Modulus => {
                Calculator::modulus(&lhs_node.lexeme, &rhs_node.lexeme, &result_type)
            }
            _ => unreachable!(),
        };

        match folded {
            Ok(text) => {
                let constant = match result_type.as_str() {
                    datatype::INTEGER => {
                        let parsed = text.parse().unwrap_or(0);
                        self.builder.create_integer_constant(parsed)
                    }
                    datatype::FLOAT => {
                        let parsed = text.parse().unwrap_or(0.0);
                        self.builder.create_float_constant(parsed)
                    }
                    other => {
                        return self
                            .report_error(rhs_node.token_index, &format!("Unsupported type \"{}\"", other))
                    }
                };

                let lhs_slot = self.ast_stack.from_top_mut(1).unwrap();
                lhs_slot.declared_type = result_type.clone();
                lhs_slot.computed_type = result_type;
                lhs_slot.lexeme = text;
                lhs_slot.ir_value = Some(constant);
                lhs_slot.children.clear();
                self.ast_stack.top_mut().unwrap().children.clear();
                true
            }
            Err(message) => self.report_error(rhs_node.token_index, &message),
        }
    }

    /// Relational synthesis always emits a compare; the result is a boolean
    /// temporary.
    fn synthesise_comparison(
        &mut self,
        operator: BinaryOperator,
        operand_type: &str,
        lhs_node: &AstNode,
        rhs_node: &AstNode,
        temporary_name: &str,
    ) -> bool {
        let lhs_value = lhs_node
            .ir_value
            .unwrap_or_else(|| panic!("Malformed AST! Operand carries no IR value"));
        let rhs_value = rhs_node
            .ir_value
            .unwrap_or_else(|| panic!("Malformed AST! Operand carries no IR value"));

        // Literal categories compare as their core type.
        let compare_type = match operand_type {
            datatype::BOOLEAN_LITERAL => datatype::BOOLEAN,
            datatype::CHARACTER_LITERAL => datatype::CHARACTER,
            other => other,
        };

        let compared = self.builder.create_compare(
            compare_type,
            operator.predicate(),
            lhs_value,
            rhs_value,
            temporary_name,
        );
        let value = match compared {
            Ok(value) => value,
            Err(why) => return self.report_error(rhs_node.token_index, &why),
        };

        let lhs_slot = self.ast_stack.from_top_mut(1).unwrap();
        lhs_slot.declared_type = String::from(datatype::IDENTIFIER);
        lhs_slot.computed_type = String::from(datatype::BOOLEAN);
        lhs_slot.lexeme = String::from(temporary_name);
        lhs_slot.is_temporary = true;
        lhs_slot.ir_value = Some(value);
        lhs_slot.children.clear();
        self.ast_stack.top_mut().unwrap().children.clear();
        true
    }

    /// Load an identifier referenced as a value. Scalar references load
    /// straight from the allocation; array accesses compute an in-bounds
    /// element pointer from the index expression first.
    pub(super) fn try_to_load_value_from_symbol_table(&mut self) -> bool {
        let node = match self.ast_stack.top() {
            Some(node) => node.clone(),
            None => panic!("Malformed AST! Nothing on the stack to load"),
        };

        if node.children.is_empty() {
            if node.declared_type != datatype::IDENTIFIER
                || node.computed_type != datatype::IDENTIFIER
            {
                return true;
            }
            return self.resolve_operand_at(0).is_ok();
        }

        // Array element access: first child names the array, a later child
        // carries the index expression.
        if node.children[0].declared_type != datatype::IDENTIFIER {
            return true;
        }
        let array_name = node.children[0].lexeme.clone();
        let name_index = node.children[0].token_index;

        let row_index = match self.scopes.resolve(&array_name) {
            Some(row_index) => row_index,
            None => {
                return self.report_error(
                    name_index,
                    &format!("Undeclared identifier \"{}\"", array_name),
                )
            }
        };
        let row = self.symbols.get(row_index).unwrap();
        if row.array_information.is_none() {
            return self.report_error(
                name_index,
                &format!("Identifier \"{}\" is not an array", array_name),
            );
        }

        let index_position = node
            .children
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, child)| {
                child.name != "square_bracket_open" && child.name != "square_bracket_close"
            })
            .map(|(position, _)| position)
            .unwrap_or_else(|| panic!("Malformed AST! Array access is missing its index"));

        let mut index_node = node.children[index_position].clone();
        let index = match self.resolve_operand(&mut index_node) {
            Ok(operand) => operand,
            Err(()) => return false,
        };
        if index.type_name != datatype::INTEGER {
            return self.report_error(
                index_node.token_index,
                &format!(
                    "Array index must be an integer, found \"{}\"",
                    index.type_name
                ),
            );
        }

        let zero = self.builder.create_integer_constant(0);
        let pointer = row
            .ir_handle
            .expect("declared variables always carry an allocation");
        let element = self.builder.create_in_bounds_gep(
            pointer,
            vec![zero, index.ir_value.unwrap()],
            &format!("{}_element", array_name),
        );
        let loaded = self
            .builder
            .create_load(element, &format!("{}_value", array_name));

        let top = self.ast_stack.top_mut().unwrap();
        top.declared_type = String::from(datatype::IDENTIFIER);
        top.computed_type = row.type_name.clone();
        top.lexeme = format!("{}[{}]", array_name, index_node.lexeme);
        top.is_temporary = true;
        top.ir_value = Some(loaded);
        top.children.clear();
        true
    }
}
