use std::str::FromStr;

use crate::compiler::ast::AstNode;
use crate::compiler::lexer::token::Token;
use crate::compiler::semantic_analyser::datatype;

use super::ll_driver::LlDriver;

/// Literal materialisation: each handler attaches an IR constant to the
/// freshly shifted literal leaf on top of the stack.
impl LlDriver {
    pub(super) fn create_integer_constant_action(&mut self) -> bool {
        let (lexeme, token_index) = match self.ast_stack.top() {
            Some(node) => (node.lexeme.clone(), node.token_index),
            None => panic!("Malformed AST! No literal on the stack"),
        };
        let value = match lexeme.parse() {
            Ok(value) => value,
            Err(_) => {
                return self.report_error(
                    token_index,
                    &format!("\"{}\" is not an integer literal", lexeme),
                )
            }
        };
        let constant = self.builder.create_integer_constant(value);
        self.ast_stack.top_mut().unwrap().ir_value = Some(constant);
        true
    }

    pub(super) fn create_float_constant_action(&mut self) -> bool {
        let (lexeme, token_index) = match self.ast_stack.top() {
            Some(node) => (node.lexeme.clone(), node.token_index),
            None => panic!("Malformed AST! No literal on the stack"),
        };
        let value = match lexeme.parse() {
            Ok(value) => value,
            Err(_) => {
                return self.report_error(
                    token_index,
                    &format!("\"{}\" is not a float literal", lexeme),
                )
            }
        };
        let constant = self.builder.create_float_constant(value);
        self.ast_stack.top_mut().unwrap().ir_value = Some(constant);
        true
    }

    pub(super) fn create_boolean_constant_action(&mut self) -> bool {
        let (lexeme, token_index) = match self.ast_stack.top() {
            Some(node) => (node.lexeme.clone(), node.token_index),
            None => panic!("Malformed AST! No literal on the stack"),
        };
        let constant = match self.builder.create_boolean_constant_from_text(&lexeme) {
            Ok(constant) => constant,
            Err(why) => return self.report_error(token_index, &why),
        };
        self.ast_stack.top_mut().unwrap().ir_value = Some(constant);
        true
    }

    pub(super) fn create_character_constant_action(&mut self) -> bool {
        let (lexeme, token_index) = match self.ast_stack.top() {
            Some(node) => (node.lexeme.clone(), node.token_index),
            None => panic!("Malformed AST! No literal on the stack"),
        };
        let character = match lexeme.chars().nth(1) {
            Some(character) => character,
            None => {
                return self.report_error(
                    token_index,
                    &format!("\"{}\" is not a character literal", lexeme),
                )
            }
        };
        let constant = self.builder.create_character_constant(character);
        self.ast_stack.top_mut().unwrap().ir_value = Some(constant);
        true
    }

    /// Strings drop their quotes and decode \n and \t before the global is
    /// created.
    pub(super) fn create_string_constant_action(&mut self) -> bool {
        let lexeme = match self.ast_stack.top() {
            Some(node) => node.lexeme.clone(),
            None => panic!("Malformed AST! No literal on the stack"),
        };
        let contents = lexeme
            .trim_start_matches('"')
            .trim_end_matches('"')
            .replace("\\n", "\n")
            .replace("\\t", "\t");
        let constant = self
            .builder
            .create_global_string_pointer(&contents, "string_literal");
        self.ast_stack.top_mut().unwrap().ir_value = Some(constant);
        true
    }

    /// Collapse the shifted array-literal tokens back to the opening
    /// bracket into one node backed by a global constant array. The element
    /// type comes from the extended type node of the surrounding
    /// declaration.
    pub(super) fn create_array_literal(&mut self) -> bool {
        let mut collected: Vec<AstNode> = Vec::new();
        loop {
            match self.ast_stack.pop() {
                Some(node) => {
                    let opening = node.name == "square_bracket_open";
                    collected.push(node);
                    if opening {
                        break;
                    }
                }
                None => panic!("Malformed AST! Array literal has no opening bracket"),
            }
        }
        collected.reverse();

        let element_type_name = match self.enclosing_declaration_type() {
            Some(type_name) => type_name,
            None => {
                let first_index = collected.first().and_then(|node| node.token_index);
                for node in collected {
                    self.ast_stack.push(node);
                }
                return self
                    .report_error(first_index, "Array literal outside of a declaration");
            }
        };

        let element_nodes: Vec<AstNode> = collected
            .iter()
            .filter(|node| node.ir_value.is_some())
            .cloned()
            .collect();

        let mut elements = Vec::with_capacity(element_nodes.len());
        for node in &element_nodes {
            let compatible =
                datatype::are_types_compatible(element_type_name, &node.computed_type);
            if compatible != Some(element_type_name) {
                let index = node.token_index;
                let message = format!(
                    "Array element of type \"{}\" does not fit an array of \"{}\"",
                    node.computed_type, element_type_name
                );
                for node in collected {
                    self.ast_stack.push(node);
                }
                return self.report_error(index, &message);
            }
            let element = if element_type_name == datatype::FLOAT
                && node.computed_type == datatype::INTEGER
            {
                let widened = node.lexeme.parse().unwrap_or(0.0);
                self.builder.create_float_constant(widened)
            } else {
                node.ir_value.unwrap()
            };
            elements.push(element);
        }

        let element_type = match self.builder.create_type(element_type_name, None) {
            Ok(element_type) => element_type,
            Err(why) => {
                for node in collected {
                    self.ast_stack.push(node);
                }
                return self.report_error(None, &why);
            }
        };
        let global = self
            .builder
            .create_global_array(element_type, elements, "array_literal");

        let lexemes: Vec<&str> = element_nodes.iter().map(|node| node.lexeme.as_str()).collect();
        let mut node = AstNode::rule("array_literal", element_nodes.clone());
        node.computed_type = String::from(datatype::ARRAY_LITERAL);
        node.declared_type = String::from(datatype::ARRAY_LITERAL);
        node.lexeme = format!("[{}]", lexemes.join(", "));
        node.ir_value = Some(global);
        node.token_index = collected.first().and_then(|first| first.token_index);
        self.ast_stack.push(node);
        true
    }

    /// Element type of the declaration the stack is currently inside: the
    /// nearest node below the top that starts with a type keyword leaf.
    fn enclosing_declaration_type(&self) -> Option<&'static str> {
        for offset in 0..self.ast_stack.len() {
            let node = self.ast_stack.from_top(offset)?;
            if let Some(first) = node.children.first() {
                if let Ok(token) = Token::from_str(&first.name) {
                    if let Some(type_name) = datatype::core_type_for_keyword(token) {
                        return Some(type_name);
                    }
                }
            }
        }
        None
    }
}
