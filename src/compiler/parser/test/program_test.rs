//! End-to-end programs over the stock test grammar: declarations,
//! assignments, control flow, intrinsics and the failure modes, asserting
//! both the emitted module and, where it matters, the executed output.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;

use super::grammar::{executing_parser_for, parser_for};
use crate::compiler::backend::{Instruction, IrModule, ValueKind};
use crate::compiler::diagnostics::Diagnostics;
use crate::compiler::lexer::token::Token;
use crate::compiler::parser::ParseOutcome;
use crate::compiler::LlParser;

fn assert_balanced(outcome: &ParseOutcome) {
    assert_eq!(outcome.ast_stack_depth, 1, "AST stack is unbalanced");
    assert_eq!(outcome.scope_depth, 1, "scope stack is unbalanced");
    assert_eq!(outcome.call_stack_depth, 0, "row call stack is unbalanced");
}

fn all_instructions(module: &IrModule) -> Vec<&Instruction> {
    module
        .blocks()
        .iter()
        .flat_map(|block| block.instructions.iter())
        .collect()
}

fn captured(parser: LlParser) -> (LlParser, Rc<RefCell<Vec<u8>>>) {
    colored::control::set_override(false);
    let sink = Rc::new(RefCell::new(Vec::new()));
    (
        parser.with_diagnostics(Diagnostics::with_sink(sink.clone())),
        sink,
    )
}

fn text_of(buffer: &Rc<RefCell<Vec<u8>>>) -> String {
    String::from_utf8(buffer.borrow().clone()).unwrap()
}

#[test]
fn constant_declaration_is_folded() {
    let outcome = parser_for(1).is_valid("int x = 2 + 3;");
    assert!(outcome.accepted);
    assert_balanced(&outcome);

    let module = outcome.module.unwrap();
    let instructions = all_instructions(&module);

    let alloca_name = instructions.iter().find_map(|instruction| match instruction {
        Instruction::Alloca { result, .. } => Some(module.value(*result).name.clone()),
        _ => None,
    });
    assert_eq!(alloca_name.as_deref(), Some("(x)_pointer"));

    let stored = instructions.iter().find_map(|instruction| match instruction {
        Instruction::Store { value, .. } => match module.value(*value).kind {
            ValueKind::ConstantInteger(folded) => Some(folded),
            _ => None,
        },
        _ => None,
    });
    assert_eq!(stored, Some(5));

    // The fold leaves no arithmetic in the module.
    assert!(!instructions
        .iter()
        .any(|instruction| matches!(instruction, Instruction::BinaryOperation { .. })));
}

#[test]
fn integer_initialiser_widens_into_float_variable() {
    let outcome = parser_for(1).is_valid("float y = 2 + 3.0;");
    assert!(outcome.accepted);
    assert_balanced(&outcome);

    let module = outcome.module.unwrap();
    let stored = all_instructions(&module)
        .iter()
        .find_map(|instruction| match instruction {
            Instruction::Store { value, .. } => match module.value(*value).kind {
                ValueKind::ConstantFloat(folded) => Some(folded),
                _ => None,
            },
            _ => None,
        });
    assert_relative_eq!(stored.unwrap(), 5.0);
}

#[test]
fn assignment_loads_the_variable_and_stores_the_sum() {
    let outcome = parser_for(2).is_valid("int x; x = x + 1;");
    assert!(outcome.accepted);
    assert_balanced(&outcome);

    let module = outcome.module.unwrap();
    let instructions = all_instructions(&module);

    let load_name = instructions.iter().find_map(|instruction| match instruction {
        Instruction::Load { result, .. } => Some(module.value(*result).name.clone()),
        _ => None,
    });
    assert_eq!(load_name.as_deref(), Some("x_value"));

    assert!(instructions
        .iter()
        .any(|instruction| matches!(instruction, Instruction::BinaryOperation { .. })));
    let store_count = instructions
        .iter()
        .filter(|instruction| matches!(instruction, Instruction::Store { .. }))
        .count();
    assert_eq!(store_count, 1);
}

#[test]
fn redeclaration_is_rejected() {
    let (parser, sink) = captured(parser_for(2));
    let outcome = parser.is_valid("int x; int x;");
    assert!(!outcome.accepted);
    assert_eq!(outcome.fail_index, Some(4));
    assert!(text_of(&sink).contains("Redeclaring identifier \"x\""));
}

#[test]
fn constant_division_by_zero_is_rejected() {
    let (parser, sink) = captured(parser_for(1));
    let outcome = parser.is_valid("int x = 1 / 0;");
    assert!(!outcome.accepted);
    assert_eq!(outcome.fail_index, Some(5));
    assert!(outcome.module.is_none());
    assert!(text_of(&sink).contains("Cannot divide by zero"));
}

#[test]
fn if_else_emits_terminated_blocks() {
    let outcome =
        parser_for(3).is_valid("int x; bool a = True; if ( a ) { x = 1; } else { x = 2; }");
    assert!(outcome.accepted);
    assert_balanced(&outcome);

    let module = outcome.module.unwrap();
    assert!(module.unterminated_blocks().is_empty());

    let block_names: Vec<&str> = module.blocks().iter().map(|block| block.name.as_str()).collect();
    assert!(block_names.contains(&"block_true"));
    assert!(block_names.contains(&"block_false"));
    assert!(block_names.contains(&"block_post_if"));

    assert!(all_instructions(&module)
        .iter()
        .any(|instruction| matches!(instruction, Instruction::ConditionalBranch { .. })));
}

#[test]
fn if_else_executes_the_matching_branch() {
    let (parser, output) = executing_parser_for(4, "");
    let outcome =
        parser.is_valid("int x; bool a = True; if ( a ) { x = 1; } else { x = 2; } write ( x ) ;");
    assert!(outcome.accepted);
    assert_eq!(text_of(&output), "1");
}

#[test]
fn while_loop_counts_up() {
    let (parser, output) = executing_parser_for(3, "");
    let outcome = parser.is_valid("int i = 1; while ( i < 4 ) { i = i + 1; } write ( i ) ;");
    assert!(outcome.accepted);
    assert_balanced(&outcome);
    assert!(outcome.module.unwrap().unterminated_blocks().is_empty());
    assert_eq!(text_of(&output), "4");
}

#[test]
fn parenthesised_expression_folds_before_multiplication() {
    let (parser, output) = executing_parser_for(2, "");
    let outcome = parser.is_valid("int x = ( 2 + 3 ) * 4; write ( x ) ;");
    assert!(outcome.accepted);
    assert_eq!(text_of(&output), "20");
}

#[test]
fn unary_minus_synthesises_a_negation() {
    let (parser, output) = executing_parser_for(2, "");
    let outcome = parser.is_valid("int x = - 5; write ( x ) ;");
    assert!(outcome.accepted);
    assert_eq!(text_of(&output), "-5");
}

#[test]
fn division_always_produces_a_float() {
    let (parser, output) = executing_parser_for(1, "");
    let outcome = parser.is_valid("write ( 7 / 2 ) ;");
    assert!(outcome.accepted);
    assert_eq!(text_of(&output), "3.500000");
}

#[test]
fn integer_division_and_modulus_stay_integers() {
    let (parser, output) = executing_parser_for(2, "");
    let outcome = parser.is_valid("write ( 7 // 2 ) ; write ( 7 % 3 ) ;");
    assert!(outcome.accepted);
    assert_eq!(text_of(&output), "31");
}

#[test]
fn character_write_uses_the_character_directive() {
    let (parser, output) = executing_parser_for(2, "");
    let outcome = parser.is_valid("char c = 'z'; write ( c ) ;");
    assert!(outcome.accepted);
    assert_eq!(text_of(&output), "z");
}

#[test]
fn string_write_prints_the_decoded_contents() {
    let (parser, output) = executing_parser_for(2, "");
    let outcome = parser.is_valid("string s = \"hi\"; write ( s ) ;");
    assert!(outcome.accepted);
    assert_eq!(text_of(&output), "hi");
}

#[test]
fn relational_result_prints_as_integer() {
    let (parser, output) = executing_parser_for(1, "");
    let outcome = parser.is_valid("write ( 2 < 3 ) ;");
    assert!(outcome.accepted);
    assert_eq!(text_of(&output), "1");
}

#[test]
fn read_scans_into_the_allocation() {
    let (parser, output) = executing_parser_for(3, "41\n");
    let outcome = parser.is_valid("int x; read ( x ) ; write ( x ) ;");
    assert!(outcome.accepted);
    assert_eq!(text_of(&output), "41");
}

#[test]
fn array_declaration_copies_and_indexes() {
    let (parser, output) = executing_parser_for(2, "");
    let outcome = parser.is_valid("int a[3] = [10, 20, 30]; write ( a[1] ) ;");
    assert!(outcome.accepted);
    assert_balanced(&outcome);
    assert_eq!(text_of(&output), "20");

    let module = outcome.module.unwrap();
    assert!(all_instructions(&module)
        .iter()
        .any(|instruction| matches!(instruction, Instruction::GetElementPointer { .. })));
}

#[test]
fn inner_scopes_see_outer_variables() {
    let (parser, output) = executing_parser_for(3, "");
    let outcome = parser.is_valid("int x = 5; { write ( x ) ; } write ( x ) ;");
    assert!(outcome.accepted);
    assert_balanced(&outcome);
    assert_eq!(text_of(&output), "55");
}

#[test]
fn scope_locals_are_gone_after_the_scope() {
    let (parser, sink) = captured(parser_for(2));
    let outcome = parser.is_valid("{ int y = 2; } write ( y ) ;");
    assert!(!outcome.accepted);
    assert_eq!(outcome.fail_index, Some(9));
    assert!(text_of(&sink).contains("Undeclared identifier \"y\""));
}

#[test]
fn assignment_to_undeclared_identifier_is_rejected() {
    let (parser, sink) = captured(parser_for(1));
    let outcome = parser.is_valid("x = 1;");
    assert!(!outcome.accepted);
    assert_eq!(outcome.fail_index, Some(0));
    assert!(text_of(&sink).contains("Undeclared identifier \"x\""));
}

#[test]
fn assignment_type_mismatch_is_rejected() {
    let (parser, sink) = captured(parser_for(2));
    let outcome = parser.is_valid("int x; x = 1.5;");
    assert!(!outcome.accepted);
    assert_eq!(outcome.fail_index, Some(5));
    assert!(text_of(&sink).contains("Cannot assign value of type \"float\""));
}

#[test]
fn missing_initialiser_lists_expected_tokens() {
    let outcome = parser_for(1).is_valid("int x = ;");
    assert!(!outcome.accepted);
    assert_eq!(outcome.fail_index, Some(3));
    assert!(outcome.expected_tokens.contains(&Token::Integer));
    assert!(outcome.expected_tokens.contains(&Token::Minus));
    assert!(outcome.expected_tokens.contains(&Token::SquareBracketOpen));
}

#[test]
fn comments_are_transparent_inside_programs() {
    let outcome = parser_for(1).is_valid("int x = 2 + 3 ; # done");
    assert!(outcome.accepted);
    assert_balanced(&outcome);
}
