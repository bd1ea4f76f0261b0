use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use crate::compiler::backend::{
    ComparePredicate, ExecutionEngine, IrBuilder, IrModule, IrType,
};

/// Run a module with captured output and scripted input.
fn run_module(module: IrModule, input: &str) -> (i64, String) {
    let output = Rc::new(RefCell::new(Vec::<u8>::new()));
    let input_reader = Rc::new(RefCell::new(Cursor::new(input.as_bytes().to_vec())));

    let mut engine = ExecutionEngine::new(module)
        .with_output(output.clone())
        .with_input(input_reader);
    engine.finalize().unwrap();
    let exit_value = engine.run("main").unwrap();

    let text = String::from_utf8(output.borrow().clone()).unwrap();
    (exit_value, text)
}

fn printf_proto(builder: &mut IrBuilder) -> crate::compiler::backend::PrototypeId {
    builder.declare_external(
        "printf",
        IrType::Integer32,
        vec![IrType::Character.pointer_to()],
        true,
    )
}

#[test]
fn store_load_add_print() {
    let mut builder = IrBuilder::new("test");
    let slot_type = builder.create_type("integer", None).unwrap();
    let slot = builder.create_alloca(slot_type, "(x)_pointer");
    let five = builder.create_integer_constant(5);
    builder.create_store(five, slot);

    let loaded = builder.create_load(slot, "x_value");
    let one = builder.create_integer_constant(1);
    let sum = builder.create_add("integer", loaded, one, "(x + 1)").unwrap();

    let printf = printf_proto(&mut builder);
    let format = builder.create_global_string_pointer("%d", "format_integer");
    builder.create_call(printf, vec![format, sum], "printf_call");

    let zero = builder.create_integer_constant(0);
    builder.create_ret(Some(zero));

    let (exit_value, text) = run_module(builder.into_module(), "");
    assert_eq!(exit_value, 0);
    assert_eq!(text, "6");
}

#[test]
fn float_printf_uses_six_decimals() {
    let mut builder = IrBuilder::new("test");
    let seven = builder.create_integer_constant(7);
    let two = builder.create_integer_constant(2);
    let quotient = builder.create_div("float", seven, two, "(7 / 2)").unwrap();

    let printf = printf_proto(&mut builder);
    let format = builder.create_global_string_pointer("%f", "format_float");
    builder.create_call(printf, vec![format, quotient], "printf_call");

    let zero = builder.create_integer_constant(0);
    builder.create_ret(Some(zero));

    let (_, text) = run_module(builder.into_module(), "");
    assert_eq!(text, "3.500000");
}

#[test]
fn conditional_branch_selects_block() {
    let mut builder = IrBuilder::new("test");
    let printf = printf_proto(&mut builder);

    let lhs = builder.create_integer_constant(2);
    let rhs = builder.create_integer_constant(3);
    let condition = builder
        .create_compare("integer", ComparePredicate::Slt, lhs, rhs, "(2 < 3)")
        .unwrap();

    let block_true = builder.create_basic_block("block_true");
    let block_false = builder.create_basic_block("block_false");
    let block_join = builder.create_basic_block("block_previous");
    builder.create_cond_br(condition, block_true, block_false);

    builder.set_insertion_point(block_true);
    let yes = builder.create_global_string_pointer("yes", "text_yes");
    let format = builder.create_global_string_pointer("%s", "format_string");
    builder.create_call(printf, vec![format, yes], "printf_call");
    builder.create_br(block_join);

    builder.set_insertion_point(block_false);
    let no = builder.create_global_string_pointer("no", "text_no");
    builder.create_call(printf, vec![format, no], "printf_call");
    builder.create_br(block_join);

    builder.set_insertion_point(block_join);
    let zero = builder.create_integer_constant(0);
    builder.create_ret(Some(zero));

    let (_, text) = run_module(builder.into_module(), "");
    assert_eq!(text, "yes");
}

#[test]
fn loop_counts_to_three() {
    let mut builder = IrBuilder::new("test");
    let printf = printf_proto(&mut builder);
    let format = builder.create_global_string_pointer("%d ", "format_integer");

    let counter_type = builder.create_type("integer", None).unwrap();
    let counter = builder.create_alloca(counter_type, "(i)_pointer");
    let one = builder.create_integer_constant(1);
    let zero = builder.create_integer_constant(0);
    builder.create_store(one, counter);

    let pre_while = builder.create_basic_block("block_pre_while");
    let body = builder.create_basic_block("block_while");
    let exit = builder.create_basic_block("block_previous");
    builder.create_br(pre_while);

    builder.set_insertion_point(pre_while);
    let current = builder.create_load(counter, "i_value");
    let limit = builder.create_integer_constant(3);
    let condition = builder
        .create_compare("integer", ComparePredicate::Sle, current, limit, "(i <= 3)")
        .unwrap();
    builder.create_cond_br(condition, body, exit);

    builder.set_insertion_point(body);
    let current = builder.create_load(counter, "i_value");
    builder.create_call(printf, vec![format, current], "printf_call");
    let advanced = builder.create_add("integer", current, one, "(i + 1)").unwrap();
    builder.create_store(advanced, counter);
    builder.create_br(pre_while);

    builder.set_insertion_point(exit);
    builder.create_ret(Some(zero));

    let (_, text) = run_module(builder.into_module(), "");
    assert_eq!(text, "1 2 3 ");
}

#[test]
fn scanf_reads_into_allocation() {
    let mut builder = IrBuilder::new("test");
    let printf = printf_proto(&mut builder);
    let scanf = builder.declare_external(
        "scanf",
        IrType::Integer32,
        vec![IrType::Character.pointer_to()],
        true,
    );

    let slot_type = builder.create_type("integer", None).unwrap();
    let slot = builder.create_alloca(slot_type, "(x)_pointer");
    let read_format = builder.create_global_string_pointer("%d", "format_read");
    builder.create_call(scanf, vec![read_format, slot], "scanf_call");

    let loaded = builder.create_load(slot, "x_value");
    let write_format = builder.create_global_string_pointer("%d", "format_write");
    builder.create_call(printf, vec![write_format, loaded], "printf_call");

    let zero = builder.create_integer_constant(0);
    builder.create_ret(Some(zero));

    let (_, text) = run_module(builder.into_module(), "42\n");
    assert_eq!(text, "42");
}

#[test]
fn memcpy_fills_array_allocation() {
    let mut builder = IrBuilder::new("test");
    let printf = printf_proto(&mut builder);

    let elements = vec![
        builder.create_integer_constant(10),
        builder.create_integer_constant(20),
        builder.create_integer_constant(30),
    ];
    let global = builder.create_global_array(IrType::Integer32, elements, "array_literal");

    let array_type = builder.create_type("integer", Some(3)).unwrap();
    let slot = builder.create_alloca(array_type, "(a)_pointer");

    let memcpy = builder.declare_external(
        "memcpy",
        IrType::Void,
        vec![
            IrType::Character.pointer_to(),
            IrType::Character.pointer_to(),
            IrType::Integer32,
        ],
        false,
    );
    let size = builder.create_integer_constant(12);
    builder.create_call(memcpy, vec![slot, global, size], "");

    let zero = builder.create_integer_constant(0);
    let index = builder.create_integer_constant(1);
    let element_pointer = builder.create_in_bounds_gep(slot, vec![zero, index], "a_element");
    let element = builder.create_load(element_pointer, "a_value");

    let format = builder.create_global_string_pointer("%d", "format_integer");
    builder.create_call(printf, vec![format, element], "printf_call");
    builder.create_ret(Some(zero));

    let (_, text) = run_module(builder.into_module(), "");
    assert_eq!(text, "20");
}

#[test]
fn finalize_rejects_unterminated_blocks() {
    let builder = IrBuilder::new("test");
    let mut engine = ExecutionEngine::new(builder.into_module());
    assert!(engine.finalize().is_err());
}

#[test]
fn runtime_division_by_zero_fails() {
    let mut builder = IrBuilder::new("test");
    let slot_type = builder.create_type("integer", None).unwrap();
    let slot = builder.create_alloca(slot_type, "(d)_pointer");
    let zero = builder.create_integer_constant(0);
    builder.create_store(zero, slot);

    let divisor = builder.create_load(slot, "d_value");
    let seven = builder.create_integer_constant(7);
    let quotient = builder
        .create_exact_sdiv("integer", seven, divisor, "(7 // d)")
        .unwrap();
    builder.create_ret(Some(quotient));

    let output = Rc::new(RefCell::new(Vec::<u8>::new()));
    let mut engine = ExecutionEngine::new(builder.into_module()).with_output(output);
    engine.finalize().unwrap();
    assert!(engine.run("main").is_err());
}

#[test]
fn run_requires_finalize() {
    let mut builder = IrBuilder::new("test");
    let zero = builder.create_integer_constant(0);
    builder.create_ret(Some(zero));
    let mut engine = ExecutionEngine::new(builder.into_module());
    assert!(engine.run("main").is_err());
}
