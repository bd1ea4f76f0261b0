use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use anyhow::{anyhow, bail, Result};

use super::ir::{
    BinaryOp, BlockId, ComparePredicate, Instruction, IrModule, IrType, IrValue, ValueKind,
};

/// Values a program manipulates at run time. Integer widths collapse to i64
/// and characters stay as chars; the IR types remain authoritative for the
/// printed module, not for the interpreter.
#[derive(Debug, Clone, PartialEq)]
enum RuntimeValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Character(char),
    Str(String),
    Pointer(Address),
    ArrayLiteral(Vec<RuntimeValue>),
    Uninitialised,
}

/// A pointer at run time: a memory slot plus an element offset inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Address {
    slot: usize,
    offset: usize,
}

#[derive(Debug, Clone)]
enum MemorySlot {
    Scalar(RuntimeValue),
    Array(Vec<RuntimeValue>),
}

/// ExecutionEngine interprets a finalized IrModule. Program output and the
/// input consumed by scanf are injectable so tests can capture both.
pub struct ExecutionEngine {
    module: IrModule,
    finalized: bool,
    output: Rc<RefCell<dyn Write>>,
    input: Rc<RefCell<dyn BufRead>>,
    memory: Vec<MemorySlot>,
    registers: HashMap<IrValue, RuntimeValue>,
    pending_input: VecDeque<String>,
}

impl ExecutionEngine {
    pub fn new(module: IrModule) -> Self {
        ExecutionEngine {
            module,
            finalized: false,
            output: Rc::new(RefCell::new(io::stdout())),
            input: Rc::new(RefCell::new(io::BufReader::new(io::stdin()))),
            memory: vec![],
            registers: HashMap::new(),
            pending_input: VecDeque::new(),
        }
    }

    pub fn with_output(mut self, output: Rc<RefCell<dyn Write>>) -> Self {
        self.output = output;
        self
    }

    pub fn with_input(mut self, input: Rc<RefCell<dyn BufRead>>) -> Self {
        self.input = input;
        self
    }

    /// Verify the module before execution. Every basic block must end in a
    /// terminator.
    pub fn finalize(&mut self) -> Result<()> {
        let unterminated = self.module.unterminated_blocks();
        if !unterminated.is_empty() {
            bail!("unterminated basic blocks: {}", unterminated.join(", "));
        }
        self.finalized = true;
        Ok(())
    }

    /// Run a function to completion and return its integer exit value.
    /// The module defines a single function.
    pub fn run(&mut self, function_name: &str) -> Result<i64> {
        if !self.finalized {
            bail!("execution engine must be finalized before running");
        }
        if function_name != "main" {
            bail!("unknown function \"{}\"", function_name);
        }

        let mut block = self.module.entry_block();
        let mut program_counter = 0;
        loop {
            let instruction = self
                .module
                .block(block)
                .instructions
                .get(program_counter)
                .cloned()
                .ok_or_else(|| anyhow!("fell off the end of block {}", self.module.block(block).name))?;

            program_counter += 1;
            match self.execute(&instruction)? {
                Flow::Continue => {}
                Flow::Jump(target) => {
                    block = target;
                    program_counter = 0;
                }
                Flow::Finished(value) => return Ok(value),
            }
        }
    }
}

enum Flow {
    Continue,
    Jump(BlockId),
    Finished(i64),
}

impl ExecutionEngine {
    fn execute(&mut self, instruction: &Instruction) -> Result<Flow> {
        match instruction {
            Instruction::Alloca { result, allocated } => {
                let slot = match allocated {
                    IrType::Array(_, length) => {
                        MemorySlot::Array(vec![RuntimeValue::Uninitialised; *length])
                    }
                    _ => MemorySlot::Scalar(RuntimeValue::Uninitialised),
                };
                self.memory.push(slot);
                let address = Address {
                    slot: self.memory.len() - 1,
                    offset: 0,
                };
                self.registers.insert(*result, RuntimeValue::Pointer(address));
                Ok(Flow::Continue)
            }
            Instruction::Store { value, pointer } => {
                let value = self.evaluate(*value)?;
                let address = self.evaluate_pointer(*pointer)?;
                self.write_address(address, value)?;
                Ok(Flow::Continue)
            }
            Instruction::Load { result, pointer } => {
                let address = self.evaluate_pointer(*pointer)?;
                let value = self.read_address(address)?;
                self.registers.insert(*result, value);
                Ok(Flow::Continue)
            }
            Instruction::BinaryOperation { result, op, lhs, rhs } => {
                let lhs = self.evaluate(*lhs)?;
                let rhs = self.evaluate(*rhs)?;
                let value = Self::apply_binary(*op, lhs, rhs)?;
                self.registers.insert(*result, value);
                Ok(Flow::Continue)
            }
            Instruction::Compare { result, predicate, lhs, rhs } => {
                let lhs = self.evaluate(*lhs)?;
                let rhs = self.evaluate(*rhs)?;
                let value = Self::apply_compare(*predicate, lhs, rhs)?;
                self.registers.insert(*result, RuntimeValue::Boolean(value));
                Ok(Flow::Continue)
            }
            Instruction::SignedToFloat { result, value } => {
                let value = Self::as_float(self.evaluate(*value)?)?;
                self.registers.insert(*result, RuntimeValue::Float(value));
                Ok(Flow::Continue)
            }
            Instruction::FloatToSigned { result, value } => {
                let value = Self::as_float(self.evaluate(*value)?)? as i64;
                self.registers.insert(*result, RuntimeValue::Integer(value));
                Ok(Flow::Continue)
            }
            Instruction::Bitcast { result, value, .. } => {
                let value = self.evaluate(*value)?;
                self.registers.insert(*result, value);
                Ok(Flow::Continue)
            }
            Instruction::GetElementPointer { result, pointer, indices } => {
                let mut address = self.evaluate_pointer(*pointer)?;
                // The leading zero index walks through the pointer itself;
                // the remaining indices advance inside the aggregate.
                for (position, index) in indices.iter().enumerate() {
                    let index = Self::as_integer(self.evaluate(*index)?)?;
                    if position == 0 {
                        continue;
                    }
                    address.offset += index as usize;
                }
                self.registers.insert(*result, RuntimeValue::Pointer(address));
                Ok(Flow::Continue)
            }
            Instruction::Call { result, prototype, arguments } => {
                let name = self.module.prototype(*prototype).name.clone();
                let return_value = match name.as_str() {
                    "printf" => self.call_printf(arguments)?,
                    "scanf" => self.call_scanf(arguments)?,
                    "memcpy" => self.call_memcpy(arguments)?,
                    unknown => bail!("call to unknown external function \"{}\"", unknown),
                };
                if let Some(result) = result {
                    self.registers.insert(*result, RuntimeValue::Integer(return_value));
                }
                Ok(Flow::Continue)
            }
            Instruction::Branch { target } => Ok(Flow::Jump(*target)),
            Instruction::ConditionalBranch { condition, on_true, on_false } => {
                let condition = self.evaluate(*condition)?;
                let taken = match condition {
                    RuntimeValue::Boolean(value) => value,
                    RuntimeValue::Integer(value) => value != 0,
                    RuntimeValue::Float(value) => value != 0.0,
                    other => bail!("branch condition is not scalar: {:?}", other),
                };
                Ok(Flow::Jump(if taken { *on_true } else { *on_false }))
            }
            Instruction::Return { value } => {
                let exit_value = match value {
                    Some(value) => Self::as_integer(self.evaluate(*value)?)?,
                    None => 0,
                };
                Ok(Flow::Finished(exit_value))
            }
        }
    }

    fn evaluate(&self, handle: IrValue) -> Result<RuntimeValue> {
        let data = self.module.value(handle);
        Ok(match &data.kind {
            ValueKind::ConstantInteger(value) => RuntimeValue::Integer(*value),
            ValueKind::ConstantFloat(value) => RuntimeValue::Float(*value),
            ValueKind::ConstantBoolean(value) => RuntimeValue::Boolean(*value),
            ValueKind::ConstantCharacter(value) => RuntimeValue::Character(*value),
            ValueKind::GlobalString(contents) => RuntimeValue::Str(contents.clone()),
            ValueKind::GlobalArray(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(*element)?);
                }
                RuntimeValue::ArrayLiteral(values)
            }
            ValueKind::Instruction => self
                .registers
                .get(&handle)
                .cloned()
                .ok_or_else(|| anyhow!("use of instruction result before definition"))?,
        })
    }

    fn evaluate_pointer(&self, handle: IrValue) -> Result<Address> {
        match self.evaluate(handle)? {
            RuntimeValue::Pointer(address) => Ok(address),
            other => Err(anyhow!("expected a pointer, found {:?}", other)),
        }
    }

    fn read_address(&self, address: Address) -> Result<RuntimeValue> {
        match self.memory.get(address.slot) {
            Some(MemorySlot::Scalar(value)) => Ok(value.clone()),
            Some(MemorySlot::Array(values)) => values
                .get(address.offset)
                .cloned()
                .ok_or_else(|| anyhow!("array read out of bounds at offset {}", address.offset)),
            None => Err(anyhow!("dangling pointer to slot {}", address.slot)),
        }
    }

    fn write_address(&mut self, address: Address, value: RuntimeValue) -> Result<()> {
        match self.memory.get_mut(address.slot) {
            Some(MemorySlot::Scalar(slot)) => {
                *slot = value;
                Ok(())
            }
            Some(MemorySlot::Array(values)) => {
                if let RuntimeValue::ArrayLiteral(elements) = value {
                    for (index, element) in elements.into_iter().enumerate() {
                        if index < values.len() {
                            values[index] = element;
                        }
                    }
                    return Ok(());
                }
                match values.get_mut(address.offset) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(anyhow!(
                        "array write out of bounds at offset {}",
                        address.offset
                    )),
                }
            }
            None => Err(anyhow!("dangling pointer to slot {}", address.slot)),
        }
    }

    fn as_integer(value: RuntimeValue) -> Result<i64> {
        match value {
            RuntimeValue::Integer(value) => Ok(value),
            RuntimeValue::Boolean(value) => Ok(value as i64),
            RuntimeValue::Character(value) => Ok(value as i64),
            RuntimeValue::Float(value) => Ok(value as i64),
            other => Err(anyhow!("expected an integer, found {:?}", other)),
        }
    }

    fn as_float(value: RuntimeValue) -> Result<f64> {
        match value {
            RuntimeValue::Float(value) => Ok(value),
            RuntimeValue::Integer(value) => Ok(value as f64),
            RuntimeValue::Boolean(value) => Ok(value as i64 as f64),
            other => Err(anyhow!("expected a float, found {:?}", other)),
        }
    }

    fn apply_binary(op: BinaryOp, lhs: RuntimeValue, rhs: RuntimeValue) -> Result<RuntimeValue> {
        match op {
            BinaryOp::Add => Ok(RuntimeValue::Integer(
                Self::as_integer(lhs)? + Self::as_integer(rhs)?,
            )),
            BinaryOp::Sub => Ok(RuntimeValue::Integer(
                Self::as_integer(lhs)? - Self::as_integer(rhs)?,
            )),
            BinaryOp::Mul => Ok(RuntimeValue::Integer(
                Self::as_integer(lhs)? * Self::as_integer(rhs)?,
            )),
            BinaryOp::ExactSDiv => {
                let divisor = Self::as_integer(rhs)?;
                if divisor == 0 {
                    bail!("division by zero");
                }
                Ok(RuntimeValue::Integer(Self::as_integer(lhs)? / divisor))
            }
            BinaryOp::SRem => {
                let divisor = Self::as_integer(rhs)?;
                if divisor == 0 {
                    bail!("division by zero");
                }
                Ok(RuntimeValue::Integer(Self::as_integer(lhs)? % divisor))
            }
            BinaryOp::FAdd => Ok(RuntimeValue::Float(
                Self::as_float(lhs)? + Self::as_float(rhs)?,
            )),
            BinaryOp::FSub => Ok(RuntimeValue::Float(
                Self::as_float(lhs)? - Self::as_float(rhs)?,
            )),
            BinaryOp::FMul => Ok(RuntimeValue::Float(
                Self::as_float(lhs)? * Self::as_float(rhs)?,
            )),
            BinaryOp::FDiv => Ok(RuntimeValue::Float(
                Self::as_float(lhs)? / Self::as_float(rhs)?,
            )),
        }
    }

    fn apply_compare(
        predicate: ComparePredicate,
        lhs: RuntimeValue,
        rhs: RuntimeValue,
    ) -> Result<bool> {
        if predicate.is_float() {
            let lhs = Self::as_float(lhs)?;
            let rhs = Self::as_float(rhs)?;
            Ok(match predicate {
                ComparePredicate::FEq => lhs == rhs,
                ComparePredicate::FNe => lhs != rhs,
                ComparePredicate::FLt => lhs < rhs,
                ComparePredicate::FLe => lhs <= rhs,
                ComparePredicate::FGt => lhs > rhs,
                ComparePredicate::FGe => lhs >= rhs,
                _ => unreachable!(),
            })
        } else {
            let lhs = Self::as_integer(lhs)?;
            let rhs = Self::as_integer(rhs)?;
            Ok(match predicate {
                ComparePredicate::Eq => lhs == rhs,
                ComparePredicate::Ne => lhs != rhs,
                ComparePredicate::Slt => lhs < rhs,
                ComparePredicate::Sle => lhs <= rhs,
                ComparePredicate::Sgt => lhs > rhs,
                ComparePredicate::Sge => lhs >= rhs,
                _ => unreachable!(),
            })
        }
    }
}

/// External function emulation.
impl ExecutionEngine {
    fn call_printf(&mut self, arguments: &[IrValue]) -> Result<i64> {
        let format = match arguments.first() {
            Some(first) => match self.evaluate(*first)? {
                RuntimeValue::Str(format) => format,
                other => bail!("printf format is not a string: {:?}", other),
            },
            None => bail!("printf called without a format string"),
        };

        let mut rendered = String::new();
        let mut next_argument = 1;
        let mut characters = format.chars();
        while let Some(character) = characters.next() {
            if character != '%' {
                rendered.push(character);
                continue;
            }
            match characters.next() {
                Some('%') => rendered.push('%'),
                Some('d') => {
                    let value = self.printf_argument(arguments, &mut next_argument)?;
                    rendered.push_str(&Self::as_integer(value)?.to_string());
                }
                Some('f') => {
                    let value = self.printf_argument(arguments, &mut next_argument)?;
                    rendered.push_str(&format!("{:.6}", Self::as_float(value)?));
                }
                Some('c') => {
                    let value = self.printf_argument(arguments, &mut next_argument)?;
                    match value {
                        RuntimeValue::Character(c) => rendered.push(c),
                        other => rendered.push(Self::as_integer(other)? as u8 as char),
                    }
                }
                Some('s') => {
                    let value = self.printf_argument(arguments, &mut next_argument)?;
                    match value {
                        RuntimeValue::Str(text) => rendered.push_str(&text),
                        other => bail!("printf %s argument is not a string: {:?}", other),
                    }
                }
                Some(unknown) => bail!("unsupported printf directive %{}", unknown),
                None => bail!("dangling % at the end of a printf format"),
            }
        }

        let written = rendered.len() as i64;
        let mut output = self.output.borrow_mut();
        output.write_all(rendered.as_bytes())?;
        output.flush()?;
        Ok(written)
    }

    fn printf_argument(
        &self,
        arguments: &[IrValue],
        next_argument: &mut usize,
    ) -> Result<RuntimeValue> {
        let handle = arguments
            .get(*next_argument)
            .ok_or_else(|| anyhow!("printf format references a missing argument"))?;
        *next_argument += 1;
        self.evaluate(*handle)
    }

    fn call_scanf(&mut self, arguments: &[IrValue]) -> Result<i64> {
        let format = match arguments.first() {
            Some(first) => match self.evaluate(*first)? {
                RuntimeValue::Str(format) => format,
                other => bail!("scanf format is not a string: {:?}", other),
            },
            None => bail!("scanf called without a format string"),
        };

        let mut assigned = 0;
        let mut next_argument = 1;
        let mut characters = format.chars();
        while let Some(character) = characters.next() {
            if character != '%' {
                continue;
            }
            let directive = characters
                .next()
                .ok_or_else(|| anyhow!("dangling % at the end of a scanf format"))?;
            let word = match self.next_input_word()? {
                Some(word) => word,
                None => break,
            };
            let value = match directive {
                'd' => RuntimeValue::Integer(
                    word.parse()
                        .map_err(|_| anyhow!("\"{}\" is not an integer", word))?,
                ),
                'f' => RuntimeValue::Float(
                    word.parse()
                        .map_err(|_| anyhow!("\"{}\" is not a float", word))?,
                ),
                'c' => RuntimeValue::Character(
                    word.chars()
                        .next()
                        .ok_or_else(|| anyhow!("empty character input"))?,
                ),
                's' => RuntimeValue::Str(word),
                unknown => bail!("unsupported scanf directive %{}", unknown),
            };
            let pointer = arguments
                .get(next_argument)
                .ok_or_else(|| anyhow!("scanf format references a missing argument"))?;
            next_argument += 1;
            let address = self.evaluate_pointer(*pointer)?;
            self.write_address(address, value)?;
            assigned += 1;
        }
        Ok(assigned)
    }

    /// Whitespace-delimited input word, buffered a line at a time.
    fn next_input_word(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(word) = self.pending_input.pop_front() {
                return Ok(Some(word));
            }
            let mut line = String::new();
            let read = self.input.borrow_mut().read_line(&mut line)?;
            if read == 0 {
                return Ok(None);
            }
            self.pending_input
                .extend(line.split_whitespace().map(String::from));
        }
    }

    fn call_memcpy(&mut self, arguments: &[IrValue]) -> Result<i64> {
        if arguments.len() < 2 {
            bail!("memcpy requires destination and source arguments");
        }
        let destination = self.evaluate_pointer(arguments[0])?;
        let source = self.evaluate(arguments[1])?;
        let elements = match source {
            RuntimeValue::ArrayLiteral(elements) => elements,
            RuntimeValue::Pointer(address) => match self.memory.get(address.slot) {
                Some(MemorySlot::Array(values)) => values.clone(),
                _ => bail!("memcpy source is not an array"),
            },
            other => bail!("memcpy source is not an array: {:?}", other),
        };
        self.write_address(destination, RuntimeValue::ArrayLiteral(elements))?;
        Ok(0)
    }
}
