use std::fmt;

/// Handle to a value inside an IrModule: a constant, a global or the result
/// of an instruction. Handles stay valid for the lifetime of the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IrValue(pub(crate) usize);

/// Handle to a basic block inside an IrModule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub(crate) usize);

/// Handle to an external function prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrototypeId(pub(crate) usize);

/// Primitive and aggregate IR types.
#[derive(Debug, Clone, PartialEq)]
pub enum IrType {
    Integer32,
    Float64,
    Boolean,
    Character,
    Pointer(Box<IrType>),
    Array(Box<IrType>, usize),
    Void,
}

impl IrType {
    pub fn pointer_to(self) -> IrType {
        IrType::Pointer(Box::new(self))
    }

    pub fn element_type(&self) -> Option<&IrType> {
        match self {
            IrType::Pointer(inner) | IrType::Array(inner, _) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Integer32 => write!(f, "i32"),
            IrType::Float64 => write!(f, "double"),
            IrType::Boolean => write!(f, "i1"),
            IrType::Character => write!(f, "i8"),
            IrType::Pointer(inner) => write!(f, "{}*", inner),
            IrType::Array(inner, length) => write!(f, "[{} x {}]", length, inner),
            IrType::Void => write!(f, "void"),
        }
    }
}

/// What a value handle stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    ConstantInteger(i64),
    ConstantFloat(f64),
    ConstantBoolean(bool),
    ConstantCharacter(char),
    /// Escape-decoded contents of a global string.
    GlobalString(String),
    /// Element constants of a global array literal.
    GlobalArray(Vec<IrValue>),
    /// Result of an instruction inside some block.
    Instruction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueData {
    pub ty: IrType,
    pub name: String,
    pub kind: ValueKind,
}

/// Integer and float arithmetic variants are separate instructions, the way
/// the IR of the emitted module distinguishes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    FAdd,
    Sub,
    FSub,
    Mul,
    FMul,
    ExactSDiv,
    FDiv,
    SRem,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinaryOp::Add => "add",
            BinaryOp::FAdd => "fadd",
            BinaryOp::Sub => "sub",
            BinaryOp::FSub => "fsub",
            BinaryOp::Mul => "mul",
            BinaryOp::FMul => "fmul",
            BinaryOp::ExactSDiv => "sdiv exact",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::SRem => "srem",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparePredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    FEq,
    FNe,
    FLt,
    FLe,
    FGt,
    FGe,
}

impl ComparePredicate {
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            ComparePredicate::FEq
                | ComparePredicate::FNe
                | ComparePredicate::FLt
                | ComparePredicate::FLe
                | ComparePredicate::FGt
                | ComparePredicate::FGe
        )
    }
}

impl fmt::Display for ComparePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ComparePredicate::Eq => "icmp eq",
            ComparePredicate::Ne => "icmp ne",
            ComparePredicate::Slt => "icmp slt",
            ComparePredicate::Sle => "icmp sle",
            ComparePredicate::Sgt => "icmp sgt",
            ComparePredicate::Sge => "icmp sge",
            ComparePredicate::FEq => "fcmp oeq",
            ComparePredicate::FNe => "fcmp une",
            ComparePredicate::FLt => "fcmp olt",
            ComparePredicate::FLe => "fcmp ole",
            ComparePredicate::FGt => "fcmp ogt",
            ComparePredicate::FGe => "fcmp oge",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Alloca {
        result: IrValue,
        allocated: IrType,
    },
    Store {
        value: IrValue,
        pointer: IrValue,
    },
    Load {
        result: IrValue,
        pointer: IrValue,
    },
    BinaryOperation {
        result: IrValue,
        op: BinaryOp,
        lhs: IrValue,
        rhs: IrValue,
    },
    Compare {
        result: IrValue,
        predicate: ComparePredicate,
        lhs: IrValue,
        rhs: IrValue,
    },
    SignedToFloat {
        result: IrValue,
        value: IrValue,
    },
    FloatToSigned {
        result: IrValue,
        value: IrValue,
    },
    Bitcast {
        result: IrValue,
        value: IrValue,
        target: IrType,
    },
    GetElementPointer {
        result: IrValue,
        pointer: IrValue,
        indices: Vec<IrValue>,
    },
    Call {
        result: Option<IrValue>,
        prototype: PrototypeId,
        arguments: Vec<IrValue>,
    },
    Branch {
        target: BlockId,
    },
    ConditionalBranch {
        condition: IrValue,
        on_true: BlockId,
        on_false: BlockId,
    },
    Return {
        value: Option<IrValue>,
    },
}

impl Instruction {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Branch { .. }
                | Instruction::ConditionalBranch { .. }
                | Instruction::Return { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub name: String,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn is_terminated(&self) -> bool {
        self.instructions
            .last()
            .map(Instruction::is_terminator)
            .unwrap_or(false)
    }
}

/// External function prototype, declared once and cached by the handlers
/// that call it.
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
    pub name: String,
    pub return_type: IrType,
    pub parameter_types: Vec<IrType>,
    pub is_var_arg: bool,
}

/// A single-function module: globals, external prototypes and the basic
/// blocks of `main`. Blocks and values are addressed by index handles.
#[derive(Debug, Clone, PartialEq)]
pub struct IrModule {
    pub name: String,
    values: Vec<ValueData>,
    prototypes: Vec<Prototype>,
    blocks: Vec<BasicBlock>,
    entry: BlockId,
}

impl IrModule {
    pub fn new(name: &str) -> Self {
        let mut module = IrModule {
            name: String::from(name),
            values: vec![],
            prototypes: vec![],
            blocks: vec![],
            entry: BlockId(0),
        };
        module.entry = module.add_block("entry");
        module
    }

    pub fn entry_block(&self) -> BlockId {
        self.entry
    }

    pub fn add_value(&mut self, data: ValueData) -> IrValue {
        self.values.push(data);
        IrValue(self.values.len() - 1)
    }

    pub fn value(&self, handle: IrValue) -> &ValueData {
        &self.values[handle.0]
    }

    pub fn add_block(&mut self, name: &str) -> BlockId {
        let unique_name = if self.blocks.iter().any(|block| block.name == name) {
            format!("{}{}", name, self.blocks.len())
        } else {
            String::from(name)
        };
        self.blocks.push(BasicBlock {
            name: unique_name,
            instructions: vec![],
        });
        BlockId(self.blocks.len() - 1)
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0]
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn add_prototype(&mut self, prototype: Prototype) -> PrototypeId {
        self.prototypes.push(prototype);
        PrototypeId(self.prototypes.len() - 1)
    }

    pub fn prototype(&self, id: PrototypeId) -> &Prototype {
        &self.prototypes[id.0]
    }

    pub fn find_prototype(&self, name: &str) -> Option<PrototypeId> {
        self.prototypes
            .iter()
            .position(|prototype| prototype.name == name)
            .map(PrototypeId)
    }

    /// Blocks that are missing a terminator, by name. An accepted parse must
    /// leave this empty.
    pub fn unterminated_blocks(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter(|block| !block.is_terminated())
            .map(|block| block.name.as_str())
            .collect()
    }
}

/// Rendering of operands: constants print inline, instruction results print
/// as named registers.
impl IrModule {
    fn operand_text(&self, handle: IrValue) -> String {
        let data = self.value(handle);
        match &data.kind {
            ValueKind::ConstantInteger(value) => value.to_string(),
            ValueKind::ConstantFloat(value) => format!("{:.6}", value),
            ValueKind::ConstantBoolean(value) => String::from(if *value { "true" } else { "false" }),
            ValueKind::ConstantCharacter(value) => (*value as u32).to_string(),
            ValueKind::GlobalString(_) | ValueKind::GlobalArray(_) => {
                format!("@{}", self.global_name(handle))
            }
            ValueKind::Instruction => format!("%{}", self.register_name(handle)),
        }
    }

    fn typed_operand_text(&self, handle: IrValue) -> String {
        format!("{} {}", self.value(handle).ty, self.operand_text(handle))
    }

    fn register_name(&self, handle: IrValue) -> String {
        let data = self.value(handle);
        if data.name.is_empty() {
            format!("tmp{}", handle.0)
        } else {
            data.name.replace(' ', "_")
        }
    }

    fn global_name(&self, handle: IrValue) -> String {
        let data = self.value(handle);
        if data.name.is_empty() {
            format!("global{}", handle.0)
        } else {
            data.name.clone()
        }
    }

    fn instruction_text(&self, instruction: &Instruction) -> String {
        match instruction {
            Instruction::Alloca { result, allocated } => format!(
                "%{} = alloca {}",
                self.register_name(*result),
                allocated
            ),
            Instruction::Store { value, pointer } => format!(
                "store {}, {}",
                self.typed_operand_text(*value),
                self.typed_operand_text(*pointer)
            ),
            Instruction::Load { result, pointer } => format!(
                "%{} = load {}, {}",
                self.register_name(*result),
                self.value(*result).ty,
                self.typed_operand_text(*pointer)
            ),
            Instruction::BinaryOperation { result, op, lhs, rhs } => format!(
                "%{} = {} {} {}, {}",
                self.register_name(*result),
                op,
                self.value(*lhs).ty,
                self.operand_text(*lhs),
                self.operand_text(*rhs)
            ),
            Instruction::Compare { result, predicate, lhs, rhs } => format!(
                "%{} = {} {} {}, {}",
                self.register_name(*result),
                predicate,
                self.value(*lhs).ty,
                self.operand_text(*lhs),
                self.operand_text(*rhs)
            ),
            Instruction::SignedToFloat { result, value } => format!(
                "%{} = sitofp {} to double",
                self.register_name(*result),
                self.typed_operand_text(*value)
            ),
            Instruction::FloatToSigned { result, value } => format!(
                "%{} = fptosi {} to i32",
                self.register_name(*result),
                self.typed_operand_text(*value)
            ),
            Instruction::Bitcast { result, value, target } => format!(
                "%{} = bitcast {} to {}",
                self.register_name(*result),
                self.typed_operand_text(*value),
                target
            ),
            Instruction::GetElementPointer { result, pointer, indices } => {
                let indices_text: Vec<String> = indices
                    .iter()
                    .map(|index| self.typed_operand_text(*index))
                    .collect();
                format!(
                    "%{} = getelementptr inbounds {}, {}",
                    self.register_name(*result),
                    self.typed_operand_text(*pointer),
                    indices_text.join(", ")
                )
            }
            Instruction::Call { result, prototype, arguments } => {
                let prototype = self.prototype(*prototype);
                let arguments_text: Vec<String> = arguments
                    .iter()
                    .map(|argument| self.typed_operand_text(*argument))
                    .collect();
                let call = format!(
                    "call {} @{}({})",
                    prototype.return_type,
                    prototype.name,
                    arguments_text.join(", ")
                );
                match result {
                    Some(result) => format!("%{} = {}", self.register_name(*result), call),
                    None => call,
                }
            }
            Instruction::Branch { target } => {
                format!("br label %{}", self.block(*target).name)
            }
            Instruction::ConditionalBranch { condition, on_true, on_false } => format!(
                "br {}, label %{}, label %{}",
                self.typed_operand_text(*condition),
                self.block(*on_true).name,
                self.block(*on_false).name
            ),
            Instruction::Return { value } => match value {
                Some(value) => format!("ret {}", self.typed_operand_text(*value)),
                None => String::from("ret void"),
            },
        }
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;

        for (index, data) in self.values.iter().enumerate() {
            match &data.kind {
                ValueKind::GlobalString(contents) => {
                    writeln!(
                        f,
                        "@{} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
                        self.global_name(IrValue(index)),
                        contents.len() + 1,
                        contents.escape_default()
                    )?;
                }
                ValueKind::GlobalArray(elements) => {
                    let elements_text: Vec<String> = elements
                        .iter()
                        .map(|element| self.typed_operand_text(*element))
                        .collect();
                    writeln!(
                        f,
                        "@{} = private unnamed_addr constant {} [{}]",
                        self.global_name(IrValue(index)),
                        data.ty,
                        elements_text.join(", ")
                    )?;
                }
                _ => {}
            }
        }

        for prototype in &self.prototypes {
            let parameters: Vec<String> = prototype
                .parameter_types
                .iter()
                .map(|ty| ty.to_string())
                .collect();
            let variadic = if prototype.is_var_arg {
                if parameters.is_empty() { "..." } else { ", ..." }
            } else {
                ""
            };
            writeln!(
                f,
                "declare {} @{}({}{})",
                prototype.return_type,
                prototype.name,
                parameters.join(", "),
                variadic
            )?;
        }

        writeln!(f, "define i32 @main() {{")?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.name)?;
            for instruction in &block.instructions {
                writeln!(f, "  {}", self.instruction_text(instruction))?;
            }
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_block_exists_from_construction() {
        let module = IrModule::new("remora");
        assert_eq!(module.block(module.entry_block()).name, "entry");
        assert!(!module.block(module.entry_block()).is_terminated());
    }

    #[test]
    fn block_names_are_unique() {
        let mut module = IrModule::new("remora");
        let first = module.add_block("block_true");
        let second = module.add_block("block_true");
        assert_ne!(module.block(first).name, module.block(second).name);
    }

    #[test]
    fn unterminated_blocks_are_reported() {
        let mut module = IrModule::new("remora");
        let extra = module.add_block("block_true");
        module.block_mut(extra).instructions.push(Instruction::Return { value: None });
        assert_eq!(module.unterminated_blocks(), vec!["entry"]);
    }

    #[test]
    fn prototypes_are_found_by_name() {
        let mut module = IrModule::new("remora");
        let id = module.add_prototype(Prototype {
            name: String::from("printf"),
            return_type: IrType::Integer32,
            parameter_types: vec![IrType::Character.pointer_to()],
            is_var_arg: true,
        });
        assert_eq!(module.find_prototype("printf"), Some(id));
        assert_eq!(module.find_prototype("scanf"), None);
    }
}
