use super::ir::{
    BasicBlock, BinaryOp, BlockId, ComparePredicate, Instruction, IrModule, IrType, IrValue,
    Prototype, PrototypeId, ValueData, ValueKind,
};
use crate::compiler::semantic_analyser::datatype;

/// IrBuilder appends typed instructions to the basic block selected as the
/// insertion point. Arithmetic helpers pick the integer or float instruction
/// variant from a core type name and widen or narrow operands as required,
/// so the semantic actions never deal with instruction selection directly.
pub struct IrBuilder {
    module: IrModule,
    insertion_point: BlockId,
}

impl IrBuilder {
    pub fn new(module_name: &str) -> Self {
        let module = IrModule::new(module_name);
        let insertion_point = module.entry_block();
        IrBuilder {
            module,
            insertion_point,
        }
    }

    pub fn module(&self) -> &IrModule {
        &self.module
    }

    /// Consume the builder and hand over the finished module.
    pub fn into_module(self) -> IrModule {
        self.module
    }

    pub fn insertion_block(&self) -> BlockId {
        self.insertion_point
    }

    pub fn set_insertion_point(&mut self, block: BlockId) {
        self.insertion_point = block;
    }

    pub fn create_basic_block(&mut self, name: &str) -> BlockId {
        self.module.add_block(name)
    }

    pub fn current_block(&self) -> &BasicBlock {
        self.module.block(self.insertion_point)
    }

    fn push_instruction(&mut self, instruction: Instruction) {
        self.module
            .block_mut(self.insertion_point)
            .instructions
            .push(instruction);
    }

    fn new_result(&mut self, ty: IrType, name: &str) -> IrValue {
        self.module.add_value(ValueData {
            ty,
            name: String::from(name),
            kind: ValueKind::Instruction,
        })
    }

    pub fn value_type(&self, value: IrValue) -> IrType {
        self.module.value(value).ty.clone()
    }
}

/// Type and constant construction.
impl IrBuilder {
    /// Build the IR type for a core type name, wrapped into an array type
    /// when an array size is given.
    pub fn create_type(
        &self,
        type_name: &str,
        array_size: Option<u32>,
    ) -> Result<IrType, String> {
        let element_type = match type_name {
            datatype::INTEGER => IrType::Integer32,
            datatype::FLOAT => IrType::Float64,
            datatype::CHARACTER => IrType::Character,
            datatype::BOOLEAN => IrType::Character,
            datatype::VOID => IrType::Void,
            datatype::STRING => IrType::Character.pointer_to(),
            unsupported => {
                return Err(format!("Unsupported type \"{}\"", unsupported));
            }
        };
        match array_size {
            None => Ok(element_type),
            Some(size) => Ok(IrType::Array(Box::new(element_type), size as usize)),
        }
    }

    /// Build the constant for a literal lexeme of a given core type.
    pub fn create_constant(&mut self, type_name: &str, value: &str) -> Result<IrValue, String> {
        match type_name {
            datatype::INTEGER => {
                let parsed = value
                    .parse()
                    .map_err(|_| format!("\"{}\" is not an integer literal", value))?;
                Ok(self.create_integer_constant(parsed))
            }
            datatype::FLOAT => {
                let parsed = value
                    .parse()
                    .map_err(|_| format!("\"{}\" is not a float literal", value))?;
                Ok(self.create_float_constant(parsed))
            }
            datatype::BOOLEAN => self.create_boolean_constant_from_text(value),
            datatype::CHARACTER => {
                let character = value.chars().nth(1).ok_or_else(|| {
                    format!("\"{}\" is not a character literal", value)
                })?;
                Ok(self.create_character_constant(character))
            }
            unsupported => Err(format!("Unsupported type \"{}\"", unsupported)),
        }
    }

    pub fn create_integer_constant(&mut self, value: i64) -> IrValue {
        self.module.add_value(ValueData {
            ty: IrType::Integer32,
            name: String::new(),
            kind: ValueKind::ConstantInteger(value),
        })
    }

    pub fn create_float_constant(&mut self, value: f64) -> IrValue {
        self.module.add_value(ValueData {
            ty: IrType::Float64,
            name: String::new(),
            kind: ValueKind::ConstantFloat(value),
        })
    }

    pub fn create_boolean_constant(&mut self, value: bool) -> IrValue {
        self.module.add_value(ValueData {
            ty: IrType::Boolean,
            name: String::new(),
            kind: ValueKind::ConstantBoolean(value),
        })
    }

    /// Boolean literals only exist in the spellings "True" and "False".
    pub fn create_boolean_constant_from_text(&mut self, value: &str) -> Result<IrValue, String> {
        match value {
            "True" => Ok(self.create_boolean_constant(true)),
            "False" => Ok(self.create_boolean_constant(false)),
            other => Err(format!(
                "\"{}\" is not boolean literal, possible values: \"True\", \"False\"",
                other
            )),
        }
    }

    pub fn create_character_constant(&mut self, value: char) -> IrValue {
        self.module.add_value(ValueData {
            ty: IrType::Character,
            name: String::new(),
            kind: ValueKind::ConstantCharacter(value),
        })
    }

    /// Global string with already escape-decoded contents; the handle is a
    /// pointer to the first character.
    pub fn create_global_string_pointer(&mut self, contents: &str, name: &str) -> IrValue {
        self.module.add_value(ValueData {
            ty: IrType::Character.pointer_to(),
            name: String::from(name),
            kind: ValueKind::GlobalString(String::from(contents)),
        })
    }

    /// Global unnamed-addr private constant array from element constants.
    pub fn create_global_array(
        &mut self,
        element_type: IrType,
        elements: Vec<IrValue>,
        name: &str,
    ) -> IrValue {
        let length = elements.len();
        self.module.add_value(ValueData {
            ty: IrType::Array(Box::new(element_type), length),
            name: String::from(name),
            kind: ValueKind::GlobalArray(elements),
        })
    }
}

/// Memory and control flow.
impl IrBuilder {
    pub fn create_alloca(&mut self, allocated: IrType, name: &str) -> IrValue {
        let result = self.new_result(allocated.clone().pointer_to(), name);
        self.push_instruction(Instruction::Alloca { result, allocated });
        result
    }

    pub fn create_store(&mut self, value: IrValue, pointer: IrValue) {
        self.push_instruction(Instruction::Store { value, pointer });
    }

    pub fn create_load(&mut self, pointer: IrValue, name: &str) -> IrValue {
        let loaded_type = match self.value_type(pointer) {
            IrType::Pointer(inner) => *inner,
            other => other,
        };
        let result = self.new_result(loaded_type, name);
        self.push_instruction(Instruction::Load { result, pointer });
        result
    }

    pub fn create_br(&mut self, target: BlockId) {
        self.push_instruction(Instruction::Branch { target });
    }

    pub fn create_cond_br(&mut self, condition: IrValue, on_true: BlockId, on_false: BlockId) {
        self.push_instruction(Instruction::ConditionalBranch {
            condition,
            on_true,
            on_false,
        });
    }

    pub fn create_ret(&mut self, value: Option<IrValue>) {
        self.push_instruction(Instruction::Return { value });
    }

    pub fn create_in_bounds_gep(
        &mut self,
        pointer: IrValue,
        indices: Vec<IrValue>,
        name: &str,
    ) -> IrValue {
        let element_type = match self.value_type(pointer) {
            IrType::Pointer(inner) => match *inner {
                IrType::Array(element, _) => *element,
                other => other,
            },
            other => other,
        };
        let result = self.new_result(element_type.pointer_to(), name);
        self.push_instruction(Instruction::GetElementPointer {
            result,
            pointer,
            indices,
        });
        result
    }

    pub fn create_bitcast(&mut self, value: IrValue, target: IrType, name: &str) -> IrValue {
        let result = self.new_result(target.clone(), name);
        self.push_instruction(Instruction::Bitcast {
            result,
            value,
            target,
        });
        result
    }

    pub fn declare_external(
        &mut self,
        name: &str,
        return_type: IrType,
        parameter_types: Vec<IrType>,
        is_var_arg: bool,
    ) -> PrototypeId {
        if let Some(existing) = self.module.find_prototype(name) {
            return existing;
        }
        self.module.add_prototype(Prototype {
            name: String::from(name),
            return_type,
            parameter_types,
            is_var_arg,
        })
    }

    pub fn create_call(
        &mut self,
        prototype: PrototypeId,
        arguments: Vec<IrValue>,
        name: &str,
    ) -> Option<IrValue> {
        let return_type = self.module.prototype(prototype).return_type.clone();
        let result = match return_type {
            IrType::Void => None,
            other => Some(self.new_result(other, name)),
        };
        self.push_instruction(Instruction::Call {
            result,
            prototype,
            arguments,
        });
        result
    }
}

/// Arithmetic with integer/float instruction selection, mirroring how the
/// emitted module distinguishes the two families.
impl IrBuilder {
    /// Widen a signed integer value to double. Values that are already
    /// floating point pass through untouched.
    pub fn convert_to_float(&mut self, value: IrValue) -> IrValue {
        if self.value_type(value) == IrType::Float64 {
            return value;
        }
        let result = self.new_result(IrType::Float64, "conversion_to_float");
        self.push_instruction(Instruction::SignedToFloat { result, value });
        result
    }

    /// Narrow a double to a signed 32-bit integer. Integer values pass
    /// through untouched.
    pub fn convert_to_integer(&mut self, value: IrValue) -> IrValue {
        if self.value_type(value) != IrType::Float64 {
            return value;
        }
        let result = self.new_result(IrType::Integer32, "conversion_to_integer");
        self.push_instruction(Instruction::FloatToSigned { result, value });
        result
    }

    fn create_binary(
        &mut self,
        op: BinaryOp,
        ty: IrType,
        lhs: IrValue,
        rhs: IrValue,
        name: &str,
    ) -> IrValue {
        let result = self.new_result(ty, name);
        self.push_instruction(Instruction::BinaryOperation {
            result,
            op,
            lhs,
            rhs,
        });
        result
    }

    pub fn create_add(
        &mut self,
        type_name: &str,
        lhs: IrValue,
        rhs: IrValue,
        name: &str,
    ) -> Result<IrValue, String> {
        match type_name {
            datatype::INTEGER => Ok(self.create_binary(BinaryOp::Add, IrType::Integer32, lhs, rhs, name)),
            datatype::FLOAT => {
                let lhs = self.convert_to_float(lhs);
                let rhs = self.convert_to_float(rhs);
                Ok(self.create_binary(BinaryOp::FAdd, IrType::Float64, lhs, rhs, name))
            }
            unsupported => Err(format!("Unsupported type \"{}\"", unsupported)),
        }
    }

    pub fn create_sub(
        &mut self,
        type_name: &str,
        lhs: IrValue,
        rhs: IrValue,
        name: &str,
    ) -> Result<IrValue, String> {
        match type_name {
            datatype::INTEGER => Ok(self.create_binary(BinaryOp::Sub, IrType::Integer32, lhs, rhs, name)),
            datatype::FLOAT => {
                let lhs = self.convert_to_float(lhs);
                let rhs = self.convert_to_float(rhs);
                Ok(self.create_binary(BinaryOp::FSub, IrType::Float64, lhs, rhs, name))
            }
            unsupported => Err(format!("Unsupported type \"{}\"", unsupported)),
        }
    }

    pub fn create_mul(
        &mut self,
        type_name: &str,
        lhs: IrValue,
        rhs: IrValue,
        name: &str,
    ) -> Result<IrValue, String> {
        match type_name {
            datatype::INTEGER => Ok(self.create_binary(BinaryOp::Mul, IrType::Integer32, lhs, rhs, name)),
            datatype::FLOAT => {
                let lhs = self.convert_to_float(lhs);
                let rhs = self.convert_to_float(rhs);
                Ok(self.create_binary(BinaryOp::FMul, IrType::Float64, lhs, rhs, name))
            }
            unsupported => Err(format!("Unsupported type \"{}\"", unsupported)),
        }
    }

    /// Regular division: always floating point, operands widened as needed.
    pub fn create_div(
        &mut self,
        type_name: &str,
        lhs: IrValue,
        rhs: IrValue,
        name: &str,
    ) -> Result<IrValue, String> {
        match type_name {
            datatype::FLOAT => {
                let lhs = self.convert_to_float(lhs);
                let rhs = self.convert_to_float(rhs);
                Ok(self.create_binary(BinaryOp::FDiv, IrType::Float64, lhs, rhs, name))
            }
            unsupported => Err(format!("Unsupported type \"{}\"", unsupported)),
        }
    }

    /// Integer division: operands narrowed to integers first.
    pub fn create_exact_sdiv(
        &mut self,
        type_name: &str,
        lhs: IrValue,
        rhs: IrValue,
        name: &str,
    ) -> Result<IrValue, String> {
        match type_name {
            datatype::INTEGER => {
                let lhs = self.convert_to_integer(lhs);
                let rhs = self.convert_to_integer(rhs);
                Ok(self.create_binary(BinaryOp::ExactSDiv, IrType::Integer32, lhs, rhs, name))
            }
            unsupported => Err(format!("Unsupported type \"{}\"", unsupported)),
        }
    }

    pub fn create_srem(
        &mut self,
        type_name: &str,
        lhs: IrValue,
        rhs: IrValue,
        name: &str,
    ) -> Result<IrValue, String> {
        match type_name {
            datatype::INTEGER => Ok(self.create_binary(BinaryOp::SRem, IrType::Integer32, lhs, rhs, name)),
            unsupported => Err(format!("Unsupported type \"{}\"", unsupported)),
        }
    }

    /// Comparison producing a boolean value. The integer predicate is given;
    /// float operands switch to the matching float predicate with widening.
    pub fn create_compare(
        &mut self,
        type_name: &str,
        predicate: ComparePredicate,
        lhs: IrValue,
        rhs: IrValue,
        name: &str,
    ) -> Result<IrValue, String> {
        let (predicate, lhs, rhs) = match type_name {
            datatype::INTEGER | datatype::BOOLEAN | datatype::CHARACTER => (predicate, lhs, rhs),
            datatype::FLOAT => {
                let float_predicate = match predicate {
                    ComparePredicate::Eq => ComparePredicate::FEq,
                    ComparePredicate::Ne => ComparePredicate::FNe,
                    ComparePredicate::Slt => ComparePredicate::FLt,
                    ComparePredicate::Sle => ComparePredicate::FLe,
                    ComparePredicate::Sgt => ComparePredicate::FGt,
                    ComparePredicate::Sge => ComparePredicate::FGe,
                    float_ready => float_ready,
                };
                (
                    float_predicate,
                    self.convert_to_float(lhs),
                    self.convert_to_float(rhs),
                )
            }
            unsupported => {
                return Err(format!("Unsupported type \"{}\"", unsupported));
            }
        };
        let result = self.new_result(IrType::Boolean, name);
        self.push_instruction(Instruction::Compare {
            result,
            predicate,
            lhs,
            rhs,
        });
        Ok(result)
    }
}
