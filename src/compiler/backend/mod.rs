mod execution_engine;
mod ir;
mod ir_builder;

#[cfg(test)]
mod test;

pub use self::execution_engine::ExecutionEngine;
pub use self::ir::{
    BasicBlock, BinaryOp, BlockId, ComparePredicate, Instruction, IrModule, IrType, IrValue,
    Prototype, PrototypeId, ValueKind,
};
pub use self::ir_builder::IrBuilder;
