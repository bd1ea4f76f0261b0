// Internal Modules
mod compiler;

// Library surface
pub use compiler::backend::{ExecutionEngine, IrBuilder, IrModule, IrType, IrValue};
pub use compiler::diagnostics::Diagnostics;
pub use compiler::lexer::token::{Token, TokenInformation, TokenPosition};
pub use compiler::lexer::{RemoraLexer, TokenSource};
pub use compiler::parser::{ActionRegistry, LlDriver, ParseOutcome};
pub use compiler::table::{LlTable, LlTableTextParser, TableRow};
pub use compiler::LlParser;
