mod ast;
pub mod backend;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
mod semantic_analyser;
pub mod table;

use std::cell::RefCell;
use std::error::Error;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::rc::Rc;

// Interface Definitions
use self::diagnostics::Diagnostics;
use self::lexer::RemoraLexer;
use self::parser::{ActionRegistry, LlDriver, ParseOutcome};
use self::table::{LlTable, LlTableTextParser};

/// LlParser owns a loaded LL control table and validates source files
/// against it. A successful validation is much more than a yes: while the
/// driver walks the table it builds the AST, resolves and type-checks every
/// name, folds constant arithmetic and emits a typed IR module, which is
/// then printed and handed to the execution engine to run.
///
/// # Validation Diagram
/// remora_code -> RemoraLexer -> LlDriver (table + semantic actions)
///             -> IrModule -> ExecutionEngine
pub struct LlParser {
    table: LlTable,
    registry: ActionRegistry,
    diagnostics: Diagnostics,
    dump_ir: bool,
    execute: bool,
    program_output: Rc<RefCell<dyn Write>>,
    program_input: Rc<RefCell<dyn BufRead>>,
}

impl LlParser {
    /// Create a parser over an already built control table.
    pub fn new(table: LlTable) -> Self {
        LlParser {
            table,
            registry: ActionRegistry::new(),
            diagnostics: Diagnostics::new(),
            dump_ir: true,
            execute: true,
            program_output: Rc::new(RefCell::new(io::stdout())),
            program_input: Rc::new(RefCell::new(io::BufReader::new(io::stdin()))),
        }
    }

    /// Create a parser from a `.llt` table file.
    pub fn from_table_file(table_path: &Path) -> Result<Self, Box<dyn Error>> {
        let table_text = fs::read_to_string(table_path)?;
        let table = LlTableTextParser::new().parse_str(&table_text)?;
        Ok(Self::new(table))
    }

    /// Extend the set of action names that resolve as no-ops, typically
    /// with the synthesis combination names of the loaded table's grammar.
    pub fn with_ignored_actions(mut self, names: &[&str]) -> Self {
        self.registry = self.registry.with_extra_ignored(names);
        self
    }

    pub fn with_ir_dump(mut self, dump_ir: bool) -> Self {
        self.dump_ir = dump_ir;
        self
    }

    pub fn with_execution(mut self, execute: bool) -> Self {
        self.execute = execute;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_program_output(mut self, output: Rc<RefCell<dyn Write>>) -> Self {
        self.program_output = output;
        self
    }

    pub fn with_program_input(mut self, input: Rc<RefCell<dyn BufRead>>) -> Self {
        self.program_input = input;
        self
    }

    /// Validate a source string. On acceptance the emitted module has been
    /// printed (when enabled) and run; on failure the outcome carries the
    /// failing token index and, for syntax errors, the expected token set.
    pub fn is_valid(&self, source: &str) -> ParseOutcome {
        let lexer = match RemoraLexer::new(source) {
            Ok(lexer) => lexer,
            Err(why) => {
                self.diagnostics.error(&why);
                return ParseOutcome {
                    accepted: false,
                    tokens: vec![],
                    fail_index: None,
                    expected_tokens: Default::default(),
                    module: None,
                    ast_stack_depth: 0,
                    scope_depth: 1,
                    call_stack_depth: 0,
                };
            }
        };

        LlDriver::new(
            self.table.clone(),
            self.registry.clone(),
            Box::new(lexer),
            self.diagnostics.clone(),
        )
        .with_ir_dump(self.dump_ir)
        .with_execution(self.execute)
        .with_program_output(self.program_output.clone())
        .with_program_input(self.program_input.clone())
        .run()
    }

    /// Validate a source file.
    /// @return: ParseOutcome if Ok. Otherwise IO Error from a failed read.
    pub fn is_valid_file(&self, source_path: &Path) -> Result<ParseOutcome, io::Error> {
        let source = fs::read_to_string(source_path)?;
        Ok(self.is_valid(&source))
    }
}
