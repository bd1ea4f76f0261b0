use std::cell::RefCell;
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use crate::compiler::ast::{AstNode, AstStack};
use crate::compiler::backend::{BlockId, ExecutionEngine, IrBuilder, IrModule, IrValue, PrototypeId};
use crate::compiler::diagnostics::Diagnostics;
use crate::compiler::lexer::token::{Token, TokenInformation};
use crate::compiler::lexer::TokenSource;
use crate::compiler::semantic_analyser::datatype;
use crate::compiler::semantic_analyser::{ScopeStack, SymbolTable};
use crate::compiler::table::{LlTable, TableRow};

use super::action_registry::ActionRegistry;

/// Result of driving a token stream through the control table.
#[derive(Debug)]
pub struct ParseOutcome {
    pub accepted: bool,
    /// Every token consumed from the lexer, comments included.
    pub tokens: Vec<TokenInformation>,
    /// 0-based index of the token the parse failed at.
    pub fail_index: Option<usize>,
    /// Union of the referencing sets of the error block a syntax error
    /// landed in. Empty for semantic and lexical failures.
    pub expected_tokens: BTreeSet<Token>,
    /// The emitted module, present on acceptance.
    pub module: Option<IrModule>,
    pub ast_stack_depth: usize,
    pub scope_depth: usize,
    pub call_stack_depth: usize,
}

/// The LL driver interleaves three things in one pass over the input:
/// navigation of the control table, construction of an AST on the working
/// stack, and execution of the named semantic actions that resolve names,
/// check types, fold constants and emit IR.
///
/// The table drives everything. A row whose referencing set matches the
/// current token (or that carries an action name) is active: it may shift
/// the token onto the AST stack as a leaf, call into a sub-table via the
/// row call stack, or pop back out, firing its action at the matching
/// dispatch point. The first inactive row of an error block reports the
/// expected-token union instead.
pub struct LlDriver {
    table: LlTable,
    registry: ActionRegistry,
    pub(super) diagnostics: Diagnostics,

    source: Box<dyn TokenSource>,
    tokens: Vec<TokenInformation>,
    pub(super) current: TokenInformation,
    pub(super) input_index: usize,

    row_id: u32,
    call_stack: Vec<u32>,

    pub(super) ast_stack: AstStack,
    pub(super) scopes: ScopeStack,
    pub(super) symbols: SymbolTable,
    pub(super) builder: IrBuilder,

    // Control-flow block bookkeeping, one stack per block role so that
    // nested statements unwind correctly.
    pub(super) pre_while_blocks: Vec<BlockId>,
    pub(super) while_blocks: Vec<BlockId>,
    pub(super) true_blocks: Vec<BlockId>,
    pub(super) false_blocks: Vec<BlockId>,
    pub(super) previous_blocks: Vec<BlockId>,

    // Lazily declared external prototypes.
    pub(super) printf_prototype: Option<PrototypeId>,
    pub(super) scanf_prototype: Option<PrototypeId>,
    pub(super) memcpy_prototype: Option<PrototypeId>,

    /// A failing handler may anchor the failure to the offending token
    /// instead of the driver's current input index.
    pub(super) fail_index_override: Option<usize>,

    dump_ir: bool,
    execute: bool,
    program_output: Rc<RefCell<dyn Write>>,
    program_input: Rc<RefCell<dyn BufRead>>,
}

impl LlDriver {
    pub fn new(
        table: LlTable,
        registry: ActionRegistry,
        source: Box<dyn TokenSource>,
        diagnostics: Diagnostics,
    ) -> Self {
        LlDriver {
            table,
            registry,
            diagnostics,
            source,
            tokens: vec![],
            current: TokenInformation::new(Token::EndOfFile, "", 0, 0),
            input_index: 0,
            row_id: 1,
            call_stack: vec![],
            ast_stack: AstStack::new(),
            scopes: ScopeStack::new(),
            symbols: SymbolTable::new(),
            builder: IrBuilder::new("remora"),
            pre_while_blocks: vec![],
            while_blocks: vec![],
            true_blocks: vec![],
            false_blocks: vec![],
            previous_blocks: vec![],
            printf_prototype: None,
            scanf_prototype: None,
            memcpy_prototype: None,
            fail_index_override: None,
            dump_ir: true,
            execute: true,
            program_output: Rc::new(RefCell::new(io::stdout())),
            program_input: Rc::new(RefCell::new(io::BufReader::new(io::stdin()))),
        }
    }

    pub fn with_ir_dump(mut self, dump_ir: bool) -> Self {
        self.dump_ir = dump_ir;
        self
    }

    pub fn with_execution(mut self, execute: bool) -> Self {
        self.execute = execute;
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

    /// Drive the whole input. Consumes the driver; all per-parse state dies
    /// with it apart from what the outcome reports.
    pub fn run(mut self) -> ParseOutcome {
        if !self.advance_token() {
            return self.fail(None);
        }

        loop {
            let row = match self.table.get_row(self.row_id) {
                Some(row) => row.clone(),
                None => return self.fail(None),
            };

            if !self.dispatch_action(&row.action_name) {
                return self.fail_semantic();
            }

            if self.current.token == Token::Comment {
                if !self.advance_token() {
                    return self.fail(None);
                }
                continue;
            }

            let active = row.referencing_set.contains(&self.current.token)
                || !row.action_name.is_empty();

            if active {
                if row.is_end && self.call_stack.is_empty() {
                    self.push_leaf();
                    if !self.dispatch_ast_action(&row.action_name) {
                        return self.fail_semantic();
                    }
                    return self.accept();
                }
                if row.do_shift {
                    self.push_leaf();
                    if !self.advance_token() {
                        let input_index = self.input_index;
                        return self.fail(Some(input_index));
                    }
                } else if row.push_id != 0 {
                    self.call_stack.push(row.push_id);
                }
                if row.next_id != 0 {
                    self.row_id = row.next_id;
                } else {
                    match self.call_stack.pop() {
                        Some(return_row) => self.row_id = return_row,
                        None => {
                            let input_index = self.input_index;
                            return self.fail(Some(input_index));
                        }
                    }
                    if !self.dispatch_ast_action(&row.action_name) {
                        return self.fail_semantic();
                    }
                }
            } else if row.is_error {
                return self.fail_syntax(&row);
            } else {
                self.row_id += 1;
            }
        }
    }

    fn advance_token(&mut self) -> bool {
        match self.source.next_token() {
            Some(token_information) => {
                self.tokens.push(token_information.clone());
                self.current = token_information;
                self.input_index = self.tokens.len() - 1;
                true
            }
            None => false,
        }
    }

    fn push_leaf(&mut self) {
        self.ast_stack
            .push(AstNode::leaf(&self.current, self.input_index));
    }

    /// Pre-shift dispatch: registered action handlers run here; names that
    /// belong to the post-reduce world resolve silently.
    fn dispatch_action(&mut self, name: &str) -> bool {
        if name.is_empty() || self.registry.is_ignored(name) {
            return true;
        }
        if let Some(handler) = self.registry.action_handler(name) {
            return handler(self);
        }
        if self.registry.ast_action_handler(name).is_some()
            || self.registry.creation_template(name).is_some()
        {
            return true;
        }
        self.diagnostics
            .warning(&format!("Unrecognised action name \"{}\"", name));
        true
    }

    /// Post-reduce dispatch: unknown names are tried against the AST
    /// creation template before being warned about.
    fn dispatch_ast_action(&mut self, name: &str) -> bool {
        if name.is_empty() || self.registry.is_ignored(name) {
            return true;
        }
        if let Some(handler) = self.registry.ast_action_handler(name) {
            return handler(self);
        }
        if let Some((rule_name, child_count)) = self.registry.creation_template(name) {
            return self.apply_creation_template(&rule_name, child_count);
        }
        if self.registry.action_handler(name).is_some() {
            return true;
        }
        self.diagnostics
            .warning(&format!("Unrecognised action name \"{}\"", name));
        true
    }

    /// Reduce the stack for a creation template and dispatch the follow-up
    /// synthesis name listing the non-empty children of the new node.
    fn apply_creation_template(&mut self, rule_name: &str, child_count: usize) -> bool {
        if let Err(why) = self.ast_stack.reduce(rule_name, child_count) {
            panic!(
                "Malformed control table! Reducing {} needs {} nodes but the AST stack holds {}",
                rule_name, why.required, why.available
            );
        }

        let follow_up = {
            let node = self.ast_stack.top().unwrap();
            let non_empty = node.non_empty_children();
            if non_empty.len() <= 1 {
                String::from("Synthesis")
            } else {
                let names: Vec<&str> = non_empty.iter().map(|child| child.name.as_str()).collect();
                format!("Synthesis {}", names.join(" "))
            }
        };
        self.dispatch_ast_action(&follow_up)
    }

    /// Accept: terminate the entry function, dump the module and hand it to
    /// the execution engine.
    fn accept(mut self) -> ParseOutcome {
        let zero = self.builder.create_integer_constant(0);
        self.builder.create_ret(Some(zero));

        let module = self.builder.into_module();
        if self.dump_ir {
            self.diagnostics.ir_dump(&module.to_string());
        }
        if self.execute {
            let mut engine = ExecutionEngine::new(module.clone())
                .with_output(self.program_output.clone())
                .with_input(self.program_input.clone());
            let run_result = engine.finalize().and_then(|_| engine.run("main"));
            if let Err(why) = run_result {
                self.diagnostics.error(&format!("{}", why));
            }
        }

        ParseOutcome {
            accepted: true,
            tokens: self.tokens,
            fail_index: None,
            expected_tokens: BTreeSet::new(),
            module: Some(module),
            ast_stack_depth: self.ast_stack.len(),
            scope_depth: self.scopes.depth(),
            call_stack_depth: self.call_stack.len(),
        }
    }

    /// Syntax failure: the expected set is the union of the referencing
    /// sets of the error row and every non-error row walking backwards from
    /// it, i.e. the alternatives of the error block just fallen through.
    fn fail_syntax(mut self, error_row: &TableRow) -> ParseOutcome {
        let mut expected_tokens: BTreeSet<Token> =
            error_row.referencing_set.iter().copied().collect();

        let mut row_id = self.row_id.saturating_sub(1);
        while let Some(row) = self.table.get_row(row_id) {
            if row.is_error {
                break;
            }
            expected_tokens.extend(row.referencing_set.iter().copied());
            if row_id == 0 {
                break;
            }
            row_id -= 1;
        }

        self.fail_index_override = None;
        let input_index = self.input_index;
        self.fail(Some(input_index)).with_expected(expected_tokens)
    }

    fn fail_semantic(mut self) -> ParseOutcome {
        let index = self.fail_index_override.take().unwrap_or(self.input_index);
        self.fail(Some(index))
    }

    fn fail(self, fail_index: Option<usize>) -> ParseOutcome {
        ParseOutcome {
            accepted: false,
            tokens: self.tokens,
            fail_index,
            expected_tokens: BTreeSet::new(),
            module: None,
            ast_stack_depth: self.ast_stack.len(),
            scope_depth: self.scopes.depth(),
            call_stack_depth: self.call_stack.len(),
        }
    }
}

impl ParseOutcome {
    fn with_expected(mut self, expected_tokens: BTreeSet<Token>) -> Self {
        self.expected_tokens = expected_tokens;
        self
    }
}

/// An operand of a synthesis step: its resolved type, its IR value if one
/// exists yet, and where it came from.
pub(super) struct Operand {
    pub type_name: String,
    pub ir_value: Option<IrValue>,
    pub is_identifier: bool,
}

/// Helpers shared by the semantic action handlers.
impl LlDriver {
    /// Report a semantic error, optionally anchoring the failure to a
    /// specific token. Always evaluates to false for use as a return value.
    pub(super) fn report_error(&mut self, token_index: Option<usize>, message: &str) -> bool {
        if token_index.is_some() {
            self.fail_index_override = token_index;
        }
        self.diagnostics.error(message);
        false
    }

    /// Resolve a node into an operand, updating the node in place.
    /// Unresolved identifiers are looked up in the symbol table and their
    /// value loaded from the allocation, so later steps see the resolved
    /// type and value.
    pub(super) fn resolve_operand(&mut self, node: &mut AstNode) -> Result<Operand, ()> {
        if node.declared_type != datatype::IDENTIFIER {
            return Ok(Operand {
                type_name: node.computed_type.clone(),
                ir_value: node.ir_value,
                is_identifier: false,
            });
        }

        if node.computed_type != datatype::IDENTIFIER {
            // Already resolved: the node carries a computed value.
            return Ok(Operand {
                type_name: node.computed_type.clone(),
                ir_value: node.ir_value,
                is_identifier: true,
            });
        }

        let row_index = match self.scopes.resolve(&node.lexeme) {
            Some(row_index) => row_index,
            None => {
                self.report_error(
                    node.token_index,
                    &format!("Undeclared identifier \"{}\"", node.lexeme),
                );
                return Err(());
            }
        };
        let row = self.symbols.get(row_index).unwrap();
        let ir_value = match node.ir_value {
            Some(existing) => existing,
            None => {
                let pointer = row
                    .ir_handle
                    .expect("declared variables always carry an allocation");
                self.builder
                    .create_load(pointer, &format!("{}_value", node.lexeme))
            }
        };

        node.computed_type = row.type_name.clone();
        node.ir_value = Some(ir_value);

        Ok(Operand {
            type_name: row.type_name,
            ir_value: Some(ir_value),
            is_identifier: true,
        })
    }

    /// Resolve the stack node `offset` positions from the top.
    pub(super) fn resolve_operand_at(&mut self, offset: usize) -> Result<Operand, ()> {
        let mut node = match self.ast_stack.from_top(offset) {
            Some(node) => node.clone(),
            None => panic!("Malformed control table! Expected an operand on the AST stack"),
        };
        let operand = self.resolve_operand(&mut node)?;
        *self.ast_stack.from_top_mut(offset).unwrap() = node;
        Ok(operand)
    }

    pub(super) fn printf_prototype(&mut self) -> PrototypeId {
        if let Some(existing) = self.printf_prototype {
            return existing;
        }
        let prototype = self.builder.declare_external(
            "printf",
            crate::compiler::backend::IrType::Integer32,
            vec![crate::compiler::backend::IrType::Character.pointer_to()],
            true,
        );
        self.printf_prototype = Some(prototype);
        prototype
    }

    pub(super) fn scanf_prototype(&mut self) -> PrototypeId {
        if let Some(existing) = self.scanf_prototype {
            return existing;
        }
        let prototype = self.builder.declare_external(
            "scanf",
            crate::compiler::backend::IrType::Integer32,
            vec![crate::compiler::backend::IrType::Character.pointer_to()],
            true,
        );
        self.scanf_prototype = Some(prototype);
        prototype
    }

    pub(super) fn memcpy_prototype(&mut self) -> PrototypeId {
        if let Some(existing) = self.memcpy_prototype {
            return existing;
        }
        let prototype = self.builder.declare_external(
            "memcpy",
            crate::compiler::backend::IrType::Void,
            vec![
                crate::compiler::backend::IrType::Character.pointer_to(),
                crate::compiler::backend::IrType::Character.pointer_to(),
                crate::compiler::backend::IrType::Integer32,
            ],
            false,
        );
        self.memcpy_prototype = Some(prototype);
        prototype
    }

    /// The printf/scanf directive for a resolved type.
    pub(super) fn format_directive(type_name: &str) -> Option<&'static str> {
        match type_name {
            datatype::INTEGER => Some("%d"),
            datatype::FLOAT => Some("%f"),
            datatype::BOOLEAN | datatype::BOOLEAN_LITERAL => Some("%d"),
            datatype::CHARACTER | datatype::CHARACTER_LITERAL => Some("%c"),
            datatype::STRING | datatype::STRING_LITERAL => Some("%s"),
            _ => None,
        }
    }
}
