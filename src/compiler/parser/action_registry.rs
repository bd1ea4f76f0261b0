use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::ll_driver::LlDriver;

/// Signature shared by every semantic action handler. A handler mutates the
/// driver state and reports success; returning false aborts the parse at the
/// current input index.
pub type ActionHandler = fn(&mut LlDriver) -> bool;

/// Maps action names from the control table to handlers. Two dispatch modes
/// exist because actions fire at two points in the driver loop: before a
/// possibly-shifting row, and when the driver pops its call stack. A name is
/// looked up in the table for the mode it fires in; a name registered only
/// for the other mode resolves as a silent no-op, so a row whose action runs
/// at one point does not re-run it at the other.
///
/// Besides registered handlers there are two special categories:
///   + ignored names: a configured set resolving to a no-op success,
///   + the reserved pattern `Create AST node <Rule> using <N>`, which
///     reduces the AST stack and dispatches a synthesised follow-up name.
/// Anything else resolves with a warning and succeeds.
#[derive(Clone)]
pub struct ActionRegistry {
    ignored: HashSet<String>,
    action_handlers: HashMap<&'static str, ActionHandler>,
    ast_action_handlers: HashMap<&'static str, ActionHandler>,
    template_cache: RefCell<HashMap<String, Option<(String, usize)>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        let mut registry = ActionRegistry {
            ignored: Self::default_ignored(),
            action_handlers: HashMap::new(),
            ast_action_handlers: HashMap::new(),
            template_cache: RefCell::new(HashMap::new()),
        };
        registry.register_defaults();
        registry
    }

    /// Extend the ignored set, typically with the synthesis combination
    /// names a particular control table is known to produce.
    pub fn with_extra_ignored(mut self, names: &[&str]) -> Self {
        for name in names {
            self.ignored.insert(String::from(*name));
        }
        self
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored.contains(name)
    }

    pub fn action_handler(&self, name: &str) -> Option<ActionHandler> {
        self.action_handlers.get(name).copied()
    }

    pub fn ast_action_handler(&self, name: &str) -> Option<ActionHandler> {
        self.ast_action_handlers.get(name).copied()
    }

    /// Parse and cache the `Create AST node <Rule> using <N>` pattern.
    pub fn creation_template(&self, name: &str) -> Option<(String, usize)> {
        if let Some(cached) = self.template_cache.borrow().get(name) {
            return cached.clone();
        }
        let parsed = Self::parse_creation_template(name);
        self.template_cache
            .borrow_mut()
            .insert(String::from(name), parsed.clone());
        parsed
    }

    fn parse_creation_template(name: &str) -> Option<(String, usize)> {
        let words: Vec<&str> = name.split_whitespace().collect();
        if words.len() != 6 {
            return None;
        }
        if words[0] != "Create" || words[1] != "AST" || words[2] != "node" || words[4] != "using" {
            return None;
        }
        let child_count: usize = words[5].parse().ok()?;
        Some((String::from(words[3]), child_count))
    }

    fn register_defaults(&mut self) {
        // Pre-shift handlers: they read the current token or the freshly
        // shifted top of the AST stack.
        let action_handlers: &[(&'static str, ActionHandler)] = &[
            ("CreateScope", LlDriver::create_scope),
            ("DestroyScope", LlDriver::destroy_scope),
            (
                "CheckIdentifierForAlreadyExisting",
                LlDriver::check_identifier_for_already_existing,
            ),
            (
                "CheckIdentifierForExisting",
                LlDriver::check_identifier_for_existing,
            ),
            ("AddVariableToScope", LlDriver::add_variable_to_scope),
            ("UpdateVariableInScope", LlDriver::update_variable_in_scope),
            (
                "CheckIdentifierTypeWithAssignmentRightHandTypeForEquality",
                LlDriver::check_identifier_type_with_assignment_right_hand_type_for_equality,
            ),
            ("CreateIntegerConstant", LlDriver::create_integer_constant_action),
            ("CreateFloatConstant", LlDriver::create_float_constant_action),
            ("CreateBooleanConstant", LlDriver::create_boolean_constant_action),
            (
                "CreateCharacterConstant",
                LlDriver::create_character_constant_action,
            ),
            ("CreateStringConstant", LlDriver::create_string_constant_action),
            (
                "TryToLoadValueFromSymbolTable",
                LlDriver::try_to_load_value_from_symbol_table,
            ),
            ("SynthesisPlus", LlDriver::synthesis_plus),
            ("SynthesisMinus", LlDriver::synthesis_minus),
            ("SynthesisMultiply", LlDriver::synthesis_multiply),
            ("SynthesisDivide", LlDriver::synthesis_divide),
            ("SynthesisIntegerDivide", LlDriver::synthesis_integer_divide),
            ("SynthesisModulus", LlDriver::synthesis_modulus),
            ("SynthesisEquivalence", LlDriver::synthesis_equivalence),
            ("SynthesisNotEquivalence", LlDriver::synthesis_not_equivalence),
            ("SynthesisLess", LlDriver::synthesis_less),
            ("SynthesisLessOrEquivalence", LlDriver::synthesis_less_or_equivalence),
            ("SynthesisMore", LlDriver::synthesis_more),
            ("SynthesisMoreOrEquivalence", LlDriver::synthesis_more_or_equivalence),
            ("CreateIfStatement", LlDriver::create_if_statement),
            ("StartBlockTrue", LlDriver::start_block_true),
            ("StartBlockFalse", LlDriver::start_block_false),
            ("StartBlockPrevious", LlDriver::start_block_previous),
            (
                "SavePostIfStatementToPreviousBlocks",
                LlDriver::save_post_if_statement_to_previous_blocks,
            ),
            ("GotoPostIfStatementLabel", LlDriver::goto_post_if_statement_label),
            ("CreateBlockPreWhile", LlDriver::create_block_pre_while),
            ("GotoBlockPreWhile", LlDriver::goto_block_pre_while),
            ("StartBlockPreWhile", LlDriver::start_block_pre_while),
            ("CreateBlockWhile", LlDriver::create_block_while),
            ("CreateWhileStatement", LlDriver::create_while_statement),
            ("StartBlockWhile", LlDriver::start_block_while),
            ("EndBlockPreWhile", LlDriver::end_block_pre_while),
            ("CreateReadStatement", LlDriver::create_read_statement),
            ("CreateWriteStatement", LlDriver::create_write_statement),
        ];
        for (name, handler) in action_handlers {
            self.action_handlers.insert(name, *handler);
        }

        // Post-reduce handlers: they restructure or finish the node a
        // reduction has just produced.
        let ast_action_handlers: &[(&'static str, ActionHandler)] = &[
            ("Synthesis", LlDriver::synthesis),
            ("SynthesisType", LlDriver::synthesis_type),
            ("SynthesisLastChildren", LlDriver::synthesis_last_children),
            (
                "SynthesisLastChildrenChildren",
                LlDriver::synthesis_last_children_children,
            ),
            (
                "ExpandChildrenLastChildren",
                LlDriver::expand_children_last_children,
            ),
            ("RemoveBrackets", LlDriver::remove_brackets),
            ("RemoveBracketsAndSynthesis", LlDriver::remove_brackets_and_synthesis),
            ("RemoveIfRoundBrackets", LlDriver::remove_if_round_brackets),
            ("RemoveSemicolon", LlDriver::remove_semicolon),
            ("RemoveScopeBrackets", LlDriver::remove_scope_brackets),
            ("CreateArrayLiteral", LlDriver::create_array_literal),
            // A parenthesised expression reduces to bracket leaves around
            // one value; its synthesis combination strips the brackets and
            // hoists the value.
            (
                "Synthesis round_bracket_open Expression round_bracket_close",
                LlDriver::remove_brackets_and_synthesis,
            ),
        ];
        for (name, handler) in ast_action_handlers {
            self.ast_action_handlers.insert(name, *handler);
        }
    }

    /// Synthesis combination names produced by reductions that need no
    /// semantic effect of their own. The names are assembled from the
    /// non-empty children of the reduced node, so the set enumerates the
    /// shapes the stock grammar reduces through.
    fn default_ignored() -> HashSet<String> {
        let mut ignored = HashSet::new();

        const OPERATORS: &[&str] = &[
            "plus",
            "minus",
            "multiply",
            "divide",
            "integer_divide",
            "modulus",
            "equivalence",
            "not_equivalence",
            "less",
            "less_or_equivalence",
            "more",
            "more_or_equivalence",
        ];
        const OPERANDS: &[&str] = &[
            "integer",
            "float",
            "identifier",
            "boolean_literal",
            "character_literal",
            "string_literal",
            "Expression",
            "ArrayAccess",
        ];
        for operator in OPERATORS {
            for operand in OPERANDS {
                ignored.insert(format!("Synthesis {} {}", operator, operand));
            }
        }

        const TYPE_KEYWORDS: &[&str] = &["int", "float_type", "bool", "char", "string_type"];
        for keyword in TYPE_KEYWORDS {
            ignored.insert(format!("Synthesis {} identifier", keyword));
            ignored.insert(format!("Synthesis {} identifier integer", keyword));
            ignored.insert(format!(
                "Synthesis {} identifier square_bracket_open integer square_bracket_close",
                keyword
            ));
        }

        ignored
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
