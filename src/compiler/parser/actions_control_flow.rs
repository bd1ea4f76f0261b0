use crate::compiler::backend::{ComparePredicate, IrValue};
use crate::compiler::semantic_analyser::datatype;

use super::ll_driver::LlDriver;

/// Control-flow actions. Five block stacks (pre-while, while body, true
/// branch, false branch and previous/join) keep nested statements straight:
/// every `Create*` pushes a fresh block onto its stack and every `Start*`
/// redirects the insertion point, popping where the block is entered for
/// good.
impl LlDriver {
    /// Turn the expression on top of the stack into a branch condition:
    /// widen to float and compare against zero.
    fn synthesise_condition(&mut self, name: &str) -> Result<IrValue, ()> {
        let condition = self.resolve_operand_at(0)?;
        let value = condition
            .ir_value
            .unwrap_or_else(|| panic!("Malformed AST! Condition carries no IR value"));
        let as_float = self.builder.convert_to_float(value);
        let zero = self.builder.create_float_constant(0.0);
        match self
            .builder
            .create_compare(datatype::FLOAT, ComparePredicate::Ne, as_float, zero, name)
        {
            Ok(compared) => Ok(compared),
            Err(why) => {
                self.report_error(None, &why);
                Err(())
            }
        }
    }

    pub(super) fn create_if_statement(&mut self) -> bool {
        let condition = match self.synthesise_condition("if_condition") {
            Ok(condition) => condition,
            Err(()) => return false,
        };
        let block_true = self.builder.create_basic_block("block_true");
        let block_false = self.builder.create_basic_block("block_false");
        self.true_blocks.push(block_true);
        self.false_blocks.push(block_false);
        self.builder.create_cond_br(condition, block_true, block_false);
        true
    }

    pub(super) fn start_block_true(&mut self) -> bool {
        let block = self
            .true_blocks
            .pop()
            .unwrap_or_else(|| panic!("Malformed control table! No true block to start"));
        self.builder.set_insertion_point(block);
        true
    }

    pub(super) fn start_block_false(&mut self) -> bool {
        let block = self
            .false_blocks
            .pop()
            .unwrap_or_else(|| panic!("Malformed control table! No false block to start"));
        self.builder.set_insertion_point(block);
        true
    }

    pub(super) fn start_block_previous(&mut self) -> bool {
        let block = self
            .previous_blocks
            .pop()
            .unwrap_or_else(|| panic!("Malformed control table! No previous block to start"));
        self.builder.set_insertion_point(block);
        true
    }

    /// Create the join block both branches fall through to.
    pub(super) fn save_post_if_statement_to_previous_blocks(&mut self) -> bool {
        let block = self.builder.create_basic_block("block_post_if");
        self.previous_blocks.push(block);
        true
    }

    pub(super) fn goto_post_if_statement_label(&mut self) -> bool {
        let block = *self
            .previous_blocks
            .last()
            .unwrap_or_else(|| panic!("Malformed control table! No previous block to branch to"));
        self.builder.create_br(block);
        true
    }

    pub(super) fn create_block_pre_while(&mut self) -> bool {
        let block = self.builder.create_basic_block("block_pre_while");
        self.pre_while_blocks.push(block);
        true
    }

    /// Branch to the condition block, both on loop entry and from the end
    /// of the body.
    pub(super) fn goto_block_pre_while(&mut self) -> bool {
        let block = *self
            .pre_while_blocks
            .last()
            .unwrap_or_else(|| panic!("Malformed control table! No pre-while block to branch to"));
        self.builder.create_br(block);
        true
    }

    pub(super) fn start_block_pre_while(&mut self) -> bool {
        let block = *self
            .pre_while_blocks
            .last()
            .unwrap_or_else(|| panic!("Malformed control table! No pre-while block to start"));
        self.builder.set_insertion_point(block);
        true
    }

    pub(super) fn create_block_while(&mut self) -> bool {
        let block = self.builder.create_basic_block("block_while");
        self.while_blocks.push(block);
        true
    }

    /// Close the condition block: compare the condition expression against
    /// zero and branch between the body and a fresh post-loop block.
    pub(super) fn create_while_statement(&mut self) -> bool {
        let condition = match self.synthesise_condition("while_condition") {
            Ok(condition) => condition,
            Err(()) => return false,
        };
        let body = *self
            .while_blocks
            .last()
            .unwrap_or_else(|| panic!("Malformed control table! No while body block"));
        let post = self.builder.create_basic_block("block_post_while");
        self.previous_blocks.push(post);
        self.builder.create_cond_br(condition, body, post);
        true
    }

    pub(super) fn start_block_while(&mut self) -> bool {
        let block = self
            .while_blocks
            .pop()
            .unwrap_or_else(|| panic!("Malformed control table! No while body block to start"));
        self.builder.set_insertion_point(block);
        true
    }

    pub(super) fn end_block_pre_while(&mut self) -> bool {
        self.pre_while_blocks
            .pop()
            .unwrap_or_else(|| panic!("Malformed control table! No pre-while block to end"));
        true
    }
}
