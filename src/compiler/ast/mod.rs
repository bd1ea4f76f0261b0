pub(super) mod ast_node;
pub(super) mod ast_stack;

pub(super) use self::{ast_node::AstNode, ast_stack::AstStack};
