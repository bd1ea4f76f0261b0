use crate::compiler::ast::AstNode;

use super::ll_driver::LlDriver;

/// Structural rewrites: pure AST manipulations on the node a reduction has
/// just produced. None of them touch the symbol table or emit IR.
impl LlDriver {
    fn top_node_mut(&mut self) -> &mut AstNode {
        self.ast_stack
            .top_mut()
            .unwrap_or_else(|| panic!("Malformed AST! No node to restructure"))
    }

    /// Copy the evaluated payload of the node's only non-empty child into
    /// the node itself. With no or several non-empty children this is a
    /// no-op.
    pub(super) fn synthesis(&mut self) -> bool {
        let node = self.top_node_mut();
        let non_empty: Vec<usize> = node
            .children
            .iter()
            .enumerate()
            .filter(|(_, child)| child.is_non_empty())
            .map(|(position, _)| position)
            .collect();
        if non_empty.len() == 1 {
            let child = node.children[non_empty[0]].clone();
            node.adopt_value_of(&child);
        }
        true
    }

    /// Copy the computed type of the first non-empty child upward.
    pub(super) fn synthesis_type(&mut self) -> bool {
        let node = self.top_node_mut();
        if let Some(child) = node.children.iter().find(|child| child.is_non_empty()) {
            let computed_type = child.computed_type.clone();
            node.computed_type = computed_type;
        }
        true
    }

    /// Copy the evaluated payload of the last child upward.
    pub(super) fn synthesis_last_children(&mut self) -> bool {
        let node = self.top_node_mut();
        if let Some(child) = node.children.last() {
            let child = child.clone();
            node.adopt_value_of(&child);
        }
        true
    }

    /// Copy the evaluated payload of the last child's own last child.
    pub(super) fn synthesis_last_children_children(&mut self) -> bool {
        let node = self.top_node_mut();
        if let Some(grandchild) = node.children.last().and_then(|child| child.children.last()) {
            let grandchild = grandchild.clone();
            node.adopt_value_of(&grandchild);
        }
        true
    }

    /// Replace the last child with its own children.
    pub(super) fn expand_children_last_children(&mut self) -> bool {
        let node = self.top_node_mut();
        if let Some(last) = node.children.pop() {
            node.children.extend(last.children);
        }
        true
    }

    /// Drop a leading opening and a trailing closing round bracket child.
    pub(super) fn remove_brackets(&mut self) -> bool {
        let node = self.top_node_mut();
        if node
            .children
            .first()
            .map_or(false, |child| child.name == "round_bracket_open")
        {
            node.children.remove(0);
        }
        if node
            .children
            .last()
            .map_or(false, |child| child.name == "round_bracket_close")
        {
            node.children.pop();
        }
        true
    }

    pub(super) fn remove_brackets_and_synthesis(&mut self) -> bool {
        self.remove_brackets();
        self.synthesis()
    }

    /// Drop every round bracket child, wherever it sits. If-condition nodes
    /// keep their keyword leaf in front, so position-based removal does not
    /// apply.
    pub(super) fn remove_if_round_brackets(&mut self) -> bool {
        let node = self.top_node_mut();
        node.children
            .retain(|child| child.name != "round_bracket_open" && child.name != "round_bracket_close");
        true
    }

    /// Drop a trailing semicolon child.
    pub(super) fn remove_semicolon(&mut self) -> bool {
        let node = self.top_node_mut();
        if node
            .children
            .last()
            .map_or(false, |child| child.name == "semicolon")
        {
            node.children.pop();
        }
        true
    }

    /// Drop every curly bracket child.
    pub(super) fn remove_scope_brackets(&mut self) -> bool {
        let node = self.top_node_mut();
        node.children
            .retain(|child| child.name != "curly_bracket_open" && child.name != "curly_bracket_close");
        true
    }
}
