use crate::compiler::backend::IrValue;
use crate::compiler::lexer::token::{TokenInformation, TokenPosition};

/// A node of the working abstract syntax tree.
///
/// Nodes are owned exclusively by the AST stack or by their parent node;
/// there are no parent pointers and no sharing. A node is either a leaf
/// created from a shifted token or a rule node created by reducing the top
/// of the stack.
///
/// `computed_type` carries the type after semantic evaluation. For
/// identifiers it is the sentinel "identifier" until the symbol is resolved;
/// once a value has been loaded or computed it holds the value's type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AstNode {
    /// Grammar category or token name that produced the node.
    pub name: String,
    /// Type ascribed at construction (a token's own category or a rule name).
    pub declared_type: String,
    /// Type after semantic evaluation.
    pub computed_type: String,
    /// String payload: literal text, operator spelling or identifier name.
    pub lexeme: String,
    /// Value handle produced by the IR builder, if any.
    pub ir_value: Option<IrValue>,
    /// Owned children in left-to-right source order.
    pub children: Vec<AstNode>,
    /// Set when the node represents a synthesised intermediate expression.
    pub is_temporary: bool,
    /// Index of the originating token in the input, for error anchoring.
    pub token_index: Option<usize>,
    /// Source position of the originating token.
    pub position: Option<TokenPosition>,
}

impl AstNode {
    /// Leaf node for a shifted token. Name, declared type and computed type
    /// all start as the token's name.
    pub fn leaf(token_information: &TokenInformation, token_index: usize) -> Self {
        let name = token_information.token.to_string();
        AstNode {
            declared_type: name.clone(),
            computed_type: name.clone(),
            name,
            lexeme: token_information.lexeme.clone(),
            ir_value: None,
            children: vec![],
            is_temporary: false,
            token_index: Some(token_index),
            position: Some(token_information.position),
        }
    }

    /// Rule node owning the given children.
    pub fn rule(name: &str, children: Vec<AstNode>) -> Self {
        AstNode {
            name: String::from(name),
            declared_type: String::from(name),
            computed_type: String::from(name),
            lexeme: String::new(),
            ir_value: None,
            children,
            is_temporary: false,
            token_index: None,
            position: None,
        }
    }

    /// A node is non-empty when it carries a lexeme or has children of its
    /// own. Synthesis naming and the default synthesis action only consider
    /// non-empty children.
    pub fn is_non_empty(&self) -> bool {
        !self.lexeme.is_empty() || !self.children.is_empty()
    }

    /// Non-empty children, in order.
    pub fn non_empty_children(&self) -> Vec<&AstNode> {
        self.children.iter().filter(|child| child.is_non_empty()).collect()
    }

    /// Copy the evaluated payload of another node into this one. Used by the
    /// synthesis actions that hoist a child's result into its parent.
    pub fn adopt_value_of(&mut self, other: &AstNode) {
        self.declared_type = other.declared_type.clone();
        self.computed_type = other.computed_type.clone();
        self.lexeme = other.lexeme.clone();
        self.ir_value = other.ir_value;
        self.is_temporary = other.is_temporary;
        self.token_index = other.token_index;
        self.position = other.position;
    }
}
