use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use colored::Colorize;

/// Console reporting for the parser. Errors are red, warnings yellow and the
/// IR dump blue; the program's own output is left uncoloured. Everything
/// goes to one sink, stdout by default, replaceable for tests.
#[derive(Clone)]
pub struct Diagnostics {
    sink: Rc<RefCell<dyn Write>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics {
            sink: Rc::new(RefCell::new(io::stdout())),
        }
    }

    pub fn with_sink(sink: Rc<RefCell<dyn Write>>) -> Self {
        Diagnostics { sink }
    }

    pub fn error(&self, message: &str) {
        let mut sink = self.sink.borrow_mut();
        let _ = writeln!(sink, "{} {}", "error:".red().bold(), message.red());
    }

    pub fn warning(&self, message: &str) {
        let mut sink = self.sink.borrow_mut();
        let _ = writeln!(sink, "{} {}", "warning:".yellow().bold(), message.yellow());
    }

    pub fn ir_dump(&self, module_text: &str) {
        let mut sink = self.sink.borrow_mut();
        let _ = writeln!(sink, "{}", module_text.blue());
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured() -> (Diagnostics, Rc<RefCell<Vec<u8>>>) {
        let buffer = Rc::new(RefCell::new(Vec::new()));
        (Diagnostics::with_sink(buffer.clone()), buffer)
    }

    #[test]
    fn error_lines_carry_the_prefix() {
        colored::control::set_override(false);
        let (diagnostics, buffer) = captured();
        diagnostics.error("Redeclaring identifier \"x\"");
        let text = String::from_utf8(buffer.borrow().clone()).unwrap();
        assert_eq!(text, "error: Redeclaring identifier \"x\"\n");
    }

    #[test]
    fn warning_lines_carry_the_prefix() {
        colored::control::set_override(false);
        let (diagnostics, buffer) = captured();
        diagnostics.warning("Unrecognised action name \"Mystery\"");
        let text = String::from_utf8(buffer.borrow().clone()).unwrap();
        assert!(text.starts_with("warning:"));
    }
}
