mod messages;

use std::rc::Rc;

pub use messages::*;

/// One of the four diagnostic kinds the language reports: a parse failure,
/// a scoping/arity failure caught before evaluation, a failure during
/// evaluation, or a failure that should never occur given a well-formed AST.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Diagnostic {
    #[error("SYNTAX ERROR {file} {line} | {message}")]
    Syntax { file: Rc<str>, line: usize, message: String },
    #[error("SEMANTIC ERROR {file} {line} | {message}")]
    Semantic { file: Rc<str>, line: usize, message: String },
    #[error("RUNTIME ERROR {file} {line} | {message}")]
    Runtime { file: Rc<str>, line: usize, message: String },
    #[error("INTERNAL PROGRAM ERROR {file} {line} | {message}")]
    Internal { file: Rc<str>, line: usize, message: String },
}

impl Diagnostic {
    pub fn syntax(file: Rc<str>, line: usize, message: impl Into<String>) -> Self {
        Diagnostic::Syntax { file, line, message: message.into() }
    }

    pub fn semantic(file: Rc<str>, line: usize, message: impl Into<String>) -> Self {
        Diagnostic::Semantic { file, line, message: message.into() }
    }

    pub fn runtime(file: Rc<str>, line: usize, message: impl Into<String>) -> Self {
        Diagnostic::Runtime { file, line, message: message.into() }
    }

    pub fn internal(file: Rc<str>, line: usize, message: impl Into<String>) -> Self {
        Diagnostic::Internal { file, line, message: message.into() }
    }
}
