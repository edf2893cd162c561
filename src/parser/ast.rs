use std::fmt;
use std::rc::Rc;

/// Source position every node is stamped with: the metadata of the first
/// token that began it.
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    pub file: Rc<str>,
    pub line: usize,
}

impl Meta {
    pub fn new(file: Rc<str>, line: usize) -> Self {
        Self { file, line }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Plus,
    Minus,
    Not,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrefixOp::Plus => "+",
            PrefixOp::Minus => "-",
            PrefixOp::Not => "!",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    And,
    Or,
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Lt => "<",
            InfixOp::LtEq => "<=",
            InfixOp::Gt => ">",
            InfixOp::GtEq => ">=",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
            InfixOp::And => "&",
            InfixOp::Or => "|",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(Meta, i64),
    Float(Meta, f64),
    Boolean(Meta, bool),
    StringLit(Meta, String),
    Identifier(Meta, String),
    Prefix(Meta, PrefixOp, Box<Expr>),
    Infix(Meta, InfixOp, Box<Expr>, Box<Expr>),
    FunctionCall(Meta, String, Vec<Expr>),
    ArrayLiteral(Meta, Vec<Expr>),
    ArrayIndex(Meta, String, Box<Expr>),
}

impl Expr {
    pub fn meta(&self) -> &Meta {
        match self {
            Expr::Integer(m, _)
            | Expr::Float(m, _)
            | Expr::Boolean(m, _)
            | Expr::StringLit(m, _)
            | Expr::Identifier(m, _)
            | Expr::Prefix(m, ..)
            | Expr::Infix(m, ..)
            | Expr::FunctionCall(m, ..)
            | Expr::ArrayLiteral(m, ..)
            | Expr::ArrayIndex(m, ..) => m,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Integer(_, v) => write!(f, "{v}"),
            Expr::Float(_, v) => write!(f, "{v}"),
            Expr::Boolean(_, v) => write!(f, "{v}"),
            Expr::StringLit(_, v) => write!(f, "\"{v}\""),
            Expr::Identifier(_, name) => write!(f, "{name}"),
            Expr::Prefix(_, op, right) => write!(f, "({op}{right})"),
            Expr::Infix(_, op, left, right) => write!(f, "({left} {op} {right})"),
            Expr::FunctionCall(_, name, args) => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expr::ArrayLiteral(_, elems) => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
            Expr::ArrayIndex(_, name, index) => write!(f, "{name}[{index}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl(Meta, String, Expr),
    Assignment(Meta, String, Expr),
    Return(Meta, Option<Expr>),
    FunctionCallStmt(Meta, Expr),
    If(Meta, Expr, Vec<Stmt>, Option<Vec<Stmt>>),
    While(Meta, Expr, Vec<Stmt>),
    FuncDecl(Meta, String, Vec<String>, Vec<Stmt>),
}

impl Stmt {
    pub fn meta(&self) -> &Meta {
        match self {
            Stmt::VarDecl(m, ..)
            | Stmt::Assignment(m, ..)
            | Stmt::Return(m, ..)
            | Stmt::FunctionCallStmt(m, ..)
            | Stmt::If(m, ..)
            | Stmt::While(m, ..)
            | Stmt::FuncDecl(m, ..) => m,
        }
    }

    pub fn is_func_decl(&self) -> bool {
        matches!(self, Stmt::FuncDecl(..))
    }
}

fn fmt_block(f: &mut fmt::Formatter<'_>, body: &[Stmt]) -> fmt::Result {
    write!(f, "{{ ")?;
    for s in body {
        write!(f, "{s} ")?;
    }
    write!(f, "}}")
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::VarDecl(_, name, expr) => write!(f, "var {name} = {expr};"),
            Stmt::Assignment(_, name, expr) => write!(f, "{name} = {expr};"),
            Stmt::Return(_, Some(expr)) => write!(f, "return {expr};"),
            Stmt::Return(_, None) => write!(f, "return;"),
            Stmt::FunctionCallStmt(_, call) => write!(f, "{call};"),
            Stmt::If(_, cond, then_block, else_block) => {
                write!(f, "if ({cond}) ")?;
                fmt_block(f, then_block)?;
                if let Some(else_block) = else_block {
                    write!(f, " else ")?;
                    fmt_block(f, else_block)?;
                }
                write!(f, ";")
            }
            Stmt::While(_, cond, body) => {
                write!(f, "while ({cond}) ")?;
                fmt_block(f, body)?;
                write!(f, ";")
            }
            Stmt::FuncDecl(_, name, params, body) => {
                write!(f, "func {name}({}) ", params.join(", "))?;
                fmt_block(f, body)?;
                write!(f, ";")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }

    /// Reorders top-level statements so every `FuncDecl` precedes all other
    /// statements, preserving relative order within each group.
    pub fn hoist(&mut self) {
        let (decls, rest): (Vec<Stmt>, Vec<Stmt>) =
            self.statements.drain(..).partition(Stmt::is_func_decl);
        self.statements = decls.into_iter().chain(rest).collect();
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.statements.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{s}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> Meta {
        Meta::new(Rc::from("test.txt"), 1)
    }

    #[test]
    fn hoist_moves_func_decls_first_preserving_order() {
        let mut program = Program::new(vec![
            Stmt::VarDecl(meta(), "a".into(), Expr::Integer(meta(), 1)),
            Stmt::FuncDecl(meta(), "f".into(), vec![], vec![]),
            Stmt::VarDecl(meta(), "b".into(), Expr::Integer(meta(), 2)),
            Stmt::FuncDecl(meta(), "g".into(), vec![], vec![]),
        ]);
        program.hoist();

        let names: Vec<&str> = program
            .statements
            .iter()
            .map(|s| match s {
                Stmt::FuncDecl(_, n, ..) => n.as_str(),
                Stmt::VarDecl(_, n, ..) => n.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["f", "g", "a", "b"]);
    }

    #[test]
    fn display_parenthesizes_infix_fully() {
        let expr = Expr::Infix(
            meta(),
            InfixOp::Add,
            Box::new(Expr::Integer(meta(), 1)),
            Box::new(Expr::Infix(
                meta(),
                InfixOp::Mul,
                Box::new(Expr::Integer(meta(), 2)),
                Box::new(Expr::Integer(meta(), 3)),
            )),
        );
        assert_eq!(expr.to_string(), "(1 + (2 * 3))");
    }
}
