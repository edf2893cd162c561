use std::rc::Rc;

use crate::diagnostics::{
    already_declared_in_current_scope, not_a_valid_index, not_declared, requires_parameters, Diagnostic,
    UNABLE_TO_RETURN_OUTSIDE_OF_FUNCTION,
};
use crate::environment::Environment;
use crate::function::{UserFunction, Value};
use crate::natives;
use crate::parser::{Expr, Meta, Program, Stmt};

/* Walks the AST in program order, maintaining a scope stack identical in
shape to the evaluator's (see `crate::environment::Environment`), recording
every violation and continuing traversal rather than stopping at the first
one. `call_depth` tracks whether the walker is currently inside a function
body, for the `return`-outside-a-function check.
*/
pub struct SemanticAnalyser {
    env: Environment,
    call_depth: usize,
    filename: Rc<str>,
    diagnostics: Vec<Diagnostic>,
}

impl SemanticAnalyser {
    pub fn new(filename: impl Into<Rc<str>>) -> Self {
        Self { env: Environment::new(), call_depth: 0, filename: filename.into(), diagnostics: Vec::new() }
    }

    pub fn analyse(mut self, program: &Program) -> Vec<Diagnostic> {
        for stmt in &program.statements {
            self.analyse_stmt(stmt);
        }
        self.diagnostics
    }

    fn error(&mut self, meta: &Meta, message: String) {
        self.diagnostics.push(Diagnostic::semantic(Rc::clone(&meta.file), meta.line, message));
    }

    fn check_call(&mut self, meta: &Meta, name: &str, arg_count: usize) {
        if let Some(Value::UserFunction(func)) = self.env.lookup_function(name) {
            if func.params.len() != arg_count {
                self.error(meta, requires_parameters(name, func.params.len(), arg_count));
            }
            return;
        }
        if let Some(native) = natives::lookup(name) {
            if native.arity >= 0 && native.arity as usize != arg_count {
                self.error(meta, requires_parameters(name, native.arity as usize, arg_count));
            }
            return;
        }
        self.error(meta, not_declared(name));
    }

    fn analyse_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(meta, name, expr) => {
                self.analyse_expr(expr);
                if !self.env.available_in_current_scope_only(name) {
                    self.error(meta, already_declared_in_current_scope(name));
                } else {
                    self.env.declare(name.clone(), Value::Null);
                }
            }
            Stmt::Assignment(meta, name, expr) => {
                if !self.env.visible(name) {
                    self.error(meta, not_declared(name));
                }
                self.analyse_expr(expr);
            }
            Stmt::Return(meta, expr) => {
                if self.call_depth == 0 {
                    self.error(meta, UNABLE_TO_RETURN_OUTSIDE_OF_FUNCTION.to_string());
                }
                if let Some(expr) = expr {
                    self.analyse_expr(expr);
                }
            }
            Stmt::FunctionCallStmt(_, call) => self.analyse_expr(call),
            Stmt::If(_, cond, then_block, else_block) => {
                self.analyse_expr(cond);
                self.env.enter_scope();
                for s in then_block {
                    self.analyse_stmt(s);
                }
                self.env.exit_scope();
                if let Some(else_block) = else_block {
                    self.env.enter_scope();
                    for s in else_block {
                        self.analyse_stmt(s);
                    }
                    self.env.exit_scope();
                }
            }
            Stmt::While(_, cond, body) => {
                self.analyse_expr(cond);
                self.env.enter_scope();
                for s in body {
                    self.analyse_stmt(s);
                }
                self.env.exit_scope();
            }
            Stmt::FuncDecl(meta, name, params, body) => {
                let already_exists = self.env.lookup_function(name).is_some() || natives::lookup(name).is_some();
                if already_exists {
                    self.error(meta, already_declared_in_current_scope(name));
                    return;
                }
                let func = Rc::new(UserFunction {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    meta: meta.clone(),
                });
                self.env.declare_function(name.clone(), Value::UserFunction(func));

                let saved = self.env.enter_function();
                for param in params {
                    self.env.declare(param.clone(), Value::Null);
                }
                self.call_depth += 1;
                for s in body {
                    self.analyse_stmt(s);
                }
                self.call_depth -= 1;
                self.env.exit_function(saved);
            }
        }
    }

    fn analyse_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Integer(..) | Expr::Float(..) | Expr::Boolean(..) | Expr::StringLit(..) => {}
            Expr::Identifier(meta, name) => {
                if !self.env.visible(name) {
                    self.error(meta, not_declared(name));
                }
            }
            Expr::Prefix(_, _, right) => self.analyse_expr(right),
            Expr::Infix(_, _, left, right) => {
                self.analyse_expr(left);
                self.analyse_expr(right);
            }
            Expr::FunctionCall(meta, name, args) => {
                self.check_call(meta, name, args.len());
                for arg in args {
                    self.analyse_expr(arg);
                }
            }
            Expr::ArrayLiteral(_, elems) => {
                for e in elems {
                    self.analyse_expr(e);
                }
            }
            Expr::ArrayIndex(meta, name, index) => {
                if !self.env.visible(name) {
                    self.error(meta, not_declared(name));
                }
                match index.as_ref() {
                    Expr::ArrayLiteral(..) | Expr::Float(..) | Expr::StringLit(..) | Expr::Boolean(..) => {
                        self.error(meta, not_a_valid_index(&index.to_string()));
                    }
                    _ => {}
                }
                self.analyse_expr(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn errors_of(src: &str) -> usize {
        let (program, parse_errors) = Parser::new(src, "test.txt").parse();
        assert_eq!(parse_errors.len(), 0, "expected no parse errors for {src:?}");
        SemanticAnalyser::new("test.txt").analyse(&program).len()
    }

    #[test]
    fn reassignment_of_declared_variable_is_fine() {
        assert_eq!(errors_of("var x = 3; x = 2;"), 0);
    }

    #[test]
    fn assignment_of_undeclared_variable_is_an_error() {
        assert_eq!(errors_of("x = 3;"), 1);
    }

    #[test]
    fn redeclaration_in_same_scope_is_an_error() {
        assert_eq!(errors_of("var x=3; var x=2;"), 1);
    }

    #[test]
    fn assignment_inside_visible_nested_scope_is_fine() {
        assert_eq!(errors_of("var x=33; if (2<3){ x=000; };"), 0);
    }

    #[test]
    fn assignment_to_name_never_declared_is_an_error() {
        assert_eq!(errors_of("if (2<3){ x=000; };"), 1);
    }

    #[test]
    fn function_scope_is_isolated_from_enclosing_locals() {
        assert_eq!(errors_of("var x=33; func f(a,b){ x=1; };"), 1);
    }

    #[test]
    fn array_index_type_rejection() {
        assert_eq!(errors_of(r#"var x=[1,2,3,4]; x=x["w"];"#), 1);
        assert_eq!(errors_of("var x=[1,2,3,4]; x=x[22.33];"), 1);
        assert_eq!(errors_of("var x=[1,2,3,4]; x=x[true];"), 1);
        assert_eq!(errors_of("var x=[1,2,3,4]; x=x[1+2/3];"), 0);
    }

    #[test]
    fn wrong_arity_call_is_an_error() {
        assert_eq!(errors_of("func f(a,b,c,d){ return a; }; var r = f(1,2,3);"), 1);
    }

    #[test]
    fn return_outside_function_is_an_error() {
        assert_eq!(errors_of("return 1;"), 1);
    }

    #[test]
    fn return_inside_function_is_fine() {
        assert_eq!(errors_of("func f(){ return 1; };"), 0);
    }
}
