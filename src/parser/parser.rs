use std::rc::Rc;

use super::ast::{Expr, InfixOp, Meta, PrefixOp, Program, Stmt};
use crate::diagnostics::{
    expected, invalid_statement_beginning_with, not_a_valid_prefix_operator, unexpected_eof_at_line, Diagnostic,
    PROGRAM_FILE_IS_EMPTY,
};
use crate::lexer::{Lexer, Token, TokenType};

/* Expression precedence, low to high. `Prefix` sits above every binary
level so a unary operator's operand never swallows a looser-binding
trailing operator; `Call`/`Index` never appear here because they are
resolved directly in the identifier null-denotation, not as generic
postfix operators over any expression. */
const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_EQUALS: u8 = 3;
const PREC_COMPARE: u8 = 4;
const PREC_ADDSUB: u8 = 5;
const PREC_MULDIV: u8 = 6;
const PREC_PREFIX: u8 = 7;

fn precedence(tt: TokenType) -> u8 {
    match tt {
        TokenType::Or => PREC_OR,
        TokenType::And => PREC_AND,
        TokenType::EqEq | TokenType::NotEq => PREC_EQUALS,
        TokenType::Lt | TokenType::LtEq | TokenType::Gt | TokenType::GtEq => PREC_COMPARE,
        TokenType::Plus | TokenType::Minus => PREC_ADDSUB,
        TokenType::Star | TokenType::Slash => PREC_MULDIV,
        _ => 0,
    }
}

fn infix_op(tt: TokenType) -> InfixOp {
    match tt {
        TokenType::Plus => InfixOp::Add,
        TokenType::Minus => InfixOp::Sub,
        TokenType::Star => InfixOp::Mul,
        TokenType::Slash => InfixOp::Div,
        TokenType::Lt => InfixOp::Lt,
        TokenType::LtEq => InfixOp::LtEq,
        TokenType::Gt => InfixOp::Gt,
        TokenType::GtEq => InfixOp::GtEq,
        TokenType::EqEq => InfixOp::Eq,
        TokenType::NotEq => InfixOp::NotEq,
        TokenType::And => InfixOp::And,
        TokenType::Or => InfixOp::Or,
        _ => unreachable!("precedence() only returns a nonzero level for these token types"),
    }
}

fn describe(tt: TokenType) -> &'static str {
    match tt {
        TokenType::Identifier => "identifier",
        TokenType::Assign => "=",
        TokenType::Semicolon => ";",
        TokenType::LParen => "(",
        TokenType::RParen => ")",
        TokenType::LBrace => "{",
        TokenType::RBrace => "}",
        TokenType::LBracket => "[",
        TokenType::RBracket => "]",
        TokenType::Comma => ",",
        _ => "token",
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    filename: Rc<str>,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(source: &str, filename: impl Into<Rc<str>>) -> Self {
        let filename = filename.into();
        let mut lexer = Lexer::new(source, Rc::clone(&filename));
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token();
            let done = tok.token_type == TokenType::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        Self { tokens, current: 0, filename, diagnostics: Vec::new() }
    }

    pub fn parse(mut self) -> (Program, Vec<Diagnostic>) {
        if self.tokens.len() == 1 {
            self.diagnostics.push(Diagnostic::syntax(Rc::clone(&self.filename), 1, PROGRAM_FILE_IS_EMPTY));
            return (Program::default(), self.diagnostics);
        }

        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.parse_statement() {
                Ok(stmt) => {
                    log::debug!("parsed statement @{}", stmt.meta().line);
                    statements.push(stmt)
                }
                Err(()) => {}
            }
        }

        let mut program = Program::new(statements);
        program.hoist();
        (program, self.diagnostics)
    }

    // ------------------------------------------------------------------
    // token stream primitives
    // ------------------------------------------------------------------

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_next_type(&self) -> TokenType {
        self.tokens.get(self.current + 1).map(|t| t.token_type).unwrap_or(TokenType::Eof)
    }

    fn check(&self, tt: TokenType) -> bool {
        self.peek().token_type == tt
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.current].clone();
        if self.current + 1 < self.tokens.len() {
            self.current += 1;
        }
        tok
    }

    fn meta_at(&self, line: usize) -> Meta {
        Meta::new(Rc::clone(&self.filename), line)
    }

    fn describe_received(&self) -> String {
        let tok = self.peek();
        if tok.token_type == TokenType::Eof {
            "EOF".to_string()
        } else {
            tok.literal.clone()
        }
    }

    fn expect(&mut self, tt: TokenType, expected_desc: &str) -> Result<Token, ()> {
        if self.check(tt) {
            Ok(self.advance())
        } else {
            let received = self.describe_received();
            let line = self.peek().line;
            self.diagnostics.push(Diagnostic::syntax(Rc::clone(&self.filename), line, expected(expected_desc, &received)));
            Err(())
        }
    }

    /// Resynchronisation: skip tokens tracking paren/brace/bracket depth
    /// until a top-level `;` (consumed) or, for a block-bearing statement,
    /// the matching closing brace (consumed, along with a trailing `;` if
    /// present).
    fn skip_until_statement_end(&mut self) {
        let mut parens = 0i32;
        let mut braces = 0i32;
        let mut brackets = 0i32;
        while !self.is_at_end() {
            match self.peek().token_type {
                TokenType::LParen => parens += 1,
                TokenType::RParen => parens -= 1,
                TokenType::LBrace => braces += 1,
                TokenType::RBrace => {
                    braces -= 1;
                    if braces <= 0 && parens <= 0 && brackets <= 0 {
                        self.advance();
                        if self.check(TokenType::Semicolon) {
                            self.advance();
                        }
                        return;
                    }
                }
                TokenType::LBracket => brackets += 1,
                TokenType::RBracket => brackets -= 1,
                TokenType::Semicolon if braces <= 0 && parens <= 0 && brackets <= 0 => {
                    self.advance();
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    // ------------------------------------------------------------------
    // statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Stmt, ()> {
        match self.peek().token_type {
            TokenType::Var => self.parse_var_decl(),
            TokenType::Return => self.parse_return(),
            TokenType::If => self.parse_if(),
            TokenType::While => self.parse_while(),
            TokenType::Func => self.parse_func_decl(),
            TokenType::Identifier => self.parse_identifier_statement(),
            _ => {
                let tok = self.peek().clone();
                let literal = if tok.token_type == TokenType::Eof { "EOF".to_string() } else { tok.literal };
                self.diagnostics.push(Diagnostic::syntax(
                    Rc::clone(&self.filename),
                    tok.line,
                    invalid_statement_beginning_with(&literal),
                ));
                self.skip_until_statement_end();
                Err(())
            }
        }
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, ()> {
        let kw = self.advance();
        let meta = self.meta_at(kw.line);
        let name = match self.expect(TokenType::Identifier, describe(TokenType::Identifier)) {
            Ok(t) => t.literal,
            Err(()) => {
                self.skip_until_statement_end();
                return Err(());
            }
        };
        if self.expect(TokenType::Assign, describe(TokenType::Assign)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        let expr = match self.parse_expression(0) {
            Ok(e) => e,
            Err(()) => {
                self.skip_until_statement_end();
                return Err(());
            }
        };
        if self.expect(TokenType::Semicolon, describe(TokenType::Semicolon)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        Ok(Stmt::VarDecl(meta, name, expr))
    }

    fn parse_identifier_statement(&mut self) -> Result<Stmt, ()> {
        let ident_tok = self.peek().clone();
        match self.peek_next_type() {
            TokenType::Assign => self.parse_assignment(),
            TokenType::LParen => {
                let meta = self.meta_at(ident_tok.line);
                let call = match self.parse_expression(0) {
                    Ok(e) => e,
                    Err(()) => {
                        self.skip_until_statement_end();
                        return Err(());
                    }
                };
                if self.expect(TokenType::Semicolon, describe(TokenType::Semicolon)).is_err() {
                    self.skip_until_statement_end();
                    return Err(());
                }
                Ok(Stmt::FunctionCallStmt(meta, call))
            }
            _ => {
                self.diagnostics.push(Diagnostic::syntax(
                    Rc::clone(&self.filename),
                    ident_tok.line,
                    invalid_statement_beginning_with(&ident_tok.literal),
                ));
                self.skip_until_statement_end();
                Err(())
            }
        }
    }

    fn parse_assignment(&mut self) -> Result<Stmt, ()> {
        let name_tok = self.advance();
        let meta = self.meta_at(name_tok.line);
        if self.expect(TokenType::Assign, describe(TokenType::Assign)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        let expr = match self.parse_expression(0) {
            Ok(e) => e,
            Err(()) => {
                self.skip_until_statement_end();
                return Err(());
            }
        };
        if self.expect(TokenType::Semicolon, describe(TokenType::Semicolon)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        Ok(Stmt::Assignment(meta, name_tok.literal, expr))
    }

    fn parse_return(&mut self) -> Result<Stmt, ()> {
        let kw = self.advance();
        let meta = self.meta_at(kw.line);
        if self.check(TokenType::Semicolon) {
            self.advance();
            return Ok(Stmt::Return(meta, None));
        }
        let expr = match self.parse_expression(0) {
            Ok(e) => e,
            Err(()) => {
                self.skip_until_statement_end();
                return Err(());
            }
        };
        if self.expect(TokenType::Semicolon, describe(TokenType::Semicolon)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        Ok(Stmt::Return(meta, Some(expr)))
    }

    fn parse_if(&mut self) -> Result<Stmt, ()> {
        let kw = self.advance();
        let meta = self.meta_at(kw.line);
        if self.expect(TokenType::LParen, describe(TokenType::LParen)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        let cond = match self.parse_expression(0) {
            Ok(e) => e,
            Err(()) => {
                self.skip_until_statement_end();
                return Err(());
            }
        };
        if self.expect(TokenType::RParen, describe(TokenType::RParen)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        let then_block = match self.parse_block() {
            Ok(b) => b,
            Err(()) => {
                self.skip_until_statement_end();
                return Err(());
            }
        };
        let else_block = if self.check(TokenType::Else) {
            self.advance();
            match self.parse_block() {
                Ok(b) => Some(b),
                Err(()) => {
                    self.skip_until_statement_end();
                    return Err(());
                }
            }
        } else {
            None
        };
        if self.expect(TokenType::Semicolon, describe(TokenType::Semicolon)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        Ok(Stmt::If(meta, cond, then_block, else_block))
    }

    fn parse_while(&mut self) -> Result<Stmt, ()> {
        let kw = self.advance();
        let meta = self.meta_at(kw.line);
        if self.expect(TokenType::LParen, describe(TokenType::LParen)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        let cond = match self.parse_expression(0) {
            Ok(e) => e,
            Err(()) => {
                self.skip_until_statement_end();
                return Err(());
            }
        };
        if self.expect(TokenType::RParen, describe(TokenType::RParen)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        let body = match self.parse_block() {
            Ok(b) => b,
            Err(()) => {
                self.skip_until_statement_end();
                return Err(());
            }
        };
        if self.expect(TokenType::Semicolon, describe(TokenType::Semicolon)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        Ok(Stmt::While(meta, cond, body))
    }

    fn parse_func_decl(&mut self) -> Result<Stmt, ()> {
        let kw = self.advance();
        let meta = self.meta_at(kw.line);
        let name = match self.expect(TokenType::Identifier, describe(TokenType::Identifier)) {
            Ok(t) => t.literal,
            Err(()) => {
                self.skip_until_statement_end();
                return Err(());
            }
        };
        if self.expect(TokenType::LParen, describe(TokenType::LParen)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        let params = match self.parse_parameters() {
            Ok(p) => p,
            Err(()) => {
                self.skip_until_statement_end();
                return Err(());
            }
        };
        let body = match self.parse_block() {
            Ok(b) => b,
            Err(()) => {
                self.skip_until_statement_end();
                return Err(());
            }
        };
        if self.expect(TokenType::Semicolon, describe(TokenType::Semicolon)).is_err() {
            self.skip_until_statement_end();
            return Err(());
        }
        Ok(Stmt::FuncDecl(meta, name, params, body))
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ()> {
        self.expect(TokenType::LBrace, describe(TokenType::LBrace))?;
        let mut statements = Vec::new();
        while !self.check(TokenType::RBrace) && !self.is_at_end() {
            if let Ok(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
        }
        self.expect(TokenType::RBrace, describe(TokenType::RBrace))?;
        Ok(statements)
    }

    fn parse_parameters(&mut self) -> Result<Vec<String>, ()> {
        let mut params = Vec::new();
        if self.check(TokenType::RParen) {
            self.advance();
            return Ok(params);
        }
        loop {
            let tok = self.expect(TokenType::Identifier, describe(TokenType::Identifier))?;
            params.push(tok.literal);
            if self.check(TokenType::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        self.expect(TokenType::RParen, describe(TokenType::RParen))?;
        Ok(params)
    }

    // ------------------------------------------------------------------
    // expressions (Pratt precedence climbing)
    // ------------------------------------------------------------------

    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ()> {
        let mut left = self.parse_prefix()?;

        loop {
            let tt = self.peek().token_type;
            if tt == TokenType::Semicolon {
                break;
            }
            let prec = precedence(tt);
            if prec <= min_bp {
                break;
            }
            let op_tok = self.advance();
            let meta = self.meta_at(op_tok.line);
            let op = infix_op(op_tok.token_type);
            let right = self.parse_expression(prec)?;
            left = Expr::Infix(meta, op, Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ()> {
        let tok = self.peek().clone();
        match tok.token_type {
            TokenType::Integer => {
                self.advance();
                match tok.literal.parse::<i64>() {
                    Ok(v) => Ok(Expr::Integer(self.meta_at(tok.line), v)),
                    Err(_) => {
                        self.diagnostics.push(Diagnostic::syntax(
                            Rc::clone(&self.filename),
                            tok.line,
                            expected("integer", &tok.literal),
                        ));
                        Err(())
                    }
                }
            }
            TokenType::Float => {
                self.advance();
                match tok.literal.parse::<f64>() {
                    Ok(v) => Ok(Expr::Float(self.meta_at(tok.line), v)),
                    Err(_) => {
                        self.diagnostics.push(Diagnostic::syntax(
                            Rc::clone(&self.filename),
                            tok.line,
                            expected("float", &tok.literal),
                        ));
                        Err(())
                    }
                }
            }
            TokenType::Boolean => {
                self.advance();
                Ok(Expr::Boolean(self.meta_at(tok.line), tok.literal == "true"))
            }
            TokenType::Quote => self.parse_string(),
            TokenType::Identifier => self.parse_identifier_expr(),
            TokenType::LParen => {
                self.advance();
                let expr = self.parse_expression(0)?;
                self.expect(TokenType::RParen, describe(TokenType::RParen))?;
                Ok(expr)
            }
            TokenType::LBracket => self.parse_array_literal(),
            TokenType::Plus => {
                self.advance();
                let right = self.parse_expression(PREC_PREFIX)?;
                Ok(Expr::Prefix(self.meta_at(tok.line), PrefixOp::Plus, Box::new(right)))
            }
            TokenType::Minus => {
                self.advance();
                let right = self.parse_expression(PREC_PREFIX)?;
                Ok(Expr::Prefix(self.meta_at(tok.line), PrefixOp::Minus, Box::new(right)))
            }
            TokenType::Not => {
                self.advance();
                let right = self.parse_expression(PREC_PREFIX)?;
                Ok(Expr::Prefix(self.meta_at(tok.line), PrefixOp::Not, Box::new(right)))
            }
            _ => {
                let literal = if tok.token_type == TokenType::Eof { "EOF".to_string() } else { tok.literal };
                self.diagnostics.push(Diagnostic::syntax(
                    Rc::clone(&self.filename),
                    tok.line,
                    not_a_valid_prefix_operator(&literal),
                ));
                Err(())
            }
        }
    }

    fn parse_string(&mut self) -> Result<Expr, ()> {
        let start = self.advance();
        let mut text = String::new();
        loop {
            if self.is_at_end() {
                self.diagnostics.push(Diagnostic::syntax(
                    Rc::clone(&self.filename),
                    start.line,
                    unexpected_eof_at_line(start.line),
                ));
                return Err(());
            }
            let tok = self.peek().clone();
            if tok.token_type == TokenType::Quote {
                self.advance();
                break;
            }
            text.push_str(&tok.literal);
            self.advance();
        }
        Ok(Expr::StringLit(self.meta_at(start.line), text))
    }

    fn parse_identifier_expr(&mut self) -> Result<Expr, ()> {
        let tok = self.advance();
        let meta = self.meta_at(tok.line);
        match self.peek().token_type {
            TokenType::LParen => {
                self.advance();
                let args = self.parse_arguments()?;
                Ok(Expr::FunctionCall(meta, tok.literal, args))
            }
            TokenType::LBracket => {
                self.advance();
                let index = self.parse_expression(0)?;
                self.expect(TokenType::RBracket, describe(TokenType::RBracket))?;
                Ok(Expr::ArrayIndex(meta, tok.literal, Box::new(index)))
            }
            _ => Ok(Expr::Identifier(meta, tok.literal)),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ()> {
        let mut args = Vec::new();
        if self.check(TokenType::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression(0)?);
            if self.check(TokenType::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        self.expect(TokenType::RParen, describe(TokenType::RParen))?;
        Ok(args)
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ()> {
        let start = self.advance();
        let elems = self.parse_array_elements()?;
        Ok(Expr::ArrayLiteral(self.meta_at(start.line), elems))
    }

    fn parse_array_elements(&mut self) -> Result<Vec<Expr>, ()> {
        let mut elems = Vec::new();
        if self.check(TokenType::RBracket) {
            self.advance();
            return Ok(elems);
        }
        loop {
            elems.push(self.parse_expression(0)?);
            if self.check(TokenType::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        self.expect(TokenType::RBracket, describe(TokenType::RBracket))?;
        Ok(elems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_of(src: &str) -> usize {
        let parser = Parser::new(src, "test.txt");
        let (_program, diagnostics) = parser.parse();
        diagnostics.len()
    }

    #[test]
    fn empty_file_is_one_syntax_error() {
        assert_eq!(errors_of(""), 1);
    }

    #[test]
    fn missing_equals_is_one_error() {
        assert_eq!(errors_of("var x == 3;"), 1);
    }

    #[test]
    fn return_of_invalid_expression_then_stray_semicolon_is_two_errors() {
        assert_eq!(errors_of("return var x == 2;;"), 2);
    }

    #[test]
    fn func_decl_missing_name_is_one_error() {
        assert_eq!(errors_of("func (2<3){ var x=000;};"), 1);
    }

    #[test]
    fn trailing_comma_in_parameters_is_one_error() {
        assert_eq!(errors_of("func add(a,b,c,){return a+b+c;};"), 1);
    }

    #[test]
    fn precedence_matches_or_and_equals_compare_addsub_muldiv() {
        let parser = Parser::new("var r = false | true & 3 <= 5 | false;", "test.txt");
        let (program, diagnostics) = parser.parse();
        assert_eq!(diagnostics.len(), 0);
        let Stmt::VarDecl(_, _, expr) = &program.statements[0] else { panic!("expected var decl") };
        assert_eq!(expr.to_string(), "((false | (true & (3 <= 5))) | false)");
    }

    #[test]
    fn unary_binds_tighter_than_addsub() {
        let parser = Parser::new("var r = -2+3;", "test.txt");
        let (program, diagnostics) = parser.parse();
        assert_eq!(diagnostics.len(), 0);
        let Stmt::VarDecl(_, _, expr) = &program.statements[0] else { panic!("expected var decl") };
        assert_eq!(expr.to_string(), "((-2) + 3)");
    }

    #[test]
    fn round_trips_through_display_and_reparse() {
        let src = "var x = 1 + 2 * 3; func f(a, b) { return a + b; };";
        let parser = Parser::new(src, "test.txt");
        let (program, diagnostics) = parser.parse();
        assert_eq!(diagnostics.len(), 0);
        let printed = program.to_string();

        let reparsed = Parser::new(&printed, "test.txt");
        let (program2, diagnostics2) = reparsed.parse();
        assert_eq!(diagnostics2.len(), 0);
        assert_eq!(printed, program2.to_string());
    }

    #[test]
    fn hoists_func_decls_before_other_top_level_statements() {
        let src = "var a = 1; func f() { return 1; }; var b = 2;";
        let parser = Parser::new(src, "test.txt");
        let (program, diagnostics) = parser.parse();
        assert_eq!(diagnostics.len(), 0);
        assert!(matches!(program.statements[0], Stmt::FuncDecl(..)));
    }

    #[test]
    fn string_literal_with_internal_whitespace_round_trips() {
        let parser = Parser::new("var x = \"hi there\";", "test.txt");
        let (program, diagnostics) = parser.parse();
        assert_eq!(diagnostics.len(), 0);
        let Stmt::VarDecl(_, _, Expr::StringLit(_, text)) = &program.statements[0] else {
            panic!("expected string literal")
        };
        assert_eq!(text, "hi there");
    }
}
