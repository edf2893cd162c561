use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/* The lexer turns raw source text into a lazy sequence of tokens, one
`next_token()` call at a time. It never fails outright: an unrecognised
byte becomes an `Illegal` token carrying the offending character, and
deciding whether that is an error is left to the parser.

Multi-character operators (`==`, `!=`, `<=`, `>=`) are recognised with one
character of lookahead. Everything else is either a fixed single character
or a maximal run of letters/digits.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Eof,
    Illegal,

    // keywords
    Func,
    Var,
    If,
    Else,
    Return,
    While,

    // arithmetic
    Plus,
    Minus,
    Star,
    Slash,

    // comparison
    Lt,
    LtEq,
    Gt,
    GtEq,
    EqEq,
    NotEq,

    // logical
    And,
    Or,
    Not,

    // assignment
    Assign,

    // punctuation
    Semicolon,
    Comma,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Quote,

    // literal classes
    Identifier,
    Integer,
    Float,
    Boolean,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

static KEYWORDS: Lazy<HashMap<&'static str, TokenType>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("func", TokenType::Func);
    m.insert("var", TokenType::Var);
    m.insert("if", TokenType::If);
    m.insert("else", TokenType::Else);
    m.insert("return", TokenType::Return);
    m.insert("while", TokenType::While);
    m.insert("true", TokenType::Boolean);
    m.insert("false", TokenType::Boolean);
    m
});

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub line: usize,
    pub filename: Rc<str>,
}

impl Token {
    fn new(token_type: TokenType, literal: impl Into<String>, line: usize, filename: Rc<str>) -> Self {
        Self { token_type, literal: literal.into(), line, filename }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.token_type, self.literal)
    }
}

pub struct Lexer {
    source: Vec<char>,
    start: usize,
    current: usize,
    line: usize,
    filename: Rc<str>,
    /// toggled by an opening/closing `"`; while a string is open, whitespace
    /// is not skipped and becomes `Illegal` tokens the parser reassembles.
    in_string: bool,
}

impl Lexer {
    pub fn new(source: &str, filename: impl Into<Rc<str>>) -> Self {
        Self {
            source: source.chars().collect(),
            start: 0,
            current: 0,
            line: 1,
            filename: filename.into(),
            in_string: false,
        }
    }

    pub fn next_token(&mut self) -> Token {
        if !self.in_string {
            self.skip_whitespace();
        }
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenType::Eof, "");
        }

        let c = self.advance();
        let token = match c {
            '"' => {
                self.in_string = !self.in_string;
                self.make_token(TokenType::Quote, "\"")
            }
            '+' => self.make_token(TokenType::Plus, "+"),
            '-' => self.make_token(TokenType::Minus, "-"),
            '*' => self.make_token(TokenType::Star, "*"),
            '/' => self.make_token(TokenType::Slash, "/"),
            ';' => self.make_token(TokenType::Semicolon, ";"),
            ',' => self.make_token(TokenType::Comma, ","),
            '(' => self.make_token(TokenType::LParen, "("),
            ')' => self.make_token(TokenType::RParen, ")"),
            '{' => self.make_token(TokenType::LBrace, "{"),
            '}' => self.make_token(TokenType::RBrace, "}"),
            '[' => self.make_token(TokenType::LBracket, "["),
            ']' => self.make_token(TokenType::RBracket, "]"),
            '&' => self.make_token(TokenType::And, "&"),
            '|' => self.make_token(TokenType::Or, "|"),
            '=' => {
                if self.match_char('=') {
                    self.make_token(TokenType::EqEq, "==")
                } else {
                    self.make_token(TokenType::Assign, "=")
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.make_token(TokenType::NotEq, "!=")
                } else {
                    self.make_token(TokenType::Not, "!")
                }
            }
            '<' => {
                if self.match_char('=') {
                    self.make_token(TokenType::LtEq, "<=")
                } else {
                    self.make_token(TokenType::Lt, "<")
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.make_token(TokenType::GtEq, ">=")
                } else {
                    self.make_token(TokenType::Gt, ">")
                }
            }
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            c => self.make_token(TokenType::Illegal, c.to_string()),
        };

        log::trace!("lexed {:?} {:?} @{}", token.token_type, token.literal, token.line);
        token
    }

    fn number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        if is_float {
            self.make_token(TokenType::Float, text)
        } else {
            self.make_token(TokenType::Integer, text)
        }
    }

    fn identifier(&mut self) -> Token {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let token_type = KEYWORDS.get(text.as_str()).copied().unwrap_or(TokenType::Identifier);
        self.make_token(token_type, text)
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                _ => return,
            }
        }
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
        }
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn peek(&self) -> char {
        *self.source.get(self.current).unwrap_or(&'\0')
    }

    fn peek_next(&self) -> char {
        *self.source.get(self.current + 1).unwrap_or(&'\0')
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn make_token(&self, token_type: TokenType, literal: impl Into<String>) -> Token {
        Token::new(token_type, literal, self.line, Rc::clone(&self.filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_of(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src, "test.txt");
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            let done = tok.token_type == TokenType::Eof;
            out.push(tok);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn ends_with_eof() {
        let toks = tokens_of("var x = 1;");
        assert_eq!(toks.last().unwrap().token_type, TokenType::Eof);
    }

    #[test]
    fn empty_input_is_immediately_eof() {
        let toks = tokens_of("");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].token_type, TokenType::Eof);
    }

    #[test]
    fn true_false_are_boolean_tokens() {
        let toks = tokens_of("true false maybe");
        assert_eq!(toks[0].token_type, TokenType::Boolean);
        assert_eq!(toks[1].token_type, TokenType::Boolean);
        assert_eq!(toks[2].token_type, TokenType::Identifier);
    }

    #[test]
    fn two_char_operators_are_not_split() {
        let toks = tokens_of("a == b != c");
        assert_eq!(toks[1].token_type, TokenType::EqEq);
        assert_eq!(toks[1].literal, "==");
        assert_eq!(toks[3].token_type, TokenType::NotEq);
        assert_eq!(toks[3].literal, "!=");
    }

    #[test]
    fn float_literal_requires_digit_after_dot() {
        let toks = tokens_of("3.14 5.");
        assert_eq!(toks[0].token_type, TokenType::Float);
        assert_eq!(toks[0].literal, "3.14");
        // `5.` has no digit after the dot: `5` then a trailing illegal `.`.
        assert_eq!(toks[1].token_type, TokenType::Integer);
        assert_eq!(toks[1].literal, "5");
        assert_eq!(toks[2].token_type, TokenType::Illegal);
    }

    #[test]
    fn string_literal_preserves_internal_whitespace() {
        let toks = tokens_of("\"hi there\"");
        // Quote, Identifier("hi"), Illegal(" "), Identifier("there"), Quote
        assert_eq!(toks[0].token_type, TokenType::Quote);
        assert_eq!(toks[1].literal, "hi");
        assert_eq!(toks[2].token_type, TokenType::Illegal);
        assert_eq!(toks[2].literal, " ");
        assert_eq!(toks[3].literal, "there");
        assert_eq!(toks[4].token_type, TokenType::Quote);
    }

    #[test]
    fn illegal_character_is_carried_not_fatal() {
        let toks = tokens_of("@");
        assert_eq!(toks[0].token_type, TokenType::Illegal);
        assert_eq!(toks[0].literal, "@");
    }

    proptest::proptest! {
        #[test]
        fn always_terminates_with_eof(src in "[a-zA-Z0-9_ \t;,(){}\\[\\]+\\-*/<>=!&|]{0,64}") {
            let toks = tokens_of(&src);
            proptest::prop_assert_eq!(toks.last().unwrap().token_type, TokenType::Eof);
        }
    }
}
