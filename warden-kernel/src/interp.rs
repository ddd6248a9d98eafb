//! Snippet grammar: tokenizer, parser, and evaluator.
//!
//! The kernel speaks a deliberately small, language-neutral statement
//! grammar over JSON values:
//!
//! ```text
//! stmt  := IDENT '=' expr        assignment
//!        | 'del' IDENT           removal
//!        | 'print' '(' expr ')'  stdout
//!        | expr                  rendered as an execute_result
//! expr  := term (('+' | '-') term)*
//! term  := factor (('*' | '/') factor)*
//! factor:= '-' factor | '(' expr ')' | literal | IDENT | list | dict
//! ```
//!
//! Literals are JSON: numbers, double- or single-quoted strings, `true`,
//! `false`, `null`, `[...]`, `{...}`. Statements are separated by newlines
//! or `;`; `#` starts a comment. The whole snippet is parsed before any
//! statement runs, so a syntax error never has partial effects.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A parsed statement, tagged with its 1-based source line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Stmt {
    pub line: usize,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StmtKind {
    Assign(String, Expr),
    Delete(String),
    Print(Expr),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Name(String),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    List(Vec<Expr>),
    Dict(Vec<(String, Expr)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

/// Syntax error with its source line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParseError {
    pub message: String,
    pub line: usize,
}

/// Runtime error raised by a statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EvalError {
    pub kind: &'static str,
    pub message: String,
}

impl EvalError {
    fn name(name: &str) -> Self {
        Self {
            kind: "NameError",
            message: format!("name '{name}' is not defined"),
        }
    }

    fn type_error(message: impl Into<String>) -> Self {
        Self {
            kind: "TypeError",
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    Null,
    Plus,
    Minus,
    Star,
    Slash,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semi,
}

fn tokenize(line: &str, line_no: usize) -> Result<Vec<Tok>, ParseError> {
    let mut toks = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            '#' => break,
            '+' => {
                chars.next();
                toks.push(Tok::Plus);
            }
            '-' => {
                chars.next();
                toks.push(Tok::Minus);
            }
            '*' => {
                chars.next();
                toks.push(Tok::Star);
            }
            '/' => {
                chars.next();
                toks.push(Tok::Slash);
            }
            '=' => {
                chars.next();
                toks.push(Tok::Assign);
            }
            '(' => {
                chars.next();
                toks.push(Tok::LParen);
            }
            ')' => {
                chars.next();
                toks.push(Tok::RParen);
            }
            '[' => {
                chars.next();
                toks.push(Tok::LBracket);
            }
            ']' => {
                chars.next();
                toks.push(Tok::RBracket);
            }
            '{' => {
                chars.next();
                toks.push(Tok::LBrace);
            }
            '}' => {
                chars.next();
                toks.push(Tok::RBrace);
            }
            ',' => {
                chars.next();
                toks.push(Tok::Comma);
            }
            ':' => {
                chars.next();
                toks.push(Tok::Colon);
            }
            ';' => {
                chars.next();
                toks.push(Tok::Semi);
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(other) if other == quote || other == '\\' => s.push(other),
                            Some(other) => {
                                s.push('\\');
                                s.push(other);
                            }
                            None => {
                                return Err(ParseError {
                                    message: "unterminated string literal".into(),
                                    line: line_no,
                                })
                            }
                        },
                        Some(ch) if ch == quote => break,
                        Some(ch) => s.push(ch),
                        None => {
                            return Err(ParseError {
                                message: "unterminated string literal".into(),
                                line: line_no,
                            })
                        }
                    }
                }
                toks.push(Tok::Str(s));
            }
            c if c.is_ascii_digit() => {
                let mut num = String::new();
                let mut is_float = false;
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        num.push(d);
                        chars.next();
                    } else if d == '.' && !is_float {
                        is_float = true;
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if is_float {
                    let f = num.parse::<f64>().map_err(|_| ParseError {
                        message: format!("invalid number literal: {num}"),
                        line: line_no,
                    })?;
                    toks.push(Tok::Float(f));
                } else {
                    let i = num.parse::<i64>().map_err(|_| ParseError {
                        message: format!("invalid number literal: {num}"),
                        line: line_no,
                    })?;
                    toks.push(Tok::Int(i));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                toks.push(match ident.as_str() {
                    "true" => Tok::True,
                    "false" => Tok::False,
                    "null" => Tok::Null,
                    _ => Tok::Ident(ident),
                });
            }
            other => {
                return Err(ParseError {
                    message: format!("unexpected character: {other:?}"),
                    line: line_no,
                })
            }
        }
    }

    Ok(toks)
}

// ---------------------------------------------------------------------------
// Parser

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
    line: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let t = self.toks.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            line: self.line,
        }
    }

    fn expect(&mut self, tok: Tok, what: &str) -> Result<(), ParseError> {
        match self.next() {
            Some(t) if t == tok => Ok(()),
            Some(t) => Err(self.err(format!("expected {what}, found {t:?}"))),
            None => Err(self.err(format!("expected {what}, found end of line"))),
        }
    }

    /// One statement; stops at `;` or end of tokens.
    fn statement(&mut self) -> Result<StmtKind, ParseError> {
        // del NAME
        if let Some(Tok::Ident(id)) = self.peek() {
            if id == "del" {
                self.next();
                match self.next() {
                    Some(Tok::Ident(name)) => return Ok(StmtKind::Delete(name)),
                    _ => return Err(self.err("expected a name after 'del'")),
                }
            }
            if id == "print" && self.toks.get(self.pos + 1) == Some(&Tok::LParen) {
                self.next();
                self.next();
                let expr = self.expr()?;
                self.expect(Tok::RParen, "')'")?;
                return Ok(StmtKind::Print(expr));
            }
        }

        // NAME '=' expr
        if matches!(self.peek(), Some(Tok::Ident(_)))
            && self.toks.get(self.pos + 1) == Some(&Tok::Assign)
        {
            let Some(Tok::Ident(name)) = self.next() else {
                unreachable!("peeked an identifier");
            };
            self.next(); // '='
            let expr = self.expr()?;
            return Ok(StmtKind::Assign(name, expr));
        }

        Ok(StmtKind::Expr(self.expr()?))
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinOp::Add,
                Some(Tok::Minus) => BinOp::Sub,
                _ => break,
            };
            self.next();
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => BinOp::Mul,
                Some(Tok::Slash) => BinOp::Div,
                _ => break,
            };
            self.next();
            let rhs = self.factor()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(Tok::Minus) => Ok(Expr::Neg(Box::new(self.factor()?))),
            Some(Tok::LParen) => {
                let e = self.expr()?;
                self.expect(Tok::RParen, "')'")?;
                Ok(e)
            }
            Some(Tok::Int(i)) => Ok(Expr::Literal(Value::Number(i.into()))),
            Some(Tok::Float(f)) => Ok(Expr::Literal(
                Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            )),
            Some(Tok::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Tok::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Tok::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Tok::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Tok::Ident(name)) => Ok(Expr::Name(name)),
            Some(Tok::LBracket) => {
                let mut items = Vec::new();
                if self.peek() == Some(&Tok::RBracket) {
                    self.next();
                    return Ok(Expr::List(items));
                }
                loop {
                    items.push(self.expr()?);
                    match self.next() {
                        Some(Tok::Comma) => continue,
                        Some(Tok::RBracket) => break,
                        _ => return Err(self.err("expected ',' or ']' in list")),
                    }
                }
                Ok(Expr::List(items))
            }
            Some(Tok::LBrace) => {
                let mut entries = Vec::new();
                if self.peek() == Some(&Tok::RBrace) {
                    self.next();
                    return Ok(Expr::Dict(entries));
                }
                loop {
                    let key = match self.next() {
                        Some(Tok::Str(k)) => k,
                        _ => return Err(self.err("expected a string key in dict")),
                    };
                    self.expect(Tok::Colon, "':'")?;
                    entries.push((key, self.expr()?));
                    match self.next() {
                        Some(Tok::Comma) => continue,
                        Some(Tok::RBrace) => break,
                        _ => return Err(self.err("expected ',' or '}' in dict")),
                    }
                }
                Ok(Expr::Dict(entries))
            }
            Some(t) => Err(self.err(format!("unexpected token: {t:?}"))),
            None => Err(self.err("unexpected end of statement")),
        }
    }
}

/// Parse an entire snippet into statements. The whole snippet parses before
/// anything runs; a syntax error anywhere means no statement has effects.
pub(crate) fn parse(code: &str) -> Result<Vec<Stmt>, ParseError> {
    let mut stmts = Vec::new();

    for (idx, raw_line) in code.lines().enumerate() {
        let line_no = idx + 1;
        let toks = tokenize(raw_line, line_no)?;
        if toks.is_empty() {
            continue;
        }

        let mut parser = Parser {
            toks,
            pos: 0,
            line: line_no,
        };
        loop {
            // Swallow stray separators, allowing `a = 1;; b = 2`.
            while parser.peek() == Some(&Tok::Semi) {
                parser.next();
            }
            if parser.peek().is_none() {
                break;
            }
            let kind = parser.statement()?;
            stmts.push(Stmt {
                line: line_no,
                kind,
            });
            match parser.next() {
                Some(Tok::Semi) | None => continue,
                Some(t) => return Err(parser.err(format!("unexpected token after statement: {t:?}"))),
            }
        }
    }

    Ok(stmts)
}

/// Parse a snippet that must be exactly one expression (eval mode).
pub(crate) fn parse_expression(code: &str) -> Result<Expr, ParseError> {
    let stmts = parse(code)?;
    match <[Stmt; 1]>::try_from(stmts) {
        Ok([Stmt {
            kind: StmtKind::Expr(e),
            ..
        }]) => Ok(e),
        Ok([other]) => Err(ParseError {
            message: "eval mode expects a single expression".into(),
            line: other.line,
        }),
        Err(_) => Err(ParseError {
            message: "eval mode expects a single expression".into(),
            line: 1,
        }),
    }
}

// ---------------------------------------------------------------------------
// Evaluator

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

pub(crate) fn json_type_name(v: &Value) -> &'static str {
    type_name(v)
}

fn as_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or(0.0)
}

fn number(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn arith(op: BinOp, a: &Number, b: &Number) -> Result<Value, EvalError> {
    if op == BinOp::Div {
        let denom = as_f64(b);
        if denom == 0.0 {
            return Err(EvalError {
                kind: "ZeroDivisionError",
                message: "division by zero".into(),
            });
        }
        return Ok(number(as_f64(a) / denom));
    }
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        let r = match op {
            BinOp::Add => x.checked_add(y),
            BinOp::Sub => x.checked_sub(y),
            BinOp::Mul => x.checked_mul(y),
            BinOp::Div => unreachable!(),
        };
        if let Some(r) = r {
            return Ok(Value::Number(r.into()));
        }
    }
    let (x, y) = (as_f64(a), as_f64(b));
    Ok(match op {
        BinOp::Add => number(x + y),
        BinOp::Sub => number(x - y),
        BinOp::Mul => number(x * y),
        BinOp::Div => unreachable!(),
    })
}

/// Evaluate an expression against the namespace.
pub(crate) fn eval(expr: &Expr, ns: &BTreeMap<String, Value>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Name(name) => ns.get(name).cloned().ok_or_else(|| EvalError::name(name)),
        Expr::Neg(inner) => match eval(inner, ns)? {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Number((-i).into()))
                } else {
                    Ok(number(-as_f64(&n)))
                }
            }
            other => Err(EvalError::type_error(format!(
                "bad operand type for unary -: '{}'",
                type_name(&other)
            ))),
        },
        Expr::Binary(op, lhs, rhs) => {
            let (a, b) = (eval(lhs, ns)?, eval(rhs, ns)?);
            match (op, a, b) {
                (op, Value::Number(x), Value::Number(y)) => arith(*op, &x, &y),
                (BinOp::Add, Value::String(x), Value::String(y)) => Ok(Value::String(x + &y)),
                (BinOp::Add, Value::Array(mut x), Value::Array(y)) => {
                    x.extend(y);
                    Ok(Value::Array(x))
                }
                (op, a, b) => Err(EvalError::type_error(format!(
                    "unsupported operand types for {}: '{}' and '{}'",
                    op.symbol(),
                    type_name(&a),
                    type_name(&b)
                ))),
            }
        }
        Expr::List(items) => items
            .iter()
            .map(|e| eval(e, ns))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Dict(entries) => {
            let mut map = Map::new();
            for (k, e) in entries {
                map.insert(k.clone(), eval(e, ns)?);
            }
            Ok(Value::Object(map))
        }
    }
}

/// Compact rendering used for execute_result fragments and previews.
pub(crate) fn render(v: &Value) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "<unrenderable>".into())
}

/// Rendering used by `print`: strings go out raw, everything else compact.
pub(crate) fn render_for_print(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => render(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ns(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn eval_str(code: &str, ns: &BTreeMap<String, Value>) -> Result<Value, EvalError> {
        eval(&parse_expression(code).unwrap(), ns)
    }

    #[test]
    fn parses_assignment() {
        let stmts = parse("x = 1").unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0].kind, StmtKind::Assign(ref n, _) if n == "x"));
    }

    #[test]
    fn splits_on_semicolons_and_lines() {
        let stmts = parse("a = 1; b = 2\nc = 3").unwrap();
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0].line, 1);
        assert_eq!(stmts[1].line, 1);
        assert_eq!(stmts[2].line, 2);
    }

    #[test]
    fn comments_and_blanks_skip() {
        let stmts = parse("# setup\n\nx = 1  # trailing").unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].line, 3);
    }

    #[test]
    fn syntax_error_reports_line() {
        let err = parse("x = 1\ny = = 2").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn arithmetic_stays_integral() {
        assert_eq!(eval_str("2 + 3 * 4", &ns(&[])).unwrap(), json!(14));
        assert_eq!(eval_str("(2 + 3) * 4", &ns(&[])).unwrap(), json!(20));
    }

    #[test]
    fn division_is_float() {
        assert_eq!(eval_str("5 / 2", &ns(&[])).unwrap(), json!(2.5));
    }

    #[test]
    fn division_by_zero_raises() {
        let err = eval_str("1 / 0", &ns(&[])).unwrap_err();
        assert_eq!(err.kind, "ZeroDivisionError");
    }

    #[test]
    fn string_and_list_concat() {
        assert_eq!(
            eval_str("'ab' + 'cd'", &ns(&[])).unwrap(),
            json!("abcd")
        );
        assert_eq!(
            eval_str("[1] + [2, 3]", &ns(&[])).unwrap(),
            json!([1, 2, 3])
        );
    }

    #[test]
    fn mixed_operands_raise_type_error() {
        let err = eval_str("1 + 'a'", &ns(&[])).unwrap_err();
        assert_eq!(err.kind, "TypeError");
        assert!(err.message.contains("'int' and 'str'"));
    }

    #[test]
    fn names_resolve_from_namespace() {
        let namespace = ns(&[("x", json!(41))]);
        assert_eq!(eval_str("x + 1", &namespace).unwrap(), json!(42));
    }

    #[test]
    fn undefined_name_raises_name_error() {
        let err = eval_str("missing", &ns(&[])).unwrap_err();
        assert_eq!(err.kind, "NameError");
        assert_eq!(err.message, "name 'missing' is not defined");
    }

    #[test]
    fn containers_evaluate_elementwise() {
        let namespace = ns(&[("x", json!(2))]);
        assert_eq!(
            eval_str("[x, x * 2, {\"k\": x}]", &namespace).unwrap(),
            json!([2, 4, {"k": 2}])
        );
    }

    #[test]
    fn eval_mode_rejects_statements() {
        assert!(parse_expression("x = 1").is_err());
        assert!(parse_expression("1 + 1; 2").is_err());
    }

    #[test]
    fn print_renders_strings_raw() {
        assert_eq!(render_for_print(&json!("hi")), "hi");
        assert_eq!(render_for_print(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn strings_may_contain_separators() {
        let stmts = parse("x = 'a; b # c'").unwrap();
        assert_eq!(stmts.len(), 1);
        match &stmts[0].kind {
            StmtKind::Assign(_, Expr::Literal(Value::String(s))) => {
                assert_eq!(s, "a; b # c");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}
