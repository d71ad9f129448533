//! Scalar expression language used to describe surfaces `z = f(x, y)`.
//!
//! Everything outside this module talks to evaluators through [`Function`] and to parsers
//! through [`FunctionParser`], so a different expression engine can be plugged in without
//! touching the mesh pipeline.

use logos::Logos;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;

/// Named variable values handed to [`Function::evaluate`].
pub trait VariableSource {
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl VariableSource for HashMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        if let Some(v) = self.get(name) {
            return Some(*v);
        }
        // Axis names resolve regardless of case.
        if name.eq_ignore_ascii_case("x") || name.eq_ignore_ascii_case("y") {
            return self.get(&name.to_ascii_lowercase()).copied();
        }
        None
    }
}

/// A single `(x, y)` sample location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisPoint {
    pub x: f64,
    pub y: f64,
}

impl VariableSource for AxisPoint {
    fn lookup(&self, name: &str) -> Option<f64> {
        if name.eq_ignore_ascii_case("x") {
            Some(self.x)
        } else if name.eq_ignore_ascii_case("y") {
            Some(self.y)
        } else {
            None
        }
    }
}

/// An evaluable scalar function. Unknown variables evaluate as `0.0`.
pub trait Function: Send + Sync {
    fn evaluate(&self, vars: &dyn VariableSource) -> f64;
}

/// Adapts a plain closure `f(x, y)` to [`Function`].
pub struct XyFn<F>(pub F);

impl<F> Function for XyFn<F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn evaluate(&self, vars: &dyn VariableSource) -> f64 {
        let x = vars.lookup("x").unwrap_or(0.0);
        let y = vars.lookup("y").unwrap_or(0.0);
        (self.0)(x, y)
    }
}

/// Turns source text into an evaluator.
pub trait FunctionParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Arc<dyn Function>, ParseError>;
}

/// The built-in expression parser.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpressionParser;

impl FunctionParser for ExpressionParser {
    fn parse(&self, text: &str) -> Result<Arc<dyn Function>, ParseError> {
        Ok(Arc::new(parse(text)?))
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
#[error("{description} (at offset {offset})")]
pub struct ParseError {
    pub description: String,
    /// Byte offset into the source text.
    pub offset: usize,
}

impl ParseError {
    fn new(description: impl Into<String>, offset: usize) -> Self {
        Self {
            description: description.into(),
            offset,
        }
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token {
    #[regex(r"([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Func1 {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Log,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Round,
    Sign,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Func2 {
    Min,
    Max,
    Atan2,
    Pow,
}

enum Builtin {
    Unary(Func1),
    Binary(Func2),
}

fn builtin(name: &str) -> Option<Builtin> {
    use Builtin::*;
    let f = match name.to_ascii_lowercase().as_str() {
        "sin" => Unary(Func1::Sin),
        "cos" => Unary(Func1::Cos),
        "tan" => Unary(Func1::Tan),
        "asin" => Unary(Func1::Asin),
        "acos" => Unary(Func1::Acos),
        "atan" => Unary(Func1::Atan),
        "sinh" => Unary(Func1::Sinh),
        "cosh" => Unary(Func1::Cosh),
        "tanh" => Unary(Func1::Tanh),
        "exp" => Unary(Func1::Exp),
        "ln" => Unary(Func1::Ln),
        "log" => Unary(Func1::Log),
        "sqrt" => Unary(Func1::Sqrt),
        "abs" => Unary(Func1::Abs),
        "floor" => Unary(Func1::Floor),
        "ceil" => Unary(Func1::Ceil),
        "round" => Unary(Func1::Round),
        "sign" => Unary(Func1::Sign),
        "min" => Binary(Func2::Min),
        "max" => Binary(Func2::Max),
        "atan2" => Binary(Func2::Atan2),
        "pow" => Binary(Func2::Pow),
        _ => return None,
    };
    Some(f)
}

fn constant(name: &str) -> Option<f64> {
    match name.to_ascii_lowercase().as_str() {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Num(f64),
    Var(String),
    Neg(Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    Call1(Func1, Box<Node>),
    Call2(Func2, Box<Node>, Box<Node>),
}

impl Node {
    fn eval(&self, vars: &dyn VariableSource) -> f64 {
        match self {
            Node::Num(v) => *v,
            Node::Var(name) => vars.lookup(name).unwrap_or(0.0),
            Node::Neg(inner) => -inner.eval(vars),
            Node::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(vars), rhs.eval(vars));
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Pow => a.powf(b),
                }
            }
            Node::Call1(f, arg) => {
                let v = arg.eval(vars);
                match f {
                    Func1::Sin => v.sin(),
                    Func1::Cos => v.cos(),
                    Func1::Tan => v.tan(),
                    Func1::Asin => v.asin(),
                    Func1::Acos => v.acos(),
                    Func1::Atan => v.atan(),
                    Func1::Sinh => v.sinh(),
                    Func1::Cosh => v.cosh(),
                    Func1::Tanh => v.tanh(),
                    Func1::Exp => v.exp(),
                    Func1::Ln => v.ln(),
                    Func1::Log => v.log10(),
                    Func1::Sqrt => v.sqrt(),
                    Func1::Abs => v.abs(),
                    Func1::Floor => v.floor(),
                    Func1::Ceil => v.ceil(),
                    Func1::Round => v.round(),
                    Func1::Sign => {
                        if v == 0.0 || v.is_nan() {
                            v
                        } else {
                            v.signum()
                        }
                    }
                }
            }
            Node::Call2(f, a, b) => {
                let (a, b) = (a.eval(vars), b.eval(vars));
                match f {
                    Func2::Min => a.min(b),
                    Func2::Max => a.max(b),
                    Func2::Atan2 => a.atan2(b),
                    Func2::Pow => a.powf(b),
                }
            }
        }
    }
}

/// A parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Convenience evaluation at a single `(x, y)` location.
    pub fn eval_xy(&self, x: f64, y: f64) -> f64 {
        self.root.eval(&AxisPoint { x, y })
    }
}

impl Function for Expression {
    fn evaluate(&self, vars: &dyn VariableSource) -> f64 {
        self.root.eval(vars)
    }
}

/// Deepest allowed nesting of parentheses, calls, signs and exponents.
pub const MAX_NESTING: usize = 256;

/// Longest accepted expression, in tokens. Bounds the depth of the evaluated tree.
pub const MAX_TOKENS: usize = 4096;

/// Parse `text` with the built-in grammar.
pub fn parse(text: &str) -> Result<Expression, ParseError> {
    let tokens = tokenize(text)?;
    if let Some((_, span)) = tokens.get(MAX_TOKENS) {
        return Err(ParseError::new(
            format!("expression is longer than {MAX_TOKENS} tokens"),
            span.start,
        ));
    }
    let mut parser = Parser {
        src: text,
        tokens,
        pos: 0,
        depth: 0,
    };
    let root = parser.parse_expr()?;
    if let Some((_, span)) = parser.tokens.get(parser.pos) {
        return Err(ParseError::new(
            format!("unexpected '{}'", &text[span.clone()]),
            span.start,
        ));
    }
    Ok(Expression {
        source: text.to_string(),
        root,
    })
}

fn tokenize(text: &str) -> Result<Vec<(Token, Range<usize>)>, ParseError> {
    let mut out = Vec::new();
    let mut lex = Token::lexer(text);
    while let Some(tok) = lex.next() {
        let span = lex.span();
        match tok {
            Ok(t) => out.push((t, span)),
            Err(()) => {
                return Err(ParseError::new(
                    format!("unexpected character '{}'", lex.slice()),
                    span.start,
                ));
            }
        }
    }
    Ok(out)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    /// Offset used for error reporting: the current token, or the end of input.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.start)
            .unwrap_or(self.src.len())
    }

    fn advance(&mut self) -> Option<(Token, Range<usize>)> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Token, what: &str) -> Result<(), ParseError> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(ParseError::new(format!("expected {what}"), self.offset()))
        }
    }

    /// Run `f` one nesting level deeper, failing once [`MAX_NESTING`] is exceeded.
    fn nested<T>(
        &mut self,
        at: usize,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new("expression nested too deeply", at));
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn parse_expr(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_term(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let (op, rhs) = match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    (BinOp::Mul, self.parse_unary()?)
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    (BinOp::Div, self.parse_unary()?)
                }
                // Juxtaposition: `2x`, `3(x+1)`, `x y`.
                Some(Token::Number(_)) | Some(Token::Ident) | Some(Token::LParen) => {
                    (BinOp::Mul, self.parse_power()?)
                }
                _ => return Ok(lhs),
            };
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        let at = self.offset();
        if self.eat(Token::Minus) {
            let inner = self.nested(at, Self::parse_unary)?;
            return Ok(Node::Neg(Box::new(inner)));
        }
        if self.eat(Token::Plus) {
            return self.nested(at, Self::parse_unary);
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Node, ParseError> {
        let base = self.parse_primary()?;
        let at = self.offset();
        if self.eat(Token::Caret) {
            // Right associative; the exponent may carry its own sign.
            let exp = self.nested(at, Self::parse_unary)?;
            return Ok(Node::Binary(BinOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let offset = self.offset();
        let Some((tok, span)) = self.advance() else {
            return Err(ParseError::new("unexpected end of expression", offset));
        };
        match tok {
            Token::Number(v) => Ok(Node::Num(v)),
            Token::LParen => {
                let inner = self.nested(span.start, Self::parse_expr)?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Ident => {
                let name = &self.src[span.clone()];
                if let Some(f) = builtin(name) {
                    return self.parse_call(name, f, span.start);
                }
                if let Some(v) = constant(name) {
                    return Ok(Node::Num(v));
                }
                let is_axis = name.eq_ignore_ascii_case("x") || name.eq_ignore_ascii_case("y");
                if !is_axis && self.peek() == Some(Token::LParen) {
                    return Err(ParseError::new(
                        format!("unknown function '{name}'"),
                        span.start,
                    ));
                }
                Ok(Node::Var(name.to_string()))
            }
            _ => Err(ParseError::new(
                format!("unexpected '{}'", &self.src[span.clone()]),
                span.start,
            )),
        }
    }

    fn parse_call(&mut self, name: &str, f: Builtin, at: usize) -> Result<Node, ParseError> {
        if self.peek() != Some(Token::LParen) {
            return Err(ParseError::new(format!("expected '(' after '{name}'"), at));
        }
        self.pos += 1;
        let mut args = Vec::new();
        if self.peek() != Some(Token::RParen) {
            args.push(self.nested(at, Self::parse_expr)?);
            while self.eat(Token::Comma) {
                args.push(self.nested(at, Self::parse_expr)?);
            }
        }
        self.expect(Token::RParen, "')'")?;

        let wanted = match f {
            Builtin::Unary(_) => 1,
            Builtin::Binary(_) => 2,
        };
        if args.len() != wanted {
            return Err(ParseError::new(
                format!("'{name}' takes {wanted} argument(s), got {}", args.len()),
                at,
            ));
        }
        let mut args = args.into_iter();
        let mut next = || Box::new(args.next().unwrap_or(Node::Num(0.0)));
        Ok(match f {
            Builtin::Unary(f) => Node::Call1(f, next()),
            Builtin::Binary(f) => {
                let a = next();
                let b = next();
                Node::Call2(f, a, b)
            }
        })
    }
}
