//! # Expression Module
//!
//! A restricted arithmetic grammar used for both the `=` key and graph
//! sampling. Text is tokenized, parsed by recursive descent into an [`Expr`]
//! tree and evaluated against a [`Scope`] of variable bindings.
//!
//! ## Grammar (lowest to highest precedence)
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary (('^' | '**') unary)?
//! primary := number | name | name '(' expr ')' | '(' expr ')'
//! ```
//!
//! Input is capped at [`MAX_TOKENS`] tokens and [`MAX_NESTING`] levels.
//!
//! Exponentiation is right associative and binds tighter than unary minus,
//! so `-2^2` is `-4` and `2^3^2` is `512`.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected '{found}' at position {position}")]
    UnexpectedToken { found: String, position: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("unknown name '{0}'")]
    UnknownName(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
    #[error("expression is too long")]
    TooLong,
    #[error("expression is nested too deeply")]
    TooDeep,
}

impl ExprError {
    /// True for failures that depend on the operand values rather than on
    /// the text itself. A plot turns these into gaps instead of failing.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ExprError::DivisionByZero | ExprError::NonFinite)
    }
}

/// Longest token sequence accepted by [`parse`].
pub const MAX_TOKENS: usize = 4096;

/// Deepest nesting of brackets, signs and exponents accepted by [`parse`].
pub const MAX_NESTING: usize = 256;

/// Signature shared by all allow-listed functions.
type UnaryFn = fn(f64) -> f64;

/// Allow-listed unary functions. `log` is base 10, `ln` is natural.
static FUNCTIONS: Lazy<BTreeMap<&'static str, UnaryFn>> = Lazy::new(|| {
    let table: [(&'static str, UnaryFn); 11] = [
        ("sinh", f64::sinh),
        ("cosh", f64::cosh),
        ("tanh", f64::tanh),
        ("log", f64::log10),
        ("ln", f64::ln),
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
        ("sqrt", f64::sqrt),
        ("exp", f64::exp),
        ("abs", f64::abs),
    ];
    table.into_iter().collect()
});

/// Named constants, resolved while parsing.
fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

/// Returns true if `name` is one of the allow-listed functions.
pub fn is_function(name: &str) -> bool {
    FUNCTIONS.contains_key(name.to_lowercase().as_str())
}

/// A resolved call target from the function table.
#[derive(Clone, Copy)]
pub struct Function {
    name: &'static str,
    apply: UnaryFn,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        FUNCTIONS
            .get_key_value(name)
            .map(|(name, apply)| Function {
                name: *name,
                apply: *apply,
            })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        function: Function,
        argument: Box<Expr>,
    },
}

/// Variable bindings visible to an evaluation. Names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: BTreeMap<String, f64>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.variables.insert(name.to_lowercase(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.variables.get(name).copied()
    }
}

impl Expr {
    /// Evaluates the tree. Every intermediate result must be finite.
    pub fn eval(&self, scope: &Scope) -> Result<f64, ExprError> {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Variable(name) => scope
                .get(name)
                .ok_or_else(|| ExprError::UnknownName(name.clone()))?,
            Expr::Negate(inner) => -inner.eval(scope)?,
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.eval(scope)?;
                let b = rhs.eval(scope)?;
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Subtract => a - b,
                    BinaryOp::Multiply => a * b,
                    BinaryOp::Divide => {
                        if b == 0.0 {
                            return Err(ExprError::DivisionByZero);
                        }
                        a / b
                    }
                    BinaryOp::Power => {
                        if a == 0.0 && b < 0.0 {
                            return Err(ExprError::DivisionByZero);
                        }
                        a.powf(b)
                    }
                }
            }
            Expr::Call { function, argument } => (function.apply)(argument.eval(scope)?),
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExprError::NonFinite)
        }
    }
}

/// Parses and evaluates `input` with no variables bound.
pub fn evaluate(input: &str) -> Result<f64, ExprError> {
    parse(input)?.eval(&Scope::new())
}

/// Parses `input` into an expression tree.
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(ExprError::TooLong);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(token.unexpected()),
    }
}

/// Formats a result so that it reads naturally and parses back.
///
/// Integral values print without a fraction (`4`, not `4.0`); very large
/// or very small magnitudes use `e` notation.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if value.fract() == 0.0 && magnitude < 1e16 {
        format!("{}", value as i64)
    } else if magnitude >= 1e16 || magnitude < 1e-6 {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LeftParen,
    RightParen,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    text: String,
    position: usize,
}

impl Token {
    fn unexpected(&self) -> ExprError {
        ExprError::UnexpectedToken {
            found: self.text.clone(),
            position: self.position,
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let kind = if c.is_ascii_digit() || c == '.' {
            i = scan_number(&chars, i);
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| ExprError::InvalidNumber(text.clone()))?;
            TokenKind::Number(value)
        } else if c.is_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            TokenKind::Name(name.to_lowercase())
        } else {
            i += 1;
            match c {
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' if chars.get(i) == Some(&'*') => {
                    i += 1;
                    TokenKind::Caret
                }
                '*' | '×' => TokenKind::Star,
                '/' | '÷' => TokenKind::Slash,
                '^' => TokenKind::Caret,
                '(' => TokenKind::LeftParen,
                ')' => TokenKind::RightParen,
                other => {
                    return Err(ExprError::UnexpectedToken {
                        found: other.to_string(),
                        position: start,
                    });
                }
            }
        };

        tokens.push(Token {
            kind,
            text: chars[start..i].iter().collect(),
            position: start,
        });
    }

    Ok(tokens)
}

/// Returns the index just past a numeric literal starting at `start`.
/// An exponent marker is only consumed when digits follow it, so `2e`
/// stays a number followed by the constant `e`.
fn scan_number(chars: &[char], start: usize) -> usize {
    let mut i = start;
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
        i += 1;
    }

    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn next(&mut self) -> Result<Token, ExprError> {
        let token = self.tokens.get(self.pos).cloned().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ExprError> {
        let token = self.next()?;
        if token.kind == kind {
            Ok(())
        } else {
            Err(token.unexpected())
        }
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Subtract,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Multiply,
                Some(TokenKind::Slash) => BinaryOp::Divide,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    /// Every recursive path of the grammar passes through here, so this is
    /// where nesting is bounded.
    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.depth >= MAX_NESTING {
            return Err(ExprError::TooDeep);
        }
        self.depth += 1;
        let result = self.signed();
        self.depth -= 1;
        result
    }

    fn signed(&mut self) -> Result<Expr, ExprError> {
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                Ok(Expr::Negate(Box::new(self.unary()?)))
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.primary()?;
        if let Some(TokenKind::Caret) = self.peek_kind() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(binary(BinaryOp::Power, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::LeftParen => {
                let inner = self.expr()?;
                self.expect(TokenKind::RightParen)?;
                Ok(inner)
            }
            TokenKind::Name(ref name) => {
                let followed_by_paren = matches!(self.peek_kind(), Some(TokenKind::LeftParen));
                if followed_by_paren {
                    let function = Function::lookup(name)
                        .ok_or_else(|| ExprError::UnknownFunction(name.clone()))?;
                    self.pos += 1;
                    let argument = self.expr()?;
                    self.expect(TokenKind::RightParen)?;
                    Ok(Expr::Call {
                        function,
                        argument: Box::new(argument),
                    })
                } else if FUNCTIONS.contains_key(name.as_str()) {
                    // A function name must be applied.
                    match self.peek() {
                        Some(next) => Err(next.unexpected()),
                        None => Err(ExprError::UnexpectedEnd),
                    }
                } else if let Some(value) = constant(name) {
                    Ok(Expr::Number(value))
                } else {
                    Ok(Expr::Variable(name.clone()))
                }
            }
            _ => Err(token.unexpected()),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(input: &str) -> f64 {
        evaluate(input).unwrap()
    }

    #[test]
    fn respects_precedence_and_associativity() {
        assert_eq!(eval("2+3*4"), 14.0);
        assert_eq!(eval("(2+3)*4"), 20.0);
        assert_eq!(eval("2^3^2"), 512.0);
        assert_eq!(eval("-2^2"), -4.0);
        assert_eq!(eval("2^-1"), 0.5);
        assert_eq!(eval("10-4-3"), 3.0);
        assert_eq!(eval("2**3"), 8.0);
        assert_eq!(eval("8/2/2"), 2.0);
    }

    #[test]
    fn evaluates_functions_and_constants() {
        assert!((eval("log(1000)") - 3.0).abs() < 1e-12);
        assert_eq!(eval("ln(1)"), 0.0);
        assert_eq!(eval("sinh(0)+cosh(0)"), 1.0);
        assert_eq!(eval("tanh(0)"), 0.0);
        assert!((eval("2*pi") - std::f64::consts::TAU).abs() < 1e-12);
        assert!((eval("LN(e)") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn accepts_number_forms() {
        assert_eq!(eval(".5+0.25"), 0.75);
        assert_eq!(eval("1e3"), 1000.0);
        assert_eq!(eval("2.5E-1"), 0.25);
        assert_eq!(eval(" 1 +\t2 "), 3.0);
    }

    #[test]
    fn reports_syntax_errors() {
        assert_eq!(evaluate(""), Err(ExprError::Empty));
        assert_eq!(evaluate("   "), Err(ExprError::Empty));
        assert_eq!(evaluate("2+"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("(1+2"), Err(ExprError::UnexpectedEnd));
        assert!(matches!(
            evaluate("1+2)"),
            Err(ExprError::UnexpectedToken { position: 3, .. })
        ));
        assert!(matches!(
            evaluate("2 $ 3"),
            Err(ExprError::UnexpectedToken { ref found, position: 2 }) if found == "$"
        ));
        assert_eq!(evaluate("1..2"), Err(ExprError::InvalidNumber("1..2".into())));
        assert_eq!(evaluate("sinh"), Err(ExprError::UnexpectedEnd));
    }

    #[test]
    fn reports_unknown_names() {
        assert_eq!(
            evaluate("foo(1)"),
            Err(ExprError::UnknownFunction("foo".into()))
        );
        assert_eq!(evaluate("x+1"), Err(ExprError::UnknownName("x".into())));
        assert_eq!(
            evaluate("import os"),
            Err(ExprError::UnexpectedToken { found: "os".into(), position: 7 })
        );
    }

    #[test]
    fn reports_numeric_errors() {
        assert_eq!(evaluate("1/0"), Err(ExprError::DivisionByZero));
        assert_eq!(evaluate("1/(2-2)"), Err(ExprError::DivisionByZero));
        assert_eq!(evaluate("0^-1"), Err(ExprError::DivisionByZero));
        assert_eq!(evaluate("ln(-1)"), Err(ExprError::NonFinite));
        assert_eq!(evaluate("10^400"), Err(ExprError::NonFinite));
        assert!(ExprError::NonFinite.is_numeric());
        assert!(!ExprError::UnexpectedEnd.is_numeric());
    }

    #[test]
    fn rejects_runaway_nesting() {
        assert_eq!(evaluate(&"(".repeat(100_000)), Err(ExprError::TooLong));
        assert_eq!(evaluate(&"(".repeat(1_000)), Err(ExprError::TooDeep));
        assert_eq!(evaluate(&format!("{}1", "-".repeat(1_000))), Err(ExprError::TooDeep));
        assert_eq!(evaluate(&"2^".repeat(1_000)), Err(ExprError::TooDeep));
        assert!(!ExprError::TooDeep.is_numeric());

        let nested = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&nested), Ok(1.0));
    }

    #[test]
    fn rejects_overlong_chains() {
        let chain = vec!["1"; MAX_TOKENS].join("+");
        assert_eq!(evaluate(&chain), Err(ExprError::TooLong));
        let chain = vec!["1"; MAX_TOKENS / 2].join("+");
        assert_eq!(evaluate(&chain), Ok((MAX_TOKENS / 2) as f64));
    }

    #[test]
    fn binds_variables_from_scope() {
        let expr = parse("x^2 + 2*X").unwrap();
        let scope = Scope::new().with("x", 3.0);
        assert_eq!(expr.eval(&scope), Ok(15.0));
    }

    #[test]
    fn formats_results() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-4.0), "-4");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(3.5), "3.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e20), "1e20");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
    }

    #[test]
    fn formatted_results_parse_back() {
        for value in [4.0, -3.5, 1e20, 1.5e-7, 123456.789] {
            assert_eq!(evaluate(&format_number(value)), Ok(value));
        }
    }
}
