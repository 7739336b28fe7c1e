//! Shared arithmetic-expression lexer, parser, and evaluator backing both
//! G4 (numeric check) and G5 (plot expression lexer). Only a closed
//! grammar of numbers, identifiers, named functions, and arithmetic/
//! comparison operators is representable — there is no way to express a
//! function call into the host language, so "dangerous pattern" rejection
//! falls out of the grammar itself rather than a denylist.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;

pub static ALLOWED_FUNCTIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "sin", "cos", "tan", "asin", "acos", "atan", "log", "ln", "exp", "sqrt", "abs", "floor",
        "ceil", "round",
    ]
    .into_iter()
    .collect()
});

pub static ALLOWED_CONSTANTS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["pi", "e"].into_iter().collect());

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    LParen,
    RParen,
    Comma,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    Ne,
}

/// Tokenize `source`, rejecting any character outside the closed
/// arithmetic/comparison grammar. A rejected character is how this lexer
/// reports "dangerous pattern" input: there is no lexical path from here to
/// a function call, file path, or statement separator.
fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Le);
                i += 2;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ge);
                i += 2;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::EqEq);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '<' => {
                tokens.push(Token::Lt);
                i += 1;
            }
            '>' => {
                tokens.push(Token::Gt);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| format!("malformed number literal '{text}'"))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(text));
            }
            other => return Err(format!("disallowed character '{other}'")),
        }
    }
    Ok(tokens)
}

/// Parsed arithmetic expression tree.
#[derive(Debug, Clone)]
pub enum Expr {
    Num(f64),
    Var(String),
    Neg(Box<Expr>),
    Call(String, Vec<Expr>),
    BinOp(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Ge) => BinOp::Ge,
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::Ne) => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.additive()?;
            left = Expr::BinOp(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::BinOp(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::BinOp(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if matches!(self.peek(), Some(Token::Plus)) {
            self.advance();
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, String> {
        let base = self.primary()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(Expr::BinOp(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Num(n)),
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(Token::RParen)) {
                        loop {
                            args.push(self.comparison()?);
                            if matches!(self.peek(), Some(Token::Comma)) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    match self.advance() {
                        Some(Token::RParen) => Ok(Expr::Call(name, args)),
                        _ => Err("expected ')' after function arguments".to_string()),
                    }
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.comparison()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("expected ')'".to_string()),
                }
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

/// Parse `source` into an `Expr` tree. The grammar has no lexical path to
/// anything but numbers, identifiers, calls, and the operators above.
pub fn parse(source: &str) -> Result<Expr, String> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.comparison()?;
    if parser.pos != parser.tokens.len() {
        return Err("trailing tokens after a complete expression".to_string());
    }
    Ok(expr)
}

/// Every bare identifier and function-call name appearing in `expr`
/// (variables and constants are not distinguished here; the caller checks
/// membership in whichever allow-list applies).
pub fn identifiers(expr: &Expr) -> HashSet<String> {
    let mut names = HashSet::new();
    collect_identifiers(expr, &mut names);
    names
}

fn collect_identifiers(expr: &Expr, out: &mut HashSet<String>) {
    match expr {
        Expr::Num(_) => {}
        Expr::Var(name) => {
            out.insert(name.clone());
        }
        Expr::Neg(inner) => collect_identifiers(inner, out),
        Expr::Call(name, args) => {
            out.insert(name.clone());
            for arg in args {
                collect_identifiers(arg, out);
            }
        }
        Expr::BinOp(_, lhs, rhs) => {
            collect_identifiers(lhs, out);
            collect_identifiers(rhs, out);
        }
    }
}

/// Per-token complexity weight: calls and comparisons cost more than plain
/// arithmetic, matching the intent of a ceiling that penalizes depth and
/// function-call fan-out rather than raw token count alone.
#[must_use]
pub fn complexity_score(expr: &Expr) -> u32 {
    match expr {
        Expr::Num(_) | Expr::Var(_) => 1,
        Expr::Neg(inner) => 1 + complexity_score(inner),
        Expr::Call(_, args) => 3 + args.iter().map(complexity_score).sum::<u32>(),
        Expr::BinOp(op, lhs, rhs) => {
            let op_weight = match op {
                BinOp::Add | BinOp::Sub => 1,
                BinOp::Mul | BinOp::Div | BinOp::Mod => 2,
                BinOp::Pow => 3,
                BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne => 1,
            };
            op_weight + complexity_score(lhs) + complexity_score(rhs)
        }
    }
}

/// Evaluate `expr` against `vars`, resolving `pi`/`e` as constants and the
/// named function set. Comparison operators evaluate to `1.0`/`0.0`.
pub fn eval(expr: &Expr, vars: &BTreeMap<String, f64>) -> Result<f64, String> {
    match expr {
        Expr::Num(n) => Ok(*n),
        Expr::Var(name) => match name.as_str() {
            "pi" => Ok(std::f64::consts::PI),
            "e" => Ok(std::f64::consts::E),
            _ => vars
                .get(name)
                .copied()
                .ok_or_else(|| format!("unbound variable '{name}'")),
        },
        Expr::Neg(inner) => Ok(-eval(inner, vars)?),
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|a| eval(a, vars))
                .collect::<Result<Vec<_>, _>>()?;
            eval_call(name, &values)
        }
        Expr::BinOp(op, lhs, rhs) => {
            let l = eval(lhs, vars)?;
            let r = eval(rhs, vars)?;
            Ok(match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
                BinOp::Mod => l % r,
                BinOp::Pow => l.powf(r),
                BinOp::Lt => bool_to_f64(l < r),
                BinOp::Gt => bool_to_f64(l > r),
                BinOp::Le => bool_to_f64(l <= r),
                BinOp::Ge => bool_to_f64(l >= r),
                BinOp::Eq => bool_to_f64((l - r).abs() < f64::EPSILON),
                BinOp::Ne => bool_to_f64((l - r).abs() >= f64::EPSILON),
            })
        }
    }
}

fn bool_to_f64(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn eval_call(name: &str, args: &[f64]) -> Result<f64, String> {
    let arg = |i: usize| {
        args.get(i)
            .copied()
            .ok_or_else(|| format!("'{name}' expects an argument"))
    };
    match name {
        "sin" => Ok(arg(0)?.sin()),
        "cos" => Ok(arg(0)?.cos()),
        "tan" => Ok(arg(0)?.tan()),
        "asin" => Ok(arg(0)?.asin()),
        "acos" => Ok(arg(0)?.acos()),
        "atan" => Ok(arg(0)?.atan()),
        "log" => Ok(arg(0)?.log10()),
        "ln" => Ok(arg(0)?.ln()),
        "exp" => Ok(arg(0)?.exp()),
        "sqrt" => Ok(arg(0)?.sqrt()),
        "abs" => Ok(arg(0)?.abs()),
        "floor" => Ok(arg(0)?.floor()),
        "ceil" => Ok(arg(0)?.ceil()),
        "round" => Ok(arg(0)?.round()),
        _ => Err(format!("call to unknown function '{name}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_evaluates_arithmetic() {
        let expr = parse("m * a + 2").unwrap();
        let mut vars = BTreeMap::new();
        vars.insert("m".to_string(), 3.0);
        vars.insert("a".to_string(), 4.0);
        assert_eq!(eval(&expr, &vars).unwrap(), 14.0);
    }

    #[test]
    fn rejects_disallowed_characters() {
        assert!(tokenize("m; rm -rf /").is_err());
    }

    #[test]
    fn function_calls_evaluate() {
        let expr = parse("sqrt(x)").unwrap();
        let mut vars = BTreeMap::new();
        vars.insert("x".to_string(), 16.0);
        assert_eq!(eval(&expr, &vars).unwrap(), 4.0);
    }
}
