//! Formula evaluation.
//!
//! A formula is a token array over a fixed grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | number | component | '(' expr ')'
//! ```
//!
//! Literals arrive one digit per `number` token and are concatenated. A
//! `component` token is replaced by that component's resolved value, or by
//! zero when the value is missing, in which case the default is recorded.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{ComponentId, FormulaToken};

/// The result of evaluating a formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaEvaluation {
    /// The computed value at full precision.
    pub value: Decimal,
    /// The infix expression after substituting component values.
    pub expression: String,
    /// The value used for each referenced component.
    pub references: BTreeMap<ComponentId, Decimal>,
    /// Referenced components with no resolved value, substituted by zero.
    pub defaults: Vec<ComponentId>,
}

/// Deepest nesting of parentheses and unary signs a formula may use.
pub const MAX_FORMULA_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Number(Decimal),
    Op(char),
    LParen,
    RParen,
}

/// Renders tokens as a readable formula, components shown as `{id}`.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::render_formula;
/// use payroll_engine::models::FormulaToken;
///
/// let tokens = vec![
///     FormulaToken::Component("1".to_string()),
///     FormulaToken::Operator("/".to_string()),
///     FormulaToken::Number("1".to_string()),
///     FormulaToken::Number("2".to_string()),
/// ];
/// assert_eq!(render_formula(&tokens), "{1} / 12");
/// ```
pub fn render_formula(tokens: &[FormulaToken]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut in_number = false;
    for token in tokens {
        match token {
            FormulaToken::Number(digit) => {
                if in_number {
                    if let Some(last) = parts.last_mut() {
                        last.push_str(digit.trim());
                    }
                } else {
                    parts.push(digit.trim().to_string());
                }
                in_number = true;
                continue;
            }
            FormulaToken::Component(id) => parts.push(format!("{{{}}}", id.trim())),
            FormulaToken::Operator(op) | FormulaToken::Parenthesis(op) => {
                parts.push(op.trim().to_string())
            }
        }
        in_number = false;
    }
    if parts.is_empty() {
        "<empty>".to_string()
    } else {
        parts.join(" ")
    }
}

/// Evaluates a formula against resolved component values.
///
/// # Errors
///
/// Returns [`EngineError::FormulaError`] naming the formula when the token
/// array is empty or malformed, divides by zero, or overflows.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use payroll_engine::calculation::evaluate_formula;
/// use payroll_engine::models::FormulaToken;
/// use rust_decimal::Decimal;
///
/// let tokens = vec![
///     FormulaToken::Component("1".to_string()),
///     FormulaToken::Operator("/".to_string()),
///     FormulaToken::Number("2".to_string()),
/// ];
/// let values = HashMap::from([(1, Decimal::from(3100))]);
/// let result = evaluate_formula(&tokens, &values).unwrap();
/// assert_eq!(result.value, Decimal::from(1550));
/// ```
pub fn evaluate_formula(
    tokens: &[FormulaToken],
    values: &HashMap<ComponentId, Decimal>,
) -> EngineResult<FormulaEvaluation> {
    let formula = render_formula(tokens);
    let fail = |message: String| EngineError::FormulaError {
        formula: formula.clone(),
        message,
    };

    if tokens.is_empty() {
        return Err(fail("formula has no tokens".to_string()));
    }

    let mut lexemes = Vec::with_capacity(tokens.len());
    let mut references = BTreeMap::new();
    let mut defaults = Vec::new();
    let mut literal = String::new();

    for token in tokens {
        if let FormulaToken::Number(digit) = token {
            literal.push_str(digit.trim());
            continue;
        }
        flush_literal(&mut literal, &mut lexemes).map_err(&fail)?;

        match token {
            FormulaToken::Number(_) => {}
            FormulaToken::Component(raw) => {
                let id: ComponentId = raw
                    .trim()
                    .parse()
                    .map_err(|_| fail(format!("invalid component reference '{}'", raw)))?;
                let value = match values.get(&id) {
                    Some(value) => *value,
                    None => {
                        if !defaults.contains(&id) {
                            defaults.push(id);
                        }
                        Decimal::ZERO
                    }
                };
                references.insert(id, value);
                lexemes.push(Lexeme::Number(value));
            }
            FormulaToken::Operator(op) => match op.trim() {
                "+" => lexemes.push(Lexeme::Op('+')),
                "-" => lexemes.push(Lexeme::Op('-')),
                "*" => lexemes.push(Lexeme::Op('*')),
                "/" => lexemes.push(Lexeme::Op('/')),
                other => return Err(fail(format!("unknown operator '{}'", other))),
            },
            FormulaToken::Parenthesis(p) => match p.trim() {
                "(" => lexemes.push(Lexeme::LParen),
                ")" => lexemes.push(Lexeme::RParen),
                other => return Err(fail(format!("unknown parenthesis '{}'", other))),
            },
        }
    }
    flush_literal(&mut literal, &mut lexemes).map_err(&fail)?;

    let expression = render_lexemes(&lexemes);
    let mut parser = Parser {
        lexemes: &lexemes,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr().map_err(&fail)?;
    if parser.pos != lexemes.len() {
        return Err(fail(format!("unexpected token at position {}", parser.pos)));
    }

    Ok(FormulaEvaluation {
        value,
        expression,
        references,
        defaults,
    })
}

fn flush_literal(literal: &mut String, lexemes: &mut Vec<Lexeme>) -> Result<(), String> {
    if literal.is_empty() {
        return Ok(());
    }
    let value =
        Decimal::from_str(literal).map_err(|_| format!("invalid number literal '{}'", literal))?;
    lexemes.push(Lexeme::Number(value));
    literal.clear();
    Ok(())
}

fn render_lexemes(lexemes: &[Lexeme]) -> String {
    lexemes
        .iter()
        .map(|l| match l {
            Lexeme::Number(n) => n.normalize().to_string(),
            Lexeme::Op(c) => c.to_string(),
            Lexeme::LParen => "(".to_string(),
            Lexeme::RParen => ")".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

struct Parser<'a> {
    lexemes: &'a [Lexeme],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Lexeme> {
        self.lexemes.get(self.pos).copied()
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, String>,
    ) -> Result<T, String> {
        if self.depth >= MAX_FORMULA_DEPTH {
            return Err(format!(
                "nesting deeper than {} at position {}",
                MAX_FORMULA_DEPTH, self.pos
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> Result<Decimal, String> {
        let mut acc = self.term()?;
        while let Some(Lexeme::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            let next = if op == '+' {
                acc.checked_add(rhs)
            } else {
                acc.checked_sub(rhs)
            };
            acc = next.ok_or_else(|| "arithmetic overflow".to_string())?;
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<Decimal, String> {
        let mut acc = self.factor()?;
        while let Some(Lexeme::Op(op @ ('*' | '/'))) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            acc = if op == '*' {
                acc.checked_mul(rhs)
                    .ok_or_else(|| "arithmetic overflow".to_string())?
            } else {
                if rhs.is_zero() {
                    return Err("division by zero".to_string());
                }
                acc.checked_div(rhs)
                    .ok_or_else(|| "arithmetic overflow".to_string())?
            };
        }
        Ok(acc)
    }

    fn factor(&mut self) -> Result<Decimal, String> {
        match self.peek() {
            Some(Lexeme::Op('-')) => {
                self.pos += 1;
                Ok(-self.nested(Self::factor)?)
            }
            Some(Lexeme::Op('+')) => {
                self.pos += 1;
                self.nested(Self::factor)
            }
            Some(Lexeme::Number(n)) => {
                self.pos += 1;
                Ok(n)
            }
            Some(Lexeme::LParen) => {
                self.pos += 1;
                let value = self.nested(Self::expr)?;
                match self.peek() {
                    Some(Lexeme::RParen) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    _ => Err("unbalanced parenthesis".to_string()),
                }
            }
            Some(other) => Err(format!(
                "unexpected {} at position {}",
                describe(other),
                self.pos
            )),
            None => Err("unexpected end of formula".to_string()),
        }
    }
}

fn describe(lexeme: Lexeme) -> String {
    match lexeme {
        Lexeme::Number(n) => format!("number {}", n),
        Lexeme::Op(c) => format!("operator '{}'", c),
        Lexeme::LParen => "'('".to_string(),
        Lexeme::RParen => "')'".to_string(),
    }
}
