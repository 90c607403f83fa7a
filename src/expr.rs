//! Mathematical expression evaluation for `#expr` and `#ifexpr`.

// Adapted from ExprParser.php in the MediaWiki ParserFunctions extension
// <https://github.com/wikimedia/mediawiki-extensions-ParserFunctions/>
// SPDX-License-Identifier: GPL-2.0-or-later

#![allow(clippy::too_many_lines)]

use crate::php::{strtr, strval};
use arrayvec::ArrayVec;
use parking_lot::Mutex;
use schnellru::{ByLength, LruMap};
use std::{
    borrow::Cow,
    f64::consts::{E, PI},
    fmt,
    sync::LazyLock,
};

/// An expression evaluation error.
///
/// The display form of each error is the message shown to wiki readers.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// Someone tried to do too much arithmetic at once.
    #[error("Expression error: Stack exhausted.")]
    StackExhausted,
    /// Encountered an unknown word.
    #[error("Expression error: Unrecognized word \"{0}\".")]
    UnrecognizedWord(Cow<'static, str>),
    /// Encountered an unknown symbol.
    #[error("Expression error: Unrecognized punctuation character \"{0}\".")]
    UnrecognizedPunctuation(char),
    /// Encountered a number where it shouldn’t’ve been.
    #[error("Expression error: Unexpected number.")]
    UnexpectedNumber,
    /// Encountered an operator where it shouldn’t’ve been.
    #[error("Expression error: Unexpected {0} operator.")]
    UnexpectedOperator(Cow<'static, str>),
    /// Encountered a close bracket where it shouldn’t’ve been.
    #[error("Expression error: Unexpected closing bracket.")]
    UnexpectedCloseBracket,
    /// Never encountered a close bracket where it should’ve been.
    #[error("Expression error: Unclosed bracket.")]
    MissingCloseBracket,
    /// A required operand was missing.
    #[error("Expression error: Missing operand for {0}.")]
    MissingOperand(Cow<'static, str>),
    /// Someone tried to do that thing you’re not supposed to do with numbers.
    #[error("Division by zero.")]
    DivisionByZero(Cow<'static, str>),
    /// An inverse trigonometric function got an argument outside [-1, 1].
    #[error("Invalid argument for {0}: < -1 or > 1.")]
    InvalidArgument(Cow<'static, str>),
    /// A logarithm of a non-positive number.
    #[error("Invalid argument for ln: <= 0.")]
    InvalidLogArgument,
    /// Someone tried to invent new maths, and it did not work.
    #[error("In {0}: result is not a number.")]
    NotANumber(Cow<'static, str>),
}

/// A numeric value.
///
/// Integer arithmetic stays integral until it overflows or an operation
/// needs a fraction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
}

impl Number {
    /// Integers at or beyond this magnitude are written in scientific
    /// notation.
    const SCIENTIFIC: u64 = 100_000_000_000_000;

    /// Returns the value as a float.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }

    /// Returns true if the value is non-zero.
    #[allow(clippy::float_cmp)]
    pub fn is_truthy(self) -> bool {
        match self {
            Number::Int(n) => n != 0,
            Number::Float(n) => n != 0.0,
        }
    }

    /// Converts a boolean to 0 or 1.
    fn from_bool(value: bool) -> Self {
        Number::Int(i64::from(value))
    }

    /// Converts a float to an integer if it is integral and in range.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn integral(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < 9.0e18 {
            Number::Int(value as i64)
        } else {
            Number::Float(value)
        }
    }
}

impl fmt::Display for Number {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Int(n) if n.unsigned_abs() < Self::SCIENTIFIC => write!(f, "{n}"),
            Number::Int(n) => f.write_str(&strval(n as f64)),
            Number::Float(n) => f.write_str(&strval(n)),
        }
    }
}

/// The number of recently evaluated expressions to remember.
const MEMO_SIZE: u32 = 1000;

/// Recently evaluated expressions.
static MEMO: LazyLock<Mutex<LruMap<String, Result<Option<Number>, Error>>>> =
    LazyLock::new(|| Mutex::new(LruMap::new(ByLength::new(MEMO_SIZE))));

/// Evaluates a mathematical expression, remembering the result.
///
/// Templates frequently evaluate the same expression many times over (e.g.
/// inside a loop over table rows), so results are memoised by source text.
pub fn evaluate(expr: &str) -> Result<Option<Number>, Error> {
    if let Some(result) = MEMO.lock().get(expr).cloned() {
        return result;
    }
    let result = do_expression(expr);
    MEMO.lock().insert(expr.to_string(), result.clone());
    result
}

/// Evaluates a mathematical expression.
///
/// The algorithm here is based on the infix to RPN algorithm by Robert Montante:
/// <https://web.archive.org/web/20100417210626/http://montcs.bloomu.edu/~bobmon/Information/RPN/infix2rpn.shtml>
///
/// It’s essentially the same as Dijkstra’s shunting yard algorithm.
pub fn do_expression(expr: &str) -> Result<Option<Number>, Error> {
    let mut operands = ArrayVec::<Number, MAX_STACK_SIZE>::new_const();
    let mut operators = ArrayVec::<Token, MAX_STACK_SIZE>::new_const();

    let expr = strtr(
        expr,
        &[("&minus;", "-"), ("&lt;", "<"), ("&gt;", ">"), ("−", "-")],
    );

    let mut iter = expr.char_indices().peekable();

    let mut expecting = Kind::Operand;

    while let Some((pos, char)) = iter.next() {
        if operands.len() == MAX_STACK_SIZE || operators.len() == MAX_STACK_SIZE {
            return Err(Error::StackExhausted);
        }

        let op;
        if EXPR_WHITE_CLASS.contains(char) {
            while iter
                .next_if(|(_, char)| EXPR_WHITE_CLASS.contains(*char))
                .is_some()
            {}
            continue;
        } else if EXPR_NUMBER_CLASS.contains(char) {
            let mut sep_count = usize::from(char == '.');
            let mut end = pos;
            while let Some((pos, char)) =
                iter.next_if(|(_, char)| EXPR_NUMBER_CLASS.contains(*char))
            {
                // MW will parse "1.2.3.4.5" as 1.2 so it is necessary to
                // track state and ignore everything beyond one separator
                if char == '.' {
                    sep_count += 1;
                }
                if sep_count < 2 {
                    end = pos;
                }
            }

            if expecting != Kind::Operand {
                return Err(Error::UnexpectedNumber);
            }

            operands.push(parse_literal(&expr[pos..=end]));
            expecting = Kind::Operator;
            continue;
        } else if char.is_ascii_alphabetic() {
            let mut end = pos;
            while let Some((pos, _)) = iter.next_if(|(_, char)| char.is_ascii_alphabetic()) {
                end = pos;
            }

            let word = expr[pos..=end].to_ascii_lowercase();
            let Some(word_op) = words(&word) else {
                return Err(Error::UnrecognizedWord(word.into()));
            };
            op = word_op;

            match op {
                // constant
                Token::Exponent => {
                    if expecting == Kind::Operand {
                        operands.push(Number::Float(E));
                        expecting = Kind::Operator;
                        continue;
                    }
                }
                Token::Pi => {
                    if expecting != Kind::Operand {
                        return Err(Error::UnexpectedNumber);
                    }
                    operands.push(Number::Float(PI));
                    expecting = Kind::Operator;
                    continue;
                }

                // Unary operator
                Token::Not
                | Token::Sine
                | Token::Cosine
                | Token::Tangent
                | Token::ArcSine
                | Token::ArcCos
                | Token::ArcTan
                | Token::Exp
                | Token::Ln
                | Token::Abs
                | Token::Floor
                | Token::Trunc
                | Token::Ceil
                | Token::Sqrt => {
                    if expecting != Kind::Operand {
                        return Err(Error::UnexpectedOperator(names(op)));
                    }
                    operators.push(op);
                    continue;
                }
                _ => {
                    // Binary operator, fall through
                }
            }
        } else if char == '+' {
            if expecting == Kind::Operand {
                // Unary plus
                operators.push(Token::Positive);
                continue;
            }
            // Binary plus
            op = Token::Plus;
        } else if char == '-' {
            if expecting == Kind::Operand {
                // Unary minus
                operators.push(Token::Negative);
                continue;
            }
            // Binary minus
            op = Token::Minus;
        } else if char == '*' {
            op = Token::Times;
        } else if char == '/' {
            op = Token::Divide;
        } else if char == '^' {
            op = Token::Pow;
        } else if char == '(' {
            if expecting == Kind::Operator {
                return Err(Error::UnexpectedOperator("(".into()));
            }
            operators.push(Token::Open);
            continue;
        } else if char == ')' {
            let mut last_op = operators.last().copied();
            while let Some(op) = last_op
                && op != Token::Open
            {
                do_operation(op, &mut operands)?;
                operators.pop();
                last_op = operators.last().copied();
            }
            if last_op.is_some() {
                operators.pop();
            } else {
                return Err(Error::UnexpectedCloseBracket);
            }
            expecting = Kind::Operator;
            continue;
        } else if char == '=' {
            op = Token::Equality;
        } else if char == '<' {
            if iter.next_if(|(_, char)| *char == '=').is_some() {
                op = Token::LessEq;
            } else if iter.next_if(|(_, char)| *char == '>').is_some() {
                op = Token::NotEq;
            } else {
                op = Token::Less;
            }
        } else if char == '>' {
            if iter.next_if(|(_, char)| *char == '=').is_some() {
                op = Token::GreaterEq;
            } else {
                op = Token::Greater;
            }
        } else if char == '!' && iter.next_if(|(_, char)| *char == '=').is_some() {
            op = Token::NotEq;
        } else {
            return Err(Error::UnrecognizedPunctuation(char));
        }

        // Binary operator processing
        if expecting == Kind::Operand {
            return Err(Error::UnexpectedOperator(names(op)));
        }

        // Shunting yard magic
        let mut last_op = operators.last().copied();
        while let Some(lop) = last_op
            && precedence(op) <= precedence(lop)
        {
            do_operation(lop, &mut operands)?;
            operators.pop();
            last_op = operators.last().copied();
        }
        operators.push(op);
        expecting = Kind::Operand;
    }

    // Finish off the operator array
    while let Some(op) = operators.pop() {
        if op == Token::Open {
            return Err(Error::MissingCloseBracket);
        }
        do_operation(op, &mut operands)?;
    }

    match operands.len() {
        0 | 1 => Ok(operands.pop()),
        _ => Err(Error::UnexpectedNumber),
    }
}

/// Converts a run of digits and dots to a number. Anything with a dot is a
/// float.
fn parse_literal(text: &str) -> Number {
    if text.contains('.') {
        // A lone "." is zero, like PHP’s `floatval`
        Number::Float(text.parse::<f64>().unwrap_or(0.0))
    } else {
        text.parse::<i64>().map_or_else(
            |_| Number::Float(text.parse::<f64>().unwrap_or(f64::INFINITY)),
            Number::Int,
        )
    }
}

/// Valid white space characters.
const EXPR_WHITE_CLASS: &str = " \t\r\n";
/// Valid number characters.
const EXPR_NUMBER_CLASS: &str = "0123456789.";

/// Operator tokens.
// Clippy: See [`names`] to learn which token corresponds to which input.
#[allow(clippy::missing_docs_in_private_items)]
#[derive(Clone, Copy, Eq, PartialEq)]
enum Token {
    Negative,
    Positive,
    Plus,
    Minus,
    Times,
    Divide,
    Mod,
    Open,
    And,
    Or,
    Not,
    Equality,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    NotEq,
    Round,
    Exponent,
    Sine,
    Cosine,
    Tangent,
    ArcSine,
    ArcCos,
    ArcTan,
    Exp,
    Ln,
    Abs,
    Floor,
    Trunc,
    Ceil,
    Pow,
    Pi,
    FMod,
    Sqrt,
}

/// Maximum allowed number of in-flight operators or operands.
const MAX_STACK_SIZE: usize = 100;

/// Returns the precdence of the given token.
const fn precedence(t: Token) -> i32 {
    match t {
        Token::Negative | Token::Positive | Token::Exponent | Token::Pow => 10,
        Token::Sine
        | Token::Cosine
        | Token::Tangent
        | Token::ArcSine
        | Token::ArcCos
        | Token::ArcTan
        | Token::Exp
        | Token::Ln
        | Token::Abs
        | Token::Floor
        | Token::Trunc
        | Token::Ceil
        | Token::Not
        | Token::Sqrt => 9,
        Token::Times | Token::Divide | Token::Mod | Token::FMod => 8,
        Token::Plus | Token::Minus => 6,
        Token::Round => 5,
        Token::Equality
        | Token::Less
        | Token::Greater
        | Token::LessEq
        | Token::GreaterEq
        | Token::NotEq => 4,
        Token::And => 3,
        Token::Or => 2,
        Token::Pi => 0,
        Token::Open => -1,
    }
}

/// Returns the name of the given token.
const fn names(t: Token) -> Cow<'static, str> {
    Cow::Borrowed(match t {
        Token::Not => "not",
        Token::Times => "*",
        Token::Divide => "/",
        Token::Mod => "mod",
        Token::FMod => "fmod",
        Token::Positive | Token::Plus => "+",
        Token::Negative | Token::Minus => "-",
        Token::Round => "round",
        Token::Equality => "=",
        Token::Less => "<",
        Token::Greater => ">",
        Token::LessEq => "<=",
        Token::GreaterEq => ">=",
        Token::NotEq => "<>",
        Token::And => "and",
        Token::Or => "or",
        Token::Exponent => "e",
        Token::Sine => "sin",
        Token::Cosine => "cos",
        Token::Tangent => "tan",
        Token::ArcSine => "asin",
        Token::ArcCos => "acos",
        Token::ArcTan => "atan",
        Token::Ln => "ln",
        Token::Exp => "exp",
        Token::Abs => "abs",
        Token::Floor => "floor",
        Token::Trunc => "trunc",
        Token::Ceil => "ceil",
        Token::Pow => "^",
        Token::Pi => "pi",
        Token::Sqrt => "sqrt",
        Token::Open => "(",
    })
}

/// Returns a token corresponding to the given word, or `None` if the token is
/// not a known word.
fn words(input: &str) -> Option<Token> {
    Some(match input {
        "mod" => Token::Mod,
        "fmod" => Token::FMod,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "round" => Token::Round,
        "div" => Token::Divide,
        "e" => Token::Exponent,
        "sin" => Token::Sine,
        "cos" => Token::Cosine,
        "tan" => Token::Tangent,
        "asin" => Token::ArcSine,
        "acos" => Token::ArcCos,
        "atan" => Token::ArcTan,
        "exp" => Token::Exp,
        "ln" => Token::Ln,
        "abs" => Token::Abs,
        "trunc" => Token::Trunc,
        "floor" => Token::Floor,
        "ceil" => Token::Ceil,
        "pi" => Token::Pi,
        "sqrt" => Token::Sqrt,
        _ => return None,
    })
}

/// A subexpression kind.
#[derive(PartialEq, Eq)]
enum Kind {
    /// An operand.
    Operand,
    /// An operator.
    Operator,
}

/// Pops the operand of a unary operator.
fn unary(op: Token, stack: &mut ArrayVec<Number, MAX_STACK_SIZE>) -> Result<Number, Error> {
    stack.pop().ok_or(Error::MissingOperand(names(op)))
}

/// Pops the operands of a binary operator, left first.
fn binary(
    op: Token,
    stack: &mut ArrayVec<Number, MAX_STACK_SIZE>,
) -> Result<(Number, Number), Error> {
    if let (Some(right), Some(left)) = (stack.pop(), stack.pop()) {
        Ok((left, right))
    } else {
        Err(Error::MissingOperand(names(op)))
    }
}

/// Applies an integer operation if both operands are integers and it does
/// not overflow, otherwise the float operation.
fn arithmetic(
    left: Number,
    right: Number,
    int: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Number {
    if let (Number::Int(l), Number::Int(r)) = (left, right)
        && let Some(result) = int(l, r)
    {
        Number::Int(result)
    } else {
        Number::Float(float(left.to_f64(), right.to_f64()))
    }
}

/// Compares two numbers, exactly if both are integers.
fn compare(left: Number, right: Number) -> Option<std::cmp::Ordering> {
    if let (Number::Int(l), Number::Int(r)) = (left, right) {
        Some(l.cmp(&r))
    } else {
        left.to_f64().partial_cmp(&right.to_f64())
    }
}

/// Rounds like PHP `round`. Large precisions which would overflow return the
/// original value.
#[allow(clippy::cast_possible_truncation)]
fn round(value: Number, digits: Number) -> Number {
    let digits = digits.to_f64().clamp(-400.0, 400.0) as i32;
    if let Number::Int(_) = value
        && digits >= 0
    {
        return value;
    }

    let value = value.to_f64();
    let scale = 10.0_f64.powi(digits.abs());
    let rounded = if digits >= 0 {
        let scaled = value * scale;
        if scale.is_finite() && scaled.is_finite() {
            scaled.round() / scale
        } else {
            value
        }
    } else if scale.is_finite() {
        (value / scale).round() * scale
    } else {
        0.0
    };
    Number::integral(rounded)
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::float_cmp,
    clippy::cast_sign_loss
)]
fn do_operation(op: Token, stack: &mut ArrayVec<Number, MAX_STACK_SIZE>) -> Result<(), Error> {
    use std::cmp::Ordering;

    let result = match op {
        Token::Negative => match unary(op, stack)? {
            Number::Int(n) => n
                .checked_neg()
                .map_or(Number::Float(-(n as f64)), Number::Int),
            Number::Float(n) => Number::Float(-n),
        },
        Token::Positive => unary(op, stack)?,
        Token::Times => {
            let (left, right) = binary(op, stack)?;
            arithmetic(left, right, i64::checked_mul, |l, r| l * r)
        }
        Token::Divide => {
            let (left, right) = binary(op, stack)?;
            if !right.is_truthy() {
                return Err(Error::DivisionByZero(names(op)));
            }
            arithmetic(
                left,
                right,
                |l, r| (l.checked_rem(r)? == 0).then(|| l.checked_div(r)).flatten(),
                |l, r| l / r,
            )
        }
        Token::Mod => {
            let (left, right) = binary(op, stack)?;
            let left = left.to_f64() as i64;
            let right = right.to_f64() as i64;
            if right == 0 {
                return Err(Error::DivisionByZero(names(op)));
            }
            Number::Int(left.checked_rem(right).unwrap_or(0))
        }
        Token::FMod => {
            let (left, right) = binary(op, stack)?;
            if !right.is_truthy() {
                return Err(Error::DivisionByZero(names(op)));
            }
            Number::Float(left.to_f64() % right.to_f64())
        }
        Token::Plus => {
            let (left, right) = binary(op, stack)?;
            arithmetic(left, right, i64::checked_add, |l, r| l + r)
        }
        Token::Minus => {
            let (left, right) = binary(op, stack)?;
            arithmetic(left, right, i64::checked_sub, |l, r| l - r)
        }
        Token::And => {
            let (left, right) = binary(op, stack)?;
            Number::from_bool(left.is_truthy() && right.is_truthy())
        }
        Token::Or => {
            let (left, right) = binary(op, stack)?;
            Number::from_bool(left.is_truthy() || right.is_truthy())
        }
        Token::Equality => {
            let (left, right) = binary(op, stack)?;
            Number::from_bool(compare(left, right) == Some(Ordering::Equal))
        }
        Token::NotEq => {
            let (left, right) = binary(op, stack)?;
            Number::from_bool(compare(left, right) != Some(Ordering::Equal))
        }
        Token::Less => {
            let (left, right) = binary(op, stack)?;
            Number::from_bool(compare(left, right) == Some(Ordering::Less))
        }
        Token::Greater => {
            let (left, right) = binary(op, stack)?;
            Number::from_bool(compare(left, right) == Some(Ordering::Greater))
        }
        Token::LessEq => {
            let (left, right) = binary(op, stack)?;
            Number::from_bool(matches!(
                compare(left, right),
                Some(Ordering::Less | Ordering::Equal)
            ))
        }
        Token::GreaterEq => {
            let (left, right) = binary(op, stack)?;
            Number::from_bool(matches!(
                compare(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ))
        }
        Token::Not => Number::from_bool(!unary(op, stack)?.is_truthy()),
        Token::Round => {
            let (value, digits) = binary(op, stack)?;
            round(value, digits)
        }
        Token::Exponent => {
            let (left, right) = binary(op, stack)?;
            arithmetic(
                left,
                right,
                |l, r| l.checked_mul(10_i64.checked_pow(u32::try_from(r).ok()?)?),
                |l, r| l * 10.0_f64.powf(r),
            )
        }
        Token::Pow => {
            let (left, right) = binary(op, stack)?;
            let result = arithmetic(
                left,
                right,
                |l, r| l.checked_pow(u32::try_from(r).ok()?),
                f64::powf,
            );
            if let Number::Float(n) = result
                && n.is_nan()
            {
                return Err(Error::NotANumber(names(op)));
            }
            result
        }
        Token::Abs => match unary(op, stack)? {
            Number::Int(n) => n
                .checked_abs()
                .map_or(Number::Float((n as f64).abs()), Number::Int),
            Number::Float(n) => Number::Float(n.abs()),
        },
        Token::Floor | Token::Ceil | Token::Trunc => match unary(op, stack)? {
            Number::Int(n) => Number::Int(n),
            Number::Float(n) => Number::Float(match op {
                Token::Floor => n.floor(),
                Token::Ceil => n.ceil(),
                _ => n.trunc(),
            }),
        },
        Token::Sine => Number::Float(unary(op, stack)?.to_f64().sin()),
        Token::Cosine => Number::Float(unary(op, stack)?.to_f64().cos()),
        Token::Tangent => Number::Float(unary(op, stack)?.to_f64().tan()),
        Token::ArcTan => Number::Float(unary(op, stack)?.to_f64().atan()),
        Token::Exp => Number::Float(unary(op, stack)?.to_f64().exp()),
        Token::ArcSine | Token::ArcCos => {
            let arg = unary(op, stack)?.to_f64();
            if !(-1.0..=1.0).contains(&arg) {
                return Err(Error::InvalidArgument(names(op)));
            }
            Number::Float(if op == Token::ArcSine {
                arg.asin()
            } else {
                arg.acos()
            })
        }
        Token::Ln => {
            let arg = unary(op, stack)?.to_f64();
            if arg <= 0.0 {
                return Err(Error::InvalidLogArgument);
            }
            Number::Float(arg.ln())
        }
        Token::Sqrt => {
            let result = unary(op, stack)?.to_f64().sqrt();
            if result.is_nan() {
                return Err(Error::NotANumber(names(op)));
            }
            Number::Float(result)
        }
        Token::Open | Token::Pi => unreachable!(),
    };

    stack.push(result);
    Ok(())
}
