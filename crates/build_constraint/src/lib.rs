use std::collections::HashSet;

use logger::Logger;

/// Internal parse/eval failures. Never surfaced to callers of [`Evaluator::eval`]:
/// per the evaluator's contract, any malformed expression folds into `false`
/// plus a log line, never a `Result`.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
enum EvalError {
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    #[error("operator with no operand")]
    MissingOperand,
    #[error("expression did not reduce to a single value ({0} left on the stack)")]
    ExtraTokens(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Atom(String),
    Not,
    And,
    Or,
    LParen,
    RParen,
}

/// Splits on whitespace, then within each whitespace-delimited word breaks
/// on the single-character operators `!`, `(`, `)`; any other run of
/// characters accumulates into an atom. `&&`/`||` are only ever recognized
/// as their own whitespace-separated word — `a&&b` tokenizes as the single
/// atom `a&&b`, not as `a`, `&&`, `b`.
fn tokenize(expr: &str) -> Vec<Token> {
    let mut tokens = Vec::new();

    for word in expr.split_whitespace() {
        let mut current = String::new();
        for ch in word.chars() {
            match ch {
                '!' | '(' | ')' => {
                    if !current.is_empty() {
                        tokens.push(Token::Atom(std::mem::take(&mut current)));
                    }
                    tokens.push(match ch {
                        '!' => Token::Not,
                        '(' => Token::LParen,
                        ')' => Token::RParen,
                        _ => unreachable!(),
                    });
                }
                _ => current.push(ch),
            }
        }
        if !current.is_empty() {
            match current.as_str() {
                "&&" => tokens.push(Token::And),
                "||" => tokens.push(Token::Or),
                _ => tokens.push(Token::Atom(current)),
            }
        }
    }

    tokens
}

fn precedence(op: &Token) -> u8 {
    match op {
        Token::Not => 3,
        Token::And => 2,
        Token::Or => 1,
        _ => 0,
    }
}

/// Shunting-yard into RPN. `!` binds tighter than `&&`, which binds tighter
/// than `||`; `&&`/`||` are left-associative, `!` is a right-associative
/// unary prefix.
fn to_rpn(tokens: Vec<Token>) -> Result<Vec<Token>, EvalError> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut ops: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Atom(_) => output.push(token),
            Token::Not => ops.push(token),
            Token::And | Token::Or => {
                let prec = precedence(&token);
                while let Some(top) = ops.last() {
                    if matches!(top, Token::LParen) {
                        break;
                    }
                    // left-associative: pop operators of >= precedence
                    if precedence(top) >= prec {
                        output.push(ops.pop().unwrap());
                    } else {
                        break;
                    }
                }
                ops.push(token);
            }
            Token::LParen => ops.push(token),
            Token::RParen => loop {
                match ops.pop() {
                    Some(Token::LParen) => break,
                    Some(other) => output.push(other),
                    None => return Err(EvalError::UnbalancedParens),
                }
            },
        }
    }

    while let Some(top) = ops.pop() {
        if matches!(top, Token::LParen) {
            return Err(EvalError::UnbalancedParens);
        }
        output.push(top);
    }

    Ok(output)
}

fn eval_rpn(rpn: &[Token], tags: &HashSet<String>) -> Result<bool, EvalError> {
    let mut stack: Vec<bool> = Vec::new();

    for token in rpn {
        match token {
            Token::Atom(a) => stack.push(tags.contains(a)),
            Token::Not => {
                let v = stack.pop().ok_or(EvalError::MissingOperand)?;
                stack.push(!v);
            }
            Token::And | Token::Or => {
                let first = stack.pop().ok_or(EvalError::MissingOperand)?;
                let second = stack.pop().ok_or(EvalError::MissingOperand)?;
                stack.push(if matches!(token, Token::And) {
                    first && second
                } else {
                    first || second
                });
            }
            Token::LParen | Token::RParen => unreachable!("parens never reach RPN output"),
        }
    }

    if stack.len() != 1 {
        return Err(EvalError::ExtraTokens(stack.len()));
    }

    Ok(stack.pop().unwrap())
}

fn parse_and_eval(expr: &str, tags: &HashSet<String>) -> Result<bool, EvalError> {
    let rpn = to_rpn(tokenize(expr))?;
    eval_rpn(&rpn, tags)
}

/// Evaluates a `//go:build`-style boolean expression (prefix already
/// stripped by the caller) against a tag set. Malformed expressions are
/// logged and evaluate to `false` — biasing the containing walker toward
/// fewer spurious packages over incorrect inclusion.
#[derive(Clone)]
pub struct Evaluator<L: Logger> {
    logger: L,
}

impl<L: Logger> Evaluator<L> {
    pub fn new(logger: L) -> Self {
        Self { logger }
    }

    pub fn eval(&self, expr: &str, tags: &HashSet<String>) -> bool {
        match parse_and_eval(expr, tags) {
            Ok(v) => v,
            Err(e) => {
                self.logger
                    .error(format!("malformed build directive {expr:?}: {e}"));
                false
            }
        }
    }
}
