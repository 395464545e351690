//! Filter evaluation for query execution.
//!
//! Predicates are evaluated with SQL three-valued logic: a comparison
//! involving a null field is unknown, `NOT unknown` stays unknown, and a
//! row is kept only when the whole predicate is true.

use super::join::JoinedRow;
use crate::error::Error;
use boardq_proto::{FieldRef, Predicate, Value};

/// Evaluates predicates against joined rows.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Evaluate a predicate against a row.
    ///
    /// Returns `true` only if the predicate is definitely true.
    pub fn evaluate(predicate: &Predicate, row: &JoinedRow) -> Result<bool, Error> {
        Ok(Self::evaluate_tri(predicate, row)?.unwrap_or(false))
    }

    /// Evaluate to `Some(bool)`, or `None` when the result is unknown.
    fn evaluate_tri(predicate: &Predicate, row: &JoinedRow) -> Result<Option<bool>, Error> {
        match predicate {
            Predicate::Eq { field, value } => Ok(Self::field(row, field)?.sql_eq(value)),
            Predicate::Ne { field, value } => {
                Ok(Self::field(row, field)?.sql_eq(value).map(|eq| !eq))
            }
            Predicate::StartsWith { field, prefix } => {
                Ok(Self::string(row, field)?.map(|s| s.starts_with(prefix.as_str())))
            }
            Predicate::EndsWith { field, suffix } => {
                Ok(Self::string(row, field)?.map(|s| s.ends_with(suffix.as_str())))
            }
            Predicate::Like { field, pattern } => {
                Ok(Self::string(row, field)?.map(|s| like_match(s, pattern)))
            }
            Predicate::IsNull { field } => Ok(Some(Self::field(row, field)?.is_null())),
            Predicate::IsNotNull { field } => Ok(Some(!Self::field(row, field)?.is_null())),
            Predicate::And(operands) => {
                let mut result = Some(true);
                for operand in operands {
                    match Self::evaluate_tri(operand, row)? {
                        Some(false) => return Ok(Some(false)),
                        Some(true) => {}
                        None => result = None,
                    }
                }
                Ok(result)
            }
            Predicate::Or(operands) => {
                let mut result = Some(false);
                for operand in operands {
                    match Self::evaluate_tri(operand, row)? {
                        Some(true) => return Ok(Some(true)),
                        Some(false) => {}
                        None => result = None,
                    }
                }
                Ok(result)
            }
            Predicate::Not(inner) => Ok(Self::evaluate_tri(inner, row)?.map(|b| !b)),
        }
    }

    fn field<'r>(row: &'r JoinedRow, field: &FieldRef) -> Result<&'r Value, Error> {
        row.value(field).ok_or_else(|| Error::UnknownField {
            entity: field.alias.clone(),
            field: field.field.clone(),
        })
    }

    /// A string field value, `None` if null.
    fn string<'r>(row: &'r JoinedRow, field: &FieldRef) -> Result<Option<&'r str>, Error> {
        match Self::field(row, field)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(Error::TypeMismatch {
                field: field.to_string(),
                expected: "string".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }
}

enum LikeToken {
    AnyRun,
    AnyOne,
    Literal(char),
}

fn tokenize(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::AnyRun,
            '_' => LikeToken::AnyOne,
            // A trailing backslash matches itself.
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            c => LikeToken::Literal(c),
        });
    }
    tokens
}

/// Match `text` against a SQL LIKE pattern.
pub fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let tokens = tokenize(pattern);

    let (mut t, mut p) = (0, 0);
    // Position of the last `%` and the text index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(LikeToken::AnyOne) => {
                t += 1;
                p += 1;
            }
            Some(LikeToken::Literal(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            Some(LikeToken::AnyRun) => {
                backtrack = Some((p, t));
                p += 1;
            }
            _ => match backtrack {
                Some((star, from)) => {
                    p = star + 1;
                    t = from + 1;
                    backtrack = Some((star, from + 1));
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|token| matches!(token, LikeToken::AnyRun))
}
