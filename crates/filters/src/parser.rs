//! Filter expression parsing.
//!
//! The grammar lives in `grammar.lalrpop`. From the lowest precedence:
//!
//! ```text
//! expr     := or
//! or       := and (("||" | "or") and)*
//! and      := not (("&&" | "and") not)*
//! not      := ("!" | "not") not | primary
//! primary  := "(" expr ")" | leaf
//! leaf     := ident operator value
//!           | ident                          (bare event name)
//!           | word_operator "(" ident "," value ")"
//! ident    := [scope "."] path
//! value    := quoted | bare | "[" value ("," value)* "]"
//! ```
//!
//! Leaves are resolved and typed by the grammar actions, fields and operators before
//! values, so errors point at the first offending token.

use std::{cell::Cell, str::FromStr};

use lalrpop_util::{ParseError, lalrpop_mod};
use tracer_core::{EventSchema, FieldType};

use crate::{
    Expression, FieldReference, FieldResolver, FilterError, Operator, Scope, ScopedExpression,
    Value, fields::EVENT_FIELD,
};

lalrpop_mod!(#[allow(clippy::all)] grammar); // synthesized by LALRPOP

/// Parser of filter expressions against a given [EventSchema].
#[derive(Debug, Clone, Copy)]
pub struct Parser<'s> {
    resolver: FieldResolver<'s>,
}

impl<'s> Parser<'s> {
    pub fn new(schema: &'s EventSchema) -> Self {
        Self {
            resolver: FieldResolver::new(schema),
        }
    }

    /// Parse a textual expression into a [ScopedExpression].
    pub fn parse(&self, raw: &str) -> Result<ScopedExpression, FilterError> {
        let state = ParseState {
            raw,
            resolver: self.resolver,
            scope: Cell::new(Scope::Global),
        };

        let expression = grammar::ExpressionParser::new()
            .parse(&state, raw)
            .map_err(|err| state.syntax_error(err))?;

        Ok(ScopedExpression {
            scope: state.scope.get(),
            expression,
        })
    }
}

/// Unparsed literal.
pub(crate) struct Scalar {
    text: String,
    quoted: bool,
}

impl Scalar {
    pub(crate) fn bare(text: &str) -> Self {
        Self {
            text: text.to_string(),
            quoted: false,
        }
    }

    /// Strip the quotes of a `"..."` token and resolve its escapes.
    pub(crate) fn quoted(token: &str) -> Self {
        let inner = token
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(token);

        let mut text = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => text.extend(chars.next()),
                c => text.push(c),
            }
        }

        Self { text, quoted: true }
    }
}

pub(crate) enum RawValue {
    Scalar(Scalar),
    List { items: Vec<Scalar>, source: String },
}

pub(crate) fn user<L, T>(error: FilterError) -> ParseError<L, T, FilterError> {
    ParseError::User { error }
}

/// State shared by the grammar actions while parsing one expression.
pub(crate) struct ParseState<'a> {
    raw: &'a str,
    resolver: FieldResolver<'a>,
    /// Scope collected from the prefixes seen so far.
    scope: Cell<Scope>,
}

impl ParseState<'_> {
    pub(crate) fn source(&self, start: usize, end: usize) -> String {
        self.raw.get(start..end).unwrap_or(self.raw).to_string()
    }

    /// Left-hand side of a comparison. Named events can't be compared, only `event`.
    pub(crate) fn field<'i>(
        &self,
        identifier: &'i str,
    ) -> Result<(FieldReference, &'i str), FilterError> {
        let (field, body) = self.resolve(identifier)?;

        if field == FieldReference::EventName && body != EVENT_FIELD {
            return Err(FilterError::InvalidExpression(identifier.to_string()));
        }

        Ok((field, body))
    }

    /// Leaf made of a single identifier, which must name an event.
    pub(crate) fn event_leaf(&self, identifier: &str) -> Result<Expression, FilterError> {
        let (field, body) = self.resolve(identifier)?;

        if field != FieldReference::EventName || body == EVENT_FIELD {
            return Err(FilterError::InvalidExpression(identifier.to_string()));
        }

        Ok(Expression::leaf(
            FieldReference::EventName,
            Operator::Equal,
            Value::Str(body.to_string()),
        ))
    }

    /// Strip the scope prefix of an identifier and resolve the rest.
    ///
    /// Fields are resolved in the global scope: the scope of the filter is only known
    /// once compiled.
    fn resolve<'i>(&self, identifier: &'i str) -> Result<(FieldReference, &'i str), FilterError> {
        let (scope, body) = match identifier.split_once('.') {
            Some((prefix, rest)) if !rest.is_empty() => match Scope::from_str(prefix) {
                Ok(scope) => (Some(scope), rest),
                Err(_) => (None, identifier),
            },
            _ => (None, identifier),
        };

        if let Some(scope) = scope {
            let current = self.scope.get();
            let merged = current.merge(scope).ok_or_else(|| {
                FilterError::InvalidScope(format!("{scope} conflicts with {current}"))
            })?;
            self.scope.set(merged);
        }

        let field = self.resolver.resolve(Scope::Global, body)?;
        Ok((field, body))
    }

    pub(crate) fn leaf(
        &self,
        (field, body): (FieldReference, &str),
        op: Operator,
        raw: RawValue,
    ) -> Result<Expression, FilterError> {
        let resolver = self.resolver;

        let leaf = match field.field_type() {
            None => {
                if !op.is_allowed_on_event_name() {
                    return Err(FilterError::operator_not_allowed(
                        op,
                        EVENT_FIELD,
                        "event name",
                    ));
                }
                let value = typed_value(op, raw, |text| {
                    resolver.event(text)?;
                    Ok(Value::Str(text.to_string()))
                })?;
                Expression::leaf(field, op, value)
            }
            Some(field_type) => {
                if !op.is_allowed_on(field_type) {
                    return Err(FilterError::operator_not_allowed(
                        op,
                        field.to_string(),
                        field_type,
                    ));
                }

                match wildcard(field_type, op, &raw) {
                    Some((pattern_op, pattern)) => {
                        let leaf = Expression::leaf(field, pattern_op, Value::Str(pattern));
                        if op == Operator::NotEqual {
                            Expression::not(leaf)
                        } else {
                            leaf
                        }
                    }
                    None => {
                        let value = typed_value(op, raw, |text| Value::parse(text, field_type))?;
                        Expression::leaf(field, op, value)
                    }
                }
            }
        };

        match resolver.event_qualifier(body) {
            Some(event) => Ok(Expression::and(
                Expression::leaf(
                    FieldReference::EventName,
                    Operator::Equal,
                    Value::Str(event.to_string()),
                ),
                leaf,
            )),
            None => Ok(leaf),
        }
    }

    /// Map a parse failure to the error of its offending text.
    fn syntax_error<T>(&self, err: ParseError<usize, T, FilterError>) -> FilterError {
        match err {
            ParseError::User { error } => error,
            ParseError::InvalidToken { location } => self.malformed_from(location),
            ParseError::UnrecognizedToken {
                token: (start, _, _),
                ..
            }
            | ParseError::ExtraToken {
                token: (start, _, _),
            } => self.malformed_from(start),
            ParseError::UnrecognizedEof { .. } => {
                FilterError::InvalidExpression(self.raw.to_string())
            }
        }
    }

    fn malformed_from(&self, start: usize) -> FilterError {
        FilterError::InvalidExpression(self.raw.get(start..).unwrap_or(self.raw).to_string())
    }
}

/// Type a raw value for the given operator.
fn typed_value(
    op: Operator,
    raw: RawValue,
    parse: impl Fn(&str) -> Result<Value, FilterError>,
) -> Result<Value, FilterError> {
    match (op.takes_set(), raw) {
        (true, RawValue::List { items, .. }) => items
            .iter()
            .map(|item| parse(&item.text))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Set),
        (true, RawValue::Scalar(scalar)) => Err(FilterError::InvalidValue(scalar.text)),
        (false, RawValue::Scalar(scalar)) => parse(&scalar.text),
        (false, RawValue::List { source, .. }) => Err(FilterError::InvalidValue(source)),
    }
}

/// Rewrite unquoted `*` patterns on string equality into prefix/suffix/substring checks.
fn wildcard(field_type: FieldType, op: Operator, raw: &RawValue) -> Option<(Operator, String)> {
    if field_type != FieldType::Str || !matches!(op, Operator::Equal | Operator::NotEqual) {
        return None;
    }

    let RawValue::Scalar(Scalar {
        text,
        quoted: false,
    }) = raw
    else {
        return None;
    };

    let len = text.len();
    match (text.starts_with('*'), text.ends_with('*')) {
        (true, true) if len > 2 => Some((Operator::Contains, text[1..len - 1].to_string())),
        (true, false) if len > 1 => Some((Operator::EndsWith, text[1..].to_string())),
        (false, true) if len > 1 => Some((Operator::StartsWith, text[..len - 1].to_string())),
        _ => None,
    }
}
