//! Static Expression Evaluator
//!
//! Evaluates literal expressions at build time to the values a JavaScript
//! runtime would compute for them, without executing any code. Only the
//! data-shaped subset of the language is understood: literals, object and
//! array construction, references to already evaluated bindings, and the
//! handful of operators data files use. Everything else is rejected with
//! [`ExtractError::UnsupportedExpression`].

use oxc_ast::ast::*;
use oxc_span::{GetSpan, Span};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, HashMap};

use crate::error::ExtractError;

/// Largest integer a double represents exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A runtime value as far as JSON serialization can observe it.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<StaticValue>),
    Object(BTreeMap<String, StaticValue>),
    /// Functions and classes. Their bodies are never looked at.
    Function,
}

impl StaticValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            StaticValue::Undefined | StaticValue::Null => false,
            StaticValue::Bool(b) => *b,
            StaticValue::Number(n) => *n != 0.0 && !n.is_nan(),
            StaticValue::String(s) => !s.is_empty(),
            StaticValue::Array(_) | StaticValue::Object(_) | StaticValue::Function => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, StaticValue::Undefined | StaticValue::Null)
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            StaticValue::Undefined => "undefined",
            StaticValue::Null | StaticValue::Array(_) | StaticValue::Object(_) => "object",
            StaticValue::Bool(_) => "boolean",
            StaticValue::Number(_) => "number",
            StaticValue::String(_) => "string",
            StaticValue::Function => "function",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            StaticValue::Undefined | StaticValue::Function => f64::NAN,
            StaticValue::Null => 0.0,
            StaticValue::Bool(b) => f64::from(u8::from(*b)),
            StaticValue::Number(n) => *n,
            StaticValue::String(s) => string_to_number(s),
            StaticValue::Array(_) | StaticValue::Object(_) => self
                .to_js_string()
                .map(|s| string_to_number(&s))
                .unwrap_or(f64::NAN),
        }
    }

    /// String conversion as `String(value)` performs it. Functions have no
    /// static string form.
    pub fn to_js_string(&self) -> Option<String> {
        match self {
            StaticValue::Undefined => Some("undefined".to_string()),
            StaticValue::Null => Some("null".to_string()),
            StaticValue::Bool(b) => Some(b.to_string()),
            StaticValue::Number(n) => Some(number_to_js_string(*n)),
            StaticValue::String(s) => Some(s.clone()),
            StaticValue::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    if item.is_nullish() {
                        parts.push(String::new());
                    } else {
                        parts.push(item.to_js_string()?);
                    }
                }
                Some(parts.join(","))
            }
            StaticValue::Object(_) => Some("[object Object]".to_string()),
            StaticValue::Function => None,
        }
    }

    fn strict_equals(&self, other: &StaticValue) -> bool {
        match (self, other) {
            (StaticValue::Undefined, StaticValue::Undefined) => true,
            (StaticValue::Null, StaticValue::Null) => true,
            (StaticValue::Bool(a), StaticValue::Bool(b)) => a == b,
            (StaticValue::Number(a), StaticValue::Number(b)) => a == b,
            (StaticValue::String(a), StaticValue::String(b)) => a == b,
            _ => false,
        }
    }

    /// The JSON form of the value, `None` where `JSON.stringify` drops it.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            StaticValue::Undefined | StaticValue::Function => None,
            StaticValue::Null => Some(Value::Null),
            StaticValue::Bool(b) => Some(Value::Bool(*b)),
            StaticValue::Number(n) => Some(number_to_json(*n)),
            StaticValue::String(s) => Some(Value::String(s.clone())),
            StaticValue::Array(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json().unwrap_or(Value::Null))
                    .collect(),
            )),
            StaticValue::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    if let Some(json) = value.to_json() {
                        map.insert(key.clone(), json);
                    }
                }
                Some(Value::Object(map))
            }
        }
    }

    pub fn from_json(value: &Value) -> StaticValue {
        match value {
            Value::Null => StaticValue::Null,
            Value::Bool(b) => StaticValue::Bool(*b),
            Value::Number(n) => StaticValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => StaticValue::String(s.clone()),
            Value::Array(items) => StaticValue::Array(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => StaticValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// `JSON.stringify` writes integral doubles without a fraction and turns
/// non-finite numbers into `null`. Other doubles stay floats; the canonical
/// renderer prints them the way JavaScript does.
fn number_to_json(n: f64) -> Value {
    if !n.is_finite() {
        return Value::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        // -0 lands here as well and prints as 0.
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

/// `Number.prototype.toString()`: shortest round-trip digits, positional
/// notation for decimal exponents in -7..21, exponent notation otherwise.
pub fn number_to_js_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    // `{:e}` prints the shortest digits as `d.ddde<exp>`.
    let exp_form = format!("{:e}", n.abs());
    let (mantissa, exponent) = exp_form.split_once('e').unwrap_or((exp_form.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let k = digits.len() as i32;
    let point = exponent.parse::<i32>().unwrap_or(0) + 1;

    let body = if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let sign = if point - 1 < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", lead, sign, (point - 1).abs())
        } else {
            format!("{}.{}e{}{}", lead, rest, sign, (point - 1).abs())
        }
    };

    if n < 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    // Rust accepts spellings such as "inf" and "nan" that JavaScript does not.
    if trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// `ToUint32`: truncate, then wrap modulo 2^32. Non-finite values give 0.
fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// Source text of `span`, shortened for diagnostics.
pub(crate) fn snippet(source: &str, span: Span) -> String {
    const MAX_CHARS: usize = 60;
    let text = source
        .get(span.start as usize..span.end as usize)
        .unwrap_or_default()
        .trim();
    let mut short: String = text.chars().take(MAX_CHARS).collect();
    if text.chars().count() > MAX_CHARS {
        short.push_str("...");
    }
    short
}

/// The evaluated value of a binding, or the reason it has none.
pub type Slot = Result<StaticValue, ExtractError>;

/// Evaluates expressions against a fixed set of bindings.
pub struct Evaluator<'s> {
    source: &'s str,
    scope: &'s HashMap<String, Slot>,
}

impl<'s> Evaluator<'s> {
    /// `source` is the text the expressions were parsed from.
    pub fn new(source: &'s str, scope: &'s HashMap<String, Slot>) -> Self {
        Self { source, scope }
    }

    pub fn eval(&self, expr: &Expression<'_>) -> Result<StaticValue, ExtractError> {
        match expr {
            Expression::NullLiteral(_) => Ok(StaticValue::Null),
            Expression::BooleanLiteral(lit) => Ok(StaticValue::Bool(lit.value)),
            Expression::NumericLiteral(lit) => Ok(StaticValue::Number(lit.value)),
            Expression::StringLiteral(lit) => Ok(StaticValue::String(lit.value.to_string())),
            Expression::TemplateLiteral(tpl) => self.eval_template(tpl),
            Expression::Identifier(ident) => self.lookup(ident.name.as_str()),
            Expression::ArrayExpression(arr) => self.eval_array(arr),
            Expression::ObjectExpression(obj) => self.eval_object(obj),
            Expression::ParenthesizedExpression(paren) => self.eval(&paren.expression),
            Expression::UnaryExpression(unary) => self.eval_unary(unary),
            Expression::BinaryExpression(binary) => self.eval_binary(binary),
            Expression::LogicalExpression(logical) => self.eval_logical(logical),
            Expression::ConditionalExpression(cond) => {
                if self.eval(&cond.test)?.is_truthy() {
                    self.eval(&cond.consequent)
                } else {
                    self.eval(&cond.alternate)
                }
            }
            Expression::StaticMemberExpression(member) => {
                let object = self.eval(&member.object)?;
                self.member(object, member.property.name.as_str(), member.optional, member.span)
            }
            Expression::ComputedMemberExpression(member) => {
                let object = self.eval(&member.object)?;
                let key = self.property_name(self.eval(&member.expression)?, member.span)?;
                self.member(object, &key, member.optional, member.span)
            }
            Expression::ChainExpression(chain) => self.eval_chain(&chain.expression),
            Expression::ArrowFunctionExpression(_)
            | Expression::FunctionExpression(_)
            | Expression::ClassExpression(_) => Ok(StaticValue::Function),
            // Type syntax only appears when evaluating unstripped source (enum members).
            Expression::TSAsExpression(e) => self.eval(&e.expression),
            Expression::TSSatisfiesExpression(e) => self.eval(&e.expression),
            Expression::TSNonNullExpression(e) => self.eval(&e.expression),
            Expression::TSTypeAssertion(e) => self.eval(&e.expression),
            Expression::BigIntLiteral(lit) => Err(self.unsupported(
                lit.span,
                "BigInt values cannot be serialized to JSON",
            )),
            other => Err(self.unsupported(
                other.span(),
                "only literal data can be evaluated statically",
            )),
        }
    }

    fn lookup(&self, name: &str) -> Result<StaticValue, ExtractError> {
        if let Some(slot) = self.scope.get(name) {
            return slot.clone();
        }
        match name {
            "undefined" => Ok(StaticValue::Undefined),
            "NaN" => Ok(StaticValue::Number(f64::NAN)),
            "Infinity" => Ok(StaticValue::Number(f64::INFINITY)),
            _ => Err(ExtractError::UnresolvedIdentifier {
                name: name.to_string(),
            }),
        }
    }

    fn eval_template(&self, tpl: &TemplateLiteral<'_>) -> Result<StaticValue, ExtractError> {
        let mut out = String::new();
        for (i, quasi) in tpl.quasis.iter().enumerate() {
            let text = quasi.value.cooked.as_ref().unwrap_or(&quasi.value.raw);
            out.push_str(text.as_str());
            if let Some(expr) = tpl.expressions.get(i) {
                let value = self.eval(expr)?;
                out.push_str(&self.stringify(&value, expr.span())?);
            }
        }
        Ok(StaticValue::String(out))
    }

    fn eval_array(&self, arr: &ArrayExpression<'_>) -> Result<StaticValue, ExtractError> {
        let mut items = Vec::with_capacity(arr.elements.len());
        for element in &arr.elements {
            match element {
                ArrayExpressionElement::SpreadElement(spread) => {
                    match self.eval(&spread.argument)? {
                        StaticValue::Array(values) => items.extend(values),
                        StaticValue::String(s) => {
                            items.extend(s.chars().map(|c| StaticValue::String(c.to_string())))
                        }
                        other => {
                            return Err(self.unsupported(
                                spread.span,
                                format!("spread of a non-iterable {}", other.type_of()),
                            ))
                        }
                    }
                }
                // A hole reads back as undefined.
                ArrayExpressionElement::Elision(_) => items.push(StaticValue::Undefined),
                element => match element.as_expression() {
                    Some(expr) => items.push(self.eval(expr)?),
                    None => {
                        return Err(self.unsupported(arr.span, "unexpected array element"));
                    }
                },
            }
        }
        Ok(StaticValue::Array(items))
    }

    fn eval_object(&self, obj: &ObjectExpression<'_>) -> Result<StaticValue, ExtractError> {
        let mut entries = BTreeMap::new();
        for property in &obj.properties {
            match property {
                ObjectPropertyKind::ObjectProperty(prop) => {
                    if !matches!(prop.kind, PropertyKind::Init) {
                        return Err(self.unsupported(
                            prop.span,
                            "getters and setters cannot be evaluated statically",
                        ));
                    }
                    let key = self.property_key(&prop.key, prop.span)?;
                    // Methods arrive as function expressions.
                    let value = self.eval(&prop.value)?;
                    // A literal `__proto__: v` sets the prototype, not an own key.
                    if key == "__proto__" && !prop.computed && !prop.shorthand && !prop.method {
                        continue;
                    }
                    entries.insert(key, value);
                }
                ObjectPropertyKind::SpreadProperty(spread) => {
                    match self.eval(&spread.argument)? {
                        StaticValue::Object(other) => entries.extend(other),
                        StaticValue::Array(items) => {
                            for (i, item) in items.into_iter().enumerate() {
                                entries.insert(i.to_string(), item);
                            }
                        }
                        StaticValue::String(s) => {
                            for (i, c) in s.chars().enumerate() {
                                entries.insert(i.to_string(), StaticValue::String(c.to_string()));
                            }
                        }
                        // Spreading primitives and nullish values copies nothing.
                        _ => {}
                    }
                }
            }
        }
        Ok(StaticValue::Object(entries))
    }

    fn property_key(&self, key: &PropertyKey<'_>, span: Span) -> Result<String, ExtractError> {
        match key {
            PropertyKey::StaticIdentifier(ident) => Ok(ident.name.to_string()),
            PropertyKey::PrivateIdentifier(_) => {
                Err(self.unsupported(span, "private names cannot appear in data"))
            }
            key => match key.as_expression() {
                Some(expr) => self.property_name(self.eval(expr)?, expr.span()),
                None => Err(self.unsupported(span, "unexpected property key")),
            },
        }
    }

    fn property_name(&self, value: StaticValue, span: Span) -> Result<String, ExtractError> {
        self.stringify(&value, span)
    }

    fn stringify(&self, value: &StaticValue, span: Span) -> Result<String, ExtractError> {
        value
            .to_js_string()
            .ok_or_else(|| self.unsupported(span, "functions have no static string form"))
    }

    fn eval_unary(&self, unary: &UnaryExpression<'_>) -> Result<StaticValue, ExtractError> {
        if matches!(unary.operator, UnaryOperator::Void) {
            return Ok(StaticValue::Undefined);
        }
        let value = self.eval(&unary.argument)?;
        match unary.operator {
            UnaryOperator::UnaryNegation => Ok(StaticValue::Number(-value.to_number())),
            UnaryOperator::UnaryPlus => Ok(StaticValue::Number(value.to_number())),
            UnaryOperator::LogicalNot => Ok(StaticValue::Bool(!value.is_truthy())),
            UnaryOperator::Typeof => Ok(StaticValue::String(value.type_of().to_string())),
            UnaryOperator::BitwiseNot => Ok(StaticValue::Number(f64::from(!to_int32(value.to_number())))),
            _ => Err(self.unsupported(unary.span, "unsupported unary operator")),
        }
    }

    fn eval_binary(&self, binary: &BinaryExpression<'_>) -> Result<StaticValue, ExtractError> {
        let left = self.eval(&binary.left)?;
        let right = self.eval(&binary.right)?;
        let number = |n: f64| Ok(StaticValue::Number(n));
        let int32 = |op: fn(i32, i32) -> i32| {
            number(f64::from(op(to_int32(left.to_number()), to_int32(right.to_number()))))
        };

        match binary.operator {
            BinaryOperator::Addition => self.add(left, right, binary.span),
            BinaryOperator::Subtraction => number(left.to_number() - right.to_number()),
            BinaryOperator::Multiplication => number(left.to_number() * right.to_number()),
            BinaryOperator::Division => number(left.to_number() / right.to_number()),
            BinaryOperator::Remainder => number(left.to_number() % right.to_number()),
            BinaryOperator::Exponential => number(left.to_number().powf(right.to_number())),
            BinaryOperator::StrictEquality => Ok(StaticValue::Bool(left.strict_equals(&right))),
            BinaryOperator::BitwiseOR => int32(|l, r| l | r),
            BinaryOperator::BitwiseAnd => int32(|l, r| l & r),
            BinaryOperator::BitwiseXOR => int32(|l, r| l ^ r),
            BinaryOperator::ShiftLeft => int32(|l, r| l.wrapping_shl(r as u32 & 31)),
            BinaryOperator::ShiftRight => int32(|l, r| l.wrapping_shr(r as u32 & 31)),
            BinaryOperator::ShiftRightZeroFill => {
                let shift = to_uint32(right.to_number()) & 31;
                number(f64::from(to_uint32(left.to_number()) >> shift))
            }
            BinaryOperator::StrictInequality => {
                Ok(StaticValue::Bool(!left.strict_equals(&right)))
            }
            _ => Err(self.unsupported(binary.span, "unsupported binary operator")),
        }
    }

    fn add(
        &self,
        left: StaticValue,
        right: StaticValue,
        span: Span,
    ) -> Result<StaticValue, ExtractError> {
        let concatenates = |v: &StaticValue| {
            matches!(
                v,
                StaticValue::String(_) | StaticValue::Array(_) | StaticValue::Object(_)
            )
        };
        if concatenates(&left) || concatenates(&right) {
            let mut out = self.stringify(&left, span)?;
            out.push_str(&self.stringify(&right, span)?);
            Ok(StaticValue::String(out))
        } else {
            Ok(StaticValue::Number(left.to_number() + right.to_number()))
        }
    }

    fn eval_logical(&self, logical: &LogicalExpression<'_>) -> Result<StaticValue, ExtractError> {
        let left = self.eval(&logical.left)?;
        let take_left = match logical.operator {
            LogicalOperator::And => !left.is_truthy(),
            LogicalOperator::Or => left.is_truthy(),
            LogicalOperator::Coalesce => !left.is_nullish(),
        };
        if take_left {
            Ok(left)
        } else {
            self.eval(&logical.right)
        }
    }

    /// Optional chains short-circuit to undefined on any nullish link.
    fn eval_chain(&self, element: &ChainElement<'_>) -> Result<StaticValue, ExtractError> {
        match element {
            ChainElement::StaticMemberExpression(member) => {
                let object = self.eval(&member.object)?;
                self.member(object, member.property.name.as_str(), true, member.span)
            }
            ChainElement::ComputedMemberExpression(member) => {
                let object = self.eval(&member.object)?;
                let key = self.property_name(self.eval(&member.expression)?, member.span)?;
                self.member(object, &key, true, member.span)
            }
            other => Err(self.unsupported(other.span(), "only property access chains are supported")),
        }
    }

    fn member(
        &self,
        object: StaticValue,
        key: &str,
        optional: bool,
        span: Span,
    ) -> Result<StaticValue, ExtractError> {
        match object {
            StaticValue::Undefined | StaticValue::Null if optional => Ok(StaticValue::Undefined),
            StaticValue::Undefined | StaticValue::Null => Err(self.unsupported(
                span,
                format!("cannot read `{}` of {}", key, object.to_js_string().unwrap_or_default()),
            )),
            StaticValue::Object(mut entries) => {
                Ok(entries.remove(key).unwrap_or(StaticValue::Undefined))
            }
            StaticValue::Array(items) => {
                if key == "length" {
                    return Ok(StaticValue::Number(items.len() as f64));
                }
                Ok(array_index(key)
                    .and_then(|i| items.into_iter().nth(i))
                    .unwrap_or(StaticValue::Undefined))
            }
            StaticValue::String(s) => {
                let units: Vec<u16> = s.encode_utf16().collect();
                if key == "length" {
                    return Ok(StaticValue::Number(units.len() as f64));
                }
                Ok(array_index(key)
                    .and_then(|i| units.get(i))
                    .map(|unit| StaticValue::String(String::from_utf16_lossy(&[*unit])))
                    .unwrap_or(StaticValue::Undefined))
            }
            _ => Ok(StaticValue::Undefined),
        }
    }

    pub(crate) fn unsupported(&self, span: Span, reason: impl Into<String>) -> ExtractError {
        ExtractError::UnsupportedExpression {
            snippet: snippet(self.source, span),
            reason: reason.into(),
        }
    }
}

/// Canonical array index keys only: "1" indexes, "01" does not.
fn array_index(key: &str) -> Option<usize> {
    key.parse::<usize>()
        .ok()
        .filter(|i| i.to_string() == key)
}
