//! Typed result binding.
//!
//! A response body is bound into a [`Dto`] either statically (`bind_as::<T>`) or
//! through a [`TargetType`], a small type-erased binder that can be chosen at
//! runtime, e.g. resolved by name from a [`DtoRegistry`].
//!
//! # Example
//!
//! ```
//! use courier_core::{Dto, FieldErrors, ValidationPhase, bind_as};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Account {
//!     id: u64,
//!     email: String,
//! }
//!
//! impl Dto for Account {
//!     fn validate(&self, phase: ValidationPhase) -> Result<(), FieldErrors> {
//!         let mut errors = FieldErrors::new();
//!         if phase == ValidationPhase::Full && !self.email.contains('@') {
//!             errors.add("email", "must be an e-mail address");
//!         }
//!         errors.into_result()
//!     }
//! }
//!
//! let account: Account = bind_as(json!({"id": 1, "email": "a@b.c"}), true).unwrap();
//! assert_eq!(account.id, 1);
//! assert!(bind_as::<Account>(json!({"id": 1, "email": "nope"}), true).is_err());
//! ```

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, Result};

/// Validation pass run on a freshly bound DTO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationPhase {
    /// Field type and shape checks only.
    Type,
    /// Every rule, including cross-field and business rules.
    Full,
}

/// Field name to list of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// No errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Messages recorded for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when empty, `Err(self)` otherwise.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// JSON form: `{"field": ["message", ...]}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(field, messages)| {
                    let messages = messages.iter().cloned().map(Value::String).collect();
                    (field.clone(), Value::Array(messages))
                })
                .collect(),
        )
    }
}

/// A data transfer object that a response body can be bound into.
pub trait Dto: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Check the bound value. The default accepts everything.
    ///
    /// # Errors
    ///
    /// Returns the violated rules, keyed by field.
    fn validate(&self, phase: ValidationPhase) -> std::result::Result<(), FieldErrors> {
        let _ = phase;
        Ok(())
    }
}

/// Bind a decoded JSON value into `T`, optionally validating it.
///
/// The value must be a JSON object. With `validate`, the [`ValidationPhase::Type`]
/// pass runs first, then [`ValidationPhase::Full`]; the first failing pass aborts.
///
/// # Errors
///
/// - [`Error::JsonDeserialization`] if the value is not an object or does not fit `T`
/// - [`Error::Validation`] if a validation pass fails
pub fn bind_as<T: Dto>(value: Value, validate: bool) -> Result<T> {
    if !value.is_object() {
        return Err(Error::json_deserialization(
            "",
            format!(
                "expected a JSON object for {}, found {}",
                std::any::type_name::<T>(),
                json_kind(&value)
            ),
        ));
    }

    let dto: T = crate::from_value(value)?;
    if validate {
        for phase in [ValidationPhase::Type, ValidationPhase::Full] {
            dto.validate(phase).map_err(|errors| {
                Error::validation(
                    format!("{} failed {phase:?} validation", std::any::type_name::<T>()),
                    errors.to_value(),
                )
            })?;
        }
    }
    Ok(dto)
}

/// Bind an object into `T`; any other value (`null`, arrays, scalars) yields `None`.
///
/// # Errors
///
/// See [`bind_as`].
pub fn bind_optional<T: Dto>(value: Value, validate: bool) -> Result<Option<T>> {
    if value.is_object() {
        bind_as(value, validate).map(Some)
    } else {
        Ok(None)
    }
}

/// Bind a decoded value into the requested target, or pass it through untouched.
///
/// Only JSON objects are bound; other values pass through as [`Payload::Value`]
/// even when a target is set.
///
/// # Errors
///
/// See [`bind_as`].
pub fn bind(value: Value, target: Option<TargetType>, validate: bool) -> Result<Payload> {
    match target {
        Some(target) if value.is_object() => target.bind(value, validate).map(Payload::Dto),
        _ => Ok(Payload::Value(value)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Type-erased binding
// ============================================================================

/// A runtime-selectable bind target. Only [`Dto`] types can produce one.
#[derive(Clone, Copy)]
pub struct TargetType {
    name: &'static str,
    binder: fn(Value, bool) -> Result<BoundDto>,
}

impl TargetType {
    /// Target for `T`.
    #[must_use]
    pub fn of<T: Dto>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            binder: |value, validate| bind_as::<T>(value, validate).map(BoundDto::new),
        }
    }

    /// Rust type name of the target.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Bind a value into this target.
    ///
    /// # Errors
    ///
    /// See [`bind_as`].
    pub fn bind(&self, value: Value, validate: bool) -> Result<BoundDto> {
        (self.binder)(value, validate)
    }
}

impl fmt::Debug for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetType").field(&self.name).finish()
    }
}

trait ErasedDto: Any + fmt::Debug + Send + Sync {
    fn to_value(&self) -> Result<Value>;
    fn clone_box(&self) -> Box<dyn ErasedDto>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Dto> ErasedDto for T {
    fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Into::into)
    }

    fn clone_box(&self) -> Box<dyn ErasedDto> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A bound DTO whose concrete type is only known at runtime.
pub struct BoundDto {
    type_name: &'static str,
    inner: Box<dyn ErasedDto>,
}

impl BoundDto {
    fn new<T: Dto>(dto: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Box::new(dto),
        }
    }

    /// Rust type name of the bound value.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow as `T` if that is the bound type.
    #[must_use]
    pub fn downcast_ref<T: Dto>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref()
    }

    /// Take the value as `T`, or get `self` back on a type mismatch.
    pub fn downcast<T: Dto>(self) -> std::result::Result<T, Self> {
        match self.downcast_ref::<T>() {
            Some(dto) => Ok(dto.clone()),
            None => Err(self),
        }
    }

    /// Re-encode the bound value as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_value(&self) -> Result<Value> {
        self.inner.to_value()
    }
}

impl Clone for BoundDto {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            inner: self.inner.clone_box(),
        }
    }
}

impl fmt::Debug for BoundDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

/// Result of an untyped send.
#[derive(Debug, Clone)]
pub enum Payload {
    /// No target type was requested: the decoded JSON value.
    Value(Value),
    /// The body bound into the requested target type.
    Dto(BoundDto),
}

impl Payload {
    /// The pass-through value, if no target type was requested.
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Dto(_) => None,
        }
    }

    /// Borrow the bound DTO as `T`.
    #[must_use]
    pub fn as_dto<T: Dto>(&self) -> Option<&T> {
        match self {
            Self::Dto(dto) => dto.downcast_ref(),
            Self::Value(_) => None,
        }
    }

    /// Take the bound DTO as `T`.
    #[must_use]
    pub fn into_dto<T: Dto>(self) -> Option<T> {
        match self {
            Self::Dto(dto) => dto.downcast().ok(),
            Self::Value(_) => None,
        }
    }

    /// JSON form of the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if a bound DTO fails to serialize.
    pub fn to_value(&self) -> Result<Value> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Dto(dto) => dto.to_value(),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Maps type names to bind targets, for targets chosen by name at runtime.
#[derive(Debug, Clone, Default)]
pub struct DtoRegistry {
    targets: HashMap<String, TargetType>,
}

impl DtoRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `name`, replacing any previous entry.
    pub fn register<T: Dto>(&mut self, name: impl Into<String>) -> &mut Self {
        self.targets.insert(name.into(), TargetType::of::<T>());
        self
    }

    /// Builder-style [`DtoRegistry::register`].
    #[must_use]
    pub fn with<T: Dto>(mut self, name: impl Into<String>) -> Self {
        self.register::<T>(name);
        self
    }

    /// Resolve a name to its target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeConstraint`] if `name` was never registered.
    pub fn resolve(&self, name: &str) -> Result<TargetType> {
        self.targets
            .get(name)
            .copied()
            .ok_or_else(|| Error::TypeConstraint(name.to_string()))
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Invoice {
        number: String,
        amount: i64,
        lines: Vec<Line>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Line {
        sku: String,
        qty: u32,
    }

    impl Dto for Invoice {
        fn validate(&self, phase: ValidationPhase) -> std::result::Result<(), FieldErrors> {
            let mut errors = FieldErrors::new();
            match phase {
                ValidationPhase::Type => {
                    if self.number.is_empty() {
                        errors.add("number", "must not be empty");
                    }
                }
                ValidationPhase::Full => {
                    if self.amount < 0 {
                        errors.add("amount", "must not be negative");
                    }
                    if self.lines.is_empty() {
                        errors.add("lines", "at least one line is required");
                    }
                }
            }
            errors.into_result()
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    impl Dto for Note {}

    fn invoice_json() -> Value {
        json!({
            "number": "INV-1",
            "amount": 1250,
            "lines": [{"sku": "A-1", "qty": 2}]
        })
    }

    #[test]
    fn bind_round_trip_reproduces_json() {
        let source = invoice_json();
        let invoice: Invoice = bind_as(source.clone(), true).expect("bind");
        check!(invoice.number == "INV-1");
        check!(invoice.lines.len() == 1);
        check!(serde_json::to_value(&invoice).expect("encode") == source);
    }

    #[test]
    fn bind_without_validation_skips_rules() {
        let invoice: Invoice =
            bind_as(json!({"number": "", "amount": -1, "lines": []}), false).expect("bind");
        check!(invoice.amount == -1);
    }

    #[test]
    fn type_phase_failure_aborts_before_full_phase() {
        let err = bind_as::<Invoice>(json!({"number": "", "amount": -1, "lines": []}), true)
            .expect_err("invalid");
        let_assert!(Error::Validation { message, errors } = err);
        check!(message.contains("Type"));
        check!(errors == json!({"number": ["must not be empty"]}));
    }

    #[test]
    fn full_phase_collects_every_field() {
        let err = bind_as::<Invoice>(json!({"number": "X", "amount": -1, "lines": []}), true)
            .expect_err("invalid");
        check!(
            err.errors()
                == Some(&json!({
                    "amount": ["must not be negative"],
                    "lines": ["at least one line is required"]
                }))
        );
    }

    #[test]
    fn shape_mismatch_is_deserialization_error() {
        let err = bind_as::<Invoice>(json!({"number": "X", "amount": "lots", "lines": []}), false)
            .expect_err("bad shape");
        let_assert!(Error::JsonDeserialization { path, .. } = err);
        check!(path == "amount");
    }

    #[test]
    fn non_object_value_is_rejected() {
        let err = bind_as::<Note>(json!(["text"]), false).expect_err("array");
        check!(err.to_string().contains("found an array"));

        let err = bind_as::<Note>(Value::Null, false).expect_err("null");
        check!(err.to_string().contains("found null"));
    }

    #[test]
    fn bind_passes_through_without_target() {
        let payload = bind(json!([1, 2]), None, true).expect("pass-through");
        check!(payload.as_value() == Some(&json!([1, 2])));
        check!(payload.as_dto::<Note>().is_none());
    }

    #[test]
    fn bind_passes_non_objects_through_with_target() {
        let target = Some(TargetType::of::<Note>());

        let payload = bind(Value::Null, target, true).expect("null");
        check!(payload.as_value() == Some(&Value::Null));

        let payload = bind(json!([1, 2]), target, true).expect("array");
        check!(payload.as_value() == Some(&json!([1, 2])));
        check!(payload.as_dto::<Note>().is_none());
    }

    #[test]
    fn bind_optional_binds_objects_only() {
        check!(bind_optional::<Note>(Value::Null, true).expect("null").is_none());
        check!(bind_optional::<Note>(json!("text"), true).expect("string").is_none());

        let note = bind_optional::<Note>(json!({"text": "hi"}), true).expect("object");
        check!(note == Some(Note { text: "hi".to_string() }));

        let err = bind_optional::<Invoice>(json!({"number": ""}), false).expect_err("bad shape");
        let_assert!(Error::JsonDeserialization { .. } = err);
    }

    #[test]
    fn bind_with_target_type() {
        let payload = bind(json!({"text": "hi"}), Some(TargetType::of::<Note>()), false)
            .expect("bind");
        check!(payload.as_value().is_none());
        check!(payload.as_dto::<Note>() == Some(&Note { text: "hi".to_string() }));
        check!(payload.as_dto::<Invoice>().is_none());
        check!(payload.to_value().expect("encode") == json!({"text": "hi"}));

        let cloned = payload.clone();
        check!(cloned.into_dto::<Note>() == Some(Note { text: "hi".to_string() }));
    }

    #[test]
    fn bound_dto_downcast_mismatch_returns_self() {
        let bound = TargetType::of::<Note>()
            .bind(json!({"text": "hi"}), false)
            .expect("bind");
        let bound = bound.downcast::<Invoice>().expect_err("wrong type");
        check!(bound.type_name().ends_with("Note"));
        check!(bound.downcast::<Note>().expect("right type").text == "hi");
    }

    #[test]
    fn registry_resolves_registered_names() {
        let registry = DtoRegistry::new().with::<Note>("note").with::<Invoice>("invoice");
        check!(registry.contains("note"));

        let target = registry.resolve("invoice").expect("registered");
        check!(target.name().ends_with("Invoice"));
    }

    #[test]
    fn registry_rejects_unknown_names() {
        let registry = DtoRegistry::new().with::<Note>("note");
        let err = registry.resolve("receipt").expect_err("unknown");
        let_assert!(Error::TypeConstraint(name) = err);
        check!(name == "receipt");
    }

    #[test]
    fn field_errors_helpers() {
        let mut errors = FieldErrors::new();
        check!(errors.clone().into_result().is_ok());
        errors.add("name", "required");
        errors.add("name", "too short");
        check!(errors.get("name") == ["required", "too short"]);
        check!(errors.get("other").is_empty());
        check!(serde_json::to_value(&errors).expect("encode") == errors.to_value());
    }
}
