//! Argument validation.
//!
//! Two concerns live here: the check on a declared method name, and a
//! small declarative [`Schema`] for object-shaped arguments. A schema turns
//! into a [`Validate`] with [`Schema::validator`], or is converted during
//! construction by [`schema_mixin`].

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::context::ExecutionContext;
use crate::error::{BoxError, ConfigError, FieldError, ValidationError};
use crate::method::{MethodConfig, Validate, ValidateReturn};
use crate::mixin::Mixin;

/// Field error kinds reported by [`Schema::validate`].
pub mod kinds {
    pub const REQUIRED: &str = "required";
    pub const EXPECTED_TYPE: &str = "expectedType";
    pub const KEY_NOT_IN_SCHEMA: &str = "keyNotInSchema";
}

/// Error constants for validation failures.
pub mod errmsg {
    pub const ARGUMENTS_NOT_OBJECT: &str = "Arguments must be an object";
}

/// Name reported when the arguments themselves are not an object.
pub const ARGUMENTS_FIELD: &str = "arguments";

/// Name of the mixin returned by [`schema_mixin`].
pub const SCHEMA_MIXIN: &str = "schemaMixin";

/// Validate a method name.
///
/// Rules:
/// - Must not be empty
pub fn validate_method_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyName);
    }
    Ok(())
}

/// Expected JSON type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Number,
    /// A number without a fractional part.
    Integer,
    String,
    Boolean,
    Object,
    Array,
    Any,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Number => "Number",
            FieldType::Integer => "Integer",
            FieldType::String => "String",
            FieldType::Boolean => "Boolean",
            FieldType::Object => "Object",
            FieldType::Array => "Array",
            FieldType::Any => "Any",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.as_f64().is_some_and(|n| n.fract() == 0.0),
            FieldType::String => value.is_string(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
            FieldType::Any => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FieldRule {
    name: String,
    field_type: FieldType,
    optional: bool,
}

/// Declarative shape of an object argument.
///
/// Fields are checked in declaration order, so reported errors come out in
/// the same order every time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<FieldRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field. Redeclaring a name replaces the earlier rule.
    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.rule(name.into(), field_type, false)
    }

    pub fn optional_field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.rule(name.into(), field_type, true)
    }

    fn rule(mut self, name: String, field_type: FieldType, optional: bool) -> Self {
        self.fields.retain(|rule| rule.name != name);
        self.fields.push(FieldRule {
            name,
            field_type,
            optional,
        });
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|rule| rule.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check `args` against the schema, collecting every violation.
    ///
    /// `Null` is treated as an empty object. Any other non-object fails
    /// with a single error naming the arguments.
    pub fn validate(&self, args: &Value) -> Result<(), ValidationError> {
        let empty = Map::new();
        let object = match args {
            Value::Null => &empty,
            Value::Object(object) => object,
            other => {
                let error = FieldError::new(ARGUMENTS_FIELD, kinds::EXPECTED_TYPE)
                    .with_details(json!({"dataType": "Object", "value": other}));
                return Err(ValidationError::new(vec![error])
                    .with_message(errmsg::ARGUMENTS_NOT_OBJECT));
            }
        };

        let mut errors = Vec::new();
        for rule in &self.fields {
            match object.get(&rule.name) {
                None | Some(Value::Null) if rule.optional => {}
                None | Some(Value::Null) => {
                    errors.push(FieldError::new(&rule.name, kinds::REQUIRED));
                }
                Some(value) if !rule.field_type.matches(value) => {
                    errors.push(
                        FieldError::new(&rule.name, kinds::EXPECTED_TYPE)
                            .with_details(json!({"dataType": rule.field_type.as_str()})),
                    );
                }
                Some(_) => {}
            }
        }

        for key in object.keys() {
            if !self.fields.iter().any(|rule| &rule.name == key) {
                errors.push(FieldError::new(key, kinds::KEY_NOT_IN_SCHEMA));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(errors))
        }
    }

    /// Validator that raises the schema's [`ValidationError`].
    pub fn validator(&self) -> Validate {
        let schema = self.clone();
        Validate::With(Arc::new(move |_: &ExecutionContext, args: &Value| {
            schema
                .validate(args)
                .map(|()| ValidateReturn::Nothing)
                .map_err(|error| Box::new(error) as BoxError)
        }))
    }
}

/// Mixin that turns the declared `schema` into the method's validator.
///
/// Produces nothing, and so fails construction, when no schema is
/// declared.
pub fn schema_mixin() -> Mixin {
    Mixin::named(SCHEMA_MIXIN, |mut config: MethodConfig| {
        let validate = config.schema.as_ref()?.validator();
        config.validate = Some(validate);
        Some(config)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    mod method_name {
        use super::*;

        #[test]
        fn test_valid_name() {
            assert!(validate_method_name("todos.insert").is_ok());
        }

        #[test]
        fn test_empty_name_rejected() {
            assert!(matches!(
                validate_method_name(""),
                Err(ConfigError::EmptyName)
            ));
        }
    }

    mod schema {
        use super::*;

        fn int_and_string() -> Schema {
            Schema::new()
                .field("int", FieldType::Number)
                .field("string", FieldType::String)
        }

        fn kinds_of(error: &ValidationError) -> Vec<(&str, &str)> {
            error
                .errors
                .iter()
                .map(|e| (e.name.as_str(), e.kind.as_str()))
                .collect()
        }

        #[test]
        fn test_missing_fields_reported_in_order() {
            let err = int_and_string().validate(&json!({})).unwrap_err();
            assert_eq!(
                kinds_of(&err),
                vec![("int", kinds::REQUIRED), ("string", kinds::REQUIRED)]
            );
        }

        #[test]
        fn test_valid_arguments() {
            assert!(int_and_string()
                .validate(&json!({"int": 5, "string": "what"}))
                .is_ok());
        }

        #[test]
        fn test_wrong_type() {
            let err = int_and_string()
                .validate(&json!({"int": "5", "string": "what"}))
                .unwrap_err();
            assert_eq!(kinds_of(&err), vec![("int", kinds::EXPECTED_TYPE)]);
            assert_eq!(err.errors[0].details, Some(json!({"dataType": "Number"})));
        }

        #[test]
        fn test_unknown_key() {
            let err = Schema::new().validate(&json!({"extra": 1})).unwrap_err();
            assert_eq!(kinds_of(&err), vec![("extra", kinds::KEY_NOT_IN_SCHEMA)]);
        }

        #[test]
        fn test_null_is_empty_object() {
            assert!(Schema::new().validate(&Value::Null).is_ok());
            let err = int_and_string().validate(&Value::Null).unwrap_err();
            assert_eq!(err.errors.len(), 2);
        }

        #[test]
        fn test_non_object_arguments() {
            let err = Schema::new().validate(&json!([1, 2])).unwrap_err();
            assert_eq!(kinds_of(&err), vec![(ARGUMENTS_FIELD, kinds::EXPECTED_TYPE)]);
            assert_eq!(err.message, errmsg::ARGUMENTS_NOT_OBJECT);
        }

        #[test]
        fn test_optional_field() {
            let schema = Schema::new().optional_field("limit", FieldType::Integer);
            assert!(schema.validate(&json!({})).is_ok());
            assert!(schema.validate(&json!({"limit": null})).is_ok());
            assert!(schema.validate(&json!({"limit": 1.5})).is_err());
        }

        #[test]
        fn test_integer_accepts_whole_floats() {
            assert!(FieldType::Integer.matches(&json!(5)));
            assert!(FieldType::Integer.matches(&json!(5.0)));
            assert!(FieldType::Integer.matches(&json!(-3)));
            assert!(!FieldType::Integer.matches(&json!(5.5)));
            assert!(!FieldType::Integer.matches(&json!("5")));
        }

        #[test]
        fn test_redeclared_field_replaces_rule() {
            let schema = Schema::new()
                .field("id", FieldType::Number)
                .field("id", FieldType::String);
            assert_eq!(schema.len(), 1);
            assert!(schema.validate(&json!({"id": "abc"})).is_ok());
        }

        #[test]
        fn test_validator_raises_validation_error() {
            let Validate::With(validate) = int_and_string().validator() else {
                panic!("expected a validator function");
            };
            let err = validate(&ExecutionContext::new(), &json!({})).unwrap_err();
            let err = ValidationError::wrap(err);
            assert_eq!(err.errors.len(), 2);
        }
    }

    mod mixin {
        use super::*;

        #[test]
        fn test_schema_becomes_validate() {
            let config = MethodConfig::new("m").schema(Schema::new());
            let config = schema_mixin().apply(config).unwrap();
            assert!(matches!(config.validate, Some(Validate::With(_))));
        }

        #[test]
        fn test_missing_schema_produces_nothing() {
            let mixin = schema_mixin();
            assert_eq!(mixin.name(), Some(SCHEMA_MIXIN));
            assert!(mixin.apply(MethodConfig::new("m")).is_none());
        }
    }
}
