//! Typed access to raw JSON documents
//!
//! Every accessor reports failures against the entity being parsed (a
//! profile, a network, a host) so that parse errors carry the same context
//! as checker errors.

use std::net::IpAddr;

use ipnet::IpNet;
use nettopo_core::range::first_duplicate;
use nettopo_core::{ValidationError, ValidationResult};
use serde_json::{Map, Value};

/// Parse a property value into a non-empty JSON object
pub fn parse_document(key: &str, text: &str) -> ValidationResult<Value> {
    let value: Value = serde_json::from_str(text).map_err(|e| ValidationError::MalformedInput {
        context: key.to_string(),
        reason: format!("not valid JSON: {e}"),
    })?;

    match value.as_object() {
        Some(map) if !map.is_empty() => Ok(value),
        _ => Err(ValidationError::MalformedInput {
            context: key.to_string(),
            reason: "empty or not a dictionary".to_string(),
        }),
    }
}

/// A JSON object read under a named context
#[derive(Debug, Clone)]
pub struct Section<'a> {
    context: String,
    map: &'a Map<String, Value>,
}

impl<'a> Section<'a> {
    /// Top level document, already checked by [`parse_document`]
    pub fn document(context: &str, value: &'a Value) -> ValidationResult<Self> {
        match value.as_object() {
            Some(map) if !map.is_empty() => Ok(Self {
                context: context.to_string(),
                map,
            }),
            _ => Err(ValidationError::MalformedInput {
                context: context.to_string(),
                reason: "empty or not a dictionary".to_string(),
            }),
        }
    }

    /// Non-empty object found under `field` of `context`
    pub fn nested(context: &str, field: &str, value: &'a Value) -> ValidationResult<Self> {
        match value.as_object() {
            Some(map) if !map.is_empty() => Ok(Self {
                context: context.to_string(),
                map,
            }),
            _ => Err(wrong_type(context, field, "a non-empty dictionary")),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Same object, reported under another context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            map: self.map,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'a String, &'a Value)> {
        self.map.iter()
    }

    pub fn has(&self, field: &str) -> bool {
        self.map.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field)
    }

    pub fn require(&self, field: &str) -> ValidationResult<&'a Value> {
        self.map
            .get(field)
            .ok_or_else(|| ValidationError::MissingField {
                context: self.context.clone(),
                field: field.to_string(),
            })
    }

    pub fn section(&self, field: &str) -> ValidationResult<Section<'a>> {
        Section::nested(&self.context, field, self.require(field)?)
    }

    pub fn opt_section(&self, field: &str) -> ValidationResult<Option<Section<'a>>> {
        self.get(field)
            .map(|value| Section::nested(&self.context, field, value))
            .transpose()
    }

    pub fn string(&self, field: &str) -> ValidationResult<&'a str> {
        expect_str(&self.context, field, self.require(field)?)
    }

    pub fn opt_string(&self, field: &str) -> ValidationResult<Option<&'a str>> {
        self.get(field)
            .map(|value| expect_str(&self.context, field, value))
            .transpose()
    }

    pub fn opt_integer(&self, field: &str) -> ValidationResult<Option<i64>> {
        self.get(field)
            .map(|value| {
                value
                    .as_i64()
                    .ok_or_else(|| wrong_type(&self.context, field, "an integer"))
            })
            .transpose()
    }

    pub fn opt_bool(&self, field: &str) -> ValidationResult<Option<bool>> {
        self.get(field)
            .map(|value| {
                value
                    .as_bool()
                    .ok_or_else(|| wrong_type(&self.context, field, "a boolean value"))
            })
            .transpose()
    }

    /// Mandatory non-empty list of strings
    pub fn string_list(&self, field: &str) -> ValidationResult<Vec<String>> {
        expect_string_list(&self.context, field, self.require(field)?)
    }

    /// Optional list of strings, possibly empty
    pub fn opt_strings(&self, field: &str) -> ValidationResult<Vec<String>> {
        match self.get(field) {
            None => Ok(Vec::new()),
            Some(value) => strings(&self.context, field, value),
        }
    }

    pub fn cidr(&self, field: &str) -> ValidationResult<IpNet> {
        parse_cidr(&self.context, field, self.string(field)?)
    }

    pub fn opt_cidr(&self, field: &str) -> ValidationResult<Option<IpNet>> {
        self.opt_string(field)?
            .map(|text| parse_cidr(&self.context, field, text))
            .transpose()
    }

    pub fn opt_ip(&self, field: &str) -> ValidationResult<Option<IpAddr>> {
        self.opt_string(field)?
            .map(|text| parse_ip(&self.context, field, text))
            .transpose()
    }
}

pub fn wrong_type(context: &str, field: &str, expected: &'static str) -> ValidationError {
    ValidationError::WrongType {
        context: context.to_string(),
        field: field.to_string(),
        expected,
    }
}

pub fn expect_str<'a>(context: &str, field: &str, value: &'a Value) -> ValidationResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| wrong_type(context, field, "a string"))
}

/// Non-empty list of distinct strings
pub fn expect_string_list(context: &str, field: &str, value: &Value) -> ValidationResult<Vec<String>> {
    let list = strings(context, field, value)?;
    if list.is_empty() {
        return Err(wrong_type(context, field, "a non-empty list"));
    }
    if first_duplicate(list.iter().map(String::as_str)).is_some() {
        return Err(wrong_type(context, field, "a duplicate-free list"));
    }
    Ok(list)
}

fn strings(context: &str, field: &str, value: &Value) -> ValidationResult<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| wrong_type(context, field, "a list"))?;
    items
        .iter()
        .map(|item| expect_str(context, field, item).map(str::to_string))
        .collect()
}

pub fn parse_ip(context: &str, field: &str, text: &str) -> ValidationResult<IpAddr> {
    text.parse().map_err(|_| ValidationError::InvalidAddress {
        context: context.to_string(),
        field: field.to_string(),
        value: text.to_string(),
    })
}

/// CIDR in `address/prefix` form with no host bits set
pub fn parse_cidr(context: &str, field: &str, text: &str) -> ValidationResult<IpNet> {
    let invalid = || ValidationError::InvalidAddress {
        context: context.to_string(),
        field: field.to_string(),
        value: text.to_string(),
    };
    let net: IpNet = text.parse().map_err(|_| invalid())?;
    if net.trunc() != net {
        return Err(invalid());
    }
    Ok(net)
}
