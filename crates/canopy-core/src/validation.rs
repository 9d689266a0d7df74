//! Field-level validation errors
//!
//! Errors accumulate per field (or per field and locale, keyed
//! `"<field>-<locale>"`) and are never raised; a save that collected any of
//! them returns [`SaveOutcome::Invalid`](crate::SaveOutcome::Invalid).

use crate::types::LocaleId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Record an error for one locale's copy of a field
    pub fn add_for_locale(
        &mut self,
        field: &str,
        locale: &LocaleId,
        message: impl Into<String>,
    ) {
        self.add(Self::locale_key(field, locale), message);
    }

    pub fn locale_key(field: &str, locale: &LocaleId) -> String {
        format!("{}-{}", field, locale)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            for message in messages {
                if !first {
                    writeln!(f)?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("handle", "Handle cannot be blank.");
        errors.add("handle", "Handle is invalid.");
        errors.add_for_locale("urlFormat", &LocaleId::from("de"), "URL Format cannot be blank.");

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("handle").len(), 2);
        assert!(errors.has("urlFormat-de"));
        assert!(errors.get("name").is_empty());
    }

    #[test]
    fn test_display_lists_every_message() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "Name cannot be blank.");
        errors.add("handle", "Handle cannot be blank.");

        let text = errors.to_string();
        assert_eq!(text, "handle: Handle cannot be blank.\nname: Name cannot be blank.");
    }
}
