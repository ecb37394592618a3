use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils;

/// Named backend deployments sharing the same search contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instances(BTreeMap<String, String>);

impl Default for Instances {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert(
            "live".to_string(),
            "https://nodenativelive.cirrius.in/api/v1/searchLog".to_string(),
        );
        map.insert(
            "local".to_string(),
            "http://74.225.207.226:8002/search".to_string(),
        );
        Self(map)
    }
}

impl Instances {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, endpoint: impl Into<String>) {
        self.0
            .insert(name.into().trim().to_lowercase(), endpoint.into());
    }

    pub fn endpoint(&self, name: &str) -> Option<&str> {
        self.0.get(&name.trim().to_lowercase()).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Raw, unvalidated search input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchForm {
    pub client_id: String,
    pub repcode: String,
    pub log_type: String,
    /// Single-day shorthand; fills whichever of start/end is left empty.
    pub date: String,
    pub start_date: String,
    pub end_date: String,
    pub instance: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub client_id: String,
    pub repcode: String,
    #[serde(rename = "type")]
    pub log_type: String,
    pub start_date: String,
    pub end_date: String,
    pub instance: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormField {
    ClientId,
    Repcode,
    Type,
    StartDate,
    EndDate,
    Instance,
}

impl FormField {
    pub fn name(self) -> &'static str {
        match self {
            FormField::ClientId => "clientId",
            FormField::Repcode => "repcode",
            FormField::Type => "type",
            FormField::StartDate => "startDate",
            FormField::EndDate => "endDate",
            FormField::Instance => "instance",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{}", join_field_errors(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn for_field(&self, field: FormField) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field.name(), e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl SearchForm {
    /// Checks every field and reports all problems at once.
    pub fn validate(&self, instances: &Instances) -> Result<SearchCriteria, ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: FormField, message: &str| {
            errors.push(FieldError {
                field,
                message: message.to_string(),
            })
        };

        let client_id = self.client_id.trim();
        if client_id.is_empty() {
            push(FormField::ClientId, "Client ID is required");
        }
        let repcode = self.repcode.trim();
        if repcode.is_empty() {
            push(FormField::Repcode, "Repcode is required");
        }
        let log_type = self.log_type.trim();
        if log_type.is_empty() {
            push(FormField::Type, "Please select a type");
        }

        let pick = |explicit: &str| {
            let explicit = explicit.trim();
            if explicit.is_empty() {
                self.date.trim().to_string()
            } else {
                explicit.to_string()
            }
        };
        let mut check_date = |field: FormField, raw: String| -> Option<String> {
            if raw.is_empty() {
                push(field, "Date is required");
                return None;
            }
            match utils::normalize_date(&raw) {
                Ok(date) => Some(date),
                Err(_) => {
                    push(field, "invalid date");
                    None
                }
            }
        };
        let start_date = check_date(FormField::StartDate, pick(&self.start_date));
        let end_date = check_date(FormField::EndDate, pick(&self.end_date));
        if let (Some(start), Some(end)) = (start_date.as_ref(), end_date.as_ref()) {
            // normalized dates compare correctly as strings
            if end < start {
                push(FormField::EndDate, "end date must not be before start date");
            }
        }

        let instance = self.instance.trim().to_lowercase();
        if instance.is_empty() {
            push(FormField::Instance, "Please select an instance");
        } else if instances.endpoint(&instance).is_none() {
            let known = instances.names().collect::<Vec<_>>().join(", ");
            push(
                FormField::Instance,
                &format!("unknown instance, expected one of: {known}"),
            );
        }

        if !errors.is_empty() {
            return Err(ValidationError { errors });
        }

        Ok(SearchCriteria {
            client_id: client_id.to_string(),
            repcode: repcode.to_string(),
            log_type: log_type.to_string(),
            start_date: start_date.unwrap_or_default(),
            end_date: end_date.unwrap_or_default(),
            instance,
        })
    }
}
