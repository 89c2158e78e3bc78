//! Lead Record
//!
//! The sales-qualification fields collected during a single conversation.
//! Fields are filled opportunistically by the model through the
//! `update_lead_info` tool, in whatever order the caller happens to mention
//! them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Placeholder used in the lead file name when no name was captured.
pub const UNKNOWN_LEAD_NAME: &str = "unknown";

/// The qualification data captured for one caller.
///
/// Only captured fields are serialized, in declaration order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LeadRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_case: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
}

/// Arguments for the `update_lead_info` tool.
///
/// Every field is optional; the model sends only what the caller just said.
#[derive(Deserialize, JsonSchema, Debug, Clone, Default)]
pub struct UpdateLeadInfoArgs {
    #[schemars(description = "The name of the user")]
    pub name: Option<String>,
    #[schemars(description = "The company name")]
    pub company: Option<String>,
    #[schemars(description = "The email address")]
    pub email: Option<String>,
    #[schemars(description = "The user's role or designation")]
    pub role: Option<String>,
    #[schemars(description = "The intended use case for Razorpay")]
    pub use_case: Option<String>,
    #[schemars(description = "The size of the team")]
    pub team_size: Option<String>,
    #[schemars(description = "Implementation timeline (now/soon/later)")]
    pub timeline: Option<String>,
}

impl LeadRecord {
    /// Merges an update into the record.
    ///
    /// A field is overwritten only by a present, non-empty value. Content is
    /// not validated.
    pub fn apply(&mut self, update: UpdateLeadInfoArgs) {
        overwrite(&mut self.name, update.name);
        overwrite(&mut self.company, update.company);
        overwrite(&mut self.email, update.email);
        overwrite(&mut self.role, update.role);
        overwrite(&mut self.use_case, update.use_case);
        overwrite(&mut self.team_size, update.team_size);
        overwrite(&mut self.timeline, update.timeline);
    }

    /// Returns `true` when no field has been captured yet.
    pub fn is_empty(&self) -> bool {
        [
            &self.name,
            &self.company,
            &self.email,
            &self.role,
            &self.use_case,
            &self.team_size,
            &self.timeline,
        ]
        .iter()
        .all(|field| field.is_none())
    }

    /// The file name this record is persisted under: `lead_<name>.json`.
    pub fn file_name(&self) -> String {
        let name = self.name.as_deref().unwrap_or(UNKNOWN_LEAD_NAME);
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        format!("lead_{}.json", sanitized)
    }
}

fn overwrite(slot: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        *slot = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> UpdateLeadInfoArgs {
        UpdateLeadInfoArgs::default()
    }

    #[test]
    fn test_last_non_empty_value_wins_per_field() {
        let mut lead = LeadRecord::default();
        lead.apply(UpdateLeadInfoArgs {
            name: Some("Jane".into()),
            company: Some("Acme".into()),
            ..args()
        });
        lead.apply(UpdateLeadInfoArgs {
            email: Some("jane@acme.test".into()),
            ..args()
        });
        lead.apply(UpdateLeadInfoArgs {
            name: Some("Jane Doe".into()),
            company: Some(String::new()),
            ..args()
        });

        assert_eq!(lead.name.as_deref(), Some("Jane Doe"));
        assert_eq!(lead.company.as_deref(), Some("Acme"));
        assert_eq!(lead.email.as_deref(), Some("jane@acme.test"));
        assert_eq!(lead.role, None);
    }

    #[test]
    fn test_empty_update_leaves_record_unchanged() {
        let mut lead = LeadRecord {
            team_size: Some("40".into()),
            ..Default::default()
        };
        let before = lead.clone();
        lead.apply(args());
        assert_eq!(lead, before);
    }

    #[test]
    fn test_no_validation_of_field_content() {
        let mut lead = LeadRecord::default();
        lead.apply(UpdateLeadInfoArgs {
            email: Some("not an email".into()),
            ..args()
        });
        assert_eq!(lead.email.as_deref(), Some("not an email"));
    }

    #[test]
    fn test_is_empty() {
        let mut lead = LeadRecord::default();
        assert!(lead.is_empty());
        lead.apply(UpdateLeadInfoArgs {
            timeline: Some("soon".into()),
            ..args()
        });
        assert!(!lead.is_empty());
    }

    #[test]
    fn test_file_name_replaces_whitespace() {
        let lead = LeadRecord {
            name: Some("Jane  Doe\tSr".into()),
            ..Default::default()
        };
        assert_eq!(lead.file_name(), "lead_Jane__Doe_Sr.json");
    }

    #[test]
    fn test_file_name_falls_back_to_unknown() {
        let lead = LeadRecord {
            company: Some("Acme".into()),
            ..Default::default()
        };
        assert_eq!(lead.file_name(), "lead_unknown.json");
    }

    #[test]
    fn test_serializes_only_captured_fields_in_order() {
        let lead = LeadRecord {
            company: Some("Acme".into()),
            name: Some("Jane Doe".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&lead).unwrap();
        assert_eq!(json, r#"{"name":"Jane Doe","company":"Acme"}"#);
    }

    #[test]
    fn test_args_accept_nulls_and_missing_fields() {
        let parsed: UpdateLeadInfoArgs =
            serde_json::from_str(r#"{"name": null, "role": "CTO"}"#).unwrap();
        assert_eq!(parsed.name, None);
        assert_eq!(parsed.role.as_deref(), Some("CTO"));
        assert_eq!(parsed.email, None);
    }
}
