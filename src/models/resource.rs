use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Review lifecycle of a donation/offer listing. `Rejected` and `Completed`
/// are terminal for reviewers; a rejected listing leaves the terminal state
/// only through an owner resubmission (edit → back to `Pending`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Pending,
    Approved,
    Rejected,
    Matched,
    Completed,
}

impl ResourceStatus {
    pub fn can_transition_to(self, next: ResourceStatus) -> bool {
        use ResourceStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, Rejected)
                | (Approved, Matched)
                | (Matched, Completed)
        )
    }

    /// Owner content edits are only allowed before approval or after a
    /// rejection.
    pub fn editable_by_owner(self) -> bool {
        matches!(self, ResourceStatus::Pending | ResourceStatus::Rejected)
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceStatus::Pending => "pending",
            ResourceStatus::Approved => "approved",
            ResourceStatus::Rejected => "rejected",
            ResourceStatus::Matched => "matched",
            ResourceStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ResourceStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ResourceStatus::Pending),
            "approved" => Ok(ResourceStatus::Approved),
            "rejected" => Ok(ResourceStatus::Rejected),
            "matched" => Ok(ResourceStatus::Matched),
            "completed" => Ok(ResourceStatus::Completed),
            _ => Err(anyhow::anyhow!("Unknown resource status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Uuid,
    pub user_id: Uuid,
    pub org_type: String,
    pub org_name: String,
    pub resource_type: String,
    pub title: String,
    pub description: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub status: String,
    pub reject_reason: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resource joined with the submitting user's display name.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub resource: Resource,
    pub provider_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceRequest {
    pub org_type: String,
    pub org_name: String,
    pub resource_type: String,
    pub title: String,
    pub description: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResourceRequest {
    pub org_type: Option<String>,
    pub org_name: Option<String>,
    pub resource_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResourceRequest {
    pub status: ResourceStatus,
    pub reject_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFilters {
    pub org_type: Option<String>,
    pub resource_type: Option<String>,
    pub status: Option<ResourceStatus>,
}

#[cfg(test)]
mod tests {
    use super::ResourceStatus::*;
    use super::*;

    const ALL: [ResourceStatus; 5] = [Pending, Approved, Rejected, Matched, Completed];

    #[test]
    fn transition_matrix() {
        let allowed = [
            (Pending, Approved),
            (Pending, Rejected),
            (Approved, Rejected),
            (Approved, Matched),
            (Matched, Completed),
        ];
        for from in ALL {
            for to in ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {expected}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for to in ALL {
            assert!(!Rejected.can_transition_to(to));
            assert!(!Completed.can_transition_to(to));
        }
    }

    #[test]
    fn owner_edit_window() {
        assert!(Pending.editable_by_owner());
        assert!(Rejected.editable_by_owner());
        assert!(!Approved.editable_by_owner());
        assert!(!Matched.editable_by_owner());
        assert!(!Completed.editable_by_owner());
    }

    #[test]
    fn status_string_round_trip() {
        for s in ALL {
            let parsed: ResourceStatus = s.to_string().parse().unwrap();
            assert_eq!(parsed, s);
        }
    }
}
