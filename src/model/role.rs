use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Direction,
    DeputyDirection,
    Supervisor,
    Staff,
}

/// Everything a role may be entitled to. Handlers ask for one of these
/// instead of comparing role names.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Capability {
    SubmitLeave,
    ReviewAsSupervisor,
    ReviewAsDirection,
    ViewAllLeave,
    ManageUsers,
    RegisterMedicalLeave,
    ViewMedicalLeave,
    PublishAnnouncement,
    PublishDocument,
    ManageEvents,
}

use Capability::*;

const ADMIN: &[Capability] = &[
    SubmitLeave,
    ViewAllLeave,
    ManageUsers,
    ViewMedicalLeave,
    PublishAnnouncement,
    PublishDocument,
    ManageEvents,
];
const DIRECTION: &[Capability] = &[SubmitLeave, ReviewAsDirection, ManageUsers, ManageEvents];
const DEPUTY_DIRECTION: &[Capability] = &[
    SubmitLeave,
    ReviewAsDirection,
    RegisterMedicalLeave,
    ViewMedicalLeave,
    PublishAnnouncement,
    PublishDocument,
    ManageEvents,
];
const SUPERVISOR: &[Capability] = &[SubmitLeave, ReviewAsSupervisor];
const STAFF: &[Capability] = &[SubmitLeave];

impl Role {
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Admin => ADMIN,
            Role::Direction => DIRECTION,
            Role::DeputyDirection => DEPUTY_DIRECTION,
            Role::Supervisor => SUPERVISOR,
            Role::Staff => STAFF,
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_names_round_trip_through_strum_and_serde() {
        assert_eq!(Role::DeputyDirection.as_ref(), "DEPUTY_DIRECTION");
        assert_eq!(Role::from_str("SUPERVISOR").unwrap(), Role::Supervisor);
        assert!(Role::from_str("JEFE").is_err());

        let json = serde_json::to_string(&Role::Staff).unwrap();
        assert_eq!(json, "\"STAFF\"");
    }

    #[test]
    fn only_reviewers_can_decide_leave() {
        let reviewers: Vec<Role> = [
            Role::Admin,
            Role::Direction,
            Role::DeputyDirection,
            Role::Supervisor,
            Role::Staff,
        ]
        .into_iter()
        .filter(|r| r.can(ReviewAsSupervisor) || r.can(ReviewAsDirection))
        .collect();

        assert_eq!(
            reviewers,
            vec![Role::Direction, Role::DeputyDirection, Role::Supervisor]
        );
    }

    #[test]
    fn everyone_can_submit_leave() {
        for role in [
            Role::Admin,
            Role::Direction,
            Role::DeputyDirection,
            Role::Supervisor,
            Role::Staff,
        ] {
            assert!(role.can(SubmitLeave), "{role} should submit leave");
        }
    }

    #[test]
    fn medical_leave_registration_is_deputy_direction_only() {
        assert!(Role::DeputyDirection.can(RegisterMedicalLeave));
        assert!(!Role::Admin.can(RegisterMedicalLeave));
        assert!(Role::Admin.can(ViewMedicalLeave));
        assert!(!Role::Direction.can(ViewMedicalLeave));
    }
}
