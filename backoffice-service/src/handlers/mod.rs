pub mod audit;
pub mod auth;
pub mod bookings;
pub mod employees;
pub mod establishments;
pub mod invoices;
pub mod users;

use crate::authz::AuthContext;
use crate::services::ServiceError;

/// Decide which establishment a new record belongs to.
///
/// Scoped callers always create records in their own establishment; any
/// client-supplied value is ignored, never trusted. Unrestricted callers
/// must name the target establishment explicitly.
pub(crate) fn resolve_establishment(
    ctx: &AuthContext,
    requested: Option<String>,
) -> Result<String, ServiceError> {
    if ctx.can_access_all() {
        return requested.ok_or_else(|| {
            ServiceError::Validation(
                "establishment_id is required for unrestricted callers".to_string(),
            )
        });
    }
    ctx.establishment_id()
        .map(|s| s.to_string())
        .ok_or_else(|| {
            ServiceError::Validation("caller has no establishment assigned".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{AuthContext, Principal, Role};

    #[test]
    fn test_scoped_caller_ignores_client_supplied_establishment() {
        let ctx = AuthContext::new(Principal::new("u", Role::Staff, Some("E1".to_string())));
        let eid = resolve_establishment(&ctx, Some("E2".to_string())).unwrap();
        assert_eq!(eid, "E1");
    }

    #[test]
    fn test_admin_must_name_target_establishment() {
        let ctx = AuthContext::new(Principal::new("u", Role::Admin, None));
        assert!(resolve_establishment(&ctx, None).is_err());
        let eid = resolve_establishment(&ctx, Some("E2".to_string())).unwrap();
        assert_eq!(eid, "E2");
    }
}
