//! Per-request authorization context.
//!
//! Built once from verified token claims and threaded through every data
//! access for the lifetime of the request. The establishment id comes only
//! from the verified claims, never from client-supplied input.

use mongodb::bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

use super::role::Role;

/// The authenticated identity derived from a verified token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    /// Absent for unrestricted roles; may be absent for scoped roles that
    /// have not yet been assigned an establishment (bootstrap state).
    pub establishment_id: Option<String>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role, establishment_id: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            establishment_id,
        }
    }
}

/// A record owned by an establishment. Implemented by every tenant-scoped
/// model so the context and the scope injector can check ownership and
/// name the record in audit entries.
pub trait ScopedResource {
    const RESOURCE_TYPE: &'static str;

    fn resource_id(&self) -> String;
    fn establishment_id(&self) -> Option<&str>;
}

/// Why an access decision came back negative. The rendered reason is what
/// lands in the audit entry and the HTTP rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenial {
    /// The resource carries no establishment id at all. Always denied,
    /// never fails open.
    MissingEstablishment { resource_type: &'static str },
    /// The resource belongs to a different establishment than the caller.
    EstablishmentMismatch { resource: String, principal: String },
    /// One side of a parent/child pair carries no establishment id.
    RelationshipMissingEstablishment { side: &'static str },
    /// Parent and child belong to different establishments.
    CrossEstablishmentRelationship { parent: String, child: String },
}

impl AccessDenial {
    pub fn reason(&self) -> String {
        match self {
            AccessDenial::MissingEstablishment { resource_type } => {
                format!("resource has no establishment: {}", resource_type)
            }
            AccessDenial::EstablishmentMismatch {
                resource,
                principal,
            } => format!(
                "establishment mismatch: resource belongs to {}, caller is scoped to {}",
                resource, principal
            ),
            AccessDenial::RelationshipMissingEstablishment { side } => {
                format!("{} record has no establishment", side)
            }
            AccessDenial::CrossEstablishmentRelationship { parent, child } => {
                format!("cross-establishment relationship: {} != {}", parent, child)
            }
        }
    }
}

impl std::fmt::Display for AccessDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason())
    }
}

impl std::error::Error for AccessDenial {}

/// Identifiers are compared by canonical string form so an ObjectId-shaped
/// hex string and its display form never fail an equality check.
fn canonical_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match ObjectId::parse_str(trimmed) {
        Ok(oid) => oid.to_hex(),
        Err(_) => trimmed.to_string(),
    }
}

fn ids_match(a: &str, b: &str) -> bool {
    canonical_id(a) == canonical_id(b)
}

/// Immutable per-request authorization context. A pure value type: all
/// fields are copied from the Principal at construction and never change
/// for the lifetime of the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    principal: Principal,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl AuthContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_request_meta(
        mut self,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> &str {
        &self.principal.user_id
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// True iff the caller's role is exempt from establishment scoping.
    /// Role-derived only; there is no request-derived escalation path.
    pub fn can_access_all(&self) -> bool {
        self.principal.role.can_access_all()
    }

    pub fn establishment_id(&self) -> Option<&str> {
        self.principal.establishment_id.as_deref()
    }

    /// Augment a query filter with the caller's establishment constraint.
    ///
    /// Unrestricted callers get the filter back unchanged. Scoped callers
    /// with an establishment get `establishment_id = <theirs>` merged in;
    /// any client-supplied value for that key is overwritten, never
    /// trusted. A scoped caller without an establishment (bootstrap state)
    /// passes through — reachable only from allow-listed bootstrap routes,
    /// see `middleware::establishment`.
    pub fn apply_filter(&self, mut base: Document) -> Document {
        if self.can_access_all() {
            return base;
        }
        if let Some(eid) = self.establishment_id() {
            base.insert("establishment_id", canonical_id(eid));
        }
        base
    }

    /// Decide whether the caller may touch a fetched record. A record
    /// without an establishment id is always denied for scoped callers.
    pub fn validate_access<R: ScopedResource>(&self, resource: &R) -> Result<(), AccessDenial> {
        if self.can_access_all() {
            return Ok(());
        }
        let Some(principal_eid) = self.establishment_id() else {
            // Bootstrap state: no establishment assigned yet.
            return Ok(());
        };
        match resource.establishment_id() {
            None => Err(AccessDenial::MissingEstablishment {
                resource_type: R::RESOURCE_TYPE,
            }),
            Some(resource_eid) if ids_match(resource_eid, principal_eid) => Ok(()),
            Some(resource_eid) => Err(AccessDenial::EstablishmentMismatch {
                resource: resource_eid.to_string(),
                principal: principal_eid.to_string(),
            }),
        }
    }

    /// Check that a parent/child pair belongs to the same establishment.
    /// Both sides must carry an establishment id; guards against attaching
    /// a record from establishment A to a parent in establishment B.
    pub fn validate_relationship<P: ScopedResource, C: ScopedResource>(
        &self,
        parent: &P,
        child: &C,
    ) -> Result<(), AccessDenial> {
        let parent_eid = parent.establishment_id().ok_or(
            AccessDenial::RelationshipMissingEstablishment { side: "parent" },
        )?;
        let child_eid = child
            .establishment_id()
            .ok_or(AccessDenial::RelationshipMissingEstablishment { side: "child" })?;

        if ids_match(parent_eid, child_eid) {
            Ok(())
        } else {
            Err(AccessDenial::CrossEstablishmentRelationship {
                parent: parent_eid.to_string(),
                child: child_eid.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    struct Rec {
        id: String,
        establishment_id: Option<String>,
    }

    impl ScopedResource for Rec {
        const RESOURCE_TYPE: &'static str = "record";

        fn resource_id(&self) -> String {
            self.id.clone()
        }

        fn establishment_id(&self) -> Option<&str> {
            self.establishment_id.as_deref()
        }
    }

    fn staff_ctx(eid: Option<&str>) -> AuthContext {
        AuthContext::new(Principal::new(
            "user_1",
            Role::Staff,
            eid.map(|s| s.to_string()),
        ))
    }

    fn admin_ctx() -> AuthContext {
        AuthContext::new(Principal::new("admin_1", Role::Admin, None))
    }

    #[test]
    fn test_scoped_filter_gets_establishment_constraint() {
        let ctx = staff_ctx(Some("E1"));
        let filtered = ctx.apply_filter(doc! { "status": "confirmed" });
        assert_eq!(filtered, doc! { "status": "confirmed", "establishment_id": "E1" });
    }

    #[test]
    fn test_unrestricted_filter_passes_through() {
        let ctx = admin_ctx();
        let filtered = ctx.apply_filter(doc! { "status": "confirmed" });
        assert_eq!(filtered, doc! { "status": "confirmed" });
    }

    #[test]
    fn test_client_supplied_establishment_is_overwritten() {
        let ctx = staff_ctx(Some("E1"));
        let filtered = ctx.apply_filter(doc! { "establishment_id": "E2" });
        assert_eq!(filtered, doc! { "establishment_id": "E1" });
    }

    #[test]
    fn test_unassigned_scoped_principal_passes_filter_through() {
        let ctx = staff_ctx(None);
        let filtered = ctx.apply_filter(doc! { "status": "open" });
        assert_eq!(filtered, doc! { "status": "open" });
    }

    #[test]
    fn test_scoped_roles_never_access_all() {
        for role in [Role::Staff, Role::Manager] {
            let ctx = AuthContext::new(Principal::new("u", role, Some("E1".to_string())));
            assert!(!ctx.can_access_all());
        }
    }

    #[test]
    fn test_validate_access_same_establishment() {
        let ctx = staff_ctx(Some("E1"));
        let rec = Rec {
            id: "b1".to_string(),
            establishment_id: Some("E1".to_string()),
        };
        assert!(ctx.validate_access(&rec).is_ok());
    }

    #[test]
    fn test_validate_access_cross_establishment_denied() {
        let ctx = staff_ctx(Some("E1"));
        let rec = Rec {
            id: "b1".to_string(),
            establishment_id: Some("E2".to_string()),
        };
        let denial = ctx.validate_access(&rec).unwrap_err();
        assert!(matches!(denial, AccessDenial::EstablishmentMismatch { .. }));
    }

    #[test]
    fn test_validate_access_missing_establishment_fails_closed() {
        let ctx = staff_ctx(Some("E1"));
        let rec = Rec {
            id: "b1".to_string(),
            establishment_id: None,
        };
        let denial = ctx.validate_access(&rec).unwrap_err();
        assert_eq!(
            denial,
            AccessDenial::MissingEstablishment {
                resource_type: "record"
            }
        );
        assert!(denial.reason().contains("resource has no establishment"));
    }

    #[test]
    fn test_validate_access_unrestricted_allows_missing_establishment() {
        let rec = Rec {
            id: "b1".to_string(),
            establishment_id: None,
        };
        assert!(admin_ctx().validate_access(&rec).is_ok());
    }

    #[test]
    fn test_validate_relationship_mismatch_names_both_ids() {
        let ctx = staff_ctx(Some("E1"));
        let parent = Rec {
            id: "p".to_string(),
            establishment_id: Some("E1".to_string()),
        };
        let child = Rec {
            id: "c".to_string(),
            establishment_id: Some("E2".to_string()),
        };
        let denial = ctx.validate_relationship(&parent, &child).unwrap_err();
        assert_eq!(
            denial.reason(),
            "cross-establishment relationship: E1 != E2"
        );
    }

    #[test]
    fn test_validate_relationship_requires_both_sides() {
        let ctx = staff_ctx(Some("E1"));
        let parent = Rec {
            id: "p".to_string(),
            establishment_id: None,
        };
        let child = Rec {
            id: "c".to_string(),
            establishment_id: Some("E1".to_string()),
        };
        let denial = ctx.validate_relationship(&parent, &child).unwrap_err();
        assert!(matches!(
            denial,
            AccessDenial::RelationshipMissingEstablishment { side: "parent" }
        ));
    }

    #[test]
    fn test_object_id_compared_by_canonical_form() {
        let oid = mongodb::bson::oid::ObjectId::new();
        let upper = oid.to_hex().to_uppercase();
        let ctx = staff_ctx(Some(upper.as_str()));
        let rec = Rec {
            id: "r".to_string(),
            establishment_id: Some(oid.to_hex()),
        };
        assert!(ctx.validate_access(&rec).is_ok());
    }
}
