//! Owner identity resolved once at the request boundary.

use uuid::Uuid;

/// Where the owner identity came from, strongest first.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OwnerSource {
    /// Supplied by the upstream authentication layer.
    Verified,
    /// User id declared in the request body or query string.
    DeclaredId,
    /// Only an email address was declared.
    DeclaredEmail,
    /// Nothing usable was supplied.
    Unresolved,
}

/// The single owner-resolution value passed into ingestion and retrieval.
///
/// Built exactly once per request from the ranked candidates
/// (verified identity > declared user id > declared email > none) instead
/// of re-deriving the owner ad hoc inside each operation. The declared
/// email is carried alongside the id so the record keeps the denormalized
/// address even when the id wins the ranking.
#[derive(Clone, PartialEq, Debug)]
pub struct OwnerResolution {
    pub source: OwnerSource,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
}

impl OwnerResolution {
    pub fn rank(
        verified_id: Option<Uuid>,
        verified_email: Option<String>,
        declared_id: Option<Uuid>,
        declared_email: Option<String>,
    ) -> Self {
        let email = verified_email.or(declared_email);
        if let Some(id) = verified_id {
            return Self {
                source: OwnerSource::Verified,
                user_id: Some(id),
                email,
            };
        }
        if let Some(id) = declared_id {
            return Self {
                source: OwnerSource::DeclaredId,
                user_id: Some(id),
                email,
            };
        }
        if email.is_some() {
            return Self {
                source: OwnerSource::DeclaredEmail,
                user_id: None,
                email,
            };
        }
        Self {
            source: OwnerSource::Unresolved,
            user_id: None,
            email: None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.source == OwnerSource::Unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verified_identity_outranks_declared_id() {
        let verified = Uuid::new_v4();
        let declared = Uuid::new_v4();
        let owner = OwnerResolution::rank(
            Some(verified),
            Some("auth@example.com".into()),
            Some(declared),
            Some("body@example.com".into()),
        );
        assert_eq!(owner.source, OwnerSource::Verified);
        assert_eq!(owner.user_id, Some(verified));
        assert_eq!(owner.email.as_deref(), Some("auth@example.com"));
    }

    #[test]
    fn declared_id_keeps_declared_email() {
        let declared = Uuid::new_v4();
        let owner =
            OwnerResolution::rank(None, None, Some(declared), Some("body@example.com".into()));
        assert_eq!(owner.source, OwnerSource::DeclaredId);
        assert_eq!(owner.user_id, Some(declared));
        assert_eq!(owner.email.as_deref(), Some("body@example.com"));
    }

    #[test]
    fn email_alone_resolves() {
        let owner = OwnerResolution::rank(None, None, None, Some("a@b.com".into()));
        assert_eq!(owner.source, OwnerSource::DeclaredEmail);
        assert_eq!(owner.user_id, None);
        assert!(!owner.is_unresolved());
    }

    #[test]
    fn nothing_supplied_is_unresolved() {
        let owner = OwnerResolution::rank(None, None, None, None);
        assert!(owner.is_unresolved());
        assert_eq!(owner.email, None);
    }
}
