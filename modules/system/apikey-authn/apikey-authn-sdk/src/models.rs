//! Domain models for API key authentication.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identity established by a successfully validated API key.
///
/// Built by the outcome builder after the key has been recovered from the
/// token, then attached to the request for downstream authorization checks.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Principal {
    /// Authentication scheme that produced this principal (e.g. `"x-api-key"`).
    scheme: String,
    /// Subject id recovered from the key, if the key carries one.
    subject: Option<String>,
    /// Role names granted to the subject.
    #[serde(default)]
    roles: Vec<String>,
    /// Free-form identity claims.
    #[serde(default)]
    claims: BTreeMap<String, String>,
}

impl Principal {
    /// Create a new `Principal` builder for `scheme`.
    #[must_use]
    pub fn builder(scheme: &str) -> PrincipalBuilder {
        PrincipalBuilder {
            scheme: scheme.to_owned(),
            ..PrincipalBuilder::default()
        }
    }

    /// A principal that is authenticated and carries no further identity.
    #[must_use]
    pub fn authenticated(scheme: &str) -> Self {
        Self::builder(scheme).build()
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn claims(&self) -> &BTreeMap<String, String> {
        &self.claims
    }
}

#[derive(Default)]
pub struct PrincipalBuilder {
    scheme: String,
    subject: Option<String>,
    roles: Vec<String>,
    claims: BTreeMap<String, String>,
}

impl PrincipalBuilder {
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    #[must_use]
    pub fn roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    #[must_use]
    pub fn claim(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Principal {
        Principal {
            scheme: self.scheme,
            subject: self.subject,
            roles: self.roles,
            claims: self.claims,
        }
    }
}

/// Why an authentication attempt was rejected.
///
/// `NoKeyProvided` and `InvalidKey` are produced by the authenticator itself.
/// `InvalidKey` deliberately covers every way a presented token can be bad
/// (not base64, tampered, wrong purpose, expired, unparsable payload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NoKeyProvided,
    InvalidKey,
    /// Rejected by the outcome builder.
    Denied(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoKeyProvided => f.write_str("no key provided"),
            Self::InvalidKey => f.write_str("invalid key"),
            Self::Denied(reason) => f.write_str(reason),
        }
    }
}

/// Final authentication decision for a request.
///
/// Cheap to clone: accepted principals are shared, so repeated cache hits
/// hand out the very same `Arc<Principal>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationOutcome {
    Accepted(Arc<Principal>),
    Rejected(RejectReason),
}

impl AuthenticationOutcome {
    #[must_use]
    pub fn accepted(principal: Principal) -> Self {
        Self::Accepted(Arc::new(principal))
    }

    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Rejected(RejectReason::Denied(reason.into()))
    }

    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    #[must_use]
    pub fn principal(&self) -> Option<&Arc<Principal>> {
        match self {
            Self::Accepted(principal) => Some(principal),
            Self::Rejected(_) => None,
        }
    }

    #[must_use]
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Accepted(_) => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}
