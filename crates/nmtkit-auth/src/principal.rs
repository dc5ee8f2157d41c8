//! Authenticated principal and extraction helpers.

use nmtkit_core::settings::SectionAcl;

use crate::acl::check_acl;
use crate::error::{AuthError, Result};

/// A successfully authenticated client or API key.
///
/// Stored in HTTP request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSuccess {
    /// Configured name of the client or API key.
    pub name: String,
    /// ACLs granted to it.
    pub acls: Vec<SectionAcl>,
}

impl AuthSuccess {
    /// Create a principal.
    pub fn new<S: Into<String>>(name: S, acls: Vec<SectionAcl>) -> Self {
        Self {
            name: name.into(),
            acls,
        }
    }

    /// Whether this principal may perform `method` on `section`.
    pub fn is_permitted(&self, section: &str, method: &str) -> bool {
        check_acl(section, &self.acls, method)
    }
}

/// Extract the `AuthSuccess` from HTTP request `Parts`, if present.
pub fn principal_from_parts(parts: &http::request::Parts) -> Option<&AuthSuccess> {
    parts.extensions.get::<AuthSuccess>()
}

/// Require that the request's principal may perform `method` on `section`.
pub fn require_acl<'a>(
    parts: &'a http::request::Parts,
    section: &str,
    method: &str,
) -> Result<&'a AuthSuccess> {
    let principal = principal_from_parts(parts).ok_or(AuthError::MissingCredentials)?;
    if principal.is_permitted(section, method) {
        Ok(principal)
    } else {
        log::info!(
            "Denied '{method}' on '{section}' for '{}'",
            principal.name
        );
        Err(AuthError::Forbidden {
            section: section.to_string(),
            method: method.to_string(),
        })
    }
}
