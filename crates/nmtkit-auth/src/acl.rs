//! Section ACL evaluation.

use nmtkit_core::settings::SectionAcl;

use crate::patterns;

/// Permission granting every method.
pub const ALL_METHODS: &str = "*";

/// Check whether `method` on `section` is allowed by `acls`.
///
/// ACLs are evaluated in order. An ACL applies when its `section_regex` is
/// empty or matches at the start of `section`. The first applicable ACL
/// decides: it allows when its permissions contain `*` or `method`, and
/// denies otherwise. With no applicable ACL, access is denied.
///
/// ```rust
/// use nmtkit_auth::check_acl;
/// use nmtkit_core::settings::SectionAcl;
///
/// let acls = vec![
///     SectionAcl::new("^widgets", &["GET"]),
///     SectionAcl::new("", &["*"]),
/// ];
/// assert!(check_acl("widgets/7", &acls, "GET"));
/// assert!(!check_acl("widgets/7", &acls, "DELETE"));
/// assert!(check_acl("gadgets", &acls, "DELETE"));
/// ```
pub fn check_acl(section: &str, acls: &[SectionAcl], method: &str) -> bool {
    for acl in acls {
        if !section_applies(&acl.section_regex, section) {
            continue;
        }

        if acl.permissions.iter().any(|p| p == ALL_METHODS) {
            log::debug!("Allow '*' for section '{section}'");
            return true;
        }
        if acl.permissions.iter().any(|p| p == method) {
            log::debug!("Allow method '{method}': permissions: {:?}", acl.permissions);
            return true;
        }

        log::debug!("Method '{method}' not granted for section '{section}'");
        return false;
    }

    log::debug!("No sections matched '{section}'");
    false
}

fn section_applies(section_regex: &str, section: &str) -> bool {
    if section_regex.is_empty() {
        return true;
    }
    // Invalid regexes are logged by the pattern cache and never apply.
    patterns::get_or_compile(&format!("^(?:{section_regex})"))
        .is_some_and(|re| re.is_match(section))
}
