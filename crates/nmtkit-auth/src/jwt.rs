//! Unverified JWT inspection and identity provider lookup.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use nmtkit_core::settings::AuthSettings;
use serde_json::Value;

use crate::error::{AuthError, Result};
use crate::patterns;

/// A base64url-encoded JWT part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JwtPart {
    /// The JOSE header.
    Header,
    /// The claims payload.
    Payload,
}

impl JwtPart {
    fn index(self) -> usize {
        match self {
            JwtPart::Header => 0,
            JwtPart::Payload => 1,
        }
    }

    fn label(self) -> &'static str {
        match self {
            JwtPart::Header => "Header",
            JwtPart::Payload => "Payload",
        }
    }
}

/// Decode one part of a JWT without verifying it.
///
/// Padding is optional.
pub fn decode_jwt_part(token: &str, part: JwtPart) -> Result<Value> {
    let decode_error =
        |msg: String| AuthError::InvalidFormat(format!("{} decoding error: {msg}", part.label()));

    let encoded = token
        .split('.')
        .nth(part.index())
        .ok_or_else(|| decode_error("part is missing".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|e| decode_error(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| decode_error(e.to_string()))
}

/// Strip a leading `Bearer ` from an Authorization value.
pub fn strip_bearer(token: &str) -> &str {
    bearer_token(token).unwrap_or(token)
}

/// Token from an `Authorization` header value using the bearer scheme.
///
/// The scheme name is matched case-insensitively. Returns `None` for other
/// schemes and for an empty token.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim_start().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Find the identity provider whose `issuer_regex` matches the token's `iss`.
///
/// The regex may match anywhere in the issuer. When several providers match,
/// the last one in configuration order wins.
pub fn find_id_provider(token: &str, settings: &AuthSettings) -> Result<String> {
    let token = strip_bearer(token);
    if token.split('.').count() != 3 {
        return Err(AuthError::MalformedToken);
    }

    let payload = decode_jwt_part(token, JwtPart::Payload)?;
    let issuer = payload
        .get("iss")
        .and_then(Value::as_str)
        .ok_or_else(|| AuthError::InvalidFormat("missing iss claim".to_string()))?;

    let mut provider = None;
    for (name, idp) in &settings.id_providers {
        match patterns::get_or_compile(&idp.issuer_regex) {
            Some(re) if re.is_match(issuer) => provider = Some(name),
            Some(_) => {}
            None => log::debug!("Skipping provider '{name}' with invalid issuer regex"),
        }
    }

    provider.cloned().ok_or(AuthError::UnknownProvider)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use nmtkit_core::settings::IdProvider;

    pub(crate) fn unsigned_token(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    fn settings_with(providers: &[(&str, &str)]) -> AuthSettings {
        let mut settings = AuthSettings::default();
        for (name, regex) in providers {
            settings.id_providers.insert(
                name.to_string(),
                IdProvider {
                    issuer_regex: regex.to_string(),
                    ..Default::default()
                },
            );
        }
        settings
    }

    #[test]
    fn test_decode_header_and_payload() {
        let token = unsigned_token(&serde_json::json!({"iss": "https://id.example.com", "sub": "a"}));
        let header = decode_jwt_part(&token, JwtPart::Header).unwrap();
        assert_eq!(header["alg"], "RS256");
        let payload = decode_jwt_part(&token, JwtPart::Payload).unwrap();
        assert_eq!(payload["sub"], "a");
    }

    #[test]
    fn test_decode_accepts_padding() {
        let part = URL_SAFE_NO_PAD.encode(br#"{"a":1}"#);
        let padded = format!("{part}==.x.y");
        assert_eq!(decode_jwt_part(&padded, JwtPart::Header).unwrap()["a"], 1);
    }

    #[test]
    fn test_decode_errors_name_the_part() {
        let err = decode_jwt_part("!!!.???.sig", JwtPart::Payload).unwrap_err();
        assert!(err.to_string().contains("Payload decoding error"));

        let not_json = format!("{}.x.y", URL_SAFE_NO_PAD.encode(b"not json"));
        let err = decode_jwt_part(&not_json, JwtPart::Header).unwrap_err();
        assert!(err.to_string().contains("Header decoding error"));
    }

    #[test]
    fn test_strip_bearer() {
        assert_eq!(strip_bearer("Bearer abc"), "abc");
        assert_eq!(strip_bearer("abc"), "abc");
        assert_eq!(strip_bearer("bearer abc"), "abc");
        assert_eq!(strip_bearer("BEARER abc"), "abc");
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bEaReR  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_find_id_provider_last_match_wins() {
        let settings = settings_with(&[("first", "example\\.com"), ("second", "^https://id\\.")]);
        let token = unsigned_token(&serde_json::json!({"iss": "https://id.example.com"}));
        assert_eq!(find_id_provider(&token, &settings).unwrap(), "second");
        assert_eq!(
            find_id_provider(&format!("Bearer {token}"), &settings).unwrap(),
            "second"
        );
    }

    #[test]
    fn test_find_id_provider_unknown() {
        let settings = settings_with(&[("corp", "corp\\.example")]);
        let token = unsigned_token(&serde_json::json!({"iss": "https://evil.example"}));
        assert!(matches!(
            find_id_provider(&token, &settings),
            Err(AuthError::UnknownProvider)
        ));
    }

    #[test]
    fn test_find_id_provider_invalid_regex_skipped() {
        let settings = settings_with(&[("broken", "(id"), ("corp", "corp\\.example")]);
        let token = unsigned_token(&serde_json::json!({"iss": "https://corp.example"}));
        assert_eq!(find_id_provider(&token, &settings).unwrap(), "corp");
        assert!(crate::patterns::is_cached("(id"));
        assert_eq!(find_id_provider(&token, &settings).unwrap(), "corp");
    }

    #[test]
    fn test_find_id_provider_malformed() {
        let settings = settings_with(&[("corp", ".*")]);
        assert!(matches!(
            find_id_provider("only.two", &settings),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn test_find_id_provider_missing_issuer() {
        let settings = settings_with(&[("corp", ".*")]);
        let token = unsigned_token(&serde_json::json!({"sub": "a"}));
        assert!(matches!(
            find_id_provider(&token, &settings),
            Err(AuthError::InvalidFormat(_))
        ));
    }
}
