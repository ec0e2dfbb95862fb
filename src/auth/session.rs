//! Session token transport: the `jwt` cookie, with `Authorization: Bearer`
//! accepted as a fallback for non-browser clients.

use actix_web::cookie::time::{Duration, OffsetDateTime};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpRequest;

use crate::auth::token::SessionClaim;

pub const SESSION_COOKIE_NAME: &str = "jwt";

/// Cookie carrying a freshly issued token. Expires together with the token.
pub fn session_cookie(token: &str, claim: &SessionClaim, secure: bool) -> Cookie<'static> {
    let expires = OffsetDateTime::from_unix_timestamp(claim.expires_at.timestamp())
        .unwrap_or_else(|_| OffsetDateTime::now_utc() + Duration::hours(24));

    Cookie::build(SESSION_COOKIE_NAME, token.to_owned())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .expires(expires)
        .finish()
}

/// Replacement cookie telling the client to drop its session: empty value,
/// expiry an hour in the past.
pub fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE_NAME, "")
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .expires(OffsetDateTime::now_utc() - Duration::hours(1))
        .max_age(Duration::ZERO)
        .finish()
}

/// Token from the session cookie, or else from a bearer header. The scheme
/// name is matched case-insensitively.
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
        .map(|(_, token)| token.trim())
        .filter(|t| !t.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::session_ttl;
    use actix_web::test::TestRequest;
    use chrono::Utc;

    #[test]
    fn test_session_cookie_attributes() {
        let claim = SessionClaim::new(1, Utc::now(), session_ttl());
        let cookie = session_cookie("abc.def.ghi", &claim, true);

        assert_eq!(cookie.name(), "jwt");
        assert_eq!(cookie.value(), "abc.def.ghi");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        let expires = cookie.expires_datetime().unwrap();
        assert_eq!(expires.unix_timestamp(), claim.expires_at.timestamp());
    }

    #[test]
    fn test_expired_cookie_is_in_the_past() {
        let cookie = expired_session_cookie(true);
        assert_eq!(cookie.name(), "jwt");
        assert_eq!(cookie.value(), "");
        assert!(cookie.expires_datetime().unwrap() < OffsetDateTime::now_utc());
    }

    #[test]
    fn test_extract_token_prefers_cookie() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE_NAME, "from-cookie"))
            .insert_header((AUTHORIZATION, "Bearer from-header"))
            .to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_extract_token_from_bearer_header() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer from-header"))
            .to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_extract_token_bearer_scheme_any_case() {
        for header in ["bearer from-header", "BEARER from-header", "Bearer   from-header "] {
            let req = TestRequest::default()
                .insert_header((AUTHORIZATION, header))
                .to_http_request();
            assert_eq!(extract_token(&req).as_deref(), Some("from-header"), "{}", header);
        }

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer"))
            .to_http_request();
        assert!(extract_token(&req).is_none());
    }

    #[test]
    fn test_extract_token_missing() {
        let req = TestRequest::default().to_http_request();
        assert!(extract_token(&req).is_none());

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .cookie(Cookie::new(SESSION_COOKIE_NAME, ""))
            .to_http_request();
        assert!(extract_token(&req).is_none());
    }
}
