//! Defines functions for keeping the refresh token in an encrypted, HTTP-only cookie.
//!
//! Browser clients never have to touch the refresh token: it is set on log in
//! and sent back automatically to the auth endpoints.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::endpoints;

/// The name of the cookie holding the refresh token.
pub const COOKIE_REFRESH_TOKEN: &str = "refresh_token";

/// Add the refresh token cookie to the cookie jar.
///
/// The cookie is only sent to the auth endpoints and expires together with the token.
pub fn set_refresh_cookie(
    jar: PrivateCookieJar,
    refresh_token: &str,
    expires_at: OffsetDateTime,
    secure: bool,
) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_REFRESH_TOKEN, refresh_token.to_owned()))
            .path(endpoints::AUTH_COOKIE_PATH)
            .expires(expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(secure),
    )
}

/// Set the refresh token cookie to an invalid value and set its max age to
/// zero, which should delete the cookie on the client side.
pub fn clear_refresh_cookie(jar: PrivateCookieJar, secure: bool) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_REFRESH_TOKEN, "deleted"))
            .path(endpoints::AUTH_COOKIE_PATH)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(secure),
    )
}

/// Get the refresh token from the cookie jar, ignoring a cleared cookie.
pub fn get_refresh_token_from_cookie(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(COOKIE_REFRESH_TOKEN)
        .map(|cookie| cookie.value_trimmed().to_owned())
        .filter(|token| !token.is_empty() && token != "deleted")
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::endpoints;

    use super::{
        COOKIE_REFRESH_TOKEN, clear_refresh_cookie, get_refresh_token_from_cookie,
        set_refresh_cookie,
    };

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");
        let key = Key::from(&hash);

        PrivateCookieJar::new(key)
    }

    #[test]
    fn can_set_cookie() {
        let expires_at = OffsetDateTime::now_utc() + Duration::days(30);

        let jar = set_refresh_cookie(get_jar(), "abc", expires_at, true);
        let cookie = jar.get(COOKIE_REFRESH_TOKEN).unwrap();

        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some(endpoints::AUTH_COOKIE_PATH));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.expires_datetime(), Some(expires_at));
        assert_eq!(get_refresh_token_from_cookie(&jar), Some("abc".to_owned()));
    }

    #[test]
    fn cleared_cookie_gives_no_token() {
        let expires_at = OffsetDateTime::now_utc() + Duration::days(30);
        let jar = set_refresh_cookie(get_jar(), "abc", expires_at, false);

        let jar = clear_refresh_cookie(jar, false);
        let cookie = jar.get(COOKIE_REFRESH_TOKEN).unwrap();

        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
        assert_eq!(get_refresh_token_from_cookie(&jar), None);
    }

    #[test]
    fn empty_jar_gives_no_token() {
        assert_eq!(get_refresh_token_from_cookie(&get_jar()), None);
    }
}
