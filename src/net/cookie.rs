use std::fmt::Write;
use std::time::Duration;

use axum::http::HeaderMap;
use axum::http::header::{HeaderValue, SET_COOKIE};
use axum::response::{IntoResponseParts, ResponseParts};
use chrono::{DateTime, Utc};

use crate::error::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub expires: Option<DateTime<Utc>>,
    pub max_age: Option<Duration>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl SetCookie {
    pub fn new<N, V>(name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        SetCookie {
            name: name.into(),
            value: value.into(),
            expires: None,
            max_age: None,
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_path<P>(mut self, path: P) -> Self
    where
        P: Into<String>
    {
        self.path = Some(path.into());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn set_domain<D>(&mut self, domain: D)
    where
        D: Into<String>
    {
        self.domain = Some(domain.into());
    }
}

impl std::fmt::Display for SetCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;

        if let Some(expires) = &self.expires {
            write!(f, "; Expires={}", expires.format("%a, %d %b %Y %H:%M:%S GMT"))?;
        }

        if let Some(max_age) = &self.max_age {
            write!(f, "; Max-Age={}", max_age.as_secs())?;
        }

        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }

        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }

        if self.secure {
            f.write_str("; Secure")?;
        }

        if self.http_only {
            f.write_str("; HttpOnly")?;
        }

        if let Some(same_site) = &self.same_site {
            f.write_str("; SameSite=")?;
            f.write_str(same_site.as_str())?;
        }

        Ok(())
    }
}

impl IntoResponseParts for SetCookie {
    type Error = ApiError;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let mut rendered = String::new();

        write!(&mut rendered, "{self}")?;

        res.headers_mut().append(SET_COOKIE, HeaderValue::try_from(rendered)?);

        Ok(res)
    }
}

pub fn find_cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, axum::http::header::ToStrError> {
    for value in headers.get_all("cookie") {
        let value_str = value.to_str()?;

        for pair in value_str.split("; ") {
            if let Some((key, value)) = pair.split_once('=') {
                if key == name {
                    return Ok(Some(value));
                }
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn renders_all_attributes() {
        let expires = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);

        let mut cookie = SetCookie::new("session_id", "abc123")
            .with_expires(expires)
            .with_path("/")
            .with_http_only(true)
            .with_secure(true)
            .with_same_site(SameSite::Strict);
        cookie.set_domain("example.com");

        assert_eq!(
            cookie.to_string(),
            "session_id=abc123; Expires=Fri, 02 Jan 2026 03:04:05 GMT; \
            Domain=example.com; Path=/; Secure; HttpOnly; SameSite=Strict"
        );
    }

    #[test]
    fn expired_cookie_uses_zero_max_age() {
        let cookie = SetCookie::new("totp_pending", "")
            .with_max_age(Duration::new(0, 0))
            .with_path("/")
            .with_http_only(true);

        assert_eq!(
            cookie.to_string(),
            "totp_pending=; Max-Age=0; Path=/; HttpOnly"
        );
    }

    #[test]
    fn cookie_tuple_terminates_a_response() {
        use axum::http::StatusCode;
        use axum::response::IntoResponse;

        let cookie = SetCookie::new("session_id", "")
            .with_max_age(Duration::new(0, 0));

        let response = (StatusCode::NO_CONTENT, cookie, ()).into_response();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(SET_COOKIE));
    }

    #[test]
    fn find_cookie_value_scans_joined_header() {
        let mut headers = HeaderMap::new();
        headers.append(
            "cookie",
            HeaderValue::from_static("a=1; totp_pending=tok; session_id=sid")
        );

        assert_eq!(find_cookie_value(&headers, "totp_pending").unwrap(), Some("tok"));
        assert_eq!(find_cookie_value(&headers, "missing").unwrap(), None);
    }
}
