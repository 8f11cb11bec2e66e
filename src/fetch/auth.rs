use std::fmt::Debug;

/// Session cookie the provider pairs with the crumb.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    /// Cookie domain, with or without the leading dot.
    pub domain: String,
}

impl SessionCookie {
    /// `Cookie` header value, e.g. `B=abc`.
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// Whether the cookie should be sent to `host`.
    pub fn matches_host(&self, host: &str) -> bool {
        let domain = self.domain.trim_start_matches('.').to_ascii_lowercase();
        let host = host.to_ascii_lowercase();
        if domain.is_empty() {
            return false;
        }
        host == domain || host.ends_with(&format!(".{domain}"))
    }
}

impl Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .finish()
    }
}

/// Source of the credentials attached to every history download.
pub trait CredentialProvider: Send + Sync {
    fn crumb(&self) -> String;
    fn cookie(&self) -> SessionCookie;
}

/// A single pre-captured crumb/cookie pair.
///
/// There is no refresh: once the provider expires the pair, downloads fail
/// with a non-200 status until the config is updated.
#[derive(Clone)]
pub struct StaticCredentials {
    crumb: String,
    cookie: SessionCookie,
}

impl StaticCredentials {
    pub fn new(crumb: impl Into<String>, cookie: SessionCookie) -> Self {
        Self {
            crumb: crumb.into(),
            cookie,
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn crumb(&self) -> String {
        self.crumb.clone()
    }

    fn cookie(&self) -> SessionCookie {
        self.cookie.clone()
    }
}

impl Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("cookie", &self.cookie)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(domain: &str) -> SessionCookie {
        SessionCookie {
            name: "B".to_string(),
            value: "secret".to_string(),
            domain: domain.to_string(),
        }
    }

    #[test]
    fn matches_domain_and_subdomains() {
        let cookie = cookie(".yahoo.com");
        assert!(cookie.matches_host("yahoo.com"));
        assert!(cookie.matches_host("query1.finance.yahoo.com"));
        assert!(!cookie.matches_host("notyahoo.com"));
        assert!(!cookie.matches_host("example.org"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = StaticCredentials::new("crumb-value", cookie(".yahoo.com"));
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("secret"), "{rendered}");
        assert!(!rendered.contains("crumb-value"), "{rendered}");
        assert_eq!(creds.cookie().header_value(), "B=secret");
    }
}
