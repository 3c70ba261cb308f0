//! Auth cookie handling

/// Cookie configuration
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub path: String,
    pub secure: bool,
    pub max_age: Option<i64>,
}

impl CookieConfig {
    pub fn new(name: impl Into<String>, max_age: i64) -> Self {
        Self {
            name: name.into(),
            path: "/".to_string(),
            secure: false,
            max_age: Some(max_age),
        }
    }

    /// Build cookie header value
    pub fn build_cookie(&self, token: &str) -> String {
        let mut parts = vec![
            format!("{}={}", self.name, token),
            "HttpOnly".to_string(),
            "SameSite=Lax".to_string(),
            format!("Path={}", self.path),
        ];

        if self.secure {
            parts.push("Secure".to_string());
        }

        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={}", max_age));
        }

        parts.join("; ")
    }

    /// Cookie header value that removes the cookie
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; HttpOnly; SameSite=Lax; Path={}; Max-Age=0",
            self.name, self.path
        )
    }
}

/// Extract a cookie value from a `Cookie` header
pub fn extract_cookie(cookie_header: &str, cookie_name: &str) -> Option<String> {
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((name, value)) = part.split_once('=') {
            if name.trim() == cookie_name && !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_cookie() {
        let config = CookieConfig::new("crm_token", 3600);
        let cookie = config.build_cookie("abc123");

        assert!(cookie.starts_with("crm_token=abc123"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_clear_cookie() {
        let config = CookieConfig::new("crm_token", 3600);
        assert_eq!(
            config.clear_cookie(),
            "crm_token=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0"
        );
    }

    #[test]
    fn test_extract_cookie() {
        let cookie = "theme=dark; crm_token=abc123; other=value";
        assert_eq!(extract_cookie(cookie, "crm_token"), Some("abc123".to_string()));
        assert_eq!(extract_cookie(cookie, "missing"), None);
        assert_eq!(extract_cookie("crm_token=", "crm_token"), None);
    }
}
