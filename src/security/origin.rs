//! Origin policy evaluation.
//!
//! # Responsibilities
//! - Parse the configured allow-list once at startup
//! - Decide ALLOW / DENY for a request's declared origin
//!
//! # Design Decisions
//! - Requests without an origin are trusted (non-browser clients)
//! - Matching is exact and case-sensitive on the full string
//! - Immutable after construction; shared via Arc without locks

use crate::http::error::ApiError;

/// The set of origins permitted to make cross-origin requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOriginSet {
    /// Wildcard: every origin is allowed, nothing is compared.
    Any,
    /// Exact-match entries, in configuration order.
    List(Vec<String>),
}

impl AllowedOriginSet {
    /// Parse a raw `ALLOWED_ORIGINS` value.
    ///
    /// `*` and an empty value both mean [`AllowedOriginSet::Any`].
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == "*" {
            return AllowedOriginSet::Any;
        }

        let mut origins: Vec<String> = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            if !origins.iter().any(|o| o == entry) {
                origins.push(entry.to_string());
            }
        }
        AllowedOriginSet::List(origins)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, AllowedOriginSet::Any)
    }
}

/// Outcome of evaluating a declared origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginDecision {
    /// No origin was declared.
    AllowNoOrigin,
    /// The allow-list is a wildcard.
    AllowAny,
    /// The origin is on the allow-list.
    AllowListed,
    Deny,
}

impl OriginDecision {
    pub fn is_allowed(self) -> bool {
        !matches!(self, OriginDecision::Deny)
    }
}

/// Process-wide origin policy, built once from configuration.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    origins: AllowedOriginSet,
}

impl OriginPolicy {
    pub fn new(origins: AllowedOriginSet) -> Self {
        Self { origins }
    }

    pub fn from_config(raw: &str) -> Self {
        Self::new(AllowedOriginSet::parse(raw))
    }

    pub fn origins(&self) -> &AllowedOriginSet {
        &self.origins
    }

    pub fn decide(&self, origin: Option<&str>) -> OriginDecision {
        let origin = match origin {
            None | Some("") => return OriginDecision::AllowNoOrigin,
            Some(origin) => origin,
        };

        match &self.origins {
            AllowedOriginSet::Any => OriginDecision::AllowAny,
            AllowedOriginSet::List(list) if list.iter().any(|o| o == origin) => {
                OriginDecision::AllowListed
            }
            AllowedOriginSet::List(_) => OriginDecision::Deny,
        }
    }

    /// Like [`decide`](Self::decide), but a denial becomes a classified error.
    pub fn enforce(&self, origin: Option<&str>) -> Result<OriginDecision, ApiError> {
        match self.decide(origin) {
            OriginDecision::Deny => Err(ApiError::CorsDenied {
                origin: origin.unwrap_or_default().to_string(),
            }),
            decision => Ok(decision),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listed() -> OriginPolicy {
        OriginPolicy::from_config("https://a.example, https://b.example")
    }

    #[test]
    fn test_parse_wildcard() {
        assert_eq!(AllowedOriginSet::parse("*"), AllowedOriginSet::Any);
        assert_eq!(AllowedOriginSet::parse("  * "), AllowedOriginSet::Any);
        assert_eq!(AllowedOriginSet::parse(""), AllowedOriginSet::Any);
    }

    #[test]
    fn test_parse_list() {
        let set = AllowedOriginSet::parse("https://a.example, https://b.example,,https://a.example");
        assert_eq!(
            set,
            AllowedOriginSet::List(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string(),
            ])
        );
        assert!(!set.is_any());
    }

    #[test]
    fn test_no_origin_always_allowed() {
        assert_eq!(listed().decide(None), OriginDecision::AllowNoOrigin);
        assert_eq!(listed().decide(Some("")), OriginDecision::AllowNoOrigin);
        let empty = OriginPolicy::new(AllowedOriginSet::List(Vec::new()));
        assert!(empty.decide(None).is_allowed());
    }

    #[test]
    fn test_wildcard_allows_everything() {
        let policy = OriginPolicy::from_config("*");
        for origin in ["https://c.example", "http://localhost:3000", "null"] {
            assert_eq!(policy.decide(Some(origin)), OriginDecision::AllowAny);
        }
    }

    #[test]
    fn test_exact_match() {
        let policy = listed();
        assert_eq!(policy.decide(Some("https://a.example")), OriginDecision::AllowListed);
        assert_eq!(policy.decide(Some("https://b.example")), OriginDecision::AllowListed);
        assert_eq!(policy.decide(Some("https://c.example")), OriginDecision::Deny);
        // Case-sensitive, full string.
        assert_eq!(policy.decide(Some("https://A.example")), OriginDecision::Deny);
        assert_eq!(policy.decide(Some("https://a.example:443")), OriginDecision::Deny);
        assert_eq!(policy.decide(Some("https://a.example.evil")), OriginDecision::Deny);
    }

    #[test]
    fn test_enforce_classifies_denial() {
        let err = listed().enforce(Some("https://c.example")).unwrap_err();
        assert_eq!(err.code(), Some("CORS_ERROR"));
        assert_eq!(err.to_string(), "Not allowed by CORS");
        assert!(listed().enforce(Some("https://a.example")).is_ok());
    }
}
