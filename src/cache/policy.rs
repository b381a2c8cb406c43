//! Admission policy — which responses may be written to the cache.

use std::collections::HashSet;

use crate::http::{Method, Response};

/// Why a response was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The status code is not in the allowlist.
    Status(u16),
    /// A `Vary` header contains `*`, so the response varies unpredictably.
    VaryWildcard,
    /// The request method is not `GET` and the method check is on.
    Method(String),
}

/// Rules a response must satisfy before it is stored.
///
/// 1. Its status is in the cacheable set (default `{200}`).
/// 2. No `Vary` header value contains `*`.
/// 3. The request method is `GET`, compared case-insensitively, unless the
///    method check is bypassed.
///
/// Evaluation is pure: the same response, method, and policy always give the
/// same answer.
///
/// # Examples
///
/// ```
/// use response_cache::cache::AdmissionPolicy;
/// use response_cache::http::{Method, Response, StatusCode};
///
/// let policy = AdmissionPolicy::default();
/// let ok = Response::new(StatusCode::Ok).body("hi");
/// assert!(policy.admit(&ok, &Method::Get));
/// assert!(!policy.admit(&ok, &Method::Post));
///
/// let bypass = AdmissionPolicy::new([200, 203], true);
/// assert!(bypass.admit(&ok, &Method::Post));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionPolicy {
    cacheable_status_codes: HashSet<u16>,
    bypass_method_check: bool,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::new([200], false)
    }
}

impl AdmissionPolicy {
    /// Creates a policy admitting `status_codes`, with the `GET`-only rule
    /// disabled when `bypass_method_check` is set.
    pub fn new(status_codes: impl IntoIterator<Item = u16>, bypass_method_check: bool) -> Self {
        Self {
            cacheable_status_codes: status_codes.into_iter().collect(),
            bypass_method_check,
        }
    }

    /// Returns `true` if `response` to a `method` request may be stored.
    pub fn admit(&self, response: &Response, method: &Method) -> bool {
        self.check(response, method).is_ok()
    }

    /// Like [`admit`](Self::admit), but names the first rule that failed.
    pub fn check(&self, response: &Response, method: &Method) -> Result<(), Rejection> {
        let status = response.status().as_u16();
        if !self.cacheable_status_codes.contains(&status) {
            return Err(Rejection::Status(status));
        }

        if response
            .headers()
            .get_all("vary")
            .any(|value| value.contains('*'))
        {
            return Err(Rejection::VaryWildcard);
        }

        if !self.bypass_method_check && !method.is_get() {
            return Err(Rejection::Method(method.as_str().to_owned()));
        }

        Ok(())
    }
}
