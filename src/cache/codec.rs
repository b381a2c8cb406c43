//! Conversion between live responses and [`CacheEntry`] values.
//!
//! Only text bodies are supported. A response whose body is not valid UTF-8
//! fails to serialize, which aborts the cache write for that response alone.

use crate::http::{Response, StatusCode};

use super::entry::{CacheEntry, now_millis};
use super::error::{CacheError, CacheResult};

/// Captures `response` as an entry stamped with the current time.
///
/// Works from a borrow, so the response handed back to the client is untouched.
///
/// # Errors
///
/// [`CacheError::NonTextBody`] if the body is not UTF-8.
pub fn serialize(response: &Response) -> CacheResult<CacheEntry> {
    let body = std::str::from_utf8(response.content()).map_err(CacheError::NonTextBody)?;

    Ok(CacheEntry {
        body: body.to_owned(),
        headers: response.headers().to_pairs(),
        status: response.status().as_u16(),
        status_text: response.status_text().to_owned(),
        cached_at: now_millis(),
    })
}

/// Rebuilds a response from `entry`, re-emitting headers in stored order.
///
/// # Errors
///
/// [`CacheError::UnknownStatus`] if the stored code has no [`StatusCode`].
pub fn deserialize(entry: CacheEntry) -> CacheResult<Response> {
    let status = StatusCode::from_u16(entry.status).ok_or(CacheError::UnknownStatus(entry.status))?;

    let mut response = Response::new(status)
        .reason(entry.status_text)
        .body(entry.body);
    for (name, value) in entry.headers {
        response.add_header(name, value);
    }
    Ok(response)
}
