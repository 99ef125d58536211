//! Conditional request evaluation

use std::str::FromStr;

use super::{matches, none_match};

/// HTTP method of the request being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// GET and HEAD answer a failed `If-None-Match` with 304 instead of 412
    pub fn is_read(&self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("Unsupported method: {}", other)),
        }
    }
}

/// Outcome of evaluating conditional headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Serve the request normally
    Proceed,
    /// 304 Not Modified
    NotModified,
    /// 412 Precondition Failed
    PreconditionFailed,
}

impl Precondition {
    pub fn status_code(&self) -> u16 {
        match self {
            Precondition::Proceed => 200,
            Precondition::NotModified => 304,
            Precondition::PreconditionFailed => 412,
        }
    }
}

/// Evaluate `If-Match` then `If-None-Match` against the entity's current tag.
///
/// Absent headers are passed as `None` (equivalent to an empty value).
pub fn evaluate_preconditions(
    method: Method,
    if_match: Option<&str>,
    if_none_match: Option<&str>,
    current: &str,
) -> Precondition {
    if !matches(if_match.unwrap_or(""), current) {
        tracing::debug!(?method, "If-Match precondition failed");
        return Precondition::PreconditionFailed;
    }
    if !none_match(if_none_match.unwrap_or(""), current) {
        return if method.is_read() {
            Precondition::NotModified
        } else {
            Precondition::PreconditionFailed
        };
    }
    Precondition::Proceed
}
