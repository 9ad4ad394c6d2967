//! Resource reference parsing
//!
//! Upstream resources point at each other with hierarchical references such
//! as `https://swapi.dev/api/planets/1/`. The trailing numeric segment is the
//! identifier of the referenced resource.

use crate::errors::{AppError, Result};
use crate::models::ResourceId;

/// Extract the trailing numeric identifier from a resource reference.
///
/// Accepts absolute URLs and relative paths, with or without one trailing
/// `/`. Query strings and fragments are ignored.
pub fn extract_id(reference: &str) -> Result<ResourceId> {
    let path = path_of(reference);
    let path = path.strip_suffix('/').unwrap_or(path);

    let idx = path
        .rfind('/')
        .ok_or_else(|| malformed(reference, "no path separator before the final segment"))?;

    let segment = &path[idx + 1..];
    segment
        .parse::<ResourceId>()
        .map_err(|e| malformed(reference, &format!("segment '{}' is not an id: {}", segment, e)))
}

/// Strip scheme, authority, query and fragment, leaving only the path
fn path_of(reference: &str) -> &str {
    let end = reference.find(['?', '#']).unwrap_or(reference.len());
    let reference = &reference[..end];

    match reference.find("://") {
        Some(scheme_end) => {
            let rest = &reference[scheme_end + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("")
        }
        None => reference,
    }
}

fn malformed(reference: &str, reason: &str) -> AppError {
    AppError::MalformedReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}
