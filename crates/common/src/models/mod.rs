//! Domain records
//!
//! Flat, fully resolved records handed to callers. Nested references are
//! always inlined (a person's homeworld is a full [`Planet`]).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier derived from the trailing segment of a resource reference
pub type ResourceId = u32;

/// A film of the saga
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: ResourceId,
    pub title: String,
    pub episode: i32,
    pub release_date: NaiveDate,
}

/// A planet; population stays textual since upstream mixes numbers and "unknown"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Planet {
    pub id: ResourceId,
    pub name: String,
    pub population: String,
}

/// A character with its homeworld resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: ResourceId,
    pub name: String,
    pub homeworld: Planet,
}
