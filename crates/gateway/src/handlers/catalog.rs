//! Catalog handlers
//!
//! Thin wrappers over the aggregator; every error renders through
//! `AppError`.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::AppState;
use swai_common::{
    errors::{AppError, Result},
    models::{Film, Person, Planet, ResourceId},
};

/// Character search query string
#[derive(Debug, Deserialize, Validate)]
pub struct NameQuery {
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    pub name: String,
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Unwrap an id path segment; a malformed id is a validation error
fn resource_id(path: std::result::Result<Path<ResourceId>, PathRejection>) -> Result<ResourceId> {
    path.map(|Path(id)| id).map_err(|e| AppError::Validation {
        message: e.body_text(),
        field: Some("id".to_string()),
    })
}

/// List all films
pub async fn films(State(state): State<AppState>) -> Result<Json<Vec<Film>>> {
    Ok(Json(state.aggregator.find_films().await?))
}

/// List all planets
pub async fn planets(State(state): State<AppState>) -> Result<Json<Vec<Planet>>> {
    Ok(Json(state.aggregator.find_planets().await?))
}

/// Planets appearing in a film
pub async fn planets_by_film(
    State(state): State<AppState>,
    path: std::result::Result<Path<ResourceId>, PathRejection>,
) -> Result<Json<Vec<Planet>>> {
    let id = resource_id(path)?;
    Ok(Json(state.aggregator.find_planets_by_film(id).await?))
}

/// Characters appearing in a film
pub async fn characters_by_film(
    State(state): State<AppState>,
    path: std::result::Result<Path<ResourceId>, PathRejection>,
) -> Result<Json<Vec<Person>>> {
    let id = resource_id(path)?;
    Ok(Json(state.aggregator.find_characters_by_film(id).await?))
}

/// Characters matching a name
pub async fn characters_by_name(
    State(state): State<AppState>,
    query: std::result::Result<Query<NameQuery>, QueryRejection>,
) -> Result<Json<Vec<Person>>> {
    let Query(query) = query.map_err(|e| AppError::Validation {
        message: e.body_text(),
        field: Some("name".to_string()),
    })?;
    query.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("name".to_string()),
    })?;

    Ok(Json(state.aggregator.find_characters_by_name(&query.name).await?))
}

/// Residents of a planet
pub async fn residents_by_planet(
    State(state): State<AppState>,
    path: std::result::Result<Path<ResourceId>, PathRejection>,
) -> Result<Json<Vec<Person>>> {
    let id = resource_id(path)?;
    Ok(Json(state.aggregator.find_residents_by_planet(id).await?))
}
