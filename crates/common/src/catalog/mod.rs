//! Upstream catalog access
//!
//! Provides a unified interface over the hypermedia catalog:
//! - `HttpCatalogClient` talks to a SWAPI-compatible REST service
//! - `FixtureCatalog` serves a small in-memory catalog for offline use and tests
//!
//! Raw resources keep references as strings; resolving them is the
//! aggregator's job.

mod fixture;
mod http;

pub use fixture::{resource_url, FixtureCatalog};
pub use http::HttpCatalogClient;

use crate::config::CatalogConfig;
use crate::errors::{AppError, Result};
use crate::models::ResourceId;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Film as returned by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFilm {
    pub url: String,
    pub title: String,
    pub episode_id: i32,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub planets: Vec<String>,
    #[serde(default)]
    pub characters: Vec<String>,
}

/// Planet as returned by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlanet {
    pub url: String,
    pub name: String,
    pub population: String,
    #[serde(default)]
    pub residents: Vec<String>,
}

/// Person as returned by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPerson {
    pub url: String,
    pub name: String,
    pub homeworld: String,
}

/// One page of a catalog listing; only the first page is ever read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing<T> {
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<T>,
}

impl<T> Listing<T> {
    pub fn of(results: Vec<T>) -> Self {
        Self {
            count: Some(results.len() as u32),
            next: None,
            results,
        }
    }
}

/// Trait for catalog access
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// `GET /films/`
    async fn find_all_films(&self) -> Result<Listing<RawFilm>>;

    /// `GET /planets/`
    async fn find_all_planets(&self) -> Result<Listing<RawPlanet>>;

    /// `GET /films/{id}`; `None` when the film does not exist
    async fn find_film_by_id(&self, id: ResourceId) -> Result<Option<RawFilm>>;

    /// `GET /planets/{id}`; `None` when the planet does not exist
    async fn find_planet_by_id(&self, id: ResourceId) -> Result<Option<RawPlanet>>;

    /// `GET /people/{id}`; `None` when the person does not exist
    async fn find_person_by_id(&self, id: ResourceId) -> Result<Option<RawPerson>>;

    /// `GET /people/?search={name}`; matching is owned by the catalog
    async fn search_people(&self, name: &str) -> Result<Listing<RawPerson>>;

    /// Get the provider name
    fn provider(&self) -> &str;
}

/// Create a catalog client based on configuration
pub fn create_catalog(config: &CatalogConfig) -> Result<Arc<dyn CatalogClient>> {
    match config.provider.as_str() {
        "swapi" | "http" => Ok(Arc::new(HttpCatalogClient::new(config)?)),
        "fixture" => Ok(Arc::new(FixtureCatalog::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown catalog provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_planet_ignores_unknown_fields() {
        let json = r#"{
            "name": "Tatooine",
            "rotation_period": "23",
            "climate": "arid",
            "population": "200000",
            "residents": [
                "https://swapi.dev/api/people/1/",
                "https://swapi.dev/api/people/2/"
            ],
            "films": ["https://swapi.dev/api/films/1/"],
            "url": "https://swapi.dev/api/planets/1/"
        }"#;

        let planet: RawPlanet = serde_json::from_str(json).unwrap();
        assert_eq!(planet.name, "Tatooine");
        assert_eq!(planet.population, "200000");
        assert_eq!(planet.residents.len(), 2);
        assert_eq!(planet.url, "https://swapi.dev/api/planets/1/");
    }

    #[test]
    fn test_raw_film_defaults_missing_reference_lists() {
        let json = r#"{
            "title": "A New Hope",
            "episode_id": 4,
            "release_date": "1977-05-25",
            "url": "https://swapi.dev/api/films/1/"
        }"#;

        let film: RawFilm = serde_json::from_str(json).unwrap();
        assert!(film.planets.is_empty());
        assert!(film.characters.is_empty());
        assert_eq!(film.release_date, NaiveDate::from_ymd_opt(1977, 5, 25).unwrap());
    }

    #[test]
    fn test_listing_reads_results() {
        let json = r#"{
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{
                "name": "Luke Skywalker",
                "homeworld": "https://swapi.dev/api/planets/1/",
                "url": "https://swapi.dev/api/people/1/"
            }]
        }"#;

        let listing: Listing<RawPerson> = serde_json::from_str(json).unwrap();
        assert_eq!(listing.count, Some(1));
        assert_eq!(listing.results[0].name, "Luke Skywalker");
    }

    #[test]
    fn test_create_catalog_by_provider() {
        let mut config = CatalogConfig::default();
        config.provider = "fixture".to_string();
        assert_eq!(create_catalog(&config).unwrap().provider(), "fixture");

        config.provider = "swapi".to_string();
        assert_eq!(create_catalog(&config).unwrap().provider(), "swapi");

        config.provider = "carrier-pigeon".to_string();
        assert!(matches!(
            create_catalog(&config),
            Err(AppError::Configuration { .. })
        ));
    }
}
