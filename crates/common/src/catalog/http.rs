//! SWAPI-compatible HTTP catalog client

use super::{CatalogClient, Listing, RawFilm, RawPerson, RawPlanet};
use crate::config::CatalogConfig;
use crate::errors::{AppError, Result};
use crate::models::ResourceId;
use async_trait::async_trait;
use reqwest::{header::ACCEPT, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for a hypermedia catalog rooted at `base_url`
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCatalogClient {
    /// Create a new client with the configured per-call timeout
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode its JSON body; 404 maps to `None`
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>> {
        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamUnavailable {
                message: format!("Catalog error {}: {}", status, body),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamResponse {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.json::<T>().await.map_err(|e| self.map_error(e))?;
        Ok(Some(body))
    }

    /// Fetch a listing; a missing listing endpoint is a contract violation
    async fn fetch_listing<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Listing<T>> {
        self.fetch(request)
            .await?
            .ok_or_else(|| AppError::UpstreamResponse {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: format!("Listing endpoint {} not found", path),
            })
    }

    fn map_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::timeout(self.timeout)
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn find_all_films(&self) -> Result<Listing<RawFilm>> {
        tracing::debug!("GET /films/");
        self.fetch_listing("/films/", self.client.get(self.url("/films/")))
            .await
    }

    async fn find_all_planets(&self) -> Result<Listing<RawPlanet>> {
        tracing::debug!("GET /planets/");
        self.fetch_listing("/planets/", self.client.get(self.url("/planets/")))
            .await
    }

    async fn find_film_by_id(&self, id: ResourceId) -> Result<Option<RawFilm>> {
        tracing::debug!(film_id = id, "GET /films/{{id}}");
        self.fetch(self.client.get(self.url(&format!("/films/{}", id))))
            .await
    }

    async fn find_planet_by_id(&self, id: ResourceId) -> Result<Option<RawPlanet>> {
        tracing::debug!(planet_id = id, "GET /planets/{{id}}");
        self.fetch(self.client.get(self.url(&format!("/planets/{}", id))))
            .await
    }

    async fn find_person_by_id(&self, id: ResourceId) -> Result<Option<RawPerson>> {
        tracing::debug!(person_id = id, "GET /people/{{id}}");
        self.fetch(self.client.get(self.url(&format!("/people/{}", id))))
            .await
    }

    async fn search_people(&self, name: &str) -> Result<Listing<RawPerson>> {
        tracing::debug!(name = %name, "GET /people/?search=");
        let request = self
            .client
            .get(self.url("/people/"))
            .query(&[("search", name)]);
        self.fetch_listing("/people/", request).await
    }

    fn provider(&self) -> &str {
        "swapi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::StatusCode as AxumStatus,
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    fn tatooine() -> serde_json::Value {
        json!({
            "name": "Tatooine",
            "rotation_period": "23",
            "orbital_period": "304",
            "diameter": "10465",
            "climate": "arid",
            "gravity": "1 standard",
            "terrain": "desert",
            "surface_water": "1",
            "population": "200000",
            "residents": [
                "https://swapi.dev/api/people/1/",
                "https://swapi.dev/api/people/2/",
                "https://swapi.dev/api/people/4/"
            ],
            "films": ["https://swapi.dev/api/films/1/"],
            "created": "2014-12-09T13:50:49.641000Z",
            "edited": "2014-12-20T20:58:18.411000Z",
            "url": "https://swapi.dev/api/planets/1/"
        })
    }

    async fn planet(Path(id): Path<u32>) -> Response {
        match id {
            1 => Json(tatooine()).into_response(),
            _ => AxumStatus::NOT_FOUND.into_response(),
        }
    }

    async fn film(Path(id): Path<u32>) -> Response {
        if id == 500 {
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        AxumStatus::NOT_FOUND.into_response()
    }

    async fn person(Path(id): Path<u32>) -> Response {
        match id {
            503 => (AxumStatus::SERVICE_UNAVAILABLE, "maintenance").into_response(),
            418 => (AxumStatus::IM_A_TEAPOT, "short and stout").into_response(),
            _ => AxumStatus::NOT_FOUND.into_response(),
        }
    }

    async fn people(Query(params): Query<HashMap<String, String>>) -> Response {
        let name = params.get("search").cloned().unwrap_or_default();
        Json(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{
                "name": name,
                "homeworld": "https://swapi.dev/api/planets/1/",
                "url": "https://swapi.dev/api/people/1/"
            }]
        }))
        .into_response()
    }

    async fn films() -> Response {
        Json(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{
                "title": "A New Hope",
                "episode_id": 4,
                "release_date": "1977-05-25",
                "planets": ["https://swapi.dev/api/planets/1/"],
                "characters": ["https://swapi.dev/api/people/1/"],
                "url": "https://swapi.dev/api/films/1/"
            }]
        }))
        .into_response()
    }

    async fn spawn_stub() -> String {
        let app = Router::new()
            .route("/films/", get(films))
            .route("/films/{id}", get(film))
            .route("/planets/{id}", get(planet))
            .route("/people/", get(people))
            .route("/people/{id}", get(person));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/", addr)
    }

    async fn client(timeout_ms: u64) -> HttpCatalogClient {
        let config = CatalogConfig {
            provider: "swapi".to_string(),
            base_url: spawn_stub().await,
            timeout_ms,
        };
        HttpCatalogClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_find_planet_by_id() {
        let api = client(2_000).await;

        let planet = api.find_planet_by_id(1).await.unwrap().unwrap();
        assert_eq!(planet.name, "Tatooine");
        assert_eq!(planet.population, "200000");
        assert_eq!(planet.url, "https://swapi.dev/api/planets/1/");
        assert_eq!(
            planet.residents,
            vec![
                "https://swapi.dev/api/people/1/",
                "https://swapi.dev/api/people/2/",
                "https://swapi.dev/api/people/4/",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_resource_is_none() {
        let api = client(2_000).await;
        assert!(api.find_planet_by_id(99).await.unwrap().is_none());
        assert!(api.find_person_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_film_listing() {
        let api = client(2_000).await;
        let listing = api.find_all_films().await.unwrap();
        assert_eq!(listing.results.len(), 1);
        assert_eq!(listing.results[0].title, "A New Hope");
        assert_eq!(listing.results[0].episode_id, 4);
    }

    #[tokio::test]
    async fn test_search_passes_name_as_query() {
        let api = client(2_000).await;
        let listing = api.search_people("Luke Sky").await.unwrap();
        assert_eq!(listing.results[0].name, "Luke Sky");
    }

    #[tokio::test]
    async fn test_missing_listing_is_upstream_error() {
        let api = client(2_000).await;
        let err = api.find_all_planets().await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamResponse { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let api = client(2_000).await;
        let err = api.find_person_by_id(503).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unexpected_status_is_upstream_error() {
        let api = client(2_000).await;
        let err = api.find_person_by_id(418).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamResponse { status: 418, .. }));
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let api = client(100).await;
        let err = api.find_film_by_id(500).await.unwrap_err();
        assert!(matches!(err, AppError::Timeout { timeout_ms: 100 }), "{:?}", err);
    }
}
