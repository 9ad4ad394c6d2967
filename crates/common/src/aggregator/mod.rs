//! Catalog aggregator
//!
//! Turns the catalog's hyperlinked resources into flat domain records:
//! references are parsed into ids, nested references (a person's
//! homeworld) are resolved and inlined, and every result is memoized in
//! the [`ResolutionCache`].
//!
//! Any error while resolving a nested reference aborts the whole
//! operation; partial lists are never returned and nothing is cached for
//! the failed key.

mod observer;

pub use observer::{OperationObserver, Outcome, TracingObserver};

use crate::cache::ResolutionCache;
use crate::catalog::{CatalogClient, RawFilm, RawPerson};
use crate::errors::{AppError, Result};
use crate::models::{Film, Person, Planet, ResourceId};
use crate::reference::extract_id;
use futures::future::try_join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Operation names reported to observers
pub mod operations {
    pub const FIND_FILMS: &str = "find_films";
    pub const FIND_PLANETS: &str = "find_planets";
    pub const FIND_PLANETS_BY_FILM: &str = "find_planets_by_film";
    pub const FIND_CHARACTERS_BY_FILM: &str = "find_characters_by_film";
    pub const FIND_CHARACTERS_BY_NAME: &str = "find_characters_by_name";
    pub const FIND_RESIDENTS_BY_PLANET: &str = "find_residents_by_planet";
}

use operations::*;

/// Resolves catalog queries into denormalized records
pub struct Aggregator {
    catalog: Arc<dyn CatalogClient>,
    cache: Arc<ResolutionCache>,
    observer: Option<Arc<dyn OperationObserver>>,
    call_timeout: Option<Duration>,
}

impl Aggregator {
    /// Create an aggregator over a catalog and a shared cache
    pub fn new(catalog: Arc<dyn CatalogClient>, cache: Arc<ResolutionCache>) -> Self {
        Self {
            catalog,
            cache,
            observer: None,
            call_timeout: None,
        }
    }

    /// Notify `observer` around every operation
    pub fn with_observer(mut self, observer: Arc<dyn OperationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Bound every upstream call; an elapsed call fails with `Timeout`
    pub fn with_call_timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = Some(limit);
        self
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn catalog(&self) -> &dyn CatalogClient {
        self.catalog.as_ref()
    }

    /// All films of the catalog listing
    pub async fn find_films(&self) -> Result<Vec<Film>> {
        self.observe(FIND_FILMS, None, self.do_find_films()).await
    }

    /// All planets of the catalog listing
    pub async fn find_planets(&self) -> Result<Vec<Planet>> {
        self.observe(FIND_PLANETS, None, self.do_find_planets()).await
    }

    /// Planets appearing in a film, in the film's reference order
    pub async fn find_planets_by_film(&self, film_id: ResourceId) -> Result<Vec<Planet>> {
        self.observe(
            FIND_PLANETS_BY_FILM,
            Some(film_id.to_string()),
            self.do_find_planets_by_film(film_id),
        )
        .await
    }

    /// Characters appearing in a film, each with a resolved homeworld
    pub async fn find_characters_by_film(&self, film_id: ResourceId) -> Result<Vec<Person>> {
        self.observe(
            FIND_CHARACTERS_BY_FILM,
            Some(film_id.to_string()),
            self.do_find_characters_by_film(film_id),
        )
        .await
    }

    /// Characters matched by the catalog's people search
    pub async fn find_characters_by_name(&self, name: &str) -> Result<Vec<Person>> {
        self.observe(
            FIND_CHARACTERS_BY_NAME,
            Some(name.to_string()),
            self.do_find_characters_by_name(name),
        )
        .await
    }

    /// Residents of a planet, each with their own recorded homeworld
    pub async fn find_residents_by_planet(&self, planet_id: ResourceId) -> Result<Vec<Person>> {
        self.observe(
            FIND_RESIDENTS_BY_PLANET,
            Some(planet_id.to_string()),
            self.do_find_residents_by_planet(planet_id),
        )
        .await
    }

    async fn do_find_films(&self) -> Result<Vec<Film>> {
        if let Some(films) = self.cache.films.get(&()) {
            return Ok(films);
        }

        debug!("Looking up films");
        let listing = self.call(self.catalog.find_all_films()).await?;

        let films = listing
            .results
            .into_iter()
            .map(|f| -> Result<Film> {
                debug!(title = %f.title, "Found film");
                Ok(Film {
                    id: extract_id(&f.url)?,
                    title: f.title,
                    episode: f.episode_id,
                    release_date: f.release_date,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.cache.films.put((), films.clone());
        Ok(films)
    }

    async fn do_find_planets(&self) -> Result<Vec<Planet>> {
        if let Some(planets) = self.cache.planets.get(&()) {
            return Ok(planets);
        }

        debug!("Looking up planets");
        let listing = self.call(self.catalog.find_all_planets()).await?;

        let planets = listing
            .results
            .into_iter()
            .map(|p| -> Result<Planet> {
                debug!(name = %p.name, "Found planet");
                Ok(Planet {
                    id: extract_id(&p.url)?,
                    name: p.name,
                    population: p.population,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.cache.planets.put((), planets.clone());
        Ok(planets)
    }

    async fn do_find_planets_by_film(&self, film_id: ResourceId) -> Result<Vec<Planet>> {
        if let Some(planets) = self.cache.planets_by_film.get(&film_id) {
            return Ok(planets);
        }

        debug!(film_id, "Looking up planets appearing in film");
        let film = self.lookup_film(film_id).await?;
        let planet_ids = extract_ids(&film.planets)?;

        let resolved = self.lookup_planets(&planet_ids).await?;
        let planets = planet_ids
            .iter()
            .map(|id| resolved_planet(&resolved, *id))
            .collect::<Result<Vec<_>>>()?;
        for planet in &planets {
            debug!(film_id, planet = %planet.name, "Found planet appearing in film");
        }

        self.cache.planets_by_film.put(film_id, planets.clone());
        Ok(planets)
    }

    async fn do_find_characters_by_film(&self, film_id: ResourceId) -> Result<Vec<Person>> {
        if let Some(characters) = self.cache.characters_by_film.get(&film_id) {
            return Ok(characters);
        }

        debug!(film_id, "Looking up characters appearing in film");
        let film = self.lookup_film(film_id).await?;
        let character_ids = extract_ids(&film.characters)?;

        let people = try_join_all(character_ids.into_iter().map(|id| self.fetch_person(id))).await?;
        let characters = self.with_homeworlds(people).await?;
        for character in &characters {
            debug!(film_id, character = %character.name, "Found character appearing in film");
        }

        self.cache.characters_by_film.put(film_id, characters.clone());
        Ok(characters)
    }

    async fn do_find_characters_by_name(&self, name: &str) -> Result<Vec<Person>> {
        let key = name.to_string();
        if let Some(characters) = self.cache.characters_by_name.get(&key) {
            return Ok(characters);
        }

        debug!(name = %name, "Looking up characters by name");
        let listing = self.call(self.catalog.search_people(name)).await?;

        let people = listing
            .results
            .into_iter()
            .map(|p| -> Result<(ResourceId, RawPerson)> {
                debug!(name = %name, character = %p.name, "Found character with name");
                Ok((extract_id(&p.url)?, p))
            })
            .collect::<Result<Vec<_>>>()?;
        let characters = self.with_homeworlds(people).await?;

        self.cache.characters_by_name.put(key, characters.clone());
        Ok(characters)
    }

    async fn do_find_residents_by_planet(&self, planet_id: ResourceId) -> Result<Vec<Person>> {
        if let Some(residents) = self.cache.residents_by_planet.get(&planet_id) {
            return Ok(residents);
        }

        debug!(planet_id, "Looking up planet by id");
        let planet = self
            .call(self.catalog.find_planet_by_id(planet_id))
            .await?
            .ok_or_else(|| AppError::not_found("planet", planet_id))?;
        let resident_ids = extract_ids(&planet.residents)?;

        let people = try_join_all(resident_ids.into_iter().map(|id| self.fetch_person(id))).await?;
        let residents = self.with_homeworlds(people).await?;
        for resident in &residents {
            debug!(planet_id, resident = %resident.name, "Found resident from planet");
        }

        self.cache.residents_by_planet.put(planet_id, residents.clone());
        Ok(residents)
    }

    /// Fetch a person discovered under `id`
    async fn fetch_person(&self, id: ResourceId) -> Result<(ResourceId, RawPerson)> {
        let person = self
            .call(self.catalog.find_person_by_id(id))
            .await?
            .ok_or_else(|| AppError::not_found("person", id))?;
        Ok((id, person))
    }

    /// Inline each person's homeworld; every distinct planet is looked up once
    async fn with_homeworlds(&self, people: Vec<(ResourceId, RawPerson)>) -> Result<Vec<Person>> {
        let homeworld_ids = people
            .iter()
            .map(|(_, p)| extract_id(&p.homeworld))
            .collect::<Result<Vec<_>>>()?;

        let resolved = self.lookup_planets(&homeworld_ids).await?;

        people
            .into_iter()
            .zip(homeworld_ids)
            .map(|((id, person), homeworld_id)| -> Result<Person> {
                Ok(Person {
                    id,
                    name: person.name,
                    homeworld: resolved_planet(&resolved, homeworld_id)?,
                })
            })
            .collect()
    }

    /// Look up the distinct planets among `ids`, concurrently
    async fn lookup_planets(&self, ids: &[ResourceId]) -> Result<HashMap<ResourceId, Planet>> {
        let mut distinct: Vec<ResourceId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !distinct.contains(id) {
                distinct.push(*id);
            }
        }

        let planets = try_join_all(distinct.iter().map(|id| self.lookup_planet(*id))).await?;
        Ok(distinct.into_iter().zip(planets).collect())
    }

    /// Single planet lookup, cached across all operations
    async fn lookup_planet(&self, planet_id: ResourceId) -> Result<Planet> {
        if let Some(planet) = self.cache.planet.get(&planet_id) {
            return Ok(planet);
        }

        let raw = self
            .call(self.catalog.find_planet_by_id(planet_id))
            .await?
            .ok_or_else(|| AppError::not_found("planet", planet_id))?;

        let planet = Planet {
            id: planet_id,
            name: raw.name,
            population: raw.population,
        };

        self.cache.planet.put(planet_id, planet.clone());
        Ok(planet)
    }

    /// Raw film lookup, cached for its reference lists
    async fn lookup_film(&self, film_id: ResourceId) -> Result<RawFilm> {
        if let Some(film) = self.cache.film.get(&film_id) {
            return Ok(film);
        }

        let film = self
            .call(self.catalog.find_film_by_id(film_id))
            .await?
            .ok_or_else(|| AppError::not_found("film", film_id))?;

        self.cache.film.put(film_id, film.clone());
        Ok(film)
    }

    /// Run one upstream call under the configured timeout
    async fn call<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| AppError::timeout(limit))?,
            None => fut.await,
        }
    }

    async fn observe<T>(
        &self,
        operation: &'static str,
        argument: Option<String>,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let Some(observer) = &self.observer else {
            return fut.await;
        };

        observer.on_start(operation, argument.as_deref());
        let start = Instant::now();
        let result = fut.await;
        observer.on_complete(
            operation,
            argument.as_deref(),
            start.elapsed(),
            Outcome::of(&result),
        );
        result
    }
}

fn extract_ids(references: &[String]) -> Result<Vec<ResourceId>> {
    references.iter().map(|r| extract_id(r)).collect()
}

fn resolved_planet(resolved: &HashMap<ResourceId, Planet>, id: ResourceId) -> Result<Planet> {
    resolved
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::not_found("planet", id))
}
