//! In-memory catalog for offline runs and tests

use super::{CatalogClient, Listing, RawFilm, RawPerson, RawPlanet};
use crate::errors::Result;
use crate::models::ResourceId;
use crate::reference::extract_id;
use async_trait::async_trait;
use chrono::NaiveDate;

const FIXTURE_ROOT: &str = "https://swapi.dev/api";

/// Catalog backed by plain vectors of raw resources
#[derive(Debug, Clone, Default)]
pub struct FixtureCatalog {
    films: Vec<RawFilm>,
    planets: Vec<RawPlanet>,
    people: Vec<RawPerson>,
}

/// Build a reference the way the catalog does (`.../{kind}/{id}/`)
pub fn resource_url(kind: &str, id: ResourceId) -> String {
    format!("{}/{}/{}/", FIXTURE_ROOT, kind, id)
}

impl FixtureCatalog {
    /// Seeded catalog: two films, two planets, two people
    pub fn new() -> Self {
        Self::empty()
            .with_planet(1, "Sandtopia", "1,000", &[1])
            .with_planet(2, "Frozen", "12,000", &[2])
            .with_person(1, "Java The Hutt", 1)
            .with_person(2, "Elsa Organa", 2)
            .with_film(1, "Here we go again", 1, date(2020, 3, 1), &[1], &[1])
            .with_film(2, "Oops, I did it again", 2, date(2022, 4, 1), &[1, 2], &[1, 2])
    }

    /// Catalog with nothing in it
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_film(
        mut self,
        id: ResourceId,
        title: &str,
        episode_id: i32,
        release_date: NaiveDate,
        planets: &[ResourceId],
        characters: &[ResourceId],
    ) -> Self {
        self.films.push(RawFilm {
            url: resource_url("films", id),
            title: title.to_string(),
            episode_id,
            release_date,
            planets: planets.iter().map(|p| resource_url("planets", *p)).collect(),
            characters: characters.iter().map(|c| resource_url("people", *c)).collect(),
        });
        self
    }

    pub fn with_planet(
        mut self,
        id: ResourceId,
        name: &str,
        population: &str,
        residents: &[ResourceId],
    ) -> Self {
        self.planets.push(RawPlanet {
            url: resource_url("planets", id),
            name: name.to_string(),
            population: population.to_string(),
            residents: residents.iter().map(|r| resource_url("people", *r)).collect(),
        });
        self
    }

    pub fn with_person(mut self, id: ResourceId, name: &str, homeworld: ResourceId) -> Self {
        self.people.push(RawPerson {
            url: resource_url("people", id),
            name: name.to_string(),
            homeworld: resource_url("planets", homeworld),
        });
        self
    }

    /// Add a raw film as-is, for references the builders cannot express
    pub fn with_raw_film(mut self, film: RawFilm) -> Self {
        self.films.push(film);
        self
    }

    /// Add a raw person as-is
    pub fn with_raw_person(mut self, person: RawPerson) -> Self {
        self.people.push(person);
        self
    }
}

fn is_resource(url: &str, id: ResourceId) -> bool {
    extract_id(url).ok() == Some(id)
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

#[async_trait]
impl CatalogClient for FixtureCatalog {
    async fn find_all_films(&self) -> Result<Listing<RawFilm>> {
        Ok(Listing::of(self.films.clone()))
    }

    async fn find_all_planets(&self) -> Result<Listing<RawPlanet>> {
        Ok(Listing::of(self.planets.clone()))
    }

    async fn find_film_by_id(&self, id: ResourceId) -> Result<Option<RawFilm>> {
        Ok(self.films.iter().find(|f| is_resource(&f.url, id)).cloned())
    }

    async fn find_planet_by_id(&self, id: ResourceId) -> Result<Option<RawPlanet>> {
        Ok(self.planets.iter().find(|p| is_resource(&p.url, id)).cloned())
    }

    async fn find_person_by_id(&self, id: ResourceId) -> Result<Option<RawPerson>> {
        Ok(self.people.iter().find(|p| is_resource(&p.url, id)).cloned())
    }

    async fn search_people(&self, name: &str) -> Result<Listing<RawPerson>> {
        let needle = name.to_lowercase();
        let matches = self
            .people
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(Listing::of(matches))
    }

    fn provider(&self) -> &str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_catalog() {
        let catalog = FixtureCatalog::new();

        let films = catalog.find_all_films().await.unwrap();
        assert_eq!(films.results.len(), 2);
        assert_eq!(films.results[1].planets.len(), 2);

        let planet = catalog.find_planet_by_id(1).await.unwrap().unwrap();
        assert_eq!(planet.name, "Sandtopia");
        assert_eq!(planet.url, "https://swapi.dev/api/planets/1/");

        assert!(catalog.find_film_by_id(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let catalog = FixtureCatalog::new();

        let hits = catalog.search_people("hutt").await.unwrap();
        assert_eq!(hits.results.len(), 1);
        assert_eq!(hits.results[0].name, "Java The Hutt");

        assert!(catalog.search_people("Vader").await.unwrap().results.is_empty());
    }

    #[test]
    fn test_builders_emit_catalog_references() {
        let catalog = FixtureCatalog::empty().with_person(5, "Walker", 9);

        let person = tokio_test::block_on(catalog.find_person_by_id(5)).unwrap().unwrap();
        assert_eq!(person.url, "https://swapi.dev/api/people/5/");
        assert_eq!(person.homeworld, resource_url("planets", 9));
        assert_eq!(catalog.provider(), "fixture");
    }
}
