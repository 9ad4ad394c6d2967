//! Catalog operations exposed to the chat model as callable functions

use crate::aggregator::Aggregator;
use crate::errors::{AppError, Result};
use crate::models::ResourceId;
use serde::Deserialize;
use serde_json::{json, Value};

pub const FILMS: &str = "films";
pub const PLANETS: &str = "planets";
pub const CHARACTERS_BY_FILM: &str = "charactersByFilm";
pub const CHARACTERS_BY_NAME: &str = "charactersByName";
pub const RESIDENTS_BY_PLANET: &str = "residentsByPlanet";
pub const PLANETS_BY_FILM: &str = "planetsByFilm";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ByFilm {
    film_id: ResourceId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ByPlanet {
    planet_id: ResourceId,
}

#[derive(Deserialize)]
struct ByName {
    name: String,
}

fn function(name: &str, description: &str, parameters: Value) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": parameters,
        }
    })
}

fn no_argument() -> Value {
    json!({
        "type": "object",
        "description": "A request with no argument",
        "properties": {
            "empty": {
                "type": "string",
                "description": "Empty argument (can be null)"
            }
        }
    })
}

fn single_argument(field: &str, kind: &str, summary: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "description": summary,
        "properties": {
            field: { "type": kind, "description": description }
        },
        "required": [field]
    })
}

/// Tool definitions in the chat completion `tools` format
pub fn definitions() -> Vec<Value> {
    let by_film = || {
        single_argument(
            "filmId",
            "integer",
            "A request using a film identifier",
            "Film identifier",
        )
    };

    vec![
        function(
            FILMS,
            "Find all films. The result is a list with all films in the Star Wars series. \
            Each entry includes a film identifier, a title, an episode number and a release date.",
            no_argument(),
        ),
        function(
            PLANETS,
            "Find all planets. The result is a list of every planets mentioned in the Star Wars series. \
            Each entry includes a planet identifier, a name and a population.",
            no_argument(),
        ),
        function(
            CHARACTERS_BY_FILM,
            "Find characters by film. The result is a list of every characters appearing in a given \
            Star Wars film. Each entry includes a people identifier, a name and an origin (homeworld).",
            by_film(),
        ),
        function(
            CHARACTERS_BY_NAME,
            "Find characters by name. The result is a list of characters matching the given name. \
            Each entry includes a people identifier, a name and an origin (homeworld).",
            single_argument(
                "name",
                "string",
                "A request using a character name",
                "Character name",
            ),
        ),
        function(
            RESIDENTS_BY_PLANET,
            "Find residents by planet. The result is a list of people living on a given planet. \
            Each entry includes a people identifier, a name and an origin (homeworld).",
            single_argument(
                "planetId",
                "integer",
                "A request using a planet identifier",
                "Planet identifier",
            ),
        ),
        function(
            PLANETS_BY_FILM,
            "Find planets by film. The result is a list of planets mentioned in a given Star Wars film. \
            Each entry includes a planet identifier, a name and a population.",
            by_film(),
        ),
    ]
}

fn arguments<T: for<'de> Deserialize<'de>>(tool: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| AppError::Validation {
        message: format!("Invalid arguments for {}: {}", tool, e),
        field: Some(tool.to_string()),
    })
}

/// Run one tool call against the aggregator and return its JSON result
pub async fn dispatch(aggregator: &Aggregator, name: &str, raw_arguments: &str) -> Result<Value> {
    let value = match name {
        FILMS => serde_json::to_value(aggregator.find_films().await?),
        PLANETS => serde_json::to_value(aggregator.find_planets().await?),
        CHARACTERS_BY_FILM => {
            let args: ByFilm = arguments(name, raw_arguments)?;
            serde_json::to_value(aggregator.find_characters_by_film(args.film_id).await?)
        }
        CHARACTERS_BY_NAME => {
            let args: ByName = arguments(name, raw_arguments)?;
            serde_json::to_value(aggregator.find_characters_by_name(&args.name).await?)
        }
        RESIDENTS_BY_PLANET => {
            let args: ByPlanet = arguments(name, raw_arguments)?;
            serde_json::to_value(aggregator.find_residents_by_planet(args.planet_id).await?)
        }
        PLANETS_BY_FILM => {
            let args: ByFilm = arguments(name, raw_arguments)?;
            serde_json::to_value(aggregator.find_planets_by_film(args.film_id).await?)
        }
        other => {
            return Err(AppError::Validation {
                message: format!("Unknown tool: {}", other),
                field: None,
            })
        }
    };

    value.map_err(|e| AppError::Internal {
        message: format!("Failed to encode {} result: {}", name, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResolutionCache;
    use crate::catalog::FixtureCatalog;
    use std::sync::Arc;

    fn aggregator() -> Aggregator {
        Aggregator::new(
            Arc::new(FixtureCatalog::new()),
            Arc::new(ResolutionCache::new()),
        )
    }

    #[test]
    fn test_definitions_cover_every_operation() {
        let names: Vec<_> = definitions()
            .iter()
            .map(|d| d["function"]["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "films",
                "planets",
                "charactersByFilm",
                "charactersByName",
                "residentsByPlanet",
                "planetsByFilm"
            ]
        );

        let by_name = &definitions()[3];
        assert_eq!(by_name["type"], "function");
        assert_eq!(by_name["function"]["parameters"]["required"][0], "name");
    }

    #[tokio::test]
    async fn test_dispatch_runs_the_matching_operation() {
        let aggregator = aggregator();

        let planets = dispatch(&aggregator, PLANETS_BY_FILM, r#"{"filmId": 1}"#)
            .await
            .unwrap();
        assert_eq!(planets[0]["name"], "Sandtopia");

        let people = dispatch(&aggregator, CHARACTERS_BY_NAME, r#"{"name": "Elsa"}"#)
            .await
            .unwrap();
        assert_eq!(people[0]["homeworld"]["name"], "Frozen");

        let films = dispatch(&aggregator, FILMS, "{}").await.unwrap();
        assert_eq!(films.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_rejects_bad_calls() {
        let aggregator = aggregator();

        let err = dispatch(&aggregator, "deathStar", "{}").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = dispatch(&aggregator, RESIDENTS_BY_PLANET, r#"{"planet": 1}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = dispatch(&aggregator, CHARACTERS_BY_FILM, r#"{"filmId": 99}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
