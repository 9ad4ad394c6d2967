//! Process-lifetime resolution cache
//!
//! Provides:
//! - One typed namespace per aggregator operation
//! - Lock-free concurrent reads and writes (DashMap)
//! - Hit/miss counters labelled by namespace
//!
//! Entries are never evicted or invalidated; upstream data is treated as
//! static. Concurrent misses on the same key may both populate it, and
//! since both computed the same value either write is correct.

use crate::catalog::RawFilm;
use crate::models::{Film, Person, Planet, ResourceId};
use dashmap::DashMap;
use metrics::counter;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;
use tracing::debug;

use crate::metrics::METRICS_PREFIX;

/// Namespace names, also used as metric labels
pub mod names {
    pub const FILMS: &str = "films";
    pub const PLANETS: &str = "planets";
    pub const PLANETS_BY_FILM: &str = "planets-by-film";
    pub const CHARACTERS_BY_FILM: &str = "characters-by-film";
    pub const CHARACTERS_BY_NAME: &str = "characters-by-name";
    pub const RESIDENTS_BY_PLANET: &str = "residents-by-planet";
    pub const PLANET: &str = "planet";
    pub const FILM: &str = "film";
}

/// A single keyed namespace
pub struct Namespace<K, V> {
    name: &'static str,
    entries: DashMap<K, V>,
}

impl<K, V> Namespace<K, V>
where
    K: Eq + Hash + std::fmt::Debug,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: DashMap::new(),
        }
    }

    /// Get a copy of a cached value
    pub fn get(&self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) => {
                debug!(namespace = self.name, key = ?key, "Cache hit");
                counter!(format!("{}_cache_hits_total", METRICS_PREFIX), "namespace" => self.name)
                    .increment(1);
                Some(entry.value().clone())
            }
            None => {
                debug!(namespace = self.name, key = ?key, "Cache miss");
                counter!(format!("{}_cache_misses_total", METRICS_PREFIX), "namespace" => self.name)
                    .increment(1);
                None
            }
        }
    }

    /// Store a value; an existing entry for the key is replaced
    pub fn put(&self, key: K, value: V) {
        debug!(namespace = self.name, key = ?key, "Cache set");
        self.entries.insert(key, value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<K: Eq + Hash, V> fmt::Debug for Namespace<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Entry count of one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceStats {
    pub namespace: &'static str,
    pub entries: usize,
}

/// All namespaces used by the aggregator
#[derive(Debug)]
pub struct ResolutionCache {
    pub films: Namespace<(), Vec<Film>>,
    pub planets: Namespace<(), Vec<Planet>>,
    pub planets_by_film: Namespace<ResourceId, Vec<Planet>>,
    pub characters_by_film: Namespace<ResourceId, Vec<Person>>,
    pub characters_by_name: Namespace<String, Vec<Person>>,
    pub residents_by_planet: Namespace<ResourceId, Vec<Person>>,
    /// Single planet lookups shared by every operation resolving a homeworld
    pub planet: Namespace<ResourceId, Planet>,
    /// Raw films, kept for their reference lists
    pub film: Namespace<ResourceId, RawFilm>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self {
            films: Namespace::new(names::FILMS),
            planets: Namespace::new(names::PLANETS),
            planets_by_film: Namespace::new(names::PLANETS_BY_FILM),
            characters_by_film: Namespace::new(names::CHARACTERS_BY_FILM),
            characters_by_name: Namespace::new(names::CHARACTERS_BY_NAME),
            residents_by_planet: Namespace::new(names::RESIDENTS_BY_PLANET),
            planet: Namespace::new(names::PLANET),
            film: Namespace::new(names::FILM),
        }
    }

    /// Entry counts per namespace
    pub fn stats(&self) -> Vec<NamespaceStats> {
        vec![
            stats_of(&self.films),
            stats_of(&self.planets),
            stats_of(&self.planets_by_film),
            stats_of(&self.characters_by_film),
            stats_of(&self.characters_by_name),
            stats_of(&self.residents_by_planet),
            stats_of(&self.planet),
            stats_of(&self.film),
        ]
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

fn stats_of<K, V>(ns: &Namespace<K, V>) -> NamespaceStats
where
    K: Eq + Hash + std::fmt::Debug,
    V: Clone,
{
    NamespaceStats {
        namespace: ns.name(),
        entries: ns.len(),
    }
}
