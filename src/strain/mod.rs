//! Strains and the strain registry
//!
//! A strain is the canonical unit across which genomic and metabolomic
//! evidence is compared. Loaders frequently report the same isolate under
//! several spellings, so a strain carries an alias set and the registry
//! resolves any known name back to one canonical entry.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::debug;

/// A biological isolate identified by a canonical id plus zero or more
/// alias spellings.
///
/// Equality, hashing and ordering consider the canonical id only; aliases
/// exist purely so inconsistently-named records can be merged.
#[derive(Debug, Clone)]
pub struct Strain {
    id: Arc<str>,
    aliases: BTreeSet<String>,
}

impl Strain {
    /// Create a strain with no aliases.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            aliases: BTreeSet::new(),
        }
    }

    /// Canonical identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared handle to the canonical identifier.
    pub fn id_arc(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    /// Record an alternative spelling for this strain.
    ///
    /// Adding the canonical id itself is a no-op.
    pub fn add_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        if alias != *self.id {
            self.aliases.insert(alias);
        }
    }

    /// Alias spellings, canonical id excluded.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(String::as_str)
    }

    /// Whether `name` is the canonical id or any alias.
    pub fn has_name(&self, name: &str) -> bool {
        *self.id == *name || self.aliases.contains(name)
    }
}

impl PartialEq for Strain {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Strain {}

impl Hash for Strain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Strain {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Strain {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Strain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Ordered collection of canonical strains for one dataset.
///
/// Registration order fixes the column order of every occurrence table built
/// from the registry, so rebuilding tables from an unchanged registry is
/// bit-identical.
#[derive(Debug, Default, Clone)]
pub struct StrainRegistry {
    strains: Vec<Strain>,
    /// Every known name (canonical or alias) to its position in `strains`.
    lookup: HashMap<String, usize>,
}

impl StrainRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strain, merging it into an existing entry when its id or
    /// any alias is already known.
    ///
    /// Returns the position of the (possibly pre-existing) canonical entry.
    pub fn register(&mut self, strain: Strain) -> usize {
        let existing = std::iter::once(strain.id())
            .chain(strain.aliases())
            .find_map(|name| self.lookup.get(name).copied());

        match existing {
            Some(pos) => {
                debug!(id = strain.id(), position = pos, "merging strain aliases");
                let entry = &mut self.strains[pos];
                let canonical = entry.id_arc();
                if *canonical != *strain.id() {
                    entry.add_alias(strain.id().to_string());
                }
                for alias in strain.aliases() {
                    entry.add_alias(alias.to_string());
                }
                // Re-index every name of the merged entry.
                let names: Vec<String> = std::iter::once(entry.id().to_string())
                    .chain(entry.aliases().map(str::to_string))
                    .collect();
                for name in names {
                    self.lookup.insert(name, pos);
                }
                pos
            }
            None => {
                let pos = self.strains.len();
                self.lookup.insert(strain.id().to_string(), pos);
                for alias in strain.aliases() {
                    self.lookup.insert(alias.to_string(), pos);
                }
                self.strains.push(strain);
                pos
            }
        }
    }

    /// Number of canonical strains.
    pub fn len(&self) -> usize {
        self.strains.len()
    }

    /// Whether the registry holds no strains.
    pub fn is_empty(&self) -> bool {
        self.strains.is_empty()
    }

    /// Column position for any known name or alias.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Strain at a given position.
    pub fn get(&self, position: usize) -> Option<&Strain> {
        self.strains.get(position)
    }

    /// Resolve any known name or alias to the canonical strain.
    pub fn resolve(&self, name: &str) -> Option<&Strain> {
        self.position(name).and_then(|pos| self.get(pos))
    }

    /// Canonical strains in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Strain> {
        self.strains.iter()
    }

    /// Canonical ids in registration order.
    pub fn ids(&self) -> Vec<Arc<str>> {
        self.strains.iter().map(Strain::id_arc).collect()
    }
}
