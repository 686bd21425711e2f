//! Bipartite link graph and multi-method aggregation
//!
//! A link connects a GCF to a spectrum or molecular family; its annotation
//! maps each scoring method's name to the [`Score`] that method assigned.
//! One scoring run produces a [`LinkGraph`]; a [`LinkCollection`] folds the
//! graphs of successive methods together under AND or OR semantics.
//!
//! Edges are stored once, keyed by the query-side source, with a reverse
//! index so lookups work from either endpoint in O(1).

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use crate::entity::EntityRef;
use crate::scoring::Score;

/// Errors raised by link-graph operations.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Both endpoints of an inserted link were on the same bipartite side.
    #[error("cannot link `{u}` and `{v}`: both are {side}-side entities")]
    SameSidePair {
        /// First offending endpoint.
        u: EntityRef,
        /// Second offending endpoint.
        v: EntityRef,
        /// The shared side's name.
        side: &'static str,
    },

    /// A queried object has no entry in the graph at all.
    #[error("object `{0}` is not present in the link graph")]
    UnknownObject(EntityRef),

    /// Both objects are known but share no link.
    #[error("no link between `{u}` and `{v}`")]
    UnknownLink {
        /// First endpoint.
        u: EntityRef,
        /// Second endpoint.
        v: EntityRef,
    },

    /// A scoring method registered its results twice.
    #[error("scoring method `{method}` already contributed to this collection")]
    DuplicateMethod {
        /// Name of the method registered twice.
        method: String,
    },

    /// A strict sorted query met an edge lacking the method's score.
    #[error("link `{src}` -> `{target}` carries no data for method `{method}`")]
    MissingMethodData {
        /// Source endpoint of the offending edge.
        src: EntityRef,
        /// Target endpoint of the offending edge.
        target: EntityRef,
        /// Method whose score was required.
        method: String,
    },
}

/// Per-link annotation: one score per contributing method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkData {
    scores: BTreeMap<String, Score>,
}

impl LinkData {
    /// Annotation holding a single method's score.
    pub fn from_score(score: Score) -> Self {
        let mut data = Self::default();
        data.insert(score);
        data
    }

    /// Record a method's score, replacing that method's previous value.
    pub fn insert(&mut self, score: Score) {
        self.scores.insert(score.method().to_string(), score);
    }

    /// Fold in another annotation without overwriting existing methods.
    pub fn merge_missing(&mut self, other: &LinkData) {
        for (method, score) in &other.scores {
            self.scores
                .entry(method.clone())
                .or_insert_with(|| score.clone());
        }
    }

    /// Score recorded by a method, if any.
    pub fn get(&self, method: &str) -> Option<&Score> {
        self.scores.get(method)
    }

    /// Names of the contributing methods, sorted.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.scores.keys().map(String::as_str)
    }

    /// Number of contributing methods.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether no method has scored this link.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// How two result sets are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Keep only links present in both sets.
    And,
    /// Keep links present in either set.
    Or,
}

/// Undirected bipartite graph of scored links.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkGraph {
    forward: HashMap<EntityRef, HashMap<EntityRef, LinkData>>,
    reverse: HashMap<EntityRef, HashSet<EntityRef>>,
}

impl LinkGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a link, or add `score` to an existing one.
    ///
    /// `source` is the query-side endpoint; the two endpoints must lie on
    /// opposite bipartite sides.
    pub fn add_link(
        &mut self,
        source: EntityRef,
        target: EntityRef,
        score: Score,
    ) -> Result<(), LinkError> {
        if source.side() == target.side() {
            let side = match source.side() {
                crate::entity::Side::Genomic => "genomic",
                crate::entity::Side::Metabolomic => "metabolomic",
            };
            return Err(LinkError::SameSidePair {
                u: source,
                v: target,
                side,
            });
        }

        if let Some(data) = self.edge_mut(&source, &target) {
            data.insert(score);
            return Ok(());
        }

        self.reverse
            .entry(target.clone())
            .or_default()
            .insert(source.clone());
        self.forward
            .entry(source)
            .or_default()
            .insert(target, LinkData::from_score(score));
        Ok(())
    }

    /// Whether a link exists between the two objects, in either orientation.
    pub fn has_link(&self, u: &EntityRef, v: &EntityRef) -> bool {
        self.edge(u, v).is_some()
    }

    /// Annotation of the link between two objects.
    ///
    /// Distinguishes an object missing from the graph
    /// ([`LinkError::UnknownObject`]) from two known objects that simply
    /// share no link ([`LinkError::UnknownLink`]).
    pub fn get_link_data(&self, u: &EntityRef, v: &EntityRef) -> Result<&LinkData, LinkError> {
        if let Some(data) = self.edge(u, v) {
            return Ok(data);
        }
        for object in [u, v] {
            if !self.contains(object) {
                return Err(LinkError::UnknownObject(object.clone()));
            }
        }
        Err(LinkError::UnknownLink {
            u: u.clone(),
            v: v.clone(),
        })
    }

    /// Whether the object appears as any link's endpoint.
    pub fn contains(&self, object: &EntityRef) -> bool {
        self.forward.contains_key(object) || self.reverse.contains_key(object)
    }

    /// Targets linked from a source, with their annotations.
    ///
    /// Unknown sources are an explicit error, never an empty map.
    pub fn links_from(
        &self,
        source: &EntityRef,
    ) -> Result<&HashMap<EntityRef, LinkData>, LinkError> {
        self.forward
            .get(source)
            .ok_or_else(|| LinkError::UnknownObject(source.clone()))
    }

    /// Sources in arbitrary order.
    pub fn sources(&self) -> impl Iterator<Item = &EntityRef> {
        self.forward.keys()
    }

    /// Number of sources.
    pub fn source_count(&self) -> usize {
        self.forward.len()
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.forward.values().map(HashMap::len).sum()
    }

    /// Whether the graph holds no links.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Iterate all links as `(source, target, annotation)`.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityRef, &EntityRef, &LinkData)> {
        self.forward.iter().flat_map(|(source, targets)| {
            targets.iter().map(move |(target, data)| (source, target, data))
        })
    }

    /// A source's links ordered by one method's score, best first.
    ///
    /// Non-strict mode appends links lacking that method's data, in
    /// arbitrary order, after the sorted prefix; strict mode errors on the
    /// first such link.
    pub fn get_sorted_links(
        &self,
        method: &str,
        source: &EntityRef,
        strict: bool,
    ) -> Result<Vec<(&EntityRef, &LinkData)>, LinkError> {
        let targets = self.links_from(source)?;

        let mut scored = Vec::new();
        let mut unscored = Vec::new();
        for (target, data) in targets {
            match data.get(method) {
                Some(score) => scored.push((score.value(), target, data)),
                None if strict => {
                    return Err(LinkError::MissingMethodData {
                        src: source.clone(),
                        target: target.clone(),
                        method: method.to_string(),
                    })
                }
                None => unscored.push((target, data)),
            }
        }

        scored.sort_by(|(a, _, _), (b, _, _)| b.total_cmp(a));
        let mut links: Vec<_> = scored.into_iter().map(|(_, t, d)| (t, d)).collect();
        links.extend(unscored);
        Ok(links)
    }

    /// Merge another result set into this graph.
    ///
    /// `Or` unions the link sets; on links present in both, methods already
    /// recorded here keep their scores. `And` keeps only links present in
    /// both graphs (regardless of orientation), likewise preferring existing
    /// scores when both sides carry the same method.
    pub fn merge(&mut self, other: LinkGraph, mode: MergeMode) {
        match mode {
            MergeMode::Or => {
                for (source, targets) in other.forward {
                    for (target, data) in targets {
                        if let Some(existing) = self.edge_mut(&source, &target) {
                            existing.merge_missing(&data);
                            continue;
                        }
                        self.reverse
                            .entry(target.clone())
                            .or_default()
                            .insert(source.clone());
                        self.forward
                            .entry(source.clone())
                            .or_default()
                            .insert(target, data);
                    }
                }
            }
            MergeMode::And => {
                let mut kept: HashMap<EntityRef, HashMap<EntityRef, LinkData>> = HashMap::new();
                for (source, targets) in self.forward.drain() {
                    for (target, mut data) in targets {
                        if let Some(other_data) = other.edge(&source, &target) {
                            data.merge_missing(other_data);
                            kept.entry(source.clone()).or_default().insert(target, data);
                        }
                    }
                }
                self.forward = kept;
                self.rebuild_reverse();
            }
        }
        debug!(links = self.link_count(), sources = self.source_count(), "merged link graphs");
    }

    /// Drop links failing the predicate; sources left without links vanish.
    pub fn filter_links<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&EntityRef, &EntityRef, &LinkData) -> bool,
    {
        for (source, targets) in self.forward.iter_mut() {
            targets.retain(|target, data| predicate(source, target, data));
        }
        self.forward.retain(|_, targets| !targets.is_empty());
        self.rebuild_reverse();
    }

    /// Drop whole sources failing the predicate.
    pub fn filter_sources<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&EntityRef) -> bool,
    {
        self.forward.retain(|source, _| predicate(source));
        self.rebuild_reverse();
    }

    /// Drop links whose target fails the predicate; sources left without
    /// links vanish.
    pub fn filter_targets<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&EntityRef) -> bool,
    {
        for targets in self.forward.values_mut() {
            targets.retain(|target, _| predicate(target));
        }
        self.forward.retain(|_, targets| !targets.is_empty());
        self.rebuild_reverse();
    }

    fn edge(&self, u: &EntityRef, v: &EntityRef) -> Option<&LinkData> {
        self.forward
            .get(u)
            .and_then(|targets| targets.get(v))
            .or_else(|| self.forward.get(v).and_then(|targets| targets.get(u)))
    }

    fn edge_mut(&mut self, u: &EntityRef, v: &EntityRef) -> Option<&mut LinkData> {
        // Two lookups keep the borrow checker satisfied.
        if self.forward.get(u).is_some_and(|t| t.contains_key(v)) {
            return self.forward.get_mut(u).and_then(|t| t.get_mut(v));
        }
        if self.forward.get(v).is_some_and(|t| t.contains_key(u)) {
            return self.forward.get_mut(v).and_then(|t| t.get_mut(u));
        }
        None
    }

    fn rebuild_reverse(&mut self) {
        self.reverse.clear();
        for (source, targets) in &self.forward {
            for target in targets.keys() {
                self.reverse
                    .entry(target.clone())
                    .or_default()
                    .insert(source.clone());
            }
        }
    }
}

/// Aggregated results of several scoring methods over one dataset.
#[derive(Debug, Clone, Default)]
pub struct LinkCollection {
    graph: LinkGraph,
    methods: Vec<String>,
}

impl LinkCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the methods that have contributed, in registration order.
    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    /// The aggregated graph.
    pub fn graph(&self) -> &LinkGraph {
        &self.graph
    }

    /// Consume the collection, yielding the aggregated graph.
    pub fn into_graph(self) -> LinkGraph {
        self.graph
    }

    /// Fold in one method's result graph.
    ///
    /// The first registration initializes the collection; later ones merge
    /// under `mode`. Registering the same method twice is an error.
    pub fn add_method_results(
        &mut self,
        method: &str,
        results: LinkGraph,
        mode: MergeMode,
    ) -> Result<(), LinkError> {
        if self.methods.iter().any(|m| m == method) {
            return Err(LinkError::DuplicateMethod {
                method: method.to_string(),
            });
        }
        if self.methods.is_empty() {
            self.graph = results;
        } else {
            self.graph.merge(results, mode);
        }
        self.methods.push(method.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;

    fn gcf(id: &str) -> EntityRef {
        EntityRef::new(EntityKind::Gcf, id)
    }

    fn spectrum(id: &str) -> EntityRef {
        EntityRef::new(EntityKind::Spectrum, id)
    }

    fn score(method: &str, value: f64) -> Score {
        Score::new(method, value)
    }

    #[test]
    fn add_link_rejects_same_side() {
        let mut graph = LinkGraph::new();
        let err = graph
            .add_link(spectrum("sp1"), spectrum("sp2"), score("m1", 1.0))
            .unwrap_err();
        assert!(matches!(err, LinkError::SameSidePair { .. }));
        assert!(graph.is_empty());
    }

    #[test]
    fn lookup_works_from_either_endpoint() {
        let mut graph = LinkGraph::new();
        graph
            .add_link(spectrum("sp1"), gcf("g1"), score("m1", 1.0))
            .unwrap();

        assert!(graph.has_link(&spectrum("sp1"), &gcf("g1")));
        assert!(graph.has_link(&gcf("g1"), &spectrum("sp1")));
        let data = graph.get_link_data(&gcf("g1"), &spectrum("sp1")).unwrap();
        assert_eq!(data.get("m1").unwrap().value(), 1.0);
    }

    #[test]
    fn unknown_object_and_unknown_link_are_distinct() {
        let mut graph = LinkGraph::new();
        graph
            .add_link(spectrum("sp1"), gcf("g1"), score("m1", 1.0))
            .unwrap();
        graph
            .add_link(spectrum("sp2"), gcf("g2"), score("m1", 2.0))
            .unwrap();

        let err = graph.get_link_data(&spectrum("sp9"), &gcf("g1")).unwrap_err();
        assert!(matches!(err, LinkError::UnknownObject(_)));

        let err = graph.get_link_data(&spectrum("sp1"), &gcf("g2")).unwrap_err();
        assert!(matches!(err, LinkError::UnknownLink { .. }));
    }

    #[test]
    fn or_merge_never_overwrites_recorded_scores() {
        let mut a = LinkGraph::new();
        a.add_link(spectrum("sp1"), gcf("g1"), score("m1", 1.0)).unwrap();

        let mut b = LinkGraph::new();
        b.add_link(spectrum("sp1"), gcf("g1"), score("m1", 99.0)).unwrap();
        b.add_link(spectrum("sp1"), gcf("g2"), score("m2", 3.0)).unwrap();

        a.merge(b, MergeMode::Or);
        let data = a.get_link_data(&spectrum("sp1"), &gcf("g1")).unwrap();
        assert_eq!(
            data.get("m1").unwrap().value(),
            1.0,
            "existing method score must win"
        );
        assert!(a.has_link(&spectrum("sp1"), &gcf("g2")));
    }

    #[test]
    fn and_merge_is_edge_intersection() {
        let mut a = LinkGraph::new();
        a.add_link(spectrum("sp1"), gcf("g1"), score("m1", 1.0)).unwrap();
        a.add_link(spectrum("sp1"), gcf("g2"), score("m1", 2.0)).unwrap();

        let mut b = LinkGraph::new();
        // Same logical link, opposite orientation.
        b.add_link(gcf("g1"), spectrum("sp1"), score("m2", 5.0)).unwrap();

        a.merge(b, MergeMode::And);
        assert_eq!(a.link_count(), 1);
        let data = a.get_link_data(&spectrum("sp1"), &gcf("g1")).unwrap();
        assert!(data.get("m1").is_some() && data.get("m2").is_some());
    }

    #[test]
    fn and_merge_with_disjoint_targets_removes_the_source() {
        // Method M1 links (a, x), method M2 links (a, y): AND leaves nothing
        // for a, and a disappears as a source.
        let mut m1 = LinkGraph::new();
        m1.add_link(gcf("a"), spectrum("x"), score("m1", 1.0)).unwrap();
        let mut m2 = LinkGraph::new();
        m2.add_link(gcf("a"), spectrum("y"), score("m2", 1.0)).unwrap();

        m1.merge(m2, MergeMode::And);
        assert!(m1.is_empty());
        assert!(m1.links_from(&gcf("a")).is_err());
    }

    #[test]
    fn merge_laws_hold() {
        let mut a = LinkGraph::new();
        a.add_link(spectrum("sp1"), gcf("g1"), score("m1", 1.0)).unwrap();
        a.add_link(spectrum("sp2"), gcf("g1"), score("m1", 2.0)).unwrap();

        // AND(A, A) == A
        let mut and_self = a.clone();
        and_self.merge(a.clone(), MergeMode::And);
        assert_eq!(and_self, a);

        // OR(A, empty) == A
        let mut or_empty = a.clone();
        or_empty.merge(LinkGraph::new(), MergeMode::Or);
        assert_eq!(or_empty, a);
    }

    #[test]
    fn filters_drop_exhausted_sources() {
        let mut graph = LinkGraph::new();
        graph.add_link(spectrum("sp1"), gcf("g1"), score("m1", 1.0)).unwrap();
        graph.add_link(spectrum("sp1"), gcf("g2"), score("m1", 5.0)).unwrap();
        graph.add_link(spectrum("sp2"), gcf("g2"), score("m1", 0.5)).unwrap();

        graph.filter_links(|_, _, data| data.get("m1").unwrap().value() >= 1.0);
        assert!(graph.links_from(&spectrum("sp2")).is_err());

        graph.filter_targets(|target| target.id() != "g2");
        assert_eq!(graph.link_count(), 1);
        assert!(!graph.contains(&gcf("g2")));

        graph.filter_sources(|source| source.id() != "sp1");
        assert!(graph.is_empty());
    }

    #[test]
    fn sorted_links_order_and_strictness() {
        let mut graph = LinkGraph::new();
        graph.add_link(spectrum("sp1"), gcf("g1"), score("m1", 1.0)).unwrap();
        graph.add_link(spectrum("sp1"), gcf("g2"), score("m1", 7.0)).unwrap();
        graph.add_link(spectrum("sp1"), gcf("g3"), score("m2", 9.0)).unwrap();

        let links = graph
            .get_sorted_links("m1", &spectrum("sp1"), false)
            .unwrap();
        let ids: Vec<_> = links.iter().map(|(t, _)| t.id().to_string()).collect();
        assert_eq!(&ids[..2], &["g2", "g1"], "scored links sort best first");
        assert_eq!(ids[2], "g3", "method-less links trail the sorted prefix");

        let err = graph
            .get_sorted_links("m1", &spectrum("sp1"), true)
            .unwrap_err();
        assert!(matches!(err, LinkError::MissingMethodData { .. }));
    }

    #[test]
    fn collection_rejects_duplicate_methods() {
        let mut collection = LinkCollection::new();
        let mut graph = LinkGraph::new();
        graph.add_link(spectrum("sp1"), gcf("g1"), score("m1", 1.0)).unwrap();

        collection
            .add_method_results("m1", graph.clone(), MergeMode::Or)
            .unwrap();
        let err = collection
            .add_method_results("m1", graph, MergeMode::Or)
            .unwrap_err();
        assert!(matches!(err, LinkError::DuplicateMethod { .. }));
        assert_eq!(collection.methods(), ["m1"]);
    }
}
