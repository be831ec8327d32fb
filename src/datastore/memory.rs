//! In-memory datastore.
//!
//! Backs tests and fixture-driven deployments. Filters are evaluated by
//! direct entity matching: selectors in a list are AND-combined, members
//! of a group are OR-combined, and bounding regions are unioned.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::query::{BboxSelector, ChildKind, Selector};

use super::entity::{Entity, EntityType, Node, Relation, Way};
use super::errors::{DatastoreError, DatastoreResult};
use super::EntityStream;

/// An entity set held in memory, loadable from a JSON fixture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDatastore {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    ways: Vec<Way>,
    #[serde(default)]
    relations: Vec<Relation>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a fixture of the form `{"nodes": [...], "ways": [...],
    /// "relations": [...]}`.
    pub fn from_fixture_file(path: &Path) -> DatastoreResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DatastoreError::new(format!("cannot read fixture: {e}")))?;
        serde_json::from_str(&text)
            .map_err(|e| DatastoreError::new(format!("cannot parse fixture: {e}")))
    }

    pub fn insert_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn insert_way(&mut self, way: Way) {
        self.ways.push(way);
    }

    pub fn insert_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    pub fn entity_count(&self) -> usize {
        self.nodes.len() + self.ways.len() + self.relations.len()
    }

    fn node_positions(&self) -> HashMap<i64, (f64, f64)> {
        self.nodes.iter().map(|n| (n.id, (n.lon, n.lat))).collect()
    }

    fn entity_in_regions(
        &self,
        entity: &Entity,
        bboxes: &[BboxSelector],
        positions: &HashMap<i64, (f64, f64)>,
    ) -> bool {
        if bboxes.is_empty() {
            return true;
        }
        let point_in_any = |lon: f64, lat: f64| {
            bboxes.iter().any(|b| b.bounds().contains(lon, lat))
        };
        let node_in_any = |id: i64| {
            positions
                .get(&id)
                .is_some_and(|&(lon, lat)| point_in_any(lon, lat))
        };
        match entity {
            Entity::Node(n) => point_in_any(n.lon, n.lat),
            Entity::Way(w) => w.nodes.iter().any(|&id| node_in_any(id)),
            Entity::Relation(r) => r.members.iter().any(|m| match m.member_type {
                EntityType::Node => node_in_any(m.member_ref),
                EntityType::Way => self
                    .ways
                    .iter()
                    .find(|w| w.id == m.member_ref)
                    .is_some_and(|w| w.nodes.iter().any(|&id| node_in_any(id))),
                // Nested relation members are not resolved.
                EntityType::Relation => false,
            }),
        }
    }

    fn matches(
        &self,
        entity: &Entity,
        bboxes: &[BboxSelector],
        selectors: &[Selector],
        positions: &HashMap<i64, (f64, f64)>,
    ) -> bool {
        self.entity_in_regions(entity, bboxes, positions)
            && selectors.iter().all(|s| selector_matches(entity, s))
    }

    fn filtered(
        &self,
        entities: impl Iterator<Item = Entity>,
        bboxes: &[BboxSelector],
        selectors: &[Selector],
    ) -> Box<dyn EntityStream + Send + '_> {
        let positions = self.node_positions();
        let matched: Vec<Entity> = entities
            .filter(|e| self.matches(e, bboxes, selectors, &positions))
            .collect();
        Box::new(MemoryStream::new(matched))
    }
}

/// Evaluates one selector against one entity.
fn selector_matches(entity: &Entity, selector: &Selector) -> bool {
    match selector {
        Selector::Tag { key, value } => entity.tags().get(key) == Some(value),
        Selector::TagWildcard { key } => entity.tags().contains_key(key),
        Selector::Uid(id) => entity.info().uid == *id,
        Selector::User(name) => entity.info().user == *name,
        Selector::Changeset(id) => entity.info().changeset == *id,
        Selector::Child(child) => {
            let holds = match child.kind {
                ChildKind::WayNode => match entity {
                    Entity::Way(w) => !w.nodes.is_empty(),
                    _ => false,
                },
                ChildKind::RelationMember => match entity {
                    Entity::Relation(r) => r
                        .members
                        .iter()
                        .any(|m| m.member_type == EntityType::Relation),
                    _ => false,
                },
                ChildKind::HasTag => !entity.tags().is_empty(),
            };
            holds != child.negated
        }
        Selector::Group(group) => group
            .selectors()
            .iter()
            .any(|member| selector_matches(entity, member)),
    }
}

impl super::Datastore for MemoryDatastore {
    fn iterate_nodes(
        &self,
        bboxes: &[BboxSelector],
        selectors: &[Selector],
    ) -> DatastoreResult<Box<dyn EntityStream + Send + '_>> {
        Ok(self.filtered(self.nodes.iter().cloned().map(Entity::Node), bboxes, selectors))
    }

    fn iterate_ways(
        &self,
        bboxes: &[BboxSelector],
        selectors: &[Selector],
    ) -> DatastoreResult<Box<dyn EntityStream + Send + '_>> {
        Ok(self.filtered(self.ways.iter().cloned().map(Entity::Way), bboxes, selectors))
    }

    fn iterate_relations(
        &self,
        bboxes: &[BboxSelector],
        selectors: &[Selector],
    ) -> DatastoreResult<Box<dyn EntityStream + Send + '_>> {
        Ok(self.filtered(
            self.relations.iter().cloned().map(Entity::Relation),
            bboxes,
            selectors,
        ))
    }

    fn iterate_all_primitives(
        &self,
        bboxes: &[BboxSelector],
        selectors: &[Selector],
    ) -> DatastoreResult<Box<dyn EntityStream + Send + '_>> {
        let all = self
            .nodes
            .iter()
            .cloned()
            .map(Entity::Node)
            .chain(self.ways.iter().cloned().map(Entity::Way))
            .chain(self.relations.iter().cloned().map(Entity::Relation))
            .collect::<Vec<_>>();
        Ok(self.filtered(all.into_iter(), bboxes, selectors))
    }

    fn iterate_bounding_box(
        &self,
        left: f64,
        right: f64,
        top: f64,
        bottom: f64,
        full_extract: bool,
    ) -> DatastoreResult<Box<dyn EntityStream + Send + '_>> {
        let bbox = crate::query::BoundingBox::new(left, bottom, right, top)
            .map_err(DatastoreError::new)?;
        let positions = self.node_positions();
        let node_in = |id: i64| {
            positions
                .get(&id)
                .is_some_and(|&(lon, lat)| bbox.contains(lon, lat))
        };

        let ways: Vec<&Way> = self
            .ways
            .iter()
            .filter(|w| w.nodes.iter().any(|&id| node_in(id)))
            .collect();

        // With full_extract, nodes referenced by matched ways come along
        // even when they fall outside the box.
        let mut wanted_nodes: HashSet<i64> = self
            .nodes
            .iter()
            .filter(|n| bbox.contains(n.lon, n.lat))
            .map(|n| n.id)
            .collect();
        if full_extract {
            for way in &ways {
                wanted_nodes.extend(way.nodes.iter().copied());
            }
        }

        let way_ids: HashSet<i64> = ways.iter().map(|w| w.id).collect();
        let relations: Vec<&Relation> = self
            .relations
            .iter()
            .filter(|r| {
                r.members.iter().any(|m| match m.member_type {
                    EntityType::Node => wanted_nodes.contains(&m.member_ref),
                    EntityType::Way => way_ids.contains(&m.member_ref),
                    EntityType::Relation => false,
                })
            })
            .collect();

        // Planet-file order: nodes, then ways, then relations.
        let items: Vec<Entity> = self
            .nodes
            .iter()
            .filter(|n| wanted_nodes.contains(&n.id))
            .cloned()
            .map(Entity::Node)
            .chain(ways.into_iter().cloned().map(Entity::Way))
            .chain(relations.into_iter().cloned().map(Entity::Relation))
            .collect();
        Ok(Box::new(MemoryStream::new(items)))
    }
}

/// Forward-only cursor over a matched entity set.
struct MemoryStream {
    items: std::vec::IntoIter<Entity>,
    released: bool,
}

impl MemoryStream {
    fn new(items: Vec<Entity>) -> Self {
        Self {
            items: items.into_iter(),
            released: false,
        }
    }
}

impl EntityStream for MemoryStream {
    fn next_entity(&mut self) -> DatastoreResult<Option<Entity>> {
        if self.released {
            return Ok(None);
        }
        Ok(self.items.next())
    }

    fn release(&mut self) {
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::{Datastore, EntityInfo, Member};
    use crate::query::parse;
    use std::collections::BTreeMap;

    fn tagged(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sample_store() -> MemoryDatastore {
        let mut store = MemoryDatastore::new();
        store.insert_node(Node {
            id: 1,
            lat: 44.75,
            lon: -91.45,
            tags: tagged(&[("amenity", "pub")]),
            info: EntityInfo {
                uid: 10,
                user: "alice".to_string(),
                changeset: 100,
                timestamp: None,
            },
        });
        store.insert_node(Node {
            id: 2,
            lat: 44.76,
            lon: -91.44,
            tags: tagged(&[("amenity", "restaurant")]),
            info: Default::default(),
        });
        store.insert_node(Node {
            id: 3,
            lat: 10.0,
            lon: 10.0,
            tags: BTreeMap::new(),
            info: Default::default(),
        });
        store.insert_way(Way {
            id: 20,
            nodes: vec![1, 2],
            tags: tagged(&[("highway", "residential")]),
            info: Default::default(),
        });
        store.insert_way(Way {
            id: 21,
            nodes: vec![],
            tags: BTreeMap::new(),
            info: Default::default(),
        });
        store.insert_relation(Relation {
            id: 30,
            members: vec![Member {
                member_type: EntityType::Way,
                member_ref: 20,
                role: "outer".to_string(),
            }],
            tags: tagged(&[("type", "multipolygon")]),
            info: Default::default(),
        });
        store
    }

    fn drain(mut stream: Box<dyn EntityStream + Send + '_>) -> Vec<Entity> {
        let mut out = Vec::new();
        while let Some(e) = stream.next_entity().unwrap() {
            out.push(e);
        }
        out
    }

    #[test]
    fn test_tag_filter() {
        let store = sample_store();
        let desc = parse("node[amenity=pub]").unwrap();
        let got = drain(
            store
                .iterate_nodes(desc.bbox_selectors(), desc.other_selectors())
                .unwrap(),
        );
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id(), 1);
    }

    #[test]
    fn test_group_is_or_combined() {
        let store = sample_store();
        let desc = parse("node[amenity=pub|restaurant]").unwrap();
        let got = drain(
            store
                .iterate_nodes(desc.bbox_selectors(), desc.other_selectors())
                .unwrap(),
        );
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_selector_list_is_and_combined() {
        let store = sample_store();
        let desc = parse("node[amenity=pub][@uid=10]").unwrap();
        let got = drain(
            store
                .iterate_nodes(desc.bbox_selectors(), desc.other_selectors())
                .unwrap(),
        );
        assert_eq!(got.len(), 1);

        let desc = parse("node[amenity=pub][@uid=999]").unwrap();
        let got = drain(
            store
                .iterate_nodes(desc.bbox_selectors(), desc.other_selectors())
                .unwrap(),
        );
        assert!(got.is_empty());
    }

    #[test]
    fn test_negated_way_node_predicate() {
        let store = sample_store();
        let desc = parse("way[not(nd)]").unwrap();
        let got = drain(
            store
                .iterate_ways(desc.bbox_selectors(), desc.other_selectors())
                .unwrap(),
        );
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id(), 21);
    }

    #[test]
    fn test_bbox_union_filters_nodes() {
        let store = sample_store();
        let desc = parse("node[bbox=-92,44,-91,45]").unwrap();
        let got = drain(
            store
                .iterate_nodes(desc.bbox_selectors(), desc.other_selectors())
                .unwrap(),
        );
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_way_matches_region_through_its_nodes() {
        let store = sample_store();
        let desc = parse("way[bbox=-92,44,-91,45]").unwrap();
        let got = drain(
            store
                .iterate_ways(desc.bbox_selectors(), desc.other_selectors())
                .unwrap(),
        );
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id(), 20);
    }

    #[test]
    fn test_full_extract_pulls_members() {
        let store = sample_store();
        let stream = store
            .iterate_bounding_box(-92.0, -91.0, 45.0, 44.0, true)
            .unwrap();
        let got = drain(stream);
        // Two in-box nodes, the way spanning them, the relation over it.
        assert_eq!(got.len(), 4);
        assert_eq!(got[0].entity_type(), EntityType::Node);
        assert_eq!(got.last().unwrap().entity_type(), EntityType::Relation);
    }

    #[test]
    fn test_stream_is_not_restartable_after_release() {
        let store = sample_store();
        let mut stream = store.iterate_nodes(&[], &[]).unwrap();
        assert!(stream.next_entity().unwrap().is_some());
        stream.release();
        stream.release(); // second release is a no-op
        assert!(stream.next_entity().unwrap().is_none());
    }

    #[test]
    fn test_fixture_round_trip() {
        let store = sample_store();
        let json = serde_json::to_string(&store).unwrap();
        let back: MemoryDatastore = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entity_count(), store.entity_count());
    }
}
