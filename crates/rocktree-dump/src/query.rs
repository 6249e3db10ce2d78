//! Map coordinates and bounding boxes to existing octant paths.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use rocktree::DataSource;

use crate::error::OctantError;
use crate::navigator::BulkNavigator;
use crate::octant::{self, OctantBox, ROOT_OCTANTS};

/// Octants found at one depth.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthOctants {
    /// Union of every recorded box at this depth.
    pub bounds: OctantBox,
    pub octants: BTreeMap<String, OctantBox>,
}

/// Query result: depth to the octants found at that depth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoundOctants {
    depths: BTreeMap<usize, DepthOctants>,
}

impl FoundOctants {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` with its box. Recording a path again is a no-op if the
    /// box matches and an error otherwise.
    pub fn record(&mut self, path: &str, bounds: OctantBox) -> Result<(), OctantError> {
        match self.depths.entry(path.len()) {
            Entry::Vacant(entry) => {
                entry.insert(DepthOctants {
                    bounds,
                    octants: BTreeMap::from([(path.to_owned(), bounds)]),
                });
            }
            Entry::Occupied(mut entry) => {
                let depth = entry.get_mut();
                match depth.octants.get(path) {
                    Some(recorded) if *recorded != bounds => {
                        return Err(OctantError::InconsistentBox {
                            path: path.to_owned(),
                            recorded: *recorded,
                            found: bounds,
                        });
                    }
                    Some(_) => {}
                    None => {
                        depth.octants.insert(path.to_owned(), bounds);
                        depth.bounds = depth.bounds.union(&bounds);
                    }
                }
            }
        }
        Ok(())
    }

    /// Record `path` at a depth whose octants must all share one box, as on
    /// the path to a single point.
    pub fn record_shared(&mut self, path: &str, bounds: OctantBox) -> Result<(), OctantError> {
        let recorded = self.depths.get(&path.len()).map(|depth| depth.bounds);
        if let Some(recorded) = recorded.filter(|recorded| *recorded != bounds) {
            return Err(OctantError::InconsistentBox {
                path: path.to_owned(),
                recorded,
                found: bounds,
            });
        }
        self.record(path, bounds)
    }

    #[must_use]
    pub fn depth(&self, depth: usize) -> Option<&DepthOctants> {
        self.depths.get(&depth)
    }

    /// Depths with at least one octant, shallowest first.
    pub fn depths(&self) -> impl Iterator<Item = (usize, &DepthOctants)> {
        self.depths.iter().map(|(&depth, octants)| (depth, octants))
    }

    #[must_use]
    pub fn deepest(&self) -> Option<usize> {
        self.depths.keys().next_back().copied()
    }

    /// Paths at `depth`, sorted.
    #[must_use]
    pub fn paths_at(&self, depth: usize) -> Vec<String> {
        self.depth(depth)
            .map(|found| found.octants.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Paths at `depth`, or at the deepest recorded depth if shallower.
    #[must_use]
    pub fn starting_paths(&self, depth: usize) -> Vec<String> {
        match self.deepest() {
            Some(deepest) => self.paths_at(depth.min(deepest)),
            None => Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    /// Total number of recorded paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.depths.values().map(|found| found.octants.len()).sum()
    }

    /// JSON summary: `{ "<depth>": { "box": {..}, "octants": [..] } }`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let box_json = |b: &OctantBox| {
            serde_json::json!({ "n": b.north, "s": b.south, "e": b.east, "w": b.west })
        };
        self.depths
            .iter()
            .map(|(depth, found)| {
                (
                    depth.to_string(),
                    serde_json::json!({
                        "box": box_json(&found.bounds),
                        "octants": found.octants.keys().collect::<Vec<_>>(),
                    }),
                )
            })
            .collect::<serde_json::Map<_, _>>()
            .into()
    }
}

/// Spatial queries over the octants present in the bulk index.
#[derive(Debug)]
pub struct OctantQuery<S> {
    navigator: BulkNavigator<S>,
}

impl<S: DataSource> OctantQuery<S> {
    pub fn new(navigator: BulkNavigator<S>) -> Self {
        Self { navigator }
    }

    /// Every existing octant on the path down to the point, up to
    /// `max_depth` digits.
    pub async fn point(
        &self,
        lat: f64,
        lon: f64,
        max_depth: usize,
    ) -> Result<FoundOctants, OctantError> {
        let (root, root_box) = octant::root_octant(lat, lon)?;
        let mut found = FoundOctants::new();
        let mut pending = vec![(root.to_owned(), root_box)];

        while let Some((path, bounds)) = pending.pop() {
            if path.len() > max_depth || self.navigator.locate(&path).await.is_none() {
                continue;
            }
            if let Err(e) = found.record_shared(&path, bounds) {
                tracing::error!("{}", e);
                continue;
            }

            let (key, child) = bounds.child_for_point(lat, lon);
            // Popped in digit order: `key` first, then its sibling.
            pending.push((format!("{path}{}", key + 4), child));
            pending.push((format!("{path}{key}"), child));
        }

        Ok(found)
    }

    /// Every existing octant intersecting `rect`, up to `max_depth` digits.
    pub async fn bounding_box(
        &self,
        rect: OctantBox,
        max_depth: usize,
    ) -> Result<FoundOctants, OctantError> {
        rect.validate()?;
        let mut found = FoundOctants::new();
        let mut pending: Vec<(String, OctantBox)> = ROOT_OCTANTS
            .iter()
            .rev()
            .map(|&(path, bounds)| (path.to_owned(), bounds))
            .collect();

        while let Some((path, bounds)) = pending.pop() {
            if path.len() > max_depth
                || !bounds.intersects(&rect)
                || self.navigator.locate(&path).await.is_none()
            {
                continue;
            }
            if let Err(e) = found.record(&path, bounds) {
                tracing::error!("{}", e);
                continue;
            }

            let inside = bounds.is_inside(&rect);
            for (key, child) in bounds.children().into_iter().rev() {
                if inside || child.intersects(&rect) {
                    pending.push((format!("{path}{}", key + 4), child));
                    pending.push((format!("{path}{key}"), child));
                }
            }
        }

        tracing::debug!("Found {} octants in {:?}", found.len(), rect);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::MemorySource;

    /// Every octant under "30" exists down to depth 4; nothing else does.
    fn dense_source() -> Arc<MemorySource> {
        let mut entries = vec![("30".to_owned(), 0, None)];
        let mut frontier = vec!["30".to_owned()];
        for _ in 0..2 {
            let mut next = Vec::new();
            for path in &frontier {
                for digit in 0..8 {
                    next.push(format!("{path}{digit}"));
                }
            }
            entries.extend(next.iter().map(|path| (path.clone(), 0, None)));
            frontier = next;
        }

        let entries: Vec<(&str, u32, Option<u32>)> = entries
            .iter()
            .map(|(path, flags, epoch)| (path.as_str(), *flags, *epoch))
            .collect();
        let source = MemorySource::new(1);
        source.add_bulk("", 1, &entries);
        Arc::new(source)
    }

    fn area(b: &OctantBox) -> f64 {
        (b.north - b.south).max(0.0) * (b.east - b.west).max(0.0)
    }

    fn overlap_area(a: &OctantBox, b: &OctantBox) -> f64 {
        area(&OctantBox::new(
            a.north.min(b.north),
            a.south.max(b.south),
            a.east.min(b.east),
            a.west.max(b.west),
        ))
    }

    fn query(source: Arc<MemorySource>) -> OctantQuery<MemorySource> {
        OctantQuery::new(BulkNavigator::new(source, 1))
    }

    #[test]
    fn record_rejects_conflicting_boxes() {
        let mut found = FoundOctants::new();
        let a = OctantBox::new(1.0, 0.0, 1.0, 0.0);
        let b = OctantBox::new(2.0, 1.0, 1.0, 0.0);

        found.record("300", a).unwrap();
        found.record("300", a).unwrap();
        found.record("304", b).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found.depth(3).unwrap().bounds, OctantBox::new(2.0, 0.0, 1.0, 0.0));

        assert!(matches!(
            found.record("300", b),
            Err(OctantError::InconsistentBox { .. })
        ));
    }

    #[test]
    fn shared_depth_rejects_a_second_box() {
        let mut found = FoundOctants::new();
        let a = OctantBox::new(1.0, 0.0, 1.0, 0.0);
        let b = OctantBox::new(2.0, 1.0, 1.0, 0.0);

        found.record_shared("302", a).unwrap();
        found.record_shared("306", a).unwrap();
        assert!(matches!(
            found.record_shared("303", b),
            Err(OctantError::InconsistentBox { ref path, .. }) if path == "303"
        ));
        assert_eq!(found.paths_at(3), vec!["302", "306"]);
    }

    #[tokio::test]
    async fn point_boxes_contain_the_point_and_nest() {
        let (lat, lon) = (43.7, 10.4);
        let found = query(dense_source()).point(lat, lon, 21).await.unwrap();

        assert_eq!(found.deepest(), Some(4));
        let mut previous: Option<OctantBox> = None;
        for (depth, octants) in found.depths() {
            // Siblings `k` and `k + 4` share one box, so every level doubles.
            assert_eq!(octants.octants.len(), 1 << (depth - 2), "depth {depth}");
            assert!(octants.octants.values().all(|b| *b == octants.bounds));
            assert!(octants.bounds.contains(lat, lon));
            if let Some(parent) = previous {
                assert!(octants.bounds.is_inside(&parent));
            }
            previous = Some(octants.bounds);
        }
    }

    #[tokio::test]
    async fn point_respects_max_depth() {
        let found = query(dense_source()).point(43.7, 10.4, 3).await.unwrap();
        assert_eq!(found.deepest(), Some(3));
        assert!(found.depth(2).is_some());
    }

    #[tokio::test]
    async fn point_outside_the_data_is_empty() {
        let found = query(dense_source()).point(-10.0, 10.0, 21).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn bbox_boxes_intersect_and_cover_the_rectangle() {
        let rect = OctantBox::new(50.0, 40.0, 30.0, 10.0);
        let found = query(dense_source()).bounding_box(rect, 21).await.unwrap();

        assert_eq!(found.paths_at(2), vec!["30".to_string()]);
        assert_eq!(found.deepest(), Some(4));
        for (depth, octants) in found.depths() {
            let mut covered = 0.0;
            for (path, bounds) in &octants.octants {
                assert!(bounds.intersects(&rect), "{path} at depth {depth}");

                let digit = path.as_bytes()[path.len() - 1] - b'0';
                if depth > 2 && digit >= 4 {
                    let sibling = format!("{}{}", &path[..path.len() - 1], digit - 4);
                    assert_eq!(octants.octants.get(&sibling), Some(bounds), "{path}");
                    continue;
                }
                covered += overlap_area(bounds, &rect);
            }
            assert!(
                (covered - area(&rect)).abs() < 1e-9,
                "depth {depth} covers {covered}"
            );
        }
        assert!(found.depth(4).unwrap().octants.len() > found.depth(3).unwrap().octants.len());
    }

    #[tokio::test]
    async fn bbox_inside_an_octant_visits_both_siblings() {
        // Entirely inside "30" and its child "302" (45..90 N is polar, so
        // the north half is not split by longitude).
        let rect = OctantBox::new(60.0, 50.0, 30.0, 10.0);
        let found = query(dense_source()).bounding_box(rect, 3).await.unwrap();
        assert_eq!(found.paths_at(3), vec!["302".to_string(), "306".to_string()]);
    }

    #[tokio::test]
    async fn bbox_query_is_idempotent() {
        let query = query(dense_source());
        let rect = OctantBox::new(30.0, 10.0, 80.0, 20.0);
        let first = query.bounding_box(rect, 21).await.unwrap();
        let second = query.bounding_box(rect, 21).await.unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[tokio::test]
    async fn bbox_without_data_is_empty() {
        let source = Arc::new(MemorySource::new(1));
        source.add_bulk("", 1, &[]);
        let rect = OctantBox::new(1.0, 0.0, 1.0, 0.0);
        let found = query(source).bounding_box(rect, 21).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn bbox_is_validated() {
        let rect = OctantBox::new(0.0, 1.0, 1.0, 0.0);
        assert!(matches!(
            query(dense_source()).bounding_box(rect, 21).await,
            Err(OctantError::InvalidBoundingBox(_))
        ));
    }

    #[test]
    fn starting_paths_fall_back_to_the_deepest_depth() {
        let mut found = FoundOctants::new();
        let b = OctantBox::new(1.0, 0.0, 1.0, 0.0);
        found.record("30", b).unwrap();
        found.record("301", b).unwrap();
        found.record("305", b).unwrap();

        assert_eq!(found.starting_paths(19), vec!["301", "305"]);
        assert_eq!(found.starting_paths(2), vec!["30"]);
        assert!(FoundOctants::new().starting_paths(19).is_empty());

        let json = found.to_json();
        assert_eq!(json["3"]["octants"], serde_json::json!(["301", "305"]));
        assert_eq!(json["2"]["box"]["n"], serde_json::json!(1.0));
    }
}
