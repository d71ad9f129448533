//! Reconciles mounted surfaces against the current item list.

use crate::core::{GridSpec, ItemId, ItemList, PlotItem};
use crate::surface::{SurfaceMesh, build_surface};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// The rendering side of the scene graph. Handles are opaque to the synchronizer.
pub trait SceneBackend {
    type Handle;

    fn attach(&mut self, id: ItemId, mesh: &SurfaceMesh) -> crate::Result<Self::Handle>;

    fn detach(&mut self, handle: Self::Handle);
}

#[derive(Debug)]
pub struct MountedSurface<H> {
    pub handle: H,
    pub mesh: SurfaceMesh,
}

/// Currently mounted surfaces, at most one per item id.
#[derive(Debug)]
pub struct SceneRegistry<H> {
    by_item: HashMap<ItemId, MountedSurface<H>>,
}

impl<H> Default for SceneRegistry<H> {
    fn default() -> Self {
        Self {
            by_item: HashMap::new(),
        }
    }
}

impl<H> SceneRegistry<H> {
    pub fn len(&self) -> usize {
        self.by_item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_item.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.by_item.contains_key(&id)
    }

    pub fn get(&self, id: ItemId) -> Option<&MountedSurface<H>> {
        self.by_item.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.by_item.keys().copied()
    }

    fn insert(&mut self, id: ItemId, mounted: MountedSurface<H>) {
        self.by_item.insert(id, mounted);
    }

    fn remove(&mut self, id: ItemId) -> Option<MountedSurface<H>> {
        self.by_item.remove(&id)
    }
}

/// Outcome of one reconciliation pass, in the order the work happened.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub unmounted: Vec<ItemId>,
    pub rebuilt: Vec<ItemId>,
    pub mounted: Vec<ItemId>,
    /// Ids whose attach failed; they stay dirty and are retried next pass.
    pub failed: Vec<ItemId>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.unmounted.is_empty()
            && self.rebuilt.is_empty()
            && self.mounted.is_empty()
            && self.failed.is_empty()
    }
}

pub struct SceneSynchronizer<H> {
    registry: SceneRegistry<H>,
    grid: GridSpec,
}

impl<H> SceneSynchronizer<H> {
    pub fn new(grid: GridSpec) -> Self {
        Self {
            registry: SceneRegistry::default(),
            grid,
        }
    }

    pub fn registry(&self) -> &SceneRegistry<H> {
        &self.registry
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Bring the registry in line with `items`: unmount, then rebuild, then mount.
    pub fn reconcile<B>(&mut self, items: &mut ItemList, backend: &mut B) -> SyncReport
    where
        B: SceneBackend<Handle = H>,
    {
        let mut report = SyncReport::default();

        // 1) ids that left the list
        let live: HashSet<ItemId> = items.ids().collect();
        let mut stale: Vec<ItemId> = self.registry.ids().filter(|id| !live.contains(id)).collect();
        stale.sort();
        for id in stale {
            if let Some(old) = self.registry.remove(id) {
                backend.detach(old.handle);
                debug!(%id, "unmounted surface");
                report.unmounted.push(id);
            }
        }

        // 2) dirty ids that are already mounted
        for item in items.iter_mut().filter(|i| i.dirty) {
            let Some(old) = self.registry.remove(item.id) else {
                continue;
            };
            backend.detach(old.handle);
            if self.mount(item, backend) {
                debug!(id = %item.id, expr = %item.expression, "rebuilt surface");
                report.rebuilt.push(item.id);
            } else {
                report.failed.push(item.id);
            }
        }

        // 3) ids not yet mounted
        for item in items.iter_mut() {
            if self.registry.contains(item.id) || report.failed.contains(&item.id) {
                continue;
            }
            if self.mount(item, backend) {
                debug!(id = %item.id, expr = %item.expression, "mounted surface");
                report.mounted.push(item.id);
            } else {
                report.failed.push(item.id);
            }
        }

        if !report.is_empty() {
            info!(
                unmounted = report.unmounted.len(),
                rebuilt = report.rebuilt.len(),
                mounted = report.mounted.len(),
                failed = report.failed.len(),
                "scene reconciled"
            );
        }
        report
    }

    /// Build and attach a surface for `item`. On failure the item stays dirty and absent.
    fn mount<B>(&mut self, item: &mut PlotItem, backend: &mut B) -> bool
    where
        B: SceneBackend<Handle = H>,
    {
        let mesh = build_surface(item.evaluator.as_ref(), &self.grid, item.color);
        match backend.attach(item.id, &mesh) {
            Ok(handle) => {
                self.registry.insert(item.id, MountedSurface { handle, mesh });
                item.dirty = false;
                true
            }
            Err(report) => {
                warn!(id = %item.id, "failed to attach surface: {report:?}");
                item.dirty = true;
                false
            }
        }
    }

    /// Detach everything, e.g. when the scene is torn down.
    pub fn clear<B>(&mut self, backend: &mut B)
    where
        B: SceneBackend<Handle = H>,
    {
        for (_, mounted) in self.registry.by_item.drain() {
            backend.detach(mounted.handle);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::StudioError;
    use crate::core::Color;
    use crate::expr::{ExpressionParser, FunctionParser};
    use error_stack::Report;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Op {
        Attach(ItemId, u32),
        Detach(u32),
    }

    /// Records every call and tracks which handles are live.
    #[derive(Default)]
    pub struct RecordingBackend {
        pub ops: Vec<Op>,
        pub live: HashSet<u32>,
        pub live_per_item: HashMap<ItemId, u32>,
        pub fail_for: HashSet<ItemId>,
        next: u32,
    }

    impl SceneBackend for RecordingBackend {
        type Handle = u32;

        fn attach(&mut self, id: ItemId, _mesh: &SurfaceMesh) -> crate::Result<u32> {
            if self.fail_for.contains(&id) {
                return Err(Report::new(StudioError::Scene).attach("refused by test backend"));
            }
            assert!(
                !self.live_per_item.contains_key(&id),
                "two live meshes for {id}"
            );
            self.next += 1;
            self.live.insert(self.next);
            self.live_per_item.insert(id, self.next);
            self.ops.push(Op::Attach(id, self.next));
            Ok(self.next)
        }

        fn detach(&mut self, handle: u32) {
            assert!(self.live.remove(&handle), "detached unknown handle {handle}");
            self.live_per_item.retain(|_, h| *h != handle);
            self.ops.push(Op::Detach(handle));
        }
    }

    fn item(src: &str) -> PlotItem {
        let f = ExpressionParser.parse(src).unwrap();
        PlotItem::new(src, f, Color::default())
    }

    fn small_grid() -> GridSpec {
        GridSpec::new(-5.0..=5.0, -5.0..=5.0, 8, 6)
    }

    #[test]
    fn mount_then_idle_then_unmount() {
        let mut items = ItemList::new();
        let it = item("x+y");
        let id = it.id;
        items.push(it);

        let mut sync = SceneSynchronizer::new(GridSpec::default());
        let mut backend = RecordingBackend::default();

        let report = sync.reconcile(&mut items, &mut backend);
        assert_eq!(report.mounted, vec![id]);
        assert_eq!(sync.registry().len(), 1);
        let mounted = sync.registry().get(id).unwrap();
        assert_eq!(mounted.mesh.triangle_count(), 79 * 79 * 2);
        assert!(!items.get(id).unwrap().dirty);

        let report = sync.reconcile(&mut items, &mut backend);
        assert!(report.is_empty());

        items.remove(id);
        let report = sync.reconcile(&mut items, &mut backend);
        assert_eq!(report.unmounted, vec![id]);
        assert!(sync.registry().is_empty());
        assert!(backend.live.is_empty());
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut items = ItemList::new();
        for src in ["x", "y", "x*y"] {
            items.push(item(src));
        }
        let mut sync = SceneSynchronizer::new(small_grid());
        let mut backend = RecordingBackend::default();

        sync.reconcile(&mut items, &mut backend);
        let ops_after_first = backend.ops.len();
        for _ in 0..3 {
            assert!(sync.reconcile(&mut items, &mut backend).is_empty());
        }
        assert_eq!(backend.ops.len(), ops_after_first);
    }

    #[test]
    fn rebuild_detaches_before_attaching() {
        let mut items = ItemList::new();
        let it = item("x");
        let id = it.id;
        items.push(it);

        let mut sync = SceneSynchronizer::new(small_grid());
        let mut backend = RecordingBackend::default();
        sync.reconcile(&mut items, &mut backend);

        let f = ExpressionParser.parse("x^2").unwrap();
        items.get_mut(id).unwrap().replace_evaluator("x^2", f);
        let report = sync.reconcile(&mut items, &mut backend);

        assert_eq!(report.rebuilt, vec![id]);
        assert!(report.mounted.is_empty());
        assert_eq!(
            backend.ops,
            vec![Op::Attach(id, 1), Op::Detach(1), Op::Attach(id, 2)]
        );
        assert!(!items.get(id).unwrap().dirty);
        // x = -5 at vertex 0, so the new height is 25
        assert_eq!(sync.registry().get(id).unwrap().mesh.vertices[0][2], 25.0);
    }

    #[test]
    fn only_affected_items_are_touched() {
        let mut items = ItemList::new();
        let (a, b, c) = (item("x"), item("y"), item("1"));
        let (ida, idb, idc) = (a.id, b.id, c.id);
        items.push(a);
        items.push(b);
        items.push(c);

        let mut sync = SceneSynchronizer::new(small_grid());
        let mut backend = RecordingBackend::default();
        sync.reconcile(&mut items, &mut backend);
        let handle_c = backend.live_per_item[&idc];

        items.remove(ida);
        items.get_mut(idb).unwrap().dirty = true;
        let d = item("2");
        let idd = d.id;
        items.push(d);

        let report = sync.reconcile(&mut items, &mut backend);
        assert_eq!(report.unmounted, vec![ida]);
        assert_eq!(report.rebuilt, vec![idb]);
        assert_eq!(report.mounted, vec![idd]);
        assert_eq!(backend.live_per_item[&idc], handle_c);
        assert_eq!(sync.registry().len(), 3);
    }

    #[test]
    fn failed_attach_is_retried() {
        let mut items = ItemList::new();
        let it = item("x");
        let id = it.id;
        items.push(it);

        let mut sync = SceneSynchronizer::new(small_grid());
        let mut backend = RecordingBackend::default();
        backend.fail_for.insert(id);

        let report = sync.reconcile(&mut items, &mut backend);
        assert_eq!(report.failed, vec![id]);
        assert!(sync.registry().is_empty());
        assert!(items.get(id).unwrap().dirty);

        backend.fail_for.clear();
        let report = sync.reconcile(&mut items, &mut backend);
        assert_eq!(report.mounted, vec![id]);
        assert!(!items.get(id).unwrap().dirty);
    }

    #[test]
    fn failed_rebuild_leaves_item_absent_then_remounts() {
        let mut items = ItemList::new();
        let it = item("x");
        let id = it.id;
        items.push(it);

        let mut sync = SceneSynchronizer::new(small_grid());
        let mut backend = RecordingBackend::default();
        sync.reconcile(&mut items, &mut backend);

        items.get_mut(id).unwrap().dirty = true;
        backend.fail_for.insert(id);
        let report = sync.reconcile(&mut items, &mut backend);
        assert_eq!(report.failed, vec![id]);
        assert!(report.mounted.is_empty());
        assert!(!sync.registry().contains(id));

        backend.fail_for.clear();
        let report = sync.reconcile(&mut items, &mut backend);
        assert_eq!(report.mounted, vec![id]);
    }

    #[test]
    fn clear_detaches_everything() {
        let mut items = ItemList::new();
        items.push(item("x"));
        items.push(item("y"));
        let mut sync = SceneSynchronizer::new(small_grid());
        let mut backend = RecordingBackend::default();
        sync.reconcile(&mut items, &mut backend);

        sync.clear(&mut backend);
        assert!(sync.registry().is_empty());
        assert!(backend.live.is_empty());
    }
}
