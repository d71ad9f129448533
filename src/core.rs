use crate::expr::Function;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque, process-unique identifier of a plotted expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl ItemId {
    pub fn new() -> Self {
        static CTR: AtomicU64 = AtomicU64::new(1);
        Self(CTR.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
    pub const fn with_a(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Self = Self::rgb(0.0, 0.0, 1.0);
    /// Platform "system blue", the default surface color.
    pub const SYSTEM_BLUE: Self = Self::rgb(0.0, 0.478, 1.0);
    pub const SYSTEM_RED: Self = Self::rgb(1.0, 0.231, 0.188);
    pub const SYSTEM_GREEN: Self = Self::rgb(0.204, 0.78, 0.349);
}

impl Default for Color {
    fn default() -> Self {
        Self::SYSTEM_BLUE
    }
}

impl From<Color> for bevy::prelude::Color {
    #[inline]
    fn from(c: Color) -> Self {
        bevy::prelude::Color::srgba(c.r, c.g, c.b, c.a)
    }
}

/// Rectangular sampling domain plus grid resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub x_range: RangeInclusive<f64>,
    pub y_range: RangeInclusive<f64>,
    pub x_count: usize,
    pub y_count: usize,
}

impl GridSpec {
    pub const MIN_COUNT: usize = 2;
    /// Upper bound per axis. `MAX_COUNT²` vertices still fit a `u32` index buffer.
    pub const MAX_COUNT: usize = 2048;

    pub fn new(
        x_range: RangeInclusive<f64>,
        y_range: RangeInclusive<f64>,
        x_count: usize,
        y_count: usize,
    ) -> Self {
        Self {
            x_range,
            y_range,
            x_count,
            y_count,
        }
    }

    /// Resolution with the floor of two and the ceiling of [`Self::MAX_COUNT`] samples per axis.
    pub fn clamped_counts(&self) -> (usize, usize) {
        (
            self.x_count.clamp(Self::MIN_COUNT, Self::MAX_COUNT),
            self.y_count.clamp(Self::MIN_COUNT, Self::MAX_COUNT),
        )
    }

    pub fn point_count(&self) -> usize {
        let (nx, ny) = self.clamped_counts();
        nx * ny
    }

    pub fn triangle_count(&self) -> usize {
        let (nx, ny) = self.clamped_counts();
        (nx - 1) * (ny - 1) * 2
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::new(-5.0..=5.0, -5.0..=5.0, 80, 80)
    }
}

/// A committed expression and the evaluator parsed from it.
#[derive(Clone)]
pub struct PlotItem {
    pub id: ItemId,
    pub expression: String,
    pub evaluator: Arc<dyn Function>,
    pub color: Color,
    /// Set while the mounted mesh (if any) is stale.
    pub dirty: bool,
}

impl PlotItem {
    pub fn new(expression: impl Into<String>, evaluator: Arc<dyn Function>, color: Color) -> Self {
        Self {
            id: ItemId::new(),
            expression: expression.into(),
            evaluator,
            color,
            dirty: true,
        }
    }

    /// Swap in a freshly parsed evaluator and mark the surface stale.
    pub fn replace_evaluator(&mut self, expression: impl Into<String>, evaluator: Arc<dyn Function>) {
        self.expression = expression.into();
        self.evaluator = evaluator;
        self.dirty = true;
    }
}

impl fmt::Debug for PlotItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlotItem")
            .field("id", &self.id)
            .field("expression", &self.expression)
            .field("color", &self.color)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

/// Ordered list of plotted items; the single owner of every [`PlotItem`].
#[derive(Clone, Debug, Default)]
pub struct ItemList {
    items: Vec<PlotItem>,
}

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append `item`. Returns false, leaving the list untouched, if its id is already present.
    pub fn push(&mut self, item: PlotItem) -> bool {
        if self.contains(item.id) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn get(&self, id: ItemId) -> Option<&PlotItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut PlotItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: ItemId) -> Option<PlotItem> {
        let pos = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Move the item at `from` so it ends up at index `to` (clamped to the list end).
    /// Returns false when `from` is out of range.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() {
            return false;
        }
        let item = self.items.remove(from);
        let to = to.min(self.items.len());
        self.items.insert(to, item);
        true
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().map(|i| i.id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlotItem> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, PlotItem> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[PlotItem] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a ItemList {
    type Item = &'a PlotItem;
    type IntoIter = std::slice::Iter<'a, PlotItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::XyFn;

    fn item(expr: &str) -> PlotItem {
        PlotItem::new(expr, Arc::new(XyFn(|x, y| x + y)), Color::default())
    }

    #[test]
    fn ids_are_unique() {
        let a = ItemId::new();
        let b = ItemId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn new_items_start_dirty() {
        assert!(item("x+y").dirty);
    }

    #[test]
    fn replace_evaluator_marks_dirty() {
        let mut it = item("x+y");
        it.dirty = false;
        it.replace_evaluator("x*y", Arc::new(XyFn(|x, y| x * y)));
        assert!(it.dirty);
        assert_eq!(it.expression, "x*y");
    }

    #[test]
    fn move_item_reorders() {
        let mut list = ItemList::new();
        let (a, b, c) = (item("a"), item("b"), item("c"));
        let ids = [a.id, b.id, c.id];
        list.push(a);
        list.push(b);
        list.push(c);

        assert!(list.move_item(0, 2));
        assert_eq!(list.ids().collect::<Vec<_>>(), vec![ids[1], ids[2], ids[0]]);

        assert!(list.move_item(2, 99));
        assert_eq!(list.ids().last(), Some(ids[0]));
        assert!(!list.move_item(3, 0));
    }

    #[test]
    fn push_rejects_duplicate_ids() {
        let mut list = ItemList::new();
        let a = item("a");
        let mut twin = item("b");
        twin.id = a.id;
        assert!(list.push(a));
        assert!(!list.push(twin));
        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().next().unwrap().expression, "a");
    }

    #[test]
    fn remove_by_id() {
        let mut list = ItemList::new();
        let a = item("a");
        let id = a.id;
        list.push(a);
        assert!(list.remove(id).is_some());
        assert!(list.remove(id).is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn grid_spec_clamps_counts() {
        let spec = GridSpec::new(0.0..=1.0, 0.0..=1.0, 0, 1);
        assert_eq!(spec.clamped_counts(), (2, 2));
        assert_eq!(spec.point_count(), 4);
        assert_eq!(spec.triangle_count(), 2);

        let huge = GridSpec::new(0.0..=1.0, 0.0..=1.0, usize::MAX, 4);
        assert_eq!(huge.clamped_counts(), (GridSpec::MAX_COUNT, 4));
        assert!(u32::try_from(huge.point_count()).is_ok());
    }
}
