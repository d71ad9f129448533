//! Command-queue driver that owns the item list and the scene synchronizer.
//!
//! Edit handlers never touch the list directly. They parse, then enqueue an
//! [`ItemCommand`]; [`Studio::tick`] drains whatever was queued before it started and runs
//! exactly one reconciliation pass. Anything enqueued afterwards lands on the next tick.

use crate::config::SurfaceConfig;
use crate::core::{Color, ItemId, ItemList, PlotItem};
use crate::expr::{ExpressionParser, Function, FunctionParser, ParseError};
use crate::scene::{SceneBackend, SceneRegistry, SceneSynchronizer, SyncReport};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A deferred mutation of the item list.
pub enum ItemCommand {
    Add(PlotItem),
    Replace {
        id: ItemId,
        expression: String,
        evaluator: Arc<dyn Function>,
    },
    Remove(ItemId),
    Move {
        from: usize,
        to: usize,
    },
}

impl fmt::Debug for ItemCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemCommand::Add(item) => f.debug_tuple("Add").field(&item.id).finish(),
            ItemCommand::Replace { id, expression, .. } => f
                .debug_struct("Replace")
                .field("id", id)
                .field("expression", expression)
                .finish_non_exhaustive(),
            ItemCommand::Remove(id) => f.debug_tuple("Remove").field(id).finish(),
            ItemCommand::Move { from, to } => f
                .debug_struct("Move")
                .field("from", from)
                .field("to", to)
                .finish(),
        }
    }
}

pub struct Studio<H> {
    items: ItemList,
    pending: VecDeque<ItemCommand>,
    sync: SceneSynchronizer<H>,
    parser: Arc<dyn FunctionParser>,
    default_color: Color,
}

impl<H> Studio<H> {
    pub fn new(config: &SurfaceConfig) -> Self {
        Self::with_parser(config, Arc::new(ExpressionParser))
    }

    pub fn with_parser(config: &SurfaceConfig, parser: Arc<dyn FunctionParser>) -> Self {
        Self {
            items: ItemList::new(),
            pending: VecDeque::new(),
            sync: SceneSynchronizer::new(config.grid_spec()),
            parser,
            default_color: config.default_color,
        }
    }

    pub fn items(&self) -> &ItemList {
        &self.items
    }

    pub fn registry(&self) -> &SceneRegistry<H> {
        self.sync.registry()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Commit a new expression in the default color. Blank input is ignored.
    pub fn submit(&mut self, text: &str) -> Result<Option<ItemId>, ParseError> {
        let color = self.default_color;
        self.submit_with_color(text, color)
    }

    pub fn submit_with_color(
        &mut self,
        text: &str,
        color: Color,
    ) -> Result<Option<ItemId>, ParseError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let evaluator = self.parse(text)?;
        let item = PlotItem::new(text, evaluator, color);
        let id = item.id;
        self.enqueue(ItemCommand::Add(item));
        Ok(Some(id))
    }

    /// Re-parse an existing item's expression. The item is rebuilt on the next tick.
    pub fn edit(&mut self, id: ItemId, text: &str) -> Result<(), ParseError> {
        let evaluator = self.parse(text)?;
        self.enqueue(ItemCommand::Replace {
            id,
            expression: text.to_string(),
            evaluator,
        });
        Ok(())
    }

    pub fn remove(&mut self, id: ItemId) {
        self.enqueue(ItemCommand::Remove(id));
    }

    pub fn move_item(&mut self, from: usize, to: usize) {
        self.enqueue(ItemCommand::Move { from, to });
    }

    pub fn enqueue(&mut self, cmd: ItemCommand) {
        debug!(?cmd, "queued item command");
        self.pending.push_back(cmd);
    }

    /// Apply queued commands, then reconcile the scene once.
    pub fn tick<B>(&mut self, backend: &mut B) -> SyncReport
    where
        B: SceneBackend<Handle = H>,
    {
        let batch = std::mem::take(&mut self.pending);
        for cmd in batch {
            self.apply(cmd);
        }
        self.sync.reconcile(&mut self.items, backend)
    }

    /// Detach every mounted surface and drop all items and queued commands.
    pub fn clear<B>(&mut self, backend: &mut B)
    where
        B: SceneBackend<Handle = H>,
    {
        self.pending.clear();
        self.items = ItemList::new();
        self.sync.clear(backend);
    }

    fn parse(&self, text: &str) -> Result<Arc<dyn Function>, ParseError> {
        self.parser.parse(text).inspect_err(|err| {
            warn!(expr = text, "rejected expression: {err}");
        })
    }

    fn apply(&mut self, cmd: ItemCommand) {
        match cmd {
            ItemCommand::Add(item) => {
                let id = item.id;
                if !self.items.push(item) {
                    warn!(%id, "duplicate add ignored");
                }
            }
            ItemCommand::Replace {
                id,
                expression,
                evaluator,
            } => match self.items.get_mut(id) {
                Some(item) => item.replace_evaluator(expression, evaluator),
                None => debug!(%id, "edit for removed item dropped"),
            },
            ItemCommand::Remove(id) => {
                if self.items.remove(id).is_none() {
                    debug!(%id, "remove for unknown item dropped");
                }
            }
            ItemCommand::Move { from, to } => {
                if !self.items.move_item(from, to) {
                    debug!(from, to, "move out of range dropped");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::tests::{Op, RecordingBackend};

    fn studio() -> Studio<u32> {
        let config = SurfaceConfig {
            x_count: 6,
            y_count: 4,
            ..SurfaceConfig::default()
        };
        Studio::new(&config)
    }

    #[test]
    fn submissions_land_on_the_next_tick() {
        let mut s = studio();
        let mut backend = RecordingBackend::default();

        let id = s.submit("x + y").unwrap().unwrap();
        assert!(s.items().is_empty());
        assert_eq!(s.pending(), 1);

        let report = s.tick(&mut backend);
        assert_eq!(report.mounted, vec![id]);
        assert_eq!(s.items().len(), 1);
        assert_eq!(s.pending(), 0);
        assert_eq!(s.items().get(id).unwrap().color, Color::SYSTEM_BLUE);
    }

    #[test]
    fn parse_errors_leave_everything_unchanged() {
        let mut s = studio();
        let mut backend = RecordingBackend::default();
        let id = s.submit("x").unwrap().unwrap();
        s.tick(&mut backend);

        assert!(s.submit("x +").is_err());
        assert!(s.edit(id, "sin(").is_err());
        assert_eq!(s.pending(), 0);

        let report = s.tick(&mut backend);
        assert!(report.is_empty());
        assert_eq!(s.items().get(id).unwrap().expression, "x");
    }

    #[test]
    fn blank_submission_is_ignored() {
        let mut s = studio();
        assert_eq!(s.submit("   ").unwrap(), None);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn edit_rebuilds_only_that_item() {
        let mut s = studio();
        let mut backend = RecordingBackend::default();
        let a = s.submit("x").unwrap().unwrap();
        let b = s.submit("y").unwrap().unwrap();
        s.tick(&mut backend);

        s.edit(a, "x*x").unwrap();
        let report = s.tick(&mut backend);
        assert_eq!(report.rebuilt, vec![a]);
        assert!(report.mounted.is_empty());
        assert!(s.registry().contains(b));
        assert_eq!(s.items().get(a).unwrap().expression, "x*x");
    }

    #[test]
    fn remove_then_tick_unmounts() {
        let mut s = studio();
        let mut backend = RecordingBackend::default();
        let id = s.submit("x").unwrap().unwrap();
        s.tick(&mut backend);

        s.remove(id);
        let report = s.tick(&mut backend);
        assert_eq!(report.unmounted, vec![id]);
        assert!(s.registry().is_empty());
    }

    #[test]
    fn add_and_remove_in_one_batch_never_mounts() {
        let mut s = studio();
        let mut backend = RecordingBackend::default();
        let id = s.submit("x").unwrap().unwrap();
        s.remove(id);
        let report = s.tick(&mut backend);
        assert!(report.is_empty());
        assert!(backend.ops.is_empty());
    }

    #[test]
    fn delete_and_recreate_in_one_pass_do_not_collide() {
        let mut s = studio();
        let mut backend = RecordingBackend::default();
        let id = s.submit("x").unwrap().unwrap();
        s.tick(&mut backend);

        // Same id leaves and comes back within one batch.
        let f = ExpressionParser.parse("y").unwrap();
        let mut revived = PlotItem::new("y", f, Color::RED);
        revived.id = id;
        s.remove(id);
        s.enqueue(ItemCommand::Add(revived));

        let report = s.tick(&mut backend);
        assert_eq!(report.rebuilt, vec![id]);
        assert_eq!(backend.ops, vec![Op::Attach(id, 1), Op::Detach(1), Op::Attach(id, 2)]);
        assert_eq!(s.registry().len(), 1);
        assert_eq!(s.registry().get(id).unwrap().mesh.color, Color::RED);
    }

    #[test]
    fn duplicate_add_is_dropped() {
        let mut s = studio();
        let mut backend = RecordingBackend::default();
        let id = s.submit("x").unwrap().unwrap();
        let f = ExpressionParser.parse("y").unwrap();
        let mut twin = PlotItem::new("y", f, Color::RED);
        twin.id = id;
        s.enqueue(ItemCommand::Add(twin));

        let report = s.tick(&mut backend);
        assert_eq!(report.mounted, vec![id]);
        assert_eq!(s.items().len(), 1);
        assert_eq!(s.items().get(id).unwrap().expression, "x");
    }

    #[test]
    fn moves_reorder_without_touching_the_scene() {
        let mut s = studio();
        let mut backend = RecordingBackend::default();
        let a = s.submit("x").unwrap().unwrap();
        let b = s.submit("y").unwrap().unwrap();
        s.tick(&mut backend);

        s.move_item(1, 0);
        let report = s.tick(&mut backend);
        assert!(report.is_empty());
        assert_eq!(s.items().ids().collect::<Vec<_>>(), vec![b, a]);
    }

    #[test]
    fn clear_drops_everything() {
        let mut s = studio();
        let mut backend = RecordingBackend::default();
        s.submit("x").unwrap();
        s.tick(&mut backend);
        s.submit("y").unwrap();

        s.clear(&mut backend);
        assert!(s.items().is_empty());
        assert_eq!(s.pending(), 0);
        assert!(backend.live.is_empty());
    }
}
