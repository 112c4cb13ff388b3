use bevy::prelude::*;
use smallvec::SmallVec;

use crate::data::CanvasSettings;

use super::{
    background::WindowBackground,
    controller::WindowController,
    defs::WindowHandle,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CanvasNode {
    Background,
    Window(WindowHandle),
}

/// Diagnostic produced by [`CanvasHost::check_layers`]; never blocks an open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayerWarning {
    BelowMinOrder {
        new_window: WindowHandle,
        old_window: WindowHandle,
        new_order: i32,
        old_min: i32,
    },
    BelowMaxOrder {
        new_window: WindowHandle,
        old_window: WindowHandle,
        new_order: i32,
        old_max: i32,
    },
}

/// Root container of every window and the background: sibling order (last
/// is drawn on top) and sorting-layer bookkeeping.
#[derive(Clone, Debug)]
pub struct CanvasHost {
    settings: CanvasSettings,
    siblings: Vec<CanvasNode>,
    layer_assigned: bool,
}

impl CanvasHost {
    pub fn new(settings: CanvasSettings) -> Self {
        Self {
            settings,
            siblings: Vec::new(),
            layer_assigned: false,
        }
    }

    pub fn settings(&self) -> &CanvasSettings {
        &self.settings
    }

    pub fn siblings(&self) -> &[CanvasNode] {
        &self.siblings
    }

    pub fn sibling_index(&self, node: CanvasNode) -> Option<usize> {
        self.siblings.iter().position(|sibling| *sibling == node)
    }

    pub fn is_layer_assigned(&self) -> bool {
        self.layer_assigned
    }

    /// Assigns the canvas to its sorting layer once; later calls are no-ops.
    pub fn try_set_canvas_layer(&mut self) -> bool {
        if self.layer_assigned {
            return false;
        }
        info!(
            "window canvas assigned to sorting layer `{}` (order {})",
            self.settings.sorting_layer, self.settings.sorting_order
        );
        self.layer_assigned = true;
        true
    }

    pub fn instantiate(&mut self, node: CanvasNode) {
        if self.sibling_index(node).is_none() {
            self.siblings.push(node);
        }
    }

    pub fn remove(&mut self, node: CanvasNode) -> bool {
        match self.sibling_index(node) {
            Some(index) => {
                self.siblings.remove(index);
                true
            }
            None => false,
        }
    }

    /// Places a freshly instantiated window at the canvas origin.
    pub fn attach(&self, window: &mut WindowController) {
        window.set_home(Vec2::ZERO);
    }

    pub fn move_to_first_plane(&mut self, node: CanvasNode) {
        let Some(index) = self.sibling_index(node) else {
            error!("canvas has no {node:?} to bring forward");
            return;
        };
        let node = self.siblings.remove(index);
        self.siblings.push(node);
    }

    pub fn check_layers(
        &self,
        new_window: &WindowController,
        old_window: &WindowController,
    ) -> SmallVec<[LayerWarning; 2]> {
        let mut warnings = SmallVec::new();
        let old_min = old_window.settings().order();
        let old_max = old_window.settings().max_order_in_layer;
        let new_order = new_window.settings().order();

        if new_order < old_min {
            warn!(
                "window order {new_order} < current min window order {old_min} (new: {} `{}`, old: {} `{}`)",
                new_window.handle(),
                new_window.kind(),
                old_window.handle(),
                old_window.kind()
            );
            warnings.push(LayerWarning::BelowMinOrder {
                new_window: new_window.handle(),
                old_window: old_window.handle(),
                new_order,
                old_min,
            });
        }
        if new_order < old_max {
            warn!(
                "window order {new_order} < current max window order {old_max} (new: {} `{}`, old: {} `{}`)",
                new_window.handle(),
                new_window.kind(),
                old_window.handle(),
                old_window.kind()
            );
            warnings.push(LayerWarning::BelowMaxOrder {
                new_window: new_window.handle(),
                old_window: old_window.handle(),
                new_order,
                old_max,
            });
        }
        warnings
    }

    /// Layering for a window that just became the top: a window wanting a
    /// background pulls the dimmer right under itself, otherwise the dimmer
    /// is dropped when nothing stacked wants it. The window ends up on top.
    pub fn setup_layers(
        &mut self,
        window: &WindowController,
        background: Option<&mut WindowBackground>,
        has_windows_with_background: bool,
        force: bool,
    ) {
        if let Some(background) = background {
            if window.settings().with_background {
                background.show(force, window.settings().background_color);
                self.move_to_first_plane(CanvasNode::Background);
                Self::setup_order_in_layer(window, background);
            } else if !has_windows_with_background {
                background.resetup(true);
            }
        }
        self.move_to_first_plane(CanvasNode::Window(window.handle()));
    }

    pub fn setup_order_in_layer(window: &WindowController, background: &mut WindowBackground) {
        let window_order = window.settings().order();
        background.set_sorting(window_order - 1, window_order > 0);
    }

    /// Depth used for draw order: sorting order first, sibling index second.
    pub fn render_depth(&self, node: CanvasNode, sorting_order: i32) -> f32 {
        let sibling = self.sibling_index(node).unwrap_or(0) as f32;
        self.settings.base_depth
            + self.settings.sorting_order as f32 * self.settings.order_depth_step * 10.0
            + sorting_order as f32 * self.settings.order_depth_step
            + sibling * self.settings.sibling_depth_step
    }
}
