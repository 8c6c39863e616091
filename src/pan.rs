//! Modifier-key drag panning of the scroll viewport
//!
//! Pointer and modifier state arrive as explicit inputs from the host, so a
//! pan gesture can be unit-tested as a plain sequence of calls with no real
//! input system behind it.

use crate::zoom::{PointerPos, ScrollOffsets};

/// One pointer event as reported by the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerInput {
    pub pos: PointerPos,
    /// Primary button pressed
    pub pressed: bool,
    /// The interaction originates from a text-entry control; panning must
    /// not steal the drag from it.
    pub from_text_input: bool,
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    start_pointer: PointerPos,
    start_offsets: ScrollOffsets,
}

/// Translates a held-modifier drag into scroll-offset updates.
#[derive(Debug, Default)]
pub struct PanController {
    drag: Option<Drag>,
}

impl PanController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_panning(&self) -> bool {
        self.drag.is_some()
    }

    /// Try to start a pan. Engages only while the modifier is held, the
    /// pointer is pressed, and the press did not come from a text input.
    /// Returns true if a drag started.
    pub fn pointer_down(
        &mut self,
        input: PointerInput,
        modifier_held: bool,
        offsets: ScrollOffsets,
    ) -> bool {
        if !modifier_held || !input.pressed || input.from_text_input {
            return false;
        }

        self.drag = Some(Drag {
            start_pointer: input.pos,
            start_offsets: offsets,
        });
        true
    }

    /// Advance the drag. Returns the scroll offsets the host should apply,
    /// or `None` when no pan is active.
    #[must_use]
    pub fn pointer_move(&self, pos: PointerPos) -> Option<ScrollOffsets> {
        let drag = self.drag?;
        Some(ScrollOffsets {
            x: drag.start_offsets.x - (pos.x - drag.start_pointer.x),
            y: drag.start_offsets.y - (pos.y - drag.start_pointer.y),
        })
    }

    /// End the drag on pointer release.
    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    /// End the drag when the modifier key is released mid-gesture.
    pub fn modifier_released(&mut self) {
        self.drag = None;
    }
}
