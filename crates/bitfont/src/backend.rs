//! The seam between text drawing and a concrete renderer.
//!
//! Fonts never talk to a graphics API directly. They drive a
//! [`TextBackend`] with a small set of state and drawing calls and hand it
//! prebuilt [`DrawCommand`]s to replay. A backend may interpret the ops
//! immediately (the default [`TextBackend::call`]) or compile each command
//! once, keyed by [`CommandId`](crate::CommandId), and free the compiled form
//! when the registry reports the id as released.
//!
//! [`RecordingBackend`] records every call as a [`BackendEvent`] and is used
//! by this crate's tests.

use glam::Vec2;

use crate::atlas::{AtlasTexture, TextureId};
use crate::command::{CommandId, DrawCommand};
use crate::types::{Color, GlyphQuad};

/// Renderer interface used by the draw path.
///
/// Coordinates passed to `translate` and `scale` compose onto the current
/// transform; `push_state`/`pop_state` save and restore it. Colors form a
/// separate stack driven by `push_color`/`pop_color`.
///
/// While the color is locked, `set_color` and `push_color` must not change
/// the effective color (`push_color` still pushes, so pops stay balanced).
/// The shadow pass relies on this to draw marked-up text in one color.
pub trait TextBackend {
    fn push_state(&mut self);
    fn pop_state(&mut self);
    fn translate(&mut self, dx: f32, dy: f32);
    fn scale(&mut self, sx: f32, sy: f32);

    fn set_color(&mut self, color: Color);
    fn push_color(&mut self, color: Color);
    fn pop_color(&mut self);
    fn lock_color(&mut self);
    fn unlock_color(&mut self);

    /// Make `texture` the source of subsequent quads.
    fn bind_texture(&mut self, texture: &AtlasTexture);

    /// Draw one quad in the current transform and color.
    fn draw_quad(&mut self, quad: &GlyphQuad);

    /// Replay a prebuilt command.
    fn call(&mut self, command: &DrawCommand) {
        command.replay(self);
    }
}

/// Color stack with a lock flag, as described on [`TextBackend`].
///
/// Backends can embed this instead of reimplementing the locking rules.
#[derive(Debug, Clone)]
pub struct ColorStack {
    current: Color,
    saved: Vec<Color>,
    locks: u32,
}

impl ColorStack {
    pub fn new(initial: Color) -> Self {
        Self {
            current: initial,
            saved: Vec::new(),
            locks: 0,
        }
    }

    pub fn current(&self) -> Color {
        self.current
    }

    pub fn is_locked(&self) -> bool {
        self.locks > 0
    }

    pub fn set(&mut self, color: Color) {
        if !self.is_locked() {
            self.current = color;
        }
    }

    pub fn push(&mut self, color: Color) {
        self.saved.push(self.current);
        self.set(color);
    }

    /// Restore the last pushed color. Popping an empty stack keeps the
    /// current color.
    pub fn pop(&mut self) {
        if let Some(color) = self.saved.pop() {
            self.current = color;
        }
    }

    pub fn lock(&mut self) {
        self.locks += 1;
    }

    pub fn unlock(&mut self) {
        self.locks = self.locks.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}

impl Default for ColorStack {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

/// An axis-aligned transform: `p' = origin + scale * p`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub origin: Vec2,
    pub scale: Vec2,
}

impl Placement {
    pub const IDENTITY: Self = Self {
        origin: Vec2::ZERO,
        scale: Vec2::ONE,
    };

    pub fn apply(&self, p: Vec2) -> Vec2 {
        self.origin + self.scale * p
    }
}

/// One call received by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    PushState,
    PopState,
    Translate(f32, f32),
    Scale(f32, f32),
    BindTexture(TextureId),
    LockColor,
    UnlockColor,
    /// A replayed command, recorded before its ops.
    Call(CommandId),
    /// A drawn quad with the color and transform in effect.
    Quad {
        quad: GlyphQuad,
        color: Color,
        placement: Placement,
    },
}

impl BackendEvent {
    /// Corners of a quad event in target coordinates, as
    /// `(min, max)`. `None` for other events.
    pub fn quad_bounds(&self) -> Option<(Vec2, Vec2)> {
        match self {
            BackendEvent::Quad {
                quad, placement, ..
            } => {
                let a = placement.apply(Vec2::new(quad.x0, quad.y0));
                let b = placement.apply(Vec2::new(quad.x1, quad.y1));
                Some((a.min(b), a.max(b)))
            }
            _ => None,
        }
    }
}

/// A backend that records what it is asked to do.
#[derive(Debug)]
pub struct RecordingBackend {
    events: Vec<BackendEvent>,
    colors: ColorStack,
    placement: Placement,
    saved: Vec<Placement>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            colors: ColorStack::default(),
            placement: Placement::IDENTITY,
            saved: Vec::new(),
        }
    }

    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    /// Take the recorded events, leaving the log empty.
    pub fn take_events(&mut self) -> Vec<BackendEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Quad events only.
    pub fn quads(&self) -> impl Iterator<Item = &BackendEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, BackendEvent::Quad { .. }))
    }

    /// Ids of every replayed command, in order.
    pub fn calls(&self) -> Vec<CommandId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BackendEvent::Call(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn current_color(&self) -> Color {
        self.colors.current()
    }

    /// Depth of the transform stack; zero once every push is popped.
    pub fn state_depth(&self) -> usize {
        self.saved.len()
    }

    /// Depth of the color stack; zero once every push is popped.
    pub fn color_depth(&self) -> usize {
        self.colors.depth()
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBackend for RecordingBackend {
    fn push_state(&mut self) {
        self.saved.push(self.placement);
        self.events.push(BackendEvent::PushState);
    }

    fn pop_state(&mut self) {
        if let Some(placement) = self.saved.pop() {
            self.placement = placement;
        }
        self.events.push(BackendEvent::PopState);
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.placement.origin += self.placement.scale * Vec2::new(dx, dy);
        self.events.push(BackendEvent::Translate(dx, dy));
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.placement.scale *= Vec2::new(sx, sy);
        self.events.push(BackendEvent::Scale(sx, sy));
    }

    fn set_color(&mut self, color: Color) {
        self.colors.set(color);
    }

    fn push_color(&mut self, color: Color) {
        self.colors.push(color);
    }

    fn pop_color(&mut self) {
        self.colors.pop();
    }

    fn lock_color(&mut self) {
        self.colors.lock();
        self.events.push(BackendEvent::LockColor);
    }

    fn unlock_color(&mut self) {
        self.colors.unlock();
        self.events.push(BackendEvent::UnlockColor);
    }

    fn bind_texture(&mut self, texture: &AtlasTexture) {
        self.events.push(BackendEvent::BindTexture(texture.id()));
    }

    fn draw_quad(&mut self, quad: &GlyphQuad) {
        self.events.push(BackendEvent::Quad {
            quad: *quad,
            color: self.colors.current(),
            placement: self.placement,
        });
    }

    fn call(&mut self, command: &DrawCommand) {
        self.events.push(BackendEvent::Call(command.id()));
        command.replay(self);
    }
}
