//! Nearest clip under the pointer.
//!
//! Every clip is scaled into world space with the viewport convention
//! (`x * width`, `y * height`, `z * width`), projected through the current
//! camera and compared against the pointer in screen pixels. A linear scan
//! is plenty for the few thousand points an export usually holds.

use glam::{Vec2, Vec3};

use crate::model::Catalog;

/// Maps world positions to screen pixels under the current camera.
pub trait Projector {
    fn world_to_screen(&self, world: Vec3) -> Vec2;

    /// Whether `world` is drawn at all. Hidden clips are never candidates.
    fn is_visible(&self, _world: Vec3) -> bool {
        true
    }
}

impl<F: Fn(Vec3) -> Vec2> Projector for F {
    fn world_to_screen(&self, world: Vec3) -> Vec2 {
        self(world)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Selection {
    pub index: usize,
    pub distance: f32, // Screen pixels
    pub screen: Vec2,  // Where the clip was drawn
}

/// Find the visible clip closest to `pointer`. Ties go to the earlier clip.
/// Returns `None` when the catalog is empty or none of its clips is visible.
pub fn select(
    catalog: &Catalog,
    pointer: Vec2,
    viewport: Vec2,
    projector: &impl Projector,
) -> Option<Selection> {
    let mut best: Option<Selection> = None;

    for (index, clip) in catalog.records.iter().enumerate() {
        let world = clip.world_position(viewport);
        if !projector.is_visible(world) {
            continue;
        }
        let screen = projector.world_to_screen(world);
        let distance = screen.distance(pointer);
        // NaN never wins; a clip projected to NaN is only picked if nothing else exists
        let closer = match &best {
            None => true,
            Some(b) => distance < b.distance || (b.distance.is_nan() && !distance.is_nan()),
        };
        if closer {
            best = Some(Selection { index, distance, screen });
        }
    }

    best
}
