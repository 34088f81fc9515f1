//! AABB primitives shared by the player, the mobs and the trigger checks.
//! World coordinates are pixels with y growing downward.

/// Axis-aligned rectangle. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height * 0.5
    }

    /// Strict overlap test. Rectangles that merely share an edge do not
    /// intersect, which is what keeps a player resting exactly on a block's
    /// top edge out of the collision pass.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// The four directed penetration depths of `entity` into `block`, valid only
/// when the two rectangles intersect. Each value measures how far the entity
/// would have to move in that direction to clear the block.
#[derive(Debug, Clone, Copy)]
pub struct Overlaps {
    /// Push the entity left (its right edge penetrates the block's left edge).
    pub left: f32,
    /// Push the entity right.
    pub right: f32,
    /// Push the entity up (landing).
    pub top: f32,
    /// Push the entity down (head bump).
    pub bottom: f32,
}

impl Overlaps {
    pub fn between(entity: &Rect, block: &Rect) -> Self {
        Self {
            left: entity.right() - block.x,
            right: block.right() - entity.x,
            top: entity.bottom() - block.y,
            bottom: block.bottom() - entity.y,
        }
    }

    pub fn min(&self) -> f32 {
        self.left.min(self.right).min(self.top).min(self.bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_rects_intersect() {
        let a = Rect::new(0.0, 0.0, 32.0, 32.0);
        let b = Rect::new(16.0, 16.0, 32.0, 32.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn edge_touching_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 32.0, 32.0);
        let right_neighbor = Rect::new(32.0, 0.0, 32.0, 32.0);
        let below_neighbor = Rect::new(0.0, 32.0, 32.0, 32.0);
        assert!(!a.intersects(&right_neighbor));
        assert!(!a.intersects(&below_neighbor));
    }

    #[test]
    fn disjoint_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(100.0, 100.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn overlaps_measure_directed_penetration() {
        // Entity straddles the block's top-left corner, deeper horizontally
        // than vertically.
        let entity = Rect::new(0.0, 0.0, 32.0, 32.0);
        let block = Rect::new(10.0, 24.0, 100.0, 100.0);
        let overlaps = Overlaps::between(&entity, &block);
        assert_eq!(overlaps.left, 22.0);
        assert_eq!(overlaps.top, 8.0);
        assert_eq!(overlaps.min(), 8.0);
    }
}
