//! Static level geometry. Blocks are immutable once loaded and owned by the
//! level's block vector; entities refer to them by index.

use crate::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Normal,
    /// Touching one kills the player and aborts the rest of the block pass.
    Deadly,
    /// Detected but never resolved (pass-through). The gameplay effect of a
    /// finish block comes from the end zone rectangle the loader pairs with it.
    Finish,
    Colored,
    Textured,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub rect: Rect,
    pub kind: BlockType,
    /// RGBA fill for `Colored` blocks.
    pub color: Option<[f32; 4]>,
    /// Texture path for `Textured` blocks.
    pub texture: Option<String>,
}

impl Block {
    pub fn new(rect: Rect, kind: BlockType) -> Self {
        Self {
            rect,
            kind,
            color: None,
            texture: None,
        }
    }

    pub fn colored(rect: Rect, color: [f32; 4]) -> Self {
        Self {
            rect,
            kind: BlockType::Colored,
            color: Some(color),
            texture: None,
        }
    }

    pub fn textured(rect: Rect, texture: String) -> Self {
        Self {
            rect,
            kind: BlockType::Textured,
            color: None,
            texture: Some(texture),
        }
    }

    /// Whether the block takes part in mob physics and ceiling grabs.
    /// Deadly and finish blocks are gameplay triggers, not surfaces.
    pub fn is_solid_surface(&self) -> bool {
        !matches!(self.kind, BlockType::Deadly | BlockType::Finish)
    }
}
