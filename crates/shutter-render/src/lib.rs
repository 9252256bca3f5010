//! Draw primitives and the render/cache contract for Shutter.
//!
//! The evaluation engine emits a paint-ordered list of primitives, each keyed
//! by a content hash. A [`RenderCache`] implementation keeps GPU-ready
//! geometry/atlas entries for unchanged content and regenerates only what
//! changed. GPU command encoding itself is out of scope for this crate.

use std::hash::{Hash, Hasher};

/// Straight-alpha color; hashed through the bit patterns of its channels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.r.to_bits().hash(state);
        self.g.to_bits().hash(state);
        self.b.to_bits().hash(state);
        self.a.to_bits().hash(state);
    }
}

/// One shaped glyph within a text run, positioned relative to the run origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphPlacement {
    pub glyph_id: u16,
    pub x: f32,
    pub y: f32,
}

impl Hash for GlyphPlacement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.glyph_id.hash(state);
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
    }
}

/// A draw primitive positioned relative to its owning layout rectangle.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawPrimitive {
    /// Filled rounded rectangle covering the owning node's rect.
    FilledRect { corner_radius: f32, color: Color },
    /// Pre-tessellated geometry (filled or stroked shapes).
    Tessellated {
        vertices: Vec<[f32; 2]>,
        indices: Vec<u32>,
        color: Color,
    },
    /// A run of shaped glyph placements.
    TextRun {
        glyphs: Vec<GlyphPlacement>,
        size_px: f32,
        color: Color,
    },
}

impl Hash for DrawPrimitive {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            DrawPrimitive::FilledRect {
                corner_radius,
                color,
            } => {
                0u8.hash(state);
                corner_radius.to_bits().hash(state);
                color.hash(state);
            }
            DrawPrimitive::Tessellated {
                vertices,
                indices,
                color,
            } => {
                1u8.hash(state);
                for vertex in vertices {
                    vertex[0].to_bits().hash(state);
                    vertex[1].to_bits().hash(state);
                }
                indices.hash(state);
                color.hash(state);
            }
            DrawPrimitive::TextRun {
                glyphs,
                size_px,
                color,
            } => {
                2u8.hash(state);
                glyphs.hash(state);
                size_px.to_bits().hash(state);
                color.hash(state);
            }
        }
    }
}

/// Stable identity for one primitive's content across frames.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct ContentHash(pub u64);

pub fn content_hash(primitive: &DrawPrimitive) -> ContentHash {
    let mut hasher = ahash::AHasher::default();
    primitive.hash(&mut hasher);
    ContentHash(hasher.finish())
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CacheOutcome {
    /// Content was already resident; nothing regenerated.
    Hit,
    /// Content was tessellated/shaped anew and uploaded.
    Regenerated,
}

/// Cache-friendly rendering backend contract.
///
/// Implementations own their GPU artifacts; callers only observe whether a
/// given content key was already resident.
pub trait RenderCache {
    fn resolve(&mut self, hash: ContentHash, primitive: &DrawPrimitive) -> CacheOutcome;
}

struct PreparedGeometry {
    #[allow(dead_code)]
    vertex_count: usize,
}

/// In-memory [`RenderCache`] used by tests; counts hits and regenerations.
#[derive(Default)]
pub struct MemoryRenderCache {
    entries: std::collections::HashMap<ContentHash, PreparedGeometry>,
    hits: usize,
    regenerated: usize,
}

impl MemoryRenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn regenerated(&self) -> usize {
        self.regenerated
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RenderCache for MemoryRenderCache {
    fn resolve(&mut self, hash: ContentHash, primitive: &DrawPrimitive) -> CacheOutcome {
        if self.entries.contains_key(&hash) {
            self.hits += 1;
            return CacheOutcome::Hit;
        }
        let vertex_count = match primitive {
            DrawPrimitive::FilledRect { .. } => 4,
            DrawPrimitive::Tessellated { vertices, .. } => vertices.len(),
            DrawPrimitive::TextRun { glyphs, .. } => glyphs.len() * 4,
        };
        log::trace!("regenerating {hash:?} ({vertex_count} vertices)");
        self.entries.insert(hash, PreparedGeometry { vertex_count });
        self.regenerated += 1;
        CacheOutcome::Regenerated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_content_hashes_equal() {
        let a = DrawPrimitive::FilledRect {
            corner_radius: 4.0,
            color: Color::WHITE,
        };
        let b = DrawPrimitive::FilledRect {
            corner_radius: 4.0,
            color: Color::WHITE,
        };
        assert_eq!(content_hash(&a), content_hash(&b));

        let c = DrawPrimitive::FilledRect {
            corner_radius: 5.0,
            color: Color::WHITE,
        };
        assert_ne!(content_hash(&a), content_hash(&c));
    }

    #[test]
    fn cache_regenerates_once_per_content() {
        let mut cache = MemoryRenderCache::new();
        let prim = DrawPrimitive::TextRun {
            glyphs: vec![GlyphPlacement {
                glyph_id: 7,
                x: 0.0,
                y: 12.0,
            }],
            size_px: 14.0,
            color: Color::BLACK,
        };
        let hash = content_hash(&prim);
        assert_eq!(cache.resolve(hash, &prim), CacheOutcome::Regenerated);
        assert_eq!(cache.resolve(hash, &prim), CacheOutcome::Hit);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.regenerated(), 1);
        assert_eq!(cache.hits(), 1);
    }
}
