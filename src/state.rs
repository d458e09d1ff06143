//! Per-cell simulation state and its double-buffered storage.
//!
//! The simulation is a fixed `N x N` grid. Every cell owns one particle and
//! four state fields:
//!
//! | Field | Type | GPU texel |
//! |-------|------|-----------|
//! | position | [`PositionCell`] | `(x, y, z, flag)` |
//! | velocity | `Vec3` | `(x, y, z, 0)` |
//! | color | `Vec3` | `(r, g, b, 0)` |
//! | lifecycle | [`LifecycleCell`] | `(age, max_age, respawn, 0)` |
//!
//! The packed texel form only exists at the GPU boundary; on the CPU the
//! discard flag and respawn bit are real types.

use glam::{UVec2, Vec2, Vec3};

/// Auxiliary per-position flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuxFlag {
    #[default]
    None,
    /// The last respawn landed on rejected depth; the particle is not drawn.
    InvalidDepth,
}

impl AuxFlag {
    pub fn to_f32(self) -> f32 {
        match self {
            AuxFlag::None => 0.0,
            AuxFlag::InvalidDepth => 1.0,
        }
    }

    pub fn from_f32(v: f32) -> Self {
        if v > 0.5 {
            AuxFlag::InvalidDepth
        } else {
            AuxFlag::None
        }
    }
}

/// Particle position plus its validity flag.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PositionCell {
    pub position: Vec3,
    pub flag: AuxFlag,
}

impl PositionCell {
    /// A slot nothing has been unprojected into yet.
    pub fn unseeded() -> Self {
        Self {
            position: Vec3::ZERO,
            flag: AuxFlag::InvalidDepth,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.flag == AuxFlag::None
    }
}

/// Age bookkeeping of one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LifecycleCell {
    pub age: f32,
    pub max_age: f32,
    /// Re-seed this cell in the current tick.
    pub respawn: bool,
}

impl LifecycleCell {
    /// Initial state: everything flagged for respawn.
    pub fn spawning() -> Self {
        Self {
            age: 0.0,
            max_age: 0.0,
            respawn: true,
        }
    }

    /// Remaining fraction of life, `(max_age - age) / max_age`.
    pub fn remaining(&self) -> f32 {
        if self.max_age > 0.0 {
            (self.max_age - self.age) / self.max_age
        } else {
            0.0
        }
    }
}

/// Conversion to and from the four-channel GPU layout.
pub trait Texel: Sized {
    fn to_texel(&self) -> [f32; 4];
    fn from_texel(t: [f32; 4]) -> Self;
}

impl Texel for PositionCell {
    fn to_texel(&self) -> [f32; 4] {
        [self.position.x, self.position.y, self.position.z, self.flag.to_f32()]
    }

    fn from_texel(t: [f32; 4]) -> Self {
        Self {
            position: Vec3::new(t[0], t[1], t[2]),
            flag: AuxFlag::from_f32(t[3]),
        }
    }
}

impl Texel for LifecycleCell {
    fn to_texel(&self) -> [f32; 4] {
        [self.age, self.max_age, if self.respawn { 1.0 } else { 0.0 }, 0.0]
    }

    fn from_texel(t: [f32; 4]) -> Self {
        Self {
            age: t[0],
            max_age: t[1],
            respawn: t[2] > 0.5,
        }
    }
}

impl Texel for Vec3 {
    fn to_texel(&self) -> [f32; 4] {
        [self.x, self.y, self.z, 0.0]
    }

    fn from_texel(t: [f32; 4]) -> Self {
        Vec3::new(t[0], t[1], t[2])
    }
}

/// Pack a whole field for upload.
pub fn pack<T: Texel>(cells: &[T]) -> Vec<[f32; 4]> {
    cells.iter().map(Texel::to_texel).collect()
}

/// Previous and next generation of one field.
///
/// Passes read `current` and write `next`; [`swap`](Self::swap) at the tick
/// boundary promotes `next`.
#[derive(Clone, Debug)]
pub struct DoubleBuffer<T> {
    current: Vec<T>,
    next: Vec<T>,
}

impl<T: Clone> DoubleBuffer<T> {
    pub fn new(len: usize, init: T) -> Self {
        Self {
            current: vec![init.clone(); len],
            next: vec![init; len],
        }
    }
}

impl<T> DoubleBuffer<T> {
    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn current(&self) -> &[T] {
        &self.current
    }

    /// Generation being written this tick.
    pub fn next(&self) -> &[T] {
        &self.next
    }

    /// Read the previous generation while writing the next one.
    pub fn split(&mut self) -> (&[T], &mut [T]) {
        (&self.current, &mut self.next)
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }
}

/// Fixed square grid of cells, indexed row-major.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grid {
    size: u32,
}

impl Grid {
    pub const MIN_SIZE: u32 = 2;
    pub const MAX_SIZE: u32 = 4096;

    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn cell_count(&self) -> usize {
        self.size as usize * self.size as usize
    }

    pub fn coord(&self, index: usize) -> UVec2 {
        let n = self.size as usize;
        UVec2::new((index % n) as u32, (index / n) as u32)
    }

    pub fn index(&self, cell: UVec2) -> usize {
        cell.y as usize * self.size as usize + cell.x as usize
    }

    /// Cell UV spanning `[0, 1]` inclusive: `i / (N - 1)`.
    pub fn uv(&self, cell: UVec2) -> Vec2 {
        let denom = self.size.saturating_sub(1).max(1) as f32;
        cell.as_vec2() / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_texel() {
        let cell = PositionCell {
            position: Vec3::new(1.0, 2.0, -3.0),
            flag: AuxFlag::InvalidDepth,
        };
        assert_eq!(cell.to_texel(), [1.0, 2.0, -3.0, 1.0]);
        assert_eq!(PositionCell::from_texel(cell.to_texel()), cell);
    }

    #[test]
    fn test_lifecycle_texel() {
        let cell = LifecycleCell {
            age: 0.25,
            max_age: 1.5,
            respawn: true,
        };
        assert_eq!(cell.to_texel(), [0.25, 1.5, 1.0, 0.0]);
        assert_eq!(LifecycleCell::from_texel(cell.to_texel()), cell);
    }

    #[test]
    fn test_remaining() {
        let cell = LifecycleCell {
            age: 0.5,
            max_age: 2.0,
            respawn: false,
        };
        assert_eq!(cell.remaining(), 0.75);
        assert_eq!(LifecycleCell::spawning().remaining(), 0.0);
    }

    #[test]
    fn test_double_buffer_swap() {
        let mut buf = DoubleBuffer::new(3, 0u32);
        {
            let (prev, next) = buf.split();
            for (n, p) in next.iter_mut().zip(prev) {
                *n = p + 7;
            }
        }
        assert_eq!(buf.current(), &[0, 0, 0]);
        buf.swap();
        assert_eq!(buf.current(), &[7, 7, 7]);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_grid_coords() {
        let grid = Grid::new(4);
        assert_eq!(grid.cell_count(), 16);
        assert_eq!(grid.coord(6), UVec2::new(2, 1));
        assert_eq!(grid.index(UVec2::new(2, 1)), 6);
        assert_eq!(grid.uv(UVec2::new(0, 0)), Vec2::ZERO);
        assert_eq!(grid.uv(UVec2::new(3, 3)), Vec2::ONE);
    }
}
