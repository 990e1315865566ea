//! CPU face of the step program
//!
//! A step program computes the next value of every cell independently from
//! the frozen current buffer. The GPU runs the same logic as a WGSL compute
//! shader (`gpu_step`); this CPU form is the reference implementation the
//! tests exercise and the contract both faces must satisfy: pure per-cell,
//! no cross-cell write ordering, total over every coordinate.

/// How out-of-range neighbor reads resolve. Must be total: every coordinate,
/// including corners, maps to some in-range cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// Saturate to the nearest edge cell.
    Clamp,
    /// Mirror across the edge.
    Reflect,
    /// Wrap to the opposite edge (torus).
    Wrap,
}

impl BoundaryPolicy {
    /// Resolve one axis coordinate into `0..len`.
    pub fn resolve(self, coord: i64, len: u32) -> u32 {
        let len = len as i64;
        let c = match self {
            BoundaryPolicy::Clamp => coord.clamp(0, len - 1),
            BoundaryPolicy::Reflect => {
                let mirrored = if coord < 0 { -coord - 1 } else { coord };
                let mirrored = if mirrored >= len {
                    2 * len - mirrored - 1
                } else {
                    mirrored
                };
                // A grid this small cannot mirror cleanly; saturate.
                mirrored.clamp(0, len - 1)
            }
            BoundaryPolicy::Wrap => coord.rem_euclid(len),
        };
        c as u32
    }
}

/// Row-major cell storage with a fixed width and height.
#[derive(Clone)]
pub struct Grid<C> {
    width: u32,
    height: u32,
    cells: Vec<C>,
}

impl<C: Copy> Grid<C> {
    pub fn filled(width: u32, height: u32, value: C) -> Self {
        Self {
            width,
            height,
            cells: vec![value; (width * height) as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> C) -> Self {
        let mut cells = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> C {
        self.cells[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: C) {
        self.cells[(y * self.width + x) as usize] = value;
    }

    /// Neighbor read with a boundary policy; defined for any coordinate.
    pub fn sample(&self, x: i64, y: i64, policy: BoundaryPolicy) -> C {
        let x = policy.resolve(x, self.width);
        let y = policy.resolve(y, self.height);
        self.get(x, y)
    }

    /// Neighbor read that yields `outside` beyond the grid instead of
    /// resolving. Used where the border is semantically empty (a dead rim
    /// around a life grid) rather than clamped or wrapped.
    pub fn sample_or(&self, x: i64, y: i64, outside: C) -> C {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            outside
        } else {
            self.get(x as u32, y as u32)
        }
    }

    pub fn cells(&self) -> &[C] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [C] {
        &mut self.cells
    }
}

/// Per-cell update kernel. Implementations must be pure in the sense that
/// `next_cell` reads only the frozen `current` grid and its own parameter
/// fields; it must never depend on other cells' next values.
pub trait CellKernel {
    type Cell: Copy;

    fn next_cell(&self, x: u32, y: u32, current: &Grid<Self::Cell>, dt: f32) -> Self::Cell;
}

/// Run one full step: every output cell is written exactly once, so the
/// full-coverage requirement holds by construction.
pub fn step_grid<K: CellKernel>(
    kernel: &K,
    current: &Grid<K::Cell>,
    next: &mut Grid<K::Cell>,
    dt: f32,
) {
    debug_assert_eq!(current.width(), next.width());
    debug_assert_eq!(current.height(), next.height());
    for y in 0..current.height() {
        for x in 0..current.width() {
            next.set(x, y, kernel.next_cell(x, y, current, dt));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SumNeighbours {
        policy: BoundaryPolicy,
    }

    impl CellKernel for SumNeighbours {
        type Cell = f32;

        fn next_cell(&self, x: u32, y: u32, current: &Grid<f32>, _dt: f32) -> f32 {
            let mut sum = 0.0;
            for dy in -1..=1i64 {
                for dx in -1..=1i64 {
                    sum += current.sample(x as i64 + dx, y as i64 + dy, self.policy);
                }
            }
            sum
        }
    }

    #[test]
    fn step_writes_every_cell() {
        let kernel = SumNeighbours {
            policy: BoundaryPolicy::Clamp,
        };
        let current = Grid::filled(7, 5, 1.0f32);
        let mut next = Grid::filled(7, 5, f32::NAN);
        step_grid(&kernel, &current, &mut next, 0.0);
        assert!(next.cells().iter().all(|c| c.is_finite()));
        // Interior cells see nine ones.
        assert_eq!(next.get(3, 2), 9.0);
    }

    #[test]
    fn boundary_policies_are_total_on_borders_and_corners() {
        for policy in [
            BoundaryPolicy::Clamp,
            BoundaryPolicy::Reflect,
            BoundaryPolicy::Wrap,
        ] {
            let kernel = SumNeighbours { policy };
            let n = 6u32;
            let current = Grid::from_fn(n, n, |x, y| (x + y) as f32);
            let mut next = Grid::filled(n, n, f32::NAN);
            step_grid(&kernel, &current, &mut next, 0.0);
            for y in 0..n {
                for x in 0..n {
                    let on_border = x == 0 || y == 0 || x == n - 1 || y == n - 1;
                    if on_border {
                        assert!(
                            next.get(x, y).is_finite(),
                            "{policy:?} left ({x},{y}) undefined"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn resolve_wrap_and_reflect() {
        assert_eq!(BoundaryPolicy::Wrap.resolve(-1, 8), 7);
        assert_eq!(BoundaryPolicy::Wrap.resolve(8, 8), 0);
        assert_eq!(BoundaryPolicy::Reflect.resolve(-1, 8), 0);
        assert_eq!(BoundaryPolicy::Reflect.resolve(-2, 8), 1);
        assert_eq!(BoundaryPolicy::Reflect.resolve(8, 8), 7);
        assert_eq!(BoundaryPolicy::Clamp.resolve(-5, 8), 0);
        assert_eq!(BoundaryPolicy::Clamp.resolve(12, 8), 7);
    }

    #[test]
    fn sample_or_returns_outside_value() {
        let grid = Grid::filled(3, 3, 1.0f32);
        assert_eq!(grid.sample_or(-1, 0, 0.0), 0.0);
        assert_eq!(grid.sample_or(3, 3, 0.0), 0.0);
        assert_eq!(grid.sample_or(1, 1, 0.0), 1.0);
    }
}
