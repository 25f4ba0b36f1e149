use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Ground {
    Air,
    Dirt,
}

/// Height of the undisturbed surface at column `x`.
#[must_use]
pub fn ground_level(x: i32) -> f32 {
    let x = x as f32;
    80.0 + (x * 0.02).sin() * 12.0 + (x * 0.07).sin() * 4.0
}

/// Side view of the farm, one cell per grid unit, row-major with y down.
#[derive(Debug, Clone, PartialEq)]
pub struct Terrain {
    width: i32,
    height: i32,
    cells: Vec<Ground>,
}

impl Terrain {
    /// Air above the rolling surface, dirt below it.
    #[must_use]
    pub fn generate(width: u16, height: u16) -> Self {
        let (width, height) = (i32::from(width), i32::from(height));
        let mut cells = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(if (y as f32) < ground_level(x) {
                    Ground::Air
                } else {
                    Ground::Dirt
                });
            }
        }
        Self { width, height, cells }
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<Ground> {
        self.is_valid(x, y).then(|| self.cells[self.index(x, y)])
    }

    #[must_use]
    pub fn is_air(&self, x: i32, y: i32) -> bool {
        self.get(x, y) == Some(Ground::Air)
    }

    #[must_use]
    pub fn is_dirt(&self, x: i32, y: i32) -> bool {
        self.get(x, y) == Some(Ground::Dirt)
    }

    /// Writes a cell; out-of-range writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, ground: Ground) {
        if self.is_valid(x, y) {
            let i = self.index(x, y);
            self.cells[i] = ground;
        }
    }

    /// Clears the square of half-width `r` around a point.
    pub fn excavate(&mut self, cx: i32, cy: i32, r: i32) {
        for dy in -r..=r {
            for dx in -r..=r {
                self.set(cx + dx, cy + dy, Ground::Air);
            }
        }
    }

    /// First row of dirt in column `x`, or the bottom row when it is all air.
    #[must_use]
    pub fn surface(&self, x: i32) -> i32 {
        (0..self.height).find(|&y| self.is_dirt(x, y)).unwrap_or(self.height)
    }

    #[must_use]
    pub fn dirt_cells(&self) -> usize {
        self.cells.iter().filter(|g| **g == Ground::Dirt).count()
    }

    /// Horizontal runs of one ground type in row `y`, as `(x_start, length)`.
    pub fn runs(&self, y: i32, ground: Ground) -> Vec<(i32, i32)> {
        let mut runs = Vec::new();
        let mut start = None;
        for x in 0..=self.width {
            let here = x < self.width && self.get(x, y) == Some(ground);
            match (here, start) {
                (true, None) => start = Some(x),
                (false, Some(s)) => {
                    runs.push((s, x - s));
                    start = None;
                }
                _ => {}
            }
        }
        runs
    }
}
