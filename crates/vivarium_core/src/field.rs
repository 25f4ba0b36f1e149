//! Shared scalar fields: pheromone trails, moisture, anything agents read
//! and write to coordinate indirectly.
//!
//! The only dynamics are multiplicative decay and point deposition. There is
//! no neighbour averaging.

use serde::{Deserialize, Serialize};

/// Dense grid of `f32` cells covering `width * cell_size` by
/// `height * cell_size` world units. Cell values stay within `[0, cap]`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScalarField {
    cells: Vec<f32>,
    width: usize,
    height: usize,
    cell_size: f32,
    /// Per-tick decay multiplier
    pub decay: f32,
    pub cap: f32,
    /// Values below this snap to zero after decay
    pub threshold: f32,
}

impl ScalarField {
    #[must_use]
    pub fn new(width: usize, height: usize, cell_size: f32, decay: f32, cap: f32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            cells: vec![0.0; width * height],
            width,
            height,
            cell_size: cell_size.max(f32::EPSILON),
            decay: decay.clamp(0.0, 1.0),
            cap: cap.max(0.0),
            threshold: 0.0,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.max(0.0);
        self
    }

    #[inline(always)]
    fn index(&self, ix: usize, iy: usize) -> usize {
        iy * self.width + ix
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell containing a world position, `None` outside the grid.
    #[must_use]
    pub fn cell_of(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return None;
        }
        let ix = (x / self.cell_size) as usize;
        let iy = (y / self.cell_size) as usize;
        (ix < self.width && iy < self.height).then_some((ix, iy))
    }

    /// Adds `amount` to the cell nearest `(x, y)`. Off-grid deposits are ignored.
    pub fn deposit(&mut self, x: f32, y: f32, amount: f32) {
        if let Some((ix, iy)) = self.cell_of(x, y) {
            self.deposit_cell(ix, iy, amount);
        }
    }

    pub fn deposit_cell(&mut self, ix: usize, iy: usize, amount: f32) {
        if ix >= self.width || iy >= self.height || !amount.is_finite() {
            return;
        }
        let cap = self.cap;
        let idx = self.index(ix, iy);
        let cell = &mut self.cells[idx];
        *cell = (*cell + amount).clamp(0.0, cap);
    }

    /// Deposits into every cell whose center lies within `radius` of `(x, y)`.
    pub fn deposit_radius(&mut self, x: f32, y: f32, radius: f32, amount: f32) {
        if !radius.is_finite() || radius < 0.0 {
            return;
        }
        let cs = self.cell_size;
        let min_x = ((x - radius) / cs).floor().max(0.0) as usize;
        let min_y = ((y - radius) / cs).floor().max(0.0) as usize;
        let max_x = (((x + radius) / cs).ceil().max(0.0) as usize).min(self.width);
        let max_y = (((y + radius) / cs).ceil().max(0.0) as usize).min(self.height);
        let r2 = radius * radius;
        for iy in min_y..max_y {
            for ix in min_x..max_x {
                let cx = (ix as f32 + 0.5) * cs - x;
                let cy = (iy as f32 + 0.5) * cs - y;
                if cx * cx + cy * cy <= r2 {
                    self.deposit_cell(ix, iy, amount);
                }
            }
        }
    }

    /// One tick of decay.
    pub fn decay(&mut self) {
        let rate = self.decay;
        let threshold = self.threshold;
        for cell in &mut self.cells {
            *cell *= rate;
            if *cell < threshold {
                *cell = 0.0;
            }
        }
    }

    #[must_use]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        self.cell_of(x, y).map_or(0.0, |(ix, iy)| self.get(ix, iy))
    }

    #[must_use]
    pub fn get(&self, ix: usize, iy: usize) -> f32 {
        if ix >= self.width || iy >= self.height {
            return 0.0;
        }
        self.cells[self.index(ix, iy)]
    }

    pub fn fill(&mut self, value: f32) {
        let v = if value.is_finite() {
            value.clamp(0.0, self.cap)
        } else {
            0.0
        };
        self.cells.iter_mut().for_each(|c| *c = v);
    }

    #[must_use]
    pub fn mean(&self) -> f32 {
        self.cells.iter().sum::<f32>() / self.cells.len() as f32
    }

    #[must_use]
    pub fn max_value(&self) -> f32 {
        self.cells.iter().copied().fold(0.0, f32::max)
    }

    /// Non-zero cells as `(ix, iy, value)`.
    pub fn active_cells(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.0)
            .map(move |(i, v)| (i % self.width, i / self.width, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_clamps_to_cap() {
        let mut field = ScalarField::new(10, 10, 1.0, 0.99, 1.0);
        field.deposit(5.5, 5.5, 0.7);
        field.deposit(5.5, 5.5, 0.7);
        assert_eq!(field.get(5, 5), 1.0);
        field.deposit(5.5, 5.5, -3.0);
        assert_eq!(field.get(5, 5), 0.0);
    }

    #[test]
    fn test_decay_and_threshold() {
        let mut field = ScalarField::new(4, 4, 1.0, 0.5, 1.0).with_threshold(0.2);
        field.deposit_cell(1, 1, 1.0);
        field.decay();
        assert_eq!(field.get(1, 1), 0.5);
        field.decay();
        assert_eq!(field.get(1, 1), 0.25);
        field.decay();
        assert_eq!(field.get(1, 1), 0.0);
    }

    #[test]
    fn test_off_grid_is_ignored() {
        let mut field = ScalarField::new(4, 4, 10.0, 0.9, 1.0);
        field.deposit(-1.0, 5.0, 1.0);
        field.deposit(40.0, 5.0, 1.0);
        field.deposit(f32::NAN, 5.0, 1.0);
        assert_eq!(field.max_value(), 0.0);
        assert_eq!(field.sample(1000.0, 1000.0), 0.0);
    }

    #[test]
    fn test_deposit_radius_covers_disc() {
        let mut field = ScalarField::new(20, 20, 10.0, 1.0, 1.0);
        field.deposit_radius(100.0, 100.0, 60.0, 0.1);
        assert!((field.sample(100.0, 100.0) - 0.1).abs() < 1e-6);
        assert!((field.sample(150.0, 100.0) - 0.1).abs() < 1e-6);
        assert_eq!(field.sample(170.0, 170.0), 0.0);
        assert!(field.active_cells().all(|(ix, iy, _)| ix < 20 && iy < 20));
    }
}
