//! Tile-shaped binary masks and axis-aligned bounds.

use std::collections::VecDeque;

use image::{GrayImage, Luma};

/// Axis-aligned pixel bounds `[x, x + width) × [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Geometric center in pixel-center coordinates.
    pub fn center(&self) -> [f64; 2] {
        [
            self.x as f64 + (self.width as f64 - 1.0) * 0.5,
            self.y as f64 + (self.height as f64 - 1.0) * 0.5,
        ]
    }

    /// `true` when the box starts at the tile origin `(0, 0)`.
    pub fn touches_origin(&self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// `true` for a zero-width or zero-height box.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }
}

/// Raster-shaped boolean buffer (row-major).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    /// All-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Filled disk of the given radius, clipped to the raster.
    pub fn disk(width: u32, height: u32, center: [f64; 2], radius: f64) -> Self {
        let r2 = radius * radius;
        Self::from_fn(width, height, |x, y| {
            let dx = x as f64 - center[0];
            let dy = y as f64 - center[1];
            dx * dx + dy * dy <= r2
        })
    }

    /// Filled rectangle, clipped to the raster.
    pub fn rectangle(width: u32, height: u32, rect: BoundingBox) -> Self {
        Self::from_fn(width, height, |x, y| rect.contains(x, y))
    }

    /// Filled ellipse inscribed in `rect`, clipped to the raster.
    pub fn oval(width: u32, height: u32, rect: BoundingBox) -> Self {
        if rect.is_degenerate() {
            return Self::new(width, height);
        }
        let rx = rect.width as f64 * 0.5;
        let ry = rect.height as f64 * 0.5;
        let cx = rect.x as f64 + rx;
        let cy = rect.y as f64 + ry;
        Self::from_fn(width, height, |x, y| {
            let nx = (x as f64 + 0.5 - cx) / rx;
            let ny = (y as f64 + 0.5 - cy) / ry;
            nx * nx + ny * ny <= 1.0
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[self.index(x, y)]
    }

    /// Signed lookup; anything outside the raster is background.
    #[inline]
    pub fn get_signed(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        self.get(x as u32, y as u32)
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> u64 {
        self.data.iter().filter(|&&v| v).count() as u64
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Foreground pixel coordinates in row-major order.
    pub fn iter_foreground(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let w = self.width as usize;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v)
            .map(move |(i, _)| ((i % w) as u32, (i / w) as u32))
    }

    /// Tight bounds of the foreground, `None` when the mask is empty.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut any = false;
        for (x, y) in self.iter_foreground() {
            any = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        any.then(|| BoundingBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Fill enclosed background: any background pixel that is not 4-connected
    /// to the raster border becomes foreground.
    pub fn fill_holes(&mut self) {
        let (w, h) = (self.width as usize, self.height as usize);
        if w == 0 || h == 0 {
            return;
        }
        let mut outside = vec![false; w * h];
        let mut queue = VecDeque::new();
        let seed = |idx: usize, outside: &mut Vec<bool>, queue: &mut VecDeque<usize>| {
            if !self.data[idx] && !outside[idx] {
                outside[idx] = true;
                queue.push_back(idx);
            }
        };
        for x in 0..w {
            seed(x, &mut outside, &mut queue);
            seed((h - 1) * w + x, &mut outside, &mut queue);
        }
        for y in 0..h {
            seed(y * w, &mut outside, &mut queue);
            seed(y * w + w - 1, &mut outside, &mut queue);
        }

        while let Some(idx) = queue.pop_front() {
            let x = idx % w;
            let y = idx / w;
            let mut visit = |n: usize| {
                if !self.data[n] && !outside[n] {
                    outside[n] = true;
                    queue.push_back(n);
                }
            };
            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < w {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - w);
            }
            if y + 1 < h {
                visit(idx + w);
            }
        }

        for (v, &o) in self.data.iter_mut().zip(outside.iter()) {
            if !o {
                *v = true;
            }
        }
    }

    /// Paste `self` into a `width × height` frame with its origin at `offset`.
    pub fn translated(&self, width: u32, height: u32, offset: [u32; 2]) -> Self {
        let mut out = Self::new(width, height);
        for (x, y) in self.iter_foreground() {
            let tx = x + offset[0];
            let ty = y + offset[1];
            if tx < width && ty < height {
                out.set(tx, ty, true);
            }
        }
        out
    }

    /// 255 for foreground, 0 for background.
    pub fn to_gray(&self) -> GrayImage {
        let mut img = GrayImage::new(self.width, self.height);
        for (x, y) in self.iter_foreground() {
            img.put_pixel(x, y, Luma([255]));
        }
        img
    }
}
