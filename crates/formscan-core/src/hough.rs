//! Progressive probabilistic Hough transform for line segments.
//!
//! Foreground pixels are visited in a seeded random order. Each pixel votes
//! into a (theta, rho) accumulator; as soon as a cell reaches the vote
//! threshold the corridor along that line is walked in both directions from
//! the pixel, tolerating gaps of up to `max_line_gap`. Segments at least
//! `min_line_length` long are emitted and their pixels withdraw their votes,
//! so each stroke is reported once. Shorter runs are only removed from the
//! candidate mask.

use std::f64::consts::PI;

use image::GrayImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Fixed-point precision used when stepping along a line.
const SHIFT: u32 = 16;

/// A line segment in pixel space, tagged with the 0-based page it was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub page_index: usize,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            page_index: 0,
        }
    }

    pub fn on_page(mut self, page_index: usize) -> Self {
        self.page_index = page_index;
        self
    }

    pub fn min_x(&self) -> i32 {
        self.x1.min(self.x2)
    }

    pub fn max_x(&self) -> i32 {
        self.x1.max(self.x2)
    }

    /// Horizontal extent in pixels.
    pub fn span_x(&self) -> i32 {
        (self.x2 - self.x1).abs()
    }

    /// Vertical drift between the endpoints in pixels.
    pub fn span_y(&self) -> i32 {
        (self.y2 - self.y1).abs()
    }

    pub fn mid_y(&self) -> f64 {
        (self.y1 as f64 + self.y2 as f64) / 2.0
    }
}

/// Parameters of the probabilistic transform, all in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct HoughParams {
    /// Minimum accumulator votes for a line hypothesis.
    pub threshold: u32,
    /// Shortest segment that is reported.
    pub min_line_length: u32,
    /// Largest run of background pixels bridged inside one segment.
    pub max_line_gap: u32,
    /// Number of angle bins over `[0, pi)`.
    pub angle_steps: u32,
    /// Pixels with intensity `>= foreground` take part in voting.
    pub foreground: u8,
    /// Seed for the pixel visiting order.
    pub seed: u64,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            threshold: 150,
            min_line_length: 300,
            max_line_gap: 20,
            angle_steps: 180,
            foreground: 128,
            seed: 0,
        }
    }
}

struct Accumulator {
    trig: Vec<(f64, f64)>,
    num_rho: usize,
    offset: i64,
    cells: Vec<i32>,
}

impl Accumulator {
    fn new(width: i64, height: i64, angle_steps: usize) -> Self {
        let num_rho = ((width + height) * 2 + 1) as usize;
        let trig = (0..angle_steps)
            .map(|n| {
                let theta = n as f64 * PI / angle_steps as f64;
                (theta.cos(), theta.sin())
            })
            .collect();
        Self {
            trig,
            num_rho,
            offset: ((num_rho - 1) / 2) as i64,
            cells: vec![0; angle_steps * num_rho],
        }
    }

    fn rho_index(&self, n: usize, x: i64, y: i64) -> usize {
        let (c, s) = self.trig[n];
        let r = (x as f64 * c + y as f64 * s).round() as i64 + self.offset;
        n * self.num_rho + r as usize
    }

    /// Add the votes of one pixel; returns the strongest cell it touched.
    fn vote(&mut self, x: i64, y: i64) -> (i32, usize) {
        let mut best = (i32::MIN, 0);
        for n in 0..self.trig.len() {
            let idx = self.rho_index(n, x, y);
            self.cells[idx] += 1;
            if self.cells[idx] > best.0 {
                best = (self.cells[idx], n);
            }
        }
        best
    }

    fn unvote(&mut self, x: i64, y: i64) {
        for n in 0..self.trig.len() {
            let idx = self.rho_index(n, x, y);
            self.cells[idx] -= 1;
        }
    }
}

/// Stepping state along a line direction in 16.16 fixed point on the minor axis.
#[derive(Clone, Copy)]
struct Walker {
    x0: i64,
    y0: i64,
    dx: i64,
    dy: i64,
    major_is_x: bool,
}

impl Walker {
    fn new(x: i64, y: i64, cos: f64, sin: f64) -> Self {
        // Direction along the line is perpendicular to its normal (cos, sin).
        let a = -sin;
        let b = cos;
        let one = (1i64 << SHIFT) as f64;
        if a.abs() > b.abs() {
            Walker {
                x0: x,
                y0: (y << SHIFT) + (1 << (SHIFT - 1)),
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * one / a.abs()).round() as i64,
                major_is_x: true,
            }
        } else {
            Walker {
                x0: (x << SHIFT) + (1 << (SHIFT - 1)),
                y0: y,
                dx: (a * one / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
                major_is_x: false,
            }
        }
    }

    fn pixel(&self, x: i64, y: i64) -> (i64, i64) {
        if self.major_is_x {
            (x, y >> SHIFT)
        } else {
            (x >> SHIFT, y)
        }
    }

    fn step(&self, backwards: bool) -> (i64, i64) {
        if backwards {
            (-self.dx, -self.dy)
        } else {
            (self.dx, self.dy)
        }
    }
}

/// Detect line segments among the foreground pixels of `image`.
///
/// The image is expected light-on-dark (see [`image::imageops::invert`]).
/// Output order follows detection order, which is deterministic for a
/// given `seed`.
pub fn probabilistic_hough(image: &GrayImage, params: &HoughParams) -> Vec<LineSegment> {
    let width = image.width() as i64;
    let height = image.height() as i64;
    if width == 0 || height == 0 || params.angle_steps == 0 {
        return Vec::new();
    }

    let raw = image.as_raw();
    let mut mask = vec![false; raw.len()];
    let mut voted = vec![false; raw.len()];
    let mut points: Vec<(i64, i64)> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            if raw[idx] >= params.foreground {
                mask[idx] = true;
                points.push((x, y));
            }
        }
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    points.shuffle(&mut rng);

    let mut accum = Accumulator::new(width, height, params.angle_steps as usize);
    let threshold = params.threshold as i32;
    let min_len = params.min_line_length as i64;
    let max_gap = params.max_line_gap as i64;
    let in_bounds = |x: i64, y: i64| x >= 0 && x < width && y >= 0 && y < height;

    let mut segments = Vec::new();

    for &(x, y) in &points {
        let idx = (y * width + x) as usize;
        if !mask[idx] {
            continue;
        }

        let (max_val, max_n) = accum.vote(x, y);
        voted[idx] = true;
        if max_val < threshold {
            continue;
        }

        let (cos, sin) = accum.trig[max_n];
        let walker = Walker::new(x, y, cos, sin);

        // Find how far the stroke extends on each side of the seed pixel.
        let mut line_end = [(x, y); 2];
        for (k, end) in line_end.iter_mut().enumerate() {
            let (dx, dy) = walker.step(k == 1);
            let (mut px, mut py) = (walker.x0, walker.y0);
            let mut gap = 0;
            loop {
                let (j, i) = walker.pixel(px, py);
                if !in_bounds(j, i) {
                    break;
                }
                if mask[(i * width + j) as usize] {
                    gap = 0;
                    *end = (j, i);
                } else {
                    gap += 1;
                    if gap > max_gap {
                        break;
                    }
                }
                px += dx;
                py += dy;
            }
        }

        let good_line = (line_end[1].0 - line_end[0].0).abs() >= min_len
            || (line_end[1].1 - line_end[0].1).abs() >= min_len;

        // Walk again, clearing the corridor and withdrawing votes of a kept line.
        for (k, end) in line_end.iter().enumerate() {
            let (dx, dy) = walker.step(k == 1);
            let (mut px, mut py) = (walker.x0, walker.y0);
            loop {
                let (j, i) = walker.pixel(px, py);
                if !in_bounds(j, i) {
                    break;
                }
                let pidx = (i * width + j) as usize;
                if mask[pidx] {
                    if good_line && voted[pidx] {
                        accum.unvote(j, i);
                        voted[pidx] = false;
                    }
                    mask[pidx] = false;
                }
                if (j, i) == *end {
                    break;
                }
                px += dx;
                py += dy;
            }
        }

        if good_line {
            segments.push(LineSegment::new(
                line_end[0].0 as i32,
                line_end[0].1 as i32,
                line_end[1].0 as i32,
                line_end[1].1 as i32,
            ));
        }
    }

    segments
}
