//! Midpoint circle rasterization as one continuous walk.
//!
//! The walk starts at the bottom point `(cx, cy + r)` (image rows grow
//! downwards) and runs counter-clockwise as seen on screen. Each octant
//! contributes the same number of points, so the sequence has
//! `8 * octant_size(r)` entries; the points where octants meet appear twice.

/// First-octant offsets `(x, y)` with `0 <= x <= y`, starting at `(0, r)`.
pub fn octant(radius: u32) -> Vec<(i32, i32)> {
    let r = radius as i32;
    let mut pts = Vec::with_capacity(radius as usize + 1);
    let mut x = 0i32;
    let mut y = r;
    let mut d = 1 - r;
    while x <= y {
        pts.push((x, y));
        if d < 0 {
            d += 2 * x + 3;
        } else {
            d += 2 * (x - y) + 5;
            y -= 1;
        }
        x += 1;
    }
    pts
}

pub fn octant_size(radius: u32) -> usize {
    octant(radius).len()
}

/// Ring pixel offsets from the center, in walk order.
pub fn ring_offsets(radius: u32) -> Vec<[i32; 2]> {
    let oct = octant(radius);
    let mut out = Vec::with_capacity(oct.len() * 8);
    out.extend(oct.iter().map(|&(x, y)| [x, y]));
    out.extend(oct.iter().rev().map(|&(x, y)| [y, x]));
    out.extend(oct.iter().map(|&(x, y)| [y, -x]));
    out.extend(oct.iter().rev().map(|&(x, y)| [x, -y]));
    out.extend(oct.iter().map(|&(x, y)| [-x, -y]));
    out.extend(oct.iter().rev().map(|&(x, y)| [-y, -x]));
    out.extend(oct.iter().map(|&(x, y)| [-y, x]));
    out.extend(oct.iter().rev().map(|&(x, y)| [-x, y]));
    out
}

/// Ring pixels around `center`, in walk order.
pub fn ring_points(center: [i32; 2], radius: u32) -> Vec<[i32; 2]> {
    ring_offsets(radius)
        .into_iter()
        .map(|[dx, dy]| [center[0] + dx, center[1] + dy])
        .collect()
}

/// Distinct ring offsets, for voting.
pub fn unique_ring_offsets(radius: u32) -> Vec<[i32; 2]> {
    let mut offs = ring_offsets(radius);
    offs.sort_unstable();
    offs.dedup();
    offs
}
