//! Polygon rasterization and COCO run-length encoding
//!
//! Polygons are snapped to the pixel grid, filled into a dense row-major mask
//! and then encoded as column-major RLE, the layout COCO uses for `area` and
//! `bbox` derivation.

/// A polygon vertex snapped to the pixel grid of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: u32,
    pub y: u32,
}

/// Round every point to the nearest integer (ties to even) and clamp it to
/// `[0, width-1] x [0, height-1]`.
///
/// `width` and `height` must be non-zero.
pub fn round_and_clamp(points: &[(f64, f64)], width: u32, height: u32) -> Vec<PixelPoint> {
    let max_x = width.saturating_sub(1) as f64;
    let max_y = height.saturating_sub(1) as f64;
    points
        .iter()
        .map(|&(x, y)| PixelPoint {
            x: x.round_ties_even().clamp(0.0, max_x) as u32,
            y: y.round_ties_even().clamp(0.0, max_y) as u32,
        })
        .collect()
}

/// Flatten a polygon into COCO's `[x1, y1, x2, y2, ...]` layout.
pub fn flatten(polygon: &[PixelPoint]) -> Vec<u32> {
    polygon.iter().flat_map(|p| [p.x, p.y]).collect()
}

/// Dense binary mask, row-major: pixel (x, y) lives at `y * width + x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[self.index(x, y)] != 0
    }

    pub fn set(&mut self, x: u32, y: u32) {
        let i = self.index(x, y);
        self.data[i] = 1;
    }

    /// Number of set pixels.
    pub fn count(&self) -> u64 {
        self.data.iter().filter(|&&v| v != 0).count() as u64
    }
}

/// Column-major run-length encoding of a binary mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rle {
    pub h: u32,
    pub w: u32,
    /// Alternating runs of 0s and 1s, starting with 0s.
    pub counts: Vec<u32>,
}

impl Rle {
    /// Number of foreground pixels (the sum of the odd-indexed runs).
    pub fn area(&self) -> u64 {
        self.counts
            .iter()
            .skip(1)
            .step_by(2)
            .map(|&c| c as u64)
            .sum()
    }

    /// Tight bounding box `[x, y, w, h]` of the foreground pixels, all zeros
    /// when the mask is empty.
    pub fn to_bbox(&self) -> [f64; 4] {
        let h = self.h as usize;
        if h == 0 || self.w == 0 {
            return [0.0; 4];
        }

        let mut xs = self.w as usize;
        let mut xe = 0usize;
        let mut ys = h;
        let mut ye = 0usize;
        let mut has_any = false;

        let mut offset = 0usize;
        for (i, &c) in self.counts.iter().enumerate() {
            let c = c as usize;
            if i % 2 == 1 && c > 0 {
                has_any = true;
                let (x1, y1) = (offset / h, offset % h);
                let end = offset + c - 1;
                let (x2, y2) = (end / h, end % h);

                xs = xs.min(x1);
                xe = xe.max(x2 + 1);
                if x1 != x2 {
                    // run wraps into the next column, so it touches the first and last row
                    ys = 0;
                    ye = h;
                } else {
                    ys = ys.min(y1);
                    ye = ye.max(y2 + 1);
                }
            }
            offset += c;
        }

        if !has_any {
            return [0.0; 4];
        }
        [xs as f64, ys as f64, (xe - xs) as f64, (ye - ys) as f64]
    }

    /// Compressed COCO string form of `counts`.
    ///
    /// Counts past the second are stored as deltas against the count two
    /// places back, each value written in 5-bit groups with a continuation
    /// bit and an ASCII offset of 48.
    pub fn to_compressed_string(&self) -> String {
        let mut s = String::new();
        for (i, &cnt) in self.counts.iter().enumerate() {
            let mut x = cnt as i64;
            if i > 2 {
                x -= self.counts[i - 2] as i64;
            }
            loop {
                let mut c = (x & 0x1f) as u8;
                x >>= 5;
                let more = if c & 0x10 != 0 { x != -1 } else { x != 0 };
                if more {
                    c |= 0x20;
                }
                s.push((c + 48) as char);
                if !more {
                    break;
                }
            }
        }
        s
    }
}

/// Encode a mask as column-major RLE.
pub fn encode(mask: &Mask) -> Rle {
    let mut counts = Vec::new();
    let mut prev = false;
    let mut run = 0u32;

    for x in 0..mask.width {
        for y in 0..mask.height {
            let v = mask.get(x, y);
            if v != prev {
                counts.push(run);
                run = 0;
                prev = v;
            }
            run += 1;
        }
    }
    counts.push(run);

    Rle {
        h: mask.height,
        w: mask.width,
        counts,
    }
}

/// Rasterization and encoding backend used by the converter.
pub trait MaskCodec {
    /// Fill `polygon` into a `height x width` mask.
    fn rasterize(&self, polygon: &[PixelPoint], width: u32, height: u32) -> Mask;

    /// Encode a mask as column-major RLE.
    fn encode(&self, mask: &Mask) -> Rle;
}

/// Scan-line fill using the crossing-number test at integer pixel positions.
///
/// An edge from `(xi, yi)` to `(xj, yj)` crosses row `y` when
/// `yi <= y < yj` or `yj <= y < yi`; a pixel is inside when an odd number of
/// crossings lie strictly to its right. Pixels on the right and bottom
/// boundary of the polygon are therefore left unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanlineCodec;

impl ScanlineCodec {
    fn row_crossings(polygon: &[PixelPoint], y: f64, crossings: &mut Vec<f64>) {
        crossings.clear();
        let mut j = polygon.len() - 1;
        for i in 0..polygon.len() {
            let (xi, yi) = (polygon[i].x as f64, polygon[i].y as f64);
            let (xj, yj) = (polygon[j].x as f64, polygon[j].y as f64);
            if (yi <= y && y < yj) || (yj <= y && y < yi) {
                crossings.push((xj - xi) * (y - yi) / (yj - yi) + xi);
            }
            j = i;
        }
    }
}

impl MaskCodec for ScanlineCodec {
    fn rasterize(&self, polygon: &[PixelPoint], width: u32, height: u32) -> Mask {
        let mut mask = Mask::new(width, height);
        if polygon.len() < 3 || width == 0 || height == 0 {
            return mask;
        }

        let min_x = polygon.iter().map(|p| p.x).min().unwrap_or(0);
        let max_x = polygon.iter().map(|p| p.x).max().unwrap_or(0).min(width - 1);
        let min_y = polygon.iter().map(|p| p.y).min().unwrap_or(0);
        let max_y = polygon.iter().map(|p| p.y).max().unwrap_or(0).min(height - 1);

        let mut crossings = Vec::with_capacity(polygon.len());
        for y in min_y..=max_y {
            Self::row_crossings(polygon, y as f64, &mut crossings);
            if crossings.is_empty() {
                continue;
            }
            for x in min_x..=max_x {
                let right = crossings.iter().filter(|&&c| (x as f64) < c).count();
                if right % 2 == 1 {
                    mask.set(x, y);
                }
            }
        }
        mask
    }

    fn encode(&self, mask: &Mask) -> Rle {
        encode(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(u32, u32)]) -> Vec<PixelPoint> {
        coords.iter().map(|&(x, y)| PixelPoint { x, y }).collect()
    }

    #[test]
    fn test_round_and_clamp() {
        let snapped = round_and_clamp(&[(-5.0, 3.4), (12.7, 2.5), (3.5, 100.0)], 10, 8);
        assert_eq!(snapped, pts(&[(0, 3), (9, 2), (4, 7)]));
    }

    #[test]
    fn test_round_and_clamp_is_idempotent() {
        let once = round_and_clamp(&[(-5.0, 3.6), (11.2, 0.5), (4.5, 9.9)], 10, 10);
        let as_floats: Vec<(f64, f64)> = once.iter().map(|p| (p.x as f64, p.y as f64)).collect();
        assert_eq!(round_and_clamp(&as_floats, 10, 10), once);
    }

    #[test]
    fn test_encode_column_major() {
        // 2 rows x 3 cols, row-major: [0 1 1]
        //                             [0 1 0]
        let mut mask = Mask::new(3, 2);
        mask.set(1, 0);
        mask.set(2, 0);
        mask.set(1, 1);
        let rle = encode(&mask);
        // column-major: 0 0 | 1 1 | 1 0
        assert_eq!(rle.counts, vec![2, 3, 1]);
        assert_eq!(rle.area(), 3);
    }

    #[test]
    fn test_encode_all_set() {
        let mut mask = Mask::new(2, 2);
        for x in 0..2 {
            for y in 0..2 {
                mask.set(x, y);
            }
        }
        assert_eq!(encode(&mask).counts, vec![0, 4]);
    }

    #[test]
    fn test_to_bbox() {
        // 3 rows x 4 cols, column-major:
        // Col 0: [0,0,0], Col 1: [1,1,1], Col 2: [0,0,1], Col 3: [1,0,0]
        let rle = Rle {
            h: 3,
            w: 4,
            counts: vec![3, 3, 2, 2, 2],
        };
        assert_eq!(rle.to_bbox(), [1.0, 0.0, 3.0, 3.0]);
        assert_eq!(rle.area(), 5);
    }

    #[test]
    fn test_to_bbox_empty() {
        let rle = encode(&Mask::new(5, 5));
        assert_eq!(rle.counts, vec![25]);
        assert_eq!(rle.to_bbox(), [0.0; 4]);
        assert_eq!(rle.area(), 0);
    }

    #[test]
    fn test_compressed_string() {
        let rle = Rle {
            h: 10,
            w: 10,
            counts: vec![5, 3, 92],
        };
        assert_eq!(rle.to_compressed_string(), "53l2");
    }

    #[test]
    fn test_compressed_string_uses_deltas() {
        let rle = Rle {
            h: 3,
            w: 4,
            counts: vec![1, 2, 3, 4],
        };
        assert_eq!(rle.to_compressed_string(), "1232");

        let rle = Rle {
            h: 2,
            w: 4,
            counts: vec![0, 5, 1, 2],
        };
        // 2 - 5 = -3 encodes as a single group
        assert_eq!(rle.to_compressed_string(), "051M");
    }

    // Inverse of `Rle::to_compressed_string`, following COCO's `rleFrString`.
    fn decode_compressed(s: &str) -> Vec<u32> {
        let bytes = s.as_bytes();
        let mut counts: Vec<u32> = Vec::new();
        let mut p = 0;
        while p < bytes.len() {
            let mut x: i64 = 0;
            let mut k = 0;
            loop {
                let c = (bytes[p] - 48) as i64;
                x |= (c & 0x1f) << (5 * k);
                p += 1;
                k += 1;
                if c & 0x20 == 0 {
                    if c & 0x10 != 0 {
                        x |= -1i64 << (5 * k);
                    }
                    break;
                }
            }
            if counts.len() > 2 {
                x += counts[counts.len() - 2] as i64;
            }
            counts.push(x as u32);
        }
        counts
    }

    #[test]
    fn test_compressed_string_decodes_to_counts() {
        let cases = [
            // deltas needing several 5-bit groups
            vec![70000, 3, 1200, 40000, 5, 2, 900000],
            // large negative deltas
            vec![0, 5000, 1, 2, 40000, 1],
            vec![11, 7, 3, 6, 4, 5, 5, 4, 6, 3, 7, 2, 8, 1, 28],
        ];
        for counts in cases {
            let rle = Rle {
                h: 1,
                w: counts.iter().sum(),
                counts: counts.clone(),
            };
            assert_eq!(decode_compressed(&rle.to_compressed_string()), counts);
        }
        assert_eq!(
            Rle { h: 1, w: 1, counts: vec![70000, 3, 1200, 40000, 5, 2, 900000] }
                .to_compressed_string(),
            "`[T23`U1mQW1ejNRnhNkl^k0"
        );
        assert_eq!(
            Rle { h: 1, w: 1, counts: vec![0, 5000, 1, 2, 40000, 1] }.to_compressed_string(),
            "0Xl41jSKoQW1O"
        );
    }

    #[test]
    fn test_triangle_compressed_string() {
        let codec = ScanlineCodec;
        let mask = codec.rasterize(&pts(&[(1, 1), (8, 1), (1, 8)]), 10, 10);
        let rle = codec.encode(&mask);
        assert_eq!(
            rle.counts,
            vec![11, 7, 3, 6, 4, 5, 5, 4, 6, 3, 7, 2, 8, 1, 28]
        );
        assert_eq!(rle.to_compressed_string(), ";73O1O1O1O1O1Od0");
    }

    // Even-odd test evaluated independently at every pixel of the image.
    fn naive_count(polygon: &[PixelPoint], width: u32, height: u32) -> u64 {
        let mut count = 0;
        for y in 0..height {
            for x in 0..width {
                let (px, py) = (x as f64, y as f64);
                let mut inside = false;
                for (i, a) in polygon.iter().enumerate() {
                    let b = polygon[(i + 1) % polygon.len()];
                    let (ax, ay, bx, by) = (a.x as f64, a.y as f64, b.x as f64, b.y as f64);
                    if (ay > py) != (by > py) && px < ax + (bx - ax) * (py - ay) / (by - ay) {
                        inside = !inside;
                    }
                }
                if inside {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn test_area_matches_naive_count_for_convex_polygons() {
        let codec = ScanlineCodec;
        let (width, height) = (40, 30);
        let polygons = [
            vec![(1.0, 1.0), (8.0, 1.0), (1.0, 8.0)],
            vec![(5.0, 3.0), (30.0, 3.0), (30.0, 20.0), (5.0, 20.0)],
            vec![(20.0, 0.0), (39.0, 10.0), (30.0, 29.0), (10.0, 29.0), (0.0, 10.0)],
            vec![(-10.0, -4.0), (55.5, 2.3), (18.4, 45.0)],
            vec![(12.0, 4.0), (22.0, 9.0), (25.0, 19.0), (16.0, 26.0), (6.0, 18.0), (7.0, 8.0)],
        ];
        for points in polygons {
            let polygon = round_and_clamp(&points, width, height);
            let rle = codec.encode(&codec.rasterize(&polygon, width, height));
            let expected = naive_count(&polygon, width, height);
            assert!(expected > 0);
            assert_eq!(rle.area(), expected, "polygon {points:?}");
        }
    }

    #[test]
    fn test_rasterize_triangle() {
        let codec = ScanlineCodec;
        let mask = codec.rasterize(&pts(&[(1, 1), (8, 1), (1, 8)]), 10, 10);
        // row y holds x in [1, 8 - y] for y in 1..=7
        assert_eq!(mask.count(), 28);
        assert!(mask.get(1, 1));
        assert!(mask.get(7, 1));
        assert!(!mask.get(8, 1));
        assert!(mask.get(1, 7));
        assert!(!mask.get(1, 8));
        assert!(!mask.get(0, 1));

        let rle = codec.encode(&mask);
        assert_eq!(rle.area(), 28);
        assert_eq!(rle.to_bbox(), [1.0, 1.0, 7.0, 7.0]);
    }

    #[test]
    fn test_rasterize_rectangle_matches_naive_count() {
        let codec = ScanlineCodec;
        let square = pts(&[(2, 3), (6, 3), (6, 7), (2, 7)]);
        let mask = codec.rasterize(&square, 10, 12);
        // half-open on the right and bottom edges
        assert_eq!(mask.count(), 16);

        let rle = codec.encode(&mask);
        assert_eq!(rle.area(), mask.count());
        assert_eq!(rle.to_bbox(), [2.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn test_rasterize_degenerate_polygons() {
        let codec = ScanlineCodec;
        assert_eq!(codec.rasterize(&pts(&[(1, 1), (5, 5)]), 8, 8).count(), 0);
        assert_eq!(codec.rasterize(&pts(&[(1, 1), (3, 1), (6, 1)]), 8, 8).count(), 0);
        assert_eq!(codec.rasterize(&[], 8, 8).count(), 0);
    }

    #[test]
    fn test_bbox_touches_every_edge() {
        let codec = ScanlineCodec;
        let poly = pts(&[(3, 0), (9, 4), (5, 9), (0, 6)]);
        let mask = codec.rasterize(&poly, 10, 10);
        let [bx, by, bw, bh] = codec.encode(&mask).to_bbox();
        let (x0, y0, x1, y1) = (bx as u32, by as u32, (bx + bw) as u32, (by + bh) as u32);

        let mut touches = [false; 4];
        for y in 0..10 {
            for x in 0..10 {
                if mask.get(x, y) {
                    assert!(x >= x0 && x < x1 && y >= y0 && y < y1);
                    touches[0] |= x == x0;
                    touches[1] |= x == x1 - 1;
                    touches[2] |= y == y0;
                    touches[3] |= y == y1 - 1;
                }
            }
        }
        assert_eq!(touches, [true; 4]);
    }

    #[test]
    fn test_flatten() {
        assert_eq!(flatten(&pts(&[(1, 2), (3, 4)])), vec![1, 2, 3, 4]);
    }
}
