// Pixel Buffer - Packed 4-bit-per-pixel framebuffer
//
// Each byte holds two palette indices. The low nibble is the pixel at the
// even row-major position, the high nibble the pixel at the odd position.
// Pixel (x, y) lives at position `x + y * width`.
//
// All drawing operations validate every argument before touching storage,
// so a failed call leaves the buffer byte-for-byte unchanged.

use crate::error::ConsoleError;

/// Default screen width in pixels
pub const SCREEN_WIDTH: usize = 128;

/// Default screen height in pixels
pub const SCREEN_HEIGHT: usize = 128;

/// Largest width or height accepted for a buffer
pub const MAX_DIMENSION: usize = 512;

/// Number of selectable colors (4-bit indices)
pub const COLOR_COUNT: u8 = 16;

/// Packed indexed-color framebuffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    /// ceil(width * height / 2) bytes, two pixels per byte
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Create a zero-filled buffer
    ///
    /// # Arguments
    /// * `width` - Width in pixels (1-512)
    /// * `height` - Height in pixels (1-512)
    pub fn new(width: usize, height: usize) -> Result<Self, ConsoleError> {
        check_dimension("width", width)?;
        check_dimension("height", height)?;

        Ok(Self {
            width,
            height,
            pixels: vec![0; (width * height).div_ceil(2)],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pixels in the buffer
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw packed storage
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Set the pixel at (x, y) to `color`
    ///
    /// The other nibble of the same byte is left untouched.
    pub fn set(&mut self, x: i32, y: i32, color: u8) -> Result<(), ConsoleError> {
        let pos = self.position("set", "x", "y", x, y)?;
        check_color("set", color)?;

        self.write_nibble(pos, color);
        Ok(())
    }

    /// Read the palette index stored at (x, y)
    pub fn get(&self, x: i32, y: i32) -> Result<u8, ConsoleError> {
        let pos = self.position("get", "x", "y", x, y)?;
        Ok(self.nibble(pos))
    }

    /// Fill the inclusive row-major run between (x1, y1) and (x2, y2)
    ///
    /// The endpoints may be given in either order. Unaligned endpoint pixels
    /// are written individually; the byte-aligned interior is filled with
    /// `color` duplicated into both nibbles.
    pub fn fill_scanline_run(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: u8,
    ) -> Result<(), ConsoleError> {
        const OP: &str = "fillScanlineRun";
        let a = self.position(OP, "x1", "y1", x1, y1)?;
        let b = self.position(OP, "x2", "y2", x2, y2)?;
        check_color(OP, color)?;

        self.fill_run(a.min(b), a.max(b), color);
        Ok(())
    }

    /// Fill the inclusive rectangle spanned by two corners
    ///
    /// One scanline run per row.
    pub fn fill_rect(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: u8,
    ) -> Result<(), ConsoleError> {
        const OP: &str = "fillRect";
        self.position(OP, "x1", "y1", x1, y1)?;
        self.position(OP, "x2", "y2", x2, y2)?;
        check_color(OP, color)?;

        let (left, right) = (x1.min(x2) as usize, x1.max(x2) as usize);
        let (top, bottom) = (y1.min(y2) as usize, y1.max(y2) as usize);

        for y in top..=bottom {
            let row = y * self.width;
            self.fill_run(row + left, row + right, color);
        }
        Ok(())
    }

    /// Draw a line from (x1, y1) to (x2, y2), both endpoints inclusive
    ///
    /// Integer Bresenham, valid in every octant. Stops exactly when the
    /// current point reaches the endpoint.
    pub fn line(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: u8,
    ) -> Result<(), ConsoleError> {
        const OP: &str = "line";
        self.position(OP, "x1", "y1", x1, y1)?;
        self.position(OP, "x2", "y2", x2, y2)?;
        check_color(OP, color)?;

        let dx = (x2 - x1).abs();
        let dy = -(y2 - y1).abs();
        let sx = if x1 < x2 { 1 } else { -1 };
        let sy = if y1 < y2 { 1 } else { -1 };
        let mut err = dx + dy;

        let (mut x, mut y) = (x1, y1);
        loop {
            // Every point on the segment lies inside the bounding box of two
            // validated endpoints.
            self.write_nibble(x as usize + y as usize * self.width, color);
            if x == x2 && y == y2 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        Ok(())
    }

    /// Fill the whole buffer with `color`
    pub fn clear(&mut self, color: u8) -> Result<(), ConsoleError> {
        check_color("clear", color)?;
        self.pixels.fill(color | (color << 4));
        Ok(())
    }

    /// Iterate over every pixel's palette index in row-major order
    pub fn indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.pixels
            .iter()
            .flat_map(|&byte| [byte & 0x0F, byte >> 4])
            .take(self.len())
    }

    /// Palette index at a linear position (no bounds check beyond the slice)
    #[inline]
    fn nibble(&self, pos: usize) -> u8 {
        let byte = self.pixels[pos / 2];
        if pos % 2 == 1 {
            byte >> 4
        } else {
            byte & 0x0F
        }
    }

    #[inline]
    fn write_nibble(&mut self, pos: usize, color: u8) {
        let byte = &mut self.pixels[pos / 2];
        *byte = if pos % 2 == 1 {
            (*byte & 0x0F) | (color << 4)
        } else {
            (*byte & 0xF0) | color
        };
    }

    /// Fill linear positions `start..=end` (already validated, start <= end)
    fn fill_run(&mut self, mut start: usize, mut end: usize, color: u8) {
        if start % 2 == 1 {
            self.write_nibble(start, color);
            start += 1;
        }

        if end % 2 == 0 {
            self.write_nibble(end, color);
            if end == 0 {
                return;
            }
            end -= 1;
        }

        // start is now even and end odd, so both ends sit on byte boundaries
        if start <= end {
            self.pixels[start / 2..=end / 2].fill(color | (color << 4));
        }
    }

    /// Validate a coordinate pair and return its linear position
    fn position(
        &self,
        op: &'static str,
        x_name: &'static str,
        y_name: &'static str,
        x: i32,
        y: i32,
    ) -> Result<usize, ConsoleError> {
        if x < 0 || x as usize >= self.width {
            return Err(ConsoleError::out_of_range(
                op,
                x_name,
                x as i64,
                0,
                self.width as i64,
            ));
        }
        if y < 0 || y as usize >= self.height {
            return Err(ConsoleError::out_of_range(
                op,
                y_name,
                y as i64,
                0,
                self.height as i64,
            ));
        }
        Ok(x as usize + y as usize * self.width)
    }
}

impl Default for PixelBuffer {
    fn default() -> Self {
        Self {
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            pixels: vec![0; (SCREEN_WIDTH * SCREEN_HEIGHT).div_ceil(2)],
        }
    }
}

fn check_color(op: &'static str, color: u8) -> Result<(), ConsoleError> {
    if color >= COLOR_COUNT {
        return Err(ConsoleError::out_of_range(
            op,
            "c",
            color as i64,
            0,
            COLOR_COUNT as i64,
        ));
    }
    Ok(())
}

pub(crate) fn check_dimension(name: &'static str, value: usize) -> Result<(), ConsoleError> {
    if value == 0 || value > MAX_DIMENSION {
        return Err(ConsoleError::out_of_range(
            "new",
            name,
            value as i64,
            1,
            MAX_DIMENSION as i64 + 1,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    fn plotted(buffer: &PixelBuffer) -> Vec<(i32, i32)> {
        let mut points = Vec::new();
        for y in 0..buffer.height() as i32 {
            for x in 0..buffer.width() as i32 {
                if buffer.get(x, y).unwrap() != 0 {
                    points.push((x, y));
                }
            }
        }
        points
    }

    #[test]
    fn test_buffer_creation() {
        let buffer = PixelBuffer::new(128, 128).unwrap();
        assert_eq!(buffer.as_bytes().len(), 128 * 128 / 2);
        assert!(buffer.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_odd_pixel_count_rounds_up() {
        let buffer = PixelBuffer::new(3, 3).unwrap();
        assert_eq!(buffer.as_bytes().len(), 5);
        assert_eq!(buffer.indices().count(), 9);
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(PixelBuffer::new(0, 10).is_err());
        assert!(PixelBuffer::new(10, MAX_DIMENSION + 1).is_err());
    }

    #[test]
    fn test_set_packs_nibbles() {
        let mut buffer = PixelBuffer::new(4, 1).unwrap();
        buffer.set(0, 0, 0x3).unwrap();
        buffer.set(1, 0, 0xA).unwrap();
        assert_eq!(buffer.as_bytes()[0], 0xA3);

        buffer.set(0, 0, 0x5).unwrap();
        assert_eq!(buffer.as_bytes()[0], 0xA5);
    }

    #[test]
    fn test_set_out_of_bounds() {
        let mut buffer = PixelBuffer::new(128, 128).unwrap();
        buffer.set(5, 5, 7).unwrap();
        let before = buffer.as_bytes().to_vec();

        for (x, y, c) in [(-1, 0, 1), (128, 0, 1), (0, -1, 1), (0, 128, 1), (0, 0, 16)] {
            let err = buffer.set(x, y, c).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ArgumentOutOfRange);
        }
        assert_eq!(buffer.as_bytes(), &before[..]);
    }

    #[test]
    fn test_fill_run_odd_start_even_end() {
        let mut buffer = PixelBuffer::new(8, 1).unwrap();
        buffer.fill_scanline_run(1, 0, 6, 0, 0xF).unwrap();
        assert_eq!(buffer.as_bytes(), &[0xF0, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn test_fill_run_reversed_endpoints() {
        let mut a = PixelBuffer::new(8, 2).unwrap();
        let mut b = PixelBuffer::new(8, 2).unwrap();
        a.fill_scanline_run(6, 1, 1, 0, 4).unwrap();
        b.fill_scanline_run(1, 0, 6, 1, 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fill_run_single_pixels() {
        let mut buffer = PixelBuffer::new(4, 1).unwrap();
        buffer.fill_scanline_run(0, 0, 0, 0, 2).unwrap();
        buffer.fill_scanline_run(3, 0, 3, 0, 9).unwrap();
        assert_eq!(buffer.as_bytes(), &[0x02, 0x90]);
    }

    #[test]
    fn test_fill_run_two_pixels_split_across_bytes() {
        let mut buffer = PixelBuffer::new(4, 1).unwrap();
        buffer.fill_scanline_run(1, 0, 2, 0, 6).unwrap();
        assert_eq!(buffer.as_bytes(), &[0x60, 0x06]);
    }

    #[test]
    fn test_fill_rect_exact_cover() {
        let mut buffer = PixelBuffer::new(16, 16).unwrap();
        buffer.fill_rect(3, 2, 8, 5, 1).unwrap();

        for y in 0..16 {
            for x in 0..16 {
                let inside = (3..=8).contains(&x) && (2..=5).contains(&y);
                assert_eq!(buffer.get(x, y).unwrap(), inside as u8, "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_fill_rect_corner_order() {
        let mut a = PixelBuffer::new(16, 16).unwrap();
        let mut b = PixelBuffer::new(16, 16).unwrap();
        a.fill_rect(8, 5, 3, 2, 7).unwrap();
        b.fill_rect(3, 2, 8, 5, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fill_rect_rejects_second_corner() {
        let mut buffer = PixelBuffer::new(16, 16).unwrap();
        let err = buffer.fill_rect(0, 0, 16, 3, 1).unwrap_err();
        assert!(err.to_string().contains("x2"));
        assert!(buffer.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_line_horizontal() {
        let mut buffer = PixelBuffer::new(8, 8).unwrap();
        buffer.line(0, 0, 4, 0, 1).unwrap();
        assert_eq!(plotted(&buffer), vec![(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)]);
    }

    #[test]
    fn test_line_vertical() {
        let mut buffer = PixelBuffer::new(8, 8).unwrap();
        buffer.line(0, 0, 0, 4, 1).unwrap();
        assert_eq!(plotted(&buffer), vec![(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)]);
    }

    #[test]
    fn test_line_diagonal() {
        let mut buffer = PixelBuffer::new(8, 8).unwrap();
        buffer.line(0, 0, 4, 4, 1).unwrap();
        assert_eq!(plotted(&buffer), vec![(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)]);
    }

    #[test]
    fn test_line_reaches_endpoint_in_every_octant() {
        let center = (8, 8);
        let targets = [
            (15, 11),
            (11, 15),
            (5, 15),
            (1, 11),
            (1, 5),
            (5, 1),
            (11, 1),
            (15, 5),
        ];
        for (tx, ty) in targets {
            let mut buffer = PixelBuffer::new(16, 16).unwrap();
            buffer.line(center.0, center.1, tx, ty, 1).unwrap();

            let points = plotted(&buffer);
            let expected_len = (tx - center.0).abs().max((ty - center.1).abs()) + 1;
            assert_eq!(points.len() as i32, expected_len, "to ({}, {})", tx, ty);
            assert!(points.contains(&center));
            assert!(points.contains(&(tx, ty)));
        }
    }

    #[test]
    fn test_line_single_point() {
        let mut buffer = PixelBuffer::new(8, 8).unwrap();
        buffer.line(3, 3, 3, 3, 2).unwrap();
        assert_eq!(plotted(&buffer), vec![(3, 3)]);
    }

    #[test]
    fn test_clear() {
        let mut buffer = PixelBuffer::new(8, 8).unwrap();
        buffer.set(1, 1, 5).unwrap();
        buffer.clear(3).unwrap();
        assert!(buffer.indices().all(|c| c == 3));
        assert!(buffer.clear(16).is_err());
    }

    proptest! {
        #[test]
        fn prop_set_then_get(x in 0i32..128, y in 0i32..128, c in 0u8..16, fill in 0u8..16) {
            let mut buffer = PixelBuffer::new(128, 128).unwrap();
            buffer.clear(fill).unwrap();
            buffer.set(x, y, c).unwrap();

            prop_assert_eq!(buffer.get(x, y).unwrap(), c);
            // the pixel sharing the byte keeps its value
            let pos = x as usize + y as usize * 128;
            let neighbor = pos ^ 1;
            let (nx, ny) = ((neighbor % 128) as i32, (neighbor / 128) as i32);
            prop_assert_eq!(buffer.get(nx, ny).unwrap(), fill);
        }

        #[test]
        fn prop_run_matches_individual_sets(
            width in 1usize..40,
            row in 0usize..4,
            a in 0usize..40,
            b in 0usize..40,
            c in 0u8..16,
            seed in any::<u8>(),
        ) {
            let a = (a % width) as i32;
            let b = (b % width) as i32;
            let row = row as i32;

            let mut fast = PixelBuffer::new(width, 4).unwrap();
            fast.clear(seed & 0x0F).unwrap();
            let mut slow = fast.clone();

            fast.fill_scanline_run(a, row, b, row, c).unwrap();
            for x in a.min(b)..=a.max(b) {
                slow.set(x, row, c).unwrap();
            }
            prop_assert_eq!(fast.as_bytes(), slow.as_bytes());
        }
    }
}
