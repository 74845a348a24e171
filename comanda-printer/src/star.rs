//! Star line-mode command builder
//!
//! Star thermal printers speak a different dialect than ESC/POS: their
//! own alignment, QR and cut commands. Same fluent surface as
//! [`crate::EscPosBuilder`], profile selection picks one or the other.

use crate::encoding::convert_to_codepage;

/// Star line-mode command builder
pub struct StarBuilder {
    buf: Vec<u8>,
    width: usize,
}

impl StarBuilder {
    /// Create a new builder with the specified paper width in characters
    pub fn new(width: usize) -> Self {
        let mut buf = Vec::with_capacity(4096);
        // Initialize printer (ESC @), select Windows-1252 (ESC GS t 32)
        buf.extend_from_slice(&[0x1B, 0x40]);
        buf.extend_from_slice(&[0x1B, 0x1D, 0x74, 32]);
        Self { buf, width }
    }

    /// Get the configured paper width
    pub fn width(&self) -> usize {
        self.width
    }

    // === Text Output ===

    /// Write raw text (converted to the code page at build time)
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Feed n lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        // ESC a n - Feed n lines
        self.buf.extend_from_slice(&[0x1B, 0x61, lines]);
        self
    }

    // === Alignment ===

    /// Align text to center
    pub fn center(&mut self) -> &mut Self {
        // ESC GS a n
        self.buf.extend_from_slice(&[0x1B, 0x1D, 0x61, 0x01]);
        self
    }

    /// Align text to left (default)
    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x1D, 0x61, 0x00]);
        self
    }

    // === Paper Control ===

    /// Feed and partial cut (Star keeps one tab of paper attached)
    pub fn cut(&mut self) -> &mut Self {
        // ESC d 3 - Feed to cutter position, partial cut
        self.buf.extend_from_slice(&[0x1B, 0x64, 0x03]);
        self
    }

    // === QR Code ===

    /// Print a QR code
    ///
    /// Size: 1-8 (module size in dots)
    pub fn qr_code(&mut self, data: &str, size: u8) -> &mut Self {
        let size = size.clamp(1, 8);

        // ESC GS y S 0 n - Select model 2
        self.buf
            .extend_from_slice(&[0x1B, 0x1D, 0x79, 0x53, 0x30, 0x02]);

        // ESC GS y S 1 n - Error correction level M
        self.buf
            .extend_from_slice(&[0x1B, 0x1D, 0x79, 0x53, 0x31, 0x01]);

        // ESC GS y S 2 n - Module size
        self.buf
            .extend_from_slice(&[0x1B, 0x1D, 0x79, 0x53, 0x32, size]);

        // ESC GS y D 1 m nL nH - Store data
        let data_bytes = data.as_bytes();
        let n_l = (data_bytes.len() & 0xFF) as u8;
        let n_h = ((data_bytes.len() >> 8) & 0xFF) as u8;
        self.buf
            .extend_from_slice(&[0x1B, 0x1D, 0x79, 0x44, 0x31, 0x00, n_l, n_h]);
        self.buf.extend_from_slice(data_bytes);

        // ESC GS y P - Print the stored code
        self.buf.extend_from_slice(&[0x1B, 0x1D, 0x79, 0x50]);

        self
    }

    // === Build ===

    /// Build the final byte buffer with code-page encoding
    pub fn build(self) -> Vec<u8> {
        convert_to_codepage(&self.buf)
    }

    /// Build without code-page conversion
    pub fn build_raw(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for StarBuilder {
    fn default() -> Self {
        Self::new(48)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_init() {
        let b = StarBuilder::new(32);
        let data = b.build_raw();
        assert_eq!(&data[..2], &[0x1B, 0x40]);
        assert_eq!(&data[2..6], &[0x1B, 0x1D, 0x74, 32]);
    }

    #[test]
    fn test_cut_is_star_dialect() {
        let mut b = StarBuilder::new(48);
        b.line("x").cut();
        let data = b.build_raw();
        assert!(data.windows(3).any(|w| w == [0x1B, 0x64, 0x03]));
        // No ESC/POS GS V cut
        assert!(!data.windows(2).any(|w| w == [0x1D, 0x56]));
    }

    #[test]
    fn test_qr_embeds_payload_with_length() {
        let mut b = StarBuilder::new(48);
        b.qr_code("http://x/o1", 4);
        let data = b.build_raw();
        let s = String::from_utf8_lossy(&data);
        assert!(s.contains("http://x/o1"));
        let len = "http://x/o1".len() as u8;
        assert!(
            data.windows(8)
                .any(|w| w == [0x1B, 0x1D, 0x79, 0x44, 0x31, 0x00, len, 0x00])
        );
    }
}
