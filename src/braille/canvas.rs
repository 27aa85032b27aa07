/// Dot bit for each (x % 2, y % 4) position inside a braille cell.
/// Unicode braille patterns live at U+2800..=U+28FF.
const DOT_BITS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // left column, top to bottom
    [0x08, 0x10, 0x20, 0x80], // right column
];

const BLANK: u32 = 0x2800;

/// Terminal canvas where every character cell holds a 2x4 dot grid.
#[derive(Clone)]
pub struct BrailleCanvas {
    cols: usize,
    rows: usize,
    cells: Vec<u8>,
}

impl BrailleCanvas {
    /// Canvas of `cols` x `rows` characters, i.e. `cols*2` x `rows*4` dots.
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![0; cols * rows],
        }
    }

    /// Dot resolution as (width, height)
    pub fn dot_size(&self) -> (usize, usize) {
        (self.cols * 2, self.rows * 4)
    }

    /// Light the dot at (x, y); anything off-canvas is ignored.
    pub fn set(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        let (col, row) = (x / 2, y / 4);
        if col >= self.cols || row >= self.rows {
            return;
        }
        self.cells[row * self.cols + col] |= DOT_BITS[x % 2][y % 4];
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }

    /// Glyphs of one character row
    pub fn row(&self, row: usize) -> impl Iterator<Item = char> + '_ {
        let start = (row.min(self.rows)) * self.cols;
        let end = if row < self.rows { start + self.cols } else { start };
        self.cells[start..end]
            .iter()
            .map(|&bits| char::from_u32(BLANK + bits as u32).unwrap_or(' '))
    }

    #[cfg(test)]
    pub fn render(&self) -> String {
        (0..self.rows)
            .map(|r| self.row(r).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
