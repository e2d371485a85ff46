use super::WatermarkConfig;

/// Grid placement for one render: cell geometry plus the padded index sweep.
///
/// The sweep runs one cell beyond the visible grid in every direction so
/// rotated text near the edges is never clipped by an under-covered border.
/// A nominal 1x1 grid therefore still produces a 4x4 sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayout {
    rows: i64,
    cols: i64,
    cell_width: f32,
    cell_height: f32,
    staggered: bool,
}

/// One placement of the watermark text on the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileAnchor {
    pub row: i64,
    pub col: i64,
    pub x: f32,
    pub y: f32,
}

impl TileLayout {
    pub fn new(surface_width: u32, surface_height: u32, config: &WatermarkConfig) -> Self {
        Self {
            rows: config.grid_rows as i64,
            cols: config.grid_cols as i64,
            cell_width: surface_width as f32 / config.grid_cols as f32,
            cell_height: surface_height as f32 / config.grid_rows as f32,
            staggered: config.staggered,
        }
    }

    pub fn cell_width(&self) -> f32 {
        self.cell_width
    }

    pub fn cell_height(&self) -> f32 {
        self.cell_height
    }

    /// Horizontal offset for a row. Staggered mode shifts rows whose index
    /// has odd absolute value by half a cell; the absolute value keeps the
    /// negative padding rows alternating consistently with positive ones.
    pub fn row_offset(&self, row: i64) -> f32 {
        if self.staggered && row.abs() % 2 == 1 {
            self.cell_width / 2.0
        } else {
            0.0
        }
    }

    /// All tile anchors in row-major order over [-1, rows+1] x [-1, cols+1].
    pub fn anchors(&self) -> impl Iterator<Item = TileAnchor> + '_ {
        (-1..=self.rows + 1).flat_map(move |row| {
            let x_offset = self.row_offset(row);
            (-1..=self.cols + 1).map(move |col| TileAnchor {
                row,
                col,
                x: col as f32 * self.cell_width + x_offset,
                y: row as f32 * self.cell_height,
            })
        })
    }
}
