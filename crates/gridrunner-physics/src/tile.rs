//! The tile grid and its read-only query surface.
//!
//! A world position maps to a cell by subtracting the layer offset and
//! floor-dividing by the tile size. Only [`TileKind::Solid`] cells block
//! motion in every direction. The top cell of a ladder column is a one-way
//! floor for bodies falling onto it; the rest of a ladder, hazards and exits
//! are classified but never block.

use serde::{Deserialize, Serialize};

use crate::math::{Rect, Vec2};
use crate::PhysicsError;

// ---------------------------------------------------------------------------
// TileKind
// ---------------------------------------------------------------------------

/// Semantic classification of a grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Empty,
    /// Decorative background tile. Never blocks.
    Normal,
    Solid,
    Hazard,
    Ladder,
    LevelExit,
}

impl TileKind {
    /// Whether this tile takes part in physical blocking.
    #[inline]
    pub fn is_blocking(self) -> bool {
        self == TileKind::Solid
    }

    /// Whether overlapping this tile produces a tile trigger event.
    #[inline]
    pub fn is_trigger(self) -> bool {
        matches!(self, TileKind::Hazard | TileKind::LevelExit)
    }

    fn from_ascii(ch: char) -> Option<TileKind> {
        match ch {
            '.' | ' ' => Some(TileKind::Empty),
            '-' => Some(TileKind::Normal),
            '#' => Some(TileKind::Solid),
            '^' => Some(TileKind::Hazard),
            'H' => Some(TileKind::Ladder),
            'E' => Some(TileKind::LevelExit),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TileQuery
// ---------------------------------------------------------------------------

/// Read-only spatial queries against a tile layer.
///
/// The player state machine consumes this trait rather than a concrete grid
/// so that tests and tools can substitute their own layer.
pub trait TileQuery {
    /// Classification of the cell containing `position`.
    fn classify(&self, position: Vec2) -> TileKind;

    /// X coordinate of the center of the ladder column containing
    /// `position`, or `None` if that cell is not a ladder.
    fn ladder_column_center_x(&self, position: Vec2) -> Option<f32>;

    /// World-space rectangle of the cell containing `position`, whatever
    /// its kind. `None` when there is no layer to ask.
    fn cell_bounds(&self, position: Vec2) -> Option<Rect>;
}

// ---------------------------------------------------------------------------
// CellRange
// ---------------------------------------------------------------------------

/// An inclusive rectangular range of cell coordinates.
///
/// The range is empty when `x0 > x1` or `y0 > y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl CellRange {
    pub fn is_empty(&self) -> bool {
        self.x0 > self.x1 || self.y0 > self.y1
    }

    /// Iterate cells row by row, top to bottom, left to right.
    pub fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        (self.y0..=self.y1).flat_map(move |cy| (self.x0..=self.x1).map(move |cx| (cx, cy)))
    }
}

// ---------------------------------------------------------------------------
// TileGrid
// ---------------------------------------------------------------------------

/// A fixed-size grid of classified tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tile_size: f32,
    /// World position of the top-left corner of cell `(0, 0)`.
    offset: Vec2,
    cells: Vec<TileKind>,
}

impl TileGrid {
    /// Create an all-empty grid.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidTileLayer`] if `tile_size` is not
    /// positive and finite.
    pub fn new(width: u32, height: u32, tile_size: f32) -> Result<Self, PhysicsError> {
        if !(tile_size > 0.0 && tile_size.is_finite()) {
            return Err(PhysicsError::InvalidTileLayer {
                details: format!("tile size must be positive and finite, got {tile_size}"),
            });
        }
        Ok(Self {
            width,
            height,
            tile_size,
            offset: Vec2::ZERO,
            cells: vec![TileKind::Empty; width as usize * height as usize],
        })
    }

    /// Build a grid from rows of characters: `#` solid, `-` normal, `^`
    /// hazard, `H` ladder, `E` level exit, `.` or space empty. Short rows are
    /// padded with empty cells.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidTileLayer`] on an unknown character or
    /// an invalid tile size.
    pub fn from_ascii(rows: &[&str], tile_size: f32) -> Result<Self, PhysicsError> {
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
        let mut grid = Self::new(width, rows.len() as u32, tile_size)?;
        for (cy, row) in rows.iter().enumerate() {
            for (cx, ch) in row.chars().enumerate() {
                let kind = TileKind::from_ascii(ch).ok_or_else(|| PhysicsError::InvalidTileLayer {
                    details: format!("unknown tile character {ch:?} at ({cx}, {cy})"),
                })?;
                grid.set(cx as i32, cy as i32, kind);
            }
        }
        Ok(grid)
    }

    /// Move the whole layer so that cell `(0, 0)` starts at `offset`.
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    fn index(&self, cx: i32, cy: i32) -> Option<usize> {
        if cx < 0 || cy < 0 || cx as u32 >= self.width || cy as u32 >= self.height {
            return None;
        }
        Some(cy as usize * self.width as usize + cx as usize)
    }

    /// Classification at integer cell coordinates. Cells outside the grid
    /// are empty.
    pub fn kind_at(&self, cx: i32, cy: i32) -> TileKind {
        self.index(cx, cy)
            .map(|i| self.cells[i])
            .unwrap_or(TileKind::Empty)
    }

    /// Overwrite one cell. Out-of-range coordinates are ignored.
    pub fn set(&mut self, cx: i32, cy: i32, kind: TileKind) {
        if let Some(i) = self.index(cx, cy) {
            self.cells[i] = kind;
        }
    }

    /// The cell containing a world position.
    pub fn cell_of(&self, position: Vec2) -> (i32, i32) {
        let local = position - self.offset;
        (
            (local.x / self.tile_size).floor() as i32,
            (local.y / self.tile_size).floor() as i32,
        )
    }

    /// World-space rectangle covered by a cell.
    pub fn cell_rect(&self, cx: i32, cy: i32) -> Rect {
        Rect::new(
            self.offset.x + cx as f32 * self.tile_size,
            self.offset.y + cy as f32 * self.tile_size,
            self.tile_size,
            self.tile_size,
        )
    }

    /// Cells whose interior intersects `rect`. A rectangle edge lying
    /// exactly on a cell boundary does not pull in the neighbouring cell.
    pub fn cells_overlapping(&self, rect: &Rect) -> CellRange {
        let ts = self.tile_size;
        let left = (rect.left() - self.offset.x) / ts;
        let right = (rect.right() - self.offset.x) / ts;
        let top = (rect.top() - self.offset.y) / ts;
        let bottom = (rect.bottom() - self.offset.y) / ts;
        CellRange {
            x0: left.floor() as i32,
            y0: top.floor() as i32,
            x1: right.ceil() as i32 - 1,
            y1: bottom.ceil() as i32 - 1,
        }
    }

    /// Solid cells intersecting `rect`, row by row.
    pub fn solid_cells_in(&self, rect: &Rect) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.cells_overlapping(rect)
            .cells()
            .filter(move |&(cx, cy)| self.kind_at(cx, cy).is_blocking())
    }

    /// The topmost cell of a ladder column: a ladder with no ladder above.
    pub fn is_ladder_top(&self, cx: i32, cy: i32) -> bool {
        self.kind_at(cx, cy) == TileKind::Ladder && self.kind_at(cx, cy - 1) != TileKind::Ladder
    }

    /// Cells a falling body that is not climbing can stand on: solid cells
    /// and ladder tops, row by row.
    pub fn floor_cells_in(&self, rect: &Rect) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.cells_overlapping(rect).cells().filter(move |&(cx, cy)| {
            self.kind_at(cx, cy).is_blocking() || self.is_ladder_top(cx, cy)
        })
    }
}

impl TileQuery for TileGrid {
    fn classify(&self, position: Vec2) -> TileKind {
        let (cx, cy) = self.cell_of(position);
        self.kind_at(cx, cy)
    }

    fn ladder_column_center_x(&self, position: Vec2) -> Option<f32> {
        let (cx, cy) = self.cell_of(position);
        if self.kind_at(cx, cy) != TileKind::Ladder {
            return None;
        }
        Some(self.offset.x + (cx as f32 + 0.5) * self.tile_size)
    }

    fn cell_bounds(&self, position: Vec2) -> Option<Rect> {
        let (cx, cy) = self.cell_of(position);
        Some(self.cell_rect(cx, cy))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> TileGrid {
        TileGrid::from_ascii(
            &[
                "....E",
                "..H..",
                "..H^.",
                "#####",
            ],
            16.0,
        )
        .unwrap()
    }

    #[test]
    fn ascii_layer_classifies_cells() {
        let g = layer();
        assert_eq!(g.width(), 5);
        assert_eq!(g.height(), 4);
        assert_eq!(g.kind_at(4, 0), TileKind::LevelExit);
        assert_eq!(g.kind_at(2, 1), TileKind::Ladder);
        assert_eq!(g.kind_at(3, 2), TileKind::Hazard);
        assert_eq!(g.kind_at(0, 3), TileKind::Solid);
    }

    #[test]
    fn only_the_top_ladder_cell_is_a_floor() {
        let g = layer();
        assert!(g.is_ladder_top(2, 1));
        assert!(!g.is_ladder_top(2, 2));
        assert!(!g.is_ladder_top(3, 2));

        let floors: Vec<_> = g.floor_cells_in(&Rect::new(0.0, 0.0, 80.0, 64.0)).collect();
        assert_eq!(floors, vec![(2, 1), (0, 3), (1, 3), (2, 3), (3, 3), (4, 3)]);
    }

    #[test]
    fn unknown_character_is_rejected() {
        let err = TileGrid::from_ascii(&["#?#"], 16.0).unwrap_err();
        assert!(err.to_string().contains("'?'"), "got: {err}");
    }

    #[test]
    fn non_positive_tile_size_is_rejected() {
        assert!(TileGrid::new(4, 4, 0.0).is_err());
        assert!(TileGrid::new(4, 4, f32::NAN).is_err());
    }

    #[test]
    fn out_of_range_is_empty() {
        let g = layer();
        assert_eq!(g.kind_at(-1, 0), TileKind::Empty);
        assert_eq!(g.kind_at(0, 99), TileKind::Empty);
        assert_eq!(g.classify(Vec2::new(-5.0, -5.0)), TileKind::Empty);
    }

    #[test]
    fn world_position_uses_floor_division_and_offset() {
        let g = layer().with_offset(Vec2::new(100.0, 0.0));
        assert_eq!(g.cell_of(Vec2::new(99.9, 0.0)), (-1, 0));
        assert_eq!(g.cell_of(Vec2::new(132.0, 17.0)), (2, 1));
        assert_eq!(g.classify(Vec2::new(140.0, 20.0)), TileKind::Ladder);
    }

    #[test]
    fn ladder_column_center() {
        let g = layer();
        assert_eq!(g.ladder_column_center_x(Vec2::new(33.0, 20.0)), Some(40.0));
        assert_eq!(g.ladder_column_center_x(Vec2::new(10.0, 20.0)), None);
    }

    #[test]
    fn cell_bounds_cover_the_sampled_point() {
        let g = layer();
        let r = g.cell_bounds(Vec2::new(35.0, 20.0)).unwrap();
        assert_eq!(r, Rect::new(32.0, 16.0, 16.0, 16.0));
        assert!(r.contains_point(Vec2::new(35.0, 20.0)));
    }

    #[test]
    fn boundary_edges_do_not_pull_in_neighbours() {
        let g = layer();
        // Exactly covers cell (1, 1).
        let r = g.cells_overlapping(&Rect::new(16.0, 16.0, 16.0, 16.0));
        assert_eq!(r, CellRange { x0: 1, y0: 1, x1: 1, y1: 1 });
        // A body standing exactly on the floor does not touch the floor row.
        let standing = Rect::new(0.0, 16.0, 16.0, 32.0);
        assert_eq!(g.solid_cells_in(&standing).count(), 0);
        // Sinking a little in does.
        assert_eq!(g.solid_cells_in(&standing.translated(Vec2::new(0.0, 1.0))).count(), 1);
    }
}
