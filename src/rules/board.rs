//! Board model: points, stones, colors, moves.
//!
//! Coordinates are 0-indexed with `(0, 0)` in the top-left corner. A move at
//! `(-1, -1)` is a pass.

use serde::{Deserialize, Serialize};

/// Board side lengths the core accepts.
pub const SUPPORTED_SIZES: [usize; 4] = [9, 11, 13, 19];

/// Player color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    /// Moves first.
    Black,
    /// Receives komi.
    White,
}

impl Color {
    /// The other color.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Board cell occupied by this color.
    #[must_use]
    pub const fn stone(self) -> Stone {
        match self {
            Color::Black => Stone::Black,
            Color::White => Stone::White,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Black => f.write_str("black"),
            Color::White => f.write_str("white"),
        }
    }
}

/// Contents of a board cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stone {
    /// No stone.
    #[default]
    Empty,
    /// Black stone.
    Black,
    /// White stone.
    White,
}

impl Stone {
    /// Color of the stone, if any.
    #[must_use]
    pub const fn color(self) -> Option<Color> {
        match self {
            Stone::Empty => None,
            Stone::Black => Some(Color::Black),
            Stone::White => Some(Color::White),
        }
    }
}

/// Board coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    /// Column, 0 = left.
    pub x: i32,
    /// Row, 0 = top.
    pub y: i32,
}

impl Point {
    /// The pass sentinel.
    pub const PASS: Point = Point { x: -1, y: -1 };

    /// Create a point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Is this the pass sentinel?
    #[must_use]
    pub const fn is_pass(self) -> bool {
        self.x == -1 && self.y == -1
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_pass() {
            f.write_str("pass")
        } else {
            write!(f, "({}, {})", self.x, self.y)
        }
    }
}

/// A move by one color. A pass uses [`Point::PASS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// Target point.
    pub point: Point,
    /// Color making the move.
    pub player: Color,
}

impl Move {
    /// Stone placement.
    #[must_use]
    pub const fn place(x: i32, y: i32, player: Color) -> Self {
        Self {
            point: Point::new(x, y),
            player,
        }
    }

    /// Pass.
    #[must_use]
    pub const fn pass(player: Color) -> Self {
        Self {
            point: Point::PASS,
            player,
        }
    }

    /// Is this move a pass?
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        self.point.is_pass()
    }
}

/// Square grid of stones.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardState {
    size: usize,
    cells: Vec<Stone>,
}

impl BoardState {
    /// Empty board of the given side length.
    ///
    /// Panics if `size` is not one of [`SUPPORTED_SIZES`]; sizes are validated
    /// when a session config is built.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(SUPPORTED_SIZES.contains(&size), "unsupported board size {size}");
        Self {
            size,
            cells: vec![Stone::Empty; size * size],
        }
    }

    /// Side length.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Is the point on the board?
    #[must_use]
    pub fn in_bounds(&self, p: Point) -> bool {
        let n = self.size as i32;
        (0..n).contains(&p.x) && (0..n).contains(&p.y)
    }

    fn idx(&self, p: Point) -> usize {
        p.y as usize * self.size + p.x as usize
    }

    /// Cell contents; off-board points read as empty.
    #[must_use]
    pub fn get(&self, p: Point) -> Stone {
        if self.in_bounds(p) {
            self.cells[self.idx(p)]
        } else {
            Stone::Empty
        }
    }

    /// Overwrite a cell. Off-board writes are ignored.
    pub fn set(&mut self, p: Point, stone: Stone) {
        if self.in_bounds(p) {
            let i = self.idx(p);
            self.cells[i] = stone;
        }
    }

    /// Is the point on the board and empty?
    #[must_use]
    pub fn is_empty_at(&self, p: Point) -> bool {
        self.in_bounds(p) && self.get(p) == Stone::Empty
    }

    /// All points, row-major.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        let n = self.size as i32;
        (0..n).flat_map(move |y| (0..n).map(move |x| Point::new(x, y)))
    }

    /// Points holding the given color, row-major.
    pub fn stones_of(&self, color: Color) -> impl Iterator<Item = Point> + '_ {
        let stone = color.stone();
        self.points().filter(move |p| self.get(*p) == stone)
    }

    /// Empty points, row-major.
    pub fn empty_points(&self) -> impl Iterator<Item = Point> + '_ {
        self.points().filter(move |p| self.get(*p) == Stone::Empty)
    }

    /// Number of stones of a color.
    #[must_use]
    pub fn count(&self, color: Color) -> usize {
        let stone = color.stone();
        self.cells.iter().filter(|c| **c == stone).count()
    }

    /// Total stones on the board.
    #[must_use]
    pub fn stone_count(&self) -> usize {
        self.cells.iter().filter(|c| **c != Stone::Empty).count()
    }
}
