//! Vertex encoding used on the engine wire.
//!
//! Columns are letters `A`..`T` without `I`; rows count from 1 at the bottom,
//! so row = size - y for our top-origin `y`.

use crate::rules::Point;

/// Column letters, `I` skipped.
pub const COLUMNS: &[u8] = b"ABCDEFGHJKLMNOPQRST";

/// A decoded vertex token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vertex {
    /// A board point.
    Point(Point),
    /// `pass`.
    Pass,
    /// `resign`.
    Resign,
}

/// Encode a point for the given board size. The pass point encodes as `pass`.
#[must_use]
pub fn to_vertex(p: Point, size: usize) -> String {
    if p.is_pass() {
        return "pass".to_string();
    }
    let column = COLUMNS[p.x as usize] as char;
    let row = size as i32 - p.y;
    format!("{column}{row}")
}

/// Decode a vertex token. Returns `None` for anything malformed or off-board.
#[must_use]
pub fn parse_vertex(token: &str, size: usize) -> Option<Vertex> {
    let token = token.trim();
    if token.eq_ignore_ascii_case("pass") {
        return Some(Vertex::Pass);
    }
    if token.eq_ignore_ascii_case("resign") {
        return Some(Vertex::Resign);
    }

    let mut chars = token.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let x = COLUMNS.iter().position(|c| *c as char == letter)?;
    let row: i32 = chars.as_str().parse().ok()?;

    let size_i = size as i32;
    if x >= size || !(1..=size_i).contains(&row) {
        return None;
    }
    Some(Vertex::Point(Point::new(x as i32, size_i - row)))
}
