//! Table reconstruction from positioned characters.
//!
//! Characters are grouped into words, words into lines, and each line is split
//! into cells wherever the horizontal gap between words is wider than a
//! column gutter. A run of consecutive multi-cell lines forms a table. Rows
//! with fewer cells than the header are kept when each cell lines up with a
//! header column; the missing columns become empty cells.

use super::Table;

/// Characters further apart than this (PDF points) belong to different words
const WORD_SPACING_THRESHOLD: f32 = 3.0;

/// Words further apart than this on one line belong to different cells
const CELL_GAP_THRESHOLD: f32 = 12.0;

/// Maximum distance between a cell's left edge and its column anchor
const COLUMN_ALIGN_TOLERANCE: f32 = 6.0;

const MIN_TABLE_ROWS: usize = 2;
const MIN_TABLE_COLUMNS: usize = 2;

/// A character with its bounding box in PDF points (bottom-left origin)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionedChar {
    pub ch: char,
    pub left: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Word {
    text: String,
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
}

impl Word {
    fn center_y(&self) -> f32 {
        (self.bottom + self.top) / 2.0
    }

    fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    left: f32,
}

/// Detect tables in a page's characters, in top-to-bottom order
pub fn detect_tables(chars: &[PositionedChar]) -> Vec<Table> {
    let words = group_chars_into_words(chars);
    let lines = group_words_into_lines(words);
    let rows: Vec<Vec<Cell>> = lines.iter().map(|line| split_cells(line)).collect();

    let mut tables = Vec::new();
    let mut index = 0;
    while index < rows.len() {
        if rows[index].len() < MIN_TABLE_COLUMNS {
            index += 1;
            continue;
        }

        let anchors: Vec<f32> = rows[index].iter().map(|c| c.left).collect();
        let mut table_rows = vec![rows[index].iter().map(|c| c.text.clone()).collect()];
        let mut next = index + 1;
        while next < rows.len() {
            match align_row(&rows[next], &anchors) {
                Some(row) => table_rows.push(row),
                None => break,
            }
            next += 1;
        }

        if table_rows.len() >= MIN_TABLE_ROWS {
            tables.push(Table { rows: table_rows });
            index = next;
        } else {
            index += 1;
        }
    }

    tables
}

fn group_chars_into_words(chars: &[PositionedChar]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current: Vec<PositionedChar> = Vec::new();

    for &ch in chars {
        if ch.ch.is_whitespace() {
            finalize_word(&mut current, &mut words);
            continue;
        }

        if let Some(last) = current.last() {
            let vertical_distance = (ch.bottom - last.bottom).abs();
            let horizontal_gap = ch.left - (last.left + last.width);
            if vertical_distance > last.height * 0.5 || horizontal_gap > WORD_SPACING_THRESHOLD {
                finalize_word(&mut current, &mut words);
            }
        }

        current.push(ch);
    }
    finalize_word(&mut current, &mut words);

    words
}

fn finalize_word(chars: &mut Vec<PositionedChar>, words: &mut Vec<Word>) {
    if chars.is_empty() {
        return;
    }

    let text: String = chars.iter().map(|c| c.ch).collect();
    let left = chars.iter().map(|c| c.left).fold(f32::INFINITY, f32::min);
    let right = chars
        .iter()
        .map(|c| c.left + c.width)
        .fold(f32::NEG_INFINITY, f32::max);
    let bottom = chars.iter().map(|c| c.bottom).fold(f32::INFINITY, f32::min);
    let top = chars
        .iter()
        .map(|c| c.bottom + c.height)
        .fold(f32::NEG_INFINITY, f32::max);

    words.push(Word {
        text,
        left,
        right,
        bottom,
        top,
    });
    chars.clear();
}

/// Lines ordered top of page first, words within a line left to right
fn group_words_into_lines(mut words: Vec<Word>) -> Vec<Vec<Word>> {
    words.sort_by(|a, b| b.center_y().total_cmp(&a.center_y()));

    let mut lines: Vec<Vec<Word>> = Vec::new();
    for word in words {
        let joins_last = lines.last().is_some_and(|line| {
            let anchor = &line[0];
            let tolerance = (anchor.height().max(word.height()) * 0.5).max(1.0);
            (anchor.center_y() - word.center_y()).abs() <= tolerance
        });

        match lines.last_mut() {
            Some(line) if joins_last => line.push(word),
            _ => lines.push(vec![word]),
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.left.total_cmp(&b.left));
    }
    lines
}

fn split_cells(line: &[Word]) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    let mut previous_right: Option<f32> = None;

    for word in line {
        let starts_cell =
            previous_right.is_none_or(|right| word.left - right > CELL_GAP_THRESHOLD);
        match cells.last_mut() {
            Some(cell) if !starts_cell => {
                cell.text.push(' ');
                cell.text.push_str(&word.text);
            }
            _ => cells.push(Cell {
                text: word.text.clone(),
                left: word.left,
            }),
        }
        previous_right = Some(word.right);
    }

    cells
}

/// Map a row's cells onto the header columns, or `None` if the row does not fit
fn align_row(cells: &[Cell], anchors: &[f32]) -> Option<Vec<String>> {
    if cells.len() < MIN_TABLE_COLUMNS || cells.len() > anchors.len() {
        return None;
    }
    if cells.len() == anchors.len() {
        return Some(cells.iter().map(|c| c.text.clone()).collect());
    }

    let mut row = vec![String::new(); anchors.len()];
    let mut column = 0;
    for cell in cells {
        while column < anchors.len()
            && (cell.left - anchors[column]).abs() > COLUMN_ALIGN_TOLERANCE
        {
            column += 1;
        }
        if column == anchors.len() {
            return None;
        }
        row[column] = cell.text.clone();
        column += 1;
    }
    Some(row)
}
