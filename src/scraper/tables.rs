//! Table normalization helpers.
//!
//! The source website publishes each day's lessons as an HTML table with
//! periods as rows and courses as columns. Merged cells (colspan across
//! adjacent courses, rowspan down consecutive periods) must be expanded by
//! duplicating the cell text into every covered position before the table
//! can be transposed into course rows.

/// One extracted table cell with its span attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub colspan: usize,
    pub rowspan: usize,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            colspan: 1,
            rowspan: 1,
        }
    }

    pub fn colspan(text: impl Into<String>, colspan: usize) -> Self {
        Self {
            text: text.into(),
            colspan,
            rowspan: 1,
        }
    }

    pub fn rowspan(text: impl Into<String>, rowspan: usize) -> Self {
        Self {
            text: text.into(),
            colspan: 1,
            rowspan,
        }
    }
}

/// Expand merged cells into a rectangular grid of strings.
///
/// Every position covered by a span receives its own copy of the cell text,
/// so later mutation of one slot never aliases another.
pub fn expand_spans(rows: &[Vec<Cell>]) -> Vec<Vec<String>> {
    let mut grid: Vec<Vec<Option<String>>> = Vec::with_capacity(rows.len());

    for (r, row) in rows.iter().enumerate() {
        if grid.len() <= r {
            grid.resize(r + 1, Vec::new());
        }
        let mut c = 0;
        for cell in row {
            // Skip positions already claimed by a rowspan from above.
            while grid[r].get(c).map(|slot| slot.is_some()).unwrap_or(false) {
                c += 1;
            }
            let colspan = cell.colspan.max(1);
            let rowspan = cell.rowspan.max(1);
            for dr in 0..rowspan {
                let rr = r + dr;
                if grid.len() <= rr {
                    grid.resize(rr + 1, Vec::new());
                }
                if grid[rr].len() < c + colspan {
                    grid[rr].resize(c + colspan, None);
                }
                for dc in 0..colspan {
                    grid[rr][c + dc] = Some(cell.text.clone());
                }
            }
            c += colspan;
        }
    }

    // Only rows that had source cells count; trailing rowspan spill into
    // rows the table does not have is dropped with them.
    grid.truncate(rows.len());
    grid.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|slot| slot.unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Transpose a grid, padding short rows with empty strings.
///
/// The output width is taken from the first row.
pub fn transpose(rows: &[Vec<String>]) -> Vec<Vec<String>> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let width = first.len();

    (0..width)
        .map(|i| {
            rows.iter()
                .map(|row| row.get(i).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Capitalize the first character and lowercase the rest.
pub fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Turn an expanded period-by-course grid into course rows.
///
/// The transposed header row (period labels) is discarded; each remaining
/// row yields `(course, lessons)` with lessons title-cased and blank periods
/// kept as empty strings.
pub fn table_to_courses(rows: &[Vec<String>]) -> Vec<(String, Vec<String>)> {
    transpose(rows)
        .into_iter()
        .skip(1)
        .filter(|row| !row.is_empty() && !row[0].trim().is_empty())
        .map(|row| {
            let course = row[0].trim().to_string();
            let lessons = row[1..].iter().map(|l| title_case(l.trim())).collect();
            (course, lessons)
        })
        .collect()
}
