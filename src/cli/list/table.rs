use std::fmt::{self, Write};

pub(crate) struct Row {
    cells: Vec<String>,
}

impl Row {
    fn is_awk_safe(&self) -> bool {
        self.cells
            .iter()
            .all(|cell| !cell.contains(|c: char| c.is_whitespace()))
    }

    fn columns(&self) -> usize {
        self.cells.len()
    }
}

pub(crate) trait IntoRow: Into<Row> + Sized {
    fn into_row(self) -> Row {
        self.into()
    }
}

impl<T> IntoRow for T where T: Into<Row> + Sized {}

impl From<Vec<String>> for Row {
    fn from(value: Vec<String>) -> Self {
        Row { cells: value }
    }
}

impl From<Vec<&str>> for Row {
    fn from(value: Vec<&str>) -> Self {
        let value: Vec<String> = value.into_iter().map(|s| s.to_owned()).collect();

        value.into()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Right,
}

pub(crate) struct Table {
    body: Vec<Row>,
    header: Option<Row>,
    num_columns: Option<usize>,
    alignments: Vec<Align>,
    print_header: bool,
}

impl Table {
    pub(crate) fn new() -> Table {
        Table {
            body: Vec::new(),
            header: None,
            num_columns: None,
            alignments: Vec::new(),
            print_header: true,
        }
    }

    fn expect_num_columns(&mut self, num_columns: usize) {
        match self.num_columns {
            Some(prev_num_columns) if prev_num_columns != num_columns => panic!(
                "Table has {} columns but a row with {} columns was inserted",
                prev_num_columns, num_columns
            ),
            Some(_) => {}
            None => {
                self.num_columns = Some(num_columns);
                self.alignments.resize(num_columns, Align::Left);
            }
        }
    }

    pub(crate) fn print_header(&mut self, print_header: bool) {
        self.print_header = print_header;
    }

    pub(crate) fn add_row<S: IntoRow>(&mut self, row: S) {
        let row = row.into_row();

        self.expect_num_columns(row.columns());

        self.body.push(row);
    }

    pub(crate) fn set_header<S: IntoRow>(&mut self, header: S) {
        let header = header.into_row();

        self.expect_num_columns(header.columns());

        if !header.is_awk_safe() {
            panic!("Table header is not awk safe, contains whitespace")
        }

        self.header.replace(header);
    }

    /// Sets the alignment of a column. Columns default to left alignment.
    pub(crate) fn align(&mut self, column: usize, align: Align) {
        if let Some(slot) = self.alignments.get_mut(column) {
            *slot = align;
        }
    }

    fn visible_rows(&self) -> Box<dyn Iterator<Item = &Row> + '_> {
        match self.print_header {
            true => Box::new(self.header.iter().chain(self.body.iter())),
            false => Box::new(self.body.iter()),
        }
    }

    fn column_widths(&self) -> Vec<usize> {
        let n_cols = match self.num_columns {
            Some(n_cols) => n_cols,
            None => return Vec::new(),
        };

        let mut widths = vec![0usize; n_cols];

        for row in self.visible_rows() {
            for (i, cell) in row.cells.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let widths = self.column_widths();

        for row in self.visible_rows() {
            for (i, cell) in row.cells.iter().enumerate() {
                let last = i == row.cells.len() - 1;

                match self.alignments[i] {
                    Align::Right => write!(f, "{:>width$}", cell, width = widths[i])?,
                    // Avoid trailing whitespace on the last column
                    Align::Left if last => f.write_str(cell)?,
                    Align::Left => write!(f, "{:<width$}", cell, width = widths[i])?,
                }

                if !last {
                    f.write_str("  ")?;
                }
            }

            f.write_char('\n')?;
        }

        Ok(())
    }
}

pub(crate) trait IntoTable: Into<Table> + Sized {
    fn into_table(self) -> Table {
        self.into()
    }
}

impl<T> IntoTable for T where T: Into<Table> + Sized {}
