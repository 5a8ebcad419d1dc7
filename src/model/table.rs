use std::collections::{HashMap, HashSet};

/// Makes header labels unique without dropping any column.
///
/// The first occurrence of a label is kept as is; later ones become
/// `label_1`, `label_2`, ... Generated labels skip anything already taken, so
/// the output never contains duplicates and re-applying it changes nothing.
pub fn dedupe_headers<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(labels.len());
    let mut counters: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::with_capacity(labels.len());

    for label in labels {
        let label = label.as_ref();
        if used.insert(label.to_string()) {
            out.push(label.to_string());
            continue;
        }

        let counter = counters.entry(label).or_insert(0);
        let candidate = loop {
            *counter += 1;
            let candidate = format!("{label}_{counter}");
            if !used.contains(&candidate) {
                break candidate;
            }
        };
        used.insert(candidate.clone());
        out.push(candidate);
    }

    out
}

/// Rectangular table keyed by a header row. All cells are text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Builds a table from raw sheet values: first row is the header row.
    ///
    /// The sheet API trims trailing blank cells, so short rows are padded;
    /// cells beyond the header width are dropped.
    pub fn from_values(mut values: Vec<Vec<String>>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let rows = values.split_off(1);
        let headers = dedupe_headers(&values[0]);
        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Keeps only rows whose cell in `column` is non-blank after trimming.
    /// A table without that column is returned unchanged.
    pub fn retain_non_blank(&mut self, column: &str) {
        if let Some(idx) = self.column_index(column) {
            self.rows.retain(|row| !row[idx].trim().is_empty());
        }
    }
}
