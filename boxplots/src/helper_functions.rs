use std::env;
use std::path::{Path, PathBuf};

use polars::error::PolarsResult;
use polars::frame::DataFrame;
use polars::prelude::{CsvReadOptions, SerReader};

pub fn project_root() -> PathBuf {
    match env::var_os("PROJECT_ROOT") {
        Some(val) => PathBuf::from(val),
        None => {
            // Fall back to current directory if PROJECT_ROOT not set
            env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        }
    }
}

pub fn read_csv(file_path: impl AsRef<Path>) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(file_path.as_ref().to_path_buf()))?
        .finish()
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Pad a value range by `pct` of its span on both ends.
pub fn expand_range(min_val: f64, max_val: f64, pct: f64) -> (f64, f64) {
    if (max_val - min_val).abs() < 1e-9 {
        return (min_val - 1.0, max_val + 1.0);
    }
    let pad = (max_val - min_val) * pct;
    (min_val - pad, max_val + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        let lines = wrap_words("log2(normalised counts per million)", 20);
        assert_eq!(lines, vec!["log2(normalised", "counts per million)"]);
        for line in &lines {
            assert!(line.len() <= 20);
        }
    }

    #[test]
    fn wrap_keeps_long_words_whole() {
        assert_eq!(wrap_words("abcdefghij k", 4), vec!["abcdefghij", "k"]);
        assert!(wrap_words("   ", 4).is_empty());
    }

    #[test]
    fn flat_ranges_are_widened() {
        assert_eq!(expand_range(2.0, 2.0, 0.05), (1.0, 3.0));
        let (lo, hi) = expand_range(0.0, 10.0, 0.1);
        assert!((lo + 1.0).abs() < 1e-12 && (hi - 11.0).abs() < 1e-12);
    }
}
