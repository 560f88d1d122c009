// SPDX-License-Identifier: Apache-2.0

//! Result-matrix I/O: printf-style cell formats, atomic whitespace-delimited
//! writes, and the matching reader.

use std::io::Write;
use std::path::Path;

/// Cell format used when the caller does not supply one.
pub const DEFAULT_FORMAT: &str = "%10.10f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Fixed,
    LowerExp,
    UpperExp,
}

/// A printf-style floating point cell format: `%[width][.precision](f|e|E)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub width: usize,
    pub precision: usize,
    pub conversion: Conversion,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat {
            width: 10,
            precision: 10,
            conversion: Conversion::Fixed,
        }
    }
}

/// An error parsing a printf-style format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    pub msg: String,
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "format error: {}", self.msg)
    }
}

impl std::error::Error for FormatError {}

impl std::str::FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('%').ok_or_else(|| FormatError {
            msg: format!("expected leading '%'; got {:?}", s),
        })?;
        let (spec, conversion) = match rest.chars().last() {
            Some('f') => (&rest[..rest.len() - 1], Conversion::Fixed),
            Some('e') => (&rest[..rest.len() - 1], Conversion::LowerExp),
            Some('E') => (&rest[..rest.len() - 1], Conversion::UpperExp),
            Some(other) => {
                return Err(FormatError {
                    msg: format!("unsupported conversion {:?}; expected 'f', 'e' or 'E'", other),
                })
            }
            None => {
                return Err(FormatError {
                    msg: "empty format after '%'".to_string(),
                })
            }
        };
        let (width_text, precision_text) = match spec.split_once('.') {
            Some((w, p)) => (w, Some(p)),
            None => (spec, None),
        };
        let width = if width_text.is_empty() {
            0
        } else {
            width_text.parse::<usize>().map_err(|_| FormatError {
                msg: format!("invalid width {:?}", width_text),
            })?
        };
        // printf defaults the precision to 6 when '.' is absent.
        let precision = match precision_text {
            None => 6,
            Some("") => 0,
            Some(p) => p.parse::<usize>().map_err(|_| FormatError {
                msg: format!("invalid precision {:?}", p),
            })?,
        };
        Ok(OutputFormat {
            width,
            precision,
            conversion,
        })
    }
}

impl OutputFormat {
    /// Renders one value as a cell.
    pub fn render(&self, value: f64) -> String {
        match self.conversion {
            Conversion::Fixed => {
                format!("{:>w$.p$}", value, w = self.width, p = self.precision)
            }
            Conversion::LowerExp => {
                format!("{:>w$.p$e}", value, w = self.width, p = self.precision)
            }
            Conversion::UpperExp => {
                format!("{:>w$.p$E}", value, w = self.width, p = self.precision)
            }
        }
    }
}

/// Writes the matrix one row per line, cells separated by a single space.
///
/// The write is atomic: rows are rendered into a temporary file in the
/// destination directory which is persisted over `path` only once fully
/// written, so a crash or ^C mid-write cannot leave a truncated matrix
/// behind.
pub fn write_matrix(
    path: &Path,
    points: &[Vec<f64>],
    format: &OutputFormat,
) -> Result<(), std::io::Error> {
    let mut rendered = String::new();
    for point in points {
        let row: Vec<String> = point.iter().map(|&v| format.render(v)).collect();
        rendered.push_str(&row.join(" "));
        rendered.push('\n');
    }
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmpfile = tempfile::NamedTempFile::new_in(dir)?;
    tmpfile.write_all(rendered.as_bytes())?;
    tmpfile.flush()?;
    tmpfile.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Errors from [`read_matrix`].
#[derive(Debug)]
pub enum MatrixReadError {
    Io { path: String, message: String },
    BadNumber { line: usize, token: String },
    RaggedRow { line: usize, expected: usize, actual: usize },
}

impl std::fmt::Display for MatrixReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatrixReadError::Io { path, message } => {
                write!(f, "could not read matrix file {}: {}", path, message)
            }
            MatrixReadError::BadNumber { line, token } => {
                write!(f, "line {}: invalid number {:?}", line, token)
            }
            MatrixReadError::RaggedRow {
                line,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "line {}: row has {} column(s), expected {}",
                    line, actual, expected
                )
            }
        }
    }
}

impl std::error::Error for MatrixReadError {}

/// Reads a whitespace-delimited matrix. Blank lines and `#` comment lines
/// are skipped; every data row must have the same number of columns as the
/// first.
pub fn read_matrix(path: &Path) -> Result<Vec<Vec<f64>>, MatrixReadError> {
    let contents = std::fs::read_to_string(path).map_err(|e| MatrixReadError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut row = Vec::new();
        for token in line.split_whitespace() {
            let value = token.parse::<f64>().map_err(|_| MatrixReadError::BadNumber {
                line: lineno + 1,
                token: token.to_string(),
            })?;
            row.push(value);
        }
        if let Some(first) = rows.first() {
            if row.len() != first.len() {
                return Err(MatrixReadError::RaggedRow {
                    line: lineno + 1,
                    expected: first.len(),
                    actual: row.len(),
                });
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("%10.10f", OutputFormat { width: 10, precision: 10, conversion: Conversion::Fixed }; "default style")]
    #[test_case("%f", OutputFormat { width: 0, precision: 6, conversion: Conversion::Fixed }; "bare f")]
    #[test_case("%.3f", OutputFormat { width: 0, precision: 3, conversion: Conversion::Fixed }; "precision only")]
    #[test_case("%12f", OutputFormat { width: 12, precision: 6, conversion: Conversion::Fixed }; "width only")]
    #[test_case("%8.2e", OutputFormat { width: 8, precision: 2, conversion: Conversion::LowerExp }; "lower exp")]
    #[test_case("%.4E", OutputFormat { width: 0, precision: 4, conversion: Conversion::UpperExp }; "upper exp")]
    #[test_case("%5.f", OutputFormat { width: 5, precision: 0, conversion: Conversion::Fixed }; "dot without digits")]
    fn format_strings_parse(text: &str, expected: OutputFormat) {
        assert_eq!(text.parse::<OutputFormat>().unwrap(), expected);
    }

    #[test_case(""; "empty")]
    #[test_case("10.10f"; "missing percent")]
    #[test_case("%"; "bare percent")]
    #[test_case("%10.10d"; "integer conversion")]
    #[test_case("%x.2f"; "bad width")]
    #[test_case("%2.yf"; "bad precision")]
    fn bad_format_strings_are_rejected(text: &str) {
        assert!(text.parse::<OutputFormat>().is_err());
    }

    #[test]
    fn default_format_matches_the_constant() {
        assert_eq!(
            DEFAULT_FORMAT.parse::<OutputFormat>().unwrap(),
            OutputFormat::default()
        );
    }

    #[test]
    fn render_fixed() {
        let format: OutputFormat = "%10.10f".parse().unwrap();
        assert_eq!(format.render(0.5), "0.5000000000");
        assert_eq!(format.render(0.0), "0.0000000000");
    }

    #[test]
    fn render_pads_to_width() {
        let format: OutputFormat = "%8.2f".parse().unwrap();
        assert_eq!(format.render(0.5), "    0.50");
    }

    #[test]
    fn render_lower_exp() {
        let format: OutputFormat = "%.3e".parse().unwrap();
        assert_eq!(format.render(0.5), "5.000e-1");
    }

    #[test]
    fn write_then_read_preserves_shape_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let points = vec![vec![0.1, 0.2], vec![0.30000000004, 0.4]];
        let format: OutputFormat = "%10.10f".parse().unwrap();
        write_matrix(&path, &points, &format).unwrap();
        let back = read_matrix(&path).unwrap();
        assert_eq!(back.len(), 2);
        for (row, expected_row) in back.iter().zip(points.iter()) {
            assert_eq!(row.len(), 2);
            for (value, expected) in row.iter().zip(expected_row.iter()) {
                assert!((value - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn write_replaces_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "stale contents\n").unwrap();
        let format = OutputFormat::default();
        write_matrix(&path, &[vec![0.5]], &format).unwrap();
        let back = read_matrix(&path).unwrap();
        assert_eq!(back, vec![vec![0.5]]);
    }

    #[test]
    fn read_skips_comments_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.txt");
        std::fs::write(&path, "# header\n\n0.1 0.2\n\n# trailing\n0.3 0.4\n").unwrap();
        let back = read_matrix(&path).unwrap();
        assert_eq!(back, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn read_rejects_bad_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.txt");
        std::fs::write(&path, "0.1 zebra\n").unwrap();
        let err = read_matrix(&path).unwrap_err();
        assert!(matches!(err, MatrixReadError::BadNumber { line: 1, .. }));
    }

    #[test]
    fn read_rejects_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.txt");
        std::fs::write(&path, "0.1 0.2\n0.3\n").unwrap();
        let err = read_matrix(&path).unwrap_err();
        assert!(matches!(
            err,
            MatrixReadError::RaggedRow {
                line: 2,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn read_missing_file_is_an_io_error() {
        let err = read_matrix(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, MatrixReadError::Io { .. }));
    }
}
