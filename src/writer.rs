// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Serializes a materialized result matrix to either of the two formats
//! documented in `SPEC_FULL.md` §6.2.

use std::io::Write;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Row-major, whitespace-separated, one row per line.
    Text,
    /// `[[f64, ...], ...]`.
    Json,
}

impl std::str::FromStr for Format {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other => Err(Error::InvalidArgument(format!("unknown output format: {other}"))),
        }
    }
}

pub fn render(matrix: &[Vec<f64>], format: Format) -> Result<String> {
    match format {
        Format::Text => Ok(matrix
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")),
        Format::Json => serde_json::to_string_pretty(matrix)
            .map_err(|e| Error::IllegalState(format!("failed to serialize result: {e}"))),
    }
}

/// Writes the rendered matrix to `sink`, terminated with a trailing newline.
pub fn write_to<W: Write>(matrix: &[Vec<f64>], format: Format, mut sink: W) -> Result<()> {
    let rendered = render(matrix, format)?;
    writeln!(sink, "{rendered}")
        .map_err(|e| Error::IllegalState(format!("failed to write result: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_text_format() {
        let m = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(render(&m, Format::Text).unwrap(), "1 2\n3 4");
    }

    #[test]
    fn renders_json_format() {
        let m = vec![vec![1.0, 2.0]];
        let rendered = render(&m, Format::Json).unwrap();
        let parsed: Vec<Vec<f64>> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, m);
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert!("yaml".parse::<Format>().is_err());
    }

    #[test]
    fn write_to_appends_trailing_newline() {
        let mut buf = Vec::new();
        write_to(&[vec![1.0]], Format::Text, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1\n");
    }
}
