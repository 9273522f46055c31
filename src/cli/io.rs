//! JSON output for the CLI
//!
//! - One JSON object per line on stdout
//! - `{"status": "ok", "data": ...}` or `{"status": "error", "code", "message"}`

use std::io::{self, Write};

use serde_json::{json, Value};

use super::errors::CliResult;

/// Write a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    write_line(out, &json!({ "status": "ok", "data": data }))
}

/// Write an error response
pub fn write_error<W: Write>(out: &mut W, code: &str, message: &str) -> CliResult<()> {
    write_line(
        out,
        &json!({ "status": "error", "code": code, "message": message }),
    )
}

fn write_line<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write a success response to stdout
pub fn print_response(data: Value) -> CliResult<()> {
    write_response(&mut io::stdout().lock(), data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_line() {
        let mut out = Vec::new();
        write_response(&mut out, json!({"count": 2})).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        let value: Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(value, json!({"status": "ok", "data": {"count": 2}}));
    }

    #[test]
    fn test_error_line() {
        let mut out = Vec::new();
        write_error(&mut out, "FLEX_X", "broken").unwrap();

        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["code"], "FLEX_X");
    }
}
