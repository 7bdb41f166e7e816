//! JSON line I/O for the CLI
//!
//! - Input: one filter per line on stdin (batch mode)
//! - Output: one JSON object per line on stdout
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};
use crate::model::Object;

/// Reads filters from stdin, one per line, skipping blank lines
pub fn read_filters() -> impl Iterator<Item = CliResult<String>> {
    read_filters_from(io::stdin().lock())
}

/// Reads filters from any buffered reader
pub fn read_filters_from<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<String>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(Ok(line.trim().to_string())),
        Err(e) => Some(Err(CliError::from(e))),
    })
}

/// JSON view of a matching object
pub fn object_json(object: &Object) -> Value {
    json!({
        "id": object.id().get(),
        "guid": object.guid().to_string(),
        "dn": object.distinguished_name(),
        "sid": object.sid().map(|sid| sid.as_str()),
    })
}

/// Writes one JSON value as a line
pub fn write_line<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Writes a success summary line
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    write_line(
        out,
        &json!({
            "status": "ok",
            "data": data
        }),
    )
}

/// Writes an error line
pub fn write_error<W: Write>(out: &mut W, code: &str, message: &str) -> CliResult<()> {
    write_line(
        out,
        &json!({
            "status": "error",
            "code": code,
            "message": message
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObjectDraft, ObjectId, ObjectSource, ObjectStoreBuilder, Sid};

    #[test]
    fn test_read_filters_skips_blank_lines() {
        let input = "(cn=a)\n\n   \n  (cn=b)  \n";
        let filters: Vec<String> = read_filters_from(input.as_bytes())
            .collect::<CliResult<_>>()
            .unwrap();
        assert_eq!(filters, vec!["(cn=a)", "(cn=b)"]);
    }

    #[test]
    fn test_object_json() {
        let mut builder = ObjectStoreBuilder::new();
        builder.add(ObjectDraft::new("CN=A,DC=x").with_sid(Sid::new("S-1-5-21-1")));
        let store = builder.build().unwrap();
        let object = store.object(ObjectId::new(0)).unwrap();

        let value = object_json(object);
        assert_eq!(value["id"], 0);
        assert_eq!(value["dn"], "CN=A,DC=x");
        assert_eq!(value["sid"], "S-1-5-21-1");
    }

    #[test]
    fn test_error_line() {
        let mut out = Vec::new();
        write_error(&mut out, "DQ_CLI_QUERY_REJECTED", "bad filter").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));

        let parsed: Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["code"], "DQ_CLI_QUERY_REJECTED");
    }
}
