//! JSON report of the rules matching a request.

use std::io::{Error, Write};

use crate::request::Request;
use crate::url_rule::UrlFilterRule;

/// Write the JSON report of all rules matching a request to a destination.
pub fn write_json<W>(
    dst: &mut W,
    request: &Request,
    matches: &[&UrlFilterRule],
) -> Result<(), Error>
where
    W: Write,
{
    write!(dst, "{{\n\t\"url\": ")?;
    write_json_string(dst, request.url())?;
    write!(dst, ",\n\t\"third-party\": {}", request.is_third_party())?;
    write!(dst, ",\n\t\"content-type\": {}", request.content_types())?;
    write!(dst, ",\n\t\"matches\": [")?;

    for (i, rule) in matches.iter().enumerate() {
        if i != 0 {
            write!(dst, ",")?;
        }

        write!(dst, "\n\t\t{{\n\t\t\t\"rule\": ")?;
        write_json_string(dst, rule.rule_text())?;
        write!(dst, ",\n\t\t\t\"whitelist\": {}", rule.is_whitelist())?;
        write!(dst, ",\n\t\t\t\"document-level\": {}", rule.is_document_level())?;
        write!(dst, "\n\t\t}}")?;
    }

    if !matches.is_empty() {
        write!(dst, "\n\t")?;
    }
    writeln!(dst, "]\n}}")?;

    Ok(())
}

// Write JSON string with special characters escaped.
fn write_json_string<W>(dst: &mut W, s: &str) -> Result<(), Error>
where
    W: Write,
{
    write!(dst, "\"")?;
    for c in s.chars() {
        match c {
            '\\' | '"' => write!(dst, "\\{c}")?,
            c if c.is_control() => write!(dst, "\\u{:04x}", c as u32)?,
            _ => write!(dst, "{c}")?,
        }
    }
    write!(dst, "\"")
}
