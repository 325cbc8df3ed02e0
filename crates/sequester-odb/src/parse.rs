//! Record parsers for host tool output.
//!
//! Parsers work on raw bytes because paths in tree listings and diffs are
//! not guaranteed to be UTF-8. Each parser returns a reason string on
//! failure; the caller wraps it into [`OdbError::Malformed`] together with
//! the offending line and command.
//!
//! [`OdbError::Malformed`]: crate::error::OdbError::Malformed

use sequester_types::{ObjectDescriptor, ObjectId, ObjectKind};

/// Parse result carrying a human-readable reason on failure.
pub type ParseResult<T> = Result<T, String>;

fn fields(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(|b| b.is_ascii_whitespace()).filter(|f| !f.is_empty())
}

fn parse_id(field: &[u8]) -> ParseResult<ObjectId> {
    ObjectId::from_hex_bytes(field).map_err(|e| e.to_string())
}

/// Parse one `cat-file --batch-check` line: `<id> <kind> <size>`.
pub fn parse_catalog_line(line: &[u8]) -> ParseResult<ObjectDescriptor> {
    let parts: Vec<&[u8]> = fields(line).collect();
    let [id, kind, size] = parts.as_slice() else {
        return Err(format!("expected 3 fields, found {}", parts.len()));
    };

    let id = parse_id(id)?;
    let kind: ObjectKind = std::str::from_utf8(kind)
        .map_err(|_| "object kind is not UTF-8".to_string())?
        .parse()
        .map_err(|e: sequester_types::TypeError| e.to_string())?;
    let size = std::str::from_utf8(size)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| "size is not a decimal integer".to_string())?;

    Ok(ObjectDescriptor::new(id, kind, size))
}

/// Parse one `ls-tree -r` line: `<mode> <kind> <id>\t<path>`.
pub fn parse_tree_line(line: &[u8]) -> ParseResult<ObjectId> {
    let meta = match line.iter().position(|b| *b == b'\t') {
        Some(tab) => &line[..tab],
        None => return Err("missing tab before path".into()),
    };
    let parts: Vec<&[u8]> = fields(meta).collect();
    match parts.as_slice() {
        [_mode, _kind, id] => parse_id(id),
        _ => Err(format!("expected 3 fields before path, found {}", parts.len())),
    }
}

/// Parse one line of `diff-tree --raw` output, including combined (`-c`)
/// records for merges.
///
/// A record with `n` leading colons compares against `n` parents and carries
/// `n + 1` modes, `n` old-side identifiers, one new-side identifier and a
/// status. Every non-null identifier on either side is returned. Blank lines
/// and bare commit-id header lines yield no identifiers.
pub fn parse_raw_diff_line(line: &[u8]) -> ParseResult<Vec<ObjectId>> {
    if line.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Vec::new());
    }

    let colons = line.iter().take_while(|b| **b == b':').count();
    if colons == 0 {
        return match parse_id(line.trim_ascii()) {
            Ok(_) => Ok(Vec::new()),
            Err(_) => Err("expected a raw diff record".into()),
        };
    }

    let meta = match line.iter().position(|b| *b == b'\t') {
        Some(tab) => &line[colons..tab],
        None => &line[colons..],
    };
    let parts: Vec<&[u8]> = fields(meta).collect();
    let expected = 2 * colons + 3;
    if parts.len() != expected {
        return Err(format!(
            "expected {expected} fields for a {colons}-parent record, found {}",
            parts.len()
        ));
    }

    let mut ids = Vec::with_capacity(colons + 1);
    for field in &parts[colons + 1..2 * colons + 2] {
        let id = parse_id(field)?;
        if !id.is_null() {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Parse the pack name printed by `pack-objects`.
pub fn parse_pack_name(stdout: &[u8]) -> ParseResult<String> {
    let name = stdout.trim_ascii();
    if name.is_empty() {
        return Err("no pack name printed".into());
    }
    parse_id(name)?;
    Ok(String::from_utf8_lossy(name).into_owned())
}
