//! Parses exit-sweep "simulation set" files: one non-empty line per set,
//! each set a sequence of `<lin> <col><sep>` tokens where `<sep>` is `+`
//! (continues the current exit), `,` (starts a new exit) or `.` (ends the
//! line).

use anyhow::{bail, Context, Result};

use crate::sim::geometry::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitSetDescription {
    pub exits: Vec<Vec<Coordinate>>,
}

pub fn parse(text: &str) -> Result<Vec<ExitSetDescription>> {
    let mut sets = Vec::new();
    for (line_index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let set = parse_line(line).with_context(|| format!("simulation set on line {}", line_index + 1))?;
        sets.push(set);
    }
    Ok(sets)
}

fn parse_line(line: &str) -> Result<ExitSetDescription> {
    let is_separator = |c: char| matches!(c, '+' | ',' | '.');

    let separators: Vec<char> = line.chars().filter(|&c| is_separator(c)).collect();
    if separators.last() != Some(&'.') {
        bail!("simulation set line must be terminated with '.'");
    }

    let chunks: Vec<&str> = line
        .split(is_separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if chunks.len() != separators.len() {
        bail!("malformed simulation set line: coordinate/separator count mismatch");
    }

    let mut exits = Vec::new();
    let mut current_exit = Vec::new();

    for (chunk, separator) in chunks.iter().zip(separators.iter()) {
        current_exit.push(parse_coordinate(chunk)?);
        if *separator != '+' {
            exits.push(std::mem::take(&mut current_exit));
        }
    }

    Ok(ExitSetDescription { exits })
}

fn parse_coordinate(chunk: &str) -> Result<Coordinate> {
    let mut fields = chunk.split_whitespace();
    let line: i32 = fields
        .next()
        .with_context(|| format!("missing line coordinate in '{chunk}'"))?
        .parse()
        .with_context(|| format!("invalid line coordinate in '{chunk}'"))?;
    let column: i32 = fields
        .next()
        .with_context(|| format!("missing column coordinate in '{chunk}'"))?
        .parse()
        .with_context(|| format!("invalid column coordinate in '{chunk}'"))?;
    if fields.next().is_some() {
        bail!("unexpected trailing tokens in '{chunk}'");
    }
    Ok(Coordinate::new(line, column))
}
