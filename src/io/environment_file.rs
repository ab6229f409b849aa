//! Parses the `{#, _, ., p, P}` environment text format into an
//! [`EnvironmentDescription`].

use anyhow::{bail, Context, Result};

use crate::sim::environment::EnvironmentDescription;
use crate::sim::geometry::Coordinate;

/// Parses the full environment file text (header line `L C`, followed by
/// `L` rows of `C` characters).
pub fn parse(text: &str) -> Result<EnvironmentDescription> {
    let mut lines = text.lines();

    let header = lines.next().context("environment file is empty")?;
    let mut header_fields = header.split_whitespace();
    let rows: usize = header_fields
        .next()
        .context("missing row count in header")?
        .parse()
        .context("row count is not a valid integer")?;
    let columns: usize = header_fields
        .next()
        .context("missing column count in header")?
        .parse()
        .context("column count is not a valid integer")?;

    let mut walls = vec![vec![false; columns]; rows];
    let mut doors = vec![vec![false; columns]; rows];
    let mut pedestrian_origins = Vec::new();

    for line_index in 0..rows {
        let row = lines
            .next()
            .with_context(|| format!("missing row {line_index} (expected {rows} rows)"))?;
        let chars: Vec<char> = row.chars().collect();
        if chars.len() != columns {
            bail!(
                "row {line_index} has {} characters, expected {columns}",
                chars.len()
            );
        }

        for (column_index, &ch) in chars.iter().enumerate() {
            match ch.to_ascii_lowercase() {
                '#' => walls[line_index][column_index] = true,
                '_' => {
                    walls[line_index][column_index] = true;
                    doors[line_index][column_index] = true;
                }
                '.' => {}
                'p' => {
                    pedestrian_origins.push(Coordinate::new(line_index as i32, column_index as i32));
                }
                other => bail!("unrecognized cell character '{other}' at ({line_index},{column_index})"),
            }
        }
    }

    Ok(EnvironmentDescription {
        rows,
        columns,
        walls,
        doors,
        pedestrian_origins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_layout() {
        let text = "3 3\n#_#\n...\n#P#\n";
        let description = parse(text).unwrap();
        assert_eq!(description.rows, 3);
        assert_eq!(description.columns, 3);
        assert!(description.walls[0][0]);
        assert!(description.doors[0][1]);
        assert!(!description.doors[0][0]);
        assert_eq!(description.pedestrian_origins, vec![Coordinate::new(2, 1)]);
    }

    #[test]
    fn rejects_short_row() {
        let text = "2 3\n##\n...\n";
        assert!(parse(text).is_err());
    }

    #[test]
    fn rejects_unknown_character() {
        let text = "1 1\nX\n";
        assert!(parse(text).is_err());
    }
}
