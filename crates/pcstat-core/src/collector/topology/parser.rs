//! Parsers for the cluster's tabular `_cat` listings.
//!
//! Pure functions over the response text. Lines are split on `\n`, columns
//! on whitespace; blank lines are ignored.

use thiserror::Error;

/// Shard state kept by the catalog. Other states (RELOCATING, INITIALIZING,
/// UNASSIGNED) are skipped.
pub const STARTED: &str = "STARTED";

/// Marker of a primary copy in the `prirep` column.
const PRIMARY_MARKER: &str = "p";

const SHARD_COLUMNS: usize = 5;
const INDEX_COLUMNS: usize = 2;

/// A row that does not carry the columns the listing schema requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line number in the listing.
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, msg: impl Into<String>) -> Self {
        Self {
            line,
            message: msg.into(),
        }
    }
}

/// One started shard copy from `_cat/shards?h=state,index,shard,node,prirep`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardRow {
    pub index: String,
    pub shard: String,
    pub node: String,
    pub primary: bool,
}

/// One row of `_cat/indices?h=index,uuid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub name: String,
    pub uuid: String,
}

/// Non-blank lines with their 1-based line numbers, split into columns.
fn rows(content: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    content
        .split('\n')
        .enumerate()
        .map(|(i, line)| (i + 1, line.split_whitespace().collect::<Vec<_>>()))
        .filter(|(_, cols)| !cols.is_empty())
}

/// Parses the shard listing, returning only `STARTED` copies.
///
/// The state is checked before the column count: unassigned shards have an
/// empty node column and must not fail the whole listing.
pub fn parse_shard_listing(content: &str) -> Result<Vec<ShardRow>, ParseError> {
    let mut shards = Vec::new();
    for (line, cols) in rows(content) {
        if cols[0] != STARTED {
            continue;
        }
        if cols.len() < SHARD_COLUMNS {
            return Err(ParseError::new(
                line,
                format!(
                    "expected {} columns in shard row, got {}",
                    SHARD_COLUMNS,
                    cols.len()
                ),
            ));
        }
        shards.push(ShardRow {
            index: cols[1].to_string(),
            shard: cols[2].to_string(),
            node: cols[3].to_string(),
            primary: cols[4] == PRIMARY_MARKER,
        });
    }
    Ok(shards)
}

/// Parses the index listing.
pub fn parse_index_listing(content: &str) -> Result<Vec<IndexRow>, ParseError> {
    rows(content)
        .map(|(line, cols)| {
            if cols.len() < INDEX_COLUMNS {
                return Err(ParseError::new(
                    line,
                    format!(
                        "expected {} columns in index row, got {}",
                        INDEX_COLUMNS,
                        cols.len()
                    ),
                ));
            }
            Ok(IndexRow {
                name: cols[0].to_string(),
                uuid: cols[1].to_string(),
            })
        })
        .collect()
}
