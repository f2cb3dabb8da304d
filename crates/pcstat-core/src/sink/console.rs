//! Fixed-width table on stdout.

use std::fmt::Write as _;
use std::io::{self, Write};

use super::{ReportContext, ReportSink, SinkError};
use crate::model::{Index, IndexStats, pages_to_mb};

const NAME_HEADER: &str = "index_name";
const VALUE_HEADERS: [&str; 3] = ["cache (MB)", "pri cache", "rep cache"];
const VALUE_WIDTH: usize = 10;

fn border(name_width: usize) -> String {
    let mut line = format!("+{}+", "-".repeat(name_width + 2));
    for _ in VALUE_HEADERS {
        line.push_str(&"-".repeat(VALUE_WIDTH + 2));
        line.push('+');
    }
    line
}

fn row(out: &mut String, name_width: usize, index: &Index) {
    let _ = writeln!(
        out,
        "| {:<nw$} | {:>vw$} | {:>vw$} | {:>vw$} |",
        index.name,
        pages_to_mb(index.page_cache),
        pages_to_mb(index.primary_page_cache),
        pages_to_mb(index.replica_page_cache),
        nw = name_width,
        vw = VALUE_WIDTH,
    );
}

/// Renders the table: one row per index (by name, or by descending cache
/// when `sort_by_cache`), then the total row. Values are MB.
pub fn render_table(stats: &IndexStats, sort_by_cache: bool) -> String {
    let name_width = stats.max_name_len().max(NAME_HEADER.len());
    let rule = border(name_width);

    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = write!(out, "| {:<nw$} |", NAME_HEADER, nw = name_width);
    for header in VALUE_HEADERS {
        let _ = write!(out, " {:<vw$} |", header, vw = VALUE_WIDTH);
    }
    out.push('\n');
    let _ = writeln!(out, "{}", rule);

    let indices: Vec<&Index> = if sort_by_cache {
        stats.indices_by_cache()
    } else {
        stats.indices().collect()
    };
    for index in indices {
        row(&mut out, name_width, index);
    }

    let _ = writeln!(out, "{}", rule);
    row(&mut out, name_width, stats.total());
    let _ = writeln!(out, "{}", rule);
    out
}

/// Prints the table to any writer.
pub struct ConsoleSink<W: Write> {
    out: W,
    sort_by_cache: bool,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout(sort_by_cache: bool) -> Self {
        Self::new(io::stdout(), sort_by_cache)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, sort_by_cache: bool) -> Self {
        Self { out, sort_by_cache }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn name(&self) -> &'static str {
        "console"
    }

    fn report(&mut self, stats: &IndexStats, _ctx: &ReportContext) -> Result<(), SinkError> {
        self.out
            .write_all(render_table(stats, self.sort_by_cache).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}
