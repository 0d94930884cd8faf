/*
 * Copyright (C) 2026 Mark Wells Dev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! CLI utilities for the `stats` table: colors, widths and row data.

use crossterm::tty::IsTty;
use std::fmt::Write as _;
use std::io::stdout;
use std::sync::Arc;

use crate::availability::{AvailabilityController, CollectionState, OperationRegistry};
use crate::bridge::tools::catalog;
use crate::error::Result;
use crate::store::{Collection, Store};

/// Configuration for color output
#[derive(Debug, Clone)]
pub struct ColorConfig {
    /// Whether ANSI escapes are emitted.
    pub enabled: bool,
}

impl ColorConfig {
    /// Create a new `ColorConfig`, auto-detecting TTY unless nocolor is true
    #[must_use]
    pub fn new(nocolor: bool) -> Self {
        Self {
            enabled: !nocolor && stdout().is_tty(),
        }
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }

    /// Green (non-empty collections)
    #[must_use]
    pub fn green(&self, s: &str) -> String {
        self.paint("32", s)
    }

    /// Red (empty collections)
    #[must_use]
    pub fn red(&self, s: &str) -> String {
        self.paint("31", s)
    }

    /// Cyan (collection names)
    #[must_use]
    pub fn cyan(&self, s: &str) -> String {
        self.paint("36", s)
    }

    /// Dim text (disabled tools)
    #[must_use]
    pub fn dim(&self, s: &str) -> String {
        self.paint("2", s)
    }
}

/// Get the terminal width, defaulting to 80 if unable to detect
#[must_use]
pub fn terminal_width() -> usize {
    crossterm::terminal::size().map_or(80, |(w, _)| usize::from(w))
}

/// Truncate a string to `max_len` characters, adding "..." if truncated
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if max_len <= 3 {
        return ".".repeat(max_len.min(3));
    }
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// Column width configuration for the stats command
#[derive(Debug)]
pub struct ColumnWidths {
    /// COLLECTION column.
    pub collection: usize,
    /// COUNT column.
    pub count: usize,
    /// STATE column.
    pub state: usize,
    /// TOOLS column, takes the rest.
    pub tools: usize,
}

impl ColumnWidths {
    /// Calculate column widths based on terminal width
    /// Columns: COLLECTION | COUNT | STATE | TOOLS
    #[must_use]
    pub const fn calculate(term_width: usize) -> Self {
        let collection = 11;
        let count = 6;
        let state = 10;
        let min_tools = 30;

        // 3 separators between 4 columns
        let fixed_space = collection + count + state + 3;
        let flexible = term_width.saturating_sub(fixed_space);
        Self {
            collection,
            count,
            state,
            tools: if flexible < min_tools { min_tools } else { flexible },
        }
    }
}

/// One line of the stats table.
#[derive(Debug, Clone)]
pub struct StatsRow {
    /// The collection.
    pub collection: Collection,
    /// Records in it.
    pub count: usize,
    /// Availability state.
    pub state: CollectionState,
    /// Tools gated on the collection, with their enabled flag.
    pub tools: Vec<(&'static str, bool)>,
}

/// Counts every collection and resolves which gated tools are enabled.
///
/// # Errors
///
/// Returns an error if a count fails.
pub async fn collect_stats(store: Arc<Store>) -> Result<Vec<StatsRow>> {
    let operations = Arc::new(OperationRegistry::new());
    for tool in catalog() {
        operations.register(tool.name, tool.gate);
    }
    let availability =
        AvailabilityController::initialize(Arc::clone(&store), Arc::clone(&operations)).await?;

    let mut rows = Vec::with_capacity(Collection::ALL.len());
    for collection in Collection::ALL {
        let count = store.count(collection).await?;
        let state = availability
            .state(collection)
            .await
            .unwrap_or_else(|| CollectionState::from_count(count));
        let tools = operations
            .dependents(collection)
            .into_iter()
            .map(|name| (name, operations.is_enabled(name).unwrap_or(false)))
            .collect();
        rows.push(StatsRow {
            collection,
            count,
            state,
            tools,
        });
    }
    Ok(rows)
}

/// Renders `rows` as a table.
#[must_use]
pub fn render_stats(rows: &[StatsRow], colors: &ColorConfig, widths: &ColumnWidths) -> String {
    let mut out = format!(
        "{:<cw$} {:>nw$} {:<sw$} TOOLS\n",
        "COLLECTION",
        "COUNT",
        "STATE",
        cw = widths.collection,
        nw = widths.count,
        sw = widths.state,
    );

    for row in rows {
        // Pad before coloring so escapes do not skew the columns.
        let name = format!("{:<w$}", row.collection.table(), w = widths.collection);
        let state = match row.state {
            CollectionState::Empty => colors.red(&format!("{:<w$}", "EMPTY", w = widths.state)),
            CollectionState::NonEmpty => {
                colors.green(&format!("{:<w$}", "NON_EMPTY", w = widths.state))
            }
        };
        let names: Vec<&str> = row.tools.iter().map(|(name, _)| *name).collect();
        let tools = truncate(&names.join(", "), widths.tools);
        let tools = if row.tools.iter().any(|(_, enabled)| *enabled) {
            tools
        } else {
            colors.dim(&tools)
        };
        let _ = writeln!(
            out,
            "{} {:>nw$} {state} {tools}",
            colors.cyan(&name),
            row.count,
            nw = widths.count,
        );
    }
    out
}
