// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod contend;
pub mod probe;
pub mod stall;

use crate::error::Result;
use comfy_table::{Cell, CellAlignment, Table, presets::UTF8_BORDERS_ONLY};
use serde::Serialize;
use std::hint;

/// Busy work performed inside a critical section.
pub(crate) fn hold_for(spins: u32) {
    for _ in 0..spins {
        hint::spin_loop();
    }
}

/// Prints a report either as JSON or as a two-column table.
pub(crate) fn print_report<R: Serialize>(
    title: &str,
    rows: &[(&str, String)],
    report: &R,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![Cell::new(title), Cell::new("")]);
    for (label, value) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub(crate) fn ops_per_sec(operations: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        operations as f64 / elapsed_secs
    } else {
        0.0
    }
}
