//! CLI tool for vgrid - drives a headless grid over JSON rows and prints render stats
//!
//! Usage:
//!   vgrid_cli <items.json>                   # Render the first screen, print stats
//!   vgrid_cli <items.json> --scroll 50000    # Scroll, flush timers, print stats
//!   vgrid_cli --generate 1000000 --scroll 2e7
//!
//! Set `RUST_LOG=vgrid=debug` for render tracing.

#![allow(clippy::exit)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::env;
use std::fs;
use std::io::{self, Write};

use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;
use vgrid::{Column, GeneratedDataSource, GridBuilder, Item, RecordingSurface, VecDataSource};

const USAGE: &str = "Usage: vgrid_cli (<items.json> | --generate N) [--scroll Y] [--height H]";

fn parse_number(flag: &str, value: Option<&String>) -> f64 {
    match value.map(|v| v.parse::<f64>()) {
        Some(Ok(n)) => n,
        _ => {
            eprintln!("{flag} expects a number\n{USAGE}");
            std::process::exit(1);
        }
    }
}

fn load_items(path: &str) -> Vec<Item> {
    let data = match fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading {}: {}", path, e);
            std::process::exit(1);
        }
    };
    match serde_json::from_str::<Vec<Item>>(&data) {
        Ok(items) => items,
        Err(e) => {
            eprintln!("Error parsing items: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }

    let mut scroll = None;
    let mut height = 600.0;
    let mut generate = None;
    let mut input = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--scroll" => {
                scroll = Some(parse_number("--scroll", args.get(i + 1)));
                i += 1;
            }
            "--height" => {
                height = parse_number("--height", args.get(i + 1));
                i += 1;
            }
            "--generate" => {
                generate = Some(parse_number("--generate", args.get(i + 1)));
                i += 1;
            }
            other => input = Some(other.to_string()),
        }
        i += 1;
    }

    let builder = GridBuilder::new(RecordingSurface::new()).size(800.0, height);
    let builder = match (generate, input) {
        (Some(n), _) => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let rows = n.max(0.0) as usize;
            builder
                .columns(vec![Column::new("id"), Column::new("title").with_width(200.0)])
                .data(GeneratedDataSource::new(rows, |row| {
                    let mut item = Item::new();
                    item.insert("id".into(), json!(row));
                    item.insert("title".into(), json!(format!("Row {row}")));
                    item
                }))
        }
        (None, Some(path)) => {
            let items = load_items(&path);
            let columns = items
                .first()
                .map(|item| item.keys().map(Column::new).collect())
                .unwrap_or_default();
            builder.columns(columns).data(VecDataSource::new(items))
        }
        (None, None) => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    let mut grid = match builder.build() {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error building grid: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(top) = scroll {
        grid.handle_scroll(top, 0.0);
    }
    grid.run_pending_timers();

    let surface = grid.surface().stats();
    let report: Value = json!({
        "grid": grid.debug_stats(),
        "surface": {
            "rowsCreated": surface.rows_created,
            "rowsRemoved": surface.rows_removed,
            "cellsCreated": surface.cells_created,
            "cellsRemoved": surface.cells_removed,
            "liveNodes": grid.surface().live_nodes(),
        },
        "visibleRows": grid.surface().visible_rows(),
    });

    let text = serde_json::to_string_pretty(&report).unwrap();
    io::stdout().write_all(text.as_bytes()).unwrap();
    println!();
}
