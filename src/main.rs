use std::fmt::Write as _;
use std::fs::{read_to_string, write};
use std::path::{Path, PathBuf};

use _model::{MerchantId, ZoneKind};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use locations::store::ImportRecord;
use locations::{codec, query, snapshot, LocationStore};
use rayon::prelude::*;
use serde::Deserialize;

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Bulk-import merchants from a jsonl dump; only scalar pairs are
    /// written, everything else is derived on the way in
    Import { data: PathBuf, db: PathBuf },
    /// Normalize historical location documents and write the recovered
    /// coordinates back through the store
    Backfill { data: PathBuf, db: PathBuf },
    /// Convert parked legacy zone documents to native values
    MigrateZones { db: PathBuf },
    /// Scan for records whose derived fields disagree with their scalars
    Doctor { db: PathBuf },
    Near {
        db: PathBuf,
        lat: f64,
        lng: f64,
        #[arg(default_value_t = 2000.0)]
        radius: f64,
    },
    Covering {
        db: PathBuf,
        #[arg(value_enum)]
        zone: ZoneKind,
        lat: f64,
        lng: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Import { data, db } => import(&data, &db),
        Command::Backfill { data, db } => backfill(&data, &db),
        Command::MigrateZones { db } => migrate_zones(&db),
        Command::Doctor { db } => doctor(&db),
        Command::Near {
            db,
            lat,
            lng,
            radius,
        } => near(&db, lat, lng, radius),
        Command::Covering { db, zone, lat, lng } => covering(&db, zone, lat, lng),
    }
}

fn import(data: &Path, db: &Path) -> Result<()> {
    let input = read_to_string(data).context("failed to read import data")?;
    let lines: Vec<&str> = input.lines().filter(|l| !l.trim().is_empty()).collect();

    eprintln!("Parsing {} rows...", lines.len());
    let pb = progress_bar(lines.len() as u64);
    let mut records = Vec::with_capacity(lines.len());
    for chunk in &lines.iter().chunks(65535) {
        let chunk: Vec<_> = chunk.collect();
        let chunk: Vec<Result<ImportRecord>> = chunk
            .par_iter()
            .map(|x| {
                serde_json::from_str(x).with_context(|| format!("Failed to parse row: {x}"))
            })
            .collect();
        for record in chunk {
            records.push(record?);
            pb.inc(1);
        }
    }
    pb.finish_and_clear();

    let mut store = open_or_new(db)?;
    let outcome = store.import_merchants(records);

    println!("## Statistics");
    println!("- {} created", outcome.created);
    println!("- {} located, {} unset", outcome.located, outcome.unset);
    println!("- {} failed", outcome.failed.len());

    if !outcome.failed.is_empty() {
        let mut todo = String::new();
        writeln!(todo, "- rows rejected by the location write:")?;
        for (id, e) in &outcome.failed {
            writeln!(todo, "  - {id:?}: {e}")?;
        }
        write(data.with_extension("md"), todo)?;
    }

    snapshot::save(&store, db)?;
    Ok(())
}

#[derive(Deserialize)]
struct BackfillRow {
    id: u32,
    location: serde_json::Value,
}

fn backfill(data: &Path, db: &Path) -> Result<()> {
    let mut store = snapshot::load(db)?;
    let input = read_to_string(data).context("failed to read backfill data")?;

    let mut recovered = 0;
    let mut cleared = 0;
    let mut todo = String::new();
    for line in input.lines().filter(|l| !l.trim().is_empty()) {
        let row: BackfillRow = serde_json::from_str(line)?;
        let id = MerchantId(row.id);
        if store.merchant(id).is_none() {
            writeln!(todo, "- {id:?} is not in the store")?;
            continue;
        }

        match codec::legacy::normalize(&row.location) {
            Ok(Some(document)) => {
                let point = codec::document_to_spatial(&document)?;
                store.set_location(id, point.lat(), point.lng())?;
                recovered += 1;
            }
            Ok(None) => {
                store.clear_location(id)?;
                cleared += 1;
            }
            Err(e) => {
                writeln!(todo, "- {id:?}: {e}")?;
            }
        }
    }

    println!("## Statistics");
    println!("- {recovered} recovered, {cleared} cleared");
    if !todo.is_empty() {
        println!("- some rows need attention, see the report");
        write(data.with_extension("md"), todo)?;
    }

    snapshot::save(&store, db)?;
    Ok(())
}

fn migrate_zones(db: &Path) -> Result<()> {
    let mut store = snapshot::load(db)?;
    let migrated = store.migrate_legacy_zones()?;
    println!("- {migrated} zone documents migrated");
    snapshot::save(&store, db)?;
    Ok(())
}

fn doctor(db: &Path) -> Result<()> {
    let store = snapshot::load(db)?;
    let findings = store.check_consistency();
    if findings.is_empty() {
        println!("- all records consistent");
        return Ok(());
    }

    let mut todo = String::new();
    for finding in &findings {
        writeln!(todo, "- {finding}")?;
    }
    write(db.with_extension("md"), &todo)?;
    bail!("{} inconsistent records, see the report", findings.len());
}

fn near(db: &Path, lat: f64, lng: f64, radius: f64) -> Result<()> {
    let store = snapshot::load(db)?;
    for (id, distance) in query::within_radius(&store, lat, lng, radius) {
        let name = store.merchant(id).map(|m| m.name().to_string()).unwrap_or_default();
        println!("- {id:?} {name} ({distance:.0}m)");
    }
    Ok(())
}

fn covering(db: &Path, zone: ZoneKind, lat: f64, lng: f64) -> Result<()> {
    let store = snapshot::load(db)?;
    for id in query::covering(&store, zone, lat, lng) {
        let name = store.merchant(id).map(|m| m.name().to_string()).unwrap_or_default();
        println!("- {id:?} {name}");
    }
    Ok(())
}

fn open_or_new(db: &Path) -> Result<LocationStore> {
    if db.exists() {
        Ok(snapshot::load(db)?)
    } else {
        Ok(LocationStore::new())
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    ProgressBar::new(len).with_style(
        ProgressStyle::with_template("[{elapsed_precise}] {human_pos} {percent}% ({per_sec})")
            .expect("hardcoded"),
    )
}
