use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

/// Write a small dataset of sine-wave series files plus the descriptor and
/// main table that reference them.
#[derive(Parser)]
struct Args {
    #[arg(long, default_value = "sample_dataset")]
    out: PathBuf,
    #[arg(long, default_value_t = 4)]
    series: usize,
    #[arg(long, default_value_t = 165)]
    samples: usize,
}

/// Minimal deterministic PRNG (64-bit LCG), enough for noise.
struct SimpleRng(u64);

impl SimpleRng {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng(42);

    let ts_dir = args.out.join("timeseries");
    let table_dir = args.out.join("tables");
    fs::create_dir_all(&ts_dir).context("creating timeseries directory")?;
    fs::create_dir_all(&table_dir).context("creating tables directory")?;

    let mut main = csv::Writer::from_path(table_dir.join("learningData.csv"))?;
    main.write_record(["d3mIndex", "series_file", "label"])?;

    for s in 0..args.series {
        let name = format!("{s:04}_train_ts.csv");
        let mut w = csv::Writer::from_path(ts_dir.join(&name))?;
        w.write_record(["time", "value"])?;
        let freq = 0.05 * (s + 1) as f64;
        for t in 0..args.samples {
            let noise = (rng.next_f64() - 0.5) * 0.1;
            let value = (t as f64 * freq).sin() + noise;
            w.write_record([t.to_string(), format!("{value:.6}")])?;
        }
        w.flush()?;
        main.write_record([s.to_string(), name, format!("class_{}", s % 2)])?;
    }
    main.flush()?;

    let series_column = json!({
        "name": "series_file", "type": "string",
        "tags": ["FileName", "Timeseries"], "media_types": ["text/csv"],
        "foreign_key": { "resource_id": "0", "column_index": 0 }
    });
    let descriptor = json!({
        "resources": [
            { "id": "0", "path": "timeseries", "kind": "collection",
              "columns": [ { "name": "filename", "type": "string",
                             "tags": ["FileName", "Timeseries"],
                             "media_types": ["text/csv"] } ] },
            { "id": "1", "path": "tables/learningData.csv",
              "columns": [
                  { "name": "d3mIndex", "type": "integer", "tags": ["PrimaryKey"] },
                  series_column,
                  { "name": "label", "type": "string", "tags": ["Attribute"] } ] }
        ]
    });
    fs::write(
        args.out.join("datasetDoc.json"),
        serde_json::to_string_pretty(&descriptor)?,
    )?;

    println!(
        "Wrote {} series ({} samples each) to {}",
        args.series,
        args.samples,
        args.out.display()
    );
    Ok(())
}
