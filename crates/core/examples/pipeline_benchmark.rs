//! Lightweight parse/validate/format benchmark harness for local baselines.
//!
//! Run from repository root:
//! `cargo run -p hed_toolchain_core --example pipeline_benchmark --release`

use std::path::PathBuf;
use std::time::Instant;

use hed_toolchain_core::{
    EmitConfig, HedSchemas, ParseOptions, TagForm, emit_hed, parse_hed_string,
    validate_hed_string, validate_hed_strings,
};
use hed_toolchain_schema::HedSchema;

fn load_schemas() -> Result<HedSchemas, String> {
    let mut candidates: Vec<PathBuf> = vec![
        PathBuf::from("schemas/hed_test.json"),
        PathBuf::from("../../schemas/hed_test.json"),
    ];
    if let Ok(from_env) = std::env::var("HED_SCHEMA_JSON") {
        candidates.insert(0, PathBuf::from(from_env));
    }
    for path in candidates {
        if !path.exists() {
            continue;
        }
        let schema = HedSchema::from_path(&path)
            .map_err(|e| format!("failed to load schema at '{}': {e}", path.display()))?;
        return Ok(HedSchemas::with_base(schema));
    }
    Err("unable to locate a schema; set HED_SCHEMA_JSON to a schema path".to_string())
}

fn per_iter_ms(elapsed: std::time::Duration, iterations: usize) -> f64 {
    elapsed.as_secs_f64() * 1000.0 / iterations as f64
}

fn run_benchmark(label: &str, input: &str, schemas: &HedSchemas, iterations: usize) {
    let options = ParseOptions::default().with_full_validation(true);
    let emit_cfg = EmitConfig {
        form: TagForm::Long,
        compact: false,
    };

    let parse_start = Instant::now();
    for _ in 0..iterations {
        let _ = parse_hed_string(input, schemas);
    }
    let parse_elapsed = parse_start.elapsed();

    let validate_start = Instant::now();
    for _ in 0..iterations {
        let _ = validate_hed_string(input, schemas, &options);
    }
    let validate_elapsed = validate_start.elapsed();

    let Some(parsed) = parse_hed_string(input, schemas).parsed else {
        println!("Benchmark: {label} (input does not parse, skipped)");
        return;
    };
    let format_start = Instant::now();
    for _ in 0..iterations {
        let _ = emit_hed(&parsed, &emit_cfg);
    }
    let format_elapsed = format_start.elapsed();

    let batch: Vec<&str> = vec![input; iterations];
    let batch_start = Instant::now();
    let _ = validate_hed_strings(&batch, schemas, &options);
    let batch_elapsed = batch_start.elapsed();

    println!("Benchmark: {label}");
    println!("  input_bytes: {}", input.len());
    println!(
        "  parse:    total={:?}, per_iter={:.3} ms",
        parse_elapsed,
        per_iter_ms(parse_elapsed, iterations)
    );
    println!(
        "  validate: total={:?}, per_iter={:.3} ms",
        validate_elapsed,
        per_iter_ms(validate_elapsed, iterations)
    );
    println!(
        "  format:   total={:?}, per_iter={:.3} ms",
        format_elapsed,
        per_iter_ms(format_elapsed, iterations)
    );
    println!(
        "  batch:    total={:?}, per_iter={:.3} ms",
        batch_elapsed,
        per_iter_ms(batch_elapsed, iterations)
    );
}

fn main() -> Result<(), String> {
    let schemas = load_schemas()?;
    let iterations = std::env::var("HED_BENCH_ITERS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(2_000);

    let nested = format!("Sensory-event, {}", "(Red, (Blue, Green)), ".repeat(20));
    let samples = [
        ("short", "Sensory-event, Red"),
        ("temporal", "(Onset, Def/Foo, (Red, Blue)), (Duration/2 s, Def/Bar), Event"),
        ("nested", nested.trim_end_matches([',', ' '])),
    ];

    for (label, input) in samples {
        run_benchmark(label, input, &schemas, iterations);
    }

    Ok(())
}
