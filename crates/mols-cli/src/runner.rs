//! Design runner: ties together configuration, optimiser and prefilter.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use mols_core::design_with_max_rounds;
use mols_core::types::{DesignOutput, Termination};

use crate::config::JobConfig;

/// Run a full design from a parsed job configuration.
pub fn run_design(job: &JobConfig) -> Result<DesignOutput> {
    let params = job.design_params();
    let g = params.grid;
    println!(
        "  Grid: J={}, N={}, K={}, Ofactor={} ({} interpolator samples)",
        g.support,
        g.image_size,
        g.oversampled_size,
        g.oversampling,
        g.interpolator_len()
    );
    println!(
        "  Spline order {}, seed degree {}",
        params.order,
        params.seed_degree()
    );

    let output = design_with_max_rounds(&params, job.design.max_rounds)
        .context("Interpolator design failed")?;

    println!("  Seed error:  {:.6e}", output.seed_error);
    println!("  Final error: {:.6e}", output.error);
    match output.termination {
        Termination::Converged { round } => {
            println!("  Converged: no improving step in round {}", round)
        }
        Termination::IterationLimit { rounds } => {
            eprintln!("Warning: iteration limit of {} rounds reached", rounds)
        }
    }

    Ok(output)
}

fn write_header(file: &mut std::fs::File, title: &str, output: &DesignOutput) -> Result<()> {
    let g = &output.params.grid;
    writeln!(file, "# MOLS interpolator design: {}", title)?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        file,
        "# J={}, N={}, K={}, Ofactor={}, order={}",
        g.support, g.image_size, g.oversampled_size, g.oversampling, output.params.order
    )?;
    writeln!(file, "# error: {:.6e} (seed {:.6e})", output.error, output.seed_error)?;
    writeln!(file, "#")?;
    Ok(())
}

fn create(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::File::create(path).with_context(|| format!("Cannot create {}", path.display()))
}

/// Write interpolator, kernel and prefilter as CSV files into `dir`.
pub fn write_csv(output: &DesignOutput, dir: &Path) -> Result<()> {
    let path = dir.join("interpolator.csv");
    let mut file = create(&path)?;
    write_header(&mut file, "Interpolator", output)?;
    writeln!(file, "position,re,im")?;
    for (x, f) in output.positions.iter().zip(output.interpolator.iter()) {
        writeln!(file, "{:.6},{:.12e},{:.12e}", x, f.re, f.im)?;
    }
    println!("Interpolator written to: {}", path.display());

    let path = dir.join("kernel.csv");
    let mut file = create(&path)?;
    write_header(&mut file, "Kernel", output)?;
    writeln!(file, "index,re,im")?;
    for (j, q) in output.kernel.iter().enumerate() {
        writeln!(file, "{},{:.12e},{:.12e}", j, q.re, q.im)?;
    }
    println!("Kernel written to: {}", path.display());

    let path = dir.join("prefilter.csv");
    let mut file = create(&path)?;
    write_header(&mut file, "Prefilter", output)?;
    writeln!(file, "index,scale")?;
    for (j, s) in output.prefilter.iter().enumerate() {
        writeln!(file, "{},{:.12e}", j, s)?;
    }
    println!("Prefilter written to: {}", path.display());

    Ok(())
}

/// Write the complete design output as JSON.
pub fn write_json(output: &DesignOutput, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(output)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    println!("Design (JSON) written to: {}", path.display());
    Ok(())
}
