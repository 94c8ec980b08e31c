//! Directory Scan Example
//!
//! Analyzes every upload in a workspace, publishes a new report version, and
//! prints a per-file summary.
//!
//! Run with: cargo run --example scan_directory -- <workspace_root> [config.json]

use receipt_forensics::{
    EdgeProfile, ForensicsConfig, error::Result, pipeline::Pipeline, workspace::Workspace,
};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Receipt Forensics - Directory Scan");
        println!("==================================");
        println!();
        println!("Usage: {} <workspace_root> [config.json]", args[0]);
        println!();
        println!("Arguments:");
        println!("  workspace_root - Directory holding uploads/, derived/, overlays/, reports/");
        println!("  config.json    - Optional detector configuration");
        println!();
        println!("Example:");
        println!("  {} ./data ./forensics.json", args[0]);
        return Ok(());
    }

    let root = Path::new(&args[1]);
    let config = match args.get(2) {
        Some(path) => ForensicsConfig::from_json_file(path)?,
        None => ForensicsConfig::default(),
    };

    println!("📁 Workspace: {}", root.display());
    println!(
        "⚙️  Patch size {} px, flatness threshold {:.1}",
        config.patch_size, config.std_threshold
    );
    println!();

    let pipeline = Pipeline::new(Workspace::new(root), config)?;
    let summary = pipeline.run()?;

    for entry in &summary.report.reports {
        let verdict = if entry.flagged { "⚠️  FLAGGED" } else { "✓ clean" };
        println!("{}  {}", verdict, entry.filename);

        let anomalies = &entry.findings.anomalies;
        if anomalies.missing_datetime {
            println!("     • no capture date in metadata");
        }
        if anomalies.strange_orientation {
            println!("     • unexpected orientation");
        }
        if let Some(error) = entry.findings.metadata.error() {
            println!("     • metadata unreadable: {}", error);
        }

        match &entry.findings.edges {
            EdgeProfile::Computed {
                edges_detected,
                shape: (height, width),
            } => println!(
                "     Edges: {} ({}x{})",
                if *edges_detected { "present" } else { "none" },
                width,
                height
            ),
            EdgeProfile::Failed(payload) => println!("     Edges: {}", payload.error),
        }

        if let Some(overlay) = &entry.flat_patch_overlay {
            println!("     Flat regions: {}", overlay.overlay_image_url);
        }
        println!();
    }

    println!(
        "Run {}: {} of {} image(s) flagged",
        summary.run_id,
        summary.flagged_count(),
        summary.report.reports.len()
    );
    println!(
        "Report: {}",
        pipeline.workspace().report_store().run_path(summary.run_id).display()
    );

    Ok(())
}
