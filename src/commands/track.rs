//! Track command implementation
//!
//! Runs the full drift-tracking pipeline: parse the repository list,
//! provision shallow clones, install dependencies, compute drift/pulse
//! metrics, enrich with merged bump pull requests, and persist history
//! and index files.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;

use drift_tracker::config;
use drift_tracker::credentials;
use drift_tracker::pipeline::Pipeline;

/// Arguments for the track command
#[derive(Args, Debug)]
pub struct TrackArgs {
    /// Path to the repository list
    #[arg(short, long, value_name = "PATH", default_value = "repositories.txt")]
    pub config: PathBuf,

    /// Output directory for history and index files
    #[arg(short, long, value_name = "PATH", default_value = "data")]
    pub data_dir: PathBuf,
}

/// Execute the track command
pub fn execute(args: TrackArgs) -> Result<()> {
    let start_time = Instant::now();

    let entries = config::from_file(&args.config)?;
    println!(
        "Tracking {} entr{} from {}",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        args.config.display()
    );

    let pipeline = Pipeline::new(args.data_dir, credentials::from_env());
    pipeline.run(&entries)?;

    println!("Done in {:.1?}", start_time.elapsed());
    Ok(())
}
