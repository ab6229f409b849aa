use std::path::PathBuf;

#[derive(Debug, clap::Parser)]
#[command(about = "Floor-field cellular automaton pedestrian evacuation simulator")]
pub struct Args {
    /// Path to the environment file (`{#, _, ., p, P}` grid format)
    pub environment: PathBuf,

    /// Path to the TOML simulation configuration
    #[arg(short, long)]
    pub config: PathBuf,

    /// Path to an auxiliary exit-sweep file; one simulation set per line.
    /// When omitted, a single simulation set is run using the exits already
    /// present in the environment file.
    #[arg(short, long)]
    pub auxiliary: Option<PathBuf>,

    /// Directory to write per-run diagnostic JSON logs into
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Print the grid after every timestep (noisy; mainly for small grids)
    #[arg(long)]
    pub print_steps: bool,
}
