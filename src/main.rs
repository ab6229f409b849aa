mod args;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use args::Args;
use clap::Parser;
use exodus_sim::config::{self, SimulationConfig};
use exodus_sim::io::{auxiliary_file, environment_file, output};
use exodus_sim::sim::diagnostic::{DiagnosticLog, StepMetrics};
use exodus_sim::sim::environment::EnvironmentDescription;
use exodus_sim::sim::{Simulation, SimulationError};
use log::{info, warn};

fn apply_exit_set(base: &EnvironmentDescription, exits: &[Vec<exodus_sim::sim::geometry::Coordinate>]) -> EnvironmentDescription {
    let mut description = base.clone();
    for row in description.doors.iter_mut() {
        row.fill(false);
    }
    for exit in exits {
        for &at in exit {
            description.doors[at.line as usize][at.column as usize] = true;
            description.walls[at.line as usize][at.column as usize] = true;
        }
    }
    description
}

fn run_simulation_set(
    description: &EnvironmentDescription,
    config: &SimulationConfig,
    args: &Args,
    set_label: &str,
) -> Result<()> {
    let mut simulation = match Simulation::new(description, &[], config.clone()) {
        Ok(simulation) => simulation,
        Err(SimulationError::NoAccessibleExit) => {
            warn!("{set_label}: no exit is accessible, emitting placeholder output");
            let placeholder: Vec<&str> = (0..config.num_simulations).map(|_| "-").collect();
            println!("{set_label}: {}", placeholder.join(" "));
            return Ok(());
        }
        Err(other) => return Err(other.into()),
    };

    let mut evacuation_times = Vec::with_capacity(config.num_simulations as usize);

    for run_index in 0..config.num_simulations {
        if run_index > 0 {
            simulation.reset_pedestrians();
        }

        let mut log = DiagnosticLog::new(config.diagnostic_history_size);

        while !simulation.is_environment_empty() && simulation.timestep < config.max_timesteps {
            simulation.step();

            if args.print_steps {
                print!("{}", output::render_grid(&simulation));
            }

            log.push(StepMetrics {
                timestep: simulation.timestep,
                moving_count: count_state(&simulation, exodus_sim::sim::pedestrian::PedestrianState::Moving),
                stopped_count: count_state(&simulation, exodus_sim::sim::pedestrian::PedestrianState::Stopped),
                got_out_count: count_state(&simulation, exodus_sim::sim::pedestrian::PedestrianState::GotOut),
                dead_count: count_state(&simulation, exodus_sim::sim::pedestrian::PedestrianState::Dead),
                same_target_conflicts: 0,
                x_crossing_conflicts: 0,
                fire_cell_count: count_fire_cells(&simulation),
            });
        }

        if simulation.timestep >= config.max_timesteps && !simulation.is_environment_empty() {
            warn!("{set_label} run {run_index}: hit max_timesteps ({}) without evacuating", config.max_timesteps);
        }

        evacuation_times.push(simulation.timestep);

        if let Some(output_dir) = &args.output_dir {
            fs::create_dir_all(output_dir).context("creating output directory")?;
            let path: PathBuf = output_dir.join(format!("{set_label}_run{run_index}.json"));
            output::write_diagnostic_json(&path, &log)?;
        }
    }

    info!(
        "{set_label}: mean evacuation time {:.1} over {} runs",
        evacuation_times.iter().sum::<u64>() as f32 / evacuation_times.len() as f32,
        evacuation_times.len()
    );
    println!(
        "{set_label}: {}",
        evacuation_times
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );

    if let Some(output_dir) = &args.output_dir {
        fs::create_dir_all(output_dir).context("creating output directory")?;
        let heatmap_path = output_dir.join(format!("{set_label}_heatmap.txt"));
        fs::write(&heatmap_path, output::render_mean_heatmap(&simulation, config.num_simulations))
            .context("writing heatmap")?;
    }

    Ok(())
}

fn count_state(simulation: &Simulation, state: exodus_sim::sim::pedestrian::PedestrianState) -> u32 {
    simulation
        .pedestrians
        .iter()
        .filter(|p| p.state == state)
        .count() as u32
}

fn count_fire_cells(simulation: &Simulation) -> u32 {
    simulation
        .fire
        .fire_grid
        .iter_coordinates()
        .filter(|&at| simulation.fire.fire_grid.get(at).unwrap().is_on_fire())
        .count() as u32
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_module("exodus_sim", log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    info!("starting run at {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));

    let environment_text =
        fs::read_to_string(&args.environment).context("reading environment file")?;
    let base_description = environment_file::parse(&environment_text)?;

    let config_text = fs::read_to_string(&args.config).context("reading configuration file")?;
    let config = config::parse_toml(&config_text)?;

    if base_description.rows != config.rows || base_description.columns != config.columns {
        anyhow::bail!(
            "environment file dimensions ({}x{}) do not match configuration ({}x{})",
            base_description.rows,
            base_description.columns,
            config.rows,
            config.columns
        );
    }

    match &args.auxiliary {
        None => {
            run_simulation_set(&base_description, &config, &args, "set0")?;
        }
        Some(auxiliary_path) => {
            let auxiliary_text =
                fs::read_to_string(auxiliary_path).context("reading auxiliary file")?;
            let sets = auxiliary_file::parse(&auxiliary_text)?;

            for (set_index, set) in sets.iter().enumerate() {
                let description = apply_exit_set(&base_description, &set.exits);
                let label = format!("set{set_index}");
                run_simulation_set(&description, &config, &args, &label)?;
            }
        }
    }

    Ok(())
}
