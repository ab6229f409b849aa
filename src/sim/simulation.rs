//! Per-timestep orchestration: evaluate moves, resolve conflicts, commit,
//! update grids, diffuse, and periodically propagate fire. Owns the single
//! seeded PRNG the whole run draws from.

use thin_vec::ThinVec;

use crate::config::SimulationConfig;

use super::conflict::{
    apply_same_target_resolution, apply_x_crossing_resolution, detect_x_crossings,
    rebuild_position_grid, resolve_same_target_conflicts, resolve_x_crossing,
};
use super::dynamic_field::DynamicField;
use super::environment::{Environment, EnvironmentDescription};
use super::error::{SimResult, SimulationError};
use super::exit::Exit;
use super::fire::{check_exit_blocked_by_fire, FireField};
use super::geometry::Coordinate;
use super::pedestrian::{compute_transition_probabilities, draw_target, Pedestrian, PedestrianState};
use super::static_field::{compute_varas_for_exit, compute_zheng, StaticFieldVariant};

pub struct Simulation {
    pub environment: Environment,
    pub exits: Vec<Exit>,
    pub fire: FireField,
    pub dynamic_field: DynamicField,
    pub static_field: super::grid::Grid<f32>,
    pub pedestrians: Vec<Pedestrian>,
    pub config: SimulationConfig,
    pub timestep: u64,
    rng: fastrand::Rng,
    fire_spread_interval: u64,
}

impl Simulation {
    pub fn new(
        description: &EnvironmentDescription,
        initial_fires: &[Coordinate],
        config: SimulationConfig,
    ) -> SimResult<Self> {
        config.validate()?;

        let (environment, exit_groups) = Environment::from_description(description)?;
        let mut exits: Vec<Exit> = exit_groups
            .into_iter()
            .map(|coordinates| Exit::new(&environment, coordinates))
            .collect();

        let fire = FireField::new(
            environment.rows,
            environment.columns,
            initial_fires,
            config.fire_is_present,
        );

        let dynamic_field = DynamicField::new(environment.rows, environment.columns);

        let pedestrians: Vec<Pedestrian> = description
            .pedestrian_origins
            .iter()
            .enumerate()
            .map(|(index, &origin)| Pedestrian::new((index + 1) as u32, origin))
            .collect();

        let fire_spread_interval = FireField::spread_interval(
            config.cell_length,
            config.spread_rate,
            config.timestep_time,
        );

        let mut simulation = Simulation {
            static_field: super::grid::Grid::filled(environment.rows, environment.columns, 0.0),
            environment,
            exits,
            fire,
            dynamic_field,
            pedestrians,
            rng: fastrand::Rng::with_seed(config.seed),
            config,
            timestep: 0,
            fire_spread_interval,
        };

        simulation.recompute_static_field()?;

        Ok(simulation)
    }

    /// Recomputes the static field over every currently non-blocked exit;
    /// fails with [`SimulationError::NoAccessibleExit`] if none remains
    /// reachable.
    pub fn recompute_static_field(&mut self) -> SimResult<()> {
        match self.config.static_field_variant {
            StaticFieldVariant::Zheng => {
                self.static_field = compute_zheng(
                    &self.environment.obstacle_grid,
                    &self.environment.exits_only_grid,
                    &self.fire.fire_grid,
                );
                let any_accessible = self.exits.iter().any(|exit| {
                    !exit.is_blocked_by_fire
                        && super::static_field::is_exit_accessible(
                            exit,
                            &self.environment.obstacle_grid,
                            &self.environment.exits_only_grid,
                        )
                });
                if !any_accessible {
                    return Err(SimulationError::NoAccessibleExit);
                }
            }
            StaticFieldVariant::Varas => {
                let mut any_accessible = false;
                for exit in self.exits.iter_mut() {
                    if exit.is_blocked_by_fire {
                        continue;
                    }
                    let accessible = compute_varas_for_exit(
                        exit,
                        &self.environment.obstacle_grid,
                        &self.environment.exits_only_grid,
                        self.config.diagonal,
                        self.config.prevent_corner_crossing,
                    );
                    any_accessible |= accessible;
                }
                if !any_accessible {
                    return Err(SimulationError::NoAccessibleExit);
                }
                // merge per-exit weight grids into a single consulted field:
                // smallest distance from any accessible exit wins.
                self.static_field.fill(0.0);
                for at in self.environment.obstacle_grid.iter_coordinates() {
                    let is_exit_cell = self.exits.iter().any(|exit| exit.contains(at));
                    let best = self
                        .exits
                        .iter()
                        .filter(|exit| exit.accessible && !exit.is_blocked_by_fire)
                        .map(|exit| exit.private_static_weight[at])
                        .filter(|&w| w > 0.0 || is_exit_cell)
                        .fold(f32::MAX, f32::min);
                    if best < f32::MAX {
                        self.static_field.set(at, 1.0 / (best + 1.0));
                    }
                }
                self.static_field.normalize();
            }
        }
        Ok(())
    }

    pub fn is_environment_empty(&self) -> bool {
        self.pedestrians.iter().all(|p| p.state.is_terminal())
    }

    pub fn reset_pedestrians(&mut self) {
        for pedestrian in self.pedestrians.iter_mut() {
            pedestrian.reset_to_origin();
        }
        self.dynamic_field.reset();
        rebuild_position_grid(&mut self.environment.pedestrian_position_grid, &self.pedestrians);
        self.timestep = 0;
    }

    /// Advances the simulation by one timestep (§4.7 of the driver spec).
    pub fn step(&mut self) {
        self.timestep += 1;

        // 1. mark anyone standing on fire dead
        for pedestrian in self.pedestrians.iter_mut() {
            if pedestrian.state.is_terminal() {
                continue;
            }
            if self
                .fire
                .fire_grid
                .get(pedestrian.current)
                .copied()
                .unwrap_or_default()
                .is_on_fire()
            {
                pedestrian.state = PedestrianState::Dead;
            }
        }

        // 2. evaluate moves for every Moving pedestrian, ascending id order
        let mut indices: Vec<usize> = (0..self.pedestrians.len())
            .filter(|&i| self.pedestrians[i].state == PedestrianState::Moving)
            .collect();
        indices.sort_by_key(|&i| self.pedestrians[i].id);

        for &i in &indices {
            let mut pedestrian = std::mem::replace(&mut self.pedestrians[i], Pedestrian::new(0, Coordinate::new(0, 0)));
            compute_transition_probabilities(
                &mut pedestrian,
                &self.config.transition_params(),
                &self.environment.obstacle_grid,
                &self.environment.exits_only_grid,
                &self.fire.fire_grid,
                &self.fire.risky_cells_grid,
                &self.static_field,
                &self.dynamic_field.current,
                &self.fire.fire_floor_field,
                &self.environment.pedestrian_position_grid,
            );
            if let Some(target) = draw_target(&pedestrian, &mut self.rng) {
                pedestrian.target = target;
            } else {
                pedestrian.target = pedestrian.current;
            }
            self.pedestrians[i] = pedestrian;
        }

        // 3. conflict detection and resolution
        let mut denied_ids: std::collections::HashSet<u32> = std::collections::HashSet::new();

        let same_target_conflicts =
            resolve_same_target_conflicts(&self.pedestrians, self.config.mu, &mut self.rng);
        for conflict in &same_target_conflicts {
            for &id in conflict.pedestrian_ids.iter() {
                if Some(id) != conflict.pedestrian_allowed {
                    denied_ids.insert(id);
                }
            }
        }
        apply_same_target_resolution(&mut self.pedestrians, &same_target_conflicts);

        if !self.config.allow_x_movement {
            let crossings = detect_x_crossings(&self.pedestrians);
            for crossing in crossings {
                let denied = resolve_x_crossing(&crossing, &mut self.rng);
                denied_ids.insert(denied);
                apply_x_crossing_resolution(&mut self.pedestrians, denied);
            }
        }

        for pedestrian in self.pedestrians.iter_mut() {
            if denied_ids.contains(&pedestrian.id) {
                pedestrian.state = PedestrianState::Stopped;
            }
        }

        // 4. commit
        let mut deposits: ThinVec<Coordinate> = ThinVec::new();
        for pedestrian in self.pedestrians.iter_mut() {
            match pedestrian.state {
                PedestrianState::Leaving => {
                    pedestrian.state = PedestrianState::GotOut;
                }
                PedestrianState::Moving => {
                    if pedestrian.target != pedestrian.current {
                        pedestrian.previous = pedestrian.current;
                        pedestrian.current = pedestrian.target;
                        if self.config.velocity_density_field {
                            deposits.push(pedestrian.previous);
                        }
                        let arrived_at_exit = self
                            .environment
                            .exits_only_grid
                            .get(pedestrian.current)
                            .is_some_and(|m| m.is_usable_exit());
                        if arrived_at_exit {
                            pedestrian.state = if self.config.immediate_exit {
                                PedestrianState::GotOut
                            } else {
                                PedestrianState::Leaving
                            };
                        }
                    } else {
                        // genuine zero-stencil "stay" (remains Moving) or a
                        // conflict denial already turned into Stopped above;
                        // either way no longer counts as having just moved.
                        pedestrian.previous = pedestrian.current;
                    }
                }
                PedestrianState::Stopped | PedestrianState::GotOut | PedestrianState::Dead => {}
            }
        }

        // 5. update grids
        rebuild_position_grid(&mut self.environment.pedestrian_position_grid, &self.pedestrians);
        for pedestrian in self.pedestrians.iter() {
            if pedestrian.state.is_live() {
                self.environment.record_visit(pedestrian.current);
            }
        }

        // 6. reset Stopped back to Moving for the next timestep
        for pedestrian in self.pedestrians.iter_mut() {
            if pedestrian.state == PedestrianState::Stopped {
                pedestrian.state = PedestrianState::Moving;
            }
        }

        // 7. dynamic field deposition + decay/diffusion
        if self.config.velocity_density_field {
            for at in deposits {
                self.dynamic_field.deposit(at);
            }
        } else {
            for pedestrian in self.pedestrians.iter() {
                if pedestrian.state.is_live() {
                    self.dynamic_field.deposit(pedestrian.current);
                }
            }
        }
        self.dynamic_field.decay_and_diffuse(
            self.config.alpha,
            self.config.delta,
            &self.environment.obstacle_grid,
            &self.fire.fire_grid,
        );

        // 8. periodic fire propagation
        if self.fire.is_present && self.timestep % self.fire_spread_interval == 0 {
            self.fire
                .propagate(&self.environment.obstacle_grid, &self.environment.exits_only_grid);
            self.fire.recompute_distance_and_risk(&self.environment.obstacle_grid);
            self.fire.recompute_floor_field(self.config.fire_gamma);

            let mut any_newly_blocked = false;
            for exit in self.exits.iter_mut() {
                let newly_blocked = check_exit_blocked_by_fire(
                    exit,
                    &self.fire.fire_grid,
                    &self.environment.obstacle_grid,
                    &mut self.environment.exits_only_grid,
                );
                any_newly_blocked |= newly_blocked;
            }
            if any_newly_blocked {
                let _ = self.recompute_static_field();
            }
        }
    }

    pub fn live_count(&self) -> usize {
        self.pedestrians.iter().filter(|p| p.state.is_live()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(rows: usize, columns: usize) -> SimulationConfig {
        SimulationConfig {
            rows,
            columns,
            k_static: 3.0,
            k_dynamic: 1.0,
            k_fire: 2.0,
            alpha: 0.3,
            delta: 0.2,
            omega: 2.0,
            mu: 0.1,
            diagonal: 1.5,
            prevent_corner_crossing: false,
            immediate_exit: false,
            allow_x_movement: false,
            ignore_latest_self_trace: false,
            velocity_density_field: false,
            fire_is_present: false,
            risk_distance: 3.0,
            fire_alpha: 1.0,
            fire_gamma: 5.0,
            spread_rate: 0.05,
            cell_length: 0.4,
            timestep_time: 1.0,
            seed: 1,
            num_simulations: 1,
            max_timesteps: 1000,
            diagnostic_history_size: 60,
            static_field_variant: StaticFieldVariant::Zheng,
        }
    }

    fn description(rows: usize, columns: usize) -> EnvironmentDescription {
        EnvironmentDescription {
            rows,
            columns,
            walls: vec![vec![false; columns]; rows],
            doors: vec![vec![false; columns]; rows],
            pedestrian_origins: Vec::new(),
        }
    }

    #[test]
    fn s1_single_pedestrian_reaches_axial_exit() {
        let mut description = description(1, 5);
        description.doors[0][4] = true;
        description.walls[0][4] = true; // matches the real parser: exit cells are also walls
        description.pedestrian_origins.push(Coordinate::new(0, 0));

        let mut simulation = Simulation::new(&description, &[], base_config(1, 5)).unwrap();

        for _ in 0..4 {
            assert!(!simulation.is_environment_empty());
            simulation.step();
        }
        assert!(simulation.is_environment_empty());
        assert_eq!(simulation.pedestrians[0].state, PedestrianState::GotOut);
    }

    #[test]
    fn s2_same_target_conflict_stops_one_pedestrian() {
        let mut description = description(3, 3);
        description.doors[2][2] = true;
        description.walls[2][2] = true;
        description.pedestrian_origins.push(Coordinate::new(0, 1));
        description.pedestrian_origins.push(Coordinate::new(1, 0));

        let mut config = base_config(3, 3);
        config.mu = 0.0; // always pick a winner, never deny both

        let mut simulation = Simulation::new(&description, &[], config).unwrap();
        // both pedestrians aim at (1,1): force via a symmetric static field already set

        for pedestrian in simulation.pedestrians.iter_mut() {
            pedestrian.current = Coordinate::new(1, 0);
        }
        simulation.pedestrians[0].current = Coordinate::new(0, 1);
        simulation.pedestrians[1].current = Coordinate::new(1, 0);
        rebuild_position_grid(
            &mut simulation.environment.pedestrian_position_grid,
            &simulation.pedestrians,
        );

        simulation.pedestrians[0].target = Coordinate::new(1, 1);
        simulation.pedestrians[1].target = Coordinate::new(1, 1);
        simulation.pedestrians[0].state = PedestrianState::Moving;
        simulation.pedestrians[1].state = PedestrianState::Moving;

        let conflicts =
            resolve_same_target_conflicts(&simulation.pedestrians, config_mu_zero(), &mut simulation.rng);
        assert_eq!(conflicts.len(), 1);
        apply_same_target_resolution(&mut simulation.pedestrians, &conflicts);

        let denied_stays = simulation
            .pedestrians
            .iter()
            .filter(|p| p.target == p.current)
            .count();
        assert_eq!(denied_stays, 1);
    }

    fn config_mu_zero() -> f32 {
        0.0
    }

    #[test]
    fn s5_fire_kills_pedestrian_on_its_cell() {
        let mut description = description(3, 3);
        description.doors[2][2] = true;
        description.walls[2][2] = true;
        description.pedestrian_origins.push(Coordinate::new(1, 1));

        let mut config = base_config(3, 3);
        config.fire_is_present = true;

        let mut simulation =
            Simulation::new(&description, &[Coordinate::new(1, 1)], config).unwrap();
        simulation.step();
        assert_eq!(simulation.pedestrians[0].state, PedestrianState::Dead);
    }

    #[test]
    fn reset_pedestrians_restores_origins() {
        let mut description = description(1, 5);
        description.doors[0][4] = true;
        description.walls[0][4] = true;
        description.pedestrian_origins.push(Coordinate::new(0, 0));
        let mut simulation = Simulation::new(&description, &[], base_config(1, 5)).unwrap();

        simulation.step();
        simulation.reset_pedestrians();

        assert_eq!(simulation.pedestrians[0].current, Coordinate::new(0, 0));
        assert_eq!(simulation.pedestrians[0].state, PedestrianState::Moving);
    }

    #[test]
    fn no_accessible_exit_is_reported() {
        let mut description = description(3, 3);
        description.doors[1][1] = true;
        for neighbor in Coordinate::new(1, 1).axial_neighbors() {
            description.walls[neighbor.line as usize][neighbor.column as usize] = true;
        }
        let result = Simulation::new(&description, &[], base_config(3, 3));
        assert!(matches!(result, Err(SimulationError::NoAccessibleExit)));
    }
}
