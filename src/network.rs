use log::{debug, info, trace};
use rand::{rngs::StdRng, SeedableRng};
use simple_error::try_with;

use crate::{
    area::Area,
    error::{Error, Result},
    nxx1::Nxx1Registry,
    params::{self, AreaParams, NetworkParams, ProjectionParams, ScheduleParams, TechnicalParams},
    projection::Projection,
    state_snapshot::{AreaState, StateSnapshot, StepObserver},
    types::{HashMap, Phase},
};

pub fn create_network(params: NetworkParams) -> Result<Network> {
    try_with!(
        params::validate_network_params(&params),
        "invalid network parameters"
    );

    let mut builder = NetworkBuilder::with_params(params.schedule, params.technical_params)?;

    for area_params in params.areas {
        builder.add_area(area_params)?;
    }

    for prj_params in params.projections {
        builder.add_projection(prj_params)?;
    }

    builder.build()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clock {
    step_count: usize,
    total_steps: usize,
    quarter_num: usize,
    cycle_count: usize,
    phase: Phase,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            step_count: 0,
            total_steps: 0,
            quarter_num: 1,
            cycle_count: 0,
            phase: Phase::Minus,
        }
    }
}

impl Clock {
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn quarter_num(&self) -> usize {
        self.quarter_num
    }

    pub fn cycle_count(&self) -> usize {
        self.cycle_count
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

pub struct NetworkBuilder {
    areas: Vec<Area>,
    projections: Vec<Projection>,
    area_ids: HashMap<String, usize>,
    nxx1_registry: Nxx1Registry,
    schedule: ScheduleParams,
    num_threads: usize,
    rng: StdRng,
    clock: Clock,
    inputs: Vec<(usize, Vec<f64>)>,
    outputs: Vec<(usize, Vec<f64>)>,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::from_parts(ScheduleParams::default(), 1, StdRng::seed_from_u64(0))
    }
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(
        schedule: ScheduleParams,
        technical_params: TechnicalParams,
    ) -> Result<Self> {
        try_with!(
            params::validate_technical_params(&technical_params),
            "invalid technical parameters"
        );

        try_with!(
            params::validate_schedule_params(&schedule),
            "invalid schedule parameters"
        );

        let num_threads = technical_params.num_threads.unwrap_or_else(num_cpus::get);
        let seed = technical_params.seed_override.unwrap_or(0);

        Ok(Self::from_parts(
            schedule,
            num_threads,
            StdRng::seed_from_u64(seed),
        ))
    }

    fn from_parts(schedule: ScheduleParams, num_threads: usize, rng: StdRng) -> Self {
        Self {
            areas: Vec::new(),
            projections: Vec::new(),
            area_ids: HashMap::default(),
            nxx1_registry: Nxx1Registry::default(),
            schedule,
            num_threads,
            rng,
            clock: Clock::default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn num_areas(&self) -> usize {
        self.areas.len()
    }

    pub fn num_projections(&self) -> usize {
        self.projections.len()
    }

    pub fn add_area(&mut self, area_params: AreaParams) -> Result<usize> {
        try_with!(
            params::validate_area_params(&area_params),
            "invalid area parameters"
        );

        if self.area_ids.contains_key(&area_params.name) {
            return Err(Error::Configuration(format!(
                "duplicate area name: {}",
                area_params.name
            )));
        }

        let nxx1 = self.nxx1_registry.get_or_build(
            area_params.neuron_params.act_gain,
            area_params.neuron_params.act_sd,
        );

        let area_id = self.areas.len();
        self.areas.push(Area::new(&area_params, nxx1));
        self.area_ids.insert(area_params.name, area_id);

        Ok(area_id)
    }

    pub fn add_projection(&mut self, prj_params: ProjectionParams) -> Result<usize> {
        try_with!(
            params::validate_projection_params(&prj_params),
            "invalid projection parameters"
        );

        let from_id = lookup_area(&self.area_ids, &prj_params.from_area)?;
        let to_id = lookup_area(&self.area_ids, &prj_params.to_area)?;

        if self
            .projections
            .iter()
            .any(|prj| prj.from_area() == from_id && prj.to_area() == to_id)
        {
            return Err(Error::Configuration(format!(
                "duplicate projection from area {} to area {}",
                prj_params.from_area, prj_params.to_area
            )));
        }

        let projection = Projection::new(
            &prj_params,
            from_id,
            &self.areas[from_id],
            to_id,
            &self.areas[to_id],
            &mut self.rng,
        )?;

        let prj_id = self.projections.len();
        self.projections.push(projection);
        self.areas[from_id].register_outgoing(prj_id);
        self.areas[to_id].register_incoming(prj_id);

        Ok(prj_id)
    }

    /// Normalizes the relative weight scales of the incoming projections of
    /// every area so that they sum to 1.
    pub fn build(mut self) -> Result<Network> {
        for area in &self.areas {
            let incoming = area.incoming_projections();

            if incoming.is_empty() {
                continue;
            }

            let rel_sum: f64 = incoming
                .iter()
                .map(|prj_id| self.projections[*prj_id].wt_scale_rel())
                .sum();

            if rel_sum <= 0.0 {
                return Err(Error::Configuration(format!(
                    "relative weight scales of the projections into area {} sum to zero",
                    area.name()
                )));
            }

            for prj_id in incoming {
                let projection = &mut self.projections[*prj_id];
                let wt_scale_rel_eff = projection.wt_scale_rel() / rel_sum;
                projection.set_wt_scale_rel_eff(wt_scale_rel_eff);
            }
        }

        debug!(
            "built network with {} areas, {} projections and {} activation tables",
            self.areas.len(),
            self.projections.len(),
            self.nxx1_registry.len()
        );

        Ok(Network {
            areas: self.areas,
            projections: self.projections,
            area_ids: self.area_ids,
            nxx1_registry: self.nxx1_registry,
            schedule: self.schedule,
            num_threads: self.num_threads,
            rng: self.rng,
            clock: self.clock,
            inputs: self.inputs,
            outputs: self.outputs,
            observer: None,
        })
    }
}

fn lookup_area(area_ids: &HashMap<String, usize>, name: &str) -> Result<usize> {
    area_ids
        .get(name)
        .copied()
        .ok_or_else(|| Error::NotFound(name.to_owned()))
}

pub struct Network {
    areas: Vec<Area>,
    projections: Vec<Projection>,
    area_ids: HashMap<String, usize>,
    nxx1_registry: Nxx1Registry,
    schedule: ScheduleParams,
    num_threads: usize,
    rng: StdRng,
    clock: Clock,
    inputs: Vec<(usize, Vec<f64>)>,
    outputs: Vec<(usize, Vec<f64>)>,
    observer: Option<Box<dyn StepObserver>>,
}

impl Network {
    /// Back to the unbuilt state for topology edits. Neuron and synapse state
    /// as well as the clock are kept; relative scales must be normalized
    /// again by the next `build`.
    pub fn into_builder(mut self) -> NetworkBuilder {
        for projection in &mut self.projections {
            projection.invalidate_wt_scale_rel_eff();
        }

        NetworkBuilder {
            areas: self.areas,
            projections: self.projections,
            area_ids: self.area_ids,
            nxx1_registry: self.nxx1_registry,
            schedule: self.schedule,
            num_threads: self.num_threads,
            rng: self.rng,
            clock: self.clock,
            inputs: self.inputs,
            outputs: self.outputs,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn step_count(&self) -> usize {
        self.clock.step_count
    }

    pub fn total_steps(&self) -> usize {
        self.clock.total_steps
    }

    pub fn quarter_num(&self) -> usize {
        self.clock.quarter_num
    }

    pub fn cycle_count(&self) -> usize {
        self.clock.cycle_count
    }

    pub fn phase(&self) -> Phase {
        self.clock.phase
    }

    pub fn quarter_length(&self) -> usize {
        self.schedule.quarter_length
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    pub fn area(&self, name: &str) -> Result<&Area> {
        let area_id = lookup_area(&self.area_ids, name)?;
        Ok(&self.areas[area_id])
    }

    pub fn activities(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.area(name)?.activities())
    }

    pub fn minus_phase_activities(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.area(name)?.minus_phase_activities())
    }

    pub fn projection(&self, from_area: &str, to_area: &str) -> Result<&Projection> {
        let prj_id = self.projection_id(from_area, to_area)?;
        Ok(&self.projections[prj_id])
    }

    fn projection_id(&self, from_area: &str, to_area: &str) -> Result<usize> {
        let from_id = lookup_area(&self.area_ids, from_area)?;
        let to_id = lookup_area(&self.area_ids, to_area)?;

        self.projections
            .iter()
            .position(|prj| prj.from_area() == from_id && prj.to_area() == to_id)
            .ok_or_else(|| {
                Error::NotFound(format!("projection from {} to {}", from_area, to_area))
            })
    }

    pub fn weights(&self, from_area: &str, to_area: &str) -> Result<Vec<Vec<f64>>> {
        Ok(self.projection(from_area, to_area)?.weights())
    }

    pub fn set_weights(
        &mut self,
        from_area: &str,
        to_area: &str,
        weights: &[Vec<f64>],
    ) -> Result<()> {
        let prj_id = self.projection_id(from_area, to_area)?;
        self.projections[prj_id].set_weights(weights)
    }

    /// Activities forced onto the given areas at the start of every cycle.
    /// Replaces the previous mapping.
    pub fn set_inputs<I, S>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: AsRef<str>,
    {
        self.inputs = self.resolve_activity_mapping(inputs)?;
        Ok(())
    }

    /// Targets forced onto the given areas at the start of the plus phase.
    /// Replaces the previous mapping.
    pub fn set_outputs<I, S>(&mut self, outputs: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: AsRef<str>,
    {
        self.outputs = self.resolve_activity_mapping(outputs)?;
        Ok(())
    }

    fn resolve_activity_mapping<I, S>(&self, mapping: I) -> Result<Vec<(usize, Vec<f64>)>>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: AsRef<str>,
    {
        mapping
            .into_iter()
            .map(|(name, activities)| {
                let area_id = lookup_area(&self.area_ids, name.as_ref())?;
                self.areas[area_id].check_activities(&activities)?;
                Ok((area_id, activities))
            })
            .collect()
    }

    pub fn set_observer(&mut self, observer: impl StepObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    pub fn extract_state_snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            total_steps: self.clock.total_steps,
            cycle_count: self.clock.cycle_count,
            quarter_num: self.clock.quarter_num,
            phase: self.clock.phase,
            area_states: self.areas.iter().map(AreaState::from_area).collect(),
        }
    }

    pub fn compute_sse(&self) -> f64 {
        self.outputs
            .iter()
            .map(|(area_id, targets)| {
                targets
                    .iter()
                    .zip(self.areas[*area_id].neurons())
                    .map(|(target, neuron)| (target - neuron.act_m()).powi(2))
                    .sum::<f64>()
            })
            .sum()
    }

    pub fn step(&mut self) -> Result<()> {
        self.pre_step()?;

        for projection in &self.projections {
            let pre_acts = self.areas[projection.from_area()].activities();
            projection.transmit(&pre_acts, &mut self.areas[projection.to_area()])?;
        }

        for area in &mut self.areas {
            area.step(self.clock.phase, self.num_threads);
        }

        self.clock.step_count += 1;
        self.clock.total_steps += 1;

        self.post_step();

        if self.observer.is_some() {
            let snapshot = self.extract_state_snapshot();

            if let Some(observer) = self.observer.as_mut() {
                observer.on_step(&snapshot);
            }
        }

        Ok(())
    }

    pub fn quarter(&mut self) -> Result<()> {
        loop {
            self.step()?;

            if self.clock.step_count == 0 {
                return Ok(());
            }
        }
    }

    pub fn cycle(&mut self) -> Result<f64> {
        let cycle_count = self.clock.cycle_count;

        while self.clock.cycle_count == cycle_count {
            self.quarter()?;
        }

        Ok(self.compute_sse())
    }

    pub fn train<I, O, S, T>(&mut self, inputs: I, outputs: O) -> Result<f64>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        O: IntoIterator<Item = (T, Vec<f64>)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        self.set_inputs(inputs)?;
        self.set_outputs(outputs)?;

        let sse = self.cycle()?;
        info!("cycle {} sse={}", self.clock.cycle_count, sse);

        Ok(sse)
    }

    /// One cycle without targets. Returns the minus phase activities of the
    /// given area.
    pub fn evaluate<I, S>(&mut self, inputs: I, area_name: &str) -> Result<Vec<f64>>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: AsRef<str>,
    {
        lookup_area(&self.area_ids, area_name)?;

        self.set_inputs(inputs)?;
        self.outputs.clear();
        self.cycle()?;

        self.minus_phase_activities(area_name)
    }

    fn pre_step(&mut self) -> Result<()> {
        if self.clock.step_count != 0 {
            return Ok(());
        }

        trace!(
            "starting quarter {} of cycle {}",
            self.clock.quarter_num,
            self.clock.cycle_count
        );

        for projection in &mut self.projections {
            projection.compute_netin_scaling(&self.areas[projection.from_area()]);
        }

        match self.clock.quarter_num {
            1 => {
                for area in &mut self.areas {
                    area.cycle_init();
                }

                for (area_id, activities) in &self.inputs {
                    self.areas[*area_id].force_activity(activities)?;
                }
            }
            4 => {
                for (area_id, activities) in &self.outputs {
                    self.areas[*area_id].force_activity(activities)?;
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn post_step(&mut self) {
        if self.clock.step_count < self.schedule.quarter_length {
            return;
        }

        match self.clock.quarter_num {
            3 => self.end_minus_phase(),
            4 => self.end_plus_phase(),
            _ => {}
        }

        self.clock.step_count = 0;
        self.clock.quarter_num += 1;

        if self.clock.quarter_num > 4 {
            self.clock.quarter_num = 1;
            self.clock.cycle_count += 1;
        }
    }

    fn end_minus_phase(&mut self) {
        for area in &mut self.areas {
            area.snapshot_minus_phase();
        }

        self.clock.phase = Phase::Plus;
        debug!("end of minus phase in cycle {}", self.clock.cycle_count);
    }

    fn end_plus_phase(&mut self) {
        for projection in &mut self.projections {
            let pre = &self.areas[projection.from_area()];
            let post = &self.areas[projection.to_area()];
            projection.learn(pre, post);
        }

        for area in &mut self.areas {
            area.update_avg_l();
        }

        self.clock.phase = Phase::Minus;
        debug!("end of plus phase in cycle {}", self.clock.cycle_count);
    }
}
