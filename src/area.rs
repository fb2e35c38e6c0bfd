use std::sync::Arc;
use std::thread;

use crate::{
    error::{Error, Result},
    neuron::Neuron,
    nxx1::NoisyXx1,
    params::{AreaParams, InhibitionParams, NeuronParams},
    types::{NeuronType, Phase},
    util,
};

const MIN_NEURONS_PER_THREAD: usize = 256;

#[derive(Debug, Clone)]
pub struct Area {
    name: String,
    neuron_type: NeuronType,
    neurons: Vec<Neuron>,
    neuron_params: NeuronParams,
    inhibition_params: InhibitionParams,
    nxx1: Arc<NoisyXx1>,
    gc_i: f64,
    ffi: f64,
    fbi: f64,
    avg_act: f64,
    incoming_projections: Vec<usize>,
    outgoing_projections: Vec<usize>,
}

impl Area {
    pub fn new(area_params: &AreaParams, nxx1: Arc<NoisyXx1>) -> Self {
        let neurons = (0..area_params.num_neurons)
            .map(|_| Neuron::new(&area_params.neuron_params))
            .collect();

        Self {
            name: area_params.name.clone(),
            neuron_type: area_params.neuron_type,
            neurons,
            neuron_params: area_params.neuron_params.clone(),
            inhibition_params: area_params.inhibition_params.clone(),
            nxx1,
            gc_i: 0.0,
            ffi: 0.0,
            fbi: 0.0,
            avg_act: 0.0,
            incoming_projections: Vec::new(),
            outgoing_projections: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn neuron_type(&self) -> NeuronType {
        self.neuron_type
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub(crate) fn neurons_mut(&mut self) -> &mut [Neuron] {
        &mut self.neurons
    }

    pub fn neuron_params(&self) -> &NeuronParams {
        &self.neuron_params
    }

    pub fn inhibition_params(&self) -> &InhibitionParams {
        &self.inhibition_params
    }

    pub fn nxx1(&self) -> &Arc<NoisyXx1> {
        &self.nxx1
    }

    pub fn gc_i(&self) -> f64 {
        self.gc_i
    }

    pub fn ffi(&self) -> f64 {
        self.ffi
    }

    pub fn fbi(&self) -> f64 {
        self.fbi
    }

    pub fn avg_act(&self) -> f64 {
        self.avg_act
    }

    pub fn avg_act_p_eff(&self) -> f64 {
        self.inhibition_params.avg_act_targ_init
    }

    pub fn incoming_projections(&self) -> &[usize] {
        &self.incoming_projections
    }

    pub fn outgoing_projections(&self) -> &[usize] {
        &self.outgoing_projections
    }

    pub(crate) fn register_incoming(&mut self, projection_id: usize) {
        self.incoming_projections.push(projection_id);
    }

    pub(crate) fn register_outgoing(&mut self, projection_id: usize) {
        self.outgoing_projections.push(projection_id);
    }

    pub fn activities(&self) -> Vec<f64> {
        self.neurons.iter().map(Neuron::act).collect()
    }

    pub fn minus_phase_activities(&self) -> Vec<f64> {
        self.neurons.iter().map(Neuron::act_m).collect()
    }

    pub fn net_inputs(&self) -> Vec<f64> {
        self.neurons.iter().map(Neuron::g_e).collect()
    }

    pub(crate) fn check_activities(&self, activities: &[f64]) -> Result<()> {
        if activities.len() != self.neurons.len() {
            return Err(Error::ShapeMismatch(format!(
                "area {} has {} neurons, got {} activities",
                self.name,
                self.neurons.len(),
                activities.len()
            )));
        }

        if let Some(act) = activities
            .iter()
            .find(|act| !act.is_finite() || **act < 0.0)
        {
            return Err(Error::InvariantViolation(format!(
                "area {}: forced activity must be finite and not negative, got {}",
                self.name, act
            )));
        }

        Ok(())
    }

    pub fn force_activity(&mut self, activities: &[f64]) -> Result<()> {
        self.check_activities(activities)?;

        for (neuron, act) in self.neurons.iter_mut().zip(activities) {
            neuron.force_activity(*act, &self.neuron_params)?;
        }

        Ok(())
    }

    fn inhibition(&mut self) -> f64 {
        let params = &self.inhibition_params;

        if !params.enabled {
            return 0.0;
        }

        let mean_net_input = util::mean(self.neurons.iter().map(Neuron::g_e));
        self.ffi = params.ff * (mean_net_input - params.ff0).max(0.0);
        self.fbi += params.fb_dt * (params.fb * self.avg_act - self.fbi);

        params.gain * (self.ffi + self.fbi)
    }

    pub fn step(&mut self, phase: Phase, num_threads: usize) {
        let neuron_params = &self.neuron_params;
        for_each_partitioned(&mut self.neurons, num_threads, |neuron| {
            neuron.calculate_net_input(neuron_params)
        });

        if phase == Phase::Minus {
            self.gc_i = self.inhibition();
        }

        let gc_i = self.gc_i;
        let neuron_params = &self.neuron_params;
        let nxx1 = self.nxx1.as_ref();
        for_each_partitioned(&mut self.neurons, num_threads, |neuron| {
            neuron.step(gc_i, neuron_params, nxx1)
        });

        self.avg_act = util::mean(self.neurons.iter().map(Neuron::act));
    }

    pub fn cycle_init(&mut self) {
        for neuron in &mut self.neurons {
            neuron.reset(&self.neuron_params);
        }

        self.ffi -= self.inhibition_params.reset * self.ffi;
        self.fbi -= self.inhibition_params.reset * self.fbi;
    }

    pub fn snapshot_minus_phase(&mut self) {
        self.neurons
            .iter_mut()
            .for_each(Neuron::snapshot_minus_phase);
    }

    pub fn update_avg_l(&mut self) {
        for neuron in &mut self.neurons {
            neuron.update_avg_l(&self.neuron_params);
        }
    }
}

fn for_each_partitioned<F>(neurons: &mut [Neuron], num_threads: usize, f: F)
where
    F: Fn(&mut Neuron) + Sync,
{
    if num_threads <= 1 || neurons.len() < num_threads * MIN_NEURONS_PER_THREAD {
        neurons.iter_mut().for_each(f);
        return;
    }

    let f = &f;
    thread::scope(|scope| {
        for partition in util::split_into_partitions(neurons, num_threads) {
            scope.spawn(move || partition.iter_mut().for_each(f));
        }
    });
}
