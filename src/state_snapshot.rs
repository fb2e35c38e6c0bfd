use serde::{Deserialize, Serialize};

use crate::{area::Area, neuron::Neuron, params::NeuronParams, types::Phase};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub total_steps: usize,
    pub cycle_count: usize,
    pub quarter_num: usize,
    pub phase: Phase,
    pub area_states: Vec<AreaState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaState {
    pub name: String,
    pub gc_i: f64,
    pub ffi: f64,
    pub fbi: f64,
    pub avg_act: f64,
    pub neuron_states: Vec<NeuronState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuronState {
    pub net_input: f64,
    pub i_net: f64,
    pub i_net_r: f64,
    pub v_m: f64,
    pub v_m_eq: f64,
    pub act: f64,
    pub act_m: f64,
    pub adapt_curr: f64,
    pub did_spike: bool,
    pub avg_s_eff: f64,
    pub avg_m: f64,
    pub avg_l: f64,
}

impl AreaState {
    pub(crate) fn from_area(area: &Area) -> Self {
        let neuron_params = area.neuron_params();

        Self {
            name: area.name().to_owned(),
            gc_i: area.gc_i(),
            ffi: area.ffi(),
            fbi: area.fbi(),
            avg_act: area.avg_act(),
            neuron_states: area
                .neurons()
                .iter()
                .map(|neuron| NeuronState::from_neuron(neuron, neuron_params))
                .collect(),
        }
    }
}

impl NeuronState {
    fn from_neuron(neuron: &Neuron, neuron_params: &NeuronParams) -> Self {
        Self {
            net_input: neuron.net_input(neuron_params),
            i_net: neuron.i_net(),
            i_net_r: neuron.i_net_r(),
            v_m: neuron.v_m(),
            v_m_eq: neuron.v_m_eq(),
            act: neuron.act(),
            act_m: neuron.act_m(),
            adapt_curr: neuron.adapt_curr(),
            did_spike: neuron.did_spike(),
            avg_s_eff: neuron.avg_s_eff(),
            avg_m: neuron.avg_m(),
            avg_l: neuron.avg_l(),
        }
    }
}

pub trait StepObserver: Send {
    fn on_step(&mut self, snapshot: &StateSnapshot);
}

impl<F> StepObserver for F
where
    F: FnMut(&StateSnapshot) + Send,
{
    fn on_step(&mut self, snapshot: &StateSnapshot) {
        self(snapshot)
    }
}
