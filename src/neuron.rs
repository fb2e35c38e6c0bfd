use crate::{
    error::{Error, Result},
    nxx1::NoisyXx1,
    params::NeuronParams,
    types::NeuronType,
};

#[derive(Debug, Clone)]
pub struct Neuron {
    excitatory_inputs: Vec<f64>,
    g_e: f64,
    i_net: f64,
    i_net_r: f64,
    v_m: f64,
    v_m_eq: f64,
    act: f64,
    act_m: f64,
    act_ext: Option<f64>,
    adapt_curr: f64,
    did_spike: bool,
    avg_ss: f64,
    avg_s: f64,
    avg_m: f64,
    avg_l: f64,
    avg_s_eff: f64,
}

impl Neuron {
    pub fn new(neuron_params: &NeuronParams) -> Self {
        let mut neuron = Self {
            excitatory_inputs: Vec::new(),
            g_e: 0.0,
            i_net: 0.0,
            i_net_r: 0.0,
            v_m: neuron_params.v_m_init,
            v_m_eq: neuron_params.v_m_init,
            act: 0.0,
            act_m: 0.0,
            act_ext: None,
            adapt_curr: 0.0,
            did_spike: false,
            avg_ss: neuron_params.avg_init,
            avg_s: neuron_params.avg_init,
            avg_m: neuron_params.avg_init,
            avg_l: neuron_params.avg_l_init,
            avg_s_eff: 0.0,
        };
        neuron.reset(neuron_params);
        neuron
    }

    pub fn reset(&mut self, neuron_params: &NeuronParams) {
        self.excitatory_inputs.clear();
        self.g_e = 0.0;
        self.i_net = 0.0;
        self.i_net_r = 0.0;
        self.v_m = neuron_params.v_m_init;
        self.v_m_eq = neuron_params.v_m_init;
        self.act = 0.0;
        self.act_ext = None;
        self.adapt_curr = 0.0;
        self.did_spike = false;
    }

    pub fn force_activity(&mut self, act_ext: f64, neuron_params: &NeuronParams) -> Result<()> {
        if !self.excitatory_inputs.is_empty() {
            return Err(Error::InvariantViolation(format!(
                "cannot force activity with {} pending excitatory inputs",
                self.excitatory_inputs.len()
            )));
        }

        self.act_ext = Some(act_ext);
        self.g_e = act_ext / neuron_params.g_bar_e;
        self.i_net = 0.0;
        self.act = act_ext;

        self.v_m = if act_ext == 0.0 {
            neuron_params.e_l
        } else {
            neuron_params.act_thr + act_ext / neuron_params.act_gain
        };
        self.v_m_eq = self.v_m;

        Ok(())
    }

    pub fn add_excitatory(&mut self, input: f64) -> Result<()> {
        if self.act_ext.is_some() {
            return Err(Error::InvariantViolation(
                "forced neuron cannot receive excitatory input".to_owned(),
            ));
        }

        self.excitatory_inputs.push(input);
        Ok(())
    }

    pub fn calculate_net_input(&mut self, neuron_params: &NeuronParams) {
        if self.act_ext.is_some() {
            return;
        }

        let net_raw_input: f64 = self.excitatory_inputs.drain(..).sum();

        self.g_e +=
            neuron_params.integ_dt * neuron_params.net_input_dt * (net_raw_input - self.g_e);
    }

    pub fn step(&mut self, g_i: f64, neuron_params: &NeuronParams, nxx1: &NoisyXx1) {
        if self.act_ext.is_some() {
            self.update_avgs(neuron_params);
            return;
        }

        self.i_net = self.calculate_net_current(g_i, self.v_m, 2, neuron_params);
        self.i_net_r = self.calculate_net_current(g_i, self.v_m_eq, 1, neuron_params);

        let dt = neuron_params.integ_dt * neuron_params.v_m_dt;
        self.v_m += dt * self.i_net;
        self.v_m_eq += dt * self.i_net_r;

        self.did_spike = self.v_m > neuron_params.act_thr;
        if self.did_spike {
            self.v_m = neuron_params.v_m_r;
            self.i_net = 0.0;
        }

        let new_act = if self.v_m_eq <= neuron_params.act_thr {
            nxx1.eval(self.v_m_eq - neuron_params.act_thr)
        } else {
            let gc_e = neuron_params.g_bar_e * self.g_e;
            let gc_i = neuron_params.g_bar_i * g_i;
            let gc_l = neuron_params.g_bar_l * neuron_params.g_l;
            let g_e_thr = (gc_i * (neuron_params.e_i - neuron_params.act_thr)
                + gc_l * (neuron_params.e_l - neuron_params.act_thr)
                - self.adapt_curr)
                / (neuron_params.act_thr - neuron_params.e_e);

            nxx1.eval(gc_e - g_e_thr)
        }
        .clamp(neuron_params.act_min, neuron_params.act_max);

        self.act += dt * (new_act - self.act);

        if neuron_params.adapt_on {
            let spike_jump = if self.did_spike {
                neuron_params.spike_gain
            } else {
                0.0
            };

            self.adapt_curr += neuron_params.integ_dt
                * (neuron_params.adapt_dt
                    * (neuron_params.v_m_gain * (self.v_m - neuron_params.e_l) - self.adapt_curr)
                    + spike_jump);
        }

        self.update_avgs(neuron_params);
    }

    fn calculate_net_current(
        &self,
        g_i: f64,
        v_m_start: f64,
        sub_steps: usize,
        neuron_params: &NeuronParams,
    ) -> f64 {
        let gc_e = neuron_params.g_bar_e * self.g_e;
        let gc_i = neuron_params.g_bar_i * g_i;
        let gc_l = neuron_params.g_bar_l * neuron_params.g_l;
        let sub_dt = neuron_params.integ_dt / sub_steps as f64 * neuron_params.v_m_dt;

        let mut v_m_eff = v_m_start;
        let mut i_net = 0.0;

        for _ in 0..sub_steps {
            i_net = gc_e * (neuron_params.e_e - v_m_eff)
                + gc_i * (neuron_params.e_i - v_m_eff)
                + gc_l * (neuron_params.e_l - v_m_eff)
                - self.adapt_curr;
            v_m_eff += sub_dt * i_net;
        }

        i_net
    }

    fn update_avgs(&mut self, neuron_params: &NeuronParams) {
        let dt = neuron_params.integ_dt;
        self.avg_ss += dt * neuron_params.avg_ss_dt * (self.act - self.avg_ss);
        self.avg_s += dt * neuron_params.avg_s_dt * (self.avg_ss - self.avg_s);
        self.avg_m += dt * neuron_params.avg_m_dt * (self.avg_s - self.avg_m);
        self.avg_s_eff =
            neuron_params.avg_m_in_s * self.avg_m + (1.0 - neuron_params.avg_m_in_s) * self.avg_s;
    }

    pub fn update_avg_l(&mut self, neuron_params: &NeuronParams) {
        self.avg_l +=
            neuron_params.avg_l_dt * (neuron_params.avg_l_gain * self.avg_m - self.avg_l);
        self.avg_l = self.avg_l.max(neuron_params.avg_l_min);
    }

    pub fn avg_l_lrn(&self, neuron_type: NeuronType, neuron_params: &NeuronParams) -> f64 {
        if neuron_type != NeuronType::Hidden {
            return 0.0;
        }

        let avg_fact = (neuron_params.avg_lrn_max - neuron_params.avg_lrn_min)
            / (neuron_params.avg_l_gain - neuron_params.avg_l_min);
        neuron_params.avg_lrn_min + avg_fact * (self.avg_l - neuron_params.avg_l_min)
    }

    pub fn snapshot_minus_phase(&mut self) {
        self.act_m = self.act;
    }

    pub fn net_input(&self, neuron_params: &NeuronParams) -> f64 {
        neuron_params.g_bar_e * self.g_e
    }

    pub fn is_forced(&self) -> bool {
        self.act_ext.is_some()
    }

    pub fn has_pending_input(&self) -> bool {
        !self.excitatory_inputs.is_empty()
    }

    pub fn g_e(&self) -> f64 {
        self.g_e
    }

    pub fn i_net(&self) -> f64 {
        self.i_net
    }

    pub fn i_net_r(&self) -> f64 {
        self.i_net_r
    }

    pub fn v_m(&self) -> f64 {
        self.v_m
    }

    pub fn v_m_eq(&self) -> f64 {
        self.v_m_eq
    }

    pub fn act(&self) -> f64 {
        self.act
    }

    pub fn act_m(&self) -> f64 {
        self.act_m
    }

    pub fn adapt_curr(&self) -> f64 {
        self.adapt_curr
    }

    pub fn did_spike(&self) -> bool {
        self.did_spike
    }

    pub fn avg_ss(&self) -> f64 {
        self.avg_ss
    }

    pub fn avg_s(&self) -> f64 {
        self.avg_s
    }

    pub fn avg_m(&self) -> f64 {
        self.avg_m
    }

    pub fn avg_l(&self) -> f64 {
        self.avg_l
    }

    pub fn avg_s_eff(&self) -> f64 {
        self.avg_s_eff
    }
}
