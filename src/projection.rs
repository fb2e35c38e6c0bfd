use itertools::iproduct;
use rand::{distributions::Uniform, prelude::Distribution, rngs::StdRng};
use statrs::distribution::Normal;

use crate::{
    area::Area,
    error::{Error, Result},
    params::{ConnectPattern, InitialWeight, LearningParams, ProjectionParams, SigmoidParams},
    synapse::Synapse,
    util,
};

const SEM_EXTRA: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct Projection {
    from_area: usize,
    to_area: usize,
    connectivity: ConnectPattern,
    pre_size: usize,
    post_size: usize,
    synapses: Vec<Synapse>,
    wt_scale_abs: f64,
    wt_scale_rel: f64,
    wt_scale_rel_eff: Option<f64>,
    wt_scale_act: f64,
    sigmoid_params: SigmoidParams,
    learning_params: Option<LearningParams>,
}

impl Projection {
    pub fn new(
        prj_params: &ProjectionParams,
        from_area: usize,
        pre: &Area,
        to_area: usize,
        post: &Area,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let index_pairs: Vec<(usize, usize)> = match prj_params.connectivity {
            ConnectPattern::Full => iproduct!(0..pre.len(), 0..post.len()).collect(),
            ConnectPattern::OneToOne => {
                if pre.len() != post.len() {
                    return Err(Error::Configuration(format!(
                        "one-to-one projection from area {} ({} neurons) to area {} ({} neurons) requires equal sizes",
                        pre.name(),
                        pre.len(),
                        post.name(),
                        post.len()
                    )));
                }
                (0..pre.len()).map(|idx| (idx, idx)).collect()
            }
        };

        let initial_weights = sample_weights(&prj_params.initial_weight, index_pairs.len(), rng)?;

        let synapses = index_pairs
            .into_iter()
            .zip(initial_weights)
            .map(|((pre_idx, post_idx), w0)| {
                Synapse::new(pre_idx, post_idx, w0, &prj_params.sigmoid)
            })
            .collect();

        Ok(Self {
            from_area,
            to_area,
            connectivity: prj_params.connectivity,
            pre_size: pre.len(),
            post_size: post.len(),
            synapses,
            wt_scale_abs: prj_params.wt_scale_abs,
            wt_scale_rel: prj_params.wt_scale_rel,
            wt_scale_rel_eff: None,
            wt_scale_act: 1.0,
            sigmoid_params: prj_params.sigmoid.clone(),
            learning_params: prj_params.learning.clone(),
        })
    }

    pub fn from_area(&self) -> usize {
        self.from_area
    }

    pub fn to_area(&self) -> usize {
        self.to_area
    }

    pub fn connectivity(&self) -> ConnectPattern {
        self.connectivity
    }

    pub fn synapses(&self) -> &[Synapse] {
        &self.synapses
    }

    pub fn wt_scale_abs(&self) -> f64 {
        self.wt_scale_abs
    }

    pub fn wt_scale_rel(&self) -> f64 {
        self.wt_scale_rel
    }

    pub fn wt_scale_act(&self) -> f64 {
        self.wt_scale_act
    }

    pub fn wt_scale_rel_eff(&self) -> Result<f64> {
        self.wt_scale_rel_eff.ok_or_else(|| {
            Error::Configuration(
                "relative weight scale is not normalized, the network must be built first"
                    .to_owned(),
            )
        })
    }

    pub(crate) fn set_wt_scale_rel_eff(&mut self, wt_scale_rel_eff: f64) {
        self.wt_scale_rel_eff = Some(wt_scale_rel_eff);
    }

    pub(crate) fn invalidate_wt_scale_rel_eff(&mut self) {
        self.wt_scale_rel_eff = None;
    }

    pub fn wt_scale(&self) -> Result<f64> {
        Ok(self.wt_scale_act * self.wt_scale_rel_eff()?)
    }

    pub fn learning_params(&self) -> Option<&LearningParams> {
        self.learning_params.as_ref()
    }

    pub fn transmit(&self, pre_acts: &[f64], post: &mut Area) -> Result<()> {
        let scale = self.wt_scale_abs * self.wt_scale()?;
        let mut totals = vec![0.0; self.post_size];

        for synapse in &self.synapses {
            totals[synapse.post_idx] += scale * synapse.wt() * pre_acts[synapse.pre_idx];
        }

        for (neuron, total) in post.neurons_mut().iter_mut().zip(totals) {
            if !neuron.is_forced() {
                neuron.add_excitatory(total)?;
            }
        }

        Ok(())
    }

    pub fn compute_netin_scaling(&mut self, pre: &Area) {
        let pre_avg_act = pre.avg_act_p_eff();
        let pre_size = self.pre_size as f64;
        let pre_act_n = (pre_avg_act * pre_size + 0.5).trunc().max(1.0);

        self.wt_scale_act = match self.connectivity {
            ConnectPattern::OneToOne => 1.0 / pre_act_n,
            ConnectPattern::Full => {
                let fan_in = pre_size;
                let post_act_n_max = fan_in.min(pre_act_n);
                let post_act_n_avg = (pre_avg_act * fan_in + 0.5).max(1.0);
                let post_act_n_exp = post_act_n_max.min(post_act_n_avg + SEM_EXTRA);
                1.0 / post_act_n_exp
            }
        };
    }

    pub fn learn(&mut self, pre: &Area, post: &Area) {
        if let Some(learning_params) = &self.learning_params {
            let pre_neurons = pre.neurons();
            let post_neurons = post.neurons();
            let post_type = post.neuron_type();
            let post_params = post.neuron_params();

            for synapse in &mut self.synapses {
                let pre_neuron = &pre_neurons[synapse.pre_idx];
                let post_neuron = &post_neurons[synapse.post_idx];

                let srs = post_neuron.avg_s_eff() * pre_neuron.avg_s_eff();
                let srm = post_neuron.avg_m() * pre_neuron.avg_m();
                let avg_l_lrn = post_neuron.avg_l_lrn(post_type, post_params);

                synapse.accumulate_dwt(
                    learning_params.lrate
                        * (learning_params.m_lrn * util::xcal(srs, srm, learning_params)
                            + avg_l_lrn * util::xcal(srs, post_neuron.avg_l(), learning_params)),
                );
            }

            for synapse in &mut self.synapses {
                synapse.apply_dwt(&self.sigmoid_params);
            }
        }

        self.synapses.iter_mut().for_each(Synapse::clip);
    }

    pub fn weights(&self) -> Vec<Vec<f64>> {
        match self.connectivity {
            ConnectPattern::OneToOne => vec![self.synapses.iter().map(Synapse::wt).collect()],
            ConnectPattern::Full => self
                .synapses
                .chunks(self.post_size.max(1))
                .map(|row| row.iter().map(Synapse::wt).collect())
                .collect(),
        }
    }

    pub fn set_weights(&mut self, weights: &[Vec<f64>]) -> Result<()> {
        let (expected_rows, expected_cols) = self.weight_shape();

        if weights.len() != expected_rows || weights.iter().any(|row| row.len() != expected_cols)
        {
            return Err(Error::ShapeMismatch(format!(
                "expected a {}x{} weight matrix",
                expected_rows, expected_cols
            )));
        }

        if weights
            .iter()
            .flatten()
            .any(|wt| !(0.0..=1.0).contains(wt))
        {
            return Err(Error::Configuration(
                "weights must be in [0, 1]".to_owned(),
            ));
        }

        for (synapse, wt) in self.synapses.iter_mut().zip(weights.iter().flatten()) {
            synapse.set_weight(*wt, &self.sigmoid_params);
        }

        Ok(())
    }

    pub fn weight_shape(&self) -> (usize, usize) {
        match self.connectivity {
            ConnectPattern::OneToOne => (1, self.synapses.len()),
            ConnectPattern::Full => (self.pre_size, self.post_size),
        }
    }
}

fn sample_weights(
    initial_weight: &InitialWeight,
    count: usize,
    rng: &mut StdRng,
) -> Result<Vec<f64>> {
    let weights = match *initial_weight {
        InitialWeight::Uniform { mean, var } | InitialWeight::Gaussian { mean, var }
            if !(mean + var).is_finite() || !(mean - var).is_finite() || var < 0.0 =>
        {
            return Err(Error::Configuration(format!(
                "invalid initial weight distribution: mean {}, variance {}",
                mean, var
            )));
        }
        InitialWeight::Uniform { mean, var } => {
            let dist = Uniform::new_inclusive(mean - var, mean + var);
            dist.sample_iter(rng).take(count).collect::<Vec<f64>>()
        }
        InitialWeight::Gaussian { mean, var } => {
            if var == 0.0 {
                vec![mean; count]
            } else {
                let dist = Normal::new(mean, var.sqrt())
                    .map_err(|err| Error::Configuration(err.to_string()))?;
                dist.sample_iter(rng).take(count).collect()
            }
        }
    };

    Ok(weights.into_iter().map(|wt| wt.clamp(0.0, 1.0)).collect())
}
