use std::str::FromStr;

use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

use crate::error::{Error, Result};
use crate::types::{HashSet, NeuronType};

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkParams {
    pub areas: Vec<AreaParams>,
    #[serde(default)]
    pub projections: Vec<ProjectionParams>,
    #[serde(default)]
    pub schedule: ScheduleParams,
    #[serde(default)]
    pub technical_params: TechnicalParams,
}

impl NetworkParams {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|err| Error::Configuration(err.to_string()))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| Error::Configuration(err.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaParams {
    pub name: String,
    pub num_neurons: usize,
    #[serde(default)]
    pub neuron_type: NeuronType,
    #[serde(default)]
    pub neuron_params: NeuronParams,
    #[serde(default)]
    pub inhibition_params: InhibitionParams,
}

impl AreaParams {
    pub fn new(name: &str, num_neurons: usize, neuron_type: NeuronType) -> Self {
        Self {
            name: name.to_owned(),
            num_neurons,
            neuron_type,
            neuron_params: NeuronParams::default(),
            inhibition_params: InhibitionParams::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectionParams {
    pub from_area: String,
    pub to_area: String,
    #[serde(default)]
    pub connectivity: ConnectPattern,
    #[serde(default)]
    pub initial_weight: InitialWeight,
    #[serde(default = "default_wt_scale")]
    pub wt_scale_abs: f64,
    #[serde(default = "default_wt_scale")]
    pub wt_scale_rel: f64,
    #[serde(default)]
    pub sigmoid: SigmoidParams,
    #[serde(default = "default_learning_params")]
    pub learning: Option<LearningParams>,
}

fn default_wt_scale() -> f64 {
    1.0
}

fn default_learning_params() -> Option<LearningParams> {
    Some(LearningParams::default())
}

impl ProjectionParams {
    pub fn defaults_for_areas(from_area: &str, to_area: &str) -> Self {
        Self {
            from_area: from_area.to_owned(),
            to_area: to_area.to_owned(),
            connectivity: ConnectPattern::default(),
            initial_weight: InitialWeight::default(),
            wt_scale_abs: default_wt_scale(),
            wt_scale_rel: default_wt_scale(),
            sigmoid: SigmoidParams::default(),
            learning: default_learning_params(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectPattern {
    #[default]
    #[serde(rename = "full")]
    Full,
    #[serde(rename = "one-to-one", alias = "1to1")]
    OneToOne,
}

impl FromStr for ConnectPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "full" => Ok(ConnectPattern::Full),
            "one-to-one" | "1to1" => Ok(ConnectPattern::OneToOne),
            _ => Err(Error::Configuration(format!(
                "unsupported connectivity pattern: {}",
                s
            ))),
        }
    }
}

// Distribution of the initial synaptic weights. `var` is the +- range for
// the uniform case and the variance for the gaussian case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InitialWeight {
    Uniform { mean: f64, var: f64 },
    Gaussian { mean: f64, var: f64 },
}

impl InitialWeight {
    pub fn from_tag(tag: &str, mean: f64, var: f64) -> Result<Self> {
        match tag.to_lowercase().as_str() {
            "uniform" => Ok(InitialWeight::Uniform { mean, var }),
            "gaussian" => Ok(InitialWeight::Gaussian { mean, var }),
            _ => Err(Error::Configuration(format!(
                "unsupported weight distribution: {}",
                tag
            ))),
        }
    }
}

impl Default for InitialWeight {
    fn default() -> Self {
        InitialWeight::Uniform {
            mean: 0.5,
            var: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SigmoidParams {
    pub offset: f64,
    pub gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LearningParams {
    pub lrate: f64,
    pub m_lrn: f64,
    pub d_thr: f64,
    pub d_rev: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InhibitionParams {
    pub enabled: bool,
    pub ff: f64,
    pub fb: f64,
    pub fb_dt: f64,
    pub gain: f64,
    pub reset: f64,
    pub ff0: f64,
    pub avg_act_targ_init: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NeuronParams {
    pub net_input_dt: f64,
    pub v_m_dt: f64,
    pub integ_dt: f64,

    pub g_bar_e: f64,
    pub g_bar_i: f64,
    pub g_bar_l: f64,
    pub g_l: f64,

    pub e_e: f64,
    pub e_i: f64,
    pub e_l: f64,

    pub act_thr: f64,
    pub act_gain: f64,
    pub act_sd: f64,
    pub act_min: f64,
    pub act_max: f64,

    pub v_m_init: f64,
    pub v_m_r: f64,

    pub adapt_on: bool,
    pub adapt_dt: f64,
    pub v_m_gain: f64,
    pub spike_gain: f64,

    pub avg_init: f64,
    pub avg_l_init: f64,
    pub avg_ss_dt: f64,
    pub avg_s_dt: f64,
    pub avg_m_dt: f64,
    pub avg_l_dt: f64,
    pub avg_l_min: f64,
    pub avg_l_gain: f64,
    pub avg_m_in_s: f64,
    pub avg_lrn_min: f64,
    pub avg_lrn_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleParams {
    pub quarter_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TechnicalParams {
    pub seed_override: Option<u64>,
    pub num_threads: Option<usize>,
}

impl Default for NeuronParams {
    fn default() -> Self {
        Self {
            net_input_dt: 1.0 / 1.4,
            v_m_dt: 1.0 / 3.3,
            integ_dt: 1.0,
            g_bar_e: 1.0,
            g_bar_i: 1.0,
            g_bar_l: 0.1,
            g_l: 1.0,
            e_e: 1.0,
            e_i: 0.25,
            e_l: 0.3,
            act_thr: 0.5,
            act_gain: 100.0,
            act_sd: 0.01,
            act_min: 0.0,
            act_max: 0.95,
            v_m_init: 0.4,
            v_m_r: 0.3,
            adapt_on: true,
            adapt_dt: 1.0 / 144.0,
            v_m_gain: 0.04,
            spike_gain: 0.00805,
            avg_init: 0.15,
            avg_l_init: 0.4,
            avg_ss_dt: 0.5,
            avg_s_dt: 0.5,
            avg_m_dt: 0.1,
            avg_l_dt: 0.1,
            avg_l_min: 0.2,
            avg_l_gain: 2.5,
            avg_m_in_s: 0.1,
            avg_lrn_min: 0.0001,
            avg_lrn_max: 0.5,
        }
    }
}

impl Default for InhibitionParams {
    fn default() -> Self {
        Self {
            enabled: true,
            ff: 1.0,
            fb: 1.0,
            fb_dt: 1.0 / 1.4,
            gain: 1.8,
            reset: 1.0,
            ff0: 0.1,
            avg_act_targ_init: 0.2,
        }
    }
}

impl Default for SigmoidParams {
    fn default() -> Self {
        Self {
            offset: 1.0,
            gain: 6.0,
        }
    }
}

impl Default for LearningParams {
    fn default() -> Self {
        Self {
            lrate: 0.04,
            m_lrn: 1.0,
            d_thr: 0.0001,
            d_rev: 0.1,
        }
    }
}

impl Default for ScheduleParams {
    fn default() -> Self {
        Self { quarter_length: 25 }
    }
}

impl Default for TechnicalParams {
    fn default() -> Self {
        Self {
            seed_override: None,
            num_threads: Some(1),
        }
    }
}

pub fn validate_network_params(network_params: &NetworkParams) -> Result<(), SimpleError> {
    let mut seen_names = HashSet::default();

    for area_params in &network_params.areas {
        if !seen_names.insert(area_params.name.as_str()) {
            return Err(SimpleError::new(format!(
                "duplicate area name: {}",
                area_params.name
            )));
        }

        validate_area_params(area_params)?;
    }

    let mut seen_from_to_pairs = HashSet::default();

    for prj_params in &network_params.projections {
        if !seen_from_to_pairs.insert((prj_params.from_area.as_str(), prj_params.to_area.as_str()))
        {
            return Err(SimpleError::new(format!(
                "duplicate projection from area {} to area {}",
                prj_params.from_area, prj_params.to_area
            )));
        }

        validate_projection_params(prj_params)?;
    }

    validate_schedule_params(&network_params.schedule)?;
    validate_technical_params(&network_params.technical_params)?;

    Ok(())
}

pub fn validate_area_params(area_params: &AreaParams) -> Result<(), SimpleError> {
    if area_params.name.is_empty() {
        return Err(SimpleError::new("area name must not be empty"));
    }

    if area_params.num_neurons == 0 {
        return Err(SimpleError::new(format!(
            "area {}: num_neurons must be strictly positive",
            area_params.name
        )));
    }

    validate_neuron_params(&area_params.neuron_params)?;
    validate_inhibition_params(&area_params.inhibition_params)?;

    Ok(())
}

fn validate_finite(values: &[(&str, f64)]) -> Result<(), SimpleError> {
    for (name, value) in values {
        if !value.is_finite() {
            return Err(SimpleError::new(format!("{} must be finite", name)));
        }
    }

    Ok(())
}

fn validate_rate(name: &str, value: f64) -> Result<(), SimpleError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(SimpleError::new(format!("{} must be in (0, 1]", name)));
    }

    Ok(())
}

fn validate_neuron_params(neuron_params: &NeuronParams) -> Result<(), SimpleError> {
    validate_finite(&[
        ("net_input_dt", neuron_params.net_input_dt),
        ("v_m_dt", neuron_params.v_m_dt),
        ("integ_dt", neuron_params.integ_dt),
        ("g_bar_e", neuron_params.g_bar_e),
        ("g_bar_i", neuron_params.g_bar_i),
        ("g_bar_l", neuron_params.g_bar_l),
        ("g_l", neuron_params.g_l),
        ("e_e", neuron_params.e_e),
        ("e_i", neuron_params.e_i),
        ("e_l", neuron_params.e_l),
        ("act_thr", neuron_params.act_thr),
        ("act_gain", neuron_params.act_gain),
        ("act_sd", neuron_params.act_sd),
        ("act_min", neuron_params.act_min),
        ("act_max", neuron_params.act_max),
        ("v_m_init", neuron_params.v_m_init),
        ("v_m_r", neuron_params.v_m_r),
        ("adapt_dt", neuron_params.adapt_dt),
        ("v_m_gain", neuron_params.v_m_gain),
        ("spike_gain", neuron_params.spike_gain),
        ("avg_init", neuron_params.avg_init),
        ("avg_l_init", neuron_params.avg_l_init),
        ("avg_ss_dt", neuron_params.avg_ss_dt),
        ("avg_s_dt", neuron_params.avg_s_dt),
        ("avg_m_dt", neuron_params.avg_m_dt),
        ("avg_l_dt", neuron_params.avg_l_dt),
        ("avg_l_min", neuron_params.avg_l_min),
        ("avg_l_gain", neuron_params.avg_l_gain),
        ("avg_m_in_s", neuron_params.avg_m_in_s),
        ("avg_lrn_min", neuron_params.avg_lrn_min),
        ("avg_lrn_max", neuron_params.avg_lrn_max),
    ])?;

    validate_rate("net_input_dt", neuron_params.net_input_dt)?;
    validate_rate("v_m_dt", neuron_params.v_m_dt)?;
    validate_rate("adapt_dt", neuron_params.adapt_dt)?;
    validate_rate("avg_ss_dt", neuron_params.avg_ss_dt)?;
    validate_rate("avg_s_dt", neuron_params.avg_s_dt)?;
    validate_rate("avg_m_dt", neuron_params.avg_m_dt)?;
    validate_rate("avg_l_dt", neuron_params.avg_l_dt)?;

    if neuron_params.integ_dt <= 0.0 {
        return Err(SimpleError::new("integ_dt must be strictly positive"));
    }

    if neuron_params.g_bar_e <= 0.0 {
        return Err(SimpleError::new("g_bar_e must be strictly positive"));
    }

    if neuron_params.act_thr >= neuron_params.e_e {
        return Err(SimpleError::new("act_thr must be less than e_e"));
    }

    if neuron_params.act_gain <= 0.0 {
        return Err(SimpleError::new("act_gain must be strictly positive"));
    }

    if neuron_params.act_sd < 0.0 {
        return Err(SimpleError::new("act_sd must not be negative"));
    }

    if neuron_params.act_min >= neuron_params.act_max {
        return Err(SimpleError::new("act_min must be less than act_max"));
    }

    if neuron_params.avg_l_min < 0.0 {
        return Err(SimpleError::new("avg_l_min must not be negative"));
    }

    if neuron_params.avg_l_gain <= neuron_params.avg_l_min {
        return Err(SimpleError::new("avg_l_gain must be greater than avg_l_min"));
    }

    if neuron_params.avg_m_in_s < 0.0 || neuron_params.avg_m_in_s > 1.0 {
        return Err(SimpleError::new("avg_m_in_s must be in [0, 1]"));
    }

    if neuron_params.avg_lrn_min > neuron_params.avg_lrn_max {
        return Err(SimpleError::new(
            "avg_lrn_min must not be greater than avg_lrn_max",
        ));
    }

    Ok(())
}

fn validate_inhibition_params(inhibition_params: &InhibitionParams) -> Result<(), SimpleError> {
    validate_finite(&[
        ("ff", inhibition_params.ff),
        ("fb", inhibition_params.fb),
        ("fb_dt", inhibition_params.fb_dt),
        ("gain", inhibition_params.gain),
        ("reset", inhibition_params.reset),
        ("ff0", inhibition_params.ff0),
        ("avg_act_targ_init", inhibition_params.avg_act_targ_init),
    ])?;

    validate_rate("fb_dt", inhibition_params.fb_dt)?;

    if inhibition_params.gain < 0.0 || inhibition_params.ff < 0.0 || inhibition_params.fb < 0.0 {
        return Err(SimpleError::new("inhibition gains must not be negative"));
    }

    if inhibition_params.reset < 0.0 || inhibition_params.reset > 1.0 {
        return Err(SimpleError::new("inhibition reset must be in [0, 1]"));
    }

    validate_rate("avg_act_targ_init", inhibition_params.avg_act_targ_init)?;

    Ok(())
}

pub fn validate_projection_params(prj_params: &ProjectionParams) -> Result<(), SimpleError> {
    validate_finite(&[
        ("wt_scale_abs", prj_params.wt_scale_abs),
        ("wt_scale_rel", prj_params.wt_scale_rel),
        ("sigmoid offset", prj_params.sigmoid.offset),
        ("sigmoid gain", prj_params.sigmoid.gain),
    ])?;

    if prj_params.wt_scale_abs < 0.0 {
        return Err(SimpleError::new("wt_scale_abs must not be negative"));
    }

    if prj_params.wt_scale_rel < 0.0 {
        return Err(SimpleError::new("wt_scale_rel must not be negative"));
    }

    match prj_params.initial_weight {
        InitialWeight::Uniform { mean, var } | InitialWeight::Gaussian { mean, var } => {
            if !(0.0..=1.0).contains(&mean) {
                return Err(SimpleError::new("initial weight mean must be in [0, 1]"));
            }

            if !var.is_finite() {
                return Err(SimpleError::new("initial weight variance must be finite"));
            }

            if var < 0.0 {
                return Err(SimpleError::new(
                    "initial weight variance must not be negative",
                ));
            }
        }
    }

    if prj_params.sigmoid.offset <= 0.0 {
        return Err(SimpleError::new("sigmoid offset must be strictly positive"));
    }

    if prj_params.sigmoid.gain <= 0.0 {
        return Err(SimpleError::new("sigmoid gain must be strictly positive"));
    }

    if let Some(learning_params) = &prj_params.learning {
        validate_learning_params(learning_params)?;
    }

    Ok(())
}

fn validate_learning_params(learning_params: &LearningParams) -> Result<(), SimpleError> {
    validate_finite(&[
        ("lrate", learning_params.lrate),
        ("m_lrn", learning_params.m_lrn),
        ("d_thr", learning_params.d_thr),
        ("d_rev", learning_params.d_rev),
    ])?;

    if learning_params.lrate < 0.0 {
        return Err(SimpleError::new("lrate must not be negative"));
    }

    if learning_params.d_thr < 0.0 {
        return Err(SimpleError::new("d_thr must not be negative"));
    }

    if learning_params.d_rev <= 0.0 || learning_params.d_rev >= 1.0 {
        return Err(SimpleError::new("d_rev must be in (0, 1)"));
    }

    Ok(())
}

pub fn validate_schedule_params(schedule_params: &ScheduleParams) -> Result<(), SimpleError> {
    if schedule_params.quarter_length == 0 {
        return Err(SimpleError::new("quarter_length must be strictly positive"));
    }

    Ok(())
}

pub fn validate_technical_params(technical_params: &TechnicalParams) -> Result<(), SimpleError> {
    if let Some(num_threads) = technical_params.num_threads {
        if num_threads == 0 {
            return Err(SimpleError::new("num_threads must be strictly positive"));
        }

        if num_cpus::get() < num_threads {
            return Err(SimpleError::new(
                "num_threads must not be greater than number of available CPUs",
            ));
        }
    }

    Ok(())
}
