use crate::{
    params::SigmoidParams,
    util::{inverse_sigmoid, sigmoid},
};

#[derive(Debug, Clone)]
pub struct Synapse {
    pub pre_idx: usize,
    pub post_idx: usize,
    wt: f64,
    fwt: f64,
    dwt: f64,
}

impl Synapse {
    pub fn new(
        pre_idx: usize,
        post_idx: usize,
        initial_weight: f64,
        sigmoid_params: &SigmoidParams,
    ) -> Self {
        Self {
            pre_idx,
            post_idx,
            wt: initial_weight,
            fwt: inverse_sigmoid(initial_weight, sigmoid_params),
            dwt: 0.0,
        }
    }

    pub fn wt(&self) -> f64 {
        self.wt
    }

    pub fn fwt(&self) -> f64 {
        self.fwt
    }

    pub fn dwt(&self) -> f64 {
        self.dwt
    }

    pub fn set_weight(&mut self, wt: f64, sigmoid_params: &SigmoidParams) {
        self.wt = wt;
        self.fwt = inverse_sigmoid(wt, sigmoid_params);
    }

    pub fn accumulate_dwt(&mut self, dwt: f64) {
        self.dwt += dwt;
    }

    pub fn apply_dwt(&mut self, sigmoid_params: &SigmoidParams) {
        if self.dwt > 0.0 {
            self.dwt *= 1.0 - self.fwt;
        } else {
            self.dwt *= self.fwt;
        }

        self.fwt += self.dwt;
        self.wt = sigmoid(self.fwt, sigmoid_params);
        self.dwt = 0.0;
    }

    pub fn clip(&mut self) {
        self.wt = self.wt.clamp(0.0, 1.0);
    }
}
