use std::sync::Arc;

use log::debug;

use crate::types::HashMap;

const RESOLUTION: f64 = 0.001;

#[derive(Debug, Clone)]
pub struct NoisyXx1 {
    gain: f64,
    x_start: f64,
    values: Vec<f64>,
}

impl NoisyXx1 {
    pub fn new(gain: f64, sd: f64) -> Self {
        let noise_range = (3.0 * sd).max(RESOLUTION);
        let half_width = (noise_range / RESOLUTION).round() as i64;
        let upper = (1.0 / RESOLUTION).round() as i64;
        let var = sd.max(1.0e-6).powi(2);

        let mut kernel: Vec<f64> = (-half_width..=half_width)
            .map(|k| {
                let x = k as f64 * RESOLUTION;
                (-x * x / var).exp()
            })
            .collect();
        let kernel_sum: f64 = kernel.iter().sum();
        kernel.iter_mut().for_each(|w| *w /= kernel_sum);

        // the ramp is evaluated on [-2 * noise, 1 + noise] so that every kept
        // sample sees the full kernel
        let values = (-half_width..=upper)
            .map(|k| {
                kernel
                    .iter()
                    .zip(-half_width..=half_width)
                    .map(|(w, j)| w * xx1(gain, (k - j) as f64 * RESOLUTION))
                    .sum()
            })
            .collect();

        Self {
            gain,
            x_start: -half_width as f64 * RESOLUTION,
            values,
        }
    }

    pub fn x_start(&self) -> f64 {
        self.x_start
    }

    pub fn x_end(&self) -> f64 {
        self.x_start + (self.values.len() - 1) as f64 * RESOLUTION
    }

    pub fn eval(&self, x: f64) -> f64 {
        if x < self.x_start {
            0.0
        } else if x > self.x_end() {
            xx1(self.gain, x)
        } else {
            let pos = (x - self.x_start) / RESOLUTION;
            let idx = (pos.floor() as usize).min(self.values.len() - 2);
            let frac = pos - idx as f64;
            self.values[idx] + frac * (self.values[idx + 1] - self.values[idx])
        }
    }
}

fn xx1(gain: f64, x: f64) -> f64 {
    let x = gain * x.max(0.0);
    x / (x + 1.0)
}

#[derive(Debug, Default, Clone)]
pub struct Nxx1Registry {
    tables: HashMap<(u64, u64), Arc<NoisyXx1>>,
}

impl Nxx1Registry {
    pub fn get_or_build(&mut self, gain: f64, sd: f64) -> Arc<NoisyXx1> {
        self.tables
            .entry((gain.to_bits(), sd.to_bits()))
            .or_insert_with(|| {
                debug!("building noisy xx1 table for gain {} and sd {}", gain, sd);
                Arc::new(NoisyXx1::new(gain, sd))
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
