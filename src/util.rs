use std::ops::Range;

use crate::params::{LearningParams, SigmoidParams};

pub fn sigmoid(fwt: f64, sigmoid_params: &SigmoidParams) -> f64 {
    if fwt <= 0.0 {
        0.0
    } else if fwt >= 1.0 {
        1.0
    } else {
        1.0 / (1.0 + (sigmoid_params.offset * (1.0 - fwt) / fwt).powf(sigmoid_params.gain))
    }
}

pub fn inverse_sigmoid(wt: f64, sigmoid_params: &SigmoidParams) -> f64 {
    if wt <= 0.0 {
        0.0
    } else if wt >= 1.0 {
        1.0
    } else {
        1.0 / (1.0
            + ((1.0 - wt) / wt).powf(1.0 / sigmoid_params.gain) / sigmoid_params.offset)
    }
}

// Check-mark shaped XCAL function: dead zone below `d_thr`, depression up to
// `th * d_rev`, potentiation `x - th` beyond.
pub fn xcal(x: f64, th: f64, learning_params: &LearningParams) -> f64 {
    if x < learning_params.d_thr {
        0.0
    } else if x > th * learning_params.d_rev {
        x - th
    } else {
        -x * ((1.0 - learning_params.d_rev) / learning_params.d_rev)
    }
}

pub fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let len = values.len();
    if len == 0 {
        0.0
    } else {
        values.sum::<f64>() / len as f64
    }
}

pub fn get_partition_range(
    num_threads: usize,
    thread_id: usize,
    num_neurons_in_area: usize,
) -> Range<usize> {
    let min_partition_size = num_neurons_in_area / num_threads;
    let remainder = num_neurons_in_area % num_threads;

    if thread_id < remainder {
        let partition_size = min_partition_size + 1;
        let start = partition_size * thread_id;
        let end = start + partition_size;
        Range { start, end }
    } else {
        let start =
            (min_partition_size + 1) * remainder + min_partition_size * (thread_id - remainder);
        let end = start + min_partition_size;
        Range { start, end }
    }
}

pub fn split_into_partitions<T>(items: &mut [T], num_partitions: usize) -> Vec<&mut [T]> {
    let num_items = items.len();
    let mut partitions = Vec::with_capacity(num_partitions);
    let mut rest = items;

    for partition_id in 0..num_partitions {
        let range = get_partition_range(num_partitions, partition_id, num_items);
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
        partitions.push(head);
        rest = tail;
    }

    partitions
}
