use std::time::Instant;

use nexus::network::create_network;
use rand::{distributions::Uniform, prelude::Distribution, rngs::StdRng, SeedableRng};

#[path = "../scenario_params.rs"]
mod scenario_params;

fn main() {
    let mut network = create_network(scenario_params::get_scenario_params()).unwrap();

    let mut rng = StdRng::seed_from_u64(0);
    let orientation_dist = Uniform::new(0, scenario_params::NUM_ORIENTATIONS);
    let offset_dist = Uniform::new(-2.0, 2.0);

    let num_cycles = 50;
    let mut sse_sum = 0.0;
    let mut synaptic_transmission_count = 0usize;

    let synapses_per_step: usize = network
        .projections()
        .iter()
        .map(|projection| projection.synapses().len())
        .sum();

    let wall_start = Instant::now();

    for _ in 0..num_cycles {
        let orientation = orientation_dist.sample(&mut rng);
        let offset = offset_dist.sample(&mut rng);
        let (on, off, target) = scenario_params::make_oriented_edge(orientation, offset);

        sse_sum += network
            .train([("LGN_ON", on), ("LGN_OFF", off)], [("ORIENTATION", target)])
            .unwrap();

        synaptic_transmission_count += 4 * network.quarter_length() * synapses_per_step;
    }

    let wall_time = wall_start.elapsed();
    let step_throughput = network.total_steps() as f64 / wall_time.as_secs_f64();
    let synaptic_transm_proc_throughput =
        synaptic_transmission_count as f64 / wall_time.as_secs_f64();

    eprintln!("Mean SSE per cycle: {}", sse_sum / num_cycles as f64);
    eprintln!(
        "Step throughput: {:.3e} ({:.3} us per step)",
        step_throughput,
        1e6 / step_throughput
    );
    eprintln!(
        "Synaptic transmission processing throughput: {:.3e} ({:.3} ns per transmission)",
        synaptic_transm_proc_throughput,
        1e9 / synaptic_transm_proc_throughput
    );
}
