use nexus::network::create_network;

#[path = "../scenario_params.rs"]
mod scenario_params;

fn main() {
    let mut network = create_network(scenario_params::get_scenario_params()).unwrap();

    let num_cycles = 8;
    let mut sse_checksum = 0.0;

    for cycle in 0..num_cycles {
        let orientation = cycle % scenario_params::NUM_ORIENTATIONS;
        let offset = (cycle as f64 - 4.0) * 0.5;
        let (on, off, target) = scenario_params::make_oriented_edge(orientation, offset);

        sse_checksum += (cycle + 1) as f64
            * network
                .train([("LGN_ON", on), ("LGN_OFF", off)], [("ORIENTATION", target)])
                .unwrap();
    }

    println!("batch result:");
    println!("...sse checksum: {}", sse_checksum);
    println!("...total steps: {}", network.total_steps());

    for projection in network.projections() {
        let from_area = &network.areas()[projection.from_area()];
        let to_area = &network.areas()[projection.to_area()];

        let weight_checksum: f64 = projection
            .synapses()
            .iter()
            .map(|synapse| {
                (synapse.pre_idx + 1) as f64 * (synapse.post_idx + 1) as f64 * synapse.wt()
            })
            .sum();

        println!(
            "...weights checksum {} -> {}: {}",
            from_area.name(),
            to_area.name(),
            weight_checksum
        );
    }

    let (on, off, _) = scenario_params::make_oriented_edge(0, 0.0);
    let orientation_act_m = network
        .evaluate([("LGN_ON", on), ("LGN_OFF", off)], "ORIENTATION")
        .unwrap();

    let state_snapshot = network.extract_state_snapshot();

    let voltage_checksum: f64 = state_snapshot
        .area_states
        .iter()
        .flat_map(|area_state| area_state.neuron_states.iter())
        .map(|neuron_state| neuron_state.v_m)
        .sum();

    let inhibition_checksum: f64 = state_snapshot
        .area_states
        .iter()
        .map(|area_state| area_state.gc_i)
        .sum();

    println!("single result:");
    println!("...orientation activities: {:?}", orientation_act_m);
    println!("...voltages checksum: {}", voltage_checksum);
    println!("...inhibition checksum: {}", inhibition_checksum);
}
