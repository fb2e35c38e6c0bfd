use std::sync::mpsc::channel;

use float_cmp::assert_approx_eq;
use itertools::{assert_equal, Itertools};
use nexus::{
    network::{create_network, Network, NetworkBuilder},
    neuron::Neuron,
    params::{
        AreaParams, ConnectPattern, InitialWeight, NetworkParams, NeuronParams, ProjectionParams,
    },
    state_snapshot::StateSnapshot,
    types::{NeuronType, Phase},
    Error,
};

fn make_params() -> NetworkParams {
    let mut params = NetworkParams::default();
    params
        .areas
        .push(AreaParams::new("input", 6, NeuronType::Input));
    params
        .areas
        .push(AreaParams::new("hidden", 8, NeuronType::Hidden));
    params
        .areas
        .push(AreaParams::new("output", 2, NeuronType::Output));
    params
        .projections
        .push(ProjectionParams::defaults_for_areas("input", "hidden"));
    params
        .projections
        .push(ProjectionParams::defaults_for_areas("hidden", "output"));
    params
        .projections
        .push(ProjectionParams::defaults_for_areas("output", "hidden"));
    params
}

fn make_network() -> Network {
    create_network(make_params()).unwrap()
}

fn train_once(network: &mut Network) -> f64 {
    network
        .train(
            [("input", vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0])],
            [("output", vec![1.0, 0.0])],
        )
        .unwrap()
}

fn sigmoid(fwt: f64) -> f64 {
    if fwt <= 0.0 {
        0.0
    } else if fwt >= 1.0 {
        1.0
    } else {
        1.0 / (1.0 + ((1.0 - fwt) / fwt).powi(6))
    }
}

#[test]
fn empty_network() {
    let mut network = create_network(NetworkParams::default()).unwrap();
    assert_eq!(network.cycle().unwrap(), 0.0);
    assert_eq!(network.cycle_count(), 1);
}

#[test]
fn cycle_bookkeeping() {
    let mut network = make_network();
    let quarter_length = network.quarter_length();

    for _ in 0..4 * quarter_length {
        network.step().unwrap();
    }

    assert_eq!(network.cycle_count(), 1);
    assert_eq!(network.quarter_num(), 1);
    assert_eq!(network.step_count(), 0);
    assert_eq!(network.total_steps(), 100);
    assert_eq!(network.phase(), Phase::Minus);

    network.cycle().unwrap();
    assert_eq!(network.cycle_count(), 2);
    assert_eq!(network.total_steps(), 200);
}

#[test]
fn custom_quarter_length() {
    let mut params = make_params();
    params.schedule.quarter_length = 10;
    let mut network = create_network(params).unwrap();

    network.cycle().unwrap();

    assert_eq!(network.total_steps(), 40);
    assert_eq!(network.cycle_count(), 1);
}

#[test]
fn minus_phase_snapshot() {
    let mut network = make_network();
    network
        .set_inputs([("input", vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0])])
        .unwrap();

    for _ in 0..3 * network.quarter_length() - 1 {
        network.step().unwrap();
    }
    assert_equal(network.minus_phase_activities("hidden").unwrap(), [0.0; 8]);

    network.step().unwrap();
    let act_m = network.minus_phase_activities("hidden").unwrap();
    assert_eq!(act_m, network.activities("hidden").unwrap());
    assert!(act_m.iter().any(|act| *act > 0.0));

    for _ in 0..10 {
        network.step().unwrap();
    }
    assert_eq!(network.minus_phase_activities("hidden").unwrap(), act_m);
    assert_ne!(network.activities("hidden").unwrap(), act_m);
}

#[test]
fn sse_is_zero_for_exact_minus_phase_match() {
    let mut params = NetworkParams::default();
    params
        .areas
        .push(AreaParams::new("io", 2, NeuronType::Output));
    let mut network = create_network(params).unwrap();

    let sse = network
        .train([("io", vec![0.8, 0.2])], [("io", vec![0.8, 0.2])])
        .unwrap();

    assert_eq!(sse, 0.0);
    assert_eq!(network.minus_phase_activities("io").unwrap(), vec![0.8, 0.2]);
}

#[test]
fn sse_of_mismatch() {
    let mut params = NetworkParams::default();
    params
        .areas
        .push(AreaParams::new("io", 2, NeuronType::Output));
    let mut network = create_network(params).unwrap();

    let sse = network
        .train([("io", vec![0.5, 0.5])], [("io", vec![1.0, 0.0])])
        .unwrap();

    assert_approx_eq!(f64, sse, 0.5);
}

#[test]
fn forced_unit_rejects_input() {
    let neuron_params = NeuronParams::default();
    let mut neuron = Neuron::new(&neuron_params);

    neuron.force_activity(0.6, &neuron_params).unwrap();

    assert!(matches!(
        neuron.add_excitatory(0.3),
        Err(Error::InvariantViolation(_))
    ));
}

#[test]
fn forced_inputs_ignore_synaptic_drive() {
    let mut params = make_params();
    params
        .projections
        .push(ProjectionParams::defaults_for_areas("hidden", "input"));
    let mut network = create_network(params).unwrap();
    let pattern = vec![0.9, 0.1, 0.9, 0.1, 0.9, 0.1];
    network.set_inputs([("input", pattern.clone())]).unwrap();

    for _ in 0..60 {
        network.step().unwrap();
    }

    assert_eq!(network.activities("input").unwrap(), pattern);
}

#[test]
fn relative_scales_sum_to_one() {
    let mut params = make_params();
    params.projections[0].wt_scale_rel = 2.5;
    params.projections[2].wt_scale_rel = 0.5;
    let network = create_network(params).unwrap();

    for (area_id, area) in network.areas().iter().enumerate() {
        let incoming = network
            .projections()
            .iter()
            .filter(|prj| prj.to_area() == area_id)
            .collect_vec();

        assert_eq!(incoming.len(), area.incoming_projections().len());

        if !incoming.is_empty() {
            let sum: f64 = incoming
                .iter()
                .map(|prj| prj.wt_scale_rel_eff().unwrap())
                .sum();
            assert_approx_eq!(f64, sum, 1.0);
        }
    }
}

#[test]
fn non_finite_parameters_are_configuration_errors() {
    let mut params = make_params();
    params.projections[0].initial_weight = InitialWeight::Uniform {
        mean: 0.5,
        var: f64::NAN,
    };
    assert!(matches!(
        create_network(params),
        Err(Error::Configuration(_))
    ));

    let mut params = make_params();
    params.projections[1].initial_weight = InitialWeight::Uniform {
        mean: 0.5,
        var: f64::INFINITY,
    };
    assert!(matches!(
        create_network(params),
        Err(Error::Configuration(_))
    ));

    let mut params = make_params();
    params.areas[1].inhibition_params.fb_dt = f64::NAN;
    assert!(matches!(
        create_network(params),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn negative_or_nan_activities_rejected() {
    let mut network = make_network();

    assert!(matches!(
        network.set_inputs([("input", vec![-1.0; 6])]),
        Err(Error::InvariantViolation(_))
    ));
    assert!(matches!(
        network.train(
            [("input", vec![1.0; 6])],
            [("output", vec![f64::NAN, 0.0])]
        ),
        Err(Error::InvariantViolation(_))
    ));
}

#[test]
fn one_to_one_requires_equal_sizes() {
    let mut params = make_params();
    let mut prj_params = ProjectionParams::defaults_for_areas("input", "output");
    prj_params.connectivity = ConnectPattern::OneToOne;
    params.projections.push(prj_params);

    assert!(matches!(
        create_network(params),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn lookups_by_unknown_name() {
    let mut network = make_network();

    assert_eq!(
        network.activities("retina").err(),
        Some(Error::NotFound("retina".to_owned()))
    );
    assert!(matches!(
        network.weights("input", "output"),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        network.set_inputs([("retina", vec![0.0; 6])]),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        network.evaluate([("input", vec![0.0; 6])], "retina"),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn shape_mismatches() {
    let mut network = make_network();

    assert!(matches!(
        network.set_inputs([("input", vec![0.0; 5])]),
        Err(Error::ShapeMismatch(_))
    ));
    assert!(matches!(
        network.set_outputs([("output", vec![0.0; 3])]),
        Err(Error::ShapeMismatch(_))
    ));
    assert!(matches!(
        network.set_weights("input", "hidden", &vec![vec![0.5; 8]; 5]),
        Err(Error::ShapeMismatch(_))
    ));
    assert!(matches!(
        network.set_weights("input", "hidden", &vec![vec![0.5; 7]; 6]),
        Err(Error::ShapeMismatch(_))
    ));
    assert!(network
        .set_weights("input", "hidden", &vec![vec![0.5; 8]; 6])
        .is_ok());
}

#[test]
fn weight_matrix_round_trip() {
    let mut network = make_network();
    let weights = (0..6)
        .map(|i| (0..8).map(|j| (i * 8 + j) as f64 / 48.0).collect_vec())
        .collect_vec();

    network.set_weights("input", "hidden", &weights).unwrap();

    assert_eq!(network.weights("input", "hidden").unwrap(), weights);
}

#[test]
fn weights_stay_in_range_during_training() {
    let mut network = make_network();

    for _ in 0..5 {
        train_once(&mut network);

        for projection in network.projections() {
            for synapse in projection.synapses() {
                assert!((0.0..=1.0).contains(&synapse.wt()));
                assert_approx_eq!(f64, synapse.wt(), sigmoid(synapse.fwt()), epsilon = 1e-9);
                assert_eq!(synapse.dwt(), 0.0);
            }
        }
    }
}

#[test]
fn training_changes_weights() {
    let mut network = make_network();
    let before = network.weights("input", "hidden").unwrap();

    train_once(&mut network);

    assert_ne!(network.weights("input", "hidden").unwrap(), before);
}

#[test]
fn disabled_learning_freezes_weights() {
    let mut params = make_params();
    params.projections[0].learning = None;
    let mut network = create_network(params).unwrap();
    let before = network.weights("input", "hidden").unwrap();

    train_once(&mut network);

    assert_eq!(network.weights("input", "hidden").unwrap(), before);
}

#[test]
fn same_seed_same_run() {
    let mut params = make_params();
    params.technical_params.seed_override = Some(42);

    let mut network_a = create_network(params.clone()).unwrap();
    let mut network_b = create_network(params.clone()).unwrap();

    for _ in 0..3 {
        assert_eq!(train_once(&mut network_a), train_once(&mut network_b));
    }
    assert_eq!(
        network_a.weights("hidden", "output").unwrap(),
        network_b.weights("hidden", "output").unwrap()
    );

    params.technical_params.seed_override = Some(43);
    let network_c = create_network(params).unwrap();
    assert_ne!(
        create_network(make_params())
            .unwrap()
            .weights("input", "hidden")
            .unwrap(),
        network_c.weights("input", "hidden").unwrap()
    );
}

#[test]
fn observer_sees_every_step() {
    let mut network = make_network();
    let (tx, rx) = channel::<StateSnapshot>();

    network.set_observer(move |snapshot: &StateSnapshot| {
        tx.send(snapshot.clone()).unwrap();
    });
    train_once(&mut network);

    let snapshots = rx.try_iter().collect_vec();
    assert_eq!(snapshots.len(), 100);
    assert_equal(
        snapshots.iter().map(|snapshot| snapshot.total_steps),
        1..=100,
    );
    assert_eq!(snapshots[0].area_states.len(), 3);
    assert_eq!(snapshots[0].area_states[1].name, "hidden");
    assert_eq!(snapshots[0].area_states[1].neuron_states.len(), 8);
    assert_eq!(snapshots[74].phase, Phase::Plus);
    assert_eq!(snapshots[75].phase, Phase::Plus);
    assert_eq!(snapshots[99].phase, Phase::Minus);
    assert_eq!(snapshots[99].cycle_count, 1);

    network.clear_observer();
    network.step().unwrap();
    assert!(rx.try_recv().is_err());
}

#[test]
fn snapshot_matches_accessors() {
    let mut network = make_network();
    train_once(&mut network);

    let snapshot = network.extract_state_snapshot();
    let hidden = network.area("hidden").unwrap();
    let hidden_state = &snapshot.area_states[1];

    assert_eq!(hidden_state.gc_i, hidden.gc_i());
    assert_eq!(hidden_state.avg_act, hidden.avg_act());
    assert_equal(
        hidden_state.neuron_states.iter().map(|state| state.act),
        hidden.activities(),
    );
    assert_equal(
        hidden_state.neuron_states.iter().map(|state| state.act_m),
        hidden.minus_phase_activities(),
    );

    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("\"hidden\""));
}

#[test]
fn evaluate_returns_minus_phase_activities() {
    let mut network = make_network();
    train_once(&mut network);

    let act_m = network
        .evaluate([("input", vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0])], "output")
        .unwrap();

    assert_eq!(act_m.len(), 2);
    assert_eq!(act_m, network.minus_phase_activities("output").unwrap());
    assert_eq!(network.compute_sse(), 0.0);
    assert_eq!(network.cycle_count(), 2);
}

#[test]
fn topology_edit_after_training() {
    let mut network = make_network();
    train_once(&mut network);
    let trained = network.weights("input", "hidden").unwrap();

    let mut builder = network.into_builder();
    builder
        .add_area(AreaParams::new("context", 8, NeuronType::Hidden))
        .unwrap();
    builder
        .add_projection(ProjectionParams::defaults_for_areas("hidden", "context"))
        .unwrap();
    let mut context_prj = ProjectionParams::defaults_for_areas("context", "hidden");
    context_prj.wt_scale_rel = 2.0;
    builder.add_projection(context_prj).unwrap();

    let mut network = builder.build().unwrap();

    assert_eq!(network.cycle_count(), 1);
    assert_eq!(network.weights("input", "hidden").unwrap(), trained);
    assert_approx_eq!(
        f64,
        network
            .projection("context", "hidden")
            .unwrap()
            .wt_scale_rel_eff()
            .unwrap(),
        0.5
    );

    train_once(&mut network);
    assert_eq!(network.cycle_count(), 2);
}

#[test]
fn builder_api() {
    let mut builder = NetworkBuilder::new();
    builder
        .add_area(AreaParams::new("a", 4, NeuronType::Input))
        .unwrap();
    builder
        .add_area(AreaParams::new("b", 4, NeuronType::Output))
        .unwrap();
    let mut prj_params = ProjectionParams::defaults_for_areas("a", "b");
    prj_params.connectivity = ConnectPattern::OneToOne;
    builder.add_projection(prj_params).unwrap();

    let mut network = builder.build().unwrap();

    assert_eq!(network.weights("a", "b").unwrap().len(), 1);
    assert_eq!(network.weights("a", "b").unwrap()[0].len(), 4);

    let sse = network
        .train([("a", vec![1.0; 4])], [("b", vec![0.5; 4])])
        .unwrap();
    assert!(sse >= 0.0);
}

#[test]
fn network_from_yaml() {
    let yaml = r#"
areas:
- name: retina
  num_neurons: 9
  neuron_type: Input
- name: cortex
  num_neurons: 5
  inhibition_params:
    gain: 2.0
- name: motor
  num_neurons: 3
  neuron_type: Output
projections:
- from_area: retina
  to_area: cortex
- from_area: cortex
  to_area: motor
  initial_weight: !Gaussian
    mean: 0.4
    var: 0.01
technical_params:
  seed_override: 7
"#;

    let mut network = create_network(NetworkParams::from_yaml_str(yaml).unwrap()).unwrap();

    assert_eq!(network.area("cortex").unwrap().neuron_type(), NeuronType::Hidden);
    assert_eq!(network.area("cortex").unwrap().inhibition_params().gain, 2.0);

    let sse = network
        .train([("retina", vec![0.5; 9])], [("motor", vec![1.0, 0.0, 0.0])])
        .unwrap();
    assert!(sse.is_finite());
}

#[test]
fn invalid_yaml_parameters() {
    let yaml = r#"
areas:
- name: retina
  num_neurons: 0
"#;

    let result = create_network(NetworkParams::from_yaml_str(yaml).unwrap());

    assert_eq!(
        result.err(),
        Some(Error::Configuration(
            "invalid network parameters, area retina: num_neurons must be strictly positive"
                .to_owned()
        ))
    );
}

#[test]
fn parallel_run_matches_serial_run() {
    if num_cpus::get() < 2 {
        return;
    }

    let mut params = NetworkParams::default();
    params
        .areas
        .push(AreaParams::new("input", 20, NeuronType::Input));
    params
        .areas
        .push(AreaParams::new("hidden", 600, NeuronType::Hidden));
    params
        .projections
        .push(ProjectionParams::defaults_for_areas("input", "hidden"));

    let mut serial = create_network(params.clone()).unwrap();
    params.technical_params.num_threads = Some(2);
    let mut parallel = create_network(params).unwrap();

    let pattern = (0..20).map(|i| (i % 3) as f64 / 2.0).collect_vec();

    for _ in 0..2 {
        serial.set_inputs([("input", pattern.clone())]).unwrap();
        parallel.set_inputs([("input", pattern.clone())]).unwrap();
        serial.cycle().unwrap();
        parallel.cycle().unwrap();
    }

    assert_eq!(
        serial.activities("hidden").unwrap(),
        parallel.activities("hidden").unwrap()
    );
    assert_eq!(
        serial.weights("input", "hidden").unwrap(),
        parallel.weights("input", "hidden").unwrap()
    );
}
