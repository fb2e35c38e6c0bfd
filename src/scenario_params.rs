use nexus::params::NetworkParams;

pub const SHEET_WIDTH: usize = 12;
pub const NUM_ORIENTATIONS: usize = 4;

pub fn get_scenario_params() -> NetworkParams {
    let params_yaml_str = r#"
areas:
- name: LGN_ON
  num_neurons: 144
  neuron_type: Input
  inhibition_params:
    gain: 2.0
- name: LGN_OFF
  num_neurons: 144
  neuron_type: Input
  inhibition_params:
    gain: 2.0
- name: V1
  num_neurons: 196
  neuron_type: Hidden
  inhibition_params:
    gain: 2.0
- name: ORIENTATION
  num_neurons: 4
  neuron_type: Output
  inhibition_params:
    gain: 1.8
projections:
- from_area: LGN_ON
  to_area: V1
- from_area: LGN_OFF
  to_area: V1
- from_area: V1
  to_area: ORIENTATION
- from_area: ORIENTATION
  to_area: V1
  wt_scale_rel: 0.2
  initial_weight: !Gaussian
    mean: 0.5
    var: 0.01
schedule:
  quarter_length: 25
technical_params:
  seed_override: 0
  num_threads: 1
"#;

    NetworkParams::from_yaml_str(params_yaml_str).unwrap()
}

pub fn make_oriented_edge(orientation: usize, offset: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let angle = orientation as f64 * std::f64::consts::PI / NUM_ORIENTATIONS as f64;
    let (sin, cos) = angle.sin_cos();
    let center = (SHEET_WIDTH as f64 - 1.0) / 2.0;

    let on: Vec<f64> = (0..SHEET_WIDTH * SHEET_WIDTH)
        .map(|idx| {
            let x = (idx % SHEET_WIDTH) as f64 - center;
            let y = (idx / SHEET_WIDTH) as f64 - center;
            let distance = x * cos + y * sin - offset;
            1.0 / (1.0 + (-2.0 * distance).exp())
        })
        .collect();

    let off = on.iter().map(|act| 1.0 - act).collect();

    let mut target = vec![0.0; NUM_ORIENTATIONS];
    target[orientation] = 1.0;

    (on, off, target)
}
