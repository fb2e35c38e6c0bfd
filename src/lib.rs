pub mod area;
pub mod error;
pub mod network;
pub mod neuron;
pub mod nxx1;
pub mod params;
pub mod projection;
pub mod state_snapshot;
pub mod synapse;
pub mod types;

mod util;

pub use error::{Error, Result};
pub use network::{create_network, Network, NetworkBuilder};
