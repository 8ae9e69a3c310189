// RPC Handlers Module
// Organizes RPC method handlers into separate files

pub mod subnet;
pub mod neuron;
pub mod staking;
pub mod weight;

pub use subnet::*;
pub use neuron::*;
pub use staking::*;
pub use weight::*;
