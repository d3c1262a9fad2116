mod bloch;
mod channels;
mod component;
pub mod errors;
mod gates;
mod measurements;
pub mod utils;

pub use bloch::BlochState;
pub use channels::QuantumChannel;
pub use component::DensityComponent;
pub use gates::Gate;
pub use measurements::Measurement;
pub(crate) use measurements::sample_pole;
