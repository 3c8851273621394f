pub mod parameters;

pub use parameters::Parameters;
