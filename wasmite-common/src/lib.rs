pub mod true_or;

pub use true_or::TrueOr;
