pub mod binary;

pub use binary::{
    error::{DecodeError, DecodeErrorKind},
    read_module, reset_global_state, reset_memory_state,
};
