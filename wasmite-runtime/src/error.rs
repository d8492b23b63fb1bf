use thiserror::Error;

/// Initialization-time inconsistencies, as opposed to structural violations
/// of the byte stream. These surface when constant initializers, segment
/// writes, or the reset procedures interact with linking state.
#[derive(Debug, Error, PartialEq)]
pub enum LinkerError {
    #[error("cannot reset imports of mutable global variables (not implemented)")]
    ResetMutableImport,

    #[error("cannot reset global variables that were initialized with a non-constant global variable (not implemented)")]
    ResetNonConstantDependency,

    #[error("global.get in data segment offset expressions is not implemented")]
    DataOffsetGlobalGet,

    #[error("the types of the globals must be consistent: 0x{declared:02X} vs 0x{actual:02X}")]
    GlobalTypeMismatch { declared: u8, actual: u8 },

    #[error("no table was imported or declared in the module")]
    NoTable,

    #[error("element segment [{offset}, {offset} + {length}) does not fit in a table of {size} entries")]
    ElementSegmentOutOfBounds { offset: u32, length: u32, size: u32 },

    #[error("data segment [{offset}, {offset} + {length}) does not fit in a memory of {size} bytes")]
    DataSegmentOutOfBounds { offset: i64, length: u32, size: u64 },
}
