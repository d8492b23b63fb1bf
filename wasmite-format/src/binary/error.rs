use {thiserror::Error, wasmite_runtime::error::LinkerError};

/// A fatal decode failure, reported at the byte offset where the decoder
/// stopped. The first failure aborts the module; no recovery is attempted.
#[derive(Debug, Error)]
#[error("{kind} (at byte offset {offset})")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub offset: usize,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, offset: usize) -> DecodeError {
        DecodeError { kind, offset }
    }
}

/// Structural violations of the byte stream, plus the linker-class failures
/// that surface during decode.
#[derive(Debug, Error)]
pub enum DecodeErrorKind {
    #[error("invalid MAGIC number 0x{0:08X}")]
    InvalidMagic(u32),

    #[error("invalid VERSION number 0x{0:08X}")]
    InvalidVersion(u32),

    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("LEB128 value overflows its {width}-bit budget")]
    Leb128Overflow { width: u32 },

    #[error("unterminated LEB128 value ({width}-bit)")]
    UnterminatedLeb128 { width: u32 },

    #[error("malformed name")]
    MalformedName,

    #[error("invalid section ID: 0x{0:02X}")]
    InvalidSectionId(u8),

    #[error("declared section (0x{section:02X}) size is incorrect: declared {declared}, consumed {consumed}")]
    SectionSizeMismatch {
        section: u8,
        declared: u32,
        consumed: u32,
    },

    #[error("code entry {index} size is incorrect: declared {declared}, consumed {consumed}")]
    CodeEntrySizeMismatch {
        index: u32,
        declared: u32,
        consumed: u32,
    },

    #[error("only function types are supported in the type section, got 0x{0:02X}")]
    InvalidFunctionTypeTag(u8),

    #[error("invalid return value specifier: 0x{0:02X}")]
    InvalidResultSpecifier(u8),

    #[error("a function type can have at most one result, got {0}")]
    InvalidResultArity(u32),

    #[error("invalid value type: 0x{0:02X}")]
    InvalidValueType(u8),

    #[error("invalid block type: 0x{0:02X}")]
    InvalidBlockType(u8),

    #[error("invalid element type for table (expected funcref, got 0x{0:02X})")]
    InvalidElementType(u8),

    #[error("invalid limits prefix (expected 0x00 or 0x01, got 0x{0:02X})")]
    InvalidLimitsPrefix(u8),

    #[error("initial table size {initial} must be smaller or equal than maximum size {max}")]
    LimitsMinimumExceedsMaximum { initial: u32, max: u32 },

    #[error("invalid import type identifier: 0x{0:02X}")]
    InvalidImportKind(u8),

    #[error("invalid export type identifier: 0x{0:02X}")]
    InvalidExportKind(u8),

    #[error("can import or declare at most one table per module")]
    MultipleTables,

    #[error("can import or declare at most one memory per module")]
    MultipleMemories,

    #[error("the import section must precede all global declarations")]
    ImportsAfterGlobals,

    #[error("invalid mutability flag: 0x{0:02X}")]
    InvalidMutability(u8),

    #[error("global {0} is not initialized with an imported global")]
    GlobalInitNotImported(u32),

    #[error("invalid instruction for global initialization: 0x{0:02X}")]
    InvalidGlobalInitializer(u8),

    #[error("invalid instruction for table offset expression: 0x{0:02X}")]
    InvalidElementOffsetExpression(u8),

    #[error("invalid instruction for data offset expression: 0x{0:02X}")]
    InvalidDataOffsetExpression(u8),

    #[error("initialization expression must end with END")]
    MissingEnd,

    #[error("invalid table index {0} (only table index 0 is supported)")]
    InvalidTableIndex(u32),

    #[error("invalid memory index {0} (only memory index 0 is supported)")]
    InvalidMemoryIndex(u32),

    #[error("no memory declared or imported in the module")]
    NoMemory,

    #[error("no table was imported or declared, so cannot export a table")]
    NoTableToExport,

    #[error("unknown type index {0}")]
    UnknownTypeIndex(u32),

    #[error("unknown function index {0}")]
    UnknownFunctionIndex(u32),

    #[error("unknown global index {0}")]
    UnknownGlobalIndex(u32),

    #[error("unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    #[error("invalid local index {index} for 0x{opcode:02X} ({count} locals)")]
    InvalidLocalIndex { opcode: u8, index: u32, count: u32 },

    #[error("immutable globals cannot be set: {0}")]
    ImmutableGlobalSet(u32),

    #[error("branch label {label} exceeds the current block nesting depth {depth}")]
    InvalidBranchLabel { label: u32, depth: u32 },

    #[error("all target blocks in br.table must have the same return type length ({first} vs {other})")]
    BranchTableArityMismatch { first: u32, other: u32 },

    #[error("instruction 0x{opcode:02X} requires at least {required} element(s) in the stack, found {found}")]
    StackUnderflow {
        opcode: u8,
        required: u32,
        found: i32,
    },

    #[error("block left {found} value(s) in the stack, expected {expect}")]
    InvalidStackStateOnExit { expect: i32, found: i32 },

    #[error("CALL_INDIRECT: instruction must end with 0x00, got 0x{0:02X}")]
    InvalidCallIndirectReserved(u8),

    #[error("an if statement without an else branch block cannot return values")]
    IfWithoutElse,

    #[error(transparent)]
    Linker(#[from] LinkerError),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
