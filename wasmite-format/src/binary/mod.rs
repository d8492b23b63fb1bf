//! Decoder for the binary module format, version 1.
//!
//! The strategy is a straightforward recursive descent over a self-delimited
//! stream: every container (section, code entry, block) declares its byte
//! length and must be consumed exactly. A single mutable cursor is threaded
//! through the whole decode; there is no buffering or streaming layer.
//!
//! Decoding directly populates the module's symbol table and code entries;
//! there is no intermediate representation. The per-section logic lives in
//! sibling modules, implemented as methods on [`BinaryDecoder`].
//!
//! [Spec]: https://webassembly.github.io/spec/core/binary/modules.html

pub mod error;
pub mod reader;

mod code;
mod data;
mod elems;
mod exec_state;
mod exports;
mod funcs;
mod globals;
mod imports;
mod mems;
mod start;
mod tables;
mod types;

use {
    self::{
        error::{DecodeError, DecodeErrorKind, Result},
        reader::ByteReader,
    },
    log::debug,
    num_enum::TryFromPrimitive,
    wasmite_common::TrueOr,
    wasmite_runtime::{context::WasmContext, module::WasmModule},
};

const MAGIC: u32 = 0x6D73_6100;
const VERSION: u32 = 0x0000_0001;

/// Section IDs, in the canonical order sections appear in a module. Custom
/// sections may appear anywhere; any other ID out of a decoder's reach is
/// fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum SectionId {
    Custom = 0,
    Type = 1,
    Import = 2,
    Function = 3,
    Table = 4,
    Memory = 5,
    Global = 6,
    Export = 7,
    Start = 8,
    Element = 9,
    Code = 10,
    Data = 11,
}

/// The decoder for one module. Takes logical ownership of the byte buffer
/// for the duration of a decode; on failure the module should be discarded.
pub struct BinaryDecoder<'a> {
    pub(crate) reader: ByteReader,
    pub(crate) module: &'a mut WasmModule,
    pub(crate) ctx: &'a mut WasmContext,
    /// Imported and declared functions share one index space. This tracks
    /// the next index so code entries can be associated with their function
    /// records.
    pub(crate) module_function_index: u32,
}

impl<'a> BinaryDecoder<'a> {
    pub fn new(module: &'a mut WasmModule, ctx: &'a mut WasmContext) -> BinaryDecoder<'a> {
        let reader = ByteReader::new(module.data());
        BinaryDecoder {
            reader,
            module,
            ctx,
            module_function_index: 0,
        }
    }

    /// Decode the whole module. On success the symbol table and all code
    /// entries are fully populated, possibly with resolution work pending on
    /// the linker.
    pub fn read_module(&mut self) -> Result<()> {
        self.validate_magic_number_and_version()?;
        self.read_sections()?;
        debug!(
            "decoded module: {} function(s), {} global(s), {} export(s)",
            self.module.symbol_table.function_count(),
            self.module.symbol_table.global_count(),
            self.module.symbol_table.export_count(),
        );
        Ok(())
    }

    pub(crate) fn err(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(kind, self.reader.offset())
    }

    fn validate_magic_number_and_version(&mut self) -> Result<()> {
        let magic = self.reader.read4()?;
        (magic == MAGIC).true_or_else(|| self.err(DecodeErrorKind::InvalidMagic(magic)))?;
        let version = self.reader.read4()?;
        (version == VERSION).true_or_else(|| self.err(DecodeErrorKind::InvalidVersion(version)))?;
        Ok(())
    }

    fn read_sections(&mut self) -> Result<()> {
        while !self.reader.is_eof() {
            let id_byte = self.reader.read1()?;
            let section = SectionId::try_from(id_byte)
                .map_err(|_| self.err(DecodeErrorKind::InvalidSectionId(id_byte)))?;
            let size = self.reader.read_unsigned_int32()?;
            let start_offset = self.reader.offset();
            debug!("section {:?} (0x{:02X}), {} byte(s)", section, id_byte, size);
            match section {
                SectionId::Custom => self.read_custom_section(size)?,
                SectionId::Type => self.read_type_section()?,
                SectionId::Import => self.read_import_section()?,
                SectionId::Function => self.read_function_section()?,
                SectionId::Table => self.read_table_section()?,
                SectionId::Memory => self.read_memory_section()?,
                SectionId::Global => self.read_global_section()?,
                SectionId::Export => self.read_export_section()?,
                SectionId::Start => self.read_start_section()?,
                SectionId::Element => self.read_element_section()?,
                SectionId::Code => self.read_code_section()?,
                SectionId::Data => self.read_data_section()?,
            }
            let consumed = (self.reader.offset() - start_offset) as u32;
            (consumed == size).true_or_else(|| {
                self.err(DecodeErrorKind::SectionSizeMismatch {
                    section: id_byte,
                    declared: size,
                    consumed,
                })
            })?;
        }
        Ok(())
    }

    /// Custom sections carry tool-specific payloads and are skipped by raw
    /// offset advance.
    fn read_custom_section(&mut self, size: u32) -> Result<()> {
        self.reader.skip(size as usize)
    }

    /// Walk the section headers from the top of the buffer, skipping
    /// payloads, and stop with the cursor just past the header of the first
    /// section with the requested ID. Used by the reset procedures to
    /// re-scan an already-decoded buffer.
    pub(crate) fn try_jump_to_section(&mut self, target: SectionId) -> Result<bool> {
        self.reader.jump_to(0);
        self.validate_magic_number_and_version()?;
        while !self.reader.is_eof() {
            let id_byte = self.reader.read1()?;
            let size = self.reader.read_unsigned_int32()?;
            if id_byte == target as u8 {
                return Ok(true);
            }
            self.reader.skip(size as usize)?;
        }
        Ok(false)
    }
}

/// Decode `module`'s byte buffer, populating its symbol table and code
/// entries against the shared `ctx`.
pub fn read_module(module: &mut WasmModule, ctx: &mut WasmContext) -> Result<()> {
    BinaryDecoder::new(module, ctx).read_module()
}

/// Re-evaluate the module's global initializers from the retained buffer and
/// rewrite the process-wide globals array. Rejects modules whose globals
/// cannot be re-derived: mutable imports, or initializers reading a
/// non-constant global.
pub fn reset_global_state(module: &mut WasmModule, ctx: &mut WasmContext) -> Result<()> {
    BinaryDecoder::new(module, ctx).reset_global_state()
}

/// Restore the module memory's initial contents by re-running the data
/// section, optionally zeroing the memory first.
pub fn reset_memory_state(
    module: &mut WasmModule,
    ctx: &mut WasmContext,
    zero_memory: bool,
) -> Result<()> {
    BinaryDecoder::new(module, ctx).reset_memory_state(zero_memory)
}
