//! The global section, and the global-state reset procedure that re-scans
//! it.
//!
//! Initializer expressions are restricted to one constant instruction plus
//! `END`. A `global.get` initializer may reference an imported global from a
//! module that has not been decoded yet; such globals are parked as
//! `UnresolvedGet` with a back-reference, and the linker completes them
//! later. This is the first half of the two-phase initialization protocol.

use {
    super::{error::DecodeErrorKind, error::Result, BinaryDecoder, SectionId},
    wasmite_common::TrueOr,
    wasmite_runtime::{
        error::LinkerError,
        opcodes,
        types::{GlobalMutability, GlobalResolution},
    },
};

impl BinaryDecoder<'_> {
    /// globalsec := vec(globaltype init:expr)
    pub(crate) fn read_global_section(&mut self) -> Result<()> {
        let num_globals = self.reader.read_unsigned_int32()?;
        let starting_index = self.module.symbol_table.next_global_index();
        for index in starting_index..starting_index + num_globals {
            let value_type = self.read_value_type()?;
            let mutability = self.read_mutability()?;
            let mut value: i64 = 0;
            let mut awaited_import = None;
            let instruction = self.reader.read1()?;
            let resolution = match instruction {
                opcodes::I32_CONST => {
                    value = self.reader.read_signed_int32()? as i64;
                    GlobalResolution::Declared
                }
                opcodes::I64_CONST => {
                    value = self.reader.read_signed_int64()?;
                    GlobalResolution::Declared
                }
                opcodes::F32_CONST => {
                    value = self.reader.read_float32_as_int32()? as i64;
                    GlobalResolution::Declared
                }
                opcodes::F64_CONST => {
                    value = self.reader.read_float64_as_int64()?;
                    GlobalResolution::Declared
                }
                opcodes::GLOBAL_GET => {
                    let existing_index = self.reader.read_unsigned_int32()?;
                    let existing_resolution = self
                        .module
                        .symbol_table
                        .global_resolution(existing_index)
                        .ok_or_else(|| self.err(DecodeErrorKind::UnknownGlobalIndex(existing_index)))?;
                    existing_resolution
                        .is_imported()
                        .true_or_else(|| self.err(DecodeErrorKind::GlobalInitNotImported(index)))?;
                    if existing_resolution.is_resolved() {
                        let existing_type = self
                            .module
                            .symbol_table
                            .global_value_type(existing_index)
                            .unwrap_or(value_type);
                        (value_type == existing_type).true_or_else(|| {
                            self.err(
                                LinkerError::GlobalTypeMismatch {
                                    declared: value_type as u8,
                                    actual: existing_type as u8,
                                }
                                .into(),
                            )
                        })?;
                        let existing_address = self
                            .module
                            .symbol_table
                            .global_address(existing_index)
                            .unwrap_or_default();
                        value = self.ctx.globals.load_as_long(existing_address);
                        GlobalResolution::Declared
                    } else {
                        // The defining module has not been decoded; park this
                        // global until the linker resumes it.
                        awaited_import = Some(existing_index);
                        GlobalResolution::UnresolvedGet
                    }
                }
                _ => return Err(self.err(DecodeErrorKind::InvalidGlobalInitializer(instruction))),
            };
            self.read_end()?;
            let address = self.module.symbol_table.declare_global(
                &mut self.ctx.globals,
                index,
                value_type,
                mutability,
                resolution,
            );
            if resolution.is_resolved() {
                self.ctx.globals.store_long(address, value);
            } else if let Some(imported_index) = awaited_import {
                self.module
                    .symbol_table
                    .track_unresolved_global(index, imported_index);
            }
        }
        Ok(())
    }

    pub(crate) fn read_end(&mut self) -> Result<()> {
        let instruction = self.reader.read1()?;
        (instruction == opcodes::END).true_or_else(|| self.err(DecodeErrorKind::MissingEnd))
    }

    /// Re-evaluate the global initializers of an already-decoded module and
    /// rewrite the globals array with the original values.
    ///
    /// The import section is replayed first, to count global imports and to
    /// reject the cases that cannot be re-derived from the buffer alone.
    pub(crate) fn reset_global_state(&mut self) -> Result<()> {
        let mut global_index: u32 = 0;
        if self.try_jump_to_section(SectionId::Import)? {
            let num_imports = self.reader.read_unsigned_int32()?;
            for _ in 0..num_imports {
                self.reader.read_name()?;
                self.reader.read_name()?;
                let kind_byte = self.reader.read1()?;
                match kind_byte {
                    0x00 => {
                        self.reader.read_unsigned_int32()?;
                    }
                    0x01 => {
                        self.reader.read1()?;
                        self.read_limits()?;
                    }
                    0x02 => {
                        self.read_limits()?;
                    }
                    0x03 => {
                        self.read_value_type()?;
                        let mutability = self.read_mutability()?;
                        (mutability == GlobalMutability::Const)
                            .true_or_else(|| self.err(LinkerError::ResetMutableImport.into()))?;
                        global_index += 1;
                    }
                    // The module decoded once already; nothing else appears.
                    _ => {}
                }
            }
        }
        if self.try_jump_to_section(SectionId::Global)? {
            let num_globals = self.reader.read_unsigned_int32()?;
            let starting_index = global_index;
            while global_index != starting_index + num_globals {
                self.read_value_type()?;
                self.reader.read1()?; // mutability
                let instruction = self.reader.read1()?;
                let value = match instruction {
                    opcodes::I32_CONST => self.reader.read_signed_int32()? as i64,
                    opcodes::I64_CONST => self.reader.read_signed_int64()?,
                    opcodes::F32_CONST => self.reader.read_float32_as_int32()? as i64,
                    opcodes::F64_CONST => self.reader.read_float64_as_int64()?,
                    opcodes::GLOBAL_GET => {
                        let existing_index = self.reader.read_unsigned_int32()?;
                        let mutability = self
                            .module
                            .symbol_table
                            .global_mutability(existing_index)
                            .ok_or_else(|| {
                                self.err(DecodeErrorKind::UnknownGlobalIndex(existing_index))
                            })?;
                        (mutability == GlobalMutability::Const).true_or_else(|| {
                            self.err(LinkerError::ResetNonConstantDependency.into())
                        })?;
                        let existing_address = self
                            .module
                            .symbol_table
                            .global_address(existing_index)
                            .unwrap_or_default();
                        self.ctx.globals.load_as_long(existing_address)
                    }
                    _ => {
                        return Err(self.err(DecodeErrorKind::InvalidGlobalInitializer(instruction)))
                    }
                };
                self.read_end()?;
                let address = self
                    .module
                    .symbol_table
                    .global_address(global_index)
                    .ok_or_else(|| self.err(DecodeErrorKind::UnknownGlobalIndex(global_index)))?;
                self.ctx.globals.store_long(address, value);
                global_index += 1;
            }
        }
        Ok(())
    }
}
