use {
    super::{error::DecodeErrorKind, error::Result, BinaryDecoder, SectionId},
    wasmite_common::TrueOr,
    wasmite_runtime::{error::LinkerError, opcodes},
};

impl BinaryDecoder<'_> {
    /// datasec := vec(memidx offset:expr vec(byte))
    ///
    /// A bare `END` offset expression leaves the offset at zero. Offsets via
    /// `global.get` are not implemented and fail the decode.
    pub(crate) fn read_data_section(&mut self) -> Result<()> {
        let memory_address = self
            .module
            .symbol_table
            .memory_address()
            .ok_or_else(|| self.err(DecodeErrorKind::NoMemory))?;
        let num_segments = self.reader.read_unsigned_int32()?;
        for _ in 0..num_segments {
            let memory_index = self.reader.read_unsigned_int32()?;
            (memory_index == 0)
                .true_or_else(|| self.err(DecodeErrorKind::InvalidMemoryIndex(memory_index)))?;
            let mut data_offset: i64 = 0;
            loop {
                let instruction = self.reader.read1()?;
                match instruction {
                    opcodes::I32_CONST => data_offset = self.reader.read_signed_int32()? as i64,
                    opcodes::GLOBAL_GET => {
                        self.reader.read_unsigned_int32()?;
                        return Err(self.err(LinkerError::DataOffsetGlobalGet.into()));
                    }
                    opcodes::END => break,
                    _ => {
                        return Err(
                            self.err(DecodeErrorKind::InvalidDataOffsetExpression(instruction))
                        )
                    }
                }
            }
            let byte_length = self.reader.read_unsigned_int32()?;
            self.ctx
                .store
                .memory(memory_address)
                .validate_address(data_offset, byte_length)
                .map_err(|e| self.err(e.into()))?;
            for write_offset in 0..byte_length {
                let byte = self.reader.read1()?;
                self.ctx
                    .store
                    .memory_mut(memory_address)
                    .store_i32_8(data_offset + write_offset as i64, byte);
            }
        }
        Ok(())
    }

    /// Restore the memory's initial contents from the data section of the
    /// retained buffer, optionally zeroing the whole memory first.
    pub(crate) fn reset_memory_state(&mut self, zero_memory: bool) -> Result<()> {
        if zero_memory {
            if let Some(memory_address) = self.module.symbol_table.memory_address() {
                self.ctx.store.memory_mut(memory_address).clear();
            }
        }
        if self.try_jump_to_section(SectionId::Data)? {
            self.read_data_section()?;
        }
        Ok(())
    }
}
