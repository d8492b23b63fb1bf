use {
    super::{error::DecodeErrorKind, error::Result, BinaryDecoder},
    wasmite_common::TrueOr,
    wasmite_runtime::{context::WasmContext, opcodes},
};

impl BinaryDecoder<'_> {
    /// elemsec := vec(tableidx offset:expr vec(funcidx))
    ///
    /// Offset expressions are restricted to `i32.const n` or `global.get g`.
    /// In the constant case the function indices are written into the table
    /// immediately; in the global case the linker performs the write once
    /// that global resolves.
    pub(crate) fn read_element_section(&mut self) -> Result<()> {
        let num_elements = self.reader.read_unsigned_int32()?;
        for _ in 0..num_elements {
            let table_index = self.reader.read_unsigned_int32()?;
            (table_index == 0)
                .true_or_else(|| self.err(DecodeErrorKind::InvalidTableIndex(table_index)))?;
            let instruction = self.reader.read1()?;
            match instruction {
                opcodes::I32_CONST => {
                    let element_offset = self.reader.read_signed_int32()?;
                    self.read_end()?;
                    let contents = self.read_element_contents()?;
                    let initialized = self.module.symbol_table.initialize_table_with_functions(
                        &mut self.ctx.store,
                        element_offset as u32,
                        &contents,
                    );
                    initialized.map_err(|e| self.err(e.into()))?;
                }
                opcodes::GLOBAL_GET => {
                    let global_index = self.reader.read_unsigned_int32()?;
                    (global_index < self.module.symbol_table.global_count()).true_or_else(|| {
                        self.err(DecodeErrorKind::UnknownGlobalIndex(global_index))
                    })?;
                    self.read_end()?;
                    let contents = self.read_element_contents()?;
                    let WasmContext {
                        linker,
                        globals,
                        store,
                    } = &mut *self.ctx;
                    let deferred = linker.try_initialize_elements(
                        &self.module.symbol_table,
                        globals,
                        store,
                        global_index,
                        contents,
                    );
                    deferred.map_err(|e| self.err(e.into()))?;
                }
                _ => {
                    return Err(
                        self.err(DecodeErrorKind::InvalidElementOffsetExpression(instruction))
                    )
                }
            }
        }
        Ok(())
    }

    fn read_element_contents(&mut self) -> Result<Vec<u32>> {
        let content_length = self.reader.read_unsigned_int32()?;
        (0..content_length)
            .map(|_| self.reader.read_unsigned_int32())
            .collect()
    }
}
