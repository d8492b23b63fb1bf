use {
    super::{error::DecodeErrorKind, error::Result, BinaryDecoder},
    wasmite_common::TrueOr,
};

impl BinaryDecoder<'_> {
    /// memsec := vec(memtype), limits counted in 64 KiB pages. At most one
    /// memory per module, imported and declared combined.
    pub(crate) fn read_memory_section(&mut self) -> Result<()> {
        let num_memories = self.reader.read_unsigned_int32()?;
        (self.module.symbol_table.memory_count() + num_memories <= 1)
            .true_or_else(|| self.err(DecodeErrorKind::MultipleMemories))?;
        for _ in 0..num_memories {
            let (initial_pages, max_pages) = self.read_limits()?;
            self.module
                .symbol_table
                .allocate_memory(&mut self.ctx.store, initial_pages, max_pages);
        }
        Ok(())
    }
}
