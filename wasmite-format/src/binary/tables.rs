use {
    super::{error::DecodeErrorKind, error::Result, BinaryDecoder},
    wasmite_common::TrueOr,
};

impl BinaryDecoder<'_> {
    /// tablesec := vec(tabletype)
    ///
    /// This version supports at most one table per module, imported and
    /// declared combined, so the loop body runs at most once.
    pub(crate) fn read_table_section(&mut self) -> Result<()> {
        let num_tables = self.reader.read_unsigned_int32()?;
        (self.module.symbol_table.table_count() + num_tables <= 1)
            .true_or_else(|| self.err(DecodeErrorKind::MultipleTables))?;
        for _ in 0..num_tables {
            self.read_element_type()?;
            let (initial_size, max_size) = self.read_limits()?;
            if let Some(max) = max_size {
                (initial_size <= max).true_or_else(|| {
                    self.err(DecodeErrorKind::LimitsMinimumExceedsMaximum {
                        initial: initial_size,
                        max,
                    })
                })?;
            }
            self.module
                .symbol_table
                .allocate_table(&mut self.ctx.store, initial_size, max_size);
        }
        Ok(())
    }
}
