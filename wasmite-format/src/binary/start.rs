use super::{error::Result, BinaryDecoder};

impl BinaryDecoder<'_> {
    /// startsec := funcidx
    pub(crate) fn read_start_section(&mut self) -> Result<()> {
        let start_function_index = self.reader.read_unsigned_int32()?;
        self.module
            .symbol_table
            .set_start_function(start_function_index);
        Ok(())
    }
}
