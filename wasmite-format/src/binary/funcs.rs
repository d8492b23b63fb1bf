use {
    super::{error::DecodeErrorKind, error::Result, BinaryDecoder},
    wasmite_common::TrueOr,
};

impl BinaryDecoder<'_> {
    /// funcsec := vec(typeidx)
    ///
    /// Each index produces a declared function bound to that signature. The
    /// bodies arrive later, in the code section, associated by position.
    pub(crate) fn read_function_section(&mut self) -> Result<()> {
        let num_functions = self.reader.read_unsigned_int32()?;
        for _ in 0..num_functions {
            let type_index = self.reader.read_unsigned_int32()?;
            self.module
                .symbol_table
                .function_type_exists(type_index)
                .true_or_else(|| self.err(DecodeErrorKind::UnknownTypeIndex(type_index)))?;
            self.module.symbol_table.declare_function(type_index);
        }
        Ok(())
    }
}
