use {
    super::{error::DecodeErrorKind, error::Result, BinaryDecoder},
    num_enum::TryFromPrimitive,
    wasmite_common::TrueOr,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub(crate) enum ExportKind {
    Function = 0x00,
    Table = 0x01,
    Memory = 0x02,
    Global = 0x03,
}

impl BinaryDecoder<'_> {
    /// exportsec := vec(name kind:byte idx)
    pub(crate) fn read_export_section(&mut self) -> Result<()> {
        let num_exports = self.reader.read_unsigned_int32()?;
        for _ in 0..num_exports {
            let export_name = self.reader.read_name()?;
            let kind_byte = self.reader.read1()?;
            let kind = ExportKind::try_from(kind_byte)
                .map_err(|_| self.err(DecodeErrorKind::InvalidExportKind(kind_byte)))?;
            match kind {
                ExportKind::Function => {
                    let function_index = self.reader.read_unsigned_int32()?;
                    (function_index < self.module.symbol_table.function_count()).true_or_else(
                        || self.err(DecodeErrorKind::UnknownFunctionIndex(function_index)),
                    )?;
                    self.module
                        .symbol_table
                        .export_function(export_name, function_index);
                }
                ExportKind::Table => {
                    let table_index = self.reader.read_unsigned_int32()?;
                    self.module
                        .symbol_table
                        .table_exists()
                        .true_or_else(|| self.err(DecodeErrorKind::NoTableToExport))?;
                    (table_index == 0)
                        .true_or_else(|| self.err(DecodeErrorKind::InvalidTableIndex(table_index)))?;
                    self.module.symbol_table.export_table(export_name);
                }
                ExportKind::Memory => {
                    // The index is consumed but the export is not recorded.
                    self.reader.read_unsigned_int32()?;
                }
                ExportKind::Global => {
                    let global_index = self.reader.read_unsigned_int32()?;
                    (global_index < self.module.symbol_table.global_count()).true_or_else(|| {
                        self.err(DecodeErrorKind::UnknownGlobalIndex(global_index))
                    })?;
                    self.module
                        .symbol_table
                        .export_global(export_name, global_index);
                }
            }
        }
        Ok(())
    }
}
