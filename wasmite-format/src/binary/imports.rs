use {
    super::{error::DecodeErrorKind, error::Result, BinaryDecoder},
    num_enum::TryFromPrimitive,
    wasmite_common::TrueOr,
    wasmite_runtime::context::WasmContext,
};

/// import := modname:name name:name desc, with a kind byte selecting the
/// description payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub(crate) enum ImportKind {
    Function = 0x00,
    Table = 0x01,
    Memory = 0x02,
    Global = 0x03,
}

impl BinaryDecoder<'_> {
    pub(crate) fn read_import_section(&mut self) -> Result<()> {
        // Imports precede the global section in canonical order; nothing may
        // have claimed a global index yet.
        self.module
            .symbol_table
            .max_global_index()
            .is_none()
            .true_or_else(|| self.err(DecodeErrorKind::ImportsAfterGlobals))?;
        let num_imports = self.reader.read_unsigned_int32()?;
        for _ in 0..num_imports {
            let module_name = self.reader.read_name()?;
            let member_name = self.reader.read_name()?;
            let kind_byte = self.reader.read1()?;
            let kind = ImportKind::try_from(kind_byte)
                .map_err(|_| self.err(DecodeErrorKind::InvalidImportKind(kind_byte)))?;
            match kind {
                ImportKind::Function => {
                    let type_index = self.reader.read_unsigned_int32()?;
                    self.module
                        .symbol_table
                        .function_type_exists(type_index)
                        .true_or_else(|| self.err(DecodeErrorKind::UnknownTypeIndex(type_index)))?;
                    self.module
                        .symbol_table
                        .import_function(module_name, member_name, type_index);
                    self.module_function_index += 1;
                }
                ImportKind::Table => {
                    self.read_element_type()?;
                    let (initial_size, max_size) = self.read_limits()?;
                    (self.module.symbol_table.table_count() == 0)
                        .true_or_else(|| self.err(DecodeErrorKind::MultipleTables))?;
                    self.module.symbol_table.import_table(
                        &mut self.ctx.store,
                        module_name,
                        member_name,
                        initial_size,
                        max_size,
                    );
                }
                ImportKind::Memory => {
                    let (initial_pages, max_pages) = self.read_limits()?;
                    (self.module.symbol_table.memory_count() == 0)
                        .true_or_else(|| self.err(DecodeErrorKind::MultipleMemories))?;
                    self.module.symbol_table.import_memory(
                        &mut self.ctx.store,
                        module_name,
                        member_name,
                        initial_pages,
                        max_pages,
                    );
                }
                ImportKind::Global => {
                    let value_type = self.read_value_type()?;
                    let mutability = self.read_mutability()?;
                    let index = self.module.symbol_table.next_global_index();
                    let WasmContext { linker, globals, .. } = &mut *self.ctx;
                    linker.import_global(
                        &mut self.module.symbol_table,
                        globals,
                        index,
                        module_name,
                        member_name,
                        value_type,
                        mutability,
                    );
                }
            }
        }
        Ok(())
    }
}
