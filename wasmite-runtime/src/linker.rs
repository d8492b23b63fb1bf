//! Deferred cross-module resolution bookkeeping.
//!
//! The decoder works on one module at a time, but imports can reference
//! modules that have not been decoded yet. The linker is the one component
//! that eventually sees every module; the decoder talks to it through two
//! entry points, both pure bookkeeping: [`Linker::import_global`] and
//! [`Linker::try_initialize_elements`].

use {
    crate::{
        context::Store,
        error::LinkerError,
        globals::Globals,
        symbol_table::SymbolTable,
        types::{GlobalMutability, GlobalResolution, ValueType},
    },
    log::trace,
    std::collections::HashMap,
};

/// A global import awaiting its defining module.
#[derive(Debug)]
pub struct PendingGlobalImport {
    pub global_index: u32,
    pub module_name: String,
    pub member_name: String,
    pub value_type: ValueType,
    pub mutability: GlobalMutability,
}

/// An element segment whose table offset depends on a global that has not
/// resolved yet.
#[derive(Debug)]
pub struct PendingElementSegment {
    pub offset_global_index: u32,
    pub function_indices: Vec<u32>,
}

/// A global already resolved by an earlier module (or provided by the
/// embedder), addressable by `(module, member)` name pair.
#[derive(Debug)]
pub struct ResolvedGlobalExport {
    pub value_type: ValueType,
    pub mutability: GlobalMutability,
    pub address: u32,
}

#[derive(Debug, Default)]
pub struct Linker {
    resolved_global_exports: HashMap<(String, String), ResolvedGlobalExport>,
    pending_global_imports: Vec<PendingGlobalImport>,
    pending_element_segments: Vec<PendingElementSegment>,
}

impl Linker {
    /// Make `(module_name, member_name)` resolvable for modules decoded
    /// later. Allocates the backing slot and returns its address.
    pub fn register_global_export(
        &mut self,
        globals: &mut Globals,
        module_name: String,
        member_name: String,
        value_type: ValueType,
        mutability: GlobalMutability,
        value: i64,
    ) -> u32 {
        let address = globals.allocate();
        globals.store_long(address, value);
        self.resolved_global_exports.insert(
            (module_name, member_name),
            ResolvedGlobalExport {
                value_type,
                mutability,
                address,
            },
        );
        address
    }

    /// Declare a global import at `index` in the module's symbol table.
    ///
    /// If the export is already known, the record aliases the exporter's
    /// slot and is immediately resolved. Otherwise a fresh zeroed slot is
    /// allocated and the import is queued for later binding.
    #[allow(clippy::too_many_arguments)]
    pub fn import_global(
        &mut self,
        symbol_table: &mut SymbolTable,
        globals: &mut Globals,
        index: u32,
        module_name: String,
        member_name: String,
        value_type: ValueType,
        mutability: GlobalMutability,
    ) {
        let key = (module_name, member_name);
        if let Some(export) = self.resolved_global_exports.get(&key) {
            trace!(
                "global import {}.{} resolved at address {}",
                key.0,
                key.1,
                export.address
            );
            symbol_table.import_global_at(
                index,
                value_type,
                mutability,
                GlobalResolution::ImportedResolved,
                export.address,
            );
            return;
        }
        trace!("global import {}.{} deferred", key.0, key.1);
        symbol_table.declare_global(
            globals,
            index,
            value_type,
            mutability,
            GlobalResolution::ImportedUnresolved,
        );
        self.pending_global_imports.push(PendingGlobalImport {
            global_index: index,
            module_name: key.0,
            member_name: key.1,
            value_type,
            mutability,
        });
    }

    /// Initialize an element segment whose offset is `global.get
    /// offset_global_index`. Performs the table write now when that global
    /// is resolved; otherwise queues the segment until it is.
    pub fn try_initialize_elements(
        &mut self,
        symbol_table: &SymbolTable,
        globals: &Globals,
        store: &mut Store,
        offset_global_index: u32,
        function_indices: Vec<u32>,
    ) -> Result<(), LinkerError> {
        let resolved = symbol_table
            .global_resolution(offset_global_index)
            .is_some_and(|r| r.is_resolved());
        if resolved {
            let address = symbol_table
                .global_address(offset_global_index)
                .unwrap_or_default();
            let offset = globals.load_as_long(address) as u32;
            return symbol_table.initialize_table_with_functions(store, offset, &function_indices);
        }
        trace!(
            "element segment deferred on global {}",
            offset_global_index
        );
        self.pending_element_segments.push(PendingElementSegment {
            offset_global_index,
            function_indices,
        });
        Ok(())
    }

    pub fn pending_global_imports(&self) -> &[PendingGlobalImport] {
        &self.pending_global_imports
    }

    pub fn pending_element_segments(&self) -> &[PendingElementSegment] {
        &self.pending_element_segments
    }
}
