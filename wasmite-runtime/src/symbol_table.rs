//! The per-module catalog of declared and imported entities.

use {
    crate::{
        context::Store,
        error::LinkerError,
        globals::Globals,
        nodes::CodeEntry,
        types::{BlockType, GlobalMutability, GlobalResolution, ValueType},
    },
    std::collections::HashMap,
};

/// One signature in the type section's index space. At most one result in
/// this version.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FunctionType {
    pub param_types: Vec<ValueType>,
    pub return_types: Vec<ValueType>,
}

impl FunctionType {
    pub fn return_type(&self) -> BlockType {
        match self.return_types.first() {
            Some(vt) => BlockType::Value(*vt),
            None => BlockType::Void,
        }
    }
}

/// A function in the shared index space. Imported functions occupy the
/// prefix of the space; declared functions follow.
#[derive(Debug)]
pub struct WasmFunction {
    pub index: u32,
    pub type_index: u32,
    pub imported: bool,
    pub module_name: Option<String>,
    pub member_name: Option<String>,
    pub code_entry: Option<CodeEntry>,
}

#[derive(Debug)]
pub struct TableRecord {
    pub initial_size: u32,
    pub max_size: Option<u32>,
    pub imported: bool,
    /// Index of the instance in the context store.
    pub address: u32,
}

#[derive(Debug)]
pub struct MemoryRecord {
    pub initial_pages: u32,
    pub max_pages: Option<u32>,
    pub imported: bool,
    pub address: u32,
}

#[derive(Debug)]
pub struct GlobalRecord {
    pub value_type: ValueType,
    pub mutability: GlobalMutability,
    pub resolution: GlobalResolution,
    /// Slot in the process-wide globals array.
    pub address: u32,
}

/// Where an export points. Memory exports are parsed but not recorded.
#[derive(Debug, PartialEq, Eq)]
pub enum ExportDesc {
    Func(u32),
    Table,
    Global(u32),
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    function_types: Vec<FunctionType>,
    functions: Vec<WasmFunction>,
    table: Option<TableRecord>,
    memory: Option<MemoryRecord>,
    globals: Vec<GlobalRecord>,
    exports: HashMap<String, ExportDesc>,
    start_function_index: Option<u32>,
    /// Globals parked as `UnresolvedGet`, keyed by their index, pointing at
    /// the imported global they await.
    unresolved_global_backrefs: HashMap<u32, u32>,
}

impl SymbolTable {
    // Function types.

    /// Allocate a signature with the given arities; the concrete types are
    /// registered afterwards, in order.
    pub fn allocate_function_type(&mut self, param_count: u32, return_length: u32) -> u32 {
        let type_index = self.function_types.len() as u32;
        self.function_types.push(FunctionType {
            param_types: Vec::with_capacity(param_count as usize),
            return_types: Vec::with_capacity(return_length as usize),
        });
        type_index
    }

    pub fn register_function_type_parameter_type(
        &mut self,
        type_index: u32,
        param_index: u32,
        value_type: ValueType,
    ) {
        let functype = &mut self.function_types[type_index as usize];
        debug_assert_eq!(functype.param_types.len(), param_index as usize);
        functype.param_types.push(value_type);
    }

    pub fn register_function_type_return_type(
        &mut self,
        type_index: u32,
        result_index: u32,
        value_type: ValueType,
    ) {
        let functype = &mut self.function_types[type_index as usize];
        debug_assert_eq!(functype.return_types.len(), result_index as usize);
        functype.return_types.push(value_type);
    }

    pub fn function_type(&self, type_index: u32) -> Option<&FunctionType> {
        self.function_types.get(type_index as usize)
    }

    pub fn function_type_exists(&self, type_index: u32) -> bool {
        (type_index as usize) < self.function_types.len()
    }

    pub fn function_type_argument_count(&self, type_index: u32) -> Option<u32> {
        self.function_type(type_index)
            .map(|ft| ft.param_types.len() as u32)
    }

    pub fn function_type_return_type_length(&self, type_index: u32) -> Option<u32> {
        self.function_type(type_index)
            .map(|ft| ft.return_types.len() as u32)
    }

    // Functions.

    pub fn import_function(
        &mut self,
        module_name: String,
        member_name: String,
        type_index: u32,
    ) -> u32 {
        let index = self.functions.len() as u32;
        self.functions.push(WasmFunction {
            index,
            type_index,
            imported: true,
            module_name: Some(module_name),
            member_name: Some(member_name),
            code_entry: None,
        });
        index
    }

    pub fn declare_function(&mut self, type_index: u32) -> u32 {
        let index = self.functions.len() as u32;
        self.functions.push(WasmFunction {
            index,
            type_index,
            imported: false,
            module_name: None,
            member_name: None,
            code_entry: None,
        });
        index
    }

    pub fn function(&self, index: u32) -> Option<&WasmFunction> {
        self.functions.get(index as usize)
    }

    pub fn function_mut(&mut self, index: u32) -> Option<&mut WasmFunction> {
        self.functions.get_mut(index as usize)
    }

    pub fn function_count(&self) -> u32 {
        self.functions.len() as u32
    }

    /// `(argument_count, return_length)` of the function's signature.
    pub fn function_arity(&self, index: u32) -> Option<(u32, u32)> {
        let function = self.function(index)?;
        let functype = self.function_type(function.type_index)?;
        Some((
            functype.param_types.len() as u32,
            functype.return_types.len() as u32,
        ))
    }

    pub fn function_return_type(&self, index: u32) -> Option<BlockType> {
        let function = self.function(index)?;
        Some(self.function_type(function.type_index)?.return_type())
    }

    /// The function's parameter types as local-slot tag bytes.
    pub fn function_param_types(&self, index: u32) -> Option<Vec<u8>> {
        let function = self.function(index)?;
        let functype = self.function_type(function.type_index)?;
        Some(functype.param_types.iter().map(|vt| *vt as u8).collect())
    }

    // Tables and memories. At most one of each exists per module; the
    // decoder enforces the cardinality before calling in.

    pub fn import_table(
        &mut self,
        store: &mut Store,
        _module_name: String,
        _member_name: String,
        initial_size: u32,
        max_size: Option<u32>,
    ) {
        let address = store.allocate_table(initial_size, max_size);
        self.table = Some(TableRecord {
            initial_size,
            max_size,
            imported: true,
            address,
        });
    }

    pub fn allocate_table(&mut self, store: &mut Store, initial_size: u32, max_size: Option<u32>) {
        let address = store.allocate_table(initial_size, max_size);
        self.table = Some(TableRecord {
            initial_size,
            max_size,
            imported: false,
            address,
        });
    }

    pub fn table(&self) -> Option<&TableRecord> {
        self.table.as_ref()
    }

    pub fn table_count(&self) -> u32 {
        self.table.is_some() as u32
    }

    pub fn table_exists(&self) -> bool {
        self.table.is_some()
    }

    pub fn import_memory(
        &mut self,
        store: &mut Store,
        _module_name: String,
        _member_name: String,
        initial_pages: u32,
        max_pages: Option<u32>,
    ) {
        let address = store.allocate_memory(initial_pages, max_pages);
        self.memory = Some(MemoryRecord {
            initial_pages,
            max_pages,
            imported: true,
            address,
        });
    }

    pub fn allocate_memory(&mut self, store: &mut Store, initial_pages: u32, max_pages: Option<u32>) {
        let address = store.allocate_memory(initial_pages, max_pages);
        self.memory = Some(MemoryRecord {
            initial_pages,
            max_pages,
            imported: false,
            address,
        });
    }

    pub fn memory(&self) -> Option<&MemoryRecord> {
        self.memory.as_ref()
    }

    pub fn memory_count(&self) -> u32 {
        self.memory.is_some() as u32
    }

    pub fn memory_address(&self) -> Option<u32> {
        self.memory.as_ref().map(|m| m.address)
    }

    /// Write `function_indices` into the module's table at `offset`.
    pub fn initialize_table_with_functions(
        &self,
        store: &mut Store,
        offset: u32,
        function_indices: &[u32],
    ) -> Result<(), LinkerError> {
        let table = self.table.as_ref().ok_or(LinkerError::NoTable)?;
        store
            .table_mut(table.address)
            .init_with_functions(offset, function_indices)
    }

    // Globals.

    /// Record a global at `index` and allocate its slot in the process-wide
    /// globals array. Indices grow strictly monotonically.
    pub fn declare_global(
        &mut self,
        globals: &mut Globals,
        index: u32,
        value_type: ValueType,
        mutability: GlobalMutability,
        resolution: GlobalResolution,
    ) -> u32 {
        debug_assert_eq!(index as usize, self.globals.len());
        let address = globals.allocate();
        self.globals.push(GlobalRecord {
            value_type,
            mutability,
            resolution,
            address,
        });
        address
    }

    /// Record an imported global whose storage lives at an already-known
    /// address (the exporting module's slot).
    pub fn import_global_at(
        &mut self,
        index: u32,
        value_type: ValueType,
        mutability: GlobalMutability,
        resolution: GlobalResolution,
        address: u32,
    ) {
        debug_assert_eq!(index as usize, self.globals.len());
        self.globals.push(GlobalRecord {
            value_type,
            mutability,
            resolution,
            address,
        });
    }

    pub fn global_count(&self) -> u32 {
        self.globals.len() as u32
    }

    /// The largest global index in use, if any. Grows strictly monotonically
    /// as globals are imported or declared.
    pub fn max_global_index(&self) -> Option<u32> {
        (self.globals.len() as u32).checked_sub(1)
    }

    /// The index the next imported or declared global will occupy.
    pub fn next_global_index(&self) -> u32 {
        self.globals.len() as u32
    }

    pub fn global_value_type(&self, index: u32) -> Option<ValueType> {
        self.globals.get(index as usize).map(|g| g.value_type)
    }

    pub fn global_mutability(&self, index: u32) -> Option<GlobalMutability> {
        self.globals.get(index as usize).map(|g| g.mutability)
    }

    pub fn global_resolution(&self, index: u32) -> Option<GlobalResolution> {
        self.globals.get(index as usize).map(|g| g.resolution)
    }

    pub fn global_address(&self, index: u32) -> Option<u32> {
        self.globals.get(index as usize).map(|g| g.address)
    }

    pub fn set_global_resolution(&mut self, index: u32, resolution: GlobalResolution) {
        if let Some(global) = self.globals.get_mut(index as usize) {
            global.resolution = resolution;
        }
    }

    /// Remember that the global at `index` awaits the imported global at
    /// `imported_index`.
    pub fn track_unresolved_global(&mut self, index: u32, imported_index: u32) {
        self.unresolved_global_backrefs.insert(index, imported_index);
    }

    pub fn unresolved_global_backref(&self, index: u32) -> Option<u32> {
        self.unresolved_global_backrefs.get(&index).copied()
    }

    // Exports and the start function.

    pub fn export_function(&mut self, name: String, index: u32) {
        self.exports.insert(name, ExportDesc::Func(index));
    }

    pub fn export_table(&mut self, name: String) {
        self.exports.insert(name, ExportDesc::Table);
    }

    pub fn export_global(&mut self, name: String, index: u32) {
        self.exports.insert(name, ExportDesc::Global(index));
    }

    pub fn export(&self, name: &str) -> Option<&ExportDesc> {
        self.exports.get(name)
    }

    pub fn export_count(&self) -> usize {
        self.exports.len()
    }

    pub fn set_start_function(&mut self, index: u32) {
        self.start_function_index = Some(index);
    }

    pub fn start_function_index(&self) -> Option<u32> {
        self.start_function_index
    }
}
