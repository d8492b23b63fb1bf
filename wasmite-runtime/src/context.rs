use crate::{globals::Globals, linker::Linker, memory::MemInstance, table::TableInstance};

/// Embedder-side state shared by every module decoded in one process: the
/// globals array, the linker, and the store of allocated table and memory
/// instances.
#[derive(Debug, Default)]
pub struct WasmContext {
    pub globals: Globals,
    pub linker: Linker,
    pub store: Store,
}

impl WasmContext {
    pub fn new() -> WasmContext {
        WasmContext::default()
    }
}

/// Table and memory instances are referenced with abstract addresses: indices
/// into the respective store component.
#[derive(Debug, Default)]
pub struct Store {
    tables: Vec<TableInstance>,
    memories: Vec<MemInstance>,
}

impl Store {
    pub fn allocate_table(&mut self, initial_size: u32, max_size: Option<u32>) -> u32 {
        let address = self.tables.len() as u32;
        self.tables.push(TableInstance::new(initial_size, max_size));
        address
    }

    pub fn allocate_memory(&mut self, initial_pages: u32, max_pages: Option<u32>) -> u32 {
        let address = self.memories.len() as u32;
        self.memories.push(MemInstance::new(initial_pages, max_pages));
        address
    }

    pub fn table(&self, address: u32) -> &TableInstance {
        &self.tables[address as usize]
    }

    pub fn table_mut(&mut self, address: u32) -> &mut TableInstance {
        &mut self.tables[address as usize]
    }

    pub fn memory(&self, address: u32) -> &MemInstance {
        &self.memories[address as usize]
    }

    pub fn memory_mut(&mut self, address: u32) -> &mut MemInstance {
        &mut self.memories[address as usize]
    }
}
