use {crate::symbol_table::SymbolTable, std::rc::Rc};

/// The root container for one module.
///
/// The original byte buffer is retained for the module's whole lifetime:
/// resetting global or memory state between runs re-scans the relevant
/// sections of the same bytes.
#[derive(Debug)]
pub struct WasmModule {
    data: Rc<[u8]>,
    pub symbol_table: SymbolTable,
}

impl WasmModule {
    pub fn new(data: impl Into<Rc<[u8]>>) -> WasmModule {
        WasmModule {
            data: data.into(),
            symbol_table: SymbolTable::default(),
        }
    }

    /// A shared handle on the module bytes.
    pub fn data(&self) -> Rc<[u8]> {
        Rc::clone(&self.data)
    }
}
