use {crate::error::LinkerError, wasmite_common::TrueOr};

/// A table instance is the runtime representation of a function table.
/// [Spec][Spec]
///
/// Entries are function indices into the owning module's function index
/// space; `None` marks an uninitialized slot. Element segments fill ranges of
/// the table during decode (or later, through the linker, when the segment
/// offset depends on an unresolved global).
///
/// [Spec]: https://webassembly.github.io/spec/core/exec/runtime.html#table-instances
#[derive(Debug)]
pub struct TableInstance {
    pub initial_size: u32,
    pub max_size: Option<u32>,
    elements: Vec<Option<u32>>,
}

impl TableInstance {
    pub fn new(initial_size: u32, max_size: Option<u32>) -> TableInstance {
        TableInstance {
            initial_size,
            max_size,
            elements: vec![None; initial_size as usize],
        }
    }

    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    pub fn get(&self, index: u32) -> Option<u32> {
        self.elements.get(index as usize).copied().flatten()
    }

    /// Write `function_indices` into the table starting at `offset`.
    pub fn init_with_functions(
        &mut self,
        offset: u32,
        function_indices: &[u32],
    ) -> Result<(), LinkerError> {
        let end = offset as usize + function_indices.len();
        (end <= self.elements.len()).true_or(LinkerError::ElementSegmentOutOfBounds {
            offset,
            length: function_indices.len() as u32,
            size: self.elements.len() as u32,
        })?;
        for (i, function_index) in function_indices.iter().enumerate() {
            self.elements[offset as usize + i] = Some(*function_index);
        }
        Ok(())
    }
}
