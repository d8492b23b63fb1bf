//! The execution-node tree emitted by the function-body decoder.
//!
//! The decoder builds one node per structured control construct while it
//! abstractly interprets the body. The tree is opaque from the decoder's
//! point of view: an execution engine walks it together with the code entry's
//! constant pools, consuming pool entries positionally as it re-reads the
//! instruction bytes.

use crate::types::BlockType;

/// Per-function decode output.
///
/// The three constant pools are consumed positionally during execution.
/// Keeping them separate is a space optimization: tiny per-opcode literals
/// (LEB byte lengths) go in the byte pool, mid-width values (stack snapshots,
/// return lengths) in the int pool, and indices plus 64-bit literals in the
/// long pool.
#[derive(Debug)]
pub struct CodeEntry {
    pub function_index: u32,
    /// Parameter types followed by local types, one tag byte per slot.
    pub local_types: Vec<u8>,
    pub byte_constants: Vec<u8>,
    pub int_constants: Vec<i32>,
    pub long_constants: Vec<i64>,
    /// Side tables for `br_table`, each laid out as
    /// `[default_return_length, (target_label, target_stack_state) * (N+1)]`.
    pub branch_tables: Vec<Box<[i32]>>,
    /// Operand-stack depth high-water mark.
    pub max_stack_size: u32,
    /// The root block, returning the function result type. Absent until the
    /// second decode sweep reaches this entry.
    pub body: Option<WasmBlockNode>,
}

impl CodeEntry {
    pub fn new(function_index: u32) -> CodeEntry {
        CodeEntry {
            function_index,
            local_types: Vec::new(),
            byte_constants: Vec::new(),
            int_constants: Vec::new(),
            long_constants: Vec::new(),
            branch_tables: Vec::new(),
            max_stack_size: 0,
            body: None,
        }
    }

    pub fn local_count(&self) -> u32 {
        self.local_types.len() as u32
    }
}

/// A structured control construct inside a function body.
#[derive(Debug)]
pub enum WasmNode {
    Block(WasmBlockNode),
    Loop(WasmLoopNode),
    If(WasmIfNode),
    Empty(WasmEmptyNode),
}

impl WasmNode {
    pub fn byte_length(&self) -> u32 {
        match self {
            WasmNode::Block(b) => b.byte_length(),
            WasmNode::Loop(l) => l.body.byte_length(),
            WasmNode::If(i) => i.byte_length,
            WasmNode::Empty(e) => e.byte_length,
        }
    }
}

/// One block scope, recording where its instructions and pool entries start,
/// and after [`WasmBlockNode::initialize`] how much of each it consumed.
#[derive(Debug)]
pub struct WasmBlockNode {
    pub start_offset: usize,
    /// Arity the block leaves on the stack on normal fallthrough.
    pub return_type: BlockType,
    /// Arity carried by a branch landing on this block's continuation. For
    /// loops this is void, because branches re-enter the loop header.
    pub continuation_type: BlockType,
    pub start_stack_size: i32,
    pub byte_constant_offset: u32,
    pub int_constant_offset: u32,
    pub long_constant_offset: u32,
    pub branch_table_offset: u32,
    children: Vec<WasmNode>,
    call_nodes: Vec<WasmCallNode>,
    byte_length: u32,
    byte_constant_length: u32,
    int_constant_length: u32,
    long_constant_length: u32,
    branch_table_length: u32,
}

impl WasmBlockNode {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start_offset: usize,
        return_type: BlockType,
        continuation_type: BlockType,
        start_stack_size: i32,
        byte_constant_offset: u32,
        int_constant_offset: u32,
        long_constant_offset: u32,
        branch_table_offset: u32,
    ) -> WasmBlockNode {
        WasmBlockNode {
            start_offset,
            return_type,
            continuation_type,
            start_stack_size,
            byte_constant_offset,
            int_constant_offset,
            long_constant_offset,
            branch_table_offset,
            children: Vec::new(),
            call_nodes: Vec::new(),
            byte_length: 0,
            byte_constant_length: 0,
            int_constant_length: 0,
            long_constant_length: 0,
            branch_table_length: 0,
        }
    }

    /// Complete the block with its nested control nodes, call sites, and the
    /// stream and pool ranges it consumed.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        &mut self,
        children: Vec<WasmNode>,
        call_nodes: Vec<WasmCallNode>,
        byte_length: u32,
        byte_constant_length: u32,
        int_constant_length: u32,
        long_constant_length: u32,
        branch_table_length: u32,
    ) {
        self.children = children;
        self.call_nodes = call_nodes;
        self.byte_length = byte_length;
        self.byte_constant_length = byte_constant_length;
        self.int_constant_length = int_constant_length;
        self.long_constant_length = long_constant_length;
        self.branch_table_length = branch_table_length;
    }

    /// Number of values the operand stack carries at the point a branch lands
    /// on this block's continuation.
    pub fn continuation_type_length(&self) -> u32 {
        self.continuation_type.result_length()
    }

    pub fn children(&self) -> &[WasmNode] {
        &self.children
    }

    pub fn call_nodes(&self) -> &[WasmCallNode] {
        &self.call_nodes
    }

    pub fn byte_length(&self) -> u32 {
        self.byte_length
    }

    pub fn byte_constant_length(&self) -> u32 {
        self.byte_constant_length
    }

    pub fn int_constant_length(&self) -> u32 {
        self.int_constant_length
    }

    pub fn long_constant_length(&self) -> u32 {
        self.long_constant_length
    }

    pub fn branch_table_length(&self) -> u32 {
        self.branch_table_length
    }
}

/// A loop re-enters its own header on branch, consuming nothing.
#[derive(Debug)]
pub struct WasmLoopNode {
    pub body: WasmBlockNode,
}

#[derive(Debug)]
pub struct WasmIfNode {
    pub true_branch: WasmBlockNode,
    /// Block node, or an empty node when the `if` has no `else`.
    pub false_branch: Box<WasmNode>,
    pub byte_length: u32,
    pub block_type: BlockType,
    pub initial_stack_pointer: i32,
}

/// A placeholder branch with no instructions.
#[derive(Debug)]
pub struct WasmEmptyNode {
    pub byte_length: u32,
}

/// One call site inside a block, in source order.
#[derive(Debug, PartialEq)]
pub enum WasmCallNode {
    /// Direct call. Only the callee's index is recorded: the callee may be
    /// decoded later in this module, or live in a module that has not been
    /// decoded at all, so the real call node is materialized on first
    /// execution.
    Stub { function_index: u32 },
    /// Indirect call through the table, resolved against the expected
    /// signature at execution time.
    Indirect,
}
