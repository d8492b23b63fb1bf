//! The code section: function bodies, decoded in a single pass that also
//! abstractly interprets each body.
//!
//! The section is processed in two sweeps. The first allocates a code entry
//! for every declared function, so that `call` opcodes anywhere in the
//! section can refer to functions whose bodies have not been decoded yet.
//! The second reads each body, simulating the operand stack while
//! materializing the side tables execution needs: per-opcode constant
//! streams, branch tables, the stack high-water mark, and the local slot
//! layout.

use {
    super::{
        error::{DecodeError, DecodeErrorKind, Result},
        exec_state::ExecutionState,
        BinaryDecoder,
    },
    wasmite_common::TrueOr,
    wasmite_runtime::{
        nodes::{
            CodeEntry, WasmBlockNode, WasmCallNode, WasmEmptyNode, WasmIfNode, WasmLoopNode,
            WasmNode,
        },
        opcodes,
        types::{BlockType, GlobalMutability},
    },
};

impl BinaryDecoder<'_> {
    /// codesec := vec(code), code := size:u32 func
    pub(crate) fn read_code_section(&mut self) -> Result<()> {
        let num_code_entries = self.reader.read_unsigned_int32()?;
        // Sweep one: register a code entry with every declared function, so
        // call targets exist before any body is decoded.
        for entry in 0..num_code_entries {
            self.create_code_entry(self.module_function_index + entry)?;
        }
        // Sweep two: decode the bodies, checking the declared size of each.
        for entry in 0..num_code_entries {
            let code_entry_size = self.reader.read_unsigned_int32()?;
            let start_offset = self.reader.offset();
            self.read_code_entry(self.module_function_index + entry)?;
            let consumed = (self.reader.offset() - start_offset) as u32;
            (consumed == code_entry_size).true_or_else(|| {
                self.err(DecodeErrorKind::CodeEntrySizeMismatch {
                    index: entry,
                    declared: code_entry_size,
                    consumed,
                })
            })?;
        }
        self.module_function_index += num_code_entries;
        Ok(())
    }

    fn create_code_entry(&mut self, function_index: u32) -> Result<()> {
        let offset = self.reader.offset();
        let Some(function) = self.module.symbol_table.function_mut(function_index) else {
            return Err(DecodeError::new(
                DecodeErrorKind::UnknownFunctionIndex(function_index),
                offset,
            ));
        };
        function.code_entry = Some(CodeEntry::new(function_index));
        Ok(())
    }

    /// func := vec(locals) expr, locals := n:u32 t:valtype
    fn read_code_entry(&mut self, function_index: u32) -> Result<()> {
        let local_types = self.read_code_entry_locals(function_index)?;
        let return_type = self
            .module
            .symbol_table
            .function_return_type(function_index)
            .ok_or_else(|| self.err(DecodeErrorKind::UnknownFunctionIndex(function_index)))?;

        let local_count = local_types.len() as u32;
        let mut state = ExecutionState::new();
        let body = self.read_block_body(&mut state, local_count, return_type, return_type)?;

        let max_stack_size = state.max_stack_size().max(0) as u32;
        let offset = self.reader.offset();
        let Some(entry) = self
            .module
            .symbol_table
            .function_mut(function_index)
            .and_then(|f| f.code_entry.as_mut())
        else {
            return Err(DecodeError::new(
                DecodeErrorKind::UnknownFunctionIndex(function_index),
                offset,
            ));
        };
        entry.local_types = local_types;
        entry.byte_constants = state.byte_constants;
        entry.int_constants = state.int_constants;
        entry.long_constants = state.long_constants;
        entry.branch_tables = state.branch_tables;
        entry.max_stack_size = max_stack_size;
        entry.body = Some(body);
        Ok(())
    }

    /// The declared locals, grouped as `(count, type)` pairs, expanded into a
    /// flat tag-byte vector behind the parameter types.
    fn read_code_entry_locals(&mut self, function_index: u32) -> Result<Vec<u8>> {
        let mut local_types = self
            .module
            .symbol_table
            .function_param_types(function_index)
            .ok_or_else(|| self.err(DecodeErrorKind::UnknownFunctionIndex(function_index)))?;
        let num_local_groups = self.reader.read_unsigned_int32()?;
        for _ in 0..num_local_groups {
            let group_length = self.reader.read_unsigned_int32()?;
            let value_type = self.read_value_type()?;
            for _ in 0..group_length {
                local_types.push(value_type as u8);
            }
        }
        Ok(local_types)
    }

    fn read_block(
        &mut self,
        state: &mut ExecutionState,
        local_count: u32,
    ) -> Result<WasmBlockNode> {
        let block_type = self.read_block_type()?;
        self.read_block_body(state, local_count, block_type, block_type)
    }

    fn read_loop(&mut self, state: &mut ExecutionState, local_count: u32) -> Result<WasmLoopNode> {
        let block_type = self.read_block_type()?;
        let initial_stack_pointer = state.stack_size();
        // Branches target the loop header, which consumes nothing, so the
        // continuation type is forced to void.
        let body = self.read_block_body(state, local_count, block_type, BlockType::Void)?;

        // A branch out of the body can leave the simulated stack short of
        // the straight-line depth; force the depth the body would have
        // produced with no branches taken.
        state.set_stack_pointer(if block_type != BlockType::Void {
            initial_stack_pointer + 1
        } else {
            initial_stack_pointer
        });

        Ok(WasmLoopNode { body })
    }

    fn read_if(&mut self, state: &mut ExecutionState, local_count: u32) -> Result<WasmIfNode> {
        let block_type = self.read_block_type()?;
        let initial_stack_pointer = state.stack_size();

        // The condition value is popped before either branch runs.
        state.pop();

        let start_offset = self.reader.offset();
        let true_branch = self.read_block_body(state, local_count, block_type, block_type)?;

        // Same correction as after a loop body.
        state.set_stack_pointer(if block_type != BlockType::Void {
            initial_stack_pointer
        } else {
            initial_stack_pointer - 1
        });

        let false_branch = if self.reader.peek1(-1)? == opcodes::ELSE {
            // With both branches present and a non-void type, each branch
            // body pushes the result once; pop to compensate before the
            // second body is simulated.
            if block_type != BlockType::Void {
                state.pop();
            }
            let false_block = self.read_block_body(state, local_count, block_type, block_type)?;
            if block_type != BlockType::Void {
                state.set_stack_pointer(initial_stack_pointer);
            }
            WasmNode::Block(false_block)
        } else {
            (block_type == BlockType::Void)
                .true_or_else(|| self.err(DecodeErrorKind::IfWithoutElse))?;
            WasmNode::Empty(WasmEmptyNode { byte_length: 0 })
        };

        Ok(WasmIfNode {
            true_branch,
            false_branch: Box::new(false_branch),
            byte_length: (self.reader.offset() - start_offset) as u32,
            block_type,
            initial_stack_pointer,
        })
    }

    /// Decode instructions until the block's terminating `END` (or the `ELSE`
    /// splitting an if), mutating the abstract stack per opcode and emitting
    /// immediates into the constant pools.
    ///
    /// `return_type` is the arity the block leaves on the stack on normal
    /// fallthrough; `continuation_type` the arity consumed by a branch to
    /// this block.
    fn read_block_body(
        &mut self,
        state: &mut ExecutionState,
        local_count: u32,
        return_type: BlockType,
        continuation_type: BlockType,
    ) -> Result<WasmBlockNode> {
        let mut nested_control_nodes: Vec<WasmNode> = Vec::new();
        let mut call_nodes: Vec<WasmCallNode> = Vec::new();
        let start_stack_size = state.stack_size();
        let start_offset = self.reader.offset();
        let start_byte_constant_offset = state.byte_constant_offset();
        let start_int_constant_offset = state.int_constant_offset();
        let start_long_constant_offset = state.long_constant_offset();
        let start_branch_table_offset = state.branch_table_offset();
        let mut block = WasmBlockNode::new(
            start_offset,
            return_type,
            continuation_type,
            start_stack_size,
            start_byte_constant_offset,
            start_int_constant_offset,
            start_long_constant_offset,
            start_branch_table_offset,
        );

        // Depth-0 branches land on this block's continuation.
        state.push_continuation_return_length(block.continuation_type_length() as i32);

        loop {
            let opcode = self.reader.read1()?;
            if opcode == opcodes::END || opcode == opcodes::ELSE {
                break;
            }
            match opcode {
                opcodes::UNREACHABLE | opcodes::NOP => {}
                opcodes::BLOCK => {
                    // Save this block's stack pointer for branches out of
                    // the nested block.
                    state.push_stack_state(state.stack_size());
                    let nested = self.read_block(state, local_count)?;
                    nested_control_nodes.push(WasmNode::Block(nested));
                    state.pop_stack_state();
                }
                opcodes::LOOP => {
                    state.push_stack_state(state.stack_size());
                    let nested = self.read_loop(state, local_count)?;
                    nested_control_nodes.push(WasmNode::Loop(nested));
                    state.pop_stack_state();
                }
                opcodes::IF => {
                    // The saved state accounts for the condition value that
                    // the if pops on entry.
                    state.push_stack_state(state.stack_size() - 1);
                    let nested = self.read_if(state, local_count)?;
                    nested_control_nodes.push(WasmNode::If(nested));
                    state.pop_stack_state();
                }
                opcodes::BR => {
                    let (unwind_level, bytes_consumed) =
                        self.reader.read_unsigned_int32_counted()?;
                    self.emit_branch_constants(state, unwind_level, bytes_consumed)?;
                }
                opcodes::BR_IF => {
                    state.pop(); // The branch condition.
                    let (unwind_level, bytes_consumed) =
                        self.reader.read_unsigned_int32_counted()?;
                    self.emit_branch_constants(state, unwind_level, bytes_consumed)?;
                }
                opcodes::BR_TABLE => {
                    let num_labels = self.reader.read_unsigned_int32()?;
                    // One side table keeps the target -> state mapping:
                    // [return_length, (target_label, target_stack_state) per
                    // label, the default last]. All targets must agree on
                    // the return length.
                    let mut branch_table = vec![0i32; 2 * (num_labels as usize + 1) + 1];
                    let mut return_length: Option<i32> = None;
                    for i in 0..=num_labels as usize {
                        let target_label = self.reader.read_unsigned_int32()?;
                        let stack_state = self.label_stack_state(state, target_label)?;
                        let block_return_length =
                            self.label_continuation_return_length(state, target_label)?;
                        branch_table[1 + 2 * i] = target_label as i32;
                        branch_table[1 + 2 * i + 1] = stack_state;
                        match return_length {
                            None => return_length = Some(block_return_length),
                            Some(first) => (first == block_return_length).true_or_else(|| {
                                self.err(DecodeErrorKind::BranchTableArityMismatch {
                                    first: first as u32,
                                    other: block_return_length as u32,
                                })
                            })?,
                        }
                    }
                    branch_table[0] = return_length.unwrap_or(0);
                    state.pop(); // The selector.
                    state.save_branch_table(branch_table.into_boxed_slice());
                }
                opcodes::RETURN => {
                    state.use_long_constant(state.stack_state_count() as i64);
                    let root_return_length = state.root_block_return_length();
                    state.use_int_constant(root_return_length);
                }
                opcodes::CALL => {
                    let (function_index, bytes_consumed) =
                        self.reader.read_unsigned_int32_counted()?;
                    state.use_long_constant(function_index as i64);
                    state.use_byte_constant(bytes_consumed);
                    let (argument_count, return_length) = self
                        .module
                        .symbol_table
                        .function_arity(function_index)
                        .ok_or_else(|| {
                            self.err(DecodeErrorKind::UnknownFunctionIndex(function_index))
                        })?;
                    state.pop_n(argument_count as i32);
                    state.push_n(return_length as i32);

                    // The call target may not exist yet: the callee's code
                    // entry can come later in this section, or in a module
                    // that has not been decoded. Record a stub holding only
                    // the index; the real call node is materialized on first
                    // execution.
                    call_nodes.push(WasmCallNode::Stub { function_index });
                }
                opcodes::CALL_INDIRECT => {
                    let (expected_type_index, bytes_consumed) =
                        self.reader.read_unsigned_int32_counted()?;
                    state.use_long_constant(expected_type_index as i64);
                    state.use_byte_constant(bytes_consumed);
                    let argument_count = self
                        .module
                        .symbol_table
                        .function_type_argument_count(expected_type_index)
                        .ok_or_else(|| {
                            self.err(DecodeErrorKind::UnknownTypeIndex(expected_type_index))
                        })?;
                    let return_length = self
                        .module
                        .symbol_table
                        .function_type_return_type_length(expected_type_index)
                        .ok_or_else(|| {
                            self.err(DecodeErrorKind::UnknownTypeIndex(expected_type_index))
                        })?;

                    // Pop the function index to call, then the arguments.
                    state.pop();
                    state.pop_n(argument_count as i32);
                    state.push_n(return_length as i32);
                    call_nodes.push(WasmCallNode::Indirect);

                    let reserved = self.reader.read1()?;
                    (reserved == opcodes::CALL_INDIRECT_ZERO_TABLE).true_or_else(|| {
                        self.err(DecodeErrorKind::InvalidCallIndirectReserved(reserved))
                    })?;
                }
                opcodes::DROP => state.pop(),
                opcodes::SELECT => {
                    // The condition and the two values to select between.
                    state.pop_n(3);
                    state.push();
                }
                opcodes::LOCAL_GET => {
                    let local_index = self.read_indexed_immediate(state)?;
                    self.check_local_index(opcode, local_index, local_count)?;
                    state.push();
                }
                opcodes::LOCAL_SET => {
                    let local_index = self.read_indexed_immediate(state)?;
                    self.check_local_index(opcode, local_index, local_count)?;
                    self.check_stack_has(state, opcode, 1)?;
                    state.pop();
                }
                opcodes::LOCAL_TEE => {
                    let local_index = self.read_indexed_immediate(state)?;
                    self.check_local_index(opcode, local_index, local_count)?;
                    self.check_stack_has(state, opcode, 1)?;
                }
                opcodes::GLOBAL_GET => {
                    let global_index = self.read_indexed_immediate(state)?;
                    (global_index < self.module.symbol_table.global_count()).true_or_else(|| {
                        self.err(DecodeErrorKind::UnknownGlobalIndex(global_index))
                    })?;
                    state.push();
                }
                opcodes::GLOBAL_SET => {
                    let global_index = self.read_indexed_immediate(state)?;
                    let mutability = self
                        .module
                        .symbol_table
                        .global_mutability(global_index)
                        .ok_or_else(|| {
                            self.err(DecodeErrorKind::UnknownGlobalIndex(global_index))
                        })?;
                    (mutability == GlobalMutability::Var).true_or_else(|| {
                        self.err(DecodeErrorKind::ImmutableGlobalSet(global_index))
                    })?;
                    self.check_stack_has(state, opcode, 1)?;
                    state.pop();
                }
                opcodes::I32_LOAD..=opcodes::I64_LOAD32_U => {
                    self.read_memory_immediates(state)?;
                    self.check_stack_has(state, opcode, 1)?;
                    state.pop(); // Base address.
                    state.push(); // Loaded value.
                }
                opcodes::I32_STORE..=opcodes::I64_STORE_32 => {
                    self.read_memory_immediates(state)?;
                    self.check_stack_has(state, opcode, 2)?;
                    state.pop(); // Value to store.
                    state.pop(); // Base address.
                }
                opcodes::MEMORY_SIZE => {
                    // The reserved 0x00 memory index.
                    self.reader.read1()?;
                    state.push();
                }
                opcodes::MEMORY_GROW => {
                    self.reader.read1()?;
                    state.pop();
                    state.push();
                }
                opcodes::I32_CONST => {
                    let (value, bytes_consumed) = self.reader.read_signed_int32_counted()?;
                    state.use_long_constant(value as i64);
                    state.use_byte_constant(bytes_consumed);
                    state.push();
                }
                opcodes::I64_CONST => {
                    let (value, bytes_consumed) = self.reader.read_signed_int64_counted()?;
                    state.use_long_constant(value);
                    state.use_byte_constant(bytes_consumed);
                    state.push();
                }
                opcodes::F32_CONST => {
                    let value = self.reader.read_float32_as_int32()?;
                    state.use_long_constant(value as i64);
                    state.push();
                }
                opcodes::F64_CONST => {
                    let value = self.reader.read_float64_as_int64()?;
                    state.use_long_constant(value);
                    state.push();
                }
                // Tests against zero, unary operators, and conversions take
                // one operand and produce one value.
                opcodes::I32_EQZ
                | opcodes::I64_EQZ
                | opcodes::I32_CLZ..=opcodes::I32_POPCNT
                | opcodes::I64_CLZ..=opcodes::I64_POPCNT
                | opcodes::F32_ABS..=opcodes::F32_SQRT
                | opcodes::F64_ABS..=opcodes::F64_SQRT
                | opcodes::I32_WRAP_I64..=opcodes::F64_REINTERPRET_I64 => {
                    state.pop();
                    state.push();
                }
                // Comparisons and binary arithmetic take two operands.
                opcodes::I32_EQ..=opcodes::I32_GE_U
                | opcodes::I64_EQ..=opcodes::I64_GE_U
                | opcodes::F32_EQ..=opcodes::F32_GE
                | opcodes::F64_EQ..=opcodes::F64_GE
                | opcodes::I32_ADD..=opcodes::I32_ROTR
                | opcodes::I64_ADD..=opcodes::I64_ROTR
                | opcodes::F32_ADD..=opcodes::F32_COPYSIGN
                | opcodes::F64_ADD..=opcodes::F64_COPYSIGN => {
                    state.pop_n(2);
                    state.push();
                }
                _ => return Err(self.err(DecodeErrorKind::UnknownOpcode(opcode))),
            }
        }

        block.initialize(
            nested_control_nodes,
            call_nodes,
            (self.reader.offset() - start_offset) as u32,
            state.byte_constant_offset() - start_byte_constant_offset,
            state.int_constant_offset() - start_int_constant_offset,
            state.long_constant_offset() - start_long_constant_offset,
            state.branch_table_offset() - start_branch_table_offset,
        );

        state.pop_continuation_return_length();

        Ok(block)
    }

    /// A LEB128 index immediate: the value goes to the long pool and its
    /// encoded width to the byte pool.
    fn read_indexed_immediate(&mut self, state: &mut ExecutionState) -> Result<u32> {
        let (index, bytes_consumed) = self.reader.read_unsigned_int32_counted()?;
        state.use_long_constant(index as i64);
        state.use_byte_constant(bytes_consumed);
        Ok(index)
    }

    /// The `align` and `offset` immediates of the load/store family. The
    /// align value is discarded, but its encoded width is recorded so
    /// execution can skip it.
    fn read_memory_immediates(&mut self, state: &mut ExecutionState) -> Result<()> {
        let (_, align_length) = self.reader.read_unsigned_int32_counted()?;
        state.use_byte_constant(align_length);
        let (offset, offset_length) = self.reader.read_unsigned_int32_counted()?;
        state.use_long_constant(offset as i64);
        state.use_byte_constant(offset_length);
        Ok(())
    }

    /// Branch constants shared by `br` and `br_if`: the label, its encoded
    /// width, and the target scope's entry depth and return arity.
    fn emit_branch_constants(
        &self,
        state: &mut ExecutionState,
        unwind_level: u32,
        bytes_consumed: u8,
    ) -> Result<()> {
        let stack_state = self.label_stack_state(state, unwind_level)?;
        let return_length = self.label_continuation_return_length(state, unwind_level)?;
        state.use_long_constant(unwind_level as i64);
        state.use_byte_constant(bytes_consumed);
        state.use_int_constant(stack_state);
        state.use_int_constant(return_length);
        Ok(())
    }

    fn label_stack_state(&self, state: &ExecutionState, label: u32) -> Result<i32> {
        state.stack_state(label).ok_or_else(|| {
            self.err(DecodeErrorKind::InvalidBranchLabel {
                label,
                depth: state.stack_state_count() as u32,
            })
        })
    }

    fn label_continuation_return_length(&self, state: &ExecutionState, label: u32) -> Result<i32> {
        state.continuation_return_length(label).ok_or_else(|| {
            self.err(DecodeErrorKind::InvalidBranchLabel {
                label,
                depth: state.stack_state_count() as u32,
            })
        })
    }

    fn check_local_index(&self, opcode: u8, index: u32, local_count: u32) -> Result<()> {
        (index <= local_count).true_or_else(|| {
            self.err(DecodeErrorKind::InvalidLocalIndex {
                opcode,
                index,
                count: local_count,
            })
        })
    }

    fn check_stack_has(&self, state: &ExecutionState, opcode: u8, required: u32) -> Result<()> {
        (state.stack_size() >= required as i32).true_or_else(|| {
            self.err(DecodeErrorKind::StackUnderflow {
                opcode,
                required,
                found: state.stack_size(),
            })
        })
    }

    /// Stack-shape check at block exit. Not called: a branch inside the
    /// block may target a shallower scope, so the depth here legitimately
    /// differs from what a straight-line pass would leave.
    #[allow(dead_code)]
    fn check_valid_state_on_block_exit(
        &self,
        state: &ExecutionState,
        return_type: BlockType,
        initial_stack_size: i32,
    ) -> Result<()> {
        let expect = initial_stack_size + return_type.result_length() as i32;
        (state.stack_size() == expect).true_or_else(|| {
            self.err(DecodeErrorKind::InvalidStackStateOnExit {
                expect,
                found: state.stack_size(),
            })
        })
    }
}
