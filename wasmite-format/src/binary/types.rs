//! The type section, and the shared readers for the type grammar used by
//! several sections.

use {
    super::{error::DecodeErrorKind, error::Result, BinaryDecoder},
    wasmite_common::TrueOr,
    wasmite_runtime::types::{limits, BlockType, GlobalMutability, ValueType, FUNCREF, VOID_TYPE},
};

const FUNCTION_TYPE_TAG: u8 = 0x60;

impl BinaryDecoder<'_> {
    /// typesec := vec(functype)
    pub(crate) fn read_type_section(&mut self) -> Result<()> {
        let num_types = self.reader.read_unsigned_int32()?;
        for _ in 0..num_types {
            let tag = self.reader.read1()?;
            match tag {
                FUNCTION_TYPE_TAG => self.read_function_type()?,
                _ => return Err(self.err(DecodeErrorKind::InvalidFunctionTypeTag(tag))),
            }
        }
        Ok(())
    }

    /// The signature is allocated before either type list is read, so the
    /// result count is peeked past the parameter bytes (one byte each).
    fn read_function_type(&mut self) -> Result<()> {
        let param_count = self.reader.read_unsigned_int32()?;
        let mut result_length = self.reader.peek_unsigned_int32(param_count as usize)?;
        if result_length == VOID_TYPE as u32 {
            result_length = 0;
        }
        (result_length <= 1)
            .true_or_else(|| self.err(DecodeErrorKind::InvalidResultArity(result_length)))?;
        let type_index = self
            .module
            .symbol_table
            .allocate_function_type(param_count, result_length);
        self.read_parameter_list(type_index, param_count)?;
        self.read_result_list(type_index)
    }

    fn read_parameter_list(&mut self, type_index: u32, param_count: u32) -> Result<()> {
        for param_index in 0..param_count {
            let value_type = self.read_value_type()?;
            self.module.symbol_table.register_function_type_parameter_type(
                type_index,
                param_index,
                value_type,
            );
        }
        Ok(())
    }

    /// Producers disagree on the result-vector encoding. Three shapes are
    /// accepted: a bare `0x40` (void), `0x00` (empty vector), and `0x01`
    /// followed by one value type. Longer results are rejected.
    fn read_result_list(&mut self, type_index: u32) -> Result<()> {
        let specifier = self.reader.read1()?;
        match specifier {
            VOID_TYPE | 0x00 => Ok(()),
            0x01 => {
                let value_type = self.read_value_type()?;
                self.module
                    .symbol_table
                    .register_function_type_return_type(type_index, 0, value_type);
                Ok(())
            }
            _ => Err(self.err(DecodeErrorKind::InvalidResultSpecifier(specifier))),
        }
    }

    pub(crate) fn read_value_type(&mut self) -> Result<ValueType> {
        let byte = self.reader.read1()?;
        ValueType::try_from(byte).map_err(|_| self.err(DecodeErrorKind::InvalidValueType(byte)))
    }

    pub(crate) fn read_block_type(&mut self) -> Result<BlockType> {
        let byte = self.reader.read1()?;
        BlockType::from_byte(byte).ok_or_else(|| self.err(DecodeErrorKind::InvalidBlockType(byte)))
    }

    pub(crate) fn read_mutability(&mut self) -> Result<GlobalMutability> {
        let byte = self.reader.read1()?;
        GlobalMutability::try_from(byte)
            .map_err(|_| self.err(DecodeErrorKind::InvalidMutability(byte)))
    }

    pub(crate) fn read_element_type(&mut self) -> Result<()> {
        let byte = self.reader.read1()?;
        (byte == FUNCREF).true_or_else(|| self.err(DecodeErrorKind::InvalidElementType(byte)))
    }

    /// limits := 0x00 n | 0x01 n m
    pub(crate) fn read_limits(&mut self) -> Result<(u32, Option<u32>)> {
        let prefix = self.reader.read1()?;
        match prefix {
            limits::NO_MAX => Ok((self.reader.read_unsigned_int32()?, None)),
            limits::WITH_MAX => {
                let initial = self.reader.read_unsigned_int32()?;
                let max = self.reader.read_unsigned_int32()?;
                Ok((initial, Some(max)))
            }
            _ => Err(self.err(DecodeErrorKind::InvalidLimitsPrefix(prefix))),
        }
    }
}
