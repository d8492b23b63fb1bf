//! Element and data segments.

use {
    tests_integration::{
        code_entry, decode, decode_err, decode_with, func_type, module, name, section, section_id,
        signed_leb, unsigned_leb, vec_of, DecodeErrorKind,
    },
    wasmite_runtime::{
        context::WasmContext,
        error::LinkerError,
        types::{GlobalMutability, ValueType},
    },
};

fn element_segment(table_index: u32, offset_expr: &[u8], function_indices: &[u32]) -> Vec<u8> {
    let mut out = unsigned_leb(table_index);
    out.extend(offset_expr);
    out.extend(vec_of(
        function_indices.iter().map(|i| unsigned_leb(*i)).collect(),
    ));
    out
}

fn data_segment(memory_index: u32, offset_expr: &[u8], bytes: &[u8]) -> Vec<u8> {
    let mut out = unsigned_leb(memory_index);
    out.extend(offset_expr);
    out.extend(unsigned_leb(bytes.len() as u32));
    out.extend(bytes);
    out
}

fn two_functions() -> Vec<Vec<u8>> {
    vec![
        section(section_id::TYPE, vec_of(vec![func_type(&[], None)])),
        section(
            section_id::FUNCTION,
            vec_of(vec![unsigned_leb(0), unsigned_leb(0)]),
        ),
    ]
}

fn two_bodies() -> Vec<u8> {
    section(
        section_id::CODE,
        vec_of(vec![code_entry(&[], &[0x0B]), code_entry(&[], &[0x0B])]),
    )
}

#[test]
fn constant_offset_element_segment_fills_the_table() -> anyhow::Result<()> {
    let mut sections = two_functions();
    sections.push(section(section_id::TABLE, vec_of(vec![vec![0x70, 0x00, 0x05]])));
    sections.push(section(
        section_id::ELEMENT,
        vec_of(vec![element_segment(0, &[0x41, 0x01, 0x0B], &[0, 1])]),
    ));
    sections.push(two_bodies());
    let (m, ctx) = decode(module(sections))?;

    let table = ctx.store.table(m.symbol_table.table().unwrap().address);
    assert_eq!(table.get(0), None);
    assert_eq!(table.get(1), Some(0));
    assert_eq!(table.get(2), Some(1));
    assert_eq!(table.get(3), None);
    Ok(())
}

#[test]
fn element_segment_beyond_the_table_is_fatal() {
    let mut sections = two_functions();
    sections.push(section(section_id::TABLE, vec_of(vec![vec![0x70, 0x00, 0x01]])));
    sections.push(section(
        section_id::ELEMENT,
        vec_of(vec![element_segment(0, &[0x41, 0x01, 0x0B], &[0])]),
    ));
    let err = decode_err(module(sections));
    assert!(matches!(
        err.kind,
        DecodeErrorKind::Linker(LinkerError::ElementSegmentOutOfBounds { offset: 1, length: 1, size: 1 })
    ));
}

#[test]
fn element_segment_without_a_table_is_fatal() {
    let elements = section(
        section_id::ELEMENT,
        vec_of(vec![element_segment(0, &[0x41, 0x00, 0x0B], &[])]),
    );
    let err = decode_err(module(vec![elements]));
    assert!(matches!(
        err.kind,
        DecodeErrorKind::Linker(LinkerError::NoTable)
    ));
}

#[test]
fn element_table_index_must_be_zero() {
    let elements = section(
        section_id::ELEMENT,
        vec_of(vec![element_segment(1, &[0x41, 0x00, 0x0B], &[])]),
    );
    let err = decode_err(module(vec![elements]));
    assert!(matches!(err.kind, DecodeErrorKind::InvalidTableIndex(1)));
}

#[test]
fn element_offset_must_be_a_constant_expression() {
    let elements = section(
        section_id::ELEMENT,
        vec_of(vec![element_segment(0, &[0x42, 0x00, 0x0B], &[])]),
    );
    let err = decode_err(module(vec![elements]));
    assert!(matches!(
        err.kind,
        DecodeErrorKind::InvalidElementOffsetExpression(0x42)
    ));
}

#[test]
fn global_offset_element_segment_defers_until_resolution() -> anyhow::Result<()> {
    let mut sections = vec![section(
        section_id::IMPORT,
        vec_of(vec![{
            let mut i = name("env");
            i.extend(name("off"));
            i.extend([0x03, 0x7F, 0x00]);
            i
        }]),
    )];
    sections.push(section(section_id::TABLE, vec_of(vec![vec![0x70, 0x00, 0x05]])));
    sections.push(section(
        section_id::ELEMENT,
        vec_of(vec![element_segment(0, &[0x23, 0x00, 0x0B], &[0])]),
    ));
    let (m, ctx) = decode(module(sections))?;

    // Nothing written yet; the segment is queued on the linker.
    let table = ctx.store.table(m.symbol_table.table().unwrap().address);
    assert!((0..5).all(|i| table.get(i).is_none()));
    assert_eq!(ctx.linker.pending_element_segments().len(), 1);
    assert_eq!(
        ctx.linker.pending_element_segments()[0].offset_global_index,
        0
    );
    Ok(())
}

#[test]
fn resolved_global_offset_element_segment_writes_immediately() -> anyhow::Result<()> {
    let mut ctx = WasmContext::new();
    ctx.linker.register_global_export(
        &mut ctx.globals,
        "env".into(),
        "off".into(),
        ValueType::I32,
        GlobalMutability::Const,
        2,
    );

    let mut sections = vec![section(
        section_id::IMPORT,
        vec_of(vec![{
            let mut i = name("env");
            i.extend(name("off"));
            i.extend([0x03, 0x7F, 0x00]);
            i
        }]),
    )];
    sections.push(section(section_id::TABLE, vec_of(vec![vec![0x70, 0x00, 0x05]])));
    sections.push(section(
        section_id::ELEMENT,
        vec_of(vec![element_segment(0, &[0x23, 0x00, 0x0B], &[0])]),
    ));
    let m = decode_with(module(sections), &mut ctx)?;

    let table = ctx.store.table(m.symbol_table.table().unwrap().address);
    assert_eq!(table.get(2), Some(0));
    assert!(ctx.linker.pending_element_segments().is_empty());
    Ok(())
}

#[test]
fn data_segment_writes_bytes_at_the_constant_offset() -> anyhow::Result<()> {
    let mems = section(section_id::MEMORY, vec_of(vec![vec![0x00, 0x01]]));
    let data = section(
        section_id::DATA,
        vec_of(vec![data_segment(0, &[0x41, 0x03, 0x0B], &[0xAA, 0xBB])]),
    );
    let (m, ctx) = decode(module(vec![mems, data]))?;

    let memory = ctx.store.memory(m.symbol_table.memory_address().unwrap());
    assert_eq!(memory.load_i32_8(2), 0);
    assert_eq!(memory.load_i32_8(3), 0xAA);
    assert_eq!(memory.load_i32_8(4), 0xBB);
    Ok(())
}

#[test]
fn bare_end_offset_expression_writes_at_zero() -> anyhow::Result<()> {
    let mems = section(section_id::MEMORY, vec_of(vec![vec![0x00, 0x01]]));
    let data = section(
        section_id::DATA,
        vec_of(vec![data_segment(0, &[0x0B], &[0x11])]),
    );
    let (m, ctx) = decode(module(vec![mems, data]))?;
    let memory = ctx.store.memory(m.symbol_table.memory_address().unwrap());
    assert_eq!(memory.load_i32_8(0), 0x11);
    Ok(())
}

#[test]
fn global_offset_data_segment_is_unsupported() {
    let imports = section(
        section_id::IMPORT,
        vec_of(vec![{
            let mut i = name("env");
            i.extend(name("off"));
            i.extend([0x03, 0x7F, 0x00]);
            i
        }]),
    );
    let mems = section(section_id::MEMORY, vec_of(vec![vec![0x00, 0x01]]));
    let data = section(
        section_id::DATA,
        vec_of(vec![data_segment(0, &[0x23, 0x00, 0x0B], &[0x11])]),
    );
    let err = decode_err(module(vec![imports, mems, data]));
    assert!(matches!(
        err.kind,
        DecodeErrorKind::Linker(LinkerError::DataOffsetGlobalGet)
    ));
}

#[test]
fn data_segment_beyond_the_memory_is_fatal() {
    let mems = section(section_id::MEMORY, vec_of(vec![vec![0x00, 0x01]]));
    let mut offset_expr = vec![0x41];
    offset_expr.extend(signed_leb(65530));
    offset_expr.push(0x0B);
    let data = section(
        section_id::DATA,
        vec_of(vec![data_segment(0, &offset_expr, &[0u8; 10])]),
    );
    let err = decode_err(module(vec![mems, data]));
    assert!(matches!(
        err.kind,
        DecodeErrorKind::Linker(LinkerError::DataSegmentOutOfBounds {
            offset: 65530,
            length: 10,
            ..
        })
    ));
}

#[test]
fn negative_data_offset_is_fatal() {
    let mems = section(section_id::MEMORY, vec_of(vec![vec![0x00, 0x01]]));
    let mut offset_expr = vec![0x41];
    offset_expr.extend(signed_leb(-1));
    offset_expr.push(0x0B);
    let data = section(
        section_id::DATA,
        vec_of(vec![data_segment(0, &offset_expr, &[0x11])]),
    );
    let err = decode_err(module(vec![mems, data]));
    assert!(matches!(
        err.kind,
        DecodeErrorKind::Linker(LinkerError::DataSegmentOutOfBounds { offset: -1, .. })
    ));
}

#[test]
fn data_segment_without_a_memory_is_fatal() {
    let data = section(
        section_id::DATA,
        vec_of(vec![data_segment(0, &[0x41, 0x00, 0x0B], &[0x11])]),
    );
    let err = decode_err(module(vec![data]));
    assert!(matches!(err.kind, DecodeErrorKind::NoMemory));
}

#[test]
fn data_memory_index_must_be_zero() {
    let mems = section(section_id::MEMORY, vec_of(vec![vec![0x00, 0x01]]));
    let data = section(
        section_id::DATA,
        vec_of(vec![data_segment(1, &[0x41, 0x00, 0x0B], &[0x11])]),
    );
    let err = decode_err(module(vec![mems, data]));
    assert!(matches!(err.kind, DecodeErrorKind::InvalidMemoryIndex(1)));
}
