//! The reset procedures: re-scanning the retained buffer to restore global
//! and memory state between runs.

use {
    tests_integration::{
        decode, decode_with, module, name, section, section_id, signed_leb, unsigned_leb, vec_of,
        DecodeErrorKind,
    },
    wasmite_format::{reset_global_state, reset_memory_state},
    wasmite_runtime::{
        context::WasmContext,
        error::LinkerError,
        types::{GlobalMutability, ValueType},
    },
};

#[test]
fn reset_restores_initial_global_values() -> anyhow::Result<()> {
    let mut init = vec![0x41];
    init.extend(signed_leb(7));
    init.push(0x0B);
    let mut entry = vec![0x7F, 0x01];
    entry.extend(init);
    let globals = section(section_id::GLOBAL, vec_of(vec![entry]));
    let (mut m, mut ctx) = decode(module(vec![globals]))?;

    let address = m.symbol_table.global_address(0).unwrap();
    assert_eq!(ctx.globals.load_as_long(address), 7);

    ctx.globals.store_long(address, 99);
    reset_global_state(&mut m, &mut ctx)?;
    assert_eq!(ctx.globals.load_as_long(address), 7);
    Ok(())
}

#[test]
fn reset_recopies_resolved_import_dependencies() -> anyhow::Result<()> {
    let mut ctx = WasmContext::new();
    ctx.linker.register_global_export(
        &mut ctx.globals,
        "env".into(),
        "g".into(),
        ValueType::I32,
        GlobalMutability::Const,
        5,
    );

    let imports = section(
        section_id::IMPORT,
        vec_of(vec![{
            let mut i = name("env");
            i.extend(name("g"));
            i.extend([0x03, 0x7F, 0x00]);
            i
        }]),
    );
    let globals = section(
        section_id::GLOBAL,
        vec_of(vec![vec![0x7F, 0x00, 0x23, 0x00, 0x0B]]),
    );
    let mut m = decode_with(module(vec![imports, globals]), &mut ctx)?;

    let dependent_address = m.symbol_table.global_address(1).unwrap();
    assert_eq!(ctx.globals.load_as_long(dependent_address), 5);

    ctx.globals.store_long(dependent_address, 99);
    reset_global_state(&mut m, &mut ctx)?;
    assert_eq!(ctx.globals.load_as_long(dependent_address), 5);
    Ok(())
}

#[test]
fn reset_rejects_mutable_imported_globals() -> anyhow::Result<()> {
    let imports = section(
        section_id::IMPORT,
        vec_of(vec![{
            let mut i = name("env");
            i.extend(name("m"));
            i.extend([0x03, 0x7F, 0x01]);
            i
        }]),
    );
    let (mut m, mut ctx) = decode(module(vec![imports]))?;

    let err = reset_global_state(&mut m, &mut ctx).expect_err("expected the reset to fail");
    assert!(matches!(
        err.kind,
        DecodeErrorKind::Linker(LinkerError::ResetMutableImport)
    ));
    Ok(())
}

#[test]
fn reset_reapplies_data_segments() -> anyhow::Result<()> {
    let mems = section(section_id::MEMORY, vec_of(vec![vec![0x00, 0x01]]));
    let data = section(section_id::DATA, {
        let mut segment = unsigned_leb(0);
        segment.extend([0x41, 0x00, 0x0B]);
        segment.extend(unsigned_leb(1));
        segment.push(0xAA);
        vec_of(vec![segment])
    });
    let (mut m, mut ctx) = decode(module(vec![mems, data]))?;
    let address = m.symbol_table.memory_address().unwrap();

    ctx.store.memory_mut(address).store_i32_8(0, 0x55);
    ctx.store.memory_mut(address).store_i32_8(10, 0x77);

    // Without zeroing, only the segment range is rewritten.
    reset_memory_state(&mut m, &mut ctx, false)?;
    assert_eq!(ctx.store.memory(address).load_i32_8(0), 0xAA);
    assert_eq!(ctx.store.memory(address).load_i32_8(10), 0x77);

    // Zeroing clears the stray byte before the segment is re-applied.
    reset_memory_state(&mut m, &mut ctx, true)?;
    assert_eq!(ctx.store.memory(address).load_i32_8(0), 0xAA);
    assert_eq!(ctx.store.memory(address).load_i32_8(10), 0x00);
    Ok(())
}

#[test]
fn reset_walks_past_custom_sections() -> anyhow::Result<()> {
    let custom = section(0, vec![0x01, b'x', 0xFE]);
    let mut entry = vec![0x7F, 0x00, 0x41];
    entry.extend(signed_leb(3));
    entry.push(0x0B);
    let globals = section(section_id::GLOBAL, vec_of(vec![entry]));
    let (mut m, mut ctx) = decode(module(vec![custom.clone(), globals, custom]))?;

    let address = m.symbol_table.global_address(0).unwrap();
    ctx.globals.store_long(address, -1);
    reset_global_state(&mut m, &mut ctx)?;
    assert_eq!(ctx.globals.load_as_long(address), 3);
    Ok(())
}
