//! The global section and the two-phase initialization protocol.

use {
    tests_integration::{
        decode, decode_err, decode_with, module, name, section, section_id, signed_leb, vec_of,
        DecodeErrorKind,
    },
    wasmite_runtime::{
        context::WasmContext,
        error::LinkerError,
        types::{GlobalMutability, GlobalResolution, ValueType},
    },
};

fn global_entry(value_type: u8, mutability: u8, init: &[u8]) -> Vec<u8> {
    let mut out = vec![value_type, mutability];
    out.extend(init);
    out.push(0x0B);
    out
}

fn global_import(module_name: &str, member_name: &str, value_type: u8, mutability: u8) -> Vec<u8> {
    let mut out = name(module_name);
    out.extend(name(member_name));
    out.push(0x03);
    out.push(value_type);
    out.push(mutability);
    out
}

#[test]
fn numeric_initializers_store_signextended_payloads() -> anyhow::Result<()> {
    let mut i32_init = vec![0x41];
    i32_init.extend(signed_leb(-5));
    let mut i64_init = vec![0x42];
    i64_init.extend(signed_leb(1_234_567_890_123));
    let mut f32_init = vec![0x43];
    f32_init.extend((-0.0f32).to_bits().to_le_bytes());
    let mut f64_init = vec![0x44];
    f64_init.extend(2.5f64.to_bits().to_le_bytes());

    let globals = section(
        section_id::GLOBAL,
        vec_of(vec![
            global_entry(0x7F, 0x00, &i32_init),
            global_entry(0x7E, 0x00, &i64_init),
            global_entry(0x7D, 0x00, &f32_init),
            global_entry(0x7C, 0x00, &f64_init),
        ]),
    );
    let (m, ctx) = decode(module(vec![globals]))?;
    let st = &m.symbol_table;

    assert_eq!(st.global_count(), 4);
    assert_eq!(st.max_global_index(), Some(3));
    let load = |i: u32| ctx.globals.load_as_long(st.global_address(i).unwrap());
    assert_eq!(load(0), -5);
    assert_eq!(load(1), 1_234_567_890_123);
    // The raw f32 bit pattern is widened with sign extension.
    assert_eq!(load(2), (-0.0f32).to_bits() as i32 as i64);
    assert_eq!(load(3), 2.5f64.to_bits() as i64);

    assert_eq!(st.global_value_type(0), Some(ValueType::I32));
    assert_eq!(st.global_mutability(0), Some(GlobalMutability::Const));
    assert_eq!(st.global_resolution(0), Some(GlobalResolution::Declared));
    Ok(())
}

#[test]
fn unresolved_import_parks_the_dependent_global() -> anyhow::Result<()> {
    let imports = section(
        section_id::IMPORT,
        vec_of(vec![global_import("env", "g", 0x7F, 0x00)]),
    );
    let globals = section(
        section_id::GLOBAL,
        vec_of(vec![global_entry(0x7F, 0x00, &[0x23, 0x00])]),
    );
    let (m, ctx) = decode(module(vec![imports, globals]))?;
    let st = &m.symbol_table;

    assert_eq!(
        st.global_resolution(0),
        Some(GlobalResolution::ImportedUnresolved)
    );
    assert_eq!(st.global_resolution(1), Some(GlobalResolution::UnresolvedGet));
    assert_eq!(st.unresolved_global_backref(1), Some(0));
    // The slot stays zero until the linker resumes it.
    assert_eq!(ctx.globals.load_as_long(st.global_address(1).unwrap()), 0);
    assert_eq!(ctx.linker.pending_global_imports().len(), 1);
    assert_eq!(ctx.linker.pending_global_imports()[0].member_name, "g");
    Ok(())
}

#[test]
fn resolved_import_is_copied_at_decode_time() -> anyhow::Result<()> {
    let mut ctx = WasmContext::new();
    let export_address = ctx.linker.register_global_export(
        &mut ctx.globals,
        "env".into(),
        "g".into(),
        ValueType::I32,
        GlobalMutability::Const,
        123,
    );

    let imports = section(
        section_id::IMPORT,
        vec_of(vec![global_import("env", "g", 0x7F, 0x00)]),
    );
    let globals = section(
        section_id::GLOBAL,
        vec_of(vec![global_entry(0x7F, 0x00, &[0x23, 0x00])]),
    );
    let m = decode_with(module(vec![imports, globals]), &mut ctx)?;
    let st = &m.symbol_table;

    // The import aliases the exporter's slot.
    assert_eq!(
        st.global_resolution(0),
        Some(GlobalResolution::ImportedResolved)
    );
    assert_eq!(st.global_address(0), Some(export_address));

    // The dependent global resolved immediately, into its own slot.
    assert_eq!(st.global_resolution(1), Some(GlobalResolution::Declared));
    let dependent_address = st.global_address(1).unwrap();
    assert_ne!(dependent_address, export_address);
    assert_eq!(ctx.globals.load_as_long(dependent_address), 123);
    assert_eq!(st.unresolved_global_backref(1), None);
    Ok(())
}

#[test]
fn resolved_import_initializer_types_must_match() {
    let mut ctx = WasmContext::new();
    ctx.linker.register_global_export(
        &mut ctx.globals,
        "env".into(),
        "g".into(),
        ValueType::I64,
        GlobalMutability::Const,
        7,
    );

    let imports = section(
        section_id::IMPORT,
        vec_of(vec![global_import("env", "g", 0x7E, 0x00)]),
    );
    // Declared as i32, initialized from an i64 import.
    let globals = section(
        section_id::GLOBAL,
        vec_of(vec![global_entry(0x7F, 0x00, &[0x23, 0x00])]),
    );
    let err = decode_with(module(vec![imports, globals]), &mut ctx)
        .expect_err("expected a type mismatch");
    assert!(matches!(
        err.kind,
        DecodeErrorKind::Linker(LinkerError::GlobalTypeMismatch {
            declared: 0x7F,
            actual: 0x7E,
        })
    ));
}

#[test]
fn initializer_may_only_read_imported_globals() {
    let globals = section(
        section_id::GLOBAL,
        vec_of(vec![
            global_entry(0x7F, 0x00, &[0x41, 0x00]),
            global_entry(0x7F, 0x00, &[0x23, 0x00]),
        ]),
    );
    let err = decode_err(module(vec![globals]));
    assert!(matches!(err.kind, DecodeErrorKind::GlobalInitNotImported(1)));
}

#[test]
fn non_constant_initializer_instruction_is_fatal() {
    let globals = section(
        section_id::GLOBAL,
        vec_of(vec![global_entry(0x7F, 0x00, &[0x6A])]),
    );
    let err = decode_err(module(vec![globals]));
    assert!(matches!(
        err.kind,
        DecodeErrorKind::InvalidGlobalInitializer(0x6A)
    ));
}

#[test]
fn initializer_must_end_with_end() {
    // Two constants in a row: the second appears where END belongs.
    let globals = section(
        section_id::GLOBAL,
        vec_of(vec![vec![0x7F, 0x00, 0x41, 0x00, 0x41, 0x00, 0x0B]]),
    );
    let err = decode_err(module(vec![globals]));
    assert!(matches!(err.kind, DecodeErrorKind::MissingEnd));
}

#[test]
fn imports_after_globals_are_rejected() {
    let globals = section(
        section_id::GLOBAL,
        vec_of(vec![global_entry(0x7F, 0x00, &[0x41, 0x00])]),
    );
    let imports = section(
        section_id::IMPORT,
        vec_of(vec![global_import("env", "g", 0x7F, 0x00)]),
    );
    let err = decode_err(module(vec![globals, imports]));
    assert!(matches!(err.kind, DecodeErrorKind::ImportsAfterGlobals));
}
