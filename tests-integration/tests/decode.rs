//! The module preamble, section framing, and the exact-consumption rule.

use tests_integration::{decode, decode_err, module, section, section_id, DecodeErrorKind, PREAMBLE};

#[test]
fn empty_module_decodes_to_empty_symbol_table() -> anyhow::Result<()> {
    let (m, _ctx) = decode(PREAMBLE.to_vec())?;
    let st = &m.symbol_table;
    assert_eq!(st.function_count(), 0);
    assert_eq!(st.global_count(), 0);
    assert_eq!(st.table_count(), 0);
    assert_eq!(st.memory_count(), 0);
    assert_eq!(st.start_function_index(), None);
    assert_eq!(st.export_count(), 0);
    Ok(())
}

#[test]
fn invalid_magic_is_rejected() {
    let err = decode_err(vec![0x01, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]);
    assert!(matches!(err.kind, DecodeErrorKind::InvalidMagic(_)));
}

#[test]
fn invalid_version_is_rejected() {
    let err = decode_err(vec![0x00, 0x61, 0x73, 0x6D, 0x02, 0x00, 0x00, 0x00]);
    assert!(matches!(err.kind, DecodeErrorKind::InvalidVersion(2)));
}

#[test]
fn truncated_preamble_is_rejected() {
    let err = decode_err(PREAMBLE[..6].to_vec());
    assert!(matches!(err.kind, DecodeErrorKind::UnexpectedEnd));
}

#[test]
fn unknown_section_id_is_fatal() {
    let err = decode_err(module(vec![section(12, vec![])]));
    assert!(matches!(err.kind, DecodeErrorKind::InvalidSectionId(12)));
}

#[test]
fn section_consuming_fewer_bytes_than_declared_is_fatal() {
    // A type section declaring 5 bytes whose content is 4 bytes long.
    let mut bytes = PREAMBLE.to_vec();
    bytes.extend([0x01, 0x05, 0x01, 0x60, 0x00, 0x00]);
    let err = decode_err(bytes);
    assert!(matches!(
        err.kind,
        DecodeErrorKind::SectionSizeMismatch {
            section: 1,
            declared: 5,
            consumed: 4,
        }
    ));
}

#[test]
fn section_consuming_more_bytes_than_declared_is_fatal() {
    let mut bytes = PREAMBLE.to_vec();
    bytes.extend([0x01, 0x03, 0x01, 0x60, 0x00, 0x00]);
    let err = decode_err(bytes);
    assert!(matches!(
        err.kind,
        DecodeErrorKind::SectionSizeMismatch {
            declared: 3,
            consumed: 4,
            ..
        }
    ));
}

#[test]
fn truncated_section_header_is_fatal() {
    let mut bytes = PREAMBLE.to_vec();
    bytes.push(section_id::TYPE);
    let err = decode_err(bytes);
    assert!(matches!(err.kind, DecodeErrorKind::UnexpectedEnd));
}

#[test]
fn custom_sections_are_skipped_wherever_they_appear() -> anyhow::Result<()> {
    let custom = section(0, vec![0x02, b'h', b'i', 0xFF, 0x00]);
    let types = section(section_id::TYPE, vec![0x01, 0x60, 0x00, 0x00]);
    let (m, _ctx) = decode(module(vec![custom.clone(), types, custom]))?;
    assert_eq!(m.symbol_table.function_type_argument_count(0), Some(0));
    Ok(())
}
