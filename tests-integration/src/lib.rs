//! Helpers for assembling binary modules by hand in tests.

use wasmite_runtime::{context::WasmContext, module::WasmModule};

pub use wasmite_format::{DecodeError, DecodeErrorKind};

pub const PREAMBLE: [u8; 8] = [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];

pub mod section_id {
    pub const TYPE: u8 = 1;
    pub const IMPORT: u8 = 2;
    pub const FUNCTION: u8 = 3;
    pub const TABLE: u8 = 4;
    pub const MEMORY: u8 = 5;
    pub const GLOBAL: u8 = 6;
    pub const EXPORT: u8 = 7;
    pub const START: u8 = 8;
    pub const ELEMENT: u8 = 9;
    pub const CODE: u8 = 10;
    pub const DATA: u8 = 11;
}

pub fn unsigned_leb(mut value: u32) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            return out;
        }
    }
}

pub fn signed_leb(mut value: i64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        let sign_clear = byte & 0x40 == 0;
        if (value == 0 && sign_clear) || (value == -1 && !sign_clear) {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

pub fn name(s: &str) -> Vec<u8> {
    let mut out = unsigned_leb(s.len() as u32);
    out.extend(s.as_bytes());
    out
}

pub fn section(id: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut out = vec![id];
    out.extend(unsigned_leb(payload.len() as u32));
    out.extend(payload);
    out
}

pub fn module(sections: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = PREAMBLE.to_vec();
    for s in sections {
        out.extend(s);
    }
    out
}

/// A function type with value-type tag bytes for parameters and an optional
/// single result, in the `0x01 <type>` / `0x00` result-vector shapes.
pub fn func_type(params: &[u8], result: Option<u8>) -> Vec<u8> {
    let mut out = vec![0x60];
    out.extend(unsigned_leb(params.len() as u32));
    out.extend(params);
    match result {
        Some(t) => {
            out.push(0x01);
            out.push(t);
        }
        None => out.push(0x00),
    }
    out
}

/// A code entry wrapped with its declared byte size: locals groups as
/// `(count, type)` pairs, then the body instructions (including the final
/// `END`).
pub fn code_entry(local_groups: &[(u32, u8)], body: &[u8]) -> Vec<u8> {
    let mut payload = unsigned_leb(local_groups.len() as u32);
    for (count, ty) in local_groups {
        payload.extend(unsigned_leb(*count));
        payload.push(*ty);
    }
    payload.extend(body);
    let mut out = unsigned_leb(payload.len() as u32);
    out.extend(payload);
    out
}

/// A `vec(...)`: count prefix plus the concatenated items.
pub fn vec_of(items: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = unsigned_leb(items.len() as u32);
    for item in items {
        out.extend(item);
    }
    out
}

pub fn decode(bytes: Vec<u8>) -> Result<(WasmModule, WasmContext), DecodeError> {
    let mut ctx = WasmContext::new();
    let module = decode_with(bytes, &mut ctx)?;
    Ok((module, ctx))
}

pub fn decode_with(bytes: Vec<u8>, ctx: &mut WasmContext) -> Result<WasmModule, DecodeError> {
    let mut module = WasmModule::new(bytes);
    wasmite_format::read_module(&mut module, ctx)?;
    Ok(module)
}

pub fn decode_err(bytes: Vec<u8>) -> DecodeError {
    match decode(bytes) {
        Ok(_) => panic!("expected the decode to fail"),
        Err(e) => e,
    }
}
