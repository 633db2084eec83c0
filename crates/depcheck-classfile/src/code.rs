use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};

const INVOKEVIRTUAL: u8 = 0xb6;
const INVOKESPECIAL: u8 = 0xb7;
const INVOKESTATIC: u8 = 0xb8;
const INVOKEINTERFACE: u8 = 0xb9;
const INVOKEDYNAMIC: u8 = 0xba;
const TABLESWITCH: u8 = 0xaa;
const LOOKUPSWITCH: u8 = 0xab;
const WIDE: u8 = 0xc4;
const IINC: u8 = 0x84;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

/// A single `invoke*` instruction with its method reference resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInvocation {
    pub kind: InvokeKind,
    /// Internal name of the referenced class; may be an array descriptor
    /// (`[Ljava/lang/Object;`) for calls such as `clone()` on arrays.
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

/// Walks the instructions of a `Code` attribute and collects every
/// statically-linked method invocation. `invokedynamic` call sites are
/// skipped: they reference bootstrap methods, not a named owner.
pub(crate) fn scan_invocations(code: &[u8], cp: &ConstantPool) -> Result<Vec<MethodInvocation>> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    while offset < code.len() {
        let opcode = code[offset];
        let length = instruction_length(code, offset)?;
        if offset + length > code.len() {
            return Err(Error::MalformedCode("instruction runs past end of code"));
        }

        let kind = match opcode {
            INVOKEVIRTUAL => Some(InvokeKind::Virtual),
            INVOKESPECIAL => Some(InvokeKind::Special),
            INVOKESTATIC => Some(InvokeKind::Static),
            INVOKEINTERFACE => Some(InvokeKind::Interface),
            _ => None,
        };
        if let Some(kind) = kind {
            let index = read_u16(code, offset + 1)?;
            let method = cp.get_method_ref(index)?;
            out.push(MethodInvocation {
                kind,
                owner: method.owner,
                name: method.name,
                descriptor: method.descriptor,
            });
        }

        offset += length;
    }
    Ok(out)
}

fn instruction_length(code: &[u8], offset: usize) -> Result<usize> {
    let opcode = code[offset];
    let length = match opcode {
        0x00..=0x0f => 1,
        0x10 => 2,
        0x11 => 3,
        0x12 => 2,
        0x13 | 0x14 => 3,
        0x15..=0x19 => 2,
        0x1a..=0x35 => 1,
        0x36..=0x3a => 2,
        0x3b..=0x83 => 1,
        IINC => 3,
        0x85..=0x98 => 1,
        0x99..=0xa8 => 3,
        0xa9 => 2,
        TABLESWITCH => tableswitch_length(code, offset)?,
        LOOKUPSWITCH => lookupswitch_length(code, offset)?,
        0xac..=0xb1 => 1,
        0xb2..=0xb5 => 3,
        INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC => 3,
        INVOKEINTERFACE | INVOKEDYNAMIC => 5,
        0xbb => 3,
        0xbc => 2,
        0xbd => 3,
        0xbe | 0xbf => 1,
        0xc0 | 0xc1 => 3,
        0xc2 | 0xc3 => 1,
        WIDE => match code.get(offset + 1) {
            Some(&IINC) => 6,
            Some(_) => 4,
            None => return Err(Error::MalformedCode("truncated wide instruction")),
        },
        0xc5 => 4,
        0xc6 | 0xc7 => 3,
        0xc8 | 0xc9 => 5,
        0xca | 0xfe | 0xff => 1,
        _ => return Err(Error::InvalidOpcode { opcode, offset }),
    };
    Ok(length)
}

/// Switch operands are aligned to a 4-byte boundary relative to the code start.
fn padding(offset: usize) -> usize {
    (4 - ((offset + 1) % 4)) % 4
}

fn tableswitch_length(code: &[u8], offset: usize) -> Result<usize> {
    let padding = padding(offset);
    let base = offset + 1 + padding;
    let low = read_i32(code, base + 4)?;
    let high = read_i32(code, base + 8)?;
    let count = i64::from(high) - i64::from(low) + 1;
    if count < 0 {
        return Err(Error::MalformedCode("invalid tableswitch range"));
    }
    Ok(1 + padding + 12 + (count as usize) * 4)
}

fn lookupswitch_length(code: &[u8], offset: usize) -> Result<usize> {
    let padding = padding(offset);
    let base = offset + 1 + padding;
    let npairs = read_i32(code, base + 4)?;
    if npairs < 0 {
        return Err(Error::MalformedCode("invalid lookupswitch pair count"));
    }
    Ok(1 + padding + 8 + (npairs as usize) * 8)
}

fn read_u16(code: &[u8], offset: usize) -> Result<u16> {
    let bytes = code
        .get(offset..offset + 2)
        .ok_or(Error::MalformedCode("operand out of bounds"))?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_i32(code: &[u8], offset: usize) -> Result<i32> {
    let bytes = code
        .get(offset..offset + 4)
        .ok_or(Error::MalformedCode("operand out of bounds"))?;
    Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_lengths_account_for_alignment() {
        // tableswitch at offset 0: 3 padding bytes, default, low=0, high=1, 2 targets.
        let mut code = vec![TABLESWITCH, 0, 0, 0];
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&[0; 8]);
        assert_eq!(instruction_length(&code, 0).unwrap(), code.len());

        // lookupswitch at offset 3: no padding, default, npairs=1.
        let mut code = vec![0x00, 0x00, 0x00, LOOKUPSWITCH];
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&[0; 8]);
        assert_eq!(instruction_length(&code, 3).unwrap(), code.len() - 3);
    }

    #[test]
    fn wide_and_unknown_opcodes() {
        assert_eq!(instruction_length(&[WIDE, IINC, 0, 1, 0, 1], 0).unwrap(), 6);
        assert_eq!(instruction_length(&[WIDE, 0x15, 0, 1], 0).unwrap(), 4);
        assert_eq!(
            instruction_length(&[0xcb], 0),
            Err(Error::InvalidOpcode {
                opcode: 0xcb,
                offset: 0
            })
        );
    }
}
