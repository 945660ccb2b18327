//! Binary value codec shared by the compiler, decompiler and constant table.

use num_bigint::BigUint;
use smallvec::SmallVec;

use crate::error::{GuardError, GuardResult};
use crate::value::{ADDRESS_LEN, Address, GuardValue, ValueType};

pub mod integer;
pub mod magic;

/// A small, stack-allocated-first buffer used by the encoder.
///
/// Backed by `smallvec`, this stores up to 32 bytes inline before spilling
/// to the heap.
pub type DynBuf = SmallVec<[u8; 32]>;

/// Consume exactly `n` bytes from the front of `input`.
pub(crate) fn take<'a>(input: &mut &'a [u8], n: usize) -> GuardResult<&'a [u8]> {
    if input.len() < n {
        return Err(GuardError::Truncated {
            expected: n,
            remaining: input.len(),
        });
    }
    let (head, rest) = input.split_at(n);
    *input = rest;
    Ok(head)
}

pub(crate) fn take_byte(input: &mut &[u8]) -> GuardResult<u8> {
    Ok(take(input, 1)?[0])
}

fn take_len(input: &mut &[u8]) -> GuardResult<usize> {
    let len = integer::decode_u64(input)
        .ok_or(GuardError::MalformedValue("truncated or overlong varint"))?;
    usize::try_from(len).map_err(|_| GuardError::MalformedValue("length prefix too large"))
}

/// Encode a [`ValueType`] as its wire tag sequence (container tags followed
/// by their element tags).
pub fn encode_type(ty: &ValueType, buf: &mut DynBuf) {
    match ty {
        ValueType::Bool => buf.push(magic::T_BOOL),
        ValueType::Address => buf.push(magic::T_ADDRESS),
        ValueType::U8 => buf.push(magic::T_U8),
        ValueType::U64 => buf.push(magic::T_U64),
        ValueType::U128 => buf.push(magic::T_U128),
        ValueType::U256 => buf.push(magic::T_U256),
        ValueType::String => buf.push(magic::T_STRING),
        ValueType::Vector(elem) => {
            buf.push(magic::T_VECTOR);
            encode_type(elem, buf);
        }
        ValueType::Option(elem) => {
            buf.push(magic::T_OPTION);
            encode_type(elem, buf);
        }
    }
}

/// Decode a [`ValueType`] from the front of `input`.
pub fn decode_type(input: &mut &[u8]) -> GuardResult<ValueType> {
    let tag = take_byte(input)?;
    match tag {
        magic::T_BOOL => Ok(ValueType::Bool),
        magic::T_ADDRESS => Ok(ValueType::Address),
        magic::T_U8 => Ok(ValueType::U8),
        magic::T_U64 => Ok(ValueType::U64),
        magic::T_U128 => Ok(ValueType::U128),
        magic::T_U256 => Ok(ValueType::U256),
        magic::T_STRING => Ok(ValueType::String),
        magic::T_VECTOR => Ok(ValueType::Vector(Box::new(decode_type(input)?))),
        magic::T_OPTION => Ok(ValueType::Option(Box::new(decode_type(input)?))),
        other => Err(GuardError::UnknownTypeTag(other)),
    }
}

/// Encode a literal value, without its leading type tags.
///
/// The value is validated first: a `U256` above `2^256 - 1` or a container
/// whose payload disagrees with its declared element type is rejected.
pub fn encode_value(value: &GuardValue, buf: &mut DynBuf) -> GuardResult<()> {
    if !value.verify() {
        return Err(GuardError::ValueOutOfRange(value.value_type()));
    }
    encode_value_unchecked(value, buf);
    Ok(())
}

fn encode_value_unchecked(value: &GuardValue, buf: &mut DynBuf) {
    match value {
        GuardValue::Bool(b) => buf.push(*b as u8),
        GuardValue::Address(addr) => buf.extend_from_slice(addr.as_bytes()),
        GuardValue::U8(v) => buf.push(*v),
        GuardValue::U64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        GuardValue::U128(v) => buf.extend_from_slice(&v.to_le_bytes()),
        GuardValue::U256(v) => {
            let bytes = v.to_bytes_le();
            buf.extend_from_slice(&bytes);
            buf.extend(std::iter::repeat_n(0u8, 32 - bytes.len()));
        }
        GuardValue::String(s) => {
            integer::encode_u64(s.len() as u64, buf);
            buf.extend_from_slice(s.as_bytes());
        }
        GuardValue::Vector(_, items) => {
            integer::encode_u64(items.len() as u64, buf);
            for item in items {
                encode_value_unchecked(item, buf);
            }
        }
        GuardValue::Option(_, inner) => match inner {
            None => buf.push(magic::OPT_NONE),
            Some(item) => {
                buf.push(magic::OPT_SOME);
                encode_value_unchecked(item, buf);
            }
        },
    }
}

/// Decode a literal value of the given declared type from the front of
/// `input`.
pub fn decode_value(ty: &ValueType, input: &mut &[u8]) -> GuardResult<GuardValue> {
    match ty {
        ValueType::Bool => match take_byte(input)? {
            0 => Ok(GuardValue::Bool(false)),
            1 => Ok(GuardValue::Bool(true)),
            _ => Err(GuardError::MalformedValue("boolean byte must be 0 or 1")),
        },
        ValueType::Address => {
            let bytes = take(input, ADDRESS_LEN)?;
            let mut raw = [0u8; ADDRESS_LEN];
            raw.copy_from_slice(bytes);
            Ok(GuardValue::Address(Address::new(raw)))
        }
        ValueType::U8 => Ok(GuardValue::U8(take_byte(input)?)),
        ValueType::U64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(take(input, 8)?);
            Ok(GuardValue::U64(u64::from_le_bytes(raw)))
        }
        ValueType::U128 => {
            let mut raw = [0u8; 16];
            raw.copy_from_slice(take(input, 16)?);
            Ok(GuardValue::U128(u128::from_le_bytes(raw)))
        }
        ValueType::U256 => {
            let bytes = take(input, 32)?;
            Ok(GuardValue::U256(BigUint::from_bytes_le(bytes)))
        }
        ValueType::String => {
            let len = take_len(input)?;
            let bytes = take(input, len)?;
            let text = std::str::from_utf8(bytes)
                .map_err(|_| GuardError::MalformedValue("string is not valid UTF-8"))?;
            Ok(GuardValue::String(text.to_owned()))
        }
        ValueType::Vector(elem) => {
            let count = take_len(input)?;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(decode_value(elem, input)?);
            }
            Ok(GuardValue::Vector((**elem).clone(), items))
        }
        ValueType::Option(elem) => match take_byte(input)? {
            magic::OPT_NONE => Ok(GuardValue::Option((**elem).clone(), None)),
            magic::OPT_SOME => {
                let inner = decode_value(elem, input)?;
                Ok(GuardValue::Option((**elem).clone(), Some(Box::new(inner))))
            }
            _ => Err(GuardError::MalformedValue("option presence byte invalid")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: GuardValue) {
        let ty = value.value_type();
        let mut buf = DynBuf::new();
        encode_value(&value, &mut buf).unwrap();
        let mut input: &[u8] = &buf;
        let decoded = decode_value(&ty, &mut input).unwrap();
        assert_eq!(decoded, value);
        assert!(input.is_empty(), "value {value:?} not fully consumed");
    }

    #[test]
    fn scalar_roundtrips() {
        roundtrip(GuardValue::Bool(true));
        roundtrip(GuardValue::U8(0xFF));
        roundtrip(GuardValue::U64(u64::MAX - 1));
        roundtrip(GuardValue::U128(u128::MAX));
        roundtrip(GuardValue::U256(BigUint::from(7u8) << 250));
        roundtrip(GuardValue::Address(Address::new([0x11; 32])));
        roundtrip(GuardValue::String("rotation key".to_owned()));
    }

    #[test]
    fn container_roundtrips() {
        roundtrip(GuardValue::Vector(
            ValueType::U64,
            vec![GuardValue::U64(1), GuardValue::U64(2), GuardValue::U64(3)],
        ));
        roundtrip(GuardValue::Vector(ValueType::String, vec![]));
        roundtrip(GuardValue::Option(ValueType::Address, None));
        roundtrip(GuardValue::Option(
            ValueType::U8,
            Some(Box::new(GuardValue::U8(9))),
        ));
        roundtrip(GuardValue::Vector(
            ValueType::Option(Box::new(ValueType::Bool)),
            vec![GuardValue::Option(
                ValueType::Bool,
                Some(Box::new(GuardValue::Bool(false))),
            )],
        ));
    }

    #[test]
    fn type_tag_roundtrips() {
        let tys = [
            ValueType::Bool,
            ValueType::U256,
            ValueType::Vector(Box::new(ValueType::Option(Box::new(ValueType::String)))),
        ];
        for ty in tys {
            let mut buf = DynBuf::new();
            encode_type(&ty, &mut buf);
            let mut input: &[u8] = &buf;
            assert_eq!(decode_type(&mut input).unwrap(), ty);
            assert!(input.is_empty());
        }
    }

    #[test]
    fn fixed_widths_match_wire_contract() {
        for (value, width) in [
            (GuardValue::Bool(true), 1),
            (GuardValue::U8(3), 1),
            (GuardValue::U64(3), 8),
            (GuardValue::U128(3), 16),
            (GuardValue::U256(BigUint::from(3u8)), 32),
            (GuardValue::Address(Address::new([0; 32])), 32),
        ] {
            let mut buf = DynBuf::new();
            encode_value(&value, &mut buf).unwrap();
            assert_eq!(buf.len(), width, "width of {value:?}");
        }
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut input: &[u8] = &[0x01, 0x02];
        let err = decode_value(&ValueType::U64, &mut input).unwrap_err();
        assert!(matches!(err, GuardError::Truncated { expected: 8, .. }));
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let mut buf = DynBuf::new();
        integer::encode_u64(2, &mut buf);
        buf.extend_from_slice(&[0xFF, 0xFE]);
        let mut input: &[u8] = &buf;
        assert!(decode_value(&ValueType::String, &mut input).is_err());
    }

    #[test]
    fn oversized_u256_rejected_on_encode() {
        let value = GuardValue::U256(BigUint::from(1u8) << 256);
        let mut buf = DynBuf::new();
        assert!(matches!(
            encode_value(&value, &mut buf),
            Err(GuardError::ValueOutOfRange(ValueType::U256))
        ));
    }

    #[test]
    fn unknown_type_tag_rejected() {
        let mut input: &[u8] = &[0x7E];
        assert!(matches!(
            decode_type(&mut input),
            Err(GuardError::UnknownTypeTag(0x7E))
        ));
    }
}
