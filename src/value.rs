//! Parsing of scalar command line tokens into values ready for a Modbus request.

use crate::error::{Error, Result};

/// Parse a coil token. Accepts `true`/`false`, `1`/`0` and `on`/`off` in any case.
pub fn parse_coil(token: &str) -> Result<bool> {
    match token.trim().to_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        _ => Err(Error::validation(format!(
            "Invalid coil value: '{token}'. Use true/false, 1/0, or on/off"
        ))),
    }
}

/// Parse a register token, either decimal (sign allowed) or hex with a `0x` prefix.
///
/// The value is not narrowed to 16 bits here, see [`register_word`].
pub fn parse_register(token: &str) -> Result<i64> {
    let s = token.trim();
    let res = match strip_hex_prefix(s) {
        Some(hex) => parse_unsigned_hex(hex),
        None => s.parse::<i64>().ok(),
    };
    res.ok_or_else(|| {
        Error::validation(format!(
            "Invalid value: '{token}'. Use decimal (e.g., 1234) or hex (e.g., 0x04D2)"
        ))
    })
}

/// Parse a hex token with an optional `0x` prefix, e.g. a register mask.
pub fn parse_hex(token: &str) -> Result<i64> {
    let s = token.trim();
    let hex = strip_hex_prefix(s).unwrap_or(s);
    parse_unsigned_hex(hex).ok_or_else(|| {
        Error::validation(format!(
            "Invalid hex value: '{token}'. Use format: 0xFFFF or FFFF"
        ))
    })
}

/// Narrow a parsed register value to the 16 bit word put on the wire.
///
/// Unsigned values up to `0xFFFF` pass through, negative values down to `-32768` are encoded
/// as two's complement.
pub fn register_word(value: i64) -> Result<u16> {
    if let Ok(v) = u16::try_from(value) {
        Ok(v)
    } else if let Ok(v) = i16::try_from(value) {
        Ok(v as u16)
    } else {
        Err(Error::validation(format!(
            "Register value {value} does not fit into 16 bits"
        )))
    }
}

/// Unpack `quantity` coils from Modbus bit packing (LSB of the first byte is the first coil).
///
/// Bits beyond the end of `bytes` read as `false`.
pub fn unpack_bits(bytes: &[u8], quantity: usize) -> Vec<bool> {
    (0..quantity)
        .map(|i| bytes.get(i / 8).is_some_and(|b| (b >> (i % 8)) & 1 == 1))
        .collect()
}

/// Pack coils LSB first, the inverse of [`unpack_bits`]. The last byte is zero padded.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, bit)| if *bit { acc | (1 << i) } else { acc })
        })
        .collect()
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

// `from_str_radix` accepts a leading '+', hex tokens must not carry a sign.
fn parse_unsigned_hex(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    i64::from_str_radix(s, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::{pack_bits, parse_coil, parse_hex, parse_register, register_word, unpack_bits};
    use crate::error::Error;

    #[test]
    fn ut_parse_coil_true() {
        for token in ["true", "TRUE", "True", "1", "on", "ON", "  on "] {
            assert!(parse_coil(token).unwrap(), "{token}");
        }
    }

    #[test]
    fn ut_parse_coil_false() {
        for token in ["false", "FALSE", "0", "off", "Off"] {
            assert!(!parse_coil(token).unwrap(), "{token}");
        }
    }

    #[test]
    fn ut_parse_coil_invalid() {
        for token in ["yes", "2", "", "no", "tru"] {
            let err = parse_coil(token).unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
            assert!(err.to_string().contains("true/false, 1/0, or on/off"));
        }
    }

    #[test]
    fn ut_parse_register() {
        assert_eq!(parse_register("1234").unwrap(), 1234);
        assert_eq!(parse_register("0x04D2").unwrap(), 1234);
        assert_eq!(parse_register("0X04d2").unwrap(), 1234);
        assert_eq!(parse_register(" 42 ").unwrap(), 42);
        assert_eq!(parse_register("-1").unwrap(), -1);
        assert_eq!(parse_register("+7").unwrap(), 7);
        // no clamping at this stage
        assert_eq!(parse_register("70000").unwrap(), 70000);
    }

    #[test]
    fn ut_parse_register_invalid() {
        for token in ["", "abc", "0x", "0xZZ", "12.5", "0x-1", "1 2"] {
            assert!(
                matches!(parse_register(token), Err(Error::Validation(_))),
                "{token}"
            );
        }
    }

    #[test]
    fn ut_parse_hex() {
        assert_eq!(parse_hex("FFFF").unwrap(), 65535);
        assert_eq!(parse_hex("0xFFFF").unwrap(), 65535);
        assert_eq!(parse_hex("0Xff00").unwrap(), 0xFF00);
        assert_eq!(parse_hex(" 10 ").unwrap(), 16);
    }

    #[test]
    fn ut_parse_hex_invalid() {
        for token in ["", "0x", "GG", "-FF", "+FF", "0x+1"] {
            assert!(matches!(parse_hex(token), Err(Error::Validation(_))), "{token}");
        }
    }

    #[test]
    fn ut_register_word() {
        assert_eq!(register_word(0).unwrap(), 0);
        assert_eq!(register_word(65535).unwrap(), 0xFFFF);
        assert_eq!(register_word(-1).unwrap(), 0xFFFF);
        assert_eq!(register_word(-32768).unwrap(), 0x8000);
        assert!(register_word(65536).is_err());
        assert!(register_word(-32769).is_err());
    }

    #[test]
    fn ut_unpack_bits() {
        assert_eq!(
            unpack_bits(&[0b0000_0101], 4),
            vec![true, false, true, false]
        );
        let bits = unpack_bits(&[0x00, 0x81], 16);
        assert!(bits[8]);
        assert!(bits[15]);
        assert_eq!(bits.iter().filter(|b| **b).count(), 2);
        // missing bytes read as false
        assert_eq!(unpack_bits(&[0xFF], 10)[8..], [false, false]);
    }

    #[test]
    fn ut_pack_bits() {
        assert_eq!(pack_bits(&[true, false, true]), vec![0b0000_0101]);
        assert_eq!(pack_bits(&[false; 9]), vec![0, 0]);
        let bits = vec![true, true, false, false, true, false, true, true, true];
        assert_eq!(pack_bits(&bits), vec![0b1101_0011, 0b0000_0001]);
        assert_eq!(unpack_bits(&pack_bits(&bits), bits.len()), bits);
        assert!(pack_bits(&[]).is_empty());
    }
}
