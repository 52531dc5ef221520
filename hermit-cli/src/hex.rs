use anyhow::{bail, Context, Result};

/// Parse packet bytes given on the command line.
///
/// Each argument holds one or more bytes in hex, with or without a `0x`
/// prefix. Commas, colons and whitespace separate bytes inside an argument,
/// so `00 42 80 C0 7D`, `0x00,0x42,0x80,0xC0,0x7D` and `004280C07D` all parse
/// the same.
pub fn parse_bytes(args: &[String]) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    for (arg_num, arg) in args.iter().enumerate() {
        for token in arg.split(|c: char| c == ',' || c == ':' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            let digits = strip_prefix(token);
            // A lone "0x7" is one byte, not an odd-length string
            if digits.len() == 1 {
                let byte =
                    parse_byte(token).with_context(|| format!("argument {}", arg_num + 1))?;
                bytes.push(byte);
                continue;
            }
            let decoded = decode_hex_bytes(digits)
                .with_context(|| format!("argument {}: {:?}", arg_num + 1, token))?;
            bytes.extend(decoded);
        }
    }
    Ok(bytes)
}

/// Parse one byte, e.g. `42`, `0x42` or `0X4`.
pub fn parse_byte(s: &str) -> Result<u8> {
    let digits = strip_prefix(s.trim());
    if digits.is_empty() || digits.len() > 2 {
        bail!("{:?} is not a single hex byte", s);
    }
    u8::from_str_radix(digits, 16).with_context(|| format!("invalid hex byte {:?}", s))
}

/// Format bytes the way the driver logs them: `00 42 80 C0 7D`.
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn decode_hex_bytes(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        bail!("odd number of hex characters");
    }
    if !hex.is_ascii() {
        bail!("non-ASCII characters in hex");
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .with_context(|| format!("invalid hex at position {}", i))
        })
        .collect()
}
