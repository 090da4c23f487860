// Reading captured datagrams for the `decode` command.
//
// A capture is either the raw datagram bytes or a hex dump of them
// (whitespace and newlines are ignored).

use std::error::Error;
use std::fs;
use std::io;
use std::path::Path;

pub fn read_capture(path: &Path) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
    let content = fs::read(path)?;
    match std::str::from_utf8(&content) {
        Ok(text) if looks_like_hex(text) => parse_hex(text),
        _ => Ok(content),
    }
}

fn looks_like_hex(text: &str) -> bool {
    let mut digits = text.chars().filter(|c| !c.is_whitespace()).peekable();
    digits.peek().is_some() && digits.all(|c| c.is_ascii_hexdigit())
}

pub fn parse_hex(text: &str) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
    // Filter out whitespace and convert to bytes
    let hex_string: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if hex_string.len() % 2 != 0 {
        return Err(Box::new(io::Error::new(
            io::ErrorKind::InvalidData,
            "Invalid hex string: odd number of characters",
        )));
    }

    let mut bytes = Vec::with_capacity(hex_string.len() / 2);
    for i in (0..hex_string.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex_string[i..i + 2], 16)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        bytes.push(byte);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("53 4D 41 00\n52").unwrap(), b"SMA\0R".to_vec());
        assert!(parse_hex("534").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn test_looks_like_hex() {
        assert!(looks_like_hex("53 4d\n41"));
        assert!(!looks_like_hex("SMA\0"));
        assert!(!looks_like_hex("  \n"));
    }

    #[test]
    fn test_read_capture() {
        let dir = std::env::temp_dir();

        let hex_path = dir.join(format!("sma2mqtt-capture-{}.hex", std::process::id()));
        fs::write(&hex_path, "53 4D 41 00").unwrap();
        assert_eq!(read_capture(&hex_path).unwrap(), b"SMA\0".to_vec());

        let bin_path = dir.join(format!("sma2mqtt-capture-{}.bin", std::process::id()));
        fs::write(&bin_path, [0x53, 0x4D, 0x41, 0x00, 0x90]).unwrap();
        assert_eq!(
            read_capture(&bin_path).unwrap(),
            vec![0x53, 0x4D, 0x41, 0x00, 0x90]
        );

        fs::remove_file(hex_path).unwrap();
        fs::remove_file(bin_path).unwrap();
    }
}
