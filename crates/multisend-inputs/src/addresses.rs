use crate::errors::{InputError, InputResult};
use ethers::types::Address;
use std::{collections::HashSet, fs, path::Path};
use tracing::{debug, warn};

/// Parse one address per line
///
/// Invalid lines are dropped with a warning. Duplicates keep their first position.
pub fn parse_addresses(contents: &str) -> Vec<Address> {
    let mut seen = HashSet::new();
    let mut addresses = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        match text.parse::<Address>() {
            Ok(address) => {
                if seen.insert(address) {
                    addresses.push(address);
                } else {
                    debug!("Skipping duplicate address {:#x} on line {}", address, idx + 1);
                }
            }
            Err(_) => warn!("Skipping invalid address on line {}: {}", idx + 1, text),
        }
    }

    addresses
}

/// Read destination addresses from an `address.txt` file
pub fn read_addresses<P: AsRef<Path>>(path: P) -> InputResult<Vec<Address>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let addresses = parse_addresses(&contents);
    if addresses.is_empty() {
        return Err(InputError::Empty(path.display().to_string()));
    }

    debug!("Loaded {} unique addresses from {}", addresses.len(), path.display());
    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_addresses_dedup_preserves_order() {
        let contents = "\
0x000000000000000000000000000000000000dEaD
  0x70997970C51812dc3A010C7d01b50e0d17dc79C8  

0x000000000000000000000000000000000000dead
0x1234
definitely not an address
0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266
";
        let addresses = parse_addresses(contents);

        assert_eq!(addresses.len(), 3);
        assert_eq!(
            addresses[0],
            "0x000000000000000000000000000000000000dEaD".parse().unwrap()
        );
        assert_eq!(
            addresses[1],
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap()
        );
        assert_eq!(
            addresses[2],
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap()
        );
    }

    #[test]
    fn test_read_addresses_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0x70997970C51812dc3A010C7d01b50e0d17dc79C8").unwrap();
        writeln!(file, "garbage").unwrap();

        let addresses = read_addresses(file.path()).unwrap();
        assert_eq!(addresses.len(), 1);
    }

    #[test]
    fn test_file_without_valid_addresses() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "garbage").unwrap();

        assert!(matches!(
            read_addresses(file.path()),
            Err(InputError::Empty(_))
        ));
        assert!(matches!(
            read_addresses("/nonexistent/address.txt"),
            Err(InputError::Io(_))
        ));
    }
}
