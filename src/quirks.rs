//! Driver-version gates.
//!
//! Every version comparison the metadata synthesizer and binary generator
//! depend on is resolved once per input into a [`DriverQuirks`] record; the
//! emitters take it by reference and never compare raw version numbers.

use crate::cursor::Cursor;
use crate::numeric;

/// Version assumed when a supplied driver-info string cannot be parsed.
const NEWEST_DRIVER_VERSION: u32 = 99_999_909;

/// Driver-version-gated behavior switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverQuirks {
    /// Resolved numeric driver version (`major*100 + minor`).
    pub driver_version: u32,
    /// The `.comment` driver-info string, synthesized when absent.
    pub driver_info: String,
    /// Metadata version line 104, constant buffer ids, UAV table layout.
    pub older_than_1124: bool,
    /// `hc` constant pointers, global-data symbol name, default ids.
    pub older_than_1384: bool,
    /// Private UAV size accounting.
    pub older_than_1598: bool,
    /// The kernel header duplicates `uavPrivate` in its first word
    /// (driver 1642.5 and newer).
    pub uav_private_in_header: bool,
    /// Read-only image inputs are numbered in reverse.
    pub reversed_input_order: bool,
}

impl DriverQuirks {
    /// Resolves the gates from an input's version number and optional
    /// driver-info string.
    pub fn resolve(driver_version: u32, driver_info: Option<&str>) -> Self {
        let (version, info) = match driver_info {
            None => {
                let major = driver_version / 100;
                let minor = driver_version % 100;
                (
                    driver_version,
                    format!(
                        "@(#) OpenCL 1.2 AMD-APP ({major}.{minor}).  \
                         Driver version: {major}.{minor} (VM)"
                    ),
                )
            }
            Some(info) if driver_version == 0 => (
                parse_version_from_info(info).unwrap_or(NEWEST_DRIVER_VERSION),
                info.to_string(),
            ),
            Some(info) => (driver_version, info.to_string()),
        };
        DriverQuirks {
            driver_version: version,
            driver_info: info,
            older_than_1124: version < 112_402,
            older_than_1384: version < 138_405,
            older_than_1598: version < 159_805,
            uav_private_in_header: version >= 164_205,
            reversed_input_order: version == 101_602 || version == 112_402,
        }
    }
}

/// Extracts `major*100 + minor` from an `AMD-APP (<maj>.<min>)` marker.
fn parse_version_from_info(info: &str) -> Option<u32> {
    let pos = info.find("AMD-APP")?;
    let rest = &info[pos + 7..];
    let open = rest.find('(')?;
    let mut cur = Cursor::new(&rest[open + 1..], 0);
    let major = numeric::parse_uint(&mut cur, 32).ok()?;
    if !cur.eat(b'.') {
        return None;
    }
    let minor = numeric::parse_uint(&mut cur, 32).ok()?;
    Some((major * 100 + minor) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_driver_info() {
        let q = DriverQuirks::resolve(150005, None);
        assert_eq!(
            q.driver_info,
            "@(#) OpenCL 1.2 AMD-APP (1500.5).  Driver version: 1500.5 (VM)"
        );
        assert_eq!(q.driver_version, 150005);
        assert!(!q.older_than_1124);
        assert!(!q.older_than_1384);
        assert!(q.older_than_1598);
        assert!(!q.uav_private_in_header);
    }

    #[test]
    fn parses_version_from_info() {
        let q = DriverQuirks::resolve(0, Some("@(#) OpenCL 1.2 AMD-APP (1124.2)"));
        assert_eq!(q.driver_version, 112402);
        assert!(q.reversed_input_order);
        assert!(!q.older_than_1124);
        let q = DriverQuirks::resolve(0, Some("no marker here"));
        assert_eq!(q.driver_version, 99_999_909);
    }

    #[test]
    fn version_gates() {
        let q = DriverQuirks::resolve(100000, None);
        assert!(q.older_than_1124);
        assert!(q.older_than_1384);
        let q = DriverQuirks::resolve(164205, None);
        assert!(q.uav_private_in_header);
        let q = DriverQuirks::resolve(101602, None);
        assert!(q.reversed_input_order);
    }
}
