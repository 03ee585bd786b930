//! Target-framework moniker classification and ordering.
//!
//! Dependency groups and package assets are keyed by short framework
//! tokens ("net8.0", "netstandard2.0", "net472", ...). Ordering is
//! family-first: the modern unified runtime outranks .NET Core, which
//! outranks .NET Standard, which outranks the legacy desktop framework;
//! anything unrecognized ranks last, alphabetically. Within a family the
//! higher framework version wins. Compact ("net48") and dotted ("net4.8")
//! spellings of the same moniker are equivalent, case-insensitively.

use std::cmp::Ordering;
use std::fmt;

/// Framework family, ordered by precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrameworkFamily {
    /// Unrecognized moniker
    Other,
    /// Legacy desktop framework (net11 through net48)
    NetFramework,
    /// Portable standard profile (netstandard1.0 through netstandard2.1)
    NetStandard,
    /// Managed core runtime (netcoreapp1.0 through netcoreapp3.1)
    NetCoreApp,
    /// Modern unified runtime (net5.0 and later)
    Net,
}

/// A parsed target-framework moniker
#[derive(Debug, Clone, Eq)]
pub struct FrameworkMoniker {
    /// Original spelling, lowercased
    pub raw: String,
    pub family: FrameworkFamily,
    pub version: (u32, u32, u32),
}

impl FrameworkMoniker {
    /// Classify a moniker; never fails, unknown tokens land in `Other`.
    pub fn parse(tfm: &str) -> Self {
        let raw = tfm.trim().to_ascii_lowercase();
        // Platform suffixes ("net6.0-windows") do not affect ordering
        let token = raw.split('-').next().unwrap_or("");
        // Registration data also spells monikers ".NETFramework4.7.2"
        let token = token.strip_prefix('.').unwrap_or(token);

        if let Some(rest) = token.strip_prefix("netstandard") {
            if let Some(version) = parse_dotted(rest) {
                return Self {
                    raw,
                    family: FrameworkFamily::NetStandard,
                    version,
                };
            }
        } else if let Some(rest) = token.strip_prefix("netcoreapp") {
            if let Some(version) = parse_dotted(rest) {
                return Self {
                    raw,
                    family: FrameworkFamily::NetCoreApp,
                    version,
                };
            }
        } else if let Some(rest) = token.strip_prefix("netframework") {
            if let Some(version) = parse_dotted(rest) {
                return Self {
                    raw,
                    family: FrameworkFamily::NetFramework,
                    version,
                };
            }
        } else if let Some(rest) = token.strip_prefix("net") {
            let version = if rest.contains('.') {
                parse_dotted(rest)
            } else {
                parse_compact(rest)
            };
            if let Some(version) = version {
                // net5.0 onward is the unified runtime; below that the
                // token names the desktop framework in either spelling.
                let family = if version.0 >= 5 {
                    FrameworkFamily::Net
                } else {
                    FrameworkFamily::NetFramework
                };
                return Self { raw, family, version };
            }
        }

        Self {
            raw,
            family: FrameworkFamily::Other,
            version: (0, 0, 0),
        }
    }

    fn precedence_cmp(&self, other: &Self) -> Ordering {
        match self.family.cmp(&other.family) {
            Ordering::Equal => match self.family {
                // Alphabetical order within the unknown bucket: earlier
                // names rank higher when sorted by descending precedence.
                FrameworkFamily::Other => other.raw.cmp(&self.raw),
                _ => self.version.cmp(&other.version),
            },
            ord => ord,
        }
    }
}

/// "2.1" -> (2, 1, 0); empty or non-numeric components reject the token
fn parse_dotted(s: &str) -> Option<(u32, u32, u32)> {
    if s.is_empty() {
        return None;
    }
    let mut version = [0u32; 3];
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() > 3 {
        return None;
    }
    for (slot, part) in version.iter_mut().zip(&parts) {
        *slot = part.parse().ok()?;
    }
    Some((version[0], version[1], version[2]))
}

/// "472" -> (4, 7, 2); one digit per component
fn parse_compact(s: &str) -> Option<(u32, u32, u32)> {
    if s.is_empty() || s.len() > 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digit = |index: usize| s.as_bytes().get(index).map_or(0, |b| u32::from(b - b'0'));
    Some((digit(0), digit(1), digit(2)))
}

impl PartialEq for FrameworkMoniker {
    fn eq(&self, other: &Self) -> bool {
        self.precedence_cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for FrameworkMoniker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrameworkMoniker {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence_cmp(other)
    }
}

impl fmt::Display for FrameworkMoniker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compare two moniker strings by framework precedence.
///
/// `Greater` means `a` outranks `b`.
pub fn compare_frameworks(a: &str, b: &str) -> Ordering {
    FrameworkMoniker::parse(a).cmp(&FrameworkMoniker::parse(b))
}
