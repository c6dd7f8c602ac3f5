use chrono::{DateTime, Utc};

/// Permission bits reported for synthetic directories (virtual root, segment names).
pub const SYNTHETIC_DIR_MODE: u32 = 0o555;

/// Normalized view of a namespace node, whatever backend it came from.
///
/// Synthetic entries only carry `name` and `is_dir`. Their `size` is 0 and
/// `modified`/`owner`/`group` are `None`, which callers must read as
/// "unknown" rather than as real values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Entry name (not full path)
    pub name: String,
    /// Size in bytes (0 when unknown or for directories)
    pub size: u64,
    /// Unix permission bits (e.g. 0o755)
    pub mode: u32,
    /// Last modification time, if the backend reports one
    pub modified: Option<DateTime<Utc>>,
    /// Whether this is a directory
    pub is_dir: bool,
    pub owner: Option<String>,
    pub group: Option<String>,
}

impl EntryMetadata {
    /// A fabricated directory entry with no backing node.
    pub fn synthetic_dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            mode: SYNTHETIC_DIR_MODE,
            modified: None,
            is_dir: true,
            owner: None,
            group: None,
        }
    }

    /// Unix-style permission string, e.g. `drwxr-xr-x`.
    pub fn mode_string(&self) -> String {
        let mut out = String::with_capacity(10);
        out.push(if self.is_dir { 'd' } else { '-' });
        for shift in [6u32, 3, 0] {
            let bits = (self.mode >> shift) & 0o7;
            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        out
    }
}

/// Map a remote permission string (`"r"`, `"rw"`, ...) to mode bits.
///
/// Everything is traversable; `r` adds read bits and `w` adds write bits
/// for user, group and other.
pub fn mode_from_permission(permission: &str) -> u32 {
    let mut mode = 0o111;
    if permission.contains('r') {
        mode |= 0o444;
    }
    if permission.contains('w') {
        mode |= 0o222;
    }
    mode
}
