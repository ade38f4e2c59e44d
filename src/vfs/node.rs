use std::{fmt, str::FromStr};

use derive_more::Display;
use hashlink::LinkedHashMap;
use snafu::Snafu;

/// Stable handle to a node stored in the [`Vfs`](super::Vfs) arena.
///
/// Handles are never reused, so two handles compare equal only when they
/// point at the very same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("#{_0}")]
pub struct NodeId(pub(super) usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory {
        children: LinkedHashMap<String, NodeId>,
    },
    File {
        content: String,
    },
}

impl NodeKind {
    pub fn empty_directory() -> Self {
        NodeKind::Directory {
            children: LinkedHashMap::new(),
        }
    }

    pub fn empty_file() -> Self {
        NodeKind::File {
            content: String::new(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, NodeKind::Directory { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub permissions: Permissions,
    pub parent: Option<NodeId>,
}

impl Node {
    /// Creates a node carrying the default permissions for its kind.
    pub fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        let permissions = Permissions::default_for(&kind);
        Self {
            kind,
            permissions,
            parent,
        }
    }

    pub fn children(&self) -> Option<&LinkedHashMap<String, NodeId>> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }
}

/// Three octal digits, owner/group/other, e.g. `755`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions([u8; 3]);

impl Permissions {
    pub const DIRECTORY_DEFAULT: Permissions = Permissions([7, 5, 5]);
    pub const FILE_DEFAULT: Permissions = Permissions([6, 4, 4]);

    pub fn default_for(kind: &NodeKind) -> Self {
        match kind {
            NodeKind::Directory { .. } => Self::DIRECTORY_DEFAULT,
            NodeKind::File { .. } => Self::FILE_DEFAULT,
        }
    }

    pub fn digits(&self) -> [u8; 3] {
        self.0
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [owner, group, other] = self.digits();
        write!(f, "{owner}{group}{other}")
    }
}

impl FromStr for Permissions {
    type Err = InvalidModeError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidModeError {
            mode: mode.to_string(),
        };

        let bytes = mode.as_bytes();
        if bytes.len() != 3 {
            return Err(invalid());
        }

        let mut digits = [0u8; 3];
        for (slot, byte) in digits.iter_mut().zip(bytes) {
            match byte {
                b'0'..=b'7' => *slot = byte - b'0',
                _ => return Err(invalid()),
            }
        }

        Ok(Permissions(digits))
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("Invalid mode '{}': expected three octal digits", mode))]
pub struct InvalidModeError {
    pub mode: String,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("755", [7, 5, 5])]
    #[case("644", [6, 4, 4])]
    #[case("000", [0, 0, 0])]
    #[case("777", [7, 7, 7])]
    fn parses_valid_modes(#[case] mode: &str, #[case] expected: [u8; 3]) {
        let permissions: Permissions = mode.parse().unwrap();
        assert_eq!(permissions.digits(), expected);
        assert_eq!(permissions.to_string(), mode);
    }

    #[rstest]
    #[case("abc")]
    #[case("12")]
    #[case("812")]
    #[case("7555")]
    #[case("")]
    #[case(" 75")]
    #[case("७५५")]
    fn rejects_invalid_modes(#[case] mode: &str) {
        let result = mode.parse::<Permissions>();
        assert!(matches!(result, Err(InvalidModeError { .. })));
    }

    #[test]
    fn defaults_depend_on_kind() {
        assert_eq!(
            Permissions::default_for(&NodeKind::empty_directory()).to_string(),
            "755"
        );
        assert_eq!(
            Permissions::default_for(&NodeKind::empty_file()).to_string(),
            "644"
        );
    }
}
