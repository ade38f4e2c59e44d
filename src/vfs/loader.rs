use std::{borrow::Cow, ops::RangeInclusive, string::FromUtf8Error};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::{debug, info, warn};

use super::node::{Node, NodeId, NodeKind, Permissions};
use super::tree::Vfs;

const TYPE_FIELD: &str = "type";
const CONTENT_FIELD: &str = "content";
const ENCODED_CONTENT_FIELDS: [&str; 2] = ["content_encoded", "content_b64"];
const PERMISSIONS_FIELD: &str = "permissions";
/// Unquoted modes such as `permissions: 640` arrive as integers.
const INTEGER_MODES: RangeInclusive<i64> = 100..=777;

/// A description record after structural parsing, before it is placed in
/// the arena. Permissions stay optional until materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Record {
    Directory {
        children: Vec<(String, Record)>,
        permissions: Option<Permissions>,
    },
    File {
        content: String,
        permissions: Option<Permissions>,
    },
}

impl TryFrom<&str> for Vfs {
    type Error = VfsLoadError;

    /// Builds the tree from a YAML or JSON description.
    fn try_from(description: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(description).context(ParseSnafu)?;
        let root = documents.first().context(EmptyDescriptionSnafu)?;

        let Record::Directory {
            children,
            permissions,
        } = parse_record("/", root)?
        else {
            return Err(VfsLoadError::RootNotDirectory);
        };

        let mut vfs = Vfs::new();
        let root_id = vfs.root();
        if let (Some(root), Some(permissions)) = (vfs.node_mut(root_id), permissions) {
            root.permissions = permissions;
        }
        let count = materialize(&mut vfs, root_id, "", children)?;
        debug_assert!(vfs.check_invariants());

        info!("Loaded virtual filesystem with {} nodes", count + 1);
        Ok(vfs)
    }
}

fn field<'a, 'input>(
    record: &'a LinkedHashMap<Yaml<'input>, Yaml<'input>>,
    name: &'static str,
) -> Option<&'a Yaml<'input>> {
    record.get(&Yaml::Value(Scalar::String(Cow::Borrowed(name))))
}

fn invalid(path: &str, reason: impl Into<String>) -> VfsLoadError {
    VfsLoadError::InvalidRecord {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn parse_record(path: &str, yaml: &Yaml) -> Result<Record, VfsLoadError> {
    let record = yaml
        .as_mapping()
        .ok_or_else(|| invalid(path, "record is not a mapping"))?;

    let permissions = parse_permissions(path, field(record, PERMISSIONS_FIELD));

    match field(record, TYPE_FIELD).and_then(|t| t.as_str()) {
        Some("directory") => {
            let children = match field(record, CONTENT_FIELD) {
                None => Vec::new(),
                Some(content) => content
                    .as_mapping()
                    .ok_or_else(|| invalid(path, "directory content must be a mapping"))?
                    .iter()
                    .map(|(key, value)| {
                        let name = key
                            .as_str()
                            .ok_or_else(|| invalid(path, "entry names must be strings"))?;
                        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
                            return Err(invalid(path, format!("invalid entry name '{name}'")));
                        }
                        Ok((name.to_string(), parse_record(&child_path(path, name), value)?))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            };

            Ok(Record::Directory {
                children,
                permissions,
            })
        }
        Some("file") => Ok(Record::File {
            content: parse_file_content(path, record)?,
            permissions,
        }),
        Some(other) => Err(invalid(path, format!("unknown record type '{other}'"))),
        None => Err(invalid(path, "missing record type")),
    }
}

fn parse_file_content(
    path: &str,
    record: &LinkedHashMap<Yaml, Yaml>,
) -> Result<String, VfsLoadError> {
    let plain = field(record, CONTENT_FIELD);
    let encoded = ENCODED_CONTENT_FIELDS
        .into_iter()
        .find_map(|name| field(record, name));

    match (plain, encoded) {
        (Some(_), Some(_)) => Err(invalid(
            path,
            "a file carries either plain or encoded content, not both",
        )),
        (Some(plain), None) => plain
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| invalid(path, "file content must be a string")),
        (None, Some(encoded)) => Ok(encoded
            .as_str()
            .context(NotTextSnafu)
            .and_then(decode_content)
            .unwrap_or_else(|error| {
                warn!("Failed to decode content of '{}': {}", path, error);
                format!("Decoding error: {error}")
            })),
        (None, None) => Ok(String::new()),
    }
}

/// Decodes a base64 payload into UTF-8 text. Embedded whitespace is ignored.
pub fn decode_content(encoded: &str) -> Result<String, ContentDecodeError> {
    let compact: String = encoded.split_whitespace().collect();
    let bytes = STANDARD.decode(compact).context(InvalidBase64Snafu)?;
    String::from_utf8(bytes).context(InvalidUtf8Snafu)
}

fn parse_permissions(path: &str, yaml: Option<&Yaml>) -> Option<Permissions> {
    let raw = match yaml? {
        Yaml::Value(Scalar::String(mode)) => mode.to_string(),
        Yaml::Value(Scalar::Integer(mode)) if INTEGER_MODES.contains(mode) => mode.to_string(),
        other => {
            warn!("Ignoring unsupported permissions value of '{}': {:?}", path, other);
            return None;
        }
    };

    match raw.parse() {
        Ok(permissions) => Some(permissions),
        Err(error) => {
            warn!("{} on '{}', using the default", error, path);
            None
        }
    }
}

/// Places parsed records under `parent`, depth-first. Every node gets its
/// parent handle as it is attached, and missing permissions fall back to the
/// default for its kind. Returns the number of nodes added.
fn materialize(
    vfs: &mut Vfs,
    parent: NodeId,
    parent_path: &str,
    children: Vec<(String, Record)>,
) -> Result<usize, VfsLoadError> {
    let mut count = 0;

    for (name, record) in children {
        let path = format!("{parent_path}/{name}");
        let (kind, permissions, grandchildren) = match record {
            Record::Directory {
                children,
                permissions,
            } => (NodeKind::empty_directory(), permissions, children),
            Record::File {
                content,
                permissions,
            } => (NodeKind::File { content }, permissions, Vec::new()),
        };

        let mut node = Node::new(kind, None);
        if let Some(permissions) = permissions {
            node.permissions = permissions;
        }

        let id = vfs
            .attach(parent, &name, node)
            .ok_or_else(|| invalid(&path, "duplicate entry"))?;
        debug!("Attached '{}' as {}", path, id);

        count += 1 + materialize(vfs, id, &path, grandchildren)?;
    }

    Ok(count)
}

#[derive(Debug, Snafu)]
pub enum VfsLoadError {
    #[snafu(display("Failed to parse the filesystem description"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("The filesystem description is empty"))]
    EmptyDescription,
    #[snafu(display("The root record of the description must be a directory"))]
    RootNotDirectory,
    #[snafu(display("Invalid record at '{}': {}", path, reason))]
    InvalidRecord { path: String, reason: String },
}

#[derive(Debug, Snafu)]
pub enum ContentDecodeError {
    #[snafu(display("encoded content is not a string"))]
    NotText,
    #[snafu(display("invalid base64: {}", source))]
    InvalidBase64 { source: base64::DecodeError },
    #[snafu(display("decoded content is not valid UTF-8: {}", source))]
    InvalidUtf8 { source: FromUtf8Error },
}
