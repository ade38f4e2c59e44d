use tracing::debug;

use super::node::{Node, NodeId, NodeKind, Permissions};
use super::path::{self, SEPARATOR, Segment};

/// Kind tag of a listed entry, so callers never need to peek into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// In-memory filesystem tree.
///
/// Nodes live in an arena and refer to each other by [`NodeId`]. Directories
/// own the handles of their children, and every node stores the handle of its
/// parent, so there are no reference cycles.
#[derive(Debug, Clone)]
pub struct Vfs {
    nodes: Vec<Option<Node>>,
    root: NodeId,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    /// Creates a filesystem holding only an empty root directory.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new(NodeKind::empty_directory(), None))],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub(super) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn is_directory(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.kind.is_directory())
    }

    /// Inserts `node` as the child `name` of `parent`.
    ///
    /// The child's parent handle is overwritten with `parent`, keeping the
    /// back-reference in sync with the containment edge. Returns `None` when
    /// `parent` is not a live directory or already has a child named `name`.
    pub(super) fn attach(&mut self, parent: NodeId, name: &str, mut node: Node) -> Option<NodeId> {
        match self.node(parent).and_then(Node::children) {
            Some(children) if !children.contains_key(name) => {}
            _ => return None,
        }

        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(Some(node));

        if let Some(NodeKind::Directory { children }) =
            self.node_mut(parent).map(|parent| &mut parent.kind)
        {
            children.insert(name.to_string(), id);
        }
        Some(id)
    }

    /// Looks up `name` among the children of `id`. Fails for files.
    fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id)?.children()?.get(name).copied()
    }

    /// Parent of `id`, clamped at the root.
    fn parent_or_self(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id)?;
        Some(node.parent.unwrap_or(id))
    }

    fn step(&self, from: NodeId, segment: Segment<'_>) -> Option<NodeId> {
        match segment {
            Segment::Current => Some(from),
            Segment::Parent => self.parent_or_self(from),
            Segment::Name(name) => self.child(from, name),
        }
    }

    fn walk(&self, from: NodeId, path: &str) -> Option<NodeId> {
        path::segments(path).try_fold(from, |current, segment| self.step(current, segment))
    }

    /// Resolves `current_path` from the root and requires it to be a directory.
    fn directory_at(&self, current_path: &str) -> Option<NodeId> {
        let id = self.walk(self.root, current_path)?;
        self.is_directory(id).then_some(id)
    }

    /// The node a `target_path` walk starts from: the root for absolute
    /// targets, otherwise the directory named by `current_path`.
    fn start_for(&self, current_path: &str, target_path: &str) -> Option<NodeId> {
        if path::is_absolute(target_path) {
            Some(self.root)
        } else {
            self.directory_at(current_path)
        }
    }

    /// Resolves `target_path` relative to the directory `current_path`.
    ///
    /// Absolute targets ignore `current_path`. `..` at the root stays at the
    /// root. Resolution is all-or-nothing: any missing segment, or a segment
    /// that tries to descend through a file, fails the whole call.
    pub fn resolve(&self, current_path: &str, target_path: &str) -> Option<NodeId> {
        if target_path == "/" {
            return Some(self.root);
        }

        let start = self.start_for(current_path, target_path)?;
        self.walk(start, target_path)
    }

    pub fn get_file_content(&self, current_path: &str, file_path: &str) -> Option<&str> {
        let id = self.resolve(current_path, file_path)?;
        match &self.node(id)?.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Directory { .. } => None,
        }
    }

    /// Lists the children of the directory at `path`, in insertion order.
    pub fn list_directory(&self, current_path: &str, path: &str) -> Option<Vec<DirEntry>> {
        let id = self.resolve(current_path, path)?;
        let children = self.node(id)?.children()?;

        children
            .iter()
            .map(|(name, child)| {
                let kind = match self.node(*child)?.kind {
                    NodeKind::Directory { .. } => EntryKind::Directory,
                    NodeKind::File { .. } => EntryKind::File,
                };
                Some(DirEntry {
                    name: name.clone(),
                    kind,
                })
            })
            .collect()
    }

    /// Canonical absolute path of a live node, rebuilt from its parent chain.
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = id;

        while let Some(parent) = self.node(current)?.parent {
            let (name, _) = self
                .node(parent)?
                .children()?
                .iter()
                .find(|(_, child)| **child == current)?;
            names.push(name.as_str());
            current = parent;
        }

        if names.is_empty() {
            return Some(SEPARATOR.to_string());
        }

        Some(names.iter().rev().fold(String::new(), |mut acc, name| {
            acc.push(SEPARATOR);
            acc.push_str(name);
            acc
        }))
    }

    /// Descends into directory `name` under `from`, creating it when absent.
    /// Fails when `name` exists but is not a directory.
    fn ensure_directory(&mut self, from: NodeId, name: &str) -> Option<NodeId> {
        match self.child(from, name) {
            Some(existing) => self.is_directory(existing).then_some(existing),
            None => {
                let id = self.attach(from, name, Node::new(NodeKind::empty_directory(), None))?;
                debug!("Created directory '{}' under {}", name, from);
                Some(id)
            }
        }
    }

    fn ensure_directories<'a>(
        &mut self,
        from: NodeId,
        segments: impl IntoIterator<Item = Segment<'a>>,
    ) -> Option<NodeId> {
        let mut current = from;
        for segment in segments {
            current = match segment {
                Segment::Name(name) => self.ensure_directory(current, name)?,
                other => self.step(current, other)?,
            };
        }
        Some(current)
    }

    /// Creates every missing directory along `dir_path` (like `mkdir -p`).
    ///
    /// Directories created before a conflicting segment are kept. Creating a
    /// path that already exists succeeds without changing anything.
    pub fn create_directory(&mut self, current_path: &str, dir_path: &str) -> bool {
        let Some(start) = self.start_for(current_path, dir_path) else {
            debug!("mkdir '{}': no start directory '{}'", dir_path, current_path);
            return false;
        };

        self.ensure_directories(start, path::segments(dir_path))
            .is_some()
    }

    /// Creates an empty file at `file_path`, creating missing parent
    /// directories. An existing entry with that name is left untouched.
    pub fn create_file(&mut self, current_path: &str, file_path: &str) -> bool {
        let Some(start) = self.start_for(current_path, file_path) else {
            debug!("touch '{}': no start directory '{}'", file_path, current_path);
            return false;
        };

        let mut segments: Vec<_> = path::segments(file_path).collect();
        let last = segments.pop();

        let Some(parent) = self.ensure_directories(start, segments) else {
            return false;
        };

        match last {
            None => true,
            Some(Segment::Name(name)) => {
                if self.child(parent, name).is_some() {
                    return true;
                }
                match self.attach(parent, name, Node::new(NodeKind::empty_file(), None)) {
                    Some(_) => {
                        debug!("Created file '{}' under {}", name, parent);
                        true
                    }
                    None => false,
                }
            }
            // `.` and `..` always name an existing directory
            Some(other) => self.step(parent, other).is_some(),
        }
    }

    /// Removes an empty, non-root directory.
    ///
    /// The entry is found in the parent by handle identity, not by name.
    pub fn remove_directory(&mut self, current_path: &str, dir_path: &str) -> bool {
        let Some(id) = self.resolve(current_path, dir_path) else {
            return false;
        };
        let Some(node) = self.node(id) else {
            return false;
        };
        let Some(parent) = node.parent else {
            debug!("rmdir '{}': refusing to remove the root", dir_path);
            return false;
        };
        match node.children() {
            Some(children) if children.is_empty() => {}
            _ => return false,
        }

        let Some(NodeKind::Directory { children }) =
            self.node_mut(parent).map(|parent| &mut parent.kind)
        else {
            return false;
        };
        let Some(name) = children
            .iter()
            .find(|(_, child)| **child == id)
            .map(|(name, _)| name.clone())
        else {
            return false;
        };
        children.remove(&name);
        self.nodes[id.0] = None;

        debug!("Removed directory '{}' ({})", name, id);
        true
    }

    /// Replaces the permissions of the node at `target_path` with `mode`.
    /// Nothing changes unless both the path and the mode are valid.
    pub fn change_permissions(&mut self, current_path: &str, target_path: &str, mode: &str) -> bool {
        let Some(id) = self.resolve(current_path, target_path) else {
            return false;
        };
        let Ok(permissions) = mode.parse::<Permissions>() else {
            debug!("chmod '{}': rejected mode '{}'", target_path, mode);
            return false;
        };
        let Some(node) = self.node_mut(id) else {
            return false;
        };

        node.permissions = permissions;
        debug!("Changed permissions of {} to {}", id, permissions);
        true
    }

    /// Checks that every live node except the root has a parent that lists
    /// it as a child, and that every child handle points back at its parent.
    pub fn check_invariants(&self) -> bool {
        self.nodes.iter().enumerate().all(|(index, slot)| {
            let Some(node) = slot else {
                return true;
            };
            let id = NodeId(index);

            let parent_ok = match node.parent {
                None => id == self.root,
                Some(parent) => self
                    .node(parent)
                    .and_then(Node::children)
                    .is_some_and(|children| {
                        children.values().filter(|child| **child == id).count() == 1
                    }),
            };
            let children_ok = node.children().is_none_or(|children| {
                children
                    .values()
                    .all(|child| self.node(*child).is_some_and(|c| c.parent == Some(id)))
            });

            parent_ok && children_ok
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    fn add_dir(vfs: &mut Vfs, parent: NodeId, name: &str) -> NodeId {
        vfs.attach(parent, name, Node::new(NodeKind::empty_directory(), None))
            .unwrap()
    }

    fn add_file(vfs: &mut Vfs, parent: NodeId, name: &str, content: &str) -> NodeId {
        let kind = NodeKind::File {
            content: content.to_string(),
        };
        vfs.attach(parent, name, Node::new(kind, None)).unwrap()
    }

    /// `/home/user/notes.txt`, `/home/user/docs/`, `/etc/hosts`
    #[fixture]
    fn vfs() -> Vfs {
        let mut vfs = Vfs::new();
        let root = vfs.root();
        let home = add_dir(&mut vfs, root, "home");
        let user = add_dir(&mut vfs, home, "user");
        add_file(&mut vfs, user, "notes.txt", "remember");
        add_dir(&mut vfs, user, "docs");
        let etc = add_dir(&mut vfs, root, "etc");
        add_file(&mut vfs, etc, "hosts", "127.0.0.1 localhost");
        vfs
    }

    fn path(vfs: &Vfs, id: Option<NodeId>) -> Option<String> {
        id.and_then(|id| vfs.path_of(id))
    }

    #[rstest]
    #[case("/home/user", "docs", Some("/home/user/docs"))]
    #[case("/home/user", "./docs/", Some("/home/user/docs"))]
    #[case("/home/user", "..", Some("/home"))]
    #[case("/home/user", "../../etc//hosts", Some("/etc/hosts"))]
    #[case("/home/user", "../../../../etc", Some("/etc"))]
    #[case("/home/user", "missing", None)]
    #[case("/home/user", "notes.txt/anything", None)]
    #[case("/home/user", "notes.txt/..", Some("/home/user"))]
    #[case("/home/user", "docs/missing/..", None)]
    #[case("/", "home/user", Some("/home/user"))]
    #[case("/", "", Some("/"))]
    #[case("/home/user/", "docs", Some("/home/user/docs"))]
    fn resolves_relative_paths(
        vfs: Vfs,
        #[case] cwd: &str,
        #[case] target: &str,
        #[case] expected: Option<&str>,
    ) {
        let resolved = vfs.resolve(cwd, target);
        assert_eq!(path(&vfs, resolved).as_deref(), expected);
    }

    #[rstest]
    #[case("/")]
    #[case("/home/user")]
    #[case("/etc/hosts")]
    #[case("/home/user/docs/../notes.txt")]
    #[case("/nope")]
    fn absolute_paths_ignore_current_path(vfs: Vfs, #[case] target: &str) {
        let from_root = vfs.resolve("/", target);
        for cwd in ["/home/user", "/etc", "/does/not/exist", "/etc/hosts", ""] {
            assert_eq!(vfs.resolve(cwd, target), from_root, "cwd = {cwd}");
        }
    }

    #[rstest]
    #[case("/")]
    #[case("/home")]
    #[case("/home/user/docs")]
    fn dot_resolves_to_current_directory(vfs: Vfs, #[case] cwd: &str) {
        assert_eq!(vfs.resolve(cwd, "."), vfs.resolve("/", cwd));
    }

    #[rstest]
    #[case("..")]
    #[case("../..")]
    #[case("../../../../..")]
    #[case("/..")]
    fn parent_of_root_is_root(vfs: Vfs, #[case] target: &str) {
        assert_eq!(vfs.resolve("/", target), Some(vfs.root()));
    }

    #[rstest]
    fn relative_resolution_fails_when_current_path_is_gone(vfs: Vfs) {
        assert_eq!(vfs.resolve("/home/ghost", "."), None);
        assert_eq!(vfs.resolve("/etc/hosts", "."), None);
    }

    #[rstest]
    fn file_content_is_only_returned_for_files(vfs: Vfs) {
        assert_eq!(vfs.get_file_content("/home/user", "notes.txt"), Some("remember"));
        assert_eq!(vfs.get_file_content("/home/user", "docs"), None);
        assert_eq!(vfs.get_file_content("/home/user", "missing"), None);
    }

    #[rstest]
    fn lists_only_directories(vfs: Vfs) {
        let entries = vfs.list_directory("/home/user", ".").unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.kind)).collect();
        assert_eq!(
            names,
            vec![("notes.txt", EntryKind::File), ("docs", EntryKind::Directory)]
        );
        assert!(vfs.list_directory("/home/user", "notes.txt").is_none());
        assert!(vfs.list_directory("/home/user", "missing").is_none());
    }

    #[rstest]
    fn create_directory_builds_intermediate_directories(mut vfs: Vfs) {
        assert!(vfs.create_directory("/home/user", "a/b/c"));
        let created = vfs.resolve("/", "/home/user/a/b/c").unwrap();
        assert!(vfs.is_directory(created));
        assert_eq!(
            vfs.node(created).unwrap().permissions,
            Permissions::DIRECTORY_DEFAULT
        );
        assert!(vfs.check_invariants());
    }

    #[rstest]
    fn create_directory_is_idempotent(mut vfs: Vfs) {
        assert!(vfs.create_directory("/home/user", "a/b"));
        let a = vfs.resolve("/home/user", "a");
        let b = vfs.resolve("/home/user", "a/b");
        let snapshot = vfs.nodes.clone();

        assert!(vfs.create_directory("/home/user", "a/b"));
        assert_eq!(vfs.resolve("/home/user", "a"), a);
        assert_eq!(vfs.resolve("/home/user", "a/b"), b);
        assert_eq!(vfs.nodes, snapshot);
    }

    #[rstest]
    fn create_directory_stops_at_a_file_and_keeps_earlier_segments(mut vfs: Vfs) {
        assert!(!vfs.create_directory("/home/user", "x/../notes.txt/y"));
        assert!(vfs.resolve("/home/user", "x").is_some());
        assert!(vfs.resolve("/home/user", "notes.txt/y").is_none());
        assert!(vfs.check_invariants());
    }

    #[rstest]
    fn create_directory_fails_without_a_start_directory(mut vfs: Vfs) {
        assert!(!vfs.create_directory("/missing", "x"));
        assert!(vfs.create_directory("/missing", "/tmp/x"));
    }

    #[rstest]
    fn created_file_is_empty(mut vfs: Vfs) {
        assert!(vfs.create_file("/home/user", "new/file.txt"));
        assert_eq!(vfs.get_file_content("/home/user", "new/file.txt"), Some(""));
        let id = vfs.resolve("/home/user", "new/file.txt").unwrap();
        assert_eq!(vfs.node(id).unwrap().permissions, Permissions::FILE_DEFAULT);
        assert!(vfs.check_invariants());
    }

    #[rstest]
    fn create_file_does_not_overwrite(mut vfs: Vfs) {
        let before = vfs.resolve("/home/user", "notes.txt");
        assert!(vfs.create_file("/home/user", "notes.txt"));
        assert!(vfs.create_file("/home/user", "docs"));
        assert_eq!(vfs.resolve("/home/user", "notes.txt"), before);
        assert_eq!(vfs.get_file_content("/home/user", "notes.txt"), Some("remember"));
        assert!(vfs.is_directory(vfs.resolve("/home/user", "docs").unwrap()));
    }

    #[rstest]
    fn create_file_fails_through_a_file(mut vfs: Vfs) {
        assert!(!vfs.create_file("/home/user", "notes.txt/inner"));
    }

    #[rstest]
    fn removes_empty_directory(mut vfs: Vfs) {
        let docs = vfs.resolve("/home/user", "docs").unwrap();
        assert!(vfs.remove_directory("/home/user", "docs"));
        assert!(vfs.resolve("/home/user", "docs").is_none());
        assert!(vfs.node(docs).is_none());
        assert!(vfs.check_invariants());
    }

    #[rstest]
    fn refuses_to_remove_non_empty_directory(mut vfs: Vfs) {
        vfs.create_file("/home/user", "docs/only.txt");
        let snapshot = vfs.nodes.clone();
        assert!(!vfs.remove_directory("/home/user", "docs"));
        assert_eq!(vfs.nodes, snapshot);
    }

    #[rstest]
    #[case("/")]
    #[case("notes.txt")]
    #[case("missing")]
    #[case("..")]
    fn refuses_invalid_removals(mut vfs: Vfs, #[case] target: &str) {
        assert!(!vfs.remove_directory("/home/user", target));
        assert!(vfs.check_invariants());
    }

    #[rstest]
    fn removal_matches_by_identity(mut vfs: Vfs) {
        vfs.create_directory("/", "twins/left");
        vfs.create_directory("/", "twins/right");
        assert!(vfs.remove_directory("/twins", "right"));
        assert!(vfs.resolve("/twins", "left").is_some());
        assert!(vfs.resolve("/twins", "right").is_none());
    }

    #[rstest]
    fn stale_handles_are_never_reused(mut vfs: Vfs) {
        vfs.create_directory("/", "tmp");
        let old = vfs.resolve("/", "tmp").unwrap();
        vfs.remove_directory("/", "tmp");
        vfs.create_directory("/", "tmp");
        let new = vfs.resolve("/", "tmp").unwrap();
        assert_ne!(old, new);
        assert!(vfs.node(old).is_none());
    }

    #[rstest]
    #[case("755", true)]
    #[case("000", true)]
    #[case("abc", false)]
    #[case("12", false)]
    #[case("812", false)]
    fn change_permissions_validates_mode(mut vfs: Vfs, #[case] mode: &str, #[case] ok: bool) {
        let id = vfs.resolve("/home/user", "notes.txt").unwrap();
        assert_eq!(vfs.change_permissions("/home/user", "notes.txt", mode), ok);

        let expected = if ok { mode } else { "644" };
        assert_eq!(vfs.node(id).unwrap().permissions.to_string(), expected);
    }

    #[rstest]
    fn change_permissions_fails_on_missing_target(mut vfs: Vfs) {
        assert!(!vfs.change_permissions("/home/user", "missing", "700"));
    }

    #[rstest]
    fn path_of_root_is_separator(vfs: Vfs) {
        assert_eq!(vfs.path_of(vfs.root()).as_deref(), Some("/"));
    }
}
