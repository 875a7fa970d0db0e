// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Virtual filesystem engine
//!
//! `FsCore` owns one tree (node arena, content table, quota scopes, handle
//! table) and exposes the full operation set. Every operation is synchronous
//! and runs to completion; a multi-threaded host must serialize access
//! around the whole tree. Several independent instances may coexist for
//! test isolation.

use std::collections::{HashMap, VecDeque};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
#[cfg(feature = "events")]
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::FsConfig;
use crate::content::{BufferContent, Content, SparseContent};
use crate::error::{FsError, FsResult};
use crate::node::{Node, NodeId, NodeKind};
use crate::quota::Quota;
use crate::types::{
    Attributes, ContentId, Credentials, DirEntry, FileMode, FileTimes, FileType, FsStats,
    HandleId, OpenOptions,
};
#[cfg(feature = "events")]
use crate::types::{EventKind, EventSink, SubscriptionId};

/// Handle types
#[derive(Debug)]
pub(crate) enum HandleType {
    File {
        options: OpenOptions,
        cursor: u64,
    },
    Directory {
        position: usize,
        /// Point-in-time snapshot taken at open; later tree mutations do
        /// not invalidate an in-progress listing
        entries: Vec<DirEntry>,
    },
}

/// Open handle (file or directory)
#[derive(Debug)]
pub(crate) struct Handle {
    pub node_id: NodeId,
    pub path: PathBuf,
    pub kind: HandleType,
}

/// Result of path resolution: the node plus its directory entry
struct ResolvedPath {
    id: NodeId,
    parent: Option<(NodeId, String)>,
}

/// The main filesystem engine
pub struct FsCore {
    config: FsConfig,
    root_id: NodeId,
    nodes: Mutex<HashMap<NodeId, Node>>,
    contents: Mutex<HashMap<ContentId, Box<dyn Content>>>,
    quotas: Mutex<HashMap<NodeId, Quota>>,
    handles: Mutex<HashMap<HandleId, Handle>>,
    next_node_id: Mutex<u64>,
    next_content_id: Mutex<u64>,
    next_handle_id: Mutex<u64>,
    #[cfg(feature = "events")]
    next_subscription_id: Mutex<u64>,
    #[cfg(feature = "events")]
    event_subscriptions: Mutex<HashMap<SubscriptionId, Arc<dyn EventSink>>>,
}

impl FsCore {
    /// Create a new engine instance with the given configuration.
    /// `QuotaPolicy::max_bytes` installs a quota scope on the root.
    pub fn new(config: FsConfig) -> Self {
        let root_id = NodeId(1);
        let now = Self::current_timestamp();

        let root = Node {
            id: root_id,
            kind: NodeKind::Directory {
                children: IndexMap::new(),
            },
            times: FileTimes {
                atime: now,
                mtime: now,
                ctime: now,
            },
            mode: 0o755,
            uid: config.security.default_uid,
            gid: config.security.default_gid,
            parent: None,
        };

        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);

        let mut quotas = HashMap::new();
        if let Some(max_bytes) = config.quota.max_bytes {
            quotas.insert(root_id, Quota::new(Some(max_bytes)));
        }

        Self {
            config,
            root_id,
            nodes: Mutex::new(nodes),
            contents: Mutex::new(HashMap::new()),
            quotas: Mutex::new(quotas),
            handles: Mutex::new(HashMap::new()),
            next_node_id: Mutex::new(2),
            next_content_id: Mutex::new(1),
            next_handle_id: Mutex::new(1),
            #[cfg(feature = "events")]
            next_subscription_id: Mutex::new(1),
            #[cfg(feature = "events")]
            event_subscriptions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    fn allocate_node_id(&self) -> NodeId {
        let mut next_id = self.next_node_id.lock().unwrap();
        let id = NodeId(*next_id);
        *next_id += 1;
        id
    }

    fn allocate_handle_id(&self) -> HandleId {
        let mut next_id = self.next_handle_id.lock().unwrap();
        let id = HandleId::new(*next_id);
        *next_id += 1;
        id
    }

    fn allocate_content(&self, content: Box<dyn Content>) -> ContentId {
        let id = {
            let mut next_id = self.next_content_id.lock().unwrap();
            let id = ContentId::new(*next_id);
            *next_id += 1;
            id
        };
        self.contents.lock().unwrap().insert(id, content);
        id
    }

    fn current_timestamp() -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
    }

    fn get_node_clone(&self, node_id: NodeId) -> FsResult<Node> {
        let nodes = self.nodes.lock().unwrap();
        nodes.get(&node_id).cloned().ok_or(FsError::NotFound)
    }

    // ---- permission evaluation -------------------------------------------

    /// Pure decision over mode bits and requester identity: selects the
    /// owner/group/other bit class and requires every requested bit.
    fn allowed_for_user(
        &self,
        node: &Node,
        creds: &Credentials,
        want_read: bool,
        want_write: bool,
        want_exec: bool,
    ) -> bool {
        if !self.config.security.enforce_posix_permissions {
            return true;
        }
        if self.config.security.root_bypass_permissions && creds.uid == 0 {
            // Root bypasses everything except execute on a plain file with
            // no execute bit anywhere.
            return !want_exec || node.is_directory() || (node.mode & 0o111) != 0;
        }

        let (r_bit, w_bit, x_bit) = if creds.uid == node.uid {
            (0o400, 0o200, 0o100)
        } else if creds.in_group(node.gid) {
            (0o040, 0o020, 0o010)
        } else {
            (0o004, 0o002, 0o001)
        };

        let mode = node.mode;
        let allow_r = !want_read || (mode & r_bit) != 0;
        let allow_w = !want_write || (mode & w_bit) != 0;
        let allow_x = !want_exec || (mode & x_bit) != 0;
        allow_r && allow_w && allow_x
    }

    fn check_node_access(
        &self,
        node: &Node,
        creds: &Credentials,
        want_read: bool,
        want_write: bool,
        want_exec: bool,
    ) -> FsResult<()> {
        if self.allowed_for_user(node, creds, want_read, want_write, want_exec) {
            Ok(())
        } else {
            Err(FsError::PermissionDenied)
        }
    }

    /// Entry mutation check: w+x on the directory, plus sticky-bit
    /// restriction to root, the directory owner, or the entry owner.
    fn check_dir_permissions(
        &self,
        creds: &Credentials,
        dir: &Node,
        child: Option<&Node>,
    ) -> FsResult<()> {
        if !self.config.security.enforce_posix_permissions {
            return Ok(());
        }
        self.check_node_access(dir, creds, false, true, true)?;

        if let Some(child_node) = child {
            let sticky = (dir.mode & libc::S_ISVTX as u32) != 0;
            if sticky
                && creds.uid != 0
                && creds.uid != dir.uid
                && creds.uid != child_node.uid
            {
                return Err(FsError::PermissionDenied);
            }
        }
        Ok(())
    }

    /// POSIX `access(2)` analog over a path
    pub fn access(
        &self,
        creds: &Credentials,
        path: &Path,
        read: bool,
        write: bool,
        exec: bool,
    ) -> FsResult<()> {
        let resolved = self.resolve(creds, path, true)?;
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(&resolved.id).ok_or(FsError::NotFound)?;
        self.check_node_access(node, creds, read, write, exec)
    }

    // ---- path resolution -------------------------------------------------

    fn segments(path: &Path) -> FsResult<VecDeque<String>> {
        let text = path.to_str().ok_or(FsError::InvalidArgument)?;
        Ok(text
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Walk `path` from the root. `.` and `..` are pure navigation; `..`
    /// moves to the parent of the current resolved directory and the root
    /// is its own parent. A symlink in a non-final position (or a final one
    /// when `follow_final` is set) substitutes its target and counts one
    /// hop; exceeding the configured bound fails with TooManySymlinks
    /// whether or not a true cycle exists.
    fn resolve(
        &self,
        creds: &Credentials,
        path: &Path,
        follow_final: bool,
    ) -> FsResult<ResolvedPath> {
        let nodes = self.nodes.lock().unwrap();
        let mut queue = Self::segments(path)?;
        let mut cur = self.root_id;
        let mut hops = 0u32;

        while let Some(segment) = queue.pop_front() {
            let is_last = queue.is_empty();
            match segment.as_str() {
                "." => continue,
                ".." => {
                    let node = nodes.get(&cur).ok_or(FsError::NotFound)?;
                    cur = node.parent.unwrap_or(self.root_id);
                }
                name => {
                    let dir = nodes.get(&cur).ok_or(FsError::NotFound)?;
                    let children = match &dir.kind {
                        NodeKind::Directory { children } => children,
                        _ => return Err(FsError::NotADirectory),
                    };
                    self.check_node_access(dir, creds, false, false, true)?;

                    let child_id = *children.get(name).ok_or(FsError::NotFound)?;
                    let child = nodes.get(&child_id).ok_or(FsError::NotFound)?;

                    if let NodeKind::Symlink { target } = &child.kind {
                        if !is_last || follow_final {
                            hops += 1;
                            if hops > self.config.resolution.max_symlink_hops {
                                return Err(FsError::TooManySymlinks);
                            }
                            if target.starts_with('/') {
                                cur = self.root_id;
                            }
                            for part in target.split('/').filter(|s| !s.is_empty()).rev() {
                                queue.push_front(part.to_string());
                            }
                            continue;
                        }
                    }

                    if is_last {
                        return Ok(ResolvedPath {
                            id: child_id,
                            parent: Some((cur, name.to_string())),
                        });
                    }
                    if !child.is_directory() {
                        return Err(FsError::NotADirectory);
                    }
                    cur = child_id;
                }
            }
        }

        // The path drained at a directory: `/`, a trailing `.`/`..`, or a
        // symlink chain that landed on one.
        let parent = Self::parent_entry(&nodes, cur);
        Ok(ResolvedPath { id: cur, parent })
    }

    /// Reverse lookup of a node's own directory entry via the weak parent
    /// back-reference. Root has none.
    fn parent_entry(nodes: &HashMap<NodeId, Node>, id: NodeId) -> Option<(NodeId, String)> {
        let parent_id = nodes.get(&id)?.parent?;
        let parent = nodes.get(&parent_id)?;
        let name = parent
            .children()?
            .iter()
            .find(|(_, child_id)| **child_id == id)
            .map(|(name, _)| name.clone())?;
        Some((parent_id, name))
    }

    /// Canonical absolute path of the node `path` resolves to, with
    /// symlinks followed and `.`/`..` folded away
    pub fn realpath(&self, creds: &Credentials, path: &Path) -> FsResult<PathBuf> {
        let resolved = self.resolve(creds, path, true)?;
        Ok(self.path_for_node(resolved.id))
    }

    /// Full path of a live node, reconstructed from parent back-references
    pub(crate) fn path_for_node(&self, id: NodeId) -> PathBuf {
        let nodes = self.nodes.lock().unwrap();
        let mut parts = Vec::new();
        let mut cur = id;
        while let Some((parent_id, name)) = Self::parent_entry(&nodes, cur) {
            parts.push(name);
            cur = parent_id;
        }
        let mut path = PathBuf::from("/");
        for part in parts.iter().rev() {
            path.push(part);
        }
        path
    }

    // ---- quota accounting ------------------------------------------------

    /// Directories with quota scopes governing `start`, nearest first.
    /// `start` itself is included when it is a scoped directory.
    fn governing_scopes(
        nodes: &HashMap<NodeId, Node>,
        quotas: &HashMap<NodeId, Quota>,
        start: NodeId,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = Some(start);
        while let Some(id) = cur {
            if quotas.contains_key(&id) {
                out.push(id);
            }
            cur = nodes.get(&id).and_then(|node| node.parent);
        }
        out
    }

    /// Verify `delta` bytes of growth against every governing scope, then
    /// commit to all of them. Nothing is charged on rejection.
    fn charge_quota(&self, start: NodeId, delta: u64) -> FsResult<()> {
        if delta == 0 {
            return Ok(());
        }
        let nodes = self.nodes.lock().unwrap();
        let mut quotas = self.quotas.lock().unwrap();
        let scopes = Self::governing_scopes(&nodes, &quotas, start);
        for id in &scopes {
            if !quotas[id].fits(delta) {
                warn!(delta, scope = id.0, "quota charge rejected");
                return Err(FsError::QuotaExceeded);
            }
        }
        for id in &scopes {
            quotas.get_mut(id).unwrap().charge(delta);
        }
        Ok(())
    }

    fn release_quota(&self, start: NodeId, delta: u64) {
        if delta == 0 {
            return;
        }
        let nodes = self.nodes.lock().unwrap();
        let mut quotas = self.quotas.lock().unwrap();
        let scopes = Self::governing_scopes(&nodes, &quotas, start);
        for id in &scopes {
            quotas.get_mut(id).unwrap().release(delta);
        }
    }

    /// Move `bytes` of accounted usage from one parent chain to another
    /// without mutating scopes common to both. Nothing changes on rejection.
    fn rescope_quota(&self, from_parent: NodeId, to_parent: NodeId, bytes: u64) -> FsResult<()> {
        if bytes == 0 {
            return Ok(());
        }
        let nodes = self.nodes.lock().unwrap();
        let mut quotas = self.quotas.lock().unwrap();
        let src = Self::governing_scopes(&nodes, &quotas, from_parent);
        let dst = Self::governing_scopes(&nodes, &quotas, to_parent);

        for id in dst.iter().filter(|id| !src.contains(id)) {
            if !quotas[id].fits(bytes) {
                warn!(bytes, scope = id.0, "rename rejected by destination quota");
                return Err(FsError::QuotaExceeded);
            }
        }
        for id in dst.iter().filter(|id| !src.contains(id)) {
            quotas.get_mut(id).unwrap().charge(bytes);
        }
        for id in src.iter().filter(|id| !dst.contains(id)) {
            quotas.get_mut(id).unwrap().release(bytes);
        }
        Ok(())
    }

    /// Attach a quota scope to a directory. Usage is initialized to the
    /// live aggregate size below it; a limit under that value simply
    /// forbids any further growth.
    pub fn set_quota(&self, creds: &Credentials, path: &Path, limit: Option<u64>) -> FsResult<()> {
        let resolved = self.resolve(creds, path, true)?;
        if !self.get_node_clone(resolved.id)?.is_directory() {
            return Err(FsError::NotADirectory);
        }
        let used = self.subtree_size(resolved.id);
        let mut quota = Quota::new(limit);
        quota.charge(used);
        self.quotas.lock().unwrap().insert(resolved.id, quota);
        debug!(path = %path.display(), ?limit, used, "quota scope attached");
        Ok(())
    }

    /// Inspect the quota scope attached to a directory
    pub fn quota(&self, creds: &Credentials, path: &Path) -> FsResult<Quota> {
        let resolved = self.resolve(creds, path, true)?;
        self.quotas
            .lock()
            .unwrap()
            .get(&resolved.id)
            .copied()
            .ok_or(FsError::NotFound)
    }

    // ---- tree structure --------------------------------------------------

    /// Link a detached node into a directory. Attaching a node that already
    /// has a parent is a structural invariant violation and panics.
    fn attach_child(&self, parent_id: NodeId, name: &str, child_id: NodeId) -> FsResult<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let child = nodes.get(&child_id).expect("attach of unknown node");
        assert!(
            child.parent.is_none(),
            "node is already attached to a directory"
        );

        let now = Self::current_timestamp();
        let parent = nodes.get_mut(&parent_id).ok_or(FsError::NotFound)?;
        let children = parent.children_mut().ok_or(FsError::NotADirectory)?;
        if children.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }
        children.insert(name.to_string(), child_id);
        parent.times.mtime = now;
        parent.times.ctime = now;

        nodes.get_mut(&child_id).unwrap().parent = Some(parent_id);
        Ok(())
    }

    fn detach_child(&self, parent_id: NodeId, name: &str) -> FsResult<NodeId> {
        let mut nodes = self.nodes.lock().unwrap();
        let now = Self::current_timestamp();
        let parent = nodes.get_mut(&parent_id).ok_or(FsError::NotFound)?;
        let children = parent.children_mut().ok_or(FsError::NotADirectory)?;
        let child_id = children.shift_remove(name).ok_or(FsError::NotFound)?;
        parent.times.mtime = now;
        parent.times.ctime = now;

        nodes.get_mut(&child_id).unwrap().parent = None;
        Ok(child_id)
    }

    fn new_node(&self, creds: &Credentials, kind: NodeKind, mode: u32) -> NodeId {
        let node_id = self.allocate_node_id();
        let now = Self::current_timestamp();
        let node = Node {
            id: node_id,
            kind,
            times: FileTimes {
                atime: now,
                mtime: now,
                ctime: now,
            },
            mode: mode & 0o7777,
            uid: creds.uid,
            gid: creds.gid,
            parent: None,
        };
        self.nodes.lock().unwrap().insert(node_id, node);
        node_id
    }

    /// Validate that `path` names a new entry: the final segment must be
    /// free and its parent an existing, writable directory.
    fn locate_new_entry(&self, creds: &Credentials, path: &Path) -> FsResult<(NodeId, String)> {
        if self.resolve(creds, path, false).is_ok() {
            return Err(FsError::AlreadyExists);
        }
        let parent_path = path.parent().ok_or(FsError::InvalidArgument)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(FsError::InvalidArgument)?;

        let parent = self.resolve(creds, parent_path, true)?;
        let nodes = self.nodes.lock().unwrap();
        let parent_node = nodes.get(&parent.id).ok_or(FsError::NotFound)?;
        if !parent_node.is_directory() {
            return Err(FsError::NotADirectory);
        }
        self.check_node_access(parent_node, creds, false, true, true)?;
        Ok((parent.id, name.to_string()))
    }

    /// Sum of content bytes stored at and below `root`
    fn subtree_size(&self, root: NodeId) -> u64 {
        let nodes = self.nodes.lock().unwrap();
        let contents = self.contents.lock().unwrap();
        let mut total = 0u64;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = nodes.get(&id) else { continue };
            if let Some(content_id) = node.content_id() {
                if let Some(content) = contents.get(&content_id) {
                    total += content.size();
                }
            }
            if let Some(children) = node.children() {
                stack.extend(children.values().copied());
            }
        }
        total
    }

    /// Remove a detached subtree from the arena, releasing owned contents
    /// and any quota scopes attached inside it. Returns the content bytes
    /// released. Release is synchronous: there is no deferred collection.
    fn remove_subtree(&self, root: NodeId) -> u64 {
        let ids = {
            let nodes = self.nodes.lock().unwrap();
            let mut ids = Vec::new();
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                ids.push(id);
                if let Some(children) = nodes.get(&id).and_then(|node| node.children()) {
                    stack.extend(children.values().copied());
                }
            }
            ids
        };

        let mut nodes = self.nodes.lock().unwrap();
        let mut contents = self.contents.lock().unwrap();
        let mut quotas = self.quotas.lock().unwrap();
        let mut released = 0u64;
        for id in ids {
            if let Some(node) = nodes.remove(&id) {
                if let Some(content_id) = node.content_id() {
                    if let Some(content) = contents.remove(&content_id) {
                        released += content.size();
                    }
                }
            }
            quotas.remove(&id);
        }
        released
    }

    fn touch_content_times(&self, node_id: NodeId) {
        let mut nodes = self.nodes.lock().unwrap();
        if let Some(node) = nodes.get_mut(&node_id) {
            let now = Self::current_timestamp();
            node.times.mtime = now;
            node.times.ctime = now;
        }
    }

    fn touch_atime(&self, node_id: NodeId) {
        let mut nodes = self.nodes.lock().unwrap();
        if let Some(node) = nodes.get_mut(&node_id) {
            node.times.atime = Self::current_timestamp();
        }
    }

    // ---- creation operations ---------------------------------------------

    /// Create a regular file with the given initial bytes
    pub fn create_file(&self, creds: &Credentials, path: &Path, data: &[u8]) -> FsResult<()> {
        self.create_file_with(creds, path, Box::new(BufferContent::with_bytes(data)))
    }

    /// Create a file that declares `size` bytes without allocating storage
    pub fn create_sparse_file(&self, creds: &Credentials, path: &Path, size: u64) -> FsResult<()> {
        self.create_file_with(creds, path, Box::new(SparseContent::new(size)))
    }

    /// Create a regular file around a caller-supplied content strategy.
    /// The declared size is charged against every governing quota before
    /// anything is created.
    pub fn create_file_with(
        &self,
        creds: &Credentials,
        path: &Path,
        content: Box<dyn Content>,
    ) -> FsResult<()> {
        let (parent_id, name) = self.locate_new_entry(creds, path)?;
        self.charge_quota(parent_id, content.size())?;

        let content_id = self.allocate_content(content);
        let node_id = self.new_node(creds, NodeKind::File { content: content_id }, 0o644);
        self.attach_child(parent_id, &name, node_id)?;
        debug!(path = %path.display(), "file created");

        #[cfg(feature = "events")]
        self.emit_event(EventKind::Created {
            path: path.to_string_lossy().to_string(),
        });
        Ok(())
    }

    pub fn mkdir(&self, creds: &Credentials, path: &Path, mode: u32) -> FsResult<()> {
        let (parent_id, name) = self.locate_new_entry(creds, path)?;
        let node_id = self.new_node(
            creds,
            NodeKind::Directory {
                children: IndexMap::new(),
            },
            mode,
        );
        self.attach_child(parent_id, &name, node_id)?;
        debug!(path = %path.display(), "mkdir");

        #[cfg(feature = "events")]
        self.emit_event(EventKind::Created {
            path: path.to_string_lossy().to_string(),
        });
        Ok(())
    }

    /// Create a symbolic link. The target is stored verbatim and resolved
    /// lazily; a dangling target is valid until traversed.
    pub fn symlink(&self, creds: &Credentials, target: &str, path: &Path) -> FsResult<()> {
        let (parent_id, name) = self.locate_new_entry(creds, path)?;
        let node_id = self.new_node(
            creds,
            NodeKind::Symlink {
                target: target.to_string(),
            },
            0o777,
        );
        self.attach_child(parent_id, &name, node_id)?;
        debug!(path = %path.display(), target, "symlink created");

        #[cfg(feature = "events")]
        self.emit_event(EventKind::Created {
            path: path.to_string_lossy().to_string(),
        });
        Ok(())
    }

    /// Create a block-device node. Content behaves exactly like a file's;
    /// the kind tag differs for traversal and display.
    pub fn mknod(&self, creds: &Credentials, path: &Path, mode: u32) -> FsResult<()> {
        let (parent_id, name) = self.locate_new_entry(creds, path)?;
        let content_id = self.allocate_content(Box::new(BufferContent::new()));
        let node_id = self.new_node(creds, NodeKind::BlockDevice { content: content_id }, mode);
        self.attach_child(parent_id, &name, node_id)?;
        debug!(path = %path.display(), "block device created");

        #[cfg(feature = "events")]
        self.emit_event(EventKind::Created {
            path: path.to_string_lossy().to_string(),
        });
        Ok(())
    }

    // ---- removal operations ----------------------------------------------

    pub fn unlink(&self, creds: &Credentials, path: &Path) -> FsResult<()> {
        let resolved = self.resolve(creds, path, false)?;
        let Some((parent_id, name)) = resolved.parent else {
            return Err(FsError::InvalidArgument);
        };
        let node = self.get_node_clone(resolved.id)?;
        if node.is_directory() {
            return Err(FsError::IsADirectory);
        }
        {
            let nodes = self.nodes.lock().unwrap();
            let parent_node = nodes.get(&parent_id).ok_or(FsError::NotFound)?;
            self.check_dir_permissions(creds, parent_node, Some(&node))?;
        }

        self.detach_child(parent_id, &name)?;
        let released = self.remove_subtree(resolved.id);
        self.release_quota(parent_id, released);
        debug!(path = %path.display(), released, "unlink");

        #[cfg(feature = "events")]
        self.emit_event(EventKind::Removed {
            path: path.to_string_lossy().to_string(),
        });
        Ok(())
    }

    /// Remove a directory. A non-empty directory is rejected with
    /// DirectoryNotEmpty unless `recursive` is set, in which case the whole
    /// subtree is released and quota usage drops by exactly its size.
    pub fn rmdir(&self, creds: &Credentials, path: &Path, recursive: bool) -> FsResult<()> {
        let resolved = self.resolve(creds, path, false)?;
        let Some((parent_id, name)) = resolved.parent else {
            return Err(FsError::InvalidArgument);
        };
        let node = self.get_node_clone(resolved.id)?;
        let children = node.children().ok_or(FsError::NotADirectory)?;
        if !children.is_empty() && !recursive {
            return Err(FsError::DirectoryNotEmpty);
        }
        {
            let nodes = self.nodes.lock().unwrap();
            let parent_node = nodes.get(&parent_id).ok_or(FsError::NotFound)?;
            self.check_dir_permissions(creds, parent_node, Some(&node))?;
        }

        self.detach_child(parent_id, &name)?;
        let released = self.remove_subtree(resolved.id);
        self.release_quota(parent_id, released);
        debug!(path = %path.display(), released, recursive, "rmdir");

        #[cfg(feature = "events")]
        self.emit_event(EventKind::Removed {
            path: path.to_string_lossy().to_string(),
        });
        Ok(())
    }

    /// Move an entry. The destination must not exist; moving a directory
    /// below itself is rejected. Quota usage is re-scoped atomically when
    /// the move crosses quota boundaries.
    pub fn rename(&self, creds: &Credentials, src: &Path, dst: &Path) -> FsResult<()> {
        if src == dst {
            return Ok(());
        }
        let source = self.resolve(creds, src, false)?;
        let Some((src_parent_id, src_name)) = source.parent else {
            return Err(FsError::InvalidArgument);
        };
        match self.resolve(creds, dst, false) {
            Ok(_) => return Err(FsError::AlreadyExists),
            Err(FsError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let dst_parent_path = dst.parent().ok_or(FsError::InvalidArgument)?;
        let dst_name = dst
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(FsError::InvalidArgument)?;
        let dest_parent = self.resolve(creds, dst_parent_path, true)?;

        let node = self.get_node_clone(source.id)?;
        if node.is_directory() && self.is_self_or_ancestor(source.id, dest_parent.id) {
            return Err(FsError::InvalidArgument);
        }
        {
            let nodes = self.nodes.lock().unwrap();
            let src_parent = nodes.get(&src_parent_id).ok_or(FsError::NotFound)?;
            self.check_dir_permissions(creds, src_parent, Some(&node))?;
            let dst_parent = nodes.get(&dest_parent.id).ok_or(FsError::NotFound)?;
            if !dst_parent.is_directory() {
                return Err(FsError::NotADirectory);
            }
            self.check_node_access(dst_parent, creds, false, true, true)?;
        }

        let moved_bytes = self.subtree_size(source.id);
        self.rescope_quota(src_parent_id, dest_parent.id, moved_bytes)?;

        self.detach_child(src_parent_id, &src_name)?;
        self.attach_child(dest_parent.id, dst_name, source.id)?;
        self.touch_ctime(source.id);
        debug!(src = %src.display(), dst = %dst.display(), "rename");

        #[cfg(feature = "events")]
        self.emit_event(EventKind::Renamed {
            from: src.to_string_lossy().to_string(),
            to: dst.to_string_lossy().to_string(),
        });
        Ok(())
    }

    fn is_self_or_ancestor(&self, candidate: NodeId, start: NodeId) -> bool {
        let nodes = self.nodes.lock().unwrap();
        let mut cur = Some(start);
        while let Some(id) = cur {
            if id == candidate {
                return true;
            }
            cur = nodes.get(&id).and_then(|node| node.parent);
        }
        false
    }

    fn touch_ctime(&self, node_id: NodeId) {
        let mut nodes = self.nodes.lock().unwrap();
        if let Some(node) = nodes.get_mut(&node_id) {
            node.times.ctime = Self::current_timestamp();
        }
    }

    // ---- handle operations -----------------------------------------------

    /// Open a file or directory. Final symlinks are followed. A missing
    /// file is created when `create` is set; `truncate` discards existing
    /// content and releases its quota usage.
    pub fn open(&self, creds: &Credentials, path: &Path, opts: &OpenOptions) -> FsResult<HandleId> {
        if !opts.read && !opts.write {
            return Err(FsError::InvalidArgument);
        }
        if (opts.create || opts.truncate || opts.append) && !opts.write {
            return Err(FsError::InvalidArgument);
        }

        let node_id = match self.resolve(creds, path, true) {
            Ok(resolved) => resolved.id,
            Err(FsError::NotFound) if opts.create => {
                let (parent_id, name) = self.locate_new_entry(creds, path)?;
                let content_id = self.allocate_content(Box::new(BufferContent::new()));
                let node_id = self.new_node(creds, NodeKind::File { content: content_id }, 0o644);
                self.attach_child(parent_id, &name, node_id)?;
                #[cfg(feature = "events")]
                self.emit_event(EventKind::Created {
                    path: path.to_string_lossy().to_string(),
                });
                node_id
            }
            Err(e) => return Err(e),
        };

        let node = self.get_node_clone(node_id)?;
        let handle_kind = match &node.kind {
            NodeKind::Directory { .. } => {
                if opts.write {
                    return Err(FsError::IsADirectory);
                }
                self.check_node_access(&node, creds, true, false, false)?;
                let entries = {
                    let nodes = self.nodes.lock().unwrap();
                    self.snapshot_entries(&nodes, node_id)?
                };
                self.touch_atime(node_id);
                HandleType::Directory {
                    position: 0,
                    entries,
                }
            }
            NodeKind::File { .. } | NodeKind::BlockDevice { .. } => {
                self.check_node_access(&node, creds, opts.read, opts.write, false)?;
                if opts.truncate {
                    let content_id = Self::file_content_id(&node)?;
                    let old_size = {
                        let mut contents = self.contents.lock().unwrap();
                        let content = contents.get_mut(&content_id).ok_or(FsError::NotFound)?;
                        let old = content.size();
                        content.truncate(0);
                        old
                    };
                    self.release_quota(node_id, old_size);
                    self.touch_content_times(node_id);
                }
                HandleType::File {
                    options: opts.clone(),
                    cursor: 0,
                }
            }
            NodeKind::Symlink { .. } => return Err(FsError::TooManySymlinks),
        };

        let handle_id = self.allocate_handle_id();
        let handle = Handle {
            node_id,
            path: path.to_path_buf(),
            kind: handle_kind,
        };
        self.handles.lock().unwrap().insert(handle_id, handle);
        Ok(handle_id)
    }

    pub fn close(&self, handle_id: HandleId) -> FsResult<()> {
        self.handles
            .lock()
            .unwrap()
            .remove(&handle_id)
            .map(|_| ())
            .ok_or(FsError::InvalidArgument)
    }

    fn handle_file_node(&self, handle_id: HandleId) -> FsResult<(NodeId, OpenOptions)> {
        let handles = self.handles.lock().unwrap();
        let handle = handles.get(&handle_id).ok_or(FsError::InvalidArgument)?;
        match &handle.kind {
            HandleType::File { options, .. } => Ok((handle.node_id, options.clone())),
            HandleType::Directory { .. } => Err(FsError::InvalidArgument),
        }
    }

    #[cfg(feature = "events")]
    fn handle_path(&self, handle_id: HandleId) -> FsResult<PathBuf> {
        let handles = self.handles.lock().unwrap();
        Ok(handles
            .get(&handle_id)
            .ok_or(FsError::InvalidArgument)?
            .path
            .clone())
    }

    fn handle_cursor(&self, handle_id: HandleId) -> FsResult<u64> {
        let handles = self.handles.lock().unwrap();
        match &handles.get(&handle_id).ok_or(FsError::InvalidArgument)?.kind {
            HandleType::File { cursor, .. } => Ok(*cursor),
            HandleType::Directory { .. } => Err(FsError::InvalidArgument),
        }
    }

    fn set_handle_cursor(&self, handle_id: HandleId, position: u64) {
        let mut handles = self.handles.lock().unwrap();
        if let Some(handle) = handles.get_mut(&handle_id) {
            if let HandleType::File { cursor, .. } = &mut handle.kind {
                *cursor = position;
            }
        }
    }

    fn file_content_id(node: &Node) -> FsResult<ContentId> {
        match &node.kind {
            NodeKind::File { content } | NodeKind::BlockDevice { content } => Ok(*content),
            NodeKind::Directory { .. } => Err(FsError::IsADirectory),
            NodeKind::Symlink { .. } => Err(FsError::InvalidArgument),
        }
    }

    fn content_size_of(&self, node_id: NodeId) -> FsResult<u64> {
        let content_id = {
            let nodes = self.nodes.lock().unwrap();
            let node = nodes.get(&node_id).ok_or(FsError::NotFound)?;
            Self::file_content_id(node)?
        };
        let contents = self.contents.lock().unwrap();
        Ok(contents.get(&content_id).ok_or(FsError::NotFound)?.size())
    }

    /// Read at the handle cursor, advancing it by the bytes returned
    pub fn read(&self, creds: &Credentials, handle_id: HandleId, buf: &mut [u8]) -> FsResult<usize> {
        let offset = self.handle_cursor(handle_id)?;
        let count = self.read_at(creds, handle_id, offset, buf)?;
        self.set_handle_cursor(handle_id, offset + count as u64);
        Ok(count)
    }

    /// Read at an explicit offset without touching the cursor. Reading past
    /// the declared size returns 0 bytes, never an error.
    pub fn read_at(
        &self,
        creds: &Credentials,
        handle_id: HandleId,
        offset: u64,
        buf: &mut [u8],
    ) -> FsResult<usize> {
        let (node_id, options) = self.handle_file_node(handle_id)?;
        if !options.read {
            return Err(FsError::PermissionDenied);
        }
        let content_id = {
            let nodes = self.nodes.lock().unwrap();
            let node = nodes.get(&node_id).ok_or(FsError::NotFound)?;
            self.check_node_access(node, creds, true, false, false)?;
            Self::file_content_id(node)?
        };
        let count = {
            let contents = self.contents.lock().unwrap();
            contents
                .get(&content_id)
                .ok_or(FsError::NotFound)?
                .read(offset, buf)
        };
        self.touch_atime(node_id);
        Ok(count)
    }

    /// Write at the handle cursor (at the end in append mode), advancing it
    pub fn write(&self, creds: &Credentials, handle_id: HandleId, data: &[u8]) -> FsResult<usize> {
        let (node_id, options) = self.handle_file_node(handle_id)?;
        if !options.write {
            return Err(FsError::PermissionDenied);
        }
        let offset = if options.append {
            self.content_size_of(node_id)?
        } else {
            self.handle_cursor(handle_id)?
        };
        let written = self.write_at(creds, handle_id, offset, data)?;
        self.set_handle_cursor(handle_id, offset + written as u64);
        Ok(written)
    }

    /// Write at an explicit offset. Growth past the current size is
    /// authorized by every governing quota scope before any byte moves; on
    /// rejection neither content nor accounting changes.
    pub fn write_at(
        &self,
        creds: &Credentials,
        handle_id: HandleId,
        offset: u64,
        data: &[u8],
    ) -> FsResult<usize> {
        let (node_id, options) = self.handle_file_node(handle_id)?;
        if !options.write {
            return Err(FsError::PermissionDenied);
        }
        let content_id = {
            let nodes = self.nodes.lock().unwrap();
            let node = nodes.get(&node_id).ok_or(FsError::NotFound)?;
            self.check_node_access(node, creds, false, true, false)?;
            Self::file_content_id(node)?
        };

        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(FsError::InvalidArgument)?;
        let old_size = {
            let contents = self.contents.lock().unwrap();
            contents.get(&content_id).ok_or(FsError::NotFound)?.size()
        };
        self.charge_quota(node_id, end.saturating_sub(old_size))?;

        let written = {
            let mut contents = self.contents.lock().unwrap();
            contents
                .get_mut(&content_id)
                .ok_or(FsError::NotFound)?
                .write(offset, data)
        };
        self.touch_content_times(node_id);

        #[cfg(feature = "events")]
        if written > 0 {
            let path = self.handle_path(handle_id)?;
            self.emit_event(EventKind::Modified {
                path: path.to_string_lossy().to_string(),
            });
        }
        Ok(written)
    }

    /// Reposition the handle cursor. Seeking before byte 0 is rejected;
    /// seeking past the end is allowed and materializes only on write.
    pub fn seek(&self, handle_id: HandleId, pos: SeekFrom) -> FsResult<u64> {
        let (node_id, _) = self.handle_file_node(handle_id)?;
        let size = self.content_size_of(node_id)?;

        let mut handles = self.handles.lock().unwrap();
        let handle = handles.get_mut(&handle_id).ok_or(FsError::InvalidArgument)?;
        let HandleType::File { cursor, .. } = &mut handle.kind else {
            return Err(FsError::InvalidArgument);
        };
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(*cursor) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(size) + i128::from(delta),
        };
        if target < 0 || target > i128::from(u64::MAX) {
            return Err(FsError::InvalidArgument);
        }
        *cursor = target as u64;
        Ok(*cursor)
    }

    /// Resize content to exactly `size`. Growth is quota-gated and
    /// zero-filled; shrink always succeeds and releases usage immediately.
    pub fn truncate(&self, creds: &Credentials, handle_id: HandleId, size: u64) -> FsResult<()> {
        let (node_id, options) = self.handle_file_node(handle_id)?;
        if !options.write {
            return Err(FsError::PermissionDenied);
        }
        let content_id = {
            let nodes = self.nodes.lock().unwrap();
            let node = nodes.get(&node_id).ok_or(FsError::NotFound)?;
            self.check_node_access(node, creds, false, true, false)?;
            Self::file_content_id(node)?
        };
        let old_size = {
            let contents = self.contents.lock().unwrap();
            contents.get(&content_id).ok_or(FsError::NotFound)?.size()
        };

        if size > old_size {
            self.charge_quota(node_id, size - old_size)?;
        }
        {
            let mut contents = self.contents.lock().unwrap();
            contents
                .get_mut(&content_id)
                .ok_or(FsError::NotFound)?
                .truncate(size);
        }
        if size < old_size {
            self.release_quota(node_id, old_size - size);
        }
        self.touch_content_times(node_id);

        #[cfg(feature = "events")]
        {
            let path = self.handle_path(handle_id)?;
            self.emit_event(EventKind::Modified {
                path: path.to_string_lossy().to_string(),
            });
        }
        Ok(())
    }

    // ---- directory listing -----------------------------------------------

    fn dir_entry_for(
        &self,
        nodes: &HashMap<NodeId, Node>,
        name: &str,
        node_id: NodeId,
    ) -> FsResult<DirEntry> {
        let node = nodes.get(&node_id).ok_or(FsError::NotFound)?;
        let len = match node.content_id() {
            Some(content_id) => {
                let contents = self.contents.lock().unwrap();
                contents.get(&content_id).map(|c| c.size()).unwrap_or(0)
            }
            None => match &node.kind {
                NodeKind::Symlink { target } => target.len() as u64,
                _ => 0,
            },
        };
        Ok(DirEntry {
            name: name.to_string(),
            kind: node.file_type(),
            len,
        })
    }

    /// Entries of a directory with `.` and `..` synthesized in front; dot
    /// entries exist only at this boundary, never in the tree.
    fn snapshot_entries(
        &self,
        nodes: &HashMap<NodeId, Node>,
        dir_id: NodeId,
    ) -> FsResult<Vec<DirEntry>> {
        let dir = nodes.get(&dir_id).ok_or(FsError::NotFound)?;
        let children = dir.children().ok_or(FsError::NotADirectory)?;

        let mut entries = Vec::with_capacity(children.len() + 2);
        entries.push(DirEntry {
            name: ".".to_string(),
            kind: FileType::Directory,
            len: 0,
        });
        entries.push(DirEntry {
            name: "..".to_string(),
            kind: FileType::Directory,
            len: 0,
        });
        for (name, child_id) in children {
            entries.push(self.dir_entry_for(nodes, name, *child_id)?);
        }
        Ok(entries)
    }

    /// Next entry of an open directory handle; the sequence is restartable
    /// via `rewinddir` and immune to concurrent tree mutation.
    pub fn readdir(&self, handle_id: HandleId) -> FsResult<Option<DirEntry>> {
        let mut handles = self.handles.lock().unwrap();
        let handle = handles.get_mut(&handle_id).ok_or(FsError::InvalidArgument)?;
        match &mut handle.kind {
            HandleType::Directory { position, entries } => {
                if *position >= entries.len() {
                    Ok(None)
                } else {
                    let entry = entries[*position].clone();
                    *position += 1;
                    Ok(Some(entry))
                }
            }
            HandleType::File { .. } => Err(FsError::NotADirectory),
        }
    }

    pub fn rewinddir(&self, handle_id: HandleId) -> FsResult<()> {
        let mut handles = self.handles.lock().unwrap();
        let handle = handles.get_mut(&handle_id).ok_or(FsError::InvalidArgument)?;
        match &mut handle.kind {
            HandleType::Directory { position, .. } => {
                *position = 0;
                Ok(())
            }
            HandleType::File { .. } => Err(FsError::NotADirectory),
        }
    }

    /// One-shot listing of a directory path, dot entries included
    pub fn readdir_path(&self, creds: &Credentials, path: &Path) -> FsResult<Vec<DirEntry>> {
        let resolved = self.resolve(creds, path, true)?;
        let entries = {
            let nodes = self.nodes.lock().unwrap();
            let node = nodes.get(&resolved.id).ok_or(FsError::NotFound)?;
            if !node.is_directory() {
                return Err(FsError::NotADirectory);
            }
            self.check_node_access(node, creds, true, false, false)?;
            self.snapshot_entries(&nodes, resolved.id)?
        };
        self.touch_atime(resolved.id);
        Ok(entries)
    }

    // ---- metadata operations ---------------------------------------------

    fn attributes_of(&self, node_id: NodeId) -> FsResult<Attributes> {
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(&node_id).ok_or(FsError::NotFound)?;
        let len = match &node.kind {
            NodeKind::File { content } | NodeKind::BlockDevice { content } => {
                let contents = self.contents.lock().unwrap();
                contents.get(content).map(|c| c.size()).unwrap_or(0)
            }
            NodeKind::Symlink { target } => target.len() as u64,
            NodeKind::Directory { .. } => 0,
        };
        Ok(Attributes {
            kind: node.file_type(),
            len,
            times: node.times,
            uid: node.uid,
            gid: node.gid,
            mode: node.mode,
            mode_user: FileMode::from_bits(node.mode, 6),
            mode_group: FileMode::from_bits(node.mode, 3),
            mode_other: FileMode::from_bits(node.mode, 0),
        })
    }

    /// Attributes of the node a path resolves to, following final symlinks
    pub fn getattr(&self, creds: &Credentials, path: &Path) -> FsResult<Attributes> {
        let resolved = self.resolve(creds, path, true)?;
        self.attributes_of(resolved.id)
    }

    /// Attributes without following a final symlink
    pub fn lgetattr(&self, creds: &Credentials, path: &Path) -> FsResult<Attributes> {
        let resolved = self.resolve(creds, path, false)?;
        self.attributes_of(resolved.id)
    }

    /// Read a symbolic link's target. A path naming anything but a symlink
    /// reports NotFound.
    pub fn readlink(&self, creds: &Credentials, path: &Path) -> FsResult<String> {
        let resolved = self.resolve(creds, path, false)?;
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(&resolved.id).ok_or(FsError::NotFound)?;
        match &node.kind {
            NodeKind::Symlink { target } => Ok(target.clone()),
            _ => Err(FsError::NotFound),
        }
    }

    /// Change permission bits (chmod). Only the owner or root may do this.
    pub fn set_mode(&self, creds: &Credentials, path: &Path, mode: u32) -> FsResult<()> {
        let resolved = self.resolve(creds, path, true)?;
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.get_mut(&resolved.id).ok_or(FsError::NotFound)?;
        if self.config.security.enforce_posix_permissions
            && creds.uid != 0
            && creds.uid != node.uid
        {
            return Err(FsError::PermissionDenied);
        }
        node.mode = mode & 0o7777;
        node.times.ctime = Self::current_timestamp();
        drop(nodes);

        #[cfg(feature = "events")]
        self.emit_event(EventKind::Modified {
            path: path.to_string_lossy().to_string(),
        });
        Ok(())
    }

    /// Change ownership (chown). Only root may change the uid; the owner
    /// may change the gid to a group they belong to.
    pub fn set_owner(&self, creds: &Credentials, path: &Path, uid: u32, gid: u32) -> FsResult<()> {
        let resolved = self.resolve(creds, path, true)?;
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.get_mut(&resolved.id).ok_or(FsError::NotFound)?;
        if self.config.security.enforce_posix_permissions && creds.uid != 0 {
            if uid != node.uid {
                return Err(FsError::PermissionDenied);
            }
            if gid != node.gid && (creds.uid != node.uid || !creds.in_group(gid)) {
                return Err(FsError::PermissionDenied);
            }
        }
        node.uid = uid;
        node.gid = gid;
        node.times.ctime = Self::current_timestamp();
        drop(nodes);

        #[cfg(feature = "events")]
        self.emit_event(EventKind::Modified {
            path: path.to_string_lossy().to_string(),
        });
        Ok(())
    }

    /// Change the owning group (chgrp)
    pub fn set_group(&self, creds: &Credentials, path: &Path, gid: u32) -> FsResult<()> {
        let uid = {
            let resolved = self.resolve(creds, path, true)?;
            let nodes = self.nodes.lock().unwrap();
            nodes.get(&resolved.id).ok_or(FsError::NotFound)?.uid
        };
        self.set_owner(creds, path, uid, gid)
    }

    /// Overwrite a node's timestamps
    pub fn set_times(&self, creds: &Credentials, path: &Path, times: FileTimes) -> FsResult<()> {
        let resolved = self.resolve(creds, path, true)?;
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.get_mut(&resolved.id).ok_or(FsError::NotFound)?;
        if self.config.security.enforce_posix_permissions
            && creds.uid != 0
            && creds.uid != node.uid
        {
            return Err(FsError::PermissionDenied);
        }
        node.times = times;
        drop(nodes);

        #[cfg(feature = "events")]
        self.emit_event(EventKind::Modified {
            path: path.to_string_lossy().to_string(),
        });
        Ok(())
    }

    pub fn stats(&self) -> FsStats {
        let nodes = self.nodes.lock().unwrap().len() as u64;
        let open_handles = self.handles.lock().unwrap().len() as u32;
        let bytes_used = {
            let contents = self.contents.lock().unwrap();
            contents.values().map(|content| content.size()).sum()
        };
        FsStats {
            nodes,
            open_handles,
            bytes_used,
        }
    }

    // ---- events ----------------------------------------------------------

    #[cfg(feature = "events")]
    pub fn subscribe_events(&self, sink: Arc<dyn EventSink>) -> SubscriptionId {
        let id = {
            let mut next_id = self.next_subscription_id.lock().unwrap();
            let id = SubscriptionId::new(*next_id);
            *next_id += 1;
            id
        };
        self.event_subscriptions.lock().unwrap().insert(id, sink);
        id
    }

    #[cfg(feature = "events")]
    pub fn unsubscribe_events(&self, id: SubscriptionId) {
        self.event_subscriptions.lock().unwrap().remove(&id);
    }

    #[cfg(feature = "events")]
    fn emit_event(&self, evt: EventKind) {
        let sinks: Vec<Arc<dyn EventSink>> = {
            let subscriptions = self.event_subscriptions.lock().unwrap();
            subscriptions.values().cloned().collect()
        };
        for sink in sinks {
            sink.on_event(&evt);
        }
    }

    // ---- visitor support -------------------------------------------------

    pub(crate) fn resolve_for_visit(
        &self,
        creds: &Credentials,
        path: &Path,
    ) -> FsResult<(NodeId, String)> {
        let resolved = self.resolve(creds, path, false)?;
        let name = match &resolved.parent {
            Some((_, name)) => name.clone(),
            None => "/".to_string(),
        };
        Ok((resolved.id, name))
    }

    pub(crate) fn node_type_of(&self, node_id: NodeId) -> FsResult<FileType> {
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes.get(&node_id).ok_or(FsError::NotFound)?.file_type())
    }

    /// Point-in-time snapshot of a directory's children in listing order
    pub(crate) fn node_children_of(&self, node_id: NodeId) -> FsResult<Vec<(String, NodeId)>> {
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(&node_id).ok_or(FsError::NotFound)?;
        let children = node.children().ok_or(FsError::NotADirectory)?;
        Ok(children
            .iter()
            .map(|(name, id)| (name.clone(), *id))
            .collect())
    }

    pub(crate) fn content_bytes_of(&self, node_id: NodeId) -> FsResult<Vec<u8>> {
        let content_id = {
            let nodes = self.nodes.lock().unwrap();
            let node = nodes.get(&node_id).ok_or(FsError::NotFound)?;
            Self::file_content_id(node)?
        };
        let contents = self.contents.lock().unwrap();
        let content = contents.get(&content_id).ok_or(FsError::NotFound)?;
        let mut buf = vec![0u8; content.size() as usize];
        let count = content.read(0, &mut buf);
        buf.truncate(count);
        Ok(buf)
    }

    pub(crate) fn symlink_target_of(&self, node_id: NodeId) -> FsResult<String> {
        let nodes = self.nodes.lock().unwrap();
        match &nodes.get(&node_id).ok_or(FsError::NotFound)?.kind {
            NodeKind::Symlink { target } => Ok(target.clone()),
            _ => Err(FsError::InvalidArgument),
        }
    }
}
