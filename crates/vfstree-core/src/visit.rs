// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Generic tree traversal with pluggable per-kind behavior
//!
//! Dispatch is a single match on the node's kind; recursion into a
//! directory is the visitor's own, explicit choice, so a visitor may walk
//! depth-first, breadth-first, or stop early. Children are handed out as
//! point-in-time snapshots, and dot entries never appear (they exist only
//! at the readdir boundary).

use std::io::Write;
use std::path::Path;

use serde_json::Value;

use crate::error::FsResult;
use crate::node::NodeId;
use crate::types::{Credentials, FileType};
use crate::vfs::FsCore;

/// One node handed to a visitor callback
pub struct VisitNode<'a> {
    fs: &'a FsCore,
    id: NodeId,
    name: String,
}

impl<'a> VisitNode<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_type(&self) -> FsResult<FileType> {
        self.fs.node_type_of(self.id)
    }

    /// Full content bytes of a file or block device
    pub fn content(&self) -> FsResult<Vec<u8>> {
        self.fs.content_bytes_of(self.id)
    }

    pub fn symlink_target(&self) -> FsResult<String> {
        self.fs.symlink_target_of(self.id)
    }

    /// Snapshot of a directory's children in listing order
    pub fn children(&self) -> FsResult<Vec<VisitNode<'a>>> {
        Ok(self
            .fs
            .node_children_of(self.id)?
            .into_iter()
            .map(|(name, id)| VisitNode {
                fs: self.fs,
                id,
                name,
            })
            .collect())
    }

    /// Dispatch to the callback matching this node's kind
    pub fn accept(&self, visitor: &mut dyn NodeVisitor) -> FsResult<()> {
        match self.file_type()? {
            FileType::File => visitor.visit_file(self),
            FileType::Directory => visitor.visit_directory(self),
            FileType::Symlink => visitor.visit_symlink(self),
            FileType::BlockDevice => visitor.visit_block(self),
        }
    }
}

/// A traversal strategy, dispatched by node kind.
///
/// `visit_directory` is responsible for recursing into children if it
/// wants to; the dispatcher never recurses on its own.
pub trait NodeVisitor {
    fn visit_file(&mut self, file: &VisitNode<'_>) -> FsResult<()>;
    fn visit_directory(&mut self, dir: &VisitNode<'_>) -> FsResult<()>;
    fn visit_symlink(&mut self, link: &VisitNode<'_>) -> FsResult<()>;

    /// Block devices route to the file callback unless overridden
    fn visit_block(&mut self, device: &VisitNode<'_>) -> FsResult<()> {
        self.visit_file(device)
    }
}

impl FsCore {
    /// Visitor entry point. The path is resolved without following a final
    /// symlink, so a visitor can observe link nodes themselves.
    pub fn visit(
        &self,
        creds: &Credentials,
        path: &Path,
        visitor: &mut dyn NodeVisitor,
    ) -> FsResult<()> {
        let (id, name) = self.resolve_for_visit(creds, path)?;
        VisitNode { fs: self, id, name }.accept(visitor)
    }
}

/// Emits one human-readable, indentation-by-depth line per node to the
/// supplied sink. Block devices are bracketed.
pub struct PrintVisitor<W: Write> {
    out: W,
    depth: usize,
}

impl<W: Write> PrintVisitor<W> {
    pub fn new(out: W) -> Self {
        Self { out, depth: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print_line(&mut self, name: &str) -> FsResult<()> {
        writeln!(self.out, "{}- {}", "  ".repeat(self.depth), name)?;
        Ok(())
    }
}

impl<W: Write> NodeVisitor for PrintVisitor<W> {
    fn visit_file(&mut self, file: &VisitNode<'_>) -> FsResult<()> {
        self.print_line(file.name())
    }

    fn visit_symlink(&mut self, link: &VisitNode<'_>) -> FsResult<()> {
        self.print_line(link.name())
    }

    fn visit_block(&mut self, device: &VisitNode<'_>) -> FsResult<()> {
        let label = format!("[{}]", device.name());
        self.print_line(&label)
    }

    fn visit_directory(&mut self, dir: &VisitNode<'_>) -> FsResult<()> {
        self.print_line(dir.name())?;
        self.depth += 1;
        let result = dir
            .children()?
            .iter()
            .try_for_each(|child| child.accept(self));
        self.depth -= 1;
        result
    }
}

/// Builds a nested mapping mirroring the tree: directories become objects,
/// files their content, keyed by name. Useful for equality-based structural
/// assertions in tests.
#[derive(Default)]
pub struct StructureVisitor {
    stack: Vec<serde_json::Map<String, Value>>,
    root: serde_json::Map<String, Value>,
}

impl StructureVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_structure(self) -> Value {
        Value::Object(self.root)
    }

    fn insert(&mut self, name: String, value: Value) {
        let target = match self.stack.last_mut() {
            Some(map) => map,
            None => &mut self.root,
        };
        target.insert(name, value);
    }
}

impl NodeVisitor for StructureVisitor {
    fn visit_file(&mut self, file: &VisitNode<'_>) -> FsResult<()> {
        let text = String::from_utf8_lossy(&file.content()?).into_owned();
        self.insert(file.name().to_string(), Value::String(text));
        Ok(())
    }

    fn visit_symlink(&mut self, link: &VisitNode<'_>) -> FsResult<()> {
        let target = link.symlink_target()?;
        self.insert(link.name().to_string(), Value::String(target));
        Ok(())
    }

    fn visit_block(&mut self, device: &VisitNode<'_>) -> FsResult<()> {
        let text = String::from_utf8_lossy(&device.content()?).into_owned();
        self.insert(format!("[{}]", device.name()), Value::String(text));
        Ok(())
    }

    fn visit_directory(&mut self, dir: &VisitNode<'_>) -> FsResult<()> {
        self.stack.push(serde_json::Map::new());
        let result = dir
            .children()?
            .iter()
            .try_for_each(|child| child.accept(self));
        let map = self.stack.pop().expect("visitor stack underflow");
        if result.is_ok() {
            self.insert(dir.name().to_string(), Value::Object(map));
        }
        result
    }
}
