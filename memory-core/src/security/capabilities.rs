/// Allow-list of operations generated code may reach
///
/// Every operation is registered up front under a fixed name together with
/// the kind of file access it performs. Lookups outside the table fail.

use crate::error::{MemoryError, Result};
use crate::security::paths::{expand_user, normalize_path};
use crate::storage::FileAction;
use std::collections::BTreeMap;

pub type CapabilityFn = fn(&[String]) -> Result<String>;

#[derive(Clone)]
pub struct Capability {
    pub name: String,
    /// File access performed on the first argument, if any.
    pub access: Option<FileAction>,
    handler: CapabilityFn,
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("access", &self.access)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    entries: BTreeMap<String, Capability>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path helpers plus a read-only directory listing.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register("path.exists", None, path_exists);
        table.register("path.expand", None, path_expand);
        table.register("path.basename", None, path_basename);
        table.register("fs.list_dir", Some(FileAction::Read), list_dir);
        table
    }

    pub fn register(&mut self, name: &str, access: Option<FileAction>, handler: CapabilityFn) {
        self.entries.insert(
            name.to_string(),
            Capability {
                name: name.to_string(),
                access,
                handler,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn invoke(&self, name: &str, args: &[String]) -> Result<String> {
        let capability = self
            .entries
            .get(name)
            .ok_or_else(|| MemoryError::InvalidInput(format!("operation not allowed: {}", name)))?;
        (capability.handler)(args)
    }
}

fn first_arg<'a>(args: &'a [String], op: &str) -> Result<&'a str> {
    args.first()
        .map(String::as_str)
        .ok_or_else(|| MemoryError::InvalidInput(format!("{} expects a path argument", op)))
}

fn path_exists(args: &[String]) -> Result<String> {
    let path = first_arg(args, "path.exists")?;
    Ok(normalize_path(path).exists().to_string())
}

fn path_expand(args: &[String]) -> Result<String> {
    let path = first_arg(args, "path.expand")?;
    Ok(expand_user(path).to_string_lossy().into_owned())
}

fn path_basename(args: &[String]) -> Result<String> {
    let path = first_arg(args, "path.basename")?;
    Ok(std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default())
}

fn list_dir(args: &[String]) -> Result<String> {
    let dir = normalize_path(first_arg(args, "fs.list_dir")?);
    let mut names: Vec<String> = std::fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names.join("\n"))
}
