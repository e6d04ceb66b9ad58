//! Immutable snapshot records and capability flags (spec §3).

use std::time::SystemTime;

/// Case folding policy of a filesystem's child-name comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseSensitivity {
    CaseSensitive,
    CaseInsensitive,
    Inconsistent,
    Unknown,
}

/// Whether a filesystem allows an empty string as a child name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmptyDirectoryName {
    Allowed,
    Forbidden,
}

/// What kind of node an [`Entry`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    Drive,
    Mount,
}

/// A flat record of what a filesystem (or a subtree) advertises it can do.
///
/// Two records compose by intersection (AND of the capability bits,
/// concatenation of `sub_path`) or union (OR of the bits).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityOptions {
    pub can_browse: bool,
    pub can_get_entry: bool,
    pub can_observe: bool,
    pub can_open: bool,
    pub can_read: bool,
    pub can_write: bool,
    pub can_create_file: bool,
    pub can_delete: bool,
    pub can_move: bool,
    pub can_set_file_attribute: bool,
    pub can_create_directory: bool,
    pub can_mount: bool,
    pub can_unmount: bool,
    pub can_list_mount_points: bool,
    pub case_sensitivity: CaseSensitivity,
    pub empty_directory_name: EmptyDirectoryName,
    pub sub_path: Option<String>,
}

impl CapabilityOptions {
    /// All capabilities granted, case-sensitive, no sub-path offset.
    pub fn all() -> Self {
        Self {
            can_browse: true,
            can_get_entry: true,
            can_observe: true,
            can_open: true,
            can_read: true,
            can_write: true,
            can_create_file: true,
            can_delete: true,
            can_move: true,
            can_set_file_attribute: true,
            can_create_directory: true,
            can_mount: true,
            can_unmount: true,
            can_list_mount_points: true,
            case_sensitivity: CaseSensitivity::CaseSensitive,
            empty_directory_name: EmptyDirectoryName::Forbidden,
            sub_path: None,
        }
    }

    /// Read-only capabilities: browse, get-entry, observe, open, read.
    pub fn read_only() -> Self {
        Self {
            can_write: false,
            can_create_file: false,
            can_delete: false,
            can_move: false,
            can_set_file_attribute: false,
            can_create_directory: false,
            can_mount: false,
            can_unmount: false,
            ..Self::all()
        }
    }

    /// Every capability denied.
    pub fn none() -> Self {
        Self {
            can_browse: false,
            can_get_entry: false,
            can_observe: false,
            can_open: false,
            can_read: false,
            can_write: false,
            can_create_file: false,
            can_delete: false,
            can_move: false,
            can_set_file_attribute: false,
            can_create_directory: false,
            can_mount: false,
            can_unmount: false,
            can_list_mount_points: false,
            case_sensitivity: CaseSensitivity::Unknown,
            empty_directory_name: EmptyDirectoryName::Forbidden,
            sub_path: None,
        }
    }

    /// Intersects two option records: AND of every capability bit,
    /// concatenation of `sub_path`.
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            can_browse: self.can_browse && other.can_browse,
            can_get_entry: self.can_get_entry && other.can_get_entry,
            can_observe: self.can_observe && other.can_observe,
            can_open: self.can_open && other.can_open,
            can_read: self.can_read && other.can_read,
            can_write: self.can_write && other.can_write,
            can_create_file: self.can_create_file && other.can_create_file,
            can_delete: self.can_delete && other.can_delete,
            can_move: self.can_move && other.can_move,
            can_set_file_attribute: self.can_set_file_attribute && other.can_set_file_attribute,
            can_create_directory: self.can_create_directory && other.can_create_directory,
            can_mount: self.can_mount && other.can_mount,
            can_unmount: self.can_unmount && other.can_unmount,
            can_list_mount_points: self.can_list_mount_points && other.can_list_mount_points,
            case_sensitivity: self.case_sensitivity,
            empty_directory_name: self.empty_directory_name,
            sub_path: concat_sub_path(&self.sub_path, &other.sub_path),
        }
    }

    /// Unions two option records: OR of every capability bit.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            can_browse: self.can_browse || other.can_browse,
            can_get_entry: self.can_get_entry || other.can_get_entry,
            can_observe: self.can_observe || other.can_observe,
            can_open: self.can_open || other.can_open,
            can_read: self.can_read || other.can_read,
            can_write: self.can_write || other.can_write,
            can_create_file: self.can_create_file || other.can_create_file,
            can_delete: self.can_delete || other.can_delete,
            can_move: self.can_move || other.can_move,
            can_set_file_attribute: self.can_set_file_attribute || other.can_set_file_attribute,
            can_create_directory: self.can_create_directory || other.can_create_directory,
            can_mount: self.can_mount || other.can_mount,
            can_unmount: self.can_unmount || other.can_unmount,
            can_list_mount_points: self.can_list_mount_points || other.can_list_mount_points,
            case_sensitivity: self.case_sensitivity,
            empty_directory_name: self.empty_directory_name,
            sub_path: self.sub_path.clone().or_else(|| other.sub_path.clone()),
        }
    }
}

fn concat_sub_path(a: &Option<String>, b: &Option<String>) -> Option<String> {
    match (a, b) {
        (None, None) => None,
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (Some(a), Some(b)) => Some(format!("{a}{b}")),
    }
}

/// Immutable snapshot of a node, returned across every public read API.
///
/// Never borrows from internal state: every field is owned.
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: String,
    pub name: String,
    pub kind: EntryKind,
    pub last_modified: SystemTime,
    pub last_access: SystemTime,
    /// `None` for a directory; `Some(len)` for a file, `len >= 0`.
    pub length: Option<u64>,
    pub file_attributes: Option<u32>,
    pub physical_path: Option<String>,
    pub is_mount_point: bool,
    pub capability_options: CapabilityOptions,
}

impl Entry {
    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File)
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    pub fn is_drive(&self) -> bool {
        matches!(self.kind, EntryKind::Drive)
    }
}
