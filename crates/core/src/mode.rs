//! Mode bit synthesis
//!
//! Node modes are composed from a type bit and per-class permission letters
//! (`r`, `w`, `x`). The `all` class fans out to user, group and other.

/// Directory type bit (`S_IFDIR`)
pub const S_IFDIR: u32 = 0o040_000;

/// Regular file type bit (`S_IFREG`)
pub const S_IFREG: u32 = 0o100_000;

/// Role of a node in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// Permission letters for each class
///
/// Each field is a set of letters drawn from `rwx`. Unknown letters are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionSpec<'a> {
    /// Applied to user, group and other alike
    pub all: &'a str,
    pub user: &'a str,
    pub group: &'a str,
    pub other: &'a str,
}

impl<'a> PermissionSpec<'a> {
    /// Empty spec: no permission bits
    pub const fn none() -> Self {
        Self {
            all: "",
            user: "",
            group: "",
            other: "",
        }
    }

    pub const fn all(mut self, letters: &'a str) -> Self {
        self.all = letters;
        self
    }

    pub const fn user(mut self, letters: &'a str) -> Self {
        self.user = letters;
        self
    }

    pub const fn group(mut self, letters: &'a str) -> Self {
        self.group = letters;
        self
    }

    pub const fn other(mut self, letters: &'a str) -> Self {
        self.other = letters;
        self
    }
}

/// Permissions of the root and every synthesized directory
pub const DIRECTORY_PERMISSIONS: PermissionSpec<'static> =
    PermissionSpec::none().user("rx").group("rx");

/// Permissions of every object-backed file
pub const FILE_PERMISSIONS: PermissionSpec<'static> = PermissionSpec::none().user("r").group("r");

/// Compose a numeric mode from a node kind and a permission spec
pub fn synthesize(kind: NodeKind, spec: &PermissionSpec<'_>) -> u32 {
    let mut mode = match kind {
        NodeKind::Directory => S_IFDIR,
        NodeKind::File => S_IFREG,
    };

    // (class letters, shift) for user, group, other
    for (letters, shift) in [(spec.user, 6), (spec.group, 3), (spec.other, 0)] {
        mode |= class_bits(letters, spec.all) << shift;
    }

    mode
}

/// The default mode for a node of the given kind
pub fn default_mode(kind: NodeKind) -> u32 {
    match kind {
        NodeKind::Directory => synthesize(kind, &DIRECTORY_PERMISSIONS),
        NodeKind::File => synthesize(kind, &FILE_PERMISSIONS),
    }
}

fn class_bits(letters: &str, all: &str) -> u32 {
    let has = |c: char| letters.contains(c) || all.contains(c);
    let mut bits = 0;
    if has('r') {
        bits |= 0o4;
    }
    if has('w') {
        bits |= 0o2;
    }
    if has('x') {
        bits |= 0o1;
    }
    bits
}
