//! FUSE binding of the filesystem adapter
//!
//! `SwiftFs` translates inode-based kernel requests into path-based
//! [`FsAdapter`] calls. fuser invokes the callbacks on the thread that called
//! `mount2`, which is a blocking thread, so each async adapter call is driven
//! to completion with [`Handle::block_on`].

mod inode_table;

pub use inode_table::InodeTable;

use std::ffi::OsStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry, ReplyOpen,
    ReplyStatfs, Request,
};
use tokio::runtime::Handle;
use tracing::instrument;

use swiftfs_core::path::{join, parent};
use swiftfs_core::{Attrs, BackingStore, EntryKind, Error, FsAdapter, NodeKind};

/// How long the kernel may cache attributes and entries
const TTL: Duration = Duration::from_secs(1);

/// Block size reported by getattr and statfs
pub const BLOCK_SIZE: u32 = 4096;

const NAME_MAX: u32 = 255;

#[cfg(target_os = "linux")]
const EREMOTEIO: i32 = libc::EREMOTEIO;
#[cfg(not(target_os = "linux"))]
const EREMOTEIO: i32 = libc::EIO;

/// errno reported to the kernel for an adapter error
pub fn errno(err: &Error) -> i32 {
    match err {
        Error::NotFound(_) => libc::ENOENT,
        Error::NotADirectory(_) => libc::ENOTDIR,
        e if e.is_remote() => EREMOTEIO,
        _ => libc::EIO,
    }
}

/// Kernel attributes for an adapter attribute record
pub fn file_attr(ino: u64, attrs: &Attrs) -> FileAttr {
    let mtime = system_time(attrs.modified_time);
    let (kind, nlink) = match attrs.kind() {
        NodeKind::Directory => (FileType::Directory, 2),
        NodeKind::File => (FileType::RegularFile, 1),
    };

    FileAttr {
        ino,
        size: attrs.size,
        blocks: attrs.size.div_ceil(512),
        atime: mtime,
        mtime,
        ctime: mtime,
        crtime: mtime,
        kind,
        perm: (attrs.mode & 0o7777) as u16,
        nlink,
        uid: attrs.uid,
        gid: attrs.gid,
        rdev: 0,
        blksize: BLOCK_SIZE,
        flags: 0,
    }
}

fn system_time(seconds: i64) -> SystemTime {
    let offset = Duration::from_secs(seconds.unsigned_abs());
    let time = if seconds >= 0 {
        UNIX_EPOCH.checked_add(offset)
    } else {
        UNIX_EPOCH.checked_sub(offset)
    };
    time.unwrap_or(UNIX_EPOCH)
}

fn file_type(kind: EntryKind) -> FileType {
    match kind {
        EntryKind::Directory => FileType::Directory,
        EntryKind::File => FileType::RegularFile,
    }
}

/// Log an adapter failure and return its errno
fn fail(op: &'static str, path: &str, err: &Error) -> i32 {
    match err {
        Error::NotFound(_) => tracing::debug!(op, path, "no such entry"),
        _ => tracing::warn!(op, path, error = %err, "request failed"),
    }
    errno(err)
}

/// Read-only FUSE filesystem over one container
pub struct SwiftFs<S> {
    adapter: FsAdapter<S>,
    runtime: Handle,
    inodes: InodeTable,
    refresh_on_opendir: bool,
}

impl<S: BackingStore> SwiftFs<S> {
    pub fn new(adapter: FsAdapter<S>, runtime: Handle) -> Self {
        Self {
            adapter,
            runtime,
            inodes: InodeTable::new(),
            refresh_on_opendir: false,
        }
    }

    /// Rebuild the tree every time a directory is opened
    pub fn refresh_on_opendir(mut self, enabled: bool) -> Self {
        self.refresh_on_opendir = enabled;
        self
    }

    fn path(&self, ino: u64) -> Result<String, i32> {
        self.inodes
            .get_path(ino)
            .map(str::to_string)
            .ok_or(libc::ENOENT)
    }

    fn attrs(&self, op: &'static str, path: &str) -> Result<Attrs, i32> {
        self.runtime
            .block_on(self.adapter.getattr(path))
            .map_err(|e| fail(op, path, &e))
    }
}

impl<S: BackingStore> Filesystem for SwiftFs<S> {
    #[instrument(level = "debug", skip(self, _req, reply))]
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };
        let parent_path = match self.path(parent) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };

        match self
            .runtime
            .block_on(self.adapter.lookup(&parent_path, name))
        {
            Ok(attrs) => {
                let ino = self.inodes.get_or_create(&join(&parent_path, name));
                reply.entry(&TTL, &file_attr(ino, &attrs), 0);
            }
            Err(e) => reply.error(fail("lookup", &join(&parent_path, name), &e)),
        }
    }

    #[instrument(level = "debug", skip(self, _req, _fh, reply))]
    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let result = self.path(ino).and_then(|path| self.attrs("getattr", &path));
        match result {
            Ok(attrs) => reply.attr(&TTL, &file_attr(ino, &attrs)),
            Err(errno) => reply.error(errno),
        }
    }

    #[instrument(level = "debug", skip(self, _req, reply))]
    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path = match self.path(ino) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };

        if self.refresh_on_opendir
            && let Err(e) = self.runtime.block_on(self.adapter.refresh())
        {
            // Keep serving the previous tree
            tracing::warn!(path = %path, error = %e, "refresh on opendir failed");
        }

        match self.attrs("opendir", &path) {
            Ok(attrs) if attrs.is_dir() => reply.opened(0, 0),
            Ok(_) => reply.error(libc::ENOTDIR),
            Err(errno) => reply.error(errno),
        }
    }

    #[instrument(level = "debug", skip(self, _req, _fh, reply))]
    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.path(ino) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        let entries = match self.runtime.block_on(self.adapter.readdir(&path)) {
            Ok(entries) => entries,
            Err(e) => return reply.error(fail("readdir", &path, &e)),
        };

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, entry) in entries.iter().enumerate().skip(skip) {
            let entry_ino = match entry.name.as_str() {
                "." => ino,
                ".." => self.inodes.get_or_create(&parent(&path)),
                name => self.inodes.get_or_create(&join(&path, name)),
            };
            // Offset of the next entry
            if reply.add(entry_ino, (i + 1) as i64, file_type(entry.kind), &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    #[instrument(level = "debug", skip(self, _req, reply))]
    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        if flags & libc::O_ACCMODE != libc::O_RDONLY {
            return reply.error(libc::EROFS);
        }

        let result = self.path(ino).and_then(|path| self.attrs("open", &path));
        match result {
            Ok(attrs) if attrs.is_dir() => reply.error(libc::EISDIR),
            Ok(_) => reply.opened(0, 0),
            Err(errno) => reply.error(errno),
        }
    }

    #[instrument(level = "debug", skip(self, _req, _fh, _flags, _lock_owner, reply))]
    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Ok(offset) = u64::try_from(offset) else {
            return reply.error(libc::EINVAL);
        };
        let path = match self.path(ino) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };

        match self
            .runtime
            .block_on(self.adapter.read(&path, u64::from(size), offset))
        {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(errno(&e)),
        }
    }

    #[instrument(level = "debug", skip(self, _req, reply))]
    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        match self.runtime.block_on(self.adapter.statfs()) {
            Ok(stats) => reply.statfs(
                stats.bytes_used.div_ceil(u64::from(BLOCK_SIZE)),
                0,
                0,
                stats.objects,
                0,
                BLOCK_SIZE,
                NAME_MAX,
                BLOCK_SIZE,
            ),
            Err(e) => reply.error(fail("statfs", "/", &e)),
        }
    }

    fn destroy(&mut self) {
        tracing::info!(
            container = self.adapter.session().container(),
            inodes = self.inodes.len(),
            "filesystem unmounted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swiftfs_core::mode::{S_IFDIR, S_IFREG};

    #[test]
    fn test_errno_mapping() {
        assert_eq!(errno(&Error::NotFound("/x".into())), libc::ENOENT);
        assert_eq!(errno(&Error::NotADirectory("/x".into())), libc::ENOTDIR);
        assert_eq!(errno(&Error::Remote("503".into())), EREMOTEIO);
        assert_eq!(errno(&Error::Auth("401".into())), EREMOTEIO);
        assert_eq!(errno(&Error::RemoteNotFound("o".into())), EREMOTEIO);
        assert_eq!(errno(&Error::Parse("bad".into())), libc::EIO);
    }

    #[test]
    fn test_file_attr_directory() {
        let attrs = Attrs {
            mode: S_IFDIR | 0o550,
            uid: 501,
            gid: 20,
            size: 0,
            modified_time: 0,
        };
        let attr = file_attr(7, &attrs);
        assert_eq!(attr.ino, 7);
        assert_eq!(attr.kind, FileType::Directory);
        assert_eq!(attr.perm, 0o550);
        assert_eq!(attr.nlink, 2);
        assert_eq!((attr.uid, attr.gid), (501, 20));
        assert_eq!(attr.mtime, UNIX_EPOCH);
    }

    #[test]
    fn test_file_attr_file() {
        let attrs = Attrs {
            mode: S_IFREG | 0o440,
            uid: 0,
            gid: 0,
            size: 1025,
            modified_time: 1_672_531_200,
        };
        let attr = file_attr(9, &attrs);
        assert_eq!(attr.kind, FileType::RegularFile);
        assert_eq!(attr.perm, 0o440);
        assert_eq!(attr.size, 1025);
        assert_eq!(attr.blocks, 3);
        assert_eq!(
            attr.mtime,
            UNIX_EPOCH + Duration::from_secs(1_672_531_200)
        );
    }

    #[test]
    fn test_system_time_before_epoch() {
        assert_eq!(system_time(-60), UNIX_EPOCH - Duration::from_secs(60));
    }
}
