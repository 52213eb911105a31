//! Whole-file memory mapping with deterministic teardown.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::errors::{MapError, Result};
use crate::sys;

const ERR_ZERO_LENGTH_FILE: &str = "cannot map zero-length file";

/// Memory mapping over the full contents of an existing file.
///
/// The handle is the sole owner of the OS resources behind the mapping. It
/// is constructed all-or-nothing: any failure while establishing the mapping
/// releases everything acquired up to that point and surfaces a [`MapError`],
/// so a live handle always carries a valid pointer/length pair. Dropping the
/// handle unmaps the view and releases the mapping object, exactly once.
///
/// The backing file's descriptor is closed as soon as the mapping is
/// established; the mapping itself keeps the data alive. The recorded length
/// is the file's size at open time and is never re-queried — concurrent size
/// changes by other processes are the caller's problem.
///
/// # Examples
///
/// ```no_run
/// use filemap::MappedFile;
///
/// let mut map = MappedFile::open("data.bin")?;
/// assert_eq!(map.as_slice().len() as u64, map.len());
///
/// // Writes go straight to the mapped pages.
/// map.as_mut_slice()[0] = 0x2A;
///
/// // Dropping the handle tears the mapping down.
/// drop(map);
/// # Ok::<(), filemap::MapError>(())
/// ```
///
/// The mapped bytes carry no internal synchronization. Shared references
/// permit concurrent reads across threads; callers mutating the region
/// through [`as_ptr`](Self::as_ptr) while others access it must coordinate
/// externally.
pub struct MappedFile {
    map: sys::RawMapping,
    path: PathBuf,
}

// SAFETY: the handle exclusively owns the mapped region and the mapping
// object; nothing in it is tied to the creating thread.
unsafe impl Send for MappedFile {}

// SAFETY: shared references only expose reads of the region (`&mut self` is
// required for the mutable view); aliasing writes through the raw pointer
// are the caller's contract to uphold.
unsafe impl Sync for MappedFile {}

impl std::fmt::Debug for MappedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedFile")
            .field("path", &self.path)
            .field("len", &self.len())
            .finish()
    }
}

impl MappedFile {
    /// Open an existing file and map its full contents read-write.
    ///
    /// Other processes may keep shared read access to the file while it is
    /// mapped. Zero-length files are rejected up front so the outcome is
    /// identical on every platform, where the native calls would otherwise
    /// fail each in their own way.
    ///
    /// # Errors
    ///
    /// Returns `MapError::NotFound` or `MapError::PermissionDenied` if the
    /// file cannot be opened, `MapError::MapFailed` if the backing mapping
    /// object cannot be created (zero-length file, exhausted address space),
    /// and `MapError::ViewFailed` if the view cannot be established on
    /// platforms with a separate view step. On every error path all
    /// partially acquired resources have already been released.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let file = open_shared_rw(path_ref).map_err(classify_open_error)?;
        let len = file.metadata()?.len();
        trace!("opened {} ({len} bytes)", path_ref.display());
        if len == 0 {
            return Err(MapError::MapFailed(ERR_ZERO_LENGTH_FILE.into()));
        }
        let map = sys::RawMapping::map_whole(file, len)?;
        debug!("mapped {} ({} bytes)", path_ref.display(), map.len());
        Ok(Self {
            map,
            path: path_ref.to_path_buf(),
        })
    }

    /// Base address of the mapped region.
    ///
    /// The pointer covers exactly [`len`](Self::len) contiguous readable and
    /// writable bytes and stays valid until the handle is dropped.
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.map.as_ptr()
    }

    /// Byte length of the mapped region, recorded at open time.
    ///
    /// Does not re-query the filesystem.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.map.len()
    }

    /// Whether the mapped region is empty. Zero-length files do not map, so
    /// this is false for every live handle; provided for the conventional
    /// `len`/`is_empty` pair.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The whole mapping as a byte slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the region covers len readable bytes for the lifetime of
        // self, and len fit in usize when the mapping was established.
        unsafe { std::slice::from_raw_parts(self.map.as_ptr(), self.map.len() as usize) }
    }

    /// The whole mapping as a mutable byte slice.
    ///
    /// Writes land in the shared mapped pages and reach the file once the
    /// OS writes them back, at the latest when the mapping is dropped.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as for as_slice; the exclusive borrow of self makes this
        // the only slice into the region.
        unsafe { std::slice::from_raw_parts_mut(self.map.as_ptr(), self.map.len() as usize) }
    }

    /// Path the mapping was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tear the mapping down now instead of at end of scope.
    ///
    /// Equivalent to dropping the handle; teardown is best-effort and
    /// reports nothing.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        trace!("unmapping {} ({} bytes)", self.path.display(), self.map.len());
        // sys::RawMapping releases the view and the mapping object.
    }
}

/// Open read-write, leaving other processes shared read access.
fn open_shared_rw(path: &Path) -> std::io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.read(true).write(true);
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        const FILE_SHARE_READ: u32 = 0x1;
        opts.share_mode(FILE_SHARE_READ);
    }
    opts.open(path)
}

fn classify_open_error(err: std::io::Error) -> MapError {
    match err.kind() {
        ErrorKind::NotFound => MapError::NotFound,
        ErrorKind::PermissionDenied => MapError::PermissionDenied,
        _ => MapError::Io(err),
    }
}
