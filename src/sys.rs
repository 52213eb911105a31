//! Native mapping primitives behind one internal interface.
//!
//! Each target maps the whole file read-write and shared. The differences
//! between the one-step `mmap` sequence and the Windows mapping-object/view
//! two-step stay inside this module; `RawMapping` is all the rest of the
//! crate sees.

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        pub(crate) use self::windows::RawMapping;
    } else {
        pub(crate) use self::unix::RawMapping;
    }
}

#[cfg(unix)]
mod unix {
    use std::fs::File;
    use std::os::unix::io::AsRawFd;
    use std::ptr::{self, NonNull};

    use crate::errors::{MapError, Result};

    /// Established `mmap` region. The fd is closed as soon as the region
    /// exists; `MAP_SHARED` pages stay valid until `munmap`.
    pub(crate) struct RawMapping {
        ptr: NonNull<libc::c_void>,
        len: usize,
    }

    impl RawMapping {
        /// Map the full range of `file` read-write. Consumes the file: the
        /// descriptor is released once the mapping is established.
        pub(crate) fn map_whole(file: File, len: u64) -> Result<Self> {
            let byte_len = usize::try_from(len).map_err(|_| {
                MapError::MapFailed(format!("{len} bytes exceed the address space"))
            })?;
            // SAFETY: the fd is open for read/write and outlives the call;
            // the caller has verified len is non-zero.
            let addr = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    byte_len,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_SHARED,
                    file.as_raw_fd(),
                    0,
                )
            };
            if addr == libc::MAP_FAILED {
                let err = std::io::Error::last_os_error();
                return Err(MapError::MapFailed(format!("mmap failed: {err}")));
            }
            // The mapping holds its own reference to the backing file; the fd
            // is no longer needed once the region exists.
            drop(file);
            // SAFETY: MAP_FAILED was checked above.
            let ptr = unsafe { NonNull::new_unchecked(addr) };
            Ok(Self { ptr, len: byte_len })
        }

        pub(crate) fn as_ptr(&self) -> *mut u8 {
            self.ptr.as_ptr().cast()
        }

        pub(crate) fn len(&self) -> u64 {
            self.len as u64
        }
    }

    impl Drop for RawMapping {
        fn drop(&mut self) {
            // Best-effort teardown; failures are not surfaced.
            // SAFETY: ptr/len describe a live mapping created by map_whole.
            let rc = unsafe { libc::munmap(self.ptr.as_ptr(), self.len) };
            debug_assert_eq!(rc, 0, "munmap failed");
        }
    }
}

#[cfg(windows)]
mod windows {
    use core::ffi::c_void;
    use std::fs::File;
    use std::os::windows::io::AsRawHandle;
    use std::ptr::{self, NonNull};

    use crate::errors::{MapError, Result};

    const PAGE_READWRITE: u32 = 0x04;
    const SEC_COMMIT: u32 = 0x0800_0000;
    const FILE_MAP_ALL_ACCESS: u32 = 0x000F_001F;
    const INVALID_FILE_SIZE: u32 = 0xFFFF_FFFF;

    extern "system" {
        fn CreateFileMappingW(
            hFile: *mut c_void,
            lpFileMappingAttributes: *mut c_void,
            flProtect: u32,
            dwMaximumSizeHigh: u32,
            dwMaximumSizeLow: u32,
            lpName: *const u16,
        ) -> *mut c_void;
        fn MapViewOfFile(
            hFileMappingObject: *mut c_void,
            dwDesiredAccess: u32,
            dwFileOffsetHigh: u32,
            dwFileOffsetLow: u32,
            dwNumberOfBytesToMap: usize,
        ) -> *mut c_void;
        fn UnmapViewOfFile(lpBaseAddress: *const c_void) -> i32;
        fn CloseHandle(hObject: *mut c_void) -> i32;
        fn GetFileSize(hFile: *mut c_void, lpFileSizeHigh: *mut u32) -> u32;
        fn SetLastError(dwErrCode: u32);
    }

    /// Established view plus the mapping object backing it. The file handle
    /// is closed as soon as the view exists; the mapping object keeps the
    /// backing reference.
    pub(crate) struct RawMapping {
        ptr: NonNull<c_void>,
        len: u64,
        mapping: *mut c_void,
    }

    impl RawMapping {
        /// Map the full range of `file` read-write via the native two-step
        /// sequence. Consumes the file: the handle is released once the view
        /// is established.
        pub(crate) fn map_whole(file: File, _len: u64) -> Result<Self> {
            let handle: *mut c_void = file.as_raw_handle().cast();
            // SAFETY: the file handle is open for read/write and outlives
            // the call. Zero max-size maps the current size of the file.
            let mapping = unsafe {
                CreateFileMappingW(
                    handle,
                    ptr::null_mut(),
                    PAGE_READWRITE | SEC_COMMIT,
                    0,
                    0,
                    ptr::null(),
                )
            };
            if mapping.is_null() {
                let err = std::io::Error::last_os_error();
                return Err(MapError::MapFailed(format!(
                    "CreateFileMapping failed: {err}"
                )));
            }
            // SAFETY: mapping is a live mapping object; 0/0/0 maps the whole
            // object into the address space.
            let view = unsafe { MapViewOfFile(mapping, FILE_MAP_ALL_ACCESS, 0, 0, 0) };
            if view.is_null() {
                let err = std::io::Error::last_os_error();
                // SAFETY: mapping is the handle created above, closed once.
                unsafe {
                    CloseHandle(mapping);
                }
                return Err(MapError::ViewFailed(format!(
                    "MapViewOfFile failed: {err}"
                )));
            }
            // Authoritative size straight from the file handle, assembled
            // from the low/high halves GetFileSize reports.
            let mut high: u32 = 0;
            // SAFETY: the file handle is still open; high is a valid out
            // pointer. Clearing the last error disambiguates a legitimate
            // 0xFFFF_FFFF low half from a failed call.
            let low = unsafe {
                SetLastError(0);
                GetFileSize(handle, &mut high)
            };
            if low == INVALID_FILE_SIZE {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error().unwrap_or(0) != 0 {
                    // SAFETY: view and mapping were created above and are
                    // released exactly once on this path.
                    unsafe {
                        UnmapViewOfFile(view);
                        CloseHandle(mapping);
                    }
                    return Err(MapError::Io(err));
                }
            }
            let len = u64::from(high) << 32 | u64::from(low);
            // The mapping object keeps the backing reference; the file
            // handle is no longer needed once the view exists.
            drop(file);
            // SAFETY: view was null-checked above.
            let ptr = unsafe { NonNull::new_unchecked(view) };
            Ok(Self { ptr, len, mapping })
        }

        pub(crate) fn as_ptr(&self) -> *mut u8 {
            self.ptr.as_ptr().cast()
        }

        pub(crate) fn len(&self) -> u64 {
            self.len
        }
    }

    impl Drop for RawMapping {
        fn drop(&mut self) {
            // Unmap the view first, then release the mapping object.
            // Best-effort teardown; failures are not surfaced.
            // SAFETY: both were created by map_whole and released only here.
            unsafe {
                let rc = UnmapViewOfFile(self.ptr.as_ptr());
                debug_assert_ne!(rc, 0, "UnmapViewOfFile failed");
                let rc = CloseHandle(self.mapping);
                debug_assert_ne!(rc, 0, "CloseHandle failed");
            }
        }
    }
}
