// disk.rs
//! Cross-platform free/total space query for the filesystem holding a path.
//! Results are reported in allocation units plus the size of one unit.

use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpace {
    pub unit_size: u64,   // bytes per allocation unit
    pub free_units: u64,  // units available to this process
    pub total_units: u64, // units in the filesystem
}

impl DiskSpace {
    /// Query the filesystem that contains `path`.
    pub fn query(path: &Path) -> io::Result<Self> {
        let space = query_impl(path)?;
        // Some filesystems report reserved blocks oddly; never claim more free than total.
        Ok(Self {
            free_units: space.free_units.min(space.total_units),
            ..space
        })
    }

    pub fn free_bytes(&self) -> u64 {
        self.free_units.saturating_mul(self.unit_size)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_units.saturating_mul(self.unit_size)
    }
}

/* --------------------------- Unix --------------------------- */

#[cfg(unix)]
fn query_impl(path: &Path) -> io::Result<DiskSpace> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let cpath = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(cpath.as_ptr(), &mut st) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    // f_frsize is the fundamental block size; some systems leave it 0.
    let unit_size = if st.f_frsize != 0 { st.f_frsize } else { st.f_bsize };
    Ok(DiskSpace {
        unit_size: unit_size as u64,
        free_units: st.f_bavail as u64,
        total_units: st.f_blocks as u64,
    })
}

/* -------------------------- Windows -------------------------- */

#[cfg(target_os = "windows")]
fn query_impl(path: &Path) -> io::Result<DiskSpace> {
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::GetDiskFreeSpaceExW;

    let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();
    let mut free_to_caller = 0u64;
    let mut total = 0u64;
    let ok = unsafe {
        GetDiskFreeSpaceExW(
            wide.as_ptr(),
            &mut free_to_caller,
            &mut total,
            std::ptr::null_mut(),
        )
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }

    // The Ex variant accepts any directory but only reports bytes.
    Ok(DiskSpace {
        unit_size: 1,
        free_units: free_to_caller,
        total_units: total,
    })
}

/* ------------------------- Fallbacks ------------------------- */

#[cfg(not(any(unix, target_os = "windows")))]
fn query_impl(_path: &Path) -> io::Result<DiskSpace> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "disk space query is not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_never_exceeds_total() {
        let dir = tempfile::tempdir().unwrap();
        let space = DiskSpace::query(dir.path()).unwrap();
        assert!(space.unit_size > 0);
        assert!(space.total_units > 0);
        assert!(space.free_bytes() <= space.total_bytes());
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does/not/exist");
        assert!(DiskSpace::query(&missing).is_err());
    }

    #[test]
    fn bytes_multiply_units() {
        let space = DiskSpace {
            unit_size: 4096,
            free_units: 10,
            total_units: 100,
        };
        assert_eq!(space.free_bytes(), 40_960);
        assert_eq!(space.total_bytes(), 409_600);
    }
}
