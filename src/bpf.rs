// Minimal bpf(2) surface: enumerate loaded kernel maps by id, open one by
// name, and update/delete socket entries in an XSKMAP.
//
// The XDP redirect program is loaded out of band; the inspector only needs
// to find its `xsk_map` and install the AF_XDP socket fd at the queue index.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use crate::error::FenceError;

// bpf_cmd values from <linux/bpf.h>.
const BPF_MAP_UPDATE_ELEM: libc::c_int = 2;
const BPF_MAP_DELETE_ELEM: libc::c_int = 3;
const BPF_MAP_GET_NEXT_ID: libc::c_int = 12;
const BPF_MAP_GET_FD_BY_ID: libc::c_int = 14;
const BPF_OBJ_GET_INFO_BY_FD: libc::c_int = 15;

const BPF_ANY: u64 = 0;

const BPF_OBJ_NAME_LEN: usize = 16;

// Per-command views of union bpf_attr. u64 fields are 8-byte aligned in the
// kernel ABI; repr(C) yields the same padding after the leading u32.

#[repr(C)]
#[derive(Default)]
struct MapIdAttr {
    // start_id for GET_NEXT_ID, map_id for GET_FD_BY_ID.
    id: u32,
    next_id: u32,
    open_flags: u32,
}

#[repr(C)]
#[derive(Default)]
struct ObjInfoAttr {
    bpf_fd: u32,
    info_len: u32,
    info: u64,
}

#[repr(C)]
#[derive(Default)]
struct MapElemAttr {
    map_fd: u32,
    key: u64,
    value: u64,
    flags: u64,
}

/// Leading fields of struct bpf_map_info; the kernel copies at most
/// `info_len` bytes, so trailing fields can be omitted.
#[repr(C)]
#[derive(Default)]
struct BpfMapInfo {
    map_type: u32,
    id: u32,
    key_size: u32,
    value_size: u32,
    max_entries: u32,
    map_flags: u32,
    name: [u8; BPF_OBJ_NAME_LEN],
}

fn sys_bpf<T>(cmd: libc::c_int, attr: &mut T) -> io::Result<i64> {
    let ret = unsafe {
        libc::syscall(
            libc::SYS_bpf,
            cmd,
            attr as *mut T as *mut libc::c_void,
            std::mem::size_of::<T>() as u32,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret)
}

/// Handle to a kernel XSKMAP found by name.
pub struct XskMapHandle {
    fd: OwnedFd,
    name: String,
}

impl XskMapHandle {
    /// Walk all loaded kernel maps and open the first one named `name`.
    pub fn find(name: &str) -> Result<Self, FenceError> {
        let mut id = 0u32;
        loop {
            let mut attr = MapIdAttr {
                id,
                ..Default::default()
            };
            match sys_bpf(BPF_MAP_GET_NEXT_ID, &mut attr) {
                Ok(_) => id = attr.next_id,
                Err(e) if e.raw_os_error() == Some(libc::ENOENT) => {
                    return Err(FenceError::MapNotFound(name.to_string()));
                }
                Err(e) => return Err(FenceError::Bpf(e)),
            }

            let mut fd_attr = MapIdAttr {
                id,
                ..Default::default()
            };
            let fd = match sys_bpf(BPF_MAP_GET_FD_BY_ID, &mut fd_attr) {
                Ok(fd) => unsafe { OwnedFd::from_raw_fd(fd as RawFd) },
                // The map may vanish between the id walk and the open.
                Err(e) if e.raw_os_error() == Some(libc::ENOENT) => continue,
                Err(e) => return Err(FenceError::Bpf(e)),
            };

            if map_name(&fd)? == name {
                return Ok(Self {
                    fd,
                    name: name.to_string(),
                });
            }
        }
    }

    /// Install a socket fd at `index` (the queue id).
    pub fn set(&self, index: u32, sock_fd: RawFd) -> Result<(), FenceError> {
        let value = sock_fd as u32;
        let mut attr = MapElemAttr {
            map_fd: self.fd.as_raw_fd() as u32,
            key: &index as *const u32 as u64,
            value: &value as *const u32 as u64,
            flags: BPF_ANY,
        };
        sys_bpf(BPF_MAP_UPDATE_ELEM, &mut attr).map_err(FenceError::Bpf)?;
        Ok(())
    }

    /// Remove the entry at `index`. A missing entry is not an error.
    pub fn remove(&self, index: u32) -> Result<(), FenceError> {
        let mut attr = MapElemAttr {
            map_fd: self.fd.as_raw_fd() as u32,
            key: &index as *const u32 as u64,
            ..Default::default()
        };
        match sys_bpf(BPF_MAP_DELETE_ELEM, &mut attr) {
            Ok(_) => Ok(()),
            Err(e) if e.raw_os_error() == Some(libc::ENOENT) => Ok(()),
            Err(e) => Err(FenceError::Bpf(e)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn map_name(fd: &OwnedFd) -> Result<String, FenceError> {
    let mut info = BpfMapInfo::default();
    let mut attr = ObjInfoAttr {
        bpf_fd: fd.as_raw_fd() as u32,
        info_len: std::mem::size_of::<BpfMapInfo>() as u32,
        info: &mut info as *mut BpfMapInfo as u64,
    };
    sys_bpf(BPF_OBJ_GET_INFO_BY_FD, &mut attr).map_err(FenceError::Bpf)?;
    let end = info
        .name
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(BPF_OBJ_NAME_LEN);
    Ok(String::from_utf8_lossy(&info.name[..end]).into_owned())
}
