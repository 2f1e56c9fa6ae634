// AF_XDP socket with UMEM and the four SPSC rings (fill, rx, tx,
// completion), built directly on the kernel ABI from <linux/if_xdp.h>.
//
// Frame ownership moves in one direction at a time: a frame address is
// either on the user-side free stack, posted to the kernel through the fill
// or tx ring, pending in the rx or completion ring, or held by the caller
// between `receive` and the following `fill`/`transmit`. Requires a 5.4+
// kernel (ring mmap offsets include the flags word).

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use log::{debug, info, warn};

use crate::error::FenceError;

/// Frames in the shared memory region.
pub const FRAME_COUNT: u32 = 4096;
/// Bytes per frame slot.
pub const FRAME_SIZE: u32 = 2048;
pub const FILL_RING_SIZE: u32 = 2048;
pub const COMPLETION_RING_SIZE: u32 = 2048;
pub const RX_RING_SIZE: u32 = 1024;
pub const TX_RING_SIZE: u32 = 1024;

// ---------------------------------------------------------------------------
// Kernel ABI (<linux/if_xdp.h>)
// ---------------------------------------------------------------------------

const SOL_XDP: i32 = 283;
const XDP_MMAP_OFFSETS: i32 = 1;
const XDP_RX_RING: i32 = 2;
const XDP_TX_RING: i32 = 3;
const XDP_UMEM_REG: i32 = 4;
const XDP_UMEM_FILL_RING: i32 = 5;
const XDP_UMEM_COMPLETION_RING: i32 = 6;

const XDP_PGOFF_RX_RING: i64 = 0;
const XDP_PGOFF_TX_RING: i64 = 0x8000_0000;
const XDP_UMEM_PGOFF_FILL_RING: i64 = 0x1_0000_0000;
const XDP_UMEM_PGOFF_COMPLETION_RING: i64 = 0x1_8000_0000;

const XDP_COPY: u16 = 1 << 1;

#[repr(C)]
struct XdpUmemReg {
    addr: u64,
    len: u64,
    chunk_size: u32,
    headroom: u32,
    flags: u32,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct XdpRingOffset {
    producer: u64,
    consumer: u64,
    desc: u64,
    flags: u64,
}

#[repr(C)]
#[derive(Debug, Default)]
struct XdpMmapOffsets {
    rx: XdpRingOffset,
    tx: XdpRingOffset,
    fr: XdpRingOffset,
    cr: XdpRingOffset,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct XdpDesc {
    addr: u64,
    len: u32,
    options: u32,
}

#[repr(C)]
struct SockaddrXdp {
    sxdp_family: u16,
    sxdp_flags: u16,
    sxdp_ifindex: u32,
    sxdp_queue_id: u32,
    sxdp_shared_umem_fd: u32,
}

/// An (address, length) handle into the shared frame memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDesc {
    pub addr: u64,
    pub len: u32,
}

/// Mask an address (which may point into a frame) down to its slot base.
pub(crate) fn frame_base(addr: u64) -> u64 {
    addr & !u64::from(FRAME_SIZE - 1)
}

// ---------------------------------------------------------------------------
// Ring
// ---------------------------------------------------------------------------

/// One mmap'd SPSC ring. The kernel owns one index, user space the other;
/// both indices grow without bound and are masked on element access.
struct Ring {
    producer: *mut u32,
    consumer: *mut u32,
    elems: *mut u8,
    size: u32,
    mask: u32,
    cached_prod: u32,
    cached_cons: u32,
    mmap_ptr: *mut u8,
    mmap_len: usize,
}

unsafe impl Send for Ring {}

impl Ring {
    fn load_producer(&self) -> u32 {
        let v = unsafe { std::ptr::read_volatile(self.producer) };
        std::sync::atomic::fence(std::sync::atomic::Ordering::Acquire);
        v
    }

    fn load_consumer(&self) -> u32 {
        let v = unsafe { std::ptr::read_volatile(self.consumer) };
        std::sync::atomic::fence(std::sync::atomic::Ordering::Acquire);
        v
    }

    fn store_producer(&self, val: u32) {
        std::sync::atomic::fence(std::sync::atomic::Ordering::Release);
        unsafe { std::ptr::write_volatile(self.producer, val) };
    }

    fn store_consumer(&self, val: u32) {
        std::sync::atomic::fence(std::sync::atomic::Ordering::Release);
        unsafe { std::ptr::write_volatile(self.consumer, val) };
    }

    /// Slots the user-side producer may still write before the kernel
    /// consumes more.
    fn free_slots(&mut self) -> u32 {
        self.cached_cons = self.load_consumer();
        self.size - self.cached_prod.wrapping_sub(self.cached_cons)
    }

    /// Entries the user-side consumer can read right now.
    fn available(&mut self) -> u32 {
        self.cached_prod = self.load_producer();
        self.cached_prod.wrapping_sub(self.cached_cons)
    }

    unsafe fn addr_slot(&self, idx: u32) -> *mut u64 {
        self.elems
            .add((idx & self.mask) as usize * std::mem::size_of::<u64>()) as *mut u64
    }

    unsafe fn desc_slot(&self, idx: u32) -> *mut XdpDesc {
        self.elems
            .add((idx & self.mask) as usize * std::mem::size_of::<XdpDesc>())
            as *mut XdpDesc
    }

    /// Write up to `addrs.len()` addresses (fill/completion layout) and
    /// advance the producer. Returns how many were written.
    fn produce_addrs(&mut self, addrs: &[u64]) -> usize {
        let n = (self.free_slots() as usize).min(addrs.len());
        for (i, &addr) in addrs[..n].iter().enumerate() {
            unsafe { *self.addr_slot(self.cached_prod.wrapping_add(i as u32)) = addr };
        }
        self.cached_prod = self.cached_prod.wrapping_add(n as u32);
        self.store_producer(self.cached_prod);
        n
    }

    /// Write up to `descs.len()` descriptors (rx/tx layout) and advance the
    /// producer. Returns how many were written.
    fn produce_descs(&mut self, descs: &[FrameDesc]) -> usize {
        let n = (self.free_slots() as usize).min(descs.len());
        for (i, desc) in descs[..n].iter().enumerate() {
            unsafe {
                *self.desc_slot(self.cached_prod.wrapping_add(i as u32)) = XdpDesc {
                    addr: desc.addr,
                    len: desc.len,
                    options: 0,
                };
            }
        }
        self.cached_prod = self.cached_prod.wrapping_add(n as u32);
        self.store_producer(self.cached_prod);
        n
    }

    /// Read up to `max` addresses and advance the consumer.
    fn consume_addrs(&mut self, out: &mut Vec<u64>, max: usize) -> usize {
        let n = (self.available() as usize).min(max);
        for i in 0..n {
            out.push(unsafe { *self.addr_slot(self.cached_cons.wrapping_add(i as u32)) });
        }
        self.cached_cons = self.cached_cons.wrapping_add(n as u32);
        self.store_consumer(self.cached_cons);
        n
    }

    /// Read up to `max` descriptors and advance the consumer.
    fn consume_descs(&mut self, out: &mut Vec<FrameDesc>, max: usize) -> usize {
        let n = (self.available() as usize).min(max);
        for i in 0..n {
            let desc = unsafe { *self.desc_slot(self.cached_cons.wrapping_add(i as u32)) };
            out.push(FrameDesc {
                addr: desc.addr,
                len: desc.len,
            });
        }
        self.cached_cons = self.cached_cons.wrapping_add(n as u32);
        self.store_consumer(self.cached_cons);
        n
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        if !self.mmap_ptr.is_null() && self.mmap_len > 0 {
            unsafe { libc::munmap(self.mmap_ptr as *mut libc::c_void, self.mmap_len) };
        }
    }
}

// ---------------------------------------------------------------------------
// UMEM
// ---------------------------------------------------------------------------

struct Umem {
    ptr: *mut u8,
    len: usize,
}

unsafe impl Send for Umem {}

impl Umem {
    fn new(len: usize) -> Result<Self, FenceError> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_POPULATE,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(FenceError::Socket(format!(
                "mmap umem: {}",
                io::Error::last_os_error()
            )));
        }
        Ok(Self {
            ptr: ptr as *mut u8,
            len,
        })
    }
}

impl Drop for Umem {
    fn drop(&mut self) {
        unsafe { libc::munmap(self.ptr as *mut libc::c_void, self.len) };
    }
}

// ---------------------------------------------------------------------------
// Socket
// ---------------------------------------------------------------------------

/// A bound AF_XDP socket. Dropping it unmaps all ring memory and closes the
/// descriptor, returning every in-flight frame to the kernel.
pub struct XskSocket {
    fill: Ring,
    rx: Ring,
    tx: Ring,
    completion: Ring,
    umem: Umem,
    fd: OwnedFd,
    /// FREE frames: owned by user code, not posted to any ring.
    free_frames: Vec<u64>,
}

impl XskSocket {
    /// Create, configure and bind a socket on `ifindex`/`queue_id` with the
    /// fixed frame and ring geometry above.
    pub fn new(ifindex: u32, queue_id: u32) -> Result<Self, FenceError> {
        let raw = unsafe { libc::socket(libc::AF_XDP, libc::SOCK_RAW, 0) };
        if raw < 0 {
            return Err(FenceError::Socket(format!(
                "create AF_XDP socket: {}",
                io::Error::last_os_error()
            )));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let umem_len = (FRAME_COUNT * FRAME_SIZE) as usize;
        let umem = Umem::new(umem_len)?;

        let reg = XdpUmemReg {
            addr: umem.ptr as u64,
            len: umem_len as u64,
            chunk_size: FRAME_SIZE,
            headroom: 0,
            flags: 0,
        };
        set_opt(&fd, XDP_UMEM_REG, &reg)?;

        set_opt(&fd, XDP_UMEM_FILL_RING, &FILL_RING_SIZE)?;
        set_opt(&fd, XDP_UMEM_COMPLETION_RING, &COMPLETION_RING_SIZE)?;
        set_opt(&fd, XDP_RX_RING, &RX_RING_SIZE)?;
        set_opt(&fd, XDP_TX_RING, &TX_RING_SIZE)?;

        let mut offsets = XdpMmapOffsets::default();
        let mut optlen = std::mem::size_of::<XdpMmapOffsets>() as libc::socklen_t;
        let ret = unsafe {
            libc::getsockopt(
                fd.as_raw_fd(),
                SOL_XDP,
                XDP_MMAP_OFFSETS,
                &mut offsets as *mut _ as *mut libc::c_void,
                &mut optlen,
            )
        };
        if ret < 0 {
            return Err(FenceError::Socket(format!(
                "XDP_MMAP_OFFSETS: {}",
                io::Error::last_os_error()
            )));
        }
        debug!("xdp mmap offsets: {:?}", offsets);

        let fill = map_ring(
            &fd,
            &offsets.fr,
            XDP_UMEM_PGOFF_FILL_RING,
            FILL_RING_SIZE,
            std::mem::size_of::<u64>(),
            "fill",
        )?;
        let completion = map_ring(
            &fd,
            &offsets.cr,
            XDP_UMEM_PGOFF_COMPLETION_RING,
            COMPLETION_RING_SIZE,
            std::mem::size_of::<u64>(),
            "completion",
        )?;
        let rx = map_ring(
            &fd,
            &offsets.rx,
            XDP_PGOFF_RX_RING,
            RX_RING_SIZE,
            std::mem::size_of::<XdpDesc>(),
            "rx",
        )?;
        let tx = map_ring(
            &fd,
            &offsets.tx,
            XDP_PGOFF_TX_RING,
            TX_RING_SIZE,
            std::mem::size_of::<XdpDesc>(),
            "tx",
        )?;

        bind_xdp(&fd, ifindex, queue_id)?;

        info!(
            "xdp socket bound: ifindex={} queue={} frames={} frame_size={}",
            ifindex, queue_id, FRAME_COUNT, FRAME_SIZE
        );

        let free_frames = (0..FRAME_COUNT)
            .map(|i| u64::from(i) * u64::from(FRAME_SIZE))
            .collect();

        Ok(Self {
            fill,
            rx,
            tx,
            completion,
            umem,
            fd,
            free_frames,
        })
    }

    pub fn fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Slots currently free in the fill ring.
    pub fn free_fill_slots(&mut self) -> usize {
        self.fill.free_slots() as usize
    }

    /// Claim up to `max` FREE frame descriptors, each spanning a whole slot.
    pub fn take_free_descs(&mut self, max: usize) -> Vec<FrameDesc> {
        let n = max.min(self.free_frames.len());
        let at = self.free_frames.len() - n;
        self.free_frames
            .split_off(at)
            .into_iter()
            .map(|addr| FrameDesc {
                addr,
                len: FRAME_SIZE,
            })
            .collect()
    }

    /// Post descriptors to the fill ring, handing their frames to the
    /// kernel for receive. Descriptors that do not fit return to the free
    /// stack. Returns how many were posted.
    pub fn fill(&mut self, descs: &[FrameDesc]) -> usize {
        let addrs: Vec<u64> = descs.iter().map(|d| frame_base(d.addr)).collect();
        let n = self.fill.produce_addrs(&addrs);
        for &addr in &addrs[n..] {
            self.free_frames.push(addr);
        }
        n
    }

    /// Wait up to `timeout_ms` for the socket to become readable. Returns
    /// the number of rx descriptors ready, 0 on timeout. Interruption by a
    /// signal surfaces as `ErrorKind::Interrupted`.
    pub fn poll(&mut self, timeout_ms: i32) -> io::Result<usize> {
        let mut pfd = libc::pollfd {
            fd: self.fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        if ret == 0 {
            return Ok(0);
        }
        Ok(self.rx.available() as usize)
    }

    /// Drain up to `max` received descriptors from the rx ring. The caller
    /// owns the returned frames until it routes each one to `fill` or
    /// `transmit`.
    pub fn receive(&mut self, max: usize) -> Vec<FrameDesc> {
        let mut out = Vec::with_capacity(max.min(RX_RING_SIZE as usize));
        self.rx.consume_descs(&mut out, max);
        out
    }

    /// Post descriptors to the tx ring and kick the kernel transmit path.
    /// Descriptors that do not fit are dropped back to the free stack (the
    /// frame is not sent). Returns how many were posted.
    pub fn transmit(&mut self, descs: &[FrameDesc]) -> Result<usize, FenceError> {
        let n = self.tx.produce_descs(descs);
        for desc in &descs[n..] {
            self.free_frames.push(frame_base(desc.addr));
        }
        if n < descs.len() {
            warn!("tx ring full, dropped {} frames", descs.len() - n);
        }
        self.kick_tx()?;
        Ok(n)
    }

    /// Reap the completion ring without blocking, returning transmitted
    /// frames to the free stack. Returns how many were reaped.
    pub fn complete(&mut self) -> usize {
        let mut addrs = Vec::new();
        let n = self
            .completion
            .consume_addrs(&mut addrs, COMPLETION_RING_SIZE as usize);
        for addr in addrs {
            self.free_frames.push(frame_base(addr));
        }
        n
    }

    /// The valid bytes of a received frame.
    pub fn frame(&self, desc: &FrameDesc) -> &[u8] {
        let (start, len) = self.frame_span(desc);
        unsafe { std::slice::from_raw_parts(self.umem.ptr.add(start), len) }
    }

    /// Exclusive view of a frame's valid bytes, for in-place mutation before
    /// transmit.
    pub fn frame_mut(&mut self, desc: &FrameDesc) -> &mut [u8] {
        let (start, len) = self.frame_span(desc);
        unsafe { std::slice::from_raw_parts_mut(self.umem.ptr.add(start), len) }
    }

    fn frame_span(&self, desc: &FrameDesc) -> (usize, usize) {
        let start = (desc.addr as usize).min(self.umem.len);
        let len = (desc.len as usize).min(self.umem.len - start);
        (start, len)
    }

    fn kick_tx(&self) -> Result<(), FenceError> {
        let ret = unsafe {
            libc::sendto(
                self.fd.as_raw_fd(),
                std::ptr::null(),
                0,
                libc::MSG_DONTWAIT,
                std::ptr::null(),
                0,
            )
        };
        if ret >= 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EAGAIN) | Some(libc::EBUSY) | Some(libc::EINTR) | Some(libc::ENOBUFS) => {
                Ok(())
            }
            _ => Err(FenceError::Socket(format!("tx kick: {}", err))),
        }
    }
}

fn set_opt<T>(fd: &OwnedFd, opt: i32, value: &T) -> Result<(), FenceError> {
    let ret = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            SOL_XDP,
            opt,
            value as *const T as *const libc::c_void,
            std::mem::size_of::<T>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(FenceError::Socket(format!(
            "setsockopt({}): {}",
            opt,
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

fn map_ring(
    fd: &OwnedFd,
    off: &XdpRingOffset,
    pgoff: i64,
    size: u32,
    elem_size: usize,
    name: &str,
) -> Result<Ring, FenceError> {
    let mmap_len = off.desc as usize + size as usize * elem_size;
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            mmap_len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED | libc::MAP_POPULATE,
            fd.as_raw_fd(),
            pgoff,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(FenceError::Socket(format!(
            "mmap {} ring: {}",
            name,
            io::Error::last_os_error()
        )));
    }
    let base = ptr as *mut u8;
    Ok(Ring {
        producer: unsafe { base.add(off.producer as usize) as *mut u32 },
        consumer: unsafe { base.add(off.consumer as usize) as *mut u32 },
        elems: unsafe { base.add(off.desc as usize) },
        size,
        mask: size - 1,
        cached_prod: 0,
        cached_cons: 0,
        mmap_ptr: base,
        mmap_len,
    })
}

fn bind_xdp(fd: &OwnedFd, ifindex: u32, queue_id: u32) -> Result<(), FenceError> {
    let mut sxdp = SockaddrXdp {
        sxdp_family: libc::AF_XDP as u16,
        sxdp_flags: XDP_COPY,
        sxdp_ifindex: ifindex,
        sxdp_queue_id: queue_id,
        sxdp_shared_umem_fd: 0,
    };
    let len = std::mem::size_of::<SockaddrXdp>() as libc::socklen_t;
    let ret = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            &sxdp as *const _ as *const libc::sockaddr,
            len,
        )
    };
    if ret == 0 {
        return Ok(());
    }
    // Some drivers reject explicit copy mode; retry with no flags.
    sxdp.sxdp_flags = 0;
    let ret = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            &sxdp as *const _ as *const libc::sockaddr,
            len,
        )
    };
    if ret < 0 {
        return Err(FenceError::Socket(format!(
            "bind ifindex={} queue={}: {}",
            ifindex,
            queue_id,
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers shared by both binaries
// ---------------------------------------------------------------------------

/// Resolve an interface name to its index.
pub fn interface_index(name: &str) -> Result<u32, FenceError> {
    let c_name = std::ffi::CString::new(name).map_err(|_| FenceError::Interface {
        name: name.to_string(),
        detail: "invalid interface name".to_string(),
    })?;
    let idx = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if idx == 0 {
        return Err(FenceError::Interface {
            name: name.to_string(),
            detail: io::Error::last_os_error().to_string(),
        });
    }
    Ok(idx)
}

/// Lift the locked-memory rlimit so UMEM and ring allocations succeed on
/// kernels that charge them against RLIMIT_MEMLOCK. Failure is non-fatal.
pub fn raise_memlock_limit() {
    let limit = libc::rlimit {
        rlim_cur: libc::RLIM_INFINITY,
        rlim_max: libc::RLIM_INFINITY,
    };
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &limit) };
    if ret < 0 {
        warn!(
            "raise RLIMIT_MEMLOCK: {} (socket setup may fail)",
            io::Error::last_os_error()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Build a ring over leaked heap memory so index arithmetic can be
    // exercised without a kernel socket.
    fn heap_ring(size: u32, elem_size: usize) -> Ring {
        let producer = Box::leak(Box::new(0u32)) as *mut u32;
        let consumer = Box::leak(Box::new(0u32)) as *mut u32;
        let elems =
            Box::leak(vec![0u8; size as usize * elem_size].into_boxed_slice()).as_mut_ptr();
        Ring {
            producer,
            consumer,
            elems,
            size,
            mask: size - 1,
            cached_prod: 0,
            cached_cons: 0,
            mmap_ptr: std::ptr::null_mut(),
            mmap_len: 0,
        }
    }

    #[test]
    fn addr_ring_produce_consume_wraps() {
        let mut ring = heap_ring(4, std::mem::size_of::<u64>());
        assert_eq!(ring.produce_addrs(&[1, 2, 3]), 3);
        assert_eq!(ring.free_slots(), 1);

        let mut out = Vec::new();
        assert_eq!(ring.consume_addrs(&mut out, 2), 2);
        assert_eq!(out, vec![1, 2]);

        // Producer wraps past the ring size.
        assert_eq!(ring.produce_addrs(&[4, 5, 6, 7]), 3);
        let mut out = Vec::new();
        assert_eq!(ring.consume_addrs(&mut out, 16), 4);
        assert_eq!(out, vec![3, 4, 5, 6]);
        assert_eq!(ring.free_slots(), 4);
    }

    #[test]
    fn desc_ring_preserves_addr_and_len() {
        let mut ring = heap_ring(8, std::mem::size_of::<XdpDesc>());
        let descs = [
            FrameDesc { addr: 2048, len: 128 },
            FrameDesc { addr: 4096, len: 60 },
        ];
        assert_eq!(ring.produce_descs(&descs), 2);
        let mut out = Vec::new();
        assert_eq!(ring.consume_descs(&mut out, 8), 2);
        assert_eq!(out, descs);
    }

    #[test]
    fn full_ring_rejects_overflow() {
        let mut ring = heap_ring(2, std::mem::size_of::<u64>());
        assert_eq!(ring.produce_addrs(&[1, 2, 3]), 2);
        assert_eq!(ring.produce_addrs(&[4]), 0);
        let mut out = Vec::new();
        ring.consume_addrs(&mut out, 1);
        assert_eq!(ring.produce_addrs(&[4]), 1);
    }

    #[test]
    fn ring_conserves_entries() {
        // fill + consumed == produced at every step, across wraparound.
        let mut ring = heap_ring(4, std::mem::size_of::<u64>());
        let mut produced = 0u64;
        let mut consumed = 0u64;
        let mut out = Vec::new();
        for round in 0..32u64 {
            produced += ring.produce_addrs(&[round, round + 100]) as u64;
            out.clear();
            consumed += ring.consume_addrs(&mut out, 1) as u64;
            let pending = (produced - consumed) as u32;
            assert_eq!(ring.free_slots(), ring.size - pending);
        }
    }

    #[test]
    fn frame_base_masks_within_slot() {
        assert_eq!(frame_base(0), 0);
        assert_eq!(frame_base(2048), 2048);
        assert_eq!(frame_base(2048 + 17), 2048);
        assert_eq!(frame_base(4095), 2048);
    }
}
