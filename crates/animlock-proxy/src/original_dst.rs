//! Recovery of a redirected socket's original destination via the Linux
//! `SO_ORIGINAL_DST` socket option, layout `!2xH4s8x`: 2 bytes padding, a
//! big-endian u16 port, a 4-byte IPv4 address, then 8 bytes padding.
//!
//! This is the one place in the workspace that needs raw FFI: there is no
//! safe wrapper for `getsockopt(SOL_IP, SO_ORIGINAL_DST)` in the ecosystem.

#![allow(unsafe_code)]

use std::io;
use std::mem::MaybeUninit;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::fd::AsRawFd;

use tokio::net::TcpStream;

/// `SO_ORIGINAL_DST` is not exposed by `libc` directly; this is its value on
/// Linux (`linux/netfilter_ipv4.h`).
const SO_ORIGINAL_DST: libc::c_int = 80;

#[repr(C)]
struct SockaddrIn {
    _sin_family: libc::sa_family_t,
    sin_port: u16,
    sin_addr: libc::in_addr,
    _sin_zero: [u8; 8],
}

/// Query the original destination of a transparently-redirected socket.
///
/// # Errors
///
/// Returns the underlying `getsockopt` I/O error if the socket option is
/// unavailable (e.g. the connection was not NAT-redirected).
pub fn original_dst(stream: &TcpStream) -> io::Result<SocketAddrV4> {
    let fd = stream.as_raw_fd();
    let mut addr = MaybeUninit::<SockaddrIn>::zeroed();
    let mut len = u32::try_from(std::mem::size_of::<SockaddrIn>())
        .unwrap_or_else(|_| unreachable!("SockaddrIn fits comfortably within a u32"));

    // SAFETY: `fd` is a valid, open socket owned by `stream` for the duration
    // of this call; `addr` and `len` point to correctly sized, writable
    // storage matching what `getsockopt` expects for this option.
    let result = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_IP,
            SO_ORIGINAL_DST,
            addr.as_mut_ptr().cast::<libc::c_void>(),
            &raw mut len,
        )
    };

    if result != 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: a zero return from getsockopt guarantees the kernel filled in
    // exactly `len` bytes of `addr`, which we sized to the full struct above.
    let addr = unsafe { addr.assume_init() };
    let port = u16::from_be(addr.sin_port);
    let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
    Ok(SocketAddrV4::new(ip, port))
}
