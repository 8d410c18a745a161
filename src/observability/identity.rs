//! Host and service identity stamped onto stats and exception records.

use std::ffi::CStr;
use std::net::ToSocketAddrs;
use std::path::Path;

/// Who is reporting: resolved once at startup and shared by all endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub service_name: String,
    pub hostname: String,
    /// Resolved address of `hostname`, or the hostname when resolution fails.
    pub host_addr: String,
}

impl ServiceIdentity {
    pub fn new(
        service_name: impl Into<String>,
        hostname: impl Into<String>,
        host_addr: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            hostname: hostname.into(),
            host_addr: host_addr.into(),
        }
    }

    /// Discover identity from the OS. `name_override` wins over the process
    /// title.
    pub fn discover(name_override: Option<&str>) -> Self {
        let service_name = match name_override {
            Some(name) => name.to_string(),
            None => service_name_from_title(&process_title()),
        };
        let hostname = hostname();
        let host_addr = resolve_host(&hostname).unwrap_or_else(|| hostname.clone());

        tracing::debug!(
            service_name = %service_name,
            hostname = %hostname,
            host_addr = %host_addr,
            "Service identity discovered"
        );

        Self {
            service_name,
            hostname,
            host_addr,
        }
    }
}

/// Service processes are titled `<service>_<instance>`; drop the instance
/// suffix. Titles without a suffix are used as-is.
pub fn service_name_from_title(title: &str) -> String {
    match title.rsplit_once('_') {
        Some((service, _)) if !service.is_empty() => service.to_string(),
        _ => title.to_string(),
    }
}

fn process_title() -> String {
    std::env::args()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(unix)]
fn hostname() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for `buf.len()` bytes; the last byte is
    // never written so the result stays NUL-terminated.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len() - 1) };
    if rc != 0 {
        return "localhost".to_string();
    }
    CStr::from_bytes_until_nul(&buf)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(not(unix))]
fn hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn resolve_host(hostname: &str) -> Option<String> {
    (hostname, 0)
        .to_socket_addrs()
        .ok()?
        .find(|addr| addr.is_ipv4())
        .map(|addr| addr.ip().to_string())
}
