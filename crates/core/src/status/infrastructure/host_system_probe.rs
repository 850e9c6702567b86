use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::process::Command;

use crate::shared::constants::UNKNOWN;
use crate::status::domain::system_context::{SystemInfo, SystemProbe};

/// Reads OS and network descriptors from the running host.
#[derive(Default)]
pub struct HostSystemProbe;

impl HostSystemProbe {
    pub fn new() -> Self {
        Self
    }
}

impl SystemProbe for HostSystemProbe {
    fn probe(&self) -> SystemInfo {
        let machine = std::env::consts::ARCH.to_string();
        SystemInfo {
            os_name: os_name(std::env::consts::OS),
            os_version: os_version().unwrap_or_else(|| UNKNOWN.to_string()),
            processor: processor().unwrap_or_else(|| machine.clone()),
            machine,
            local_ip: local_ip().to_string(),
        }
    }
}

/// Kernel-style OS name (`Linux`, `Darwin`, `Windows`).
fn os_name(os: &str) -> String {
    match os {
        "linux" => "Linux".to_string(),
        "macos" => "Darwin".to_string(),
        "windows" => "Windows".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => UNKNOWN.to_string(),
            }
        }
    }
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn os_version() -> Option<String> {
    #[cfg(target_os = "windows")]
    {
        command_output("cmd", &["/C", "ver"]).map(|v| parse_windows_ver(&v))
    }
    #[cfg(not(target_os = "windows"))]
    {
        command_output("uname", &["-v"])
    }
}

fn processor() -> Option<String> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("PROCESSOR_IDENTIFIER").ok()
    }
    #[cfg(not(target_os = "windows"))]
    {
        command_output("uname", &["-p"]).filter(|p| p != "unknown")
    }
}

/// `Microsoft Windows [Version 10.0.19045.3803]` → `10.0.19045.3803`.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn parse_windows_ver(raw: &str) -> String {
    raw.rsplit_once("Version ")
        .map(|(_, v)| v.trim_end_matches(']').trim().to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// First IPv4 address the host name resolves to, else loopback.
fn local_ip() -> IpAddr {
    let resolved = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .and_then(|name| (name.as_str(), 0).to_socket_addrs().ok())
        .and_then(|mut addrs| addrs.find(|a| a.is_ipv4()))
        .map(|a| a.ip());
    resolved.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
