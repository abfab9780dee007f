//! Host mount namespace resolution.
//!
//! Container and host scoped filters compare the mount namespace of every event with
//! the one of the host. The host value is read from procfs the first time it's needed
//! and then kept for the lifetime of the process.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use nix::unistd::Pid;
use tracer_core::Event;

use crate::{EventClass, FilterError};

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Host mount namespace identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceContext {
    host_mntns: u32,
}

impl NamespaceContext {
    pub fn new(host_mntns: u32) -> Self {
        Self { host_mntns }
    }

    pub fn host_mount_namespace(&self) -> u32 {
        self.host_mntns
    }

    /// Classify an event by its mount namespace.
    ///
    /// Events without namespace information (`mntns` of 0) can't be classified.
    pub fn classify(&self, event: &Event) -> Option<EventClass> {
        match event.context.mntns {
            0 => None,
            mntns if mntns == self.host_mntns => Some(EventClass::Host),
            _ => Some(EventClass::Container),
        }
    }
}

/// Source of the [NamespaceContext] used while compiling filters.
pub trait NamespaceProvider {
    fn namespace_context(&self) -> Result<NamespaceContext, FilterError>;
}

impl NamespaceProvider for NamespaceContext {
    fn namespace_context(&self) -> Result<NamespaceContext, FilterError> {
        Ok(*self)
    }
}

/// Resolve the host mount namespace from the init process in procfs.
///
/// The lookup happens at most once, both success and failure are cached.
#[derive(Debug)]
pub struct HostNamespace {
    proc_root: PathBuf,
    resolved: OnceLock<Result<NamespaceContext, FilterError>>,
}

impl HostNamespace {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            resolved: OnceLock::new(),
        }
    }

    pub fn host_mount_namespace(&self) -> Result<NamespaceContext, FilterError> {
        self.resolved
            .get_or_init(|| {
                let resolved = read_host_mount_namespace(&self.proc_root);
                match &resolved {
                    Ok(ns) => log::debug!("host mount namespace: {}", ns.host_mount_namespace()),
                    Err(err) => log::warn!("{err}"),
                }
                resolved
            })
            .clone()
    }
}

impl Default for HostNamespace {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl NamespaceProvider for HostNamespace {
    fn namespace_context(&self) -> Result<NamespaceContext, FilterError> {
        self.host_mount_namespace()
    }
}

fn read_host_mount_namespace(proc_root: &Path) -> Result<NamespaceContext, FilterError> {
    let path = proc_root
        .join(Pid::from_raw(1).to_string())
        .join("ns")
        .join("mnt");

    let link = fs::read_link(&path).map_err(|err| {
        FilterError::HostNamespaceUnavailable(format!("reading link {} failed: {err}", path.display()))
    })?;

    let link = link.to_string_lossy();
    parse_namespace_link(&link, "mnt")
        .map(NamespaceContext::new)
        .ok_or_else(|| {
            FilterError::HostNamespaceUnavailable(format!(
                "unexpected link {link} at {}",
                path.display()
            ))
        })
}

/// Parse the target of a `/proc/<pid>/ns/<kind>` link, in the form `<kind>:[<inode>]`.
fn parse_namespace_link(link: &str, kind: &str) -> Option<u32> {
    link.strip_prefix(kind)?
        .strip_prefix(":[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::symlink;

    use super::*;

    fn fake_proc(target: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let ns = dir.path().join("1").join("ns");
        fs::create_dir_all(&ns).unwrap();
        symlink(target, ns.join("mnt")).unwrap();
        dir
    }

    #[test]
    fn parse_link() {
        assert_eq!(parse_namespace_link("mnt:[4026531840]", "mnt"), Some(4026531840));
        assert_eq!(parse_namespace_link("net:[4026531840]", "mnt"), None);
        assert_eq!(parse_namespace_link("mnt:[abc]", "mnt"), None);
        assert_eq!(parse_namespace_link("mnt:4026531840", "mnt"), None);
    }

    #[test]
    fn read_from_procfs() {
        let proc = fake_proc("mnt:[4026531841]");
        let resolver = HostNamespace::new(proc.path());
        let ns = resolver.host_mount_namespace().unwrap();
        assert_eq!(ns.host_mount_namespace(), 4026531841);
    }

    #[test]
    fn result_is_cached() {
        let proc = fake_proc("mnt:[4026531841]");
        let resolver = HostNamespace::new(proc.path());
        assert!(resolver.host_mount_namespace().is_ok());

        // Later changes to procfs are not observed
        fs::remove_file(proc.path().join("1/ns/mnt")).unwrap();
        assert_eq!(
            resolver.namespace_context().unwrap(),
            NamespaceContext::new(4026531841)
        );
    }

    #[test]
    fn missing_procfs() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = HostNamespace::new(dir.path());
        assert!(matches!(
            resolver.host_mount_namespace(),
            Err(FilterError::HostNamespaceUnavailable(_))
        ));
    }

    #[test]
    fn malformed_link() {
        let proc = fake_proc("garbage");
        let resolver = HostNamespace::new(proc.path());
        assert!(matches!(
            resolver.host_mount_namespace(),
            Err(FilterError::HostNamespaceUnavailable(_))
        ));
    }

    #[test]
    fn classify() {
        let ns = NamespaceContext::new(1);
        let mut event = Event::new("execve");
        event.context.mntns = 1;
        assert_eq!(ns.classify(&event), Some(EventClass::Host));
        event.context.mntns = 2;
        assert_eq!(ns.classify(&event), Some(EventClass::Container));
        event.context.mntns = 0;
        assert_eq!(ns.classify(&event), None);
    }
}
