//! Live listening-socket probe

use anyhow::{anyhow, Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Pid, ProcessesToUpdate, System};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListeningSocket {
    pub port: u16,
    pub pid: Option<u32>,
    pub process: Option<String>,
}

impl ListeningSocket {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            pid: None,
            process: None,
        }
    }

    pub fn with_process(mut self, process: impl Into<String>) -> Self {
        self.process = Some(process.into());
        self
    }
}

/// Lists sockets in LISTEN state on the local machine. Blocking.
pub trait PortProbe: Send + Sync {
    fn name(&self) -> &str;

    fn listening(&self) -> Result<Vec<ListeningSocket>>;
}

/// Probe for platforms without `/proc`, or when probing is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProbe;

impl PortProbe for NoopProbe {
    fn name(&self) -> &str {
        "noop"
    }

    fn listening(&self) -> Result<Vec<ListeningSocket>> {
        Ok(Vec::new())
    }
}

/// Fixed answers, or a fixed failure
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    sockets: Vec<ListeningSocket>,
    error: Option<String>,
}

impl StaticProbe {
    pub fn new(sockets: Vec<ListeningSocket>) -> Self {
        Self {
            sockets,
            error: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sockets: Vec::new(),
            error: Some(message.into()),
        }
    }
}

impl PortProbe for StaticProbe {
    fn name(&self) -> &str {
        "static"
    }

    fn listening(&self) -> Result<Vec<ListeningSocket>> {
        match &self.error {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(self.sockets.clone()),
        }
    }
}

/// Reads `/proc/net/tcp{,6}` and maps socket inodes to owning processes
#[derive(Debug, Clone)]
pub struct ProcNetProbe {
    proc_root: PathBuf,
}

impl Default for ProcNetProbe {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl ProcNetProbe {
    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    fn socket_owners(&self) -> HashMap<u64, u32> {
        let mut owners = HashMap::new();
        let Ok(entries) = std::fs::read_dir(&self.proc_root) else {
            return owners;
        };

        for entry in entries.flatten() {
            let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) else {
                continue;
            };
            let Ok(fds) = std::fs::read_dir(entry.path().join("fd")) else {
                continue;
            };
            for fd in fds.flatten() {
                let Ok(target) = std::fs::read_link(fd.path()) else {
                    continue;
                };
                if let Some(inode) = target
                    .to_str()
                    .and_then(|t| t.strip_prefix("socket:["))
                    .and_then(|t| t.strip_suffix(']'))
                    .and_then(|t| t.parse::<u64>().ok())
                {
                    owners.insert(inode, pid);
                }
            }
        }

        owners
    }
}

impl PortProbe for ProcNetProbe {
    fn name(&self) -> &str {
        "procfs"
    }

    fn listening(&self) -> Result<Vec<ListeningSocket>> {
        let mut sockets_by_port: BTreeMap<u16, u64> = BTreeMap::new();
        let mut read_any = false;

        for table in ["net/tcp", "net/tcp6"] {
            let path = self.proc_root.join(table);
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            read_any = true;
            for (port, inode) in parse_proc_net(&content) {
                sockets_by_port.entry(port).or_insert(inode);
            }
        }

        if !read_any {
            return Err(anyhow!(
                "No socket tables under {}",
                self.proc_root.display()
            ));
        }

        let owners = self.socket_owners();
        let pids: Vec<Pid> = sockets_by_port
            .values()
            .filter_map(|inode| owners.get(inode))
            .map(|pid| Pid::from_u32(*pid))
            .collect();

        let mut system = System::new();
        if !pids.is_empty() {
            system.refresh_processes(ProcessesToUpdate::Some(&pids), true);
        }

        let sockets = sockets_by_port
            .into_iter()
            .map(|(port, inode)| {
                let pid = owners.get(&inode).copied();
                let process = pid
                    .and_then(|p| system.process(Pid::from_u32(p)))
                    .map(|p| p.name().to_string_lossy().into_owned());
                ListeningSocket { port, pid, process }
            })
            .collect();

        Ok(sockets)
    }
}

/// `(port, inode)` for every LISTEN row of a `/proc/net/tcp` table
pub fn parse_proc_net(content: &str) -> Vec<(u16, u64)> {
    const LISTEN: &str = "0A";

    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 || fields[3] != LISTEN {
                return None;
            }
            let port_hex = fields[1].rsplit(':').next()?;
            let port = u16::from_str_radix(port_hex, 16).ok()?;
            let inode = fields[9].parse::<u64>().ok()?;
            Some((port, inode))
        })
        .collect()
}

/// Platform default probe
pub fn default_probe() -> Arc<dyn PortProbe> {
    if cfg!(target_os = "linux") {
        Arc::new(ProcNetProbe::default())
    } else {
        Arc::new(NoopProbe)
    }
}

/// Runs the probe on the blocking pool with an upper bound on wall time
pub async fn probe_bounded(
    probe: Arc<dyn PortProbe>,
    timeout: Duration,
) -> Result<Vec<ListeningSocket>> {
    let task = tokio::task::spawn_blocking(move || probe.listening());
    tokio::time::timeout(timeout, task)
        .await
        .map_err(|_| anyhow!("Port probe timed out after {:?}", timeout))?
        .context("Port probe task failed")?
}

#[cfg(test)]
mod tests {
    use super::*;

    const TCP_TABLE: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 41234 1 0000000000000000 100 0 0 10 0
   1: 0100007F:0CEA 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 41235 1 0000000000000000 100 0 0 10 0
   2: 0100007F:A2C4 0100007F:1F90 01 00000000:00000000 00:00000000 00000000  1000        0 41236 1 0000000000000000 20 4 30 10 -1
";

    #[test]
    fn test_parse_proc_net_listen_rows_only() {
        let rows = parse_proc_net(TCP_TABLE);
        assert_eq!(rows, vec![(8080, 41234), (3306, 41235)]);
    }

    #[test]
    fn test_proc_net_probe_with_fake_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("net")).unwrap();
        std::fs::write(dir.path().join("net/tcp"), TCP_TABLE).unwrap();

        let probe = ProcNetProbe::with_proc_root(dir.path());
        let sockets = probe.listening().unwrap();
        let ports: Vec<u16> = sockets.iter().map(|s| s.port).collect();
        assert_eq!(ports, vec![3306, 8080]);
        assert!(sockets.iter().all(|s| s.pid.is_none()));
    }

    #[test]
    fn test_proc_net_probe_missing_tables() {
        let dir = tempfile::tempdir().unwrap();
        let probe = ProcNetProbe::with_proc_root(dir.path());
        assert!(probe.listening().is_err());
    }

    #[tokio::test]
    async fn test_probe_bounded_propagates_failure() {
        let probe: Arc<dyn PortProbe> = Arc::new(StaticProbe::failing("denied"));
        let err = probe_bounded(probe, Duration::from_secs(1)).await.unwrap_err();
        assert!(err.to_string().contains("denied"));
    }

    struct SlowProbe;

    impl PortProbe for SlowProbe {
        fn name(&self) -> &str {
            "slow"
        }

        fn listening(&self) -> Result<Vec<ListeningSocket>> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(vec![ListeningSocket::new(1)])
        }
    }

    #[tokio::test]
    async fn test_probe_bounded_times_out() {
        let probe: Arc<dyn PortProbe> = Arc::new(SlowProbe);
        let err = probe_bounded(probe, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
