//! Raw host actions. The executor decides *whether* to call these; this
//! module only knows *how*.

use crate::error::ActionError;
use std::{
    fs,
    io::Read,
    path::Path,
    process::{Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub total: u64,
    pub available: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub os: String,
    pub cpu: String,
    pub memory: Option<Capacity>,
    pub disk: Option<Capacity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

pub trait Host {
    fn open_url(&self, url: &str) -> Result<(), ActionError>;
    fn open_file_explorer(&self) -> Result<(), ActionError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), ActionError>;
    fn spawn_program(&self, program: &str) -> Result<(), ActionError>;
    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>, ActionError>;
    fn system_info(&self) -> SystemInfo;
    fn run_command(&self, argv: &[&str], timeout: Duration) -> Result<CommandOutput, ActionError>;
}

/// The real thing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

/// Starts a program without waiting for it. The child is reaped on its own
/// thread so finished GUI launches do not linger as zombies.
fn spawn_detached(
    program: &str,
    args: &[&str],
) -> Result<thread::JoinHandle<Option<ExitStatus>>, ActionError> {
    debug!("launching {} {:?}", program, args);
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ActionError::Spawn {
            program: program.to_string(),
            source,
        })?;
    Ok(thread::spawn(move || child.wait().ok()))
}

fn launch(program: &str, args: &[&str]) -> Result<(), ActionError> {
    spawn_detached(program, args).map(|_| ())
}

fn open_with_desktop(target: &str) -> Result<(), ActionError> {
    if cfg!(windows) {
        launch("cmd", &["/C", "start", "", target])
    } else if cfg!(target_os = "macos") {
        launch("open", &[target])
    } else {
        launch("xdg-open", &[target])
    }
}

fn read_all(mut pipe: impl Read + Send + 'static) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf).ok();
        String::from_utf8_lossy(&buf).into_owned()
    })
}

impl Host for SystemHost {
    fn open_url(&self, url: &str) -> Result<(), ActionError> {
        open_with_desktop(url)
    }

    fn open_file_explorer(&self) -> Result<(), ActionError> {
        if cfg!(windows) {
            launch("explorer", &[])
        } else {
            let home = dirs::home_dir()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| ".".to_string());
            open_with_desktop(&home)
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), ActionError> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn spawn_program(&self, program: &str) -> Result<(), ActionError> {
        if cfg!(target_os = "macos") && !program.contains('/') {
            launch("open", &["-a", program])
        } else {
            launch(program, &[])
        }
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>, ActionError> {
        if !path.exists() {
            return Err(ActionError::NoSuchPath(path.to_path_buf()));
        }
        let mut entries: Vec<DirEntryInfo> = fs::read_dir(path)?
            .filter_map(|e| e.ok())
            .map(|e| DirEntryInfo {
                name: e.file_name().to_string_lossy().into_owned(),
                is_dir: e.file_type().map(|t| t.is_dir()).unwrap_or(false),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn system_info(&self) -> SystemInfo {
        use sysinfo::{Disks, System};

        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu();

        let os = System::long_os_version()
            .or_else(System::name)
            .unwrap_or_else(|| std::env::consts::OS.to_string());
        let cpu = sys
            .cpus()
            .first()
            .map(|c| c.brand().trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| std::env::consts::ARCH.to_string());

        let memory = match sys.total_memory() {
            0 => None,
            total => Some(Capacity {
                total,
                available: sys.available_memory(),
            }),
        };

        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .max_by_key(|d| d.total_space())
            .map(|d| Capacity {
                total: d.total_space(),
                available: d.available_space(),
            });

        SystemInfo {
            os,
            cpu,
            memory,
            disk,
        }
    }

    fn run_command(&self, argv: &[&str], timeout: Duration) -> Result<CommandOutput, ActionError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ActionError::NotAllowed(String::new()))?;
        let display = argv.join(" ");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ActionError::Spawn {
                program: program.to_string(),
                source,
            })?;

        // Drain the pipes on their own threads so a chatty command cannot
        // block on a full pipe while we wait for it.
        let stdout = child.stdout.take().map(read_all);
        let stderr = child.stderr.take().map(read_all);

        let deadline = Instant::now() + timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                child.kill().ok();
                child.wait().ok();
                return Err(ActionError::Timeout(display, timeout.as_secs()));
            }
            thread::sleep(Duration::from_millis(25));
        };

        let join = |h: Option<thread::JoinHandle<String>>| {
            h.and_then(|h| h.join().ok()).unwrap_or_default()
        };

        Ok(CommandOutput {
            stdout: join(stdout),
            stderr: join(stderr),
            success: status.success(),
        })
    }
}

/// Host double that records every call and touches nothing.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: std::cell::RefCell<Vec<String>>,
    pub listing: Vec<DirEntryInfo>,
    pub fail_with_timeout: bool,
}

impl RecordingHost {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn note(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl Host for RecordingHost {
    fn open_url(&self, url: &str) -> Result<(), ActionError> {
        self.note(format!("open_url {}", url));
        Ok(())
    }

    fn open_file_explorer(&self) -> Result<(), ActionError> {
        self.note("open_file_explorer".to_string());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), ActionError> {
        self.note(format!("create_dir_all {}", path.display()));
        Ok(())
    }

    fn spawn_program(&self, program: &str) -> Result<(), ActionError> {
        self.note(format!("spawn_program {}", program));
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>, ActionError> {
        self.note(format!("list_dir {}", path.display()));
        Ok(self.listing.clone())
    }

    fn system_info(&self) -> SystemInfo {
        SystemInfo {
            os: "TestOS".to_string(),
            cpu: "TestCPU".to_string(),
            memory: None,
            disk: None,
        }
    }

    fn run_command(&self, argv: &[&str], timeout: Duration) -> Result<CommandOutput, ActionError> {
        let display = argv.join(" ");
        self.note(format!("run_command {}", display));
        if self.fail_with_timeout {
            return Err(ActionError::Timeout(display, timeout.as_secs()));
        }
        Ok(CommandOutput {
            stdout: "ok\n".to_string(),
            stderr: String::new(),
            success: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b");
        SystemHost.create_dir_all(&target).unwrap();
        SystemHost.create_dir_all(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_list_dir_sorted_and_typed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        let entries = SystemHost.list_dir(dir.path()).unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntryInfo { name: "a".into(), is_dir: true },
                DirEntryInfo { name: "b.txt".into(), is_dir: false },
            ]
        );
    }

    #[test]
    fn test_list_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            SystemHost.list_dir(&missing),
            Err(ActionError::NoSuchPath(_))
        ));
    }

    #[test]
    fn test_system_info_has_os_and_cpu() {
        let info = SystemHost.system_info();
        assert!(!info.os.is_empty());
        assert!(!info.cpu.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_captures_stdout() {
        let out = SystemHost
            .run_command(&["echo", "olá"], Duration::from_secs(5))
            .unwrap();
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "olá");
    }

    #[cfg(unix)]
    #[test]
    fn test_detached_child_is_reaped() {
        let reaper = spawn_detached("true", &[]).unwrap();
        let status = reaper.join().unwrap();
        assert!(status.map(|s| s.success()).unwrap_or(false));
    }

    #[test]
    fn test_launch_missing_program_is_spawn_error() {
        assert!(matches!(
            launch("sol-no-such-program-xyz", &[]),
            Err(ActionError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_times_out() {
        let result = SystemHost.run_command(&["sleep", "5"], Duration::from_millis(200));
        assert!(matches!(result, Err(ActionError::Timeout(_, _))));
    }
}
