use crate::consts::SHELL;
use crate::types::StrHashMap;

use std::io;
use std::ptr;
use std::path::Path;
use std::ffi::{CStr, CString};
use std::time::SystemTime;
use std::os::unix::ffi::OsStringExt;

use thiserror::Error;
use nix::errno::Errno;
use nix::unistd::Pid;
use nix::sys::wait::{waitpid, WaitStatus};

/// How a command that did run came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Exited(i32),
    Signaled(i32),
}

impl Status {
    #[inline(always)]
    pub fn success(&self) -> bool {
        matches!(self, Status::Exited(0))
    }
}

#[derive(Debug, Error)]
pub enum FailureKind {
    #[error("exited with status {0}")]
    Exit(i32),

    #[error("terminated by signal {0}")]
    Signal(i32),

    #[error("could not launch: {0}")]
    Launch(#[source] io::Error),
}

#[derive(Debug, Error)]
#[error("command `{command}` {kind}")]
pub struct CommandFailure {
    pub command: String,
    pub kind: FailureKind,
}

/// Runs commands through `sh -c`, one at a time, inheriting stdio.
#[derive(Debug)]
pub struct Executor {
    echo: bool,
    shell: CString,
    /// Owns the `KEY=VALUE` strings `envp` points into.
    _env: Vec::<CString>,
    /// Environment handed to every child, null-terminated.
    envp: Vec::<*const libc::c_char>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Executor {
    #[inline]
    pub fn new(echo: bool) -> Self {
        let env = std::env::vars_os().filter_map(|(k, v)| {
            let mut kv = k.into_vec();
            kv.push(b'=');
            kv.extend(v.into_vec());
            CString::new(kv).ok()
        }).collect::<Vec::<_>>();

        let envp = env.iter()
            .map(|kv| kv.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();

        Self { echo, shell: SHELL.to_owned(), _env: env, envp }
    }

    /// Uses another shell binary; it is invoked as `<shell> -c <command>`.
    #[inline]
    pub fn with_shell(mut self, shell: &CStr) -> Self {
        self.shell = shell.to_owned();
        self
    }

    /// Runs `commands` in order and stops at the first one that does not exit with 0.
    pub fn execute<S: AsRef::<str>>(&self, commands: &[S]) -> Result::<(), CommandFailure> {
        for command in commands.iter().map(AsRef::as_ref) {
            if self.echo {
                println!("{command}")
            }

            let failure = |kind| CommandFailure { command: command.to_owned(), kind };
            match self.run(command) {
                Ok(Status::Exited(0)) => {}
                Ok(Status::Exited(code)) => return Err(failure(FailureKind::Exit(code))),
                Ok(Status::Signaled(signal)) => return Err(failure(FailureKind::Signal(signal))),
                Err(e) => return Err(failure(FailureKind::Launch(e))),
            }
        }
        Ok(())
    }

    /// Spawns a single command and blocks until it terminates.
    pub fn run(&self, command: &str) -> io::Result::<Status> {
        let pid = self.spawn(command)?;
        loop {
            match waitpid(Pid::from_raw(pid), None) {
                Ok(WaitStatus::Exited(_, code)) => return Ok(Status::Exited(code)),
                Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(Status::Signaled(signal as i32)),
                Ok(_) | Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn spawn(&self, command: &str) -> io::Result::<libc::pid_t> {
        let cmd = CString::new(command)?;
        let args = [
            self.shell.as_ptr(),
            c"-c".as_ptr(),
            cmd.as_ptr(),
            ptr::null(),
        ];

        let mut pid = 0;
        let ret = unsafe {
            libc::posix_spawn(
                &mut pid,
                self.shell.as_ptr(),
                ptr::null(),
                ptr::null(),
                args.as_ptr() as *const *mut _,
                self.envp.as_ptr() as *const *mut _,
            )
        };

        // posix_spawn reports failure through its return value, not errno.
        if ret != 0 {
            return Err(io::Error::from_raw_os_error(ret))
        }

        Ok(pid)
    }
}

/// Memoized modification times; `None` means the file does not exist.
#[derive(Debug, Default)]
pub struct MetadataCache<'a> {
    files: StrHashMap::<'a, Option::<SystemTime>>,
}

impl<'a> MetadataCache<'a> {
    #[inline]
    pub fn mtime(&mut self, f: &'a str) -> Option::<SystemTime> {
        *self.files.entry(f).or_insert_with(|| {
            let p: &Path = f.as_ref();
            p.metadata().and_then(|m| m.modified()).ok()
        })
    }

    #[inline(always)]
    pub fn exists(&mut self, f: &'a str) -> bool {
        self.mtime(f).is_some()
    }

    /// Forgets `f`, e.g. after its rule ran and may have rewritten it.
    #[inline(always)]
    pub fn invalidate(&mut self, f: &str) {
        self.files.remove(f);
    }
}
