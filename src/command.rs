//! Checked subprocess execution
//!
//! Every command is echoed as `+ argv...` before it runs. stdout and stderr are captured on
//! reader threads so a chatty child cannot fill a pipe and stall. The wait is bounded; a child
//! that outlives it is killed.

use std::ffi::{ OsStr, OsString };
use std::io::Read;
use std::process::{ Command, ExitStatus, Stdio };
use std::thread::{ self, JoinHandle };
use std::time::Duration;

use log::{ debug, info };
use wait_timeout::ChildExt;

use crate::cofg::Cofg;
use crate::error::{ HarnessError, HarnessResult };

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub argv: Vec<String>,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut buf) {
                debug!("pipe read failed: {e}");
            }
            buf
        })
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|r| r.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

/// Run `argv` with the configured command timeout.
pub fn run<I, S>(argv: I, check: bool) -> HarnessResult<CommandOutput>
    where I: IntoIterator<Item = S>, S: AsRef<OsStr>
{
    run_with_timeout(argv, check, Cofg::get()?.command_timeout())
}

/// Run `argv`, waiting at most `timeout`. With `check`, a non-zero exit is an
/// `ExternalCommand` error carrying the captured output.
pub fn run_with_timeout<I, S>(argv: I, check: bool, timeout: Duration) -> HarnessResult<CommandOutput>
    where I: IntoIterator<Item = S>, S: AsRef<OsStr>
{
    let argv: Vec<OsString> = argv
        .into_iter()
        .map(|a| a.as_ref().to_os_string())
        .collect();
    let display: Vec<String> = argv
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let Some((program, args)) = argv.split_first() else {
        return Err(HarnessError::Other("empty command line".to_string()));
    };

    info!("+ {}", display.join(" "));
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            HarnessError::Io(std::io::Error::new(e.kind(), format!("failed to spawn {}: {e}", display[0])))
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let Some(status) = child.wait_timeout(timeout)? else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(HarnessError::timeout(format!("`{}`", display.join(" ")), timeout));
    };

    let output = CommandOutput {
        argv: display,
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    };
    debug!("{} -> {status}", output.argv.join(" "));

    if check && !output.success() {
        return Err(HarnessError::ExternalCommand {
            argv: output.argv,
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }
    Ok(output)
}
