use std::{
    io::{self, Write},
    process::{Command, Stdio},
};

use tracing::debug;

use crate::traits::Desktop;

#[cfg(target_os = "macos")]
const OPENERS: &[&[&str]] = &[&["open"]];
#[cfg(target_os = "windows")]
const OPENERS: &[&[&str]] = &[&["cmd", "/C", "start", ""]];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENERS: &[&[&str]] = &[&["xdg-open"], &["gio", "open"]];

const CLIPBOARDS: &[&[&str]] = &[
    &["pbcopy"],
    &["wl-copy"],
    &["xclip", "-selection", "clipboard"],
    &["xsel", "--clipboard", "--input"],
    &["clip"],
];

/// Uses whatever opener and clipboard tools the platform has installed. Both calls block
/// until the tool exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDesktop;

fn not_found(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no {what} tool found"))
}

impl Desktop for SystemDesktop {
    fn open(&self, url: &str) -> io::Result<()> {
        for argv in OPENERS {
            let status = Command::new(argv[0])
                .args(&argv[1..])
                .arg(url)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            match status {
                Ok(status) if status.success() => return Ok(()),
                Ok(status) => debug!("{} exited with {status}", argv[0]),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            }
        }
        Err(not_found("opener"))
    }

    fn copy(&self, text: &str) -> io::Result<()> {
        for argv in CLIPBOARDS {
            let child = Command::new(argv[0])
                .args(&argv[1..])
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
            let mut child = match child {
                Ok(child) => child,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            // Dropping stdin closes the pipe, the child is reaped even if writing failed.
            let written = match child.stdin.take() {
                Some(mut stdin) => stdin.write_all(text.as_bytes()),
                None => Ok(()),
            };
            let status = child.wait()?;
            written?;
            if status.success() {
                return Ok(());
            }
            debug!("{} exited with {status}", argv[0]);
        }
        Err(not_found("clipboard"))
    }
}
