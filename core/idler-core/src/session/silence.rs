//! Scoped stdout/stderr suppression.
//!
//! The session component prints its own diagnostics during initialization.
//! The guard redirects both streams to the null device at the fd level and
//! restores them when dropped, so the restore also runs on unwind and early
//! returns.

use std::io::{self, Write};

/// Run `f` with process stdout/stderr redirected to the null device. If the
/// redirection cannot be set up, `f` still runs - suppression is cosmetic,
/// never load-bearing.
pub fn with_suppressed_output<T>(f: impl FnOnce() -> T) -> T {
    match SilencedOutput::engage() {
        Ok(_guard) => f(),
        Err(err) => {
            tracing::warn!(error = %err, "Could not silence component output");
            f()
        }
    }
}

#[cfg(unix)]
fn check(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

#[cfg(unix)]
struct SilencedOutput {
    saved_stdout: libc::c_int,
    saved_stderr: libc::c_int,
}

#[cfg(unix)]
impl SilencedOutput {
    fn engage() -> io::Result<Self> {
        // Flush Rust-side buffers before switching the underlying fds.
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();

        unsafe {
            let saved_stdout = check(libc::dup(libc::STDOUT_FILENO))?;
            let saved_stderr = match check(libc::dup(libc::STDERR_FILENO)) {
                Ok(fd) => fd,
                Err(err) => {
                    libc::close(saved_stdout);
                    return Err(err);
                }
            };

            let null = match check(libc::open(
                b"/dev/null\0".as_ptr() as *const libc::c_char,
                libc::O_WRONLY,
            )) {
                Ok(fd) => fd,
                Err(err) => {
                    libc::close(saved_stdout);
                    libc::close(saved_stderr);
                    return Err(err);
                }
            };

            let redirected = libc::dup2(null, libc::STDOUT_FILENO) >= 0
                && libc::dup2(null, libc::STDERR_FILENO) >= 0;
            libc::close(null);

            if !redirected {
                let err = io::Error::last_os_error();
                // Put back whichever stream already moved.
                libc::dup2(saved_stdout, libc::STDOUT_FILENO);
                libc::dup2(saved_stderr, libc::STDERR_FILENO);
                libc::close(saved_stdout);
                libc::close(saved_stderr);
                return Err(err);
            }

            Ok(Self {
                saved_stdout,
                saved_stderr,
            })
        }
    }
}

#[cfg(unix)]
impl Drop for SilencedOutput {
    fn drop(&mut self) {
        unsafe {
            libc::dup2(self.saved_stdout, libc::STDOUT_FILENO);
            libc::dup2(self.saved_stderr, libc::STDERR_FILENO);
            libc::close(self.saved_stdout);
            libc::close(self.saved_stderr);
        }
    }
}

#[cfg(not(unix))]
struct SilencedOutput;

#[cfg(not(unix))]
impl SilencedOutput {
    fn engage() -> io::Result<Self> {
        Ok(Self)
    }
}
