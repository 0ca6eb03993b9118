//! Delivery backends for a committed snippet: clipboard writers and the
//! injection pipe client.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutputError {
    #[error("{backend} unavailable: {message}")]
    Unavailable {
        backend: &'static str,
        message: String,
    },
    #[error("{backend} write failed: {message}")]
    WriteFailed {
        backend: &'static str,
        message: String,
    },
    #[error("all delivery paths failed: {0}")]
    Exhausted(String),
    #[error("commit aborted: {0}")]
    Aborted(String),
}

pub trait OutputBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn write_output(&self, text: &str) -> Result<(), OutputError>;
}

pub trait Injector: Send + Sync {
    fn trigger_injection(&self, candidate_id: i64) -> Result<(), OutputError>;
}

/// Primary backend plus an optional fallback tried once when the primary fails.
pub struct OutputChain {
    primary: Box<dyn OutputBackend>,
    fallback: Option<Box<dyn OutputBackend>>,
}

impl OutputChain {
    pub fn new(primary: Box<dyn OutputBackend>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn OutputBackend>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// System clipboard first, then the platform's native clipboard path.
    pub fn system(native_fallback: bool) -> Self {
        let chain = Self::new(Box::new(SystemClipboard));
        if native_fallback {
            chain.with_fallback(Box::new(NativeClipboard))
        } else {
            chain
        }
    }

    /// Returns the name of the backend that accepted the text.
    pub fn write(&self, text: &str) -> Result<&'static str, OutputError> {
        let primary_error = match self.primary.write_output(text) {
            Ok(()) => return Ok(self.primary.name()),
            Err(error) => error,
        };
        tracing::warn!(backend = self.primary.name(), %primary_error, "primary output failed");

        let Some(fallback) = &self.fallback else {
            return Err(OutputError::Exhausted(primary_error.to_string()));
        };
        match fallback.write_output(text) {
            Ok(()) => Ok(fallback.name()),
            Err(fallback_error) => Err(OutputError::Exhausted(format!(
                "{primary_error}; {fallback_error}"
            ))),
        }
    }
}

pub struct SystemClipboard;

impl OutputBackend for SystemClipboard {
    fn name(&self) -> &'static str {
        "clipboard"
    }

    fn write_output(&self, text: &str) -> Result<(), OutputError> {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| OutputError::Unavailable {
            backend: self.name(),
            message: e.to_string(),
        })?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| OutputError::WriteFailed {
                backend: self.name(),
                message: e.to_string(),
            })
    }
}

/// Win32 clipboard on Windows; `pbcopy`, `wl-copy`, `xclip` or `xsel` elsewhere.
pub struct NativeClipboard;

impl OutputBackend for NativeClipboard {
    fn name(&self) -> &'static str {
        "native-clipboard"
    }

    fn write_output(&self, text: &str) -> Result<(), OutputError> {
        write_native_clipboard(text).map_err(|message| OutputError::WriteFailed {
            backend: self.name(),
            message,
        })
    }
}

#[cfg(target_os = "windows")]
fn write_native_clipboard(value: &str) -> Result<(), String> {
    use windows_sys::Win32::System::DataExchange::{
        CloseClipboard, EmptyClipboard, OpenClipboard, SetClipboardData,
    };
    use windows_sys::Win32::System::Memory::{
        GlobalAlloc, GlobalFree, GlobalLock, GlobalUnlock, GMEM_MOVEABLE,
    };
    const CF_UNICODETEXT: u32 = 13;

    let wide: Vec<u16> = value.encode_utf16().chain(std::iter::once(0)).collect();
    let bytes = wide.len() * std::mem::size_of::<u16>();
    unsafe {
        if OpenClipboard(std::ptr::null_mut()) == 0 {
            return Err("failed to open clipboard".to_string());
        }
        if EmptyClipboard() == 0 {
            CloseClipboard();
            return Err("failed to clear clipboard".to_string());
        }

        let mem = GlobalAlloc(GMEM_MOVEABLE, bytes);
        if mem.is_null() {
            CloseClipboard();
            return Err("failed to allocate clipboard memory".to_string());
        }

        let ptr = GlobalLock(mem) as *mut u16;
        if ptr.is_null() {
            GlobalFree(mem);
            CloseClipboard();
            return Err("failed to lock clipboard memory".to_string());
        }
        std::ptr::copy_nonoverlapping(wide.as_ptr(), ptr, wide.len());
        GlobalUnlock(mem);

        if SetClipboardData(CF_UNICODETEXT, mem).is_null() {
            GlobalFree(mem);
            CloseClipboard();
            return Err("failed to set clipboard data".to_string());
        }

        CloseClipboard();
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn write_native_clipboard(value: &str) -> Result<(), String> {
    let candidates: &[(&str, &[&str])] = if cfg!(target_os = "macos") {
        &[("pbcopy", &[])]
    } else {
        &[
            ("wl-copy", &[]),
            ("xclip", &["-selection", "clipboard"]),
            ("xsel", &["--clipboard", "--input"]),
        ]
    };

    let mut failures = Vec::new();
    for (command, args) in candidates {
        match pipe_to_command(command, args, value) {
            Ok(()) => return Ok(()),
            Err(error) => failures.push(format!("{command}: {error}")),
        }
    }
    Err(failures.join("; "))
}

#[cfg(not(target_os = "windows"))]
fn pipe_to_command(command: &str, args: &[&str], content: &str) -> Result<(), String> {
    use std::process::{Command, Stdio};

    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| e.to_string())?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(content.as_bytes())
            .map_err(|e| e.to_string())?;
    }
    let status = child.wait().map_err(|e| e.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("exit status {status}"))
    }
}

/// Asks the injection service to type a snippet into the focused application.
/// Writes `INJECT_PROMPT:{id}\n` to the service's pipe (a named pipe on
/// Windows, a Unix socket elsewhere).
pub struct PipeInjector {
    pipe_path: PathBuf,
}

impl PipeInjector {
    pub fn new(pipe_path: impl Into<PathBuf>) -> Self {
        Self {
            pipe_path: pipe_path.into(),
        }
    }

    pub fn message_for(candidate_id: i64) -> String {
        format!("INJECT_PROMPT:{candidate_id}\n")
    }

    fn send(&self, message: &str) -> std::io::Result<()> {
        #[cfg(unix)]
        let mut pipe = std::os::unix::net::UnixStream::connect(&self.pipe_path)?;
        #[cfg(not(unix))]
        let mut pipe = std::fs::OpenOptions::new()
            .write(true)
            .open(&self.pipe_path)?;

        pipe.write_all(message.as_bytes())?;
        pipe.flush()
    }
}

impl Injector for PipeInjector {
    fn trigger_injection(&self, candidate_id: i64) -> Result<(), OutputError> {
        self.send(&Self::message_for(candidate_id))
            .map_err(|e| OutputError::Unavailable {
                backend: "inject-pipe",
                message: format!("{}: {e}", self.pipe_path.display()),
            })
    }
}

/// Recording backend with a failure switch, for tests and dry runs.
pub struct MockOutput {
    name: &'static str,
    fail: AtomicBool,
    writes: Mutex<Vec<String>>,
}

impl MockOutput {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fail: AtomicBool::new(false),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        let output = Self::new(name);
        output.set_fail(true);
        output
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }
}

impl OutputBackend for MockOutput {
    fn name(&self) -> &'static str {
        self.name
    }

    fn write_output(&self, text: &str) -> Result<(), OutputError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(OutputError::WriteFailed {
                backend: self.name,
                message: "mock failure".into(),
            });
        }
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(text.to_string());
        }
        Ok(())
    }
}

// Lets tests keep a handle on a mock after boxing it into a chain.
impl<T: OutputBackend + ?Sized> OutputBackend for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn write_output(&self, text: &str) -> Result<(), OutputError> {
        (**self).write_output(text)
    }
}

#[derive(Default)]
pub struct MockInjector {
    fail: AtomicBool,
    injected: Mutex<Vec<i64>>,
}

impl MockInjector {
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn injected(&self) -> Vec<i64> {
        self.injected
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

impl Injector for MockInjector {
    fn trigger_injection(&self, candidate_id: i64) -> Result<(), OutputError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(OutputError::Unavailable {
                backend: "mock-injector",
                message: "mock failure".into(),
            });
        }
        if let Ok(mut ids) = self.injected.lock() {
            ids.push(candidate_id);
        }
        Ok(())
    }
}

impl<T: Injector + ?Sized> Injector for std::sync::Arc<T> {
    fn trigger_injection(&self, candidate_id: i64) -> Result<(), OutputError> {
        (**self).trigger_injection(candidate_id)
    }
}
