use std::fmt::{self, Display, Formatter};

/// A single call frame active when a wire was created.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Frame {
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl Frame {
    pub fn new<S: Into<String>>(function: S) -> Self {
        Self {
            function: function.into(),
            file: None,
            line: None,
        }
    }

    pub fn at<S: Into<String>>(mut self, file: S, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{} at {}:{}", self.function, file, line),
            (Some(file), None) => write!(f, "{} at {}", self.function, file),
            _ => write!(f, "{}", self.function),
        }
    }
}

/// Source of call frames for wire provenance.
///
/// Implementations return frames outermost first, and an empty [Vec] when
/// capturing is not possible. Capture must never fail wire creation.
pub trait CaptureHook: Send + Sync {
    fn capture(&self) -> Vec<Frame>;
}

/// Captures frames from [std::backtrace::Backtrace].
///
/// Without the "backtrace-provenance" feature nothing is captured.
#[derive(Debug, Default, Clone, Copy)]
pub struct BacktraceCapture;

impl CaptureHook for BacktraceCapture {
    #[cfg(feature = "backtrace-provenance")]
    fn capture(&self) -> Vec<Frame> {
        use std::backtrace::{Backtrace, BacktraceStatus};
        let backtrace = Backtrace::force_capture();
        if backtrace.status() != BacktraceStatus::Captured {
            return Vec::new();
        }
        let mut frames = parse_backtrace(&backtrace.to_string());
        trim_internal_frames(&mut frames);
        frames
    }

    #[cfg(not(feature = "backtrace-provenance"))]
    fn capture(&self) -> Vec<Frame> {
        Vec::new()
    }
}

/// Parses the textual form of a [std::backtrace::Backtrace] into frames, outermost first.
///
/// Lines that look like neither a frame header (`N: function`) nor a location
/// (`at file:line:column`) are ignored.
pub fn parse_backtrace(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    for line in text.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let mut parts = location.rsplitn(3, ':');
                let _column = parts.next();
                let line = parts.next().and_then(|l| l.parse().ok());
                match (parts.next(), line) {
                    (Some(file), Some(line)) => {
                        frame.file = Some(file.to_owned());
                        frame.line = Some(line);
                    }
                    _ => frame.file = Some(location.to_owned()),
                }
            }
            continue;
        }
        if let Some((number, function)) = line.split_once(": ") {
            if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
                frames.push(Frame::new(function.trim()));
            }
        }
    }
    frames.reverse();
    frames
}

/// Paths of frames that belong to wire creation itself rather than to its caller.
const INTERNAL_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "wirenet::graph::",
    "wirenet::debug::",
    "<wirenet::debug::",
];

fn is_internal(frame: &Frame) -> bool {
    !frame.function.contains("::tests::")
        && INTERNAL_PREFIXES
            .iter()
            .any(|prefix| frame.function.starts_with(prefix))
}

/// Drops the innermost frames that are part of the capture machinery, leaving the
/// code that asked for the wire as the last frame.
pub fn trim_internal_frames(frames: &mut Vec<Frame>) {
    while frames.last().map_or(false, is_internal) {
        frames.pop();
    }
}

/// Records where wires are created.
///
/// Disabled by default since capturing costs a stack walk per created wire.
pub struct ProvenanceTracker {
    enabled: bool,
    hook: Box<dyn CaptureHook>,
}

impl ProvenanceTracker {
    /// Returns a disabled tracker using [BacktraceCapture].
    pub fn new() -> Self {
        Self {
            enabled: false,
            hook: Box::new(BacktraceCapture),
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true
    }

    pub fn disable(&mut self) {
        self.enabled = false
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Replaces the capture mechanism.
    pub fn set_hook<H: CaptureHook + 'static>(&mut self, hook: H) {
        self.hook = Box::new(hook)
    }

    /// Returns the captured frames if the tracker is enabled or `force` is set.
    pub fn capture(&self, force: bool) -> Option<Vec<Frame>> {
        if self.enabled || force {
            Some(self.hook.capture())
        } else {
            None
        }
    }
}

impl Default for ProvenanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProvenanceTracker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvenanceTracker")
            .field("enabled", &self.enabled)
            .finish()
    }
}
