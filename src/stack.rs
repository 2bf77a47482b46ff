// Stack capture for error-and-above records

use backtrace::Backtrace;
use std::fmt;

/// Marker of this module's own frames in resolved symbol names
const CAPTURE_SYMBOL: &str = "StackTrace::capture";

/// One resolved frame of a captured call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// A captured call stack, innermost frame first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackTrace {
    frames: Vec<StackFrame>,
}

impl StackTrace {
    /// Capture the current call stack
    ///
    /// Frames of the capturing machinery are always dropped; `skip` drops
    /// that many additional frames above it, so `skip = 0` starts at the
    /// caller of `capture`.
    #[inline(never)]
    pub fn capture(skip: usize) -> Self {
        let backtrace = Backtrace::new();
        let mut frames = Vec::new();

        for frame in backtrace.frames() {
            let symbols = frame.symbols();
            if symbols.is_empty() {
                frames.push(StackFrame {
                    function: format!("{:?}", frame.ip()),
                    file: None,
                    line: None,
                });
                continue;
            }
            // Inlined functions show up as several symbols of one frame
            for symbol in symbols {
                frames.push(StackFrame {
                    function: symbol
                        .name()
                        .map(|n| format!("{:#}", n))
                        .unwrap_or_else(|| "<unknown>".to_string()),
                    file: symbol.filename().map(|f| f.display().to_string()),
                    line: symbol.lineno(),
                });
            }
        }

        let start = frames
            .iter()
            .rposition(|f| f.function.contains(CAPTURE_SYMBOL))
            .map(|i| i + 1)
            .unwrap_or(0);
        let frames = frames.into_iter().skip(start + skip).collect();

        Self { frames }
    }

    /// Drop leading frames whose function path starts with one of `prefixes`
    ///
    /// Trait and inherent impl paths may be printed as `<path as Trait>`,
    /// so a leading `<` is ignored when matching.
    pub fn trim_leading(mut self, prefixes: &[&str]) -> Self {
        let internal = self
            .frames
            .iter()
            .take_while(|frame| {
                let name = frame.function.trim_start_matches('<');
                prefixes.iter().any(|prefix| name.starts_with(prefix))
            })
            .count();
        self.frames.drain(..internal);
        self
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&frame.function)?;
            if let Some(ref file) = frame.file {
                write!(f, "\n\t{}", file)?;
                if let Some(line) = frame.line {
                    write!(f, ":{}", line)?;
                }
            }
        }
        Ok(())
    }
}
