//! Function metadata and code identity.

use std::fmt;

/// Identity of an instrumented function's code.
///
/// Derived from the address of the function's `static` [`FunctionMeta`], so
/// two metas never compare equal even when they share a name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeId(usize);

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code@{:#x}", self.0)
    }
}

/// Static description of an instrumented function.
///
/// Declare one per function as a `static` and pass it to every frame the
/// function opens. Attaching the defining file's text with
/// [`with_source`](Self::with_source) lets the step debugger show the
/// source of each executed line; line numbers are then plain file lines as
/// produced by `line!()`.
///
/// ```
/// use steptrace_frame::FunctionMeta;
///
/// static FIB: FunctionMeta = FunctionMeta::new("fib").with_source("fn fib() {}\n");
/// assert_eq!(FIB.source_line(1), Some("fn fib() {}"));
/// ```
#[derive(Debug)]
pub struct FunctionMeta {
    name: &'static str,
    source: Option<&'static str>,
}

impl FunctionMeta {
    /// Metadata with a name and no source text.
    pub const fn new(name: &'static str) -> Self {
        Self { name, source: None }
    }

    /// Attach the full text of the file that defines the function.
    pub const fn with_source(self, source: &'static str) -> Self {
        Self {
            name: self.name,
            source: Some(source),
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Code identity of this function.
    pub fn id(&'static self) -> CodeId {
        CodeId(std::ptr::from_ref(self) as usize)
    }

    /// Trimmed text of a 1-based source line, if source is attached.
    pub fn source_line(&self, line: u32) -> Option<&'static str> {
        let index = usize::try_from(line.checked_sub(1)?).ok()?;
        self.source?.lines().nth(index).map(str::trim)
    }

    /// First 1-based line whose trimmed text starts with `needle`.
    pub fn find_line(&self, needle: &str) -> Option<u32> {
        let index = self
            .source?
            .lines()
            .position(|line| line.trim_start().starts_with(needle))?;
        u32::try_from(index + 1).ok()
    }
}
