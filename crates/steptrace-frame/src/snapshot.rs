//! Variable snapshots and the display-safe binding formatter.

use std::fmt::{self, Write as _};
use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::{Binding, FunctionMeta};

/// Shown in place of a value whose `Debug` impl failed or panicked.
pub const UNRENDERABLE: &str = "<cannot display value>";

/// Names with a leading double underscore are implementation-reserved and
/// never displayed.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with("__")
}

/// Render one value with its `Debug` impl.
///
/// A formatter error or a panic inside the impl yields [`UNRENDERABLE`].
pub fn render_value(value: &dyn fmt::Debug) -> String {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut out = String::new();
        write!(out, "{value:?}").map(|()| out)
    }));

    match attempt {
        Ok(Ok(rendered)) => rendered,
        Ok(Err(fmt::Error)) => {
            debug!("value formatter returned an error");
            UNRENDERABLE.to_string()
        }
        Err(_) => {
            debug!("value formatter panicked");
            UNRENDERABLE.to_string()
        }
    }
}

/// Render bindings into ordered `(name, value)` pairs.
///
/// Reserved names are skipped. A name reported twice keeps its first
/// position and its last value, matching a shadowed local.
pub fn format_bindings(bindings: &[Binding<'_>]) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(bindings.len());
    for binding in bindings.iter().filter(|b| !is_reserved(b.name)) {
        let rendered = render_value(binding.value);
        match out.iter_mut().find(|(name, _)| *name == binding.name) {
            Some(slot) => slot.1 = rendered,
            None => out.push((binding.name.to_string(), rendered)),
        }
    }
    out
}

/// Rendered local bindings of one line event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableSnapshot {
    function: &'static str,
    line: u32,
    vars: Vec<(String, String)>,
}

impl VariableSnapshot {
    /// Render `bindings` as seen at `line` of `meta`.
    pub fn capture(meta: &FunctionMeta, line: u32, bindings: &[Binding<'_>]) -> Self {
        Self {
            function: meta.name(),
            line,
            vars: format_bindings(bindings),
        }
    }

    pub const fn function(&self) -> &'static str {
        self.function
    }

    pub const fn line(&self) -> u32 {
        self.line
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Rendered value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Variable names in capture order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locals;

    static SNAP: FunctionMeta = FunctionMeta::new("snap");

    /// Debug impl that always reports a formatter error.
    struct Refuses;

    impl fmt::Debug for Refuses {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    /// Debug impl that panics.
    struct Explodes;

    impl fmt::Debug for Explodes {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("boom")
        }
    }

    #[test]
    fn test_render_value_uses_debug() {
        assert_eq!(render_value(&15), "15");
        assert_eq!(render_value(&"hi"), "\"hi\"");
        assert_eq!(render_value(&vec![1, 2]), "[1, 2]");
    }

    #[test]
    fn test_failing_values_become_placeholder() {
        let ok = 1;
        let refuses = Refuses;
        let explodes = Explodes;
        let rendered = format_bindings(&locals![ok, refuses, explodes]);
        assert_eq!(
            rendered,
            vec![
                ("ok".to_string(), "1".to_string()),
                ("refuses".to_string(), UNRENDERABLE.to_string()),
                ("explodes".to_string(), UNRENDERABLE.to_string()),
            ]
        );
    }

    #[test]
    fn test_reserved_names_skipped() {
        let visible = 3;
        let hidden = 4;
        let bindings = [
            Binding::new("visible", &visible),
            Binding::new("__hidden", &hidden),
            Binding::new("_single", &hidden),
        ];
        let names: Vec<_> = format_bindings(&bindings).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["visible", "_single"]);
    }

    #[test]
    fn test_shadowed_name_keeps_last_value() {
        let first = 1;
        let second = 2;
        let bindings = [Binding::new("x", &first), Binding::new("x", &second)];
        assert_eq!(format_bindings(&bindings), vec![("x".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_snapshot_accessors() {
        let x = 5;
        let y = 10;
        let snapshot = VariableSnapshot::capture(&SNAP, 9, &locals![x, y]);
        assert_eq!(snapshot.function(), "snap");
        assert_eq!(snapshot.line(), 9);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.names().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(snapshot.get("x"), Some("5"));
        assert_eq!(snapshot.get("z"), None);
    }
}
