use std::fmt;

/// A borrowed `name -> value` pair reported by an instrumented frame.
///
/// Values are only borrowed for the duration of one event; the router
/// renders them into a [`VariableSnapshot`](crate::VariableSnapshot) before
/// the event returns.
#[derive(Clone, Copy)]
pub struct Binding<'a> {
    pub name: &'a str,
    pub value: &'a dyn fmt::Debug,
}

impl<'a> Binding<'a> {
    pub const fn new(name: &'a str, value: &'a dyn fmt::Debug) -> Self {
        Self { name, value }
    }
}

impl fmt::Debug for Binding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").field("name", &self.name).finish_non_exhaustive()
    }
}
