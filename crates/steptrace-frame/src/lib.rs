//! Frame model for steptrace.
//!
//! An instrumented function describes itself once with a `static`
//! [`FunctionMeta`] and reports its bindings as [`Binding`] slices, usually
//! built with the [`locals!`] macro. The router turns those borrowed
//! bindings into owned [`VariableSnapshot`]s with [`format_bindings`], which
//! never fails: values that cannot be rendered show [`UNRENDERABLE`].
//!
//! ```
//! use steptrace_frame::{FunctionMeta, VariableSnapshot, locals};
//!
//! static ADD: FunctionMeta = FunctionMeta::new("add");
//!
//! let (x, y) = (5, 10);
//! let snapshot = VariableSnapshot::capture(&ADD, 7, &locals![x, y]);
//! assert_eq!(snapshot.get("y"), Some("10"));
//! ```

mod binding;
mod meta;
mod snapshot;

pub use binding::Binding;
pub use meta::{CodeId, FunctionMeta};
pub use snapshot::{UNRENDERABLE, VariableSnapshot, format_bindings, is_reserved, render_value};

/// Build a `[Binding; N]` array from local variables.
///
/// Accepts either plain identifiers (`locals![x, y]`) or `name = expr`
/// pairs. Pass the result by reference. A computed value borrows a
/// temporary, so use it inline as an argument
/// (`frame.line(3, &locals![len = items.len()])`) or bind it first.
#[macro_export]
macro_rules! locals {
    () => {{
        let empty: [$crate::Binding<'static>; 0] = [];
        empty
    }};
    ($($name:ident),+ $(,)?) => {
        [$($crate::Binding::new(stringify!($name), &$name)),+]
    };
    ($($name:ident = $value:expr),+ $(,)?) => {
        [$($crate::Binding::new(stringify!($name), &$value)),+]
    };
}
