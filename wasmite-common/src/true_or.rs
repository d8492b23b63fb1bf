/// Converts a boolean condition into a `Result`, for use in precondition
/// guards:
///
/// ```
/// use wasmite_common::TrueOr;
/// fn check(size: usize) -> Result<(), String> {
///     (size <= 16).true_or_else(|| format!("too big: {size}"))
/// }
/// ```
pub trait TrueOr {
    fn true_or<E>(self, err: E) -> Result<(), E>;
    fn true_or_else<E, F: FnOnce() -> E>(self, err: F) -> Result<(), E>;
}

impl TrueOr for bool {
    fn true_or<E>(self, err: E) -> Result<(), E> {
        self.then_some(()).ok_or(err)
    }

    fn true_or_else<E, F: FnOnce() -> E>(self, err: F) -> Result<(), E> {
        self.then_some(()).ok_or_else(err)
    }
}
