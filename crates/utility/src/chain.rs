/// Lets a value flow into a function at the end of a method chain.
pub trait Chain: Sized {
    /// Passes `self` by value into `f` and returns its result.
    fn let_owned<R, F: FnOnce(Self) -> R>(self, f: F) -> R {
        f(self)
    }
}

impl<T> Chain for T {}
