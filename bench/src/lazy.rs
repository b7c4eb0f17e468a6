//! A value cell that is either already fetched or fetched on first read.

use crate::error::Result;
use std::cell::OnceCell;
use std::fmt;

type Loader<'a, T> = Box<dyn Fn() -> Result<T> + 'a>;

/// Holds a column value of a live record.
///
/// A deferred cell runs its loader on the first successful [`get`](Lazy::get)
/// and caches the result. Later reads never call the loader again. A failed
/// load caches nothing, so the next read retries.
pub struct Lazy<'a, T> {
    value: OnceCell<T>,
    loader: Option<Loader<'a, T>>,
}

impl<'a, T> Lazy<'a, T> {
    pub fn loaded(value: T) -> Self {
        Self {
            value: OnceCell::from(value),
            loader: None,
        }
    }

    pub fn deferred<F>(loader: F) -> Self
    where
        F: Fn() -> Result<T> + 'a,
    {
        Self {
            value: OnceCell::new(),
            loader: Some(Box::new(loader)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.value.get().is_some()
    }

    /// Value if it has already been fetched, without triggering a load.
    pub fn peek(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn get(&self) -> Result<&T> {
        if let Some(v) = self.value.get() {
            return Ok(v);
        }
        let Some(load) = &self.loader else {
            unreachable!("a Lazy without loader is always constructed loaded");
        };
        let fetched = load()?;
        Ok(self.value.get_or_init(|| fetched))
    }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.get() {
            Some(v) => f.debug_tuple("Loaded").field(v).finish(),
            None => f.write_str("Deferred"),
        }
    }
}
