use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use crate::log::init_log;

/// A handy shortcut to replace the `RwLock` `write()/read().unwrap()`
/// pattern with `wl` and `rl`.
pub trait HandyRwLock<T> {
    fn wl(&self) -> RwLockWriteGuard<'_, T>;
    fn rl(&self) -> RwLockReadGuard<'_, T>;
}

impl<T> HandyRwLock<T> for RwLock<T> {
    fn wl(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap()
    }

    fn rl(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap()
    }
}
