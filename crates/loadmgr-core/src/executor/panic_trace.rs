//! Backtraces recorded at the panic site of a worker.
//!
//! A process-wide panic hook, chained in front of whatever hook was installed before, records a backtrace when the panicking thread is inside an armed [`Scope`].
//! The task boundary collects it with [`take`] right after `catch_unwind` returns, on the same thread.
use std::{
    backtrace::Backtrace,
    cell::{Cell, RefCell},
    panic,
    sync::Once,
};

thread_local! {
    static ARMED: Cell<bool> = const { Cell::new(false) };
    static LAST: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Install the recording hook once per process.
pub(crate) fn install() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if ARMED.try_with(Cell::get).unwrap_or(false) {
                let trace = Backtrace::force_capture().to_string();
                let _ = LAST.try_with(|slot| *slot.borrow_mut() = Some(trace));
            }
            previous(info);
        }));
    });
}

/// Arms recording on the current thread until dropped.
pub(crate) struct Scope {
    previous: bool,
}

impl Scope {
    pub fn enter() -> Self {
        LAST.with(|slot| slot.borrow_mut().take());
        Self {
            previous: ARMED.with(|armed| armed.replace(true)),
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        ARMED.with(|armed| armed.set(self.previous));
    }
}

/// Trace of the last armed panic on this thread, if any.
pub(crate) fn take() -> Option<String> {
    LAST.with(|slot| slot.borrow_mut().take())
}
