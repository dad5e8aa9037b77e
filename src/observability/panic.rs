//! Panic capture for contained handler faults.
//!
//! # Responsibilities
//! - Record where a panic happened and the stack at that point
//! - Turn a caught panic payload into something loggable
//!
//! # Design Decisions
//! - The hook stores the capture in a thread-local. `catch_unwind` runs on the
//!   same thread as the panic, inside the same poll, so the barrier reads back
//!   exactly the capture for the fault it caught
//! - The previously installed hook still runs, so default stderr output and
//!   any hook installed by the application are preserved

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::sync::Once;

static INSTALL: Once = Once::new();

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicCapture>> = const { RefCell::new(None) };
}

/// Location and stack recorded when a panic was raised.
#[derive(Debug)]
pub struct PanicCapture {
    pub location: String,
    pub backtrace: String,
}

/// Install the capturing hook. Idempotent.
pub fn install_hook() {
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "<unknown>".to_string());
            let capture = PanicCapture {
                location,
                backtrace: Backtrace::force_capture().to_string(),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(capture));
            previous(info);
        }));
    });
}

/// Take the capture recorded for the most recent panic on this thread.
pub fn take_capture() -> Option<PanicCapture> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

/// Best-effort text of a panic payload.
pub fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "non-string panic payload".to_string()
    }
}
