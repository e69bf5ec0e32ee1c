use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// The owning side of a cancellation signal.
///
/// The handle is kept by whoever is allowed to stop a piece of work, while
/// [`CancellationToken`]s are handed to the work itself. Tokens are polled
/// synchronously, which makes them usable from inside a script engine's
/// interrupt callback where no async runtime is available.
#[derive(Debug)]
pub struct CancellationTokenHandle {
    token_ref: Arc<AtomicBool>,
}

impl CancellationTokenHandle {
    pub fn new() -> CancellationTokenHandle {
        CancellationTokenHandle {
            token_ref: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.token_ref.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token_ref.load(Ordering::SeqCst)
    }

    pub fn get_token(&self) -> CancellationToken {
        CancellationToken {
            token_ref: self.token_ref.clone(),
        }
    }
}

impl Default for CancellationTokenHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct CancellationToken {
    token_ref: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that nobody can cancel.
    pub fn never() -> CancellationToken {
        CancellationTokenHandle::new().get_token()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token_ref.load(Ordering::SeqCst)
    }
}
