use std::thread::{self, JoinHandle};

/// Spawns a detached background thread named `clearbar-<name>`.
pub fn spawn_named_thread<F>(name: &str, task: F)
where F: FnOnce() + Send + 'static {
    let _ = spawn_joinable_thread(name, task);
}

/// Spawns a background thread named `clearbar-<name>` and returns its handle.
///
/// Returns `None` (after logging) when the OS refuses to create the thread.
pub fn spawn_joinable_thread<F>(name: &str, task: F) -> Option<JoinHandle<()>>
where F: FnOnce() + Send + 'static {
    let thread_name = format!("clearbar-{name}");

    match thread::Builder::new().name(thread_name.clone()).spawn(task) {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::error!(thread = %thread_name, error = %err, "failed to spawn thread");
            None
        }
    }
}

// ============================================================================
// Main Thread Dispatch (macOS GCD)
// ============================================================================

#[cfg(target_os = "macos")]
mod gcd {
    use std::ffi::c_void;

    type DispatchQueue = *const c_void;

    #[link(name = "System", kind = "dylib")]
    unsafe extern "C" {
        /// The main dispatch queue (this is the actual symbol, not the macro).
        static _dispatch_main_q: c_void;
        fn dispatch_async_f(
            queue: DispatchQueue,
            context: *mut c_void,
            work: extern "C" fn(*mut c_void),
        );
    }

    /// Equivalent of the `dispatch_get_main_queue()` macro.
    fn get_main_queue() -> DispatchQueue { std::ptr::addr_of!(_dispatch_main_q) }

    struct DispatchContext<F: FnOnce() + Send + 'static> {
        closure: Option<F>,
    }

    extern "C" fn dispatch_trampoline<F: FnOnce() + Send + 'static>(context: *mut c_void) {
        unsafe {
            let ctx = Box::from_raw(context.cast::<DispatchContext<F>>());
            if let Some(closure) = ctx.closure {
                closure();
            }
        }
    }

    /// Dispatches a closure to run on the main thread asynchronously.
    pub fn dispatch_on_main<F>(closure: F)
    where F: FnOnce() + Send + 'static {
        let ctx = Box::new(DispatchContext { closure: Some(closure) });
        let ctx_ptr = Box::into_raw(ctx).cast::<c_void>();

        unsafe {
            dispatch_async_f(get_main_queue(), ctx_ptr, dispatch_trampoline::<F>);
        }
    }
}

#[cfg(target_os = "macos")]
pub use gcd::dispatch_on_main;
