//! Tokio runtime for hosts that drive the UI with their own main loop

use std::io;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

/// A small multi-threaded runtime for bus and album art I/O.
///
/// GTK hosts run the UI on the GLib main loop, so the tokio side needs
/// threads of its own. Dropping it shuts the runtime down without waiting
/// for in-flight work.
pub struct BackgroundRuntime {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl BackgroundRuntime {
    pub fn new() -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("lockplayer-io")
            .enable_all()
            .build()?;
        debug!("Started background runtime");
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }
}

impl Drop for BackgroundRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_tasks_off_thread() {
        let runtime = BackgroundRuntime::new().unwrap();
        let handle = runtime.handle();
        let task = handle.spawn(async { std::thread::current().name().map(String::from) });
        let name = handle.block_on(task).unwrap();
        assert_eq!(name.as_deref(), Some("lockplayer-io"));
    }
}
