use std::thread;

use flume::Sender;

/// Abstraction over a threadpool that can spawn tasks.
///
/// Used to rasterize glyphs ahead of time without blocking the thread
/// that owns the drawing surface.
pub trait ThreadPool: Send + Sync + 'static {
    fn spawn(&self, task: impl FnOnce() + Send + 'static);
}

trait FnBox: Send + 'static {
    fn call(self: Box<Self>);
}

impl<T> FnBox for T
where
    T: FnOnce() + Send + 'static,
{
    fn call(self: Box<Self>) {
        (*self)()
    }
}

/// A basic thread pool. Workers exit once the pool is dropped and
/// the queued tasks have run.
pub struct BasicThreadPool {
    tasks: Sender<Box<dyn FnBox>>,
}

impl BasicThreadPool {
    pub fn new(num_threads: usize) -> Self {
        let (sender, receiver) = flume::unbounded::<Box<dyn FnBox>>();

        for i in 0..num_threads.max(1) {
            let receiver = receiver.clone();
            let spawned = thread::Builder::new()
                .name(format!("folio-worker-{}", i))
                .spawn(move || {
                    for task in receiver {
                        task.call();
                    }
                });
            if let Err(e) = spawned {
                log::error!("Failed to spawn glyph worker thread: {}", e);
            }
        }

        Self { tasks: sender }
    }
}

impl ThreadPool for BasicThreadPool {
    fn spawn(&self, task: impl FnOnce() + Send + 'static) {
        if self.tasks.send(Box::new(task)).is_err() {
            log::warn!("Thread pool has no workers left; dropping task");
        }
    }
}
