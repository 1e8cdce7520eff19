//! Background index builds.
//!
//! [`start_build`] moves the raw lists to a dedicated thread and returns at
//! once with a [`Ticket`] and a [`BuildJob`]. When the build ends, exactly one
//! [`Completion`] carrying the ticket and the result is sent on the caller's
//! completion channel. [`BuildJob::wait`] joins the thread and reports
//! whether the build succeeded.
//!
//! Builds cannot be cancelled. Dropping the job detaches the thread and the
//! completion is still delivered. Panics during a build are caught on the
//! worker and delivered as [`Error::BuildPanicked`].

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::handle::{self, IndexHandle};
use crate::wire::RawList;
use crate::{Error, IndexConfig, Result};

/// Name given to build threads.
const WORKER_NAME: &str = "ip-index-builder";

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Identifies one background build in its completion message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    fn next() -> Self {
        Self(NEXT_TICKET.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of a background build.
#[derive(Debug)]
pub struct Completion {
    pub ticket: Ticket,
    pub result: Result<IndexHandle>,
}

pub type CompletionSender = UnboundedSender<Completion>;
pub type CompletionReceiver = UnboundedReceiver<Completion>;

/// Create a channel that build workers report to.
///
/// One receiver can collect the completions of any number of builds.
pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    mpsc::unbounded_channel()
}

/// A running (or finished) background build.
#[derive(Debug)]
pub struct BuildJob {
    ticket: Ticket,
    thread: JoinHandle<Result<()>>,
}

impl BuildJob {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the build ends.
    ///
    /// On success the index itself is delivered through the completion
    /// channel. A failed build is reported as [`Error::BuildFailed`], or as
    /// [`Error::BuildPanicked`] if it panicked.
    pub fn wait(self) -> Result<()> {
        match self.thread.join() {
            Ok(status) => status,
            Err(payload) => Err(Error::BuildPanicked(panic_message(payload.as_ref()))),
        }
    }
}

/// Start building an index from `lists` on a background thread.
///
/// The only error returned directly is a failure to start the thread;
/// build errors arrive through `reply_to` and [`BuildJob::wait`].
pub fn start_build(
    lists: Vec<RawList>,
    config: IndexConfig,
    reply_to: CompletionSender,
) -> Result<(Ticket, BuildJob)> {
    spawn_build(move || handle::build(&lists, &config), reply_to)
}

fn spawn_build<F>(build: F, reply_to: CompletionSender) -> Result<(Ticket, BuildJob)>
where
    F: FnOnce() -> Result<IndexHandle> + Send + 'static,
{
    let ticket = Ticket::next();
    let thread = thread::Builder::new()
        .name(WORKER_NAME.to_string())
        .spawn(move || run_build(ticket, build, reply_to))
        .map_err(Error::Spawn)?;

    log::debug!("Started index build {}", ticket);
    Ok((ticket, BuildJob { ticket, thread }))
}

/// Worker body. Never unwinds past this point.
fn run_build<F>(ticket: Ticket, build: F, reply_to: CompletionSender) -> Result<()>
where
    F: FnOnce() -> Result<IndexHandle>,
{
    let result = match panic::catch_unwind(AssertUnwindSafe(build)) {
        Ok(result) => result,
        Err(payload) => Err(Error::BuildPanicked(panic_message(payload.as_ref()))),
    };

    let status = match &result {
        Ok(_) => {
            log::info!("Index build {} finished", ticket);
            Ok(())
        }
        Err(Error::BuildPanicked(message)) => {
            log::error!("Index build {} panicked: {}", ticket, message);
            Err(Error::BuildPanicked(message.clone()))
        }
        Err(e) => {
            log::warn!("Index build {} failed: {}", ticket, e);
            Err(Error::BuildFailed(e.to_string()))
        }
    };

    if reply_to.send(Completion { ticket, result }).is_err() {
        log::debug!("Index build {} completion dropped: receiver closed", ticket);
    }

    status
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
