//! # Events Module
//!
//! Event-driven progress reporting for long-running operations.
//!
//! ## Design
//! The core emits events through channels, so any caller (CLI, GUI,
//! service) can subscribe and display progress without the core knowing
//! who is listening. Long-running work also accepts a
//! [`CancellationToken`] that is polled between files and operations.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! let listener = std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Execute(ExecuteEvent::Progress { index, total, .. }) = event {
//!             println!("{}/{}", index, total);
//!         }
//!     }
//! });
//!
//! let organizer = Organizer::new(config)?.with_events(sender);
//! organizer.execute_plan(&plan, false);
//! drop(organizer);
//! listener.join().ok();
//! ```

mod cancel;
mod channel;
mod types;

pub use cancel::CancellationToken;
pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
