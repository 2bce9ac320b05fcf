// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Deltalist - Observable ordered collections with canonical change events.
//!
//! Mutations made inside a transaction are folded into one minimal, ordered
//! [`Delta`](delta::Delta), which is then published to listeners in the
//! dependency order of derived collections.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use deltalist::list::ListEvent;
//! use deltalist::list::ObservableList;
//! use deltalist::publisher::Publisher;
//! use parking_lot::Mutex;
//!
//! let publisher = Publisher::new();
//! let list = ObservableList::from_vec(&publisher, vec![1, 2, 3]);
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! list.add_listener(move |event: &ListEvent<'_, i32>| -> deltalist::Result<()> {
//!     sink.lock().push(event.delta.to_string());
//!     Ok(())
//! });
//!
//! let mut writer = list.write().unwrap();
//! writer.insert(0, 0).unwrap();
//! writer.remove(0).unwrap();
//! writer.set(2, 30).unwrap();
//! writer.commit().unwrap();
//!
//! // the insert and the delete cancel out
//! assert_eq!(seen.lock().as_slice(), &["[U2]".to_string()]);
//! ```

pub mod config;
pub mod delta;
pub mod diff;
pub mod error;
pub mod list;
pub mod publisher;

pub use config::Config;
pub use config::Strategy;
pub use delta::ChangeKind;
pub use delta::Delta;
pub use delta::Operation;
pub use delta::assembler::Commit;
pub use delta::assembler::DeltaAssembler;
pub use error::Error;
pub use error::Result;
pub use list::ListEvent;
pub use list::ListListener;
pub use list::ListWriter;
pub use list::ObservableList;
pub use publisher::ListenerId;
pub use publisher::Publisher;
pub use publisher::SubjectId;
