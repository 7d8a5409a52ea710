//! Collaborators around the core: row source, result sinks and notifiers.

mod notifier;
mod sink;
mod source;
mod sqlite;
mod twilio;

pub use notifier::{Notifier, NotifierError, TracingNotifier};
pub use sink::{RecordedResult, ResultSink, SinkError, TracingResultSink};
pub use source::{JsonRowSource, RowSource, RowSourceError, FIRST_ROW_ID};
pub use sqlite::SqliteResultSink;
pub use twilio::{TwilioConfig, TwilioNotifier};
