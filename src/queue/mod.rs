pub mod dispatcher;

pub use dispatcher::{DispatchError, DispatchReport, Dispatcher};
