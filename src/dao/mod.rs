/// Transport-neutral error type of remote calls.
pub mod api;
/// The ranked backend trait and its HTTP implementation.
pub mod ranked_api;
/// Session token storage.
pub mod session;
