// Editing sessions: the HTTP surface over the draft auto-saver. One session
// per open editor; edits stream in, saves stream out.

pub mod handlers;
pub mod session;
