//! Publish fan-out plumbing: the outcome channel shared by a session's publish tasks.

pub mod bus;
