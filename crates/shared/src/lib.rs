//! Types shared between the contest API server and its clients.

pub mod api;
