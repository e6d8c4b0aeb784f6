//! End-to-end tests: dispatcher, handler registry and the in-memory backend.

mod helpers;

mod dispatch_test;
mod recurring_test;
mod retry_test;
