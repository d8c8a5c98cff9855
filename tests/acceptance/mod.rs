//! Integration tests for robot HAL acceptance testing.

mod alarm_test;
mod barrier_test;
mod common;
