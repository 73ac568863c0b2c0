//! REST facade over the order and stock RPC services

pub mod clients;
pub mod config;
pub mod handler;
