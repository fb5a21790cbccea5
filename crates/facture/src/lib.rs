//! Invoicing service: companies, invoices, EBMS submission and PDF archiving.

pub mod config;
pub mod error;
pub mod invoicing;
pub mod telemetry;
