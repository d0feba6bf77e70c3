//! Shared primitives for the grant escrow contracts.
//!
//! Two concerns live here, both consumed by `grant-escrow`:
//!
//! - [`asset`] — the canonical token identifier and its validation rules.
//! - [`transfer`] — the asset-transfer boundary. Every token movement in the
//!   escrow goes through [`transfer::receive`] or [`transfer::pay`], which
//!   surface failures as typed errors instead of trapping mid-operation.

#![no_std]

pub mod asset;
pub mod transfer;
