//! detailhub: session and navigation core for the role-based vehicle
//! service client.

pub mod backend;
pub mod config;
pub mod identity;
pub mod navigation;
pub mod profile;
pub mod session;
