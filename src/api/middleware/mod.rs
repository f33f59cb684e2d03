//! API middleware.
//!
//! Only request logging lives here; CORS and `Cache-Control` come from
//! `tower-http` layers in the router.

pub mod audit;
