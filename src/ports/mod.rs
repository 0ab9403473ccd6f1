pub mod certificate_store;
pub mod outbound;
