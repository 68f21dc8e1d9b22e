pub mod fake;
pub mod fcm;
pub mod wns;

pub use fake::FakeProvider;
pub use fcm::FcmProvider;
pub use wns::WnsProvider;
