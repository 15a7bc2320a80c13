pub mod attachment;
pub mod form;
pub mod invoice;
pub mod payload;
pub mod upload;

pub use attachment::*;
pub use form::*;
pub use invoice::*;
pub use payload::*;
pub use upload::*;

pub const PAYLOAD_VERSION: &str = "1.0";
