pub mod split;
pub mod status;
pub mod window;

pub use split::{Split, split_commission};
pub use status::{CommissionStatus, PayoutStatus, TransitionError};
pub use window::window_active;
