//! Privileged-context side: the remote session client and the host that
//! serves bridge requests with it.

pub mod clock;
pub mod host;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use host::ContentHost;
pub use session::{CachedToken, RemoteSessionClient};
