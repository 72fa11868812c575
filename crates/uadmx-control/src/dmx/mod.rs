//! DMX output
//!
//! - [`addressing`]: linear universe id and the Art-Net (net, subnet, universe) triple
//! - [`sender`]: the per-universe send boundary and an in-memory sender
//! - [`artnet`]: Art-Net sender over UDP
//! - [`store`]: committed and prepared channel state per universe
//! - [`patterns`]: scheduled test patterns
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use uadmx_control::dmx::{ArtNetSender, UniverseAddress, UniverseChannelStore};
//!
//! # fn main() -> uadmx_control::Result<()> {
//! let sender = ArtNetSender::new(UniverseAddress::from_linear(0), "10.0.0.20:6454")?;
//!
//! let mut store = UniverseChannelStore::new();
//! store.register(0, Box::new(sender))?;
//!
//! store.set_channel(0, 1, 255);
//! assert_eq!(store.get_value(0, 1), 255);
//! # Ok(())
//! # }
//! ```

pub mod addressing;
pub mod artnet;
pub mod patterns;
pub mod sender;
pub mod store;

pub use addressing::{UniverseAddress, MAX_UNIVERSE_ID};
pub use artnet::{ArtNetConfig, ArtNetNode, ArtNetSender, ARTNET_PORT};
pub use patterns::{PatternConfig, PatternKind, PatternRunner};
pub use sender::{DmxSender, MemorySender, DMX_CHANNELS};
pub use store::UniverseChannelStore;
