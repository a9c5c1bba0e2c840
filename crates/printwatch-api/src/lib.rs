// printwatch-api: Async clients for 3D-printer controller APIs
// (Moonraker, OctoPrint, Elegoo SDCP).

pub mod error;
mod json;
pub mod moonraker;
pub mod octoprint;
pub mod sdcp;
pub mod status;
pub mod transport;

pub use error::Error;
pub use moonraker::MoonrakerClient;
pub use octoprint::OctoPrintClient;
pub use sdcp::SdcpClient;
pub use status::{PrinterState, RawStatus};
pub use transport::TransportConfig;
