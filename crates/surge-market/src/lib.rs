//! Rate-limited market data client.
//!
//! Fetches minute candles, trade ticks and order book snapshots from the
//! exchange REST API. Ordinary network and HTTP failures never surface as
//! errors: after bounded retries the client returns an empty result,
//! meaning "try again next cycle".
//!
//! The request pacer is the only resource shared between instrument
//! tasks; acquiring a send slot may delay the caller until the minimum
//! inter-request interval has elapsed.

pub mod backoff;
pub mod client;
pub mod error;
pub mod pacer;
pub mod transport;

pub use backoff::{backoff_delay, RetryPolicy};
pub use client::{ClientConfig, MarketClient};
pub use error::{MarketError, MarketResult};
pub use pacer::RequestPacer;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
