//! NGSI Context Broker Client
//!
//! Translates entity attribute reads and writes into context broker HTTP
//! calls, in either the legacy NGSI v1 dialect or NGSI v2.
//!
//! # Example
//!
//! ```rust,no_run
//! use ngsi_client::{Attribute, Dialect, EntityRef, NgsiClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = NgsiClient::new(Dialect::V2)?
//!         .create_client("localhost", 1026, "smartGondor", "/gardens");
//!
//!     let light = EntityRef::typed("Light:1", "Light");
//!
//!     // Write an attribute
//!     let response = client
//!         .update(&light, &[Attribute::new("luminosity", "Number", 87)])
//!         .await?;
//!     assert!(response.is_success());
//!
//!     // Read it back
//!     let response = client.query(&light, &["luminosity".to_string()]).await?;
//!     println!("{}", response.body);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Dialect selection
//!
//! `update` and `query` ask a [`DialectSource`] which dialect is current on
//! every call. Pass a fixed [`Dialect`], or a [`SharedDialect`] to switch at
//! runtime. `discover` only exists in NGSI v1 and ignores the dialect.
//!
//! # Errors
//!
//! Every broker answer, including 4xx and 5xx, comes back as an
//! [`NgsiResponse`]. Only failures to complete the exchange are errors.
//!
//! # Testing
//!
//! The `testing` module provides an in-process mock broker:
//!
//! ```rust,ignore
//! use ngsi_client::testing::MockContextBroker;
//!
//! let broker = MockContextBroker::start().await?;
//! let client = broker.client(Dialect::V1)?;
//! ```

mod client;
pub mod encode;
mod error;
pub mod payload;
pub mod testing;
mod types;

pub use client::{BoundClient, NgsiClient, FIWARE_SERVICE, FIWARE_SERVICE_PATH};
pub use encode::{decode_uri, encode_uri};
pub use error::{NgsiClientError, Result};
pub use payload::{NgsiRequest, Operation};
pub use types::*;
