//! registry-recon: reconciliation connectors for UK public registries.
//!
//! Each connector takes one row of input data (a title number, a company
//! number or a company name), queries HM Land Registry or Companies House,
//! and returns normalized output rows.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use registry_recon::{ClientSettings, ConnectorKind, HttpContext};
//! use serde_json::json;
//!
//! let ctx = HttpContext::new(&ClientSettings::default())?;
//! let params = json!({"apiKey": "…"}).as_object().cloned().unwrap_or_default();
//! let officers = ConnectorKind::CompaniesHouseOfficers.initialise(&params, &ctx)?;
//!
//! let row = json!({"companyNumber": "00000006"}).as_object().cloned().unwrap_or_default();
//! for officer in officers.run(&row).await? {
//!     println!("{}", serde_json::to_string(&officer)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connectors;
pub mod error;
pub mod html;
pub mod request;
pub mod requestor;
pub mod transport;
pub mod types;

pub use config::{Backoff, ClientSettings, Endpoints};
pub use connectors::{Connector, ConnectorKind};
pub use error::{ConfigError, HttpError, RowError, RowResult};
pub use request::{BasicAuth, Method, RequestSpec, Response};
pub use requestor::{AbortSignal, Attempts, Classification, HttpContext, Requestor};
pub use transport::{ReqwestTransport, Transport};
pub use types::*;
