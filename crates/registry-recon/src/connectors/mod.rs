//! Connectors and their registry.
//!
//! A connector turns one input row into zero or more output rows by querying
//! a remote registry. Connectors hold only configuration captured at
//! initialisation, so `run` may be called concurrently for many rows.

pub mod companies_house;
pub mod company_search;
pub mod land_registry;
pub mod officers;

use async_trait::async_trait;

use crate::error::{ConfigError, RowResult};
use crate::requestor::HttpContext;
use crate::types::{ConnectorDetails, InputRow, OutputRow, Parameters};

pub use company_search::CompanySearchConnector;
pub use land_registry::LandRegistryConnector;
pub use officers::OfficersConnector;

/// A stateless row transform backed by remote lookups.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Static configuration contract and output columns.
    fn details(&self) -> &'static ConnectorDetails;

    /// Reconcile one input row.
    async fn run(&self, row: &InputRow) -> RowResult<Vec<OutputRow>>;
}

/// Every connector this crate provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    LandRegistryTitles,
    CompaniesHouseOfficers,
    CompaniesHouseSearch,
}

impl ConnectorKind {
    pub const ALL: [ConnectorKind; 3] = [
        ConnectorKind::LandRegistryTitles,
        ConnectorKind::CompaniesHouseOfficers,
        ConnectorKind::CompaniesHouseSearch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ConnectorKind::LandRegistryTitles => "land-registry-titles",
            ConnectorKind::CompaniesHouseOfficers => "companies-house-officers",
            ConnectorKind::CompaniesHouseSearch => "companies-house-search",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            ConnectorKind::LandRegistryTitles => {
                "Land Registry title numbers to property addresses and tenure"
            }
            ConnectorKind::CompaniesHouseOfficers => {
                "UK company numbers to company officers"
            }
            ConnectorKind::CompaniesHouseSearch => "UK company names to company numbers",
        }
    }

    pub fn details(&self) -> &'static ConnectorDetails {
        match self {
            ConnectorKind::LandRegistryTitles => &land_registry::DETAILS,
            ConnectorKind::CompaniesHouseOfficers => &officers::DETAILS,
            ConnectorKind::CompaniesHouseSearch => &company_search::DETAILS,
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| ConfigError::UnknownConnector(name.to_string()))
    }

    /// Validate `params` and build a connector bound to `ctx`.
    pub fn initialise(
        &self,
        params: &Parameters,
        ctx: &HttpContext,
    ) -> Result<Box<dyn Connector>, ConfigError> {
        let connector: Box<dyn Connector> = match self {
            ConnectorKind::LandRegistryTitles => {
                Box::new(LandRegistryConnector::initialise(params, ctx)?)
            }
            ConnectorKind::CompaniesHouseOfficers => {
                Box::new(OfficersConnector::initialise(params, ctx)?)
            }
            ConnectorKind::CompaniesHouseSearch => {
                Box::new(CompanySearchConnector::initialise(params, ctx)?)
            }
        };
        Ok(connector)
    }
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
