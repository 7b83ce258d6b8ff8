//! Companies House company names → company numbers.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::companies_house::{self, PAGE_SIZE};
use super::Connector;
use crate::config::{optional_bounded, required_str};
use crate::error::{ConfigError, RowResult};
use crate::request::{BasicAuth, RequestSpec};
use crate::requestor::{Attempts, HttpContext, Requestor};
use crate::types::{
    require_field, ColumnSpec, ConnectorDetails, InputRow, OutputRow, ParameterSpec, Parameters,
    Passthrough,
};

const COMPANY_NAME: &str = "companyName";

pub const DEFAULT_MAXIMUM_RESULTS: usize = 1;

pub static DETAILS: ConnectorDetails = ConnectorDetails {
    parameters: &[
        ParameterSpec {
            name: "apiKey",
            description: "A Companies House API key.",
        },
        ParameterSpec {
            name: "companyNameField",
            description: "Company name column.",
        },
        ParameterSpec {
            name: "maximumResults",
            description:
                "Maximum number of results to include for each name. [optional, default: 1, maximum 100]",
        },
    ],
    columns: &[
        ColumnSpec::named("companyNumber"),
        ColumnSpec::named("companyName"),
    ],
};

#[derive(Debug, Default, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub items: Vec<CompanyHit>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompanyHit {
    pub company_number: Option<String>,
    pub title: Option<String>,
}

/// The first `maximum` hits, in response order.
pub fn top_matches(results: &SearchResults, maximum: usize) -> Vec<OutputRow> {
    results
        .items
        .iter()
        .take(maximum)
        .map(|hit| {
            let mut row = OutputRow::new();
            row.set("companyNumber", hit.company_number.clone())
                .set("companyName", hit.title.clone());
            row
        })
        .collect()
}

pub struct CompanySearchConnector {
    api_key: String,
    name_field: String,
    maximum_results: usize,
    search_url: String,
    request: Requestor,
}

impl CompanySearchConnector {
    pub fn initialise(params: &Parameters, ctx: &HttpContext) -> Result<Self, ConfigError> {
        let api_key = required_str(params, "apiKey")?;
        let name_field = required_str(params, "companyNameField")?;
        // 0 means "use the default".
        let maximum_results = optional_bounded(params, "maximumResults", 0, PAGE_SIZE)?
            .filter(|&n| n > 0)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAXIMUM_RESULTS);
        let root: Url = companies_house::api_root(&ctx.endpoints().company_search)?;

        Ok(Self {
            api_key,
            name_field,
            maximum_results,
            search_url: companies_house::endpoint(&root, &["search", "companies"]),
            request: ctx.requestor(Attempts::limited(2), |err, passthrough| {
                companies_house::classify(err, passthrough, COMPANY_NAME)
            }),
        })
    }

    pub fn maximum_results(&self) -> usize {
        self.maximum_results
    }

    // Always request a full page: asking the API for a single item returns
    // nothing when exactly one company matches.
    fn locate(&self, row: &InputRow) -> RowResult<RequestSpec> {
        let name = require_field(row, &self.name_field, "company name")?;
        Ok(RequestSpec::get(&self.search_url)
            .with_auth(BasicAuth::api_key(&self.api_key))
            .with_query("q", &name)
            .with_query("items_per_page", PAGE_SIZE)
            .with_passthrough(Passthrough::new().with(COMPANY_NAME, name)))
    }
}

#[async_trait]
impl Connector for CompanySearchConnector {
    fn details(&self) -> &'static ConnectorDetails {
        &DETAILS
    }

    async fn run(&self, row: &InputRow) -> RowResult<Vec<OutputRow>> {
        let response = self.request.request(self.locate(row)?).await?;
        let results: SearchResults = response.json()?;
        Ok(top_matches(&results, self.maximum_results))
    }
}
