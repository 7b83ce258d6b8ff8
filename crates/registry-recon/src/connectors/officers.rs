//! Companies House company numbers → company officers.
//!
//! The officers endpoint pages at 100 items. The first page reports
//! `total_results`; remaining pages are fetched concurrently and flattened
//! back in page order.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use url::Url;

use super::companies_house::{self, PAGE_SIZE};
use super::Connector;
use crate::config::{optional_str, required_str};
use crate::error::{ConfigError, RowError, RowResult};
use crate::request::{BasicAuth, RequestSpec, Response};
use crate::requestor::{Attempts, HttpContext, Requestor};
use crate::types::{
    require_field, ColumnSpec, ConnectorDetails, InputRow, OutputRow, ParameterSpec, Parameters,
    Passthrough,
};

const COMPANY_NUMBER: &str = "companyNumber";

/// Ceiling on pages per company. A larger `total_results` is treated as a
/// corrupt response.
pub const MAX_PAGES: u64 = 100;

/// Former-name parts that mean "no former name".
const FORMER_NAME_SENTINELS: [&str; 4] = ["NONE", "NONE NONE", "N/A", "N/A N/A"];

pub static DETAILS: ConnectorDetails = ConnectorDetails {
    parameters: &[
        ParameterSpec {
            name: "apiKey",
            description: "A Companies House API key.",
        },
        ParameterSpec {
            name: "companyNumberField",
            description: "Company number column. [optional, default: \"companyNumber\"]",
        },
    ],
    columns: &[
        ColumnSpec::named("officerName"),
        ColumnSpec::named("officerRole"),
        ColumnSpec::named("officerAppointedDate"),
        ColumnSpec::named("officerResignedDate"),
        ColumnSpec::named("officerNationality"),
        ColumnSpec::named("officerOccupation"),
        ColumnSpec::named("officerAddress"),
        ColumnSpec::named("officerDateOfBirth"),
        ColumnSpec::named("officerCountryOfResidence"),
        ColumnSpec::named("officerFormerNames"),
        ColumnSpec::named("officerIDType"),
        ColumnSpec::named("officerIDLegalAuthority"),
        ColumnSpec::named("officerIDLegalForm"),
        ColumnSpec::named("officerIDRegisteredPlace"),
        ColumnSpec::named("officerIDNumber"),
    ],
};

// ── response schema ──

#[derive(Debug, Default, Deserialize)]
pub struct OfficerList {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub items: Vec<Officer>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Officer {
    pub name: Option<String>,
    pub officer_role: Option<String>,
    pub appointed_on: Option<String>,
    pub resigned_on: Option<String>,
    pub nationality: Option<String>,
    pub occupation: Option<String>,
    pub address: Option<Address>,
    pub date_of_birth: Option<DateOfBirth>,
    pub country_of_residence: Option<String>,
    pub former_names: Option<Vec<FormerName>>,
    pub identification: Option<Identification>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Address {
    pub care_of: Option<String>,
    pub premises: Option<String>,
    pub po_box: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Date parts arrive as numbers, but strings are tolerated.
#[derive(Debug, Default, Deserialize)]
pub struct DateOfBirth {
    pub year: Option<Value>,
    pub month: Option<Value>,
    pub day: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FormerName {
    pub surname: Option<String>,
    pub forenames: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Identification {
    pub identification_type: Option<String>,
    pub legal_authority: Option<String>,
    pub legal_form: Option<String>,
    pub place_registered: Option<String>,
    pub registration_number: Option<String>,
}

// ── field composition ──

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|s| !s.is_empty()).map(str::to_string)
}

fn date_part(value: &Option<Value>) -> Option<String> {
    match value.as_ref()? {
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

impl Address {
    /// Present parts, comma-joined, most specific first.
    pub fn composite(&self) -> String {
        [
            &self.care_of,
            &self.premises,
            &self.po_box,
            &self.address_line_1,
            &self.address_line_2,
            &self.locality,
            &self.region,
            &self.postal_code,
            &self.country,
        ]
        .into_iter()
        .filter_map(non_empty)
        .collect::<Vec<_>>()
        .join(", ")
    }
}

impl DateOfBirth {
    /// `year-month-day`, omitting absent parts.
    pub fn composite(&self) -> String {
        [&self.year, &self.month, &self.day]
            .into_iter()
            .filter_map(date_part)
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Former names as `surname, forenames; …`, skipping sentinel values.
///
/// When every name is a sentinel the result is the empty string.
pub fn former_names_composite(names: &[FormerName]) -> String {
    names
        .iter()
        .map(|name| {
            [&name.surname, &name.forenames]
                .into_iter()
                .filter_map(non_empty)
                .filter(|part| !FORMER_NAME_SENTINELS.contains(&part.as_str()))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|joined| !joined.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

fn identification(
    officer: &Officer,
    field: impl Fn(&Identification) -> &Option<String>,
) -> Option<String> {
    officer
        .identification
        .as_ref()
        .and_then(|i| non_empty(field(i)))
}

/// Map one officer to an output row with every declared column.
pub fn officer_row(officer: &Officer) -> OutputRow {
    let mut row = OutputRow::new();
    row.set("officerName", officer.name.clone())
        .set("officerRole", officer.officer_role.clone())
        .set("officerAppointedDate", officer.appointed_on.clone())
        .set("officerResignedDate", officer.resigned_on.clone())
        .set("officerNationality", officer.nationality.clone())
        .set("officerOccupation", officer.occupation.clone())
        .set("officerAddress", officer.address.as_ref().map(Address::composite))
        .set(
            "officerDateOfBirth",
            officer.date_of_birth.as_ref().map(DateOfBirth::composite),
        )
        .set("officerCountryOfResidence", officer.country_of_residence.clone())
        .set(
            "officerFormerNames",
            officer.former_names.as_deref().map(former_names_composite),
        )
        .set("officerIDType", identification(officer, |i| &i.identification_type))
        .set("officerIDLegalAuthority", identification(officer, |i| &i.legal_authority))
        .set("officerIDLegalForm", identification(officer, |i| &i.legal_form))
        .set("officerIDRegisteredPlace", identification(officer, |i| &i.place_registered))
        .set("officerIDNumber", identification(officer, |i| &i.registration_number));
    row
}

/// Number of pages needed for `total_results` items.
pub fn page_total(total_results: u64) -> u64 {
    total_results.div_ceil(PAGE_SIZE)
}

// ── connector ──

pub struct OfficersConnector {
    api_key: String,
    number_field: String,
    api_root: Url,
    request: Requestor,
}

impl OfficersConnector {
    pub fn initialise(params: &Parameters, ctx: &HttpContext) -> Result<Self, ConfigError> {
        let api_key = required_str(params, "apiKey")?;
        let number_field = optional_str(params, "companyNumberField")?
            .unwrap_or_else(|| COMPANY_NUMBER.to_string());
        let api_root = companies_house::api_root(&ctx.endpoints().companies_house)?;
        Ok(Self {
            api_key,
            number_field,
            api_root,
            request: ctx.requestor(Attempts::limited(2), |err, passthrough| {
                companies_house::classify(err, passthrough, COMPANY_NUMBER)
            }),
        })
    }

    fn page_request(&self, company: &str, start_index: Option<u64>) -> RequestSpec {
        let url = companies_house::endpoint(&self.api_root, &["company", company, "officers"]);
        let mut spec = RequestSpec::get(url)
            .with_auth(BasicAuth::api_key(&self.api_key))
            .with_query("items_per_page", PAGE_SIZE);
        if let Some(start) = start_index {
            spec = spec.with_query("start_index", start);
        }
        spec.with_passthrough(Passthrough::new().with(COMPANY_NUMBER, company))
    }

    fn locate(&self, row: &InputRow) -> RowResult<RequestSpec> {
        let company = require_field(row, &self.number_field, "company number")?;
        Ok(self.page_request(&company, None))
    }

    /// The first page followed by every further page, in page order.
    async fn paginate(&self, first: Response) -> RowResult<Vec<OfficerList>> {
        let company = first
            .passthrough()
            .get(COMPANY_NUMBER)
            .unwrap_or_default()
            .to_string();
        let first: OfficerList = first.json()?;
        let pages = page_total(first.total_results);
        if pages > MAX_PAGES {
            return Err(RowError::Parse(format!(
                "Implausible officer count {} for company {company}",
                first.total_results
            )));
        }
        if pages <= 1 {
            return Ok(vec![first]);
        }

        info!(company = %company, pages, "fetching remaining officer pages");
        let rest = try_join_all((1..pages).map(|page| {
            let spec = self.page_request(&company, Some(page * PAGE_SIZE));
            async move { self.request.request(spec).await?.json::<OfficerList>() }
        }))
        .await?;

        let mut all = Vec::with_capacity(rest.len() + 1);
        all.push(first);
        all.extend(rest);
        Ok(all)
    }

    fn parse(page: &OfficerList) -> Vec<OutputRow> {
        page.items.iter().map(officer_row).collect()
    }
}

#[async_trait]
impl Connector for OfficersConnector {
    fn details(&self) -> &'static ConnectorDetails {
        &DETAILS
    }

    async fn run(&self, row: &InputRow) -> RowResult<Vec<OutputRow>> {
        let first = self.request.request(self.locate(row)?).await?;
        let pages = self.paginate(first).await?;
        Ok(pages.iter().flat_map(Self::parse).collect())
    }
}
