//! Land Registry title numbers → property address and tenure.
//!
//! Two requests per row: the portal landing page supplies the enquiry form's
//! action, which is then posted a detailed enquiry for the title.

use async_trait::async_trait;
use url::Url;

use super::Connector;
use crate::config::optional_str;
use crate::error::{ConfigError, HttpError, RowError, RowResult};
use crate::html::{DocumentQuery, HtmlDocument};
use crate::request::{RequestSpec, Response};
use crate::requestor::{Attempts, Classification, HttpContext, Requestor};
use crate::types::{
    require_field, ColumnSpec, ConnectorDetails, InputRow, OutputRow, ParameterSpec, Parameters,
    Passthrough,
};

const TITLE_NUMBER: &str = "titleNumber";
const RESULT_CONTAINER: &str = ".w80p";

pub static DETAILS: ConnectorDetails = ConnectorDetails {
    parameters: &[ParameterSpec {
        name: "titleNumberField",
        description: "Title number field. [optional, default: \"titleNumber\"]",
    }],
    columns: &[
        ColumnSpec::named("titleAddress"),
        ColumnSpec {
            name: "titleTenure",
            description: Some("Leasehold or freehold."),
        },
    ],
};

pub struct LandRegistryConnector {
    title_field: String,
    portal_url: String,
    request: Requestor,
}

/// HTTP errors for a known title are final for that row; anything else is
/// retried, since the portal is flaky rather than wrong.
pub fn classify(err: &HttpError, passthrough: &Passthrough) -> Classification {
    match (err.status, passthrough.get(TITLE_NUMBER)) {
        (Some(status), Some(title)) if status >= 400 => {
            Classification::Recoverable(format!("Received code {status} for title {title}"))
        }
        _ => Classification::Retry,
    }
}

impl LandRegistryConnector {
    pub fn initialise(params: &Parameters, ctx: &HttpContext) -> Result<Self, ConfigError> {
        let title_field =
            optional_str(params, "titleNumberField")?.unwrap_or_else(|| TITLE_NUMBER.to_string());
        Ok(Self {
            title_field,
            portal_url: ctx.endpoints().land_registry.clone(),
            request: ctx.requestor(Attempts::Unlimited, classify),
        })
    }

    fn form(&self, row: &InputRow) -> RowResult<RequestSpec> {
        let title = require_field(row, &self.title_field, "title number")?;
        Ok(RequestSpec::get(&self.portal_url)
            .with_passthrough(Passthrough::new().with(TITLE_NUMBER, title)))
    }

    fn locate(&self, landing: &Response) -> RowResult<RequestSpec> {
        let title = title_of(landing);
        let doc = HtmlDocument::parse(&landing.body);
        let url = enquiry_url(&doc, &landing.url, title)?;
        Ok(
            RequestSpec::post_form(url, &[("titleNo", title), ("enquiryType", "detailed")])
                .with_passthrough(Passthrough::new().with(TITLE_NUMBER, title)),
        )
    }

    fn parse(&self, enquiry: &Response) -> RowResult<OutputRow> {
        let doc = HtmlDocument::parse(&enquiry.body);
        extract_title(&doc, title_of(enquiry))
    }
}

fn title_of(response: &Response) -> &str {
    response.passthrough().get(TITLE_NUMBER).unwrap_or_default()
}

/// Absolute URL of the first form's action, resolved against `page_url`.
pub fn enquiry_url(doc: &impl DocumentQuery, page_url: &str, title: &str) -> RowResult<String> {
    let action = doc
        .attr("form", 0, "action")?
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| RowError::Parse(format!("Could not find enquiry form for title {title}")))?;

    let base = Url::parse(page_url)
        .map_err(|e| RowError::Parse(format!("Invalid portal URL {page_url}: {e}")))?;
    let resolved = base
        .join(action.trim())
        .map_err(|e| RowError::Parse(format!("Invalid form action {action:?}: {e}")))?;
    Ok(resolved.into())
}

/// Address and tenure from a detailed enquiry result page.
pub fn extract_title(doc: &impl DocumentQuery, title: &str) -> RowResult<OutputRow> {
    if doc.count(RESULT_CONTAINER)? == 0 {
        return Err(RowError::Parse(format!("Could not find title {title}")));
    }

    let address = doc
        .own_text(RESULT_CONTAINER, 0)?
        .unwrap_or_default()
        .join(", ");
    let tenure = doc.text(RESULT_CONTAINER, 1)?.unwrap_or_default();

    let mut row = OutputRow::new();
    row.set("titleAddress", Some(address))
        .set("titleTenure", Some(tenure));
    Ok(row)
}

#[async_trait]
impl Connector for LandRegistryConnector {
    fn details(&self) -> &'static ConnectorDetails {
        &DETAILS
    }

    async fn run(&self, row: &InputRow) -> RowResult<Vec<OutputRow>> {
        let landing = self.request.request(self.form(row)?).await?;
        let enquiry_spec = self.locate(&landing)?;
        let enquiry = self.request.request(enquiry_spec).await?;
        Ok(vec![self.parse(&enquiry)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;

    fn error(status: Option<u16>) -> HttpError {
        let spec = RequestSpec::get("https://example.com");
        match status {
            Some(s) => HttpError::from_status(&spec, spec.url.clone(), s),
            None => HttpError::network(&spec, "timed out"),
        }
    }

    #[test]
    fn test_classify() {
        let known = Passthrough::new().with(TITLE_NUMBER, "DN100");
        assert_eq!(
            classify(&error(Some(500)), &known),
            Classification::Recoverable("Received code 500 for title DN100".into())
        );
        assert_eq!(classify(&error(None), &known), Classification::Retry);
        assert_eq!(classify(&error(Some(404)), &Passthrough::new()), Classification::Retry);
    }

    #[test]
    fn test_enquiry_url_resolves_relative_action() {
        let doc = HtmlDocument::parse(
            r#"<form action="/wps/portal/!ut/p/z1/abc?x=1" method="post"></form>"#,
        );
        let url = enquiry_url(
            &doc,
            "https://eservices.landregistry.gov.uk/wps/portal/Property_Search",
            "DN1",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://eservices.landregistry.gov.uk/wps/portal/!ut/p/z1/abc?x=1"
        );
    }

    #[test]
    fn test_missing_form_is_parse_failure() {
        let doc = HtmlDocument::parse("<html><body>maintenance</body></html>");
        let err = enquiry_url(&doc, "https://example.com/portal", "DN9").unwrap_err();
        assert_eq!(err.to_string(), "Could not find enquiry form for title DN9");
    }

    #[test]
    fn test_extract_title() {
        let doc = HtmlDocument::parse(
            r#"<table>
                 <tr><td class="w80p">1 Acacia Avenue<br>Springfield<br>SP1 1AA</td></tr>
                 <tr><td class="w80p">
                     Leasehold
                 </td></tr>
               </table>"#,
        );
        let row = extract_title(&doc, "DN1").unwrap();
        assert_eq!(
            row.get_str("titleAddress"),
            Some("1 Acacia Avenue, Springfield, SP1 1AA")
        );
        assert_eq!(row.get_str("titleTenure"), Some("Leasehold"));
        assert_eq!(row.columns().collect::<Vec<_>>(), DETAILS.column_names());
    }

    #[test]
    fn test_extract_title_without_tenure() {
        let doc = HtmlDocument::parse(r#"<div class="w80p">Plot 4</div>"#);
        let row = extract_title(&doc, "DN1").unwrap();
        assert_eq!(row.get_str("titleAddress"), Some("Plot 4"));
        assert_eq!(row.get_str("titleTenure"), Some(""));
    }

    #[test]
    fn test_extract_title_keeps_blank_address_lines() {
        let doc = HtmlDocument::parse(
            "<table><tr><td class=\"w80p\">12 High St<br/>\n  <br/>Town</td></tr></table>",
        );
        let row = extract_title(&doc, "DN1").unwrap();
        assert_eq!(row.get_str("titleAddress"), Some("12 High St, , Town"));
        assert_eq!(row.get_str("titleTenure"), Some(""));
    }

    #[test]
    fn test_extract_title_not_found() {
        let doc = HtmlDocument::parse("<p>No results</p>");
        let err = extract_title(&doc, "XYZ123").unwrap_err();
        assert!(matches!(err, RowError::Parse(_)));
        assert_eq!(err.to_string(), "Could not find title XYZ123");
    }

    #[test]
    fn test_locate_builds_detailed_enquiry() {
        let ctx = HttpContext::new(&crate::config::ClientSettings::default()).unwrap();
        let connector = LandRegistryConnector::initialise(&Default::default(), &ctx).unwrap();
        assert_eq!(connector.request.attempts(), Attempts::Unlimited);
        let landing = Response {
            url: "https://eservices.landregistry.gov.uk/wps/portal/Property_Search".into(),
            status: 200,
            body: r#"<form action="/wps/portal/enquiry"></form>"#.into(),
            request: RequestSpec::get("https://eservices.landregistry.gov.uk/wps/portal/Property_Search")
                .with_passthrough(Passthrough::new().with(TITLE_NUMBER, "AGL1")),
        };
        let spec = connector.locate(&landing).unwrap();
        assert_eq!(spec.method, Method::Post);
        assert_eq!(spec.url, "https://eservices.landregistry.gov.uk/wps/portal/enquiry");
        assert_eq!(
            spec.form.unwrap(),
            vec![
                ("titleNo".to_string(), "AGL1".to_string()),
                ("enquiryType".to_string(), "detailed".to_string()),
            ]
        );
        assert_eq!(spec.passthrough.get(TITLE_NUMBER), Some("AGL1"));
    }
}
