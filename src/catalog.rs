//! Just enough of the open-data (CKAN) API to locate the degree catalog file.

use csv::{ReaderBuilder, StringRecord};
use log::info;
use serde::Deserialize;

use crate::{
    degree::Degree,
    error::{Result, ScrapeError},
    scraping_context::ScrapingContext,
};

/// Package holding the degree programmes.
pub const DEGREE_PROGRAMMES_PACKAGE: &str = "degree-programmes";
/// Alias of the current Italian degree list inside that package.
pub const DEGREE_PROGRAMMES_ALIAS: &str = "corsi_latest_it";

/// Columns of a degree catalog row, in file order.
const DEGREE_COLUMNS: usize = 15;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "__type")]
    pub kind: String,
}

/// Every action answers with this envelope.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub help: String,
    pub success: bool,
    pub result: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self, url: &str) -> Result<T> {
        let failure = |message: String| ScrapeError::Catalog {
            url: url.to_string(),
            message,
        };
        match (self.success, self.result, self.error) {
            (true, Some(result), _) => Ok(result),
            (true, None, _) => Err(failure("successful response without a result".into())),
            (false, _, Some(error)) => Err(failure(format!("{} ({})", error.message, error.kind))),
            (false, _, None) => Err(failure("unsuccessful response without error details".into())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub package_id: String,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    /// Comma separated, a resource may have several.
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
}

impl Resource {
    pub fn has_alias(&self, alias: &str) -> bool {
        self.alias
            .as_deref()
            .is_some_and(|aliases| aliases.split(',').any(|a| a.trim() == alias))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Package {
    pub fn find_by_alias(&self, alias: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.has_alias(alias))
    }
}

pub async fn fetch_package(ctx: &ScrapingContext, id: &str) -> Result<Package> {
    let url = ctx.urls.catalog_package_url(id);
    let response: ApiResponse<Package> = ctx.fetch_json(&url).await?;
    response.into_result(&url)
}

/// Download url of the machine readable degree list.
pub async fn degree_catalog_url(ctx: &ScrapingContext) -> Result<String> {
    let package = fetch_package(ctx, DEGREE_PROGRAMMES_PACKAGE).await?;
    package
        .find_by_alias(DEGREE_PROGRAMMES_ALIAS)
        .map(|r| r.url.clone())
        .ok_or_else(|| ScrapeError::Catalog {
            url: ctx.urls.catalog_package_url(DEGREE_PROGRAMMES_PACKAGE),
            message: format!("no resource with alias {DEGREE_PROGRAMMES_ALIAS:?}"),
        })
}

/// Every degree of the current academic year, from the open data catalog.
pub async fn fetch_degrees(ctx: &ScrapingContext) -> Result<Vec<Degree>> {
    let url = degree_catalog_url(ctx).await?;
    let body = ctx.fetch(&url).await?;
    let degrees = parse_degrees(&body, &url)?;
    info!("found {} degrees in the catalog", degrees.len());
    Ok(degrees)
}

/// Decodes the degree catalog CSV. The header row is skipped and columns are
/// read by position, so a row of any other width fails the whole file.
pub fn parse_degrees(body: &[u8], url: &str) -> Result<Vec<Degree>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body);

    reader
        .records()
        .map(|record| {
            let record = record.map_err(|e| ScrapeError::parse(url, e))?;
            degree_from_record(&record, url)
        })
        .collect()
}

fn degree_from_record(record: &StringRecord, url: &str) -> Result<Degree> {
    if record.len() != DEGREE_COLUMNS {
        return Err(ScrapeError::parse(
            url,
            format!(
                "unexpected number of fields: {} instead of {DEGREE_COLUMNS}, the catalog has changed?",
                record.len()
            ),
        ));
    }

    let years = record[9].trim().parse::<u32>().map_err(|e| {
        ScrapeError::parse(url, format!("unable to parse field 'years' {:?}: {e}", &record[9]))
    })?;
    let international = parse_flag(&record[10]).ok_or_else(|| {
        ScrapeError::parse(
            url,
            format!("unable to parse field 'international' {:?}", &record[10]),
        )
    })?;

    let mut degree = Degree::new(&record[4], years);
    degree.academic_year = record[0].to_string();
    degree.open_for_registration = record[1].to_string();
    degree.code = record[2].to_string();
    degree.description = record[3].to_string();
    degree.campus = record[5].to_string();
    degree.teaching_location = record[6].to_string();
    degree.fields = record[7].to_string();
    degree.degree_type = record[8].to_string();
    degree.international = international;
    degree.international_title = record[11].to_string();
    degree.international_language = record[12].to_string();
    degree.languages = record[13].to_string();
    degree.access_requirements = record[14].to_string();
    Ok(degree)
}

// The catalog spells booleans in several ways.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "t" | "T" | "true" | "True" | "TRUE" => Some(true),
        "0" | "f" | "F" | "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ScrapingConfig;
    use crate::requests::mock::MockFetcher;

    fn resource(alias: &str) -> Resource {
        Resource {
            id: alias.to_string(),
            url: format!("https://dati.unibo.it/{alias}.csv"),
            alias: Some(alias.to_string()),
            ..Resource::default()
        }
    }

    #[test]
    fn alias_lookup_handles_lists() {
        let package = Package {
            id: "p".into(),
            name: String::new(),
            title: String::new(),
            resources: vec![resource("alias1"), resource("alias1, alias2"), resource("other")],
        };
        assert_eq!(package.find_by_alias("alias1").unwrap().id, "alias1");
        assert_eq!(package.find_by_alias("alias2").unwrap().id, "alias1, alias2");
        assert!(package.find_by_alias("alias3").is_none());
    }

    #[test]
    fn envelope_errors_are_surfaced() {
        let body = r#"{"help":"h","success":false,"error":{"message":"Not found","__type":"Not Found Error"}}"#;
        let response: ApiResponse<Package> = serde_json::from_str(body).unwrap();
        let err = response.into_result("u").unwrap_err();
        assert!(err.to_string().contains("Not found"));
    }

    const HEADER: &str = "annoaccademico,immatricolabile,corso_codice,corso_descrizione,url,campus,sededidattica,ambiti,tipologia,durata,internazionale,internazionale_titolo,internazionale_lingua,lingue,accesso";

    #[test]
    fn degree_rows_are_read_by_position() {
        let csv = format!(
            "{HEADER}\n\
             2024/2025,SI,8615,INGEGNERIA INFORMATICA,https://www.unibo.it/it/didattica/corsi-di-studio/corso/2024/8615,Bologna,Bologna,\"Ingegneria, Architettura\",Laurea,3,false,,,italiano,libero\n\
             2024/2025,SI,9063,ARTIFICIAL INTELLIGENCE,https://www.unibo.it/en/study/course/2024/9063,Bologna,Bologna,Scienze,Laurea Magistrale,2,1,Double degree,inglese,inglese,programmato\n"
        );
        let degrees = parse_degrees(csv.as_bytes(), "u").unwrap();
        assert_eq!(degrees.len(), 2);

        let informatica = &degrees[0];
        assert_eq!(informatica.code, "8615");
        assert_eq!(informatica.fields, "Ingegneria, Architettura");
        assert_eq!(informatica.duration_in_years, 3);
        assert!(!informatica.international);
        assert_eq!(informatica.degree_type, "Laurea");

        let ai = &degrees[1];
        assert!(ai.international);
        assert_eq!(ai.international_title, "Double degree");
        assert_eq!(ai.access_requirements, "programmato");
        assert_eq!(ai.url, "https://www.unibo.it/en/study/course/2024/9063");
    }

    #[test]
    fn header_only_catalog_is_empty() {
        assert!(parse_degrees(HEADER.as_bytes(), "u").unwrap().is_empty());
    }

    #[test]
    fn bad_duration_is_a_parse_error() {
        let csv = format!("{HEADER}\n2024/2025,SI,1,X,u,B,B,F,Laurea,tre,false,,,it,libero\n");
        let err = parse_degrees(csv.as_bytes(), "https://dati").unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { ref url, ref message } if url == "https://dati" && message.contains("years")));
    }

    #[test]
    fn bad_international_flag_is_a_parse_error() {
        let csv = format!("{HEADER}\n2024/2025,SI,1,X,u,B,B,F,Laurea,3,forse,,,it,libero\n");
        let err = parse_degrees(csv.as_bytes(), "u").unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { ref message, .. } if message.contains("international")));
    }

    #[test]
    fn flags_accept_catalog_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("yes"), None);
    }

    #[tokio::test]
    async fn finds_degree_catalog_url() {
        let body = r#"{"help":"h","success":true,"result":{"id":"x","name":"degree-programmes","resources":[
            {"id":"1","url":"https://dati.unibo.it/en.csv","alias":"corsi_latest_en"},
            {"id":"2","url":"https://dati.unibo.it/it.csv","alias":"corsi_2024_it, corsi_latest_it"}]}}"#;
        let fetcher = MockFetcher::default().with_page(
            "https://dati.unibo.it/api/3/action/package_show?id=degree-programmes",
            body,
        );
        let ctx = ScrapingContext::with_fetcher(&ScrapingConfig::default(), Arc::new(fetcher)).unwrap();
        assert_eq!(degree_catalog_url(&ctx).await.unwrap(), "https://dati.unibo.it/it.csv");
    }
}
